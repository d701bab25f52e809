use std::path::Path;

use anyhow::{bail, Context};
use meshport_mesh::{GeometryBuffer, Vector3};
use meshport_ply::{ColorSource, PlyConfig};
use meshport_pov::PovConfig;
use meshport_stl::{Encoding, StlConfig};

use crate::args::ConvertArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Stl,
    Ply,
    Pov,
}

impl FileFormat {
    pub fn from_path(p: &Path) -> anyhow::Result<Self> {
        let ext = p
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Ok(match ext.as_str() {
            "stl" => FileFormat::Stl,
            "ply" => FileFormat::Ply,
            "pov" | "inc" => FileFormat::Pov,
            _ => bail!("can't tell the format of {} from its extension", p.display()),
        })
    }
}

pub fn load(p: &Path) -> anyhow::Result<GeometryBuffer> {
    let mesh = match FileFormat::from_path(p)? {
        FileFormat::Stl => meshport_stl::read_stl::<GeometryBuffer, _>(p),
        FileFormat::Ply => meshport_ply::read_ply(p),
        FileFormat::Pov => bail!("POV-Ray files can only be written"),
    };
    mesh.with_context(|| format!("failed to read {}", p.display()))
}

fn mesh_name(p: &Path) -> String {
    p.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string())
}

pub fn convert_command(args: ConvertArgs) -> anyhow::Result<()> {
    let format = FileFormat::from_path(&args.output)?;
    if format == FileFormat::Ply && args.inputs.len() > 1 {
        bail!("PLY holds a single object, got {} inputs", args.inputs.len());
    }

    let meshes = args
        .inputs
        .iter()
        .map(|p| -> anyhow::Result<_> { Ok((mesh_name(p), load(p)?)) })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let out = &args.output;

    let written = match format {
        FileFormat::Stl => {
            let config = StlConfig {
                encoding: if args.ascii { Encoding::Ascii } else { Encoding::Binary },
                ..StlConfig::default()
            };
            let faces: Vec<Vec<Vector3>> = meshes
                .iter()
                .flat_map(|(_, mesh)| {
                    mesh.faces
                        .iter()
                        .map(move |f| f.vertices.iter().map(|&v| mesh.positions[v as usize]).collect())
                })
                .collect();
            meshport_stl::write_stl(out, &faces, &config)
        }
        FileFormat::Ply => {
            let config = PlyConfig {
                format: if args.ascii {
                    meshport_ply::Format::Ascii
                } else if args.big_endian {
                    meshport_ply::Format::BinaryBigEndian
                } else {
                    meshport_ply::Format::BinaryLittleEndian
                },
                normals: !args.no_normals,
                uvs: !args.no_uvs,
                colors: if args.no_colors {
                    ColorSource::None
                } else if args.material_colors {
                    ColorSource::Material
                } else {
                    ColorSource::Vertex
                },
                ..PlyConfig::default()
            };
            meshport_ply::write_ply(out, &meshes[0].1, &config)
        }
        FileFormat::Pov => {
            let config = PovConfig {
                indent: args.indent,
                list_line_feed: args.line_feed,
                use_vertex_colors: !args.material_colors,
            };
            let named: Vec<(&str, &GeometryBuffer)> =
                meshes.iter().map(|(name, mesh)| (name.as_str(), mesh)).collect();
            meshport_pov::write_pov(out, &named, &config).map(|names| {
                log::info!("declared {}", names.join(", "));
            })
        }
    };
    written.with_context(|| format!("failed to write {}", out.display()))?;

    log::info!("wrote {} mesh(es) to {}", meshes.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use meshport_mesh::{TriangleMesh, VertexIndex};
    use meshport_test_data::{PLY_PLANE, STL_CUBE};

    use super::*;
    use crate::args::{Args, Commands};

    fn convert(args: &[&str]) -> anyhow::Result<()> {
        let args = Args::try_parse_from(["meshport", "convert"].iter().chain(args))?;
        match args.command {
            Commands::Convert(convert) => convert_command(convert),
            Commands::Info(_) => unreachable!(),
        }
    }

    fn fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn formats_from_extension() {
        assert_eq!(FileFormat::Stl, FileFormat::from_path(Path::new("a/b.STL")).unwrap());
        assert_eq!(FileFormat::Pov, FileFormat::from_path(Path::new("scene.inc")).unwrap());
        assert!(FileFormat::from_path(Path::new("mesh.obj")).is_err());
        assert!(FileFormat::from_path(Path::new("mesh")).is_err());
    }

    #[test]
    fn stl_inputs_are_concatenated() {
        let dir = tempfile::tempdir().unwrap();
        let cube = fixture(dir.path(), "cube.stl", STL_CUBE.bytes);
        let out = dir.path().join("two.stl");
        convert(&[cube.to_str().unwrap(), cube.to_str().unwrap(), "-o", out.to_str().unwrap()]).unwrap();

        let mesh: VertexIndex = meshport_stl::read_stl(&out).unwrap();
        assert_eq!(2 * STL_CUBE.triangles, mesh.triangle_count());
        assert_eq!(STL_CUBE.unique_vertices, mesh.points.len());
    }

    #[test]
    fn ply_to_ascii_ply_and_back() {
        let dir = tempfile::tempdir().unwrap();
        let plane = fixture(dir.path(), "plane.ply", PLY_PLANE.bytes);
        let out = dir.path().join("copy.ply");
        convert(&[plane.to_str().unwrap(), "-o", out.to_str().unwrap(), "--ascii", "--no-uvs"]).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        let mesh = meshport_ply::read_ply(&out).unwrap();
        assert!(mesh.uvs.is_none());
        assert!(mesh.colors.is_some());
        assert_eq!(PLY_PLANE.triangles, mesh.triangle_count());
    }

    #[test]
    fn pov_declares_every_input() {
        let dir = tempfile::tempdir().unwrap();
        let cube = fixture(dir.path(), "cube.stl", STL_CUBE.bytes);
        let plane = fixture(dir.path(), "plane.ply", PLY_PLANE.bytes);
        let out = dir.path().join("scene.pov");
        convert(&[
            cube.to_str().unwrap(),
            plane.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--indent",
            "none",
        ])
        .unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("#declare cube =\n"));
        assert!(text.contains("#declare plane =\n"));
        assert!(text.contains("uv_vectors {"));
        assert!(text.contains("object {\ncube\n}"));
    }

    #[test]
    fn several_inputs_into_ply() {
        let dir = tempfile::tempdir().unwrap();
        let plane = fixture(dir.path(), "plane.ply", PLY_PLANE.bytes);
        let out = dir.path().join("out.ply");
        let p = plane.to_str().unwrap();
        assert!(convert(&[p, p, "-o", out.to_str().unwrap()]).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn unreadable_input_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = fixture(dir.path(), "bad.ply", b"ply\nformat ascii 2.0\nend_header\n");
        let out = dir.path().join("out.stl");
        let err = convert(&[bad.to_str().unwrap(), "-o", out.to_str().unwrap()]).unwrap_err();
        assert!(err.to_string().contains("bad.ply"));
        assert!(matches!(
            err.root_cause().downcast_ref::<meshport_mesh::Error>(),
            Some(meshport_mesh::Error::Format(_))
        ));
    }
}
