use std::fmt::Write;
use std::path::Path;

use anyhow::{bail, Context};
use meshport_ply::Property;

use crate::args::InfoArgs;
use crate::convert::{load, FileFormat};

/// A human readable summary of a mesh file.
pub fn describe(p: &Path) -> anyhow::Result<String> {
    let mut text = String::new();
    match FileFormat::from_path(p)? {
        FileFormat::Stl => {
            let info = meshport_stl::read_info(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            writeln!(text, "format: STL ({:?})", info.encoding)?;
            writeln!(text, "triangles: {}", info.triangles)?;
        }
        FileFormat::Ply => {
            let header = meshport_ply::read_header(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            writeln!(text, "format: PLY ({})", header.format.keyword())?;
            for comment in &header.comments {
                writeln!(text, "comment: {comment}")?;
            }
            for element in &header.elements {
                let properties: Vec<String> = element
                    .properties
                    .iter()
                    .map(|property| match property {
                        Property::List { name, .. } => format!("{name}[]"),
                        Property::Scalar { name, .. } => name.clone(),
                    })
                    .collect();
                writeln!(text, "{}: {} ({})", element.name, element.count, properties.join(" "))?;
            }
        }
        FileFormat::Pov => bail!("POV-Ray files can only be written"),
    }

    let mesh = load(p)?;
    let mut attributes = Vec::new();
    if mesh.has_normals() {
        attributes.push("normals");
    }
    if mesh.uvs.is_some() {
        attributes.push("uvs");
    }
    if mesh.colors.is_some() {
        attributes.push("colors");
    }
    writeln!(text, "vertices: {}", mesh.positions.len())?;
    writeln!(text, "faces: {}", mesh.face_count())?;
    if !attributes.is_empty() {
        writeln!(text, "attributes: {}", attributes.join(", "))?;
    }
    Ok(text)
}

pub fn info_command(args: InfoArgs) -> anyhow::Result<()> {
    print!("{}", describe(&args.input)?);
    Ok(())
}
