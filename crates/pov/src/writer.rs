use std::borrow::Cow;
use std::io::Write;

use cgmath::Matrix4;
use meshport_mesh::{triangulate, AttributeDeduplicator, Error, GeometryBuffer, Result, Vector3};

use crate::names::NameSet;
use crate::{Indent, PovConfig};

/// Writes POV-Ray scene description, one declaration at a time.
///
/// Lines are indented by the number of braces left open by the lines before
/// them, so callers only hand over the text.
pub struct PovWriter<W: Write> {
    out: W,
    config: PovConfig,
    level: usize,
    names: NameSet,
}

impl<W: Write> PovWriter<W> {
    pub fn new(out: W, config: PovConfig) -> Self {
        Self {
            out,
            config,
            level: 0,
            names: NameSet::new(),
        }
    }

    pub fn names(&self) -> &NameSet {
        &self.names
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&self, level: usize) -> String {
        match self.config.indent {
            Indent::None => String::new(),
            Indent::Tab => "\t".repeat(level),
            Indent::Spaces(n) => " ".repeat(n * level),
        }
    }

    /// Writes one line at the current level. A line closing more braces
    /// than it opens is dedented first, one opening more is followed by an
    /// indent.
    fn line(&mut self, text: &str) -> Result<()> {
        let opened = text.matches('{').count() as isize - text.matches('}').count() as isize;
        if opened < 0 {
            self.level = self.level.saturating_sub(opened.unsigned_abs());
        }
        writeln!(self.out, "{}{text}", self.indent(self.level))?;
        if opened > 0 {
            self.level += opened as usize;
        }
        Ok(())
    }

    /// Writes `keyword { count, entry, entry, ... }`.
    fn list(&mut self, keyword: &str, entries: &[String]) -> Result<()> {
        self.line(&format!("{keyword} {{"))?;
        let mut body = entries.len().to_string();
        let separator = if self.config.list_line_feed {
            format!(",\n{}", self.indent(self.level))
        } else {
            ", ".to_string()
        };
        for entry in entries {
            body.push_str(&separator);
            body.push_str(entry);
        }
        self.line(&body)?;
        self.line("}")
    }

    pub fn comment(&mut self, text: &str) -> Result<()> {
        for l in text.lines() {
            self.line(&format!("// {l}"))?;
        }
        Ok(())
    }

    /// Declares `mesh` as a `mesh2` object and returns the identifier it was
    /// declared under.
    pub fn write_mesh(&mut self, name: &str, mesh: &GeometryBuffer) -> Result<String> {
        mesh.validate()?;
        // Flat faces take face normals and smooth faces take vertex normals,
        // so both kinds must be present.
        let mesh = if mesh.face_normals.is_some() && mesh.vertex_normals.is_some() {
            Cow::Borrowed(mesh)
        } else {
            let mut copy = mesh.clone();
            copy.ensure_normals();
            Cow::Owned(copy)
        };
        let tables = MeshTables::build(&mesh, self.config.use_vertex_colors)?;

        let name = self.names.declare(name);
        self.level = 0;
        self.line(&format!("#declare {name} ="))?;
        self.line("mesh2 {")?;

        let vertices: Vec<String> = mesh.positions.iter().map(|&p| vector(p)).collect();
        self.list("vertex_vectors", &vertices)?;

        let normals: Vec<String> = tables.normals.iter().map(|&n| vector(n)).collect();
        self.list("normal_vectors", &normals)?;

        if let Some(uvs) = &mesh.uvs {
            let uvs: Vec<String> = uvs
                .values
                .iter()
                .map(|[u, v]| format!("<{u:.6}, {v:.6}>"))
                .collect();
            self.list("uv_vectors", &uvs)?;
        }

        let textures: Vec<String> = tables
            .textures
            .iter()
            .map(|&([r, g, b], [f, t], _)| {
                format!("texture {{ pigment {{ rgbft <{r:.6}, {g:.6}, {b:.6}, {f:.6}, {t:.6}> }} }}")
            })
            .collect();
        self.list("texture_list", &textures)?;

        let faces: Vec<String> = tables
            .triangles
            .iter()
            .map(|t| {
                let textures = match t.textures {
                    [a, b, c] if a == b && b == c => a.to_string(),
                    [a, b, c] => format!("{a}, {b}, {c}"),
                };
                format!("{}, {textures}", index_vector(t.vertices))
            })
            .collect();
        self.list("face_indices", &faces)?;

        let normal_indices: Vec<String> = tables.triangles.iter().map(|t| index_vector(t.normals)).collect();
        self.list("normal_indices", &normal_indices)?;

        if mesh.uvs.is_some() {
            let uv_indices: Vec<String> = tables.triangles.iter().map(|t| index_vector(t.uvs)).collect();
            self.list("uv_indices", &uv_indices)?;
        }

        self.line("}")?;
        log::debug!(
            "declared {name}: {} vertices, {} normals, {} textures, {} triangles",
            mesh.positions.len(),
            tables.normals.len(),
            tables.textures.len(),
            tables.triangles.len()
        );
        Ok(name)
    }

    /// Places a declared mesh in the scene, optionally transformed.
    pub fn write_instance(&mut self, data_name: &str, matrix: Option<Matrix4<f32>>) -> Result<()> {
        if !self.names.contains(data_name) {
            return Err(Error::precondition(format!("'{data_name}' has not been declared")));
        }
        self.level = 0;
        self.line("object {")?;
        self.line(data_name)?;
        if let Some(m) = matrix {
            // POV-Ray wants the three axis columns and the translation.
            let values: Vec<String> = [m.x, m.y, m.z, m.w]
                .iter()
                .flat_map(|c| [c.x, c.y, c.z])
                .map(|v| format!("{v:.6}"))
                .collect();
            self.line(&format!("matrix <{}>", values.join(", ")))?;
        }
        self.line("}")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn vector(v: Vector3) -> String {
    format!("<{:.6}, {:.6}, {:.6}>", v.x, v.y, v.z)
}

fn index_vector([a, b, c]: [u32; 3]) -> String {
    format!("<{a}, {b}, {c}>")
}

/// Per-triangle indices into the tables of one `mesh2`.
struct TriangleIndices {
    vertices: [u32; 3],
    normals: [u32; 3],
    uvs: [u32; 3],
    textures: [u32; 3],
}

/// Deduplicated normal and texture tables of one mesh plus its triangles.
struct MeshTables {
    normals: Vec<Vector3>,
    /// Color, filter/transmit and material index of each texture.
    textures: Vec<([f32; 3], [f32; 2], u32)>,
    triangles: Vec<TriangleIndices>,
}

impl MeshTables {
    fn build(mesh: &GeometryBuffer, use_vertex_colors: bool) -> Result<Self> {
        let vertex_colors = mesh.colors.as_ref().filter(|_| use_vertex_colors);
        let mut normals = AttributeDeduplicator::new();
        let mut textures = AttributeDeduplicator::new();
        let mut triangles = Vec::with_capacity(mesh.triangle_count());

        for (fi, face) in mesh.faces.iter().enumerate() {
            let material = mesh.face_material(face);
            // Material indices outside the list all mean the default material.
            let material_index = if (face.material as usize) < mesh.materials.len() {
                face.material
            } else {
                u32::MAX
            };
            let mut texture = |corner: usize| {
                let color = vertex_colors
                    .and_then(|c| c.corner(fi, corner).copied())
                    .unwrap_or(material.diffuse);
                textures.insert((color, [material.filter, material.transmit], material_index))
            };
            let corner_textures: Vec<u32> = (0..face.len()).map(&mut texture).collect();

            for corners in triangulate(face.len())? {
                let normal = |ci: usize| mesh.corner_normal(fi, ci).unwrap_or(Vector3::new(0.0, 0.0, 0.0));
                let uv = |ci: usize| {
                    mesh.uvs
                        .as_ref()
                        .and_then(|t| t.indices.get(fi)?.get(ci).copied())
                        .unwrap_or(0)
                };
                triangles.push(TriangleIndices {
                    vertices: corners.map(|ci| face.vertices[ci]),
                    normals: corners.map(|ci| normals.insert(normal(ci))),
                    uvs: corners.map(uv),
                    textures: corners.map(|ci| corner_textures[ci]),
                });
            }
        }

        Ok(Self {
            normals: normals.into_values(),
            textures: textures.into_values(),
            triangles,
        })
    }
}

#[cfg(test)]
mod tests {
    use meshport_mesh::{AttributeTable, Material};

    use super::*;

    fn quad() -> GeometryBuffer {
        GeometryBuffer::from_polygons(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    fn render(config: PovConfig, f: impl FnOnce(&mut PovWriter<&mut Vec<u8>>)) -> String {
        let mut out = Vec::new();
        let mut writer = PovWriter::new(&mut out, config);
        f(&mut writer);
        drop(writer);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn quad_mesh2() {
        let text = render(PovConfig::default(), |w| {
            assert_eq!("Quad", w.write_mesh("Quad", &quad()).unwrap());
        });
        let expected = "#declare Quad =
mesh2 {
    vertex_vectors {
        4, <0.000000, 0.000000, 0.000000>, <1.000000, 0.000000, 0.000000>, <1.000000, 1.000000, 0.000000>, <0.000000, 1.000000, 0.000000>
    }
    normal_vectors {
        1, <0.000000, 0.000000, 1.000000>
    }
    texture_list {
        1, texture { pigment { rgbft <0.800000, 0.800000, 0.800000, 0.000000, 0.000000> } }
    }
    face_indices {
        2, <0, 1, 2>, 0, <2, 3, 0>, 0
    }
    normal_indices {
        2, <0, 0, 0>, <0, 0, 0>
    }
}
";
        assert_eq!(expected, text);
    }

    #[test]
    fn line_feed_lists_with_tabs() {
        let config = PovConfig {
            indent: Indent::Tab,
            list_line_feed: true,
            ..PovConfig::default()
        };
        let text = render(config, |w| {
            w.write_mesh("Quad", &quad()).unwrap();
        });
        assert!(text.contains("\tface_indices {\n\t\t2,\n\t\t<0, 1, 2>, 0,\n\t\t<2, 3, 0>, 0\n\t}\n"));
    }

    #[test]
    fn uvs_and_vertex_colors() {
        let mut mesh = quad();
        mesh.uvs = Some(AttributeTable::from_corners(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ]]));
        mesh.colors = Some(AttributeTable::from_corners(vec![vec![
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
        ]]));
        mesh.materials.push(Material {
            transmit: 0.5,
            ..Material::default()
        });

        let text = render(PovConfig::default(), |w| {
            w.write_mesh("Colored", &mesh).unwrap();
        });
        assert!(text.contains("uv_vectors {\n        4, <0.000000, 0.000000>,"));
        assert!(text.contains("uv_indices {\n        2, <0, 1, 2>, <2, 3, 0>\n"));
        assert!(text.contains("rgbft <1.000000, 0.000000, 0.000000, 0.000000, 0.500000>"));
        assert!(text.contains("2, <0, 1, 2>, 0, 0, 1, <2, 3, 0>, 1, 1, 0\n"));

        let config = PovConfig {
            use_vertex_colors: false,
            ..PovConfig::default()
        };
        let text = render(config, |w| {
            w.write_mesh("Colored", &mesh).unwrap();
        });
        assert!(text.contains("texture_list {\n        1, "));
    }

    #[test]
    fn flat_and_smooth_normals() {
        let mut mesh = quad();
        mesh.faces = vec![
            meshport_mesh::Face::new(vec![0, 1, 2]),
            meshport_mesh::Face::new(vec![0, 2, 3]).smooth(true),
        ];
        mesh.vertex_normals = Some(vec![
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ]);
        mesh.ensure_normals();
        let tables = MeshTables::build(&mesh, true).unwrap();
        assert_eq!(3, tables.normals.len());
        assert_eq!([0, 0, 0], tables.triangles[0].normals);
        assert_eq!([0, 1, 2], tables.triangles[1].normals);
    }

    #[test]
    fn unique_names_and_instances() {
        let text = render(PovConfig::default(), |w| {
            let a = w.write_mesh("my-mesh", &quad()).unwrap();
            let b = w.write_mesh("mymesh", &quad()).unwrap();
            assert_eq!("mymesh", a);
            assert_eq!("mymesh_001", b);

            w.write_instance(&a, None).unwrap();
            let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
            w.write_instance(&b, Some(m)).unwrap();
            assert!(matches!(w.write_instance("missing", None), Err(Error::Precondition(_))));
        });
        assert!(text.contains("object {\n    mymesh\n}\n"));
        assert!(text.contains(
            "    matrix <1.000000, 0.000000, 0.000000, 0.000000, 1.000000, 0.000000, \
             0.000000, 0.000000, 1.000000, 1.000000, 2.000000, 3.000000>\n"
        ));
    }

    #[test]
    fn invalid_meshes_are_rejected() {
        let mut mesh = quad();
        mesh.faces[0].vertices.truncate(2);
        let mut out = Vec::new();
        let mut writer = PovWriter::new(&mut out, PovConfig::default());
        assert!(matches!(writer.write_mesh("Bad", &mesh), Err(Error::Precondition(_))));
        assert!(writer.names().is_empty());
    }
}
