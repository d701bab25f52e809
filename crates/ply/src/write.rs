use std::io::Write;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use meshport_mesh::{AttributeDeduplicator, Color, Error, GeometryBuffer, Result, Uv, Vector3};

use crate::header::{Element, Format, Header, Property, ScalarType};
use crate::{ColorSource, PlyConfig};

/// The optional vertex properties written for one mesh.
///
/// Chosen once per export from the config and from which attributes the mesh
/// carries, then used for both the header and every body row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub normals: bool,
    pub uvs: bool,
    pub colors: Option<ColorSource>,
}

impl VertexLayout {
    pub fn for_mesh(mesh: &GeometryBuffer, config: &PlyConfig) -> Self {
        let colors = match config.colors {
            ColorSource::None => None,
            ColorSource::Vertex if mesh.colors.is_none() => None,
            source => Some(source),
        };
        Self {
            normals: config.normals && mesh.has_normals(),
            uvs: config.uvs && mesh.uvs.is_some(),
            colors,
        }
    }

    pub fn properties(&self) -> Vec<Property> {
        let mut names = vec!["x", "y", "z"];
        if self.normals {
            names.extend(["nx", "ny", "nz"]);
        }
        if self.uvs {
            names.extend(["s", "t"]);
        }
        let mut properties: Vec<_> = names
            .into_iter()
            .map(|n| Property::scalar(n, ScalarType::Float32))
            .collect();
        if self.colors.is_some() {
            for n in ["red", "green", "blue", "alpha"] {
                properties.push(Property::scalar(n, ScalarType::UInt8));
            }
        }
        properties
    }
}

/// Position index plus the attribute values one face corner carries.
type CornerKey = (u32, Option<Vector3>, Option<Uv>, Option<Color>);

/// Faces re-indexed into PLY vertices.
struct FlatMesh {
    vertices: Vec<CornerKey>,
    faces: Vec<Vec<u32>>,
}

fn corner_key(mesh: &GeometryBuffer, layout: &VertexLayout, face: usize, corner: usize) -> CornerKey {
    let f = &mesh.faces[face];
    let normal = layout
        .normals
        .then(|| mesh.corner_normal(face, corner))
        .flatten();
    let uv = match (&mesh.uvs, layout.uvs) {
        (Some(uvs), true) => uvs.corner(face, corner).copied(),
        _ => None,
    };
    let color = match layout.colors {
        Some(ColorSource::Vertex) => mesh
            .colors
            .as_ref()
            .and_then(|c| c.corner(face, corner).copied()),
        Some(ColorSource::Material) => Some(mesh.face_material(f).diffuse),
        _ => None,
    };
    (f.vertices[corner], normal, uv, color)
}

/// Splits positions whose corners disagree on an attribute.
///
/// Every position keeps its index, using the attributes of the first corner
/// that references it; corners that differ from that get new vertices
/// appended after the original positions.
fn flatten(mesh: &GeometryBuffer, layout: &VertexLayout) -> FlatMesh {
    let keys: Vec<Vec<CornerKey>> = mesh
        .faces
        .iter()
        .enumerate()
        .map(|(fi, face)| {
            (0..face.len())
                .map(|ci| corner_key(mesh, layout, fi, ci))
                .collect()
        })
        .collect();

    let mut first: Vec<Option<CornerKey>> = vec![None; mesh.positions.len()];
    for key in keys.iter().flatten() {
        first[key.0 as usize].get_or_insert(*key);
    }

    let mut dedup = AttributeDeduplicator::new();
    for (v, key) in first.into_iter().enumerate() {
        let normal = || mesh.vertex_normals.as_ref()?.get(v).copied();
        let unused = (v as u32, layout.normals.then(normal).flatten(), None, None);
        dedup.insert(key.unwrap_or(unused));
    }
    let faces = keys
        .into_iter()
        .map(|corners| corners.into_iter().map(|k| dedup.insert(k)).collect())
        .collect();

    let vertices = dedup.into_values();
    if vertices.len() > mesh.positions.len() {
        log::debug!(
            "split {} positions into {} PLY vertices",
            mesh.positions.len(),
            vertices.len()
        );
    }
    FlatMesh { vertices, faces }
}

fn color_byte(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Values of one vertex row in layout order; floats first, then colors.
fn vertex_row(mesh: &GeometryBuffer, layout: &VertexLayout, key: &CornerKey) -> (Vec<f32>, Option<[u8; 4]>) {
    let (v, normal, uv, color) = *key;
    let p = mesh.positions[v as usize];
    let mut floats = vec![p.x, p.y, p.z];
    if layout.normals {
        let n = normal.unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        floats.extend([n.x, n.y, n.z]);
    }
    if layout.uvs {
        floats.extend(uv.unwrap_or_default());
    }
    let color = layout.colors.map(|_| {
        let [r, g, b] = color.unwrap_or([1.0, 1.0, 1.0]);
        [color_byte(r), color_byte(g), color_byte(b), 255]
    });
    (floats, color)
}

/// Face lists are written as a `uchar` count followed by `int` indices.
fn check_faces(flat: &FlatMesh) -> Result<()> {
    if let Some((fi, face)) = flat.faces.iter().enumerate().find(|(_, f)| f.len() > u8::MAX as usize) {
        return Err(Error::precondition(format!(
            "face {fi} has {} vertices, PLY face lists hold at most 255",
            face.len()
        )));
    }
    if flat.vertices.len() > i32::MAX as usize {
        return Err(Error::precondition(format!(
            "{} vertices do not fit PLY int indices",
            flat.vertices.len()
        )));
    }
    Ok(())
}

fn write_ascii_body<W: Write>(w: &mut W, mesh: &GeometryBuffer, layout: &VertexLayout, flat: &FlatMesh) -> Result<()> {
    for key in &flat.vertices {
        let (floats, color) = vertex_row(mesh, layout, key);
        let mut row: Vec<String> = floats.iter().map(f32::to_string).collect();
        if let Some(color) = color {
            row.extend(color.iter().map(u8::to_string));
        }
        writeln!(w, "{}", row.join(" "))?;
    }
    for face in &flat.faces {
        write!(w, "{}", face.len())?;
        for v in face {
            write!(w, " {v}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

fn write_binary_body<B: ByteOrder, W: Write>(
    w: &mut W,
    mesh: &GeometryBuffer,
    layout: &VertexLayout,
    flat: &FlatMesh,
) -> Result<()> {
    for key in &flat.vertices {
        let (floats, color) = vertex_row(mesh, layout, key);
        for f in floats {
            w.write_f32::<B>(f)?;
        }
        if let Some(color) = color {
            w.write_all(&color)?;
        }
    }
    // Counts and indices were range checked by `check_faces`.
    for face in &flat.faces {
        w.write_u8(face.len() as u8)?;
        for &v in face {
            w.write_i32::<B>(v as i32)?;
        }
    }
    Ok(())
}

/// A mesh checked and laid out for export, ready to be written.
///
/// Every precondition is checked when the encoder is built, so nothing is
/// written for a mesh that cannot be exported.
pub struct PlyEncoder<'a> {
    mesh: &'a GeometryBuffer,
    format: Format,
    layout: VertexLayout,
    flat: FlatMesh,
    header: Header,
}

impl<'a> PlyEncoder<'a> {
    pub fn new(mesh: &'a GeometryBuffer, config: &PlyConfig) -> Result<Self> {
        mesh.validate()?;
        let layout = VertexLayout::for_mesh(mesh, config);
        let flat = flatten(mesh, &layout);
        check_faces(&flat)?;

        let mut vertex = Element::new("vertex", flat.vertices.len());
        vertex.properties = layout.properties();
        let mut face = Element::new("face", flat.faces.len());
        face.properties
            .push(Property::list("vertex_indices", ScalarType::UInt8, ScalarType::Int32));

        let mut header = Header::new(config.format);
        if !config.comment.is_empty() {
            header.comments.push(config.comment.clone());
        }
        header.elements = vec![vertex, face];
        Ok(Self {
            mesh,
            format: config.format,
            layout,
            flat,
            header,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        self.header.write(w)?;
        match self.format {
            Format::Ascii => write_ascii_body(w, self.mesh, &self.layout, &self.flat)?,
            Format::BinaryLittleEndian => {
                write_binary_body::<LittleEndian, _>(w, self.mesh, &self.layout, &self.flat)?
            }
            Format::BinaryBigEndian => {
                write_binary_body::<BigEndian, _>(w, self.mesh, &self.layout, &self.flat)?
            }
        }
        log::debug!(
            "wrote {} PLY vertices and {} faces ({})",
            self.flat.vertices.len(),
            self.flat.faces.len(),
            self.format.keyword()
        );
        Ok(())
    }
}

/// Writes `mesh` as PLY, header and body.
pub fn write_to<W: Write>(w: &mut W, mesh: &GeometryBuffer, config: &PlyConfig) -> Result<()> {
    PlyEncoder::new(mesh, config)?.write(w)
}
