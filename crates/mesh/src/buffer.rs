use std::borrow::Cow;

use cgmath::{InnerSpace, Zero};

use crate::dedup::{AttributeDeduplicator, DedupKey};
use crate::error::{Error, Result};
use crate::geometry::{normal_of, Triangle, Vector3};
use crate::TriangleMesh;

pub type Uv = [f32; 2];
/// Linear RGB, each channel in `0.0..=1.0`.
pub type Color = [f32; 3];

/// One polygon of a [`GeometryBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Indices into the position table, in winding order.
    pub vertices: Vec<u32>,
    /// Smooth faces use per-vertex normals, flat faces their face normal.
    pub smooth: bool,
    /// Index into the buffer's material list.
    pub material: u32,
}

impl Face {
    pub fn new<V: Into<Vec<u32>>>(vertices: V) -> Self {
        Self {
            vertices: vertices.into(),
            smooth: false,
            material: 0,
        }
    }

    pub fn smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_material(mut self, material: u32) -> Self {
        self.material = material;
        self
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex index triples of this face after triangulation.
    pub fn triangles(&self) -> Result<Vec<[u32; 3]>> {
        crate::geometry::triangulate_polygon(&self.vertices)
    }
}

/// Unique attribute values plus, for every face, one index per corner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeTable<T> {
    pub values: Vec<T>,
    pub indices: Vec<Vec<u32>>,
}

impl<T> AttributeTable<T> {
    /// The value at `corner` of face `face`.
    pub fn corner(&self, face: usize, corner: usize) -> Option<&T> {
        let index = *self.indices.get(face)?.get(corner)?;
        self.values.get(index as usize)
    }

    /// Resolves all corner values of one face.
    pub fn face_values(&self, face: usize) -> impl Iterator<Item = &T> + '_ {
        self.indices
            .get(face)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.values.get(i as usize))
    }
}

impl<T: DedupKey> AttributeTable<T> {
    /// Builds a table from per-face lists of corner values.
    pub fn from_corners<I, F>(faces: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: IntoIterator<Item = T>,
    {
        let mut dedup = AttributeDeduplicator::new();
        let indices = faces
            .into_iter()
            .map(|corners| corners.into_iter().map(|v| dedup.insert(v)).collect())
            .collect();
        Self {
            values: dedup.into_values(),
            indices,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Color,
    /// Share of light filtered through the surface, tinted by `diffuse`.
    pub filter: f32,
    /// Share of light passing through unaltered.
    pub transmit: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            diffuse: [0.8, 0.8, 0.8],
            filter: 0.0,
            transmit: 0.0,
        }
    }
}

/// An in-memory mesh snapshot handed to (or produced by) a codec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryBuffer {
    pub positions: Vec<Vector3>,
    pub faces: Vec<Face>,
    /// One normal per position.
    pub vertex_normals: Option<Vec<Vector3>>,
    /// One normal per face.
    pub face_normals: Option<Vec<Vector3>>,
    pub uvs: Option<AttributeTable<Uv>>,
    pub colors: Option<AttributeTable<Color>>,
    pub materials: Vec<Material>,
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_polygons<F: Into<Vec<u32>>>(
        positions: Vec<Vector3>,
        faces: impl IntoIterator<Item = F>,
    ) -> Self {
        Self {
            positions,
            faces: faces.into_iter().map(Face::new).collect(),
            ..Self::default()
        }
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Checks that every index is in range and that all attribute arrays match
    /// the face list.
    pub fn validate(&self) -> Result<()> {
        let n_positions = self.positions.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(Error::precondition(format!(
                    "face {fi} has {} vertices, at least 3 are required",
                    face.len()
                )));
            }
            if let Some(&v) = face.vertices.iter().find(|&&v| v as usize >= n_positions) {
                return Err(Error::precondition(format!(
                    "face {fi} references vertex {v}, but there are only {n_positions}"
                )));
            }
        }
        if let Some(normals) = &self.vertex_normals {
            if normals.len() != n_positions {
                return Err(Error::precondition(format!(
                    "{} vertex normals for {n_positions} vertices",
                    normals.len()
                )));
            }
        }
        if let Some(normals) = &self.face_normals {
            if normals.len() != self.faces.len() {
                return Err(Error::precondition(format!(
                    "{} face normals for {} faces",
                    normals.len(),
                    self.faces.len()
                )));
            }
        }
        if let Some(uvs) = &self.uvs {
            self.validate_table("uv", uvs)?;
        }
        if let Some(colors) = &self.colors {
            self.validate_table("color", colors)?;
        }
        Ok(())
    }

    fn validate_table<T>(&self, what: &str, table: &AttributeTable<T>) -> Result<()> {
        if table.indices.len() != self.faces.len() {
            return Err(Error::precondition(format!(
                "{what} table covers {} faces, mesh has {}",
                table.indices.len(),
                self.faces.len()
            )));
        }
        for (fi, (face, indices)) in self.faces.iter().zip(&table.indices).enumerate() {
            if indices.len() != face.len() {
                return Err(Error::precondition(format!(
                    "face {fi} has {} corners but {} {what} indices",
                    face.len(),
                    indices.len()
                )));
            }
            if indices.iter().any(|&i| i as usize >= table.values.len()) {
                return Err(Error::precondition(format!(
                    "face {fi} references a {what} outside of the table"
                )));
            }
        }
        Ok(())
    }

    /// Number of triangles after triangulating every face.
    pub fn triangle_count(&self) -> usize {
        self.faces
            .iter()
            .map(|f| f.len().saturating_sub(2))
            .sum()
    }

    /// Iterates the triangulated faces as positions.
    ///
    /// Faces are expected to be valid, see [`GeometryBuffer::validate`].
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().flat_map(move |face| {
            face.triangles()
                .unwrap_or_default()
                .into_iter()
                .map(move |[a, b, c]| {
                    Triangle::new(
                        self.positions[a as usize],
                        self.positions[b as usize],
                        self.positions[c as usize],
                    )
                })
        })
    }

    /// Face normals from the winding of each face's first triangle.
    pub fn compute_face_normals(&self) -> Vec<Vector3> {
        self.faces
            .iter()
            .map(|face| match face.vertices[..] {
                [a, b, c, ..] => normal_of(
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.positions[c as usize],
                ),
                _ => Vector3::zero(),
            })
            .collect()
    }

    /// Vertex normals as the normalized sum of the adjacent face normals.
    pub fn compute_vertex_normals(&self) -> Vec<Vector3> {
        let face_normals = match &self.face_normals {
            Some(normals) => Cow::Borrowed(normals),
            None => Cow::Owned(self.compute_face_normals()),
        };
        let mut normals = vec![Vector3::zero(); self.positions.len()];
        for (face, n) in self.faces.iter().zip(face_normals.iter()) {
            for &v in &face.vertices {
                normals[v as usize] += *n;
            }
        }
        for n in &mut normals {
            if n.magnitude2() > 0.0 {
                *n = n.normalize();
            }
        }
        normals
    }

    /// Fills in whichever normal arrays are missing.
    pub fn ensure_normals(&mut self) {
        if self.face_normals.is_none() {
            self.face_normals = Some(self.compute_face_normals());
        }
        if self.vertex_normals.is_none() {
            self.vertex_normals = Some(self.compute_vertex_normals());
        }
    }

    /// The normal used at one corner: the vertex normal on smooth faces, the
    /// face normal on flat ones. Falls back to the other kind when only one
    /// is present.
    pub fn corner_normal(&self, face: usize, corner: usize) -> Option<Vector3> {
        let f = self.faces.get(face)?;
        let vertex = *f.vertices.get(corner)? as usize;
        let by_vertex = || self.vertex_normals.as_ref()?.get(vertex).copied();
        let by_face = || self.face_normals.as_ref()?.get(face).copied();
        if f.smooth {
            by_vertex().or_else(by_face)
        } else {
            by_face().or_else(by_vertex)
        }
    }

    pub fn has_normals(&self) -> bool {
        self.vertex_normals.is_some() || self.face_normals.is_some()
    }

    /// The material bound to a face, or the default material when the index is
    /// out of range (including meshes without materials).
    pub fn face_material(&self, face: &Face) -> Cow<'_, Material> {
        match self.materials.get(face.material as usize) {
            Some(m) => Cow::Borrowed(m),
            None => Cow::Owned(Material::default()),
        }
    }
}

impl TriangleMesh for GeometryBuffer {
    fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let mut points = AttributeDeduplicator::new();
        let faces = triangles
            .iter()
            .map(|t| Face::new(t.points().map(|p| points.insert(p))))
            .collect();
        Self {
            positions: points.into_values(),
            faces,
            ..Self::default()
        }
    }

    fn triangle_count(&self) -> usize {
        GeometryBuffer::triangle_count(self)
    }

    fn as_triangle_slice(&self) -> Option<&[Triangle]> {
        None
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

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

    #[test]
    fn quad_triangulates_into_two() {
        let mesh = quad();
        assert_eq!(2, mesh.triangle_count());
        let tris: Vec<_> = mesh.triangles().collect();
        assert_eq!(mesh.positions[2], tris[1].p0);
        assert_eq!(mesh.positions[3], tris[1].p1);
        assert_eq!(mesh.positions[0], tris[1].p2);
    }

    #[test]
    fn validate_rejects_bad_indices() {
        let mut mesh = quad();
        mesh.faces.push(Face::new(vec![0, 1, 7]));
        assert!(matches!(mesh.validate(), Err(Error::Precondition(_))));

        let mut mesh = quad();
        mesh.faces.push(Face::new(vec![0, 1]));
        assert!(matches!(mesh.validate(), Err(Error::Precondition(_))));
    }

    #[test]
    fn validate_checks_attribute_arity() {
        let mut mesh = quad();
        mesh.uvs = Some(AttributeTable {
            values: vec![[0.0, 0.0]],
            indices: vec![vec![0, 0, 0]],
        });
        assert!(matches!(mesh.validate(), Err(Error::Precondition(_))));

        mesh.uvs = Some(AttributeTable::from_corners(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ]]));
        mesh.validate().unwrap();
    }

    #[test]
    fn corner_normals_follow_shading() {
        let mut mesh = quad();
        mesh.vertex_normals = Some(vec![Vector3::new(1.0, 0.0, 0.0); 4]);
        mesh.ensure_normals();
        assert_float_eq!(mesh.corner_normal(0, 1).unwrap().z, 1.0, abs <= 0.0001);

        mesh.faces[0].smooth = true;
        assert_float_eq!(mesh.corner_normal(0, 1).unwrap().x, 1.0, abs <= 0.0001);
    }

    #[test]
    fn vertex_normals_average_adjacent_faces() {
        let mut mesh = quad();
        mesh.faces = vec![Face::new(vec![0, 1, 2]), Face::new(vec![0, 2, 3])];
        let normals = mesh.compute_vertex_normals();
        for n in normals {
            assert_float_eq!(n.z, 1.0, abs <= 0.0001);
        }
    }

    #[test]
    fn missing_material_falls_back_to_default() {
        let mesh = quad();
        assert_eq!("Default", mesh.face_material(&mesh.faces[0]).name);
    }

    #[test]
    fn from_triangles_shares_vertices() {
        let mesh = quad();
        let rebuilt = GeometryBuffer::from_triangles(mesh.triangles().collect());
        assert_eq!(4, rebuilt.positions.len());
        assert_eq!(2, rebuilt.faces.len());
    }
}
