mod buffer;
mod dedup;
mod error;
mod geometry;
mod vertex_index;

pub use buffer::*;
pub use dedup::*;
pub use error::*;
pub use geometry::*;
pub use vertex_index::*;

/// A reasonable default mesh to select for unopinionated consumers.
pub type DefaultMesh = VertexIndex;

pub trait TriangleMesh: Sized {
    /// Creates a TriangleMesh from a list of triangles.
    ///
    /// # Arguments
    ///
    /// * `triangles` - A vector of the triangles of the mesh.
    fn from_triangles(triangles: Vec<Triangle>) -> Self;

    /// Returns the number of triangles that comprises this mesh.
    fn triangle_count(&self) -> usize;

    /// Returns a slice that represents a series of triangles.
    ///
    /// As this is returning a slice, this will only return `Some` if the
    /// implementation already stores the mesh in this format.
    fn as_triangle_slice(&self) -> Option<&[Triangle]>;
}

/// Triangle soup kept as is, without sharing vertices.
impl TriangleMesh for Vec<Triangle> {
    fn from_triangles(triangles: Vec<Triangle>) -> Self {
        triangles
    }

    fn triangle_count(&self) -> usize {
        self.len()
    }

    fn as_triangle_slice(&self) -> Option<&[Triangle]> {
        Some(self.as_slice())
    }
}
