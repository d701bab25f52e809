use crate::dedup::AttributeDeduplicator;
use crate::geometry::{Triangle, Vector3};
use crate::{Face, GeometryBuffer, TriangleMesh};

/// Maintains geometry for a single facet.
///
/// This type must be paired with a list of vertices. The points here are only indices into
/// another vector. We do this so we can store each vertex as 4 bytes instead of the 12 bytes
/// required to store the entire Vector3. This has further savings if a vertex is reused.
///
/// As a simple example, consider a simple geometry such as:
///
///    *-------*
///    |\     /|
///    | \   / |
///    |  \ /  |
///    |   *   |
///    |  / \  |
///    | /   \ |
///    |/     \|
///    *-------*
///
/// Here we have 5 points and 4 facets. If we would store every facet as a series of points
/// we would need:
///    3 floats * 4b * 3 points * 4 facets = 144 bytes.
///
/// If instead we store:
///    3 floats * 4b * 5 points  = 60b
///  + 3 indices * 4b * 4 facets = 48b
///                              =======
///                               108b
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facet {
    pub p0: u32,
    pub p1: u32,
    pub p2: u32,
}

impl Facet {
    pub fn indices(&self) -> [u32; 3] {
        [self.p0, self.p1, self.p2]
    }
}

/// A triangle mesh whose facets reference a table of unique points.
#[derive(Debug, Clone, Default)]
pub struct VertexIndex {
    pub points: Vec<Vector3>,
    pub facets: Vec<Facet>,
}

impl VertexIndex {
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.facets.iter().map(|f| Triangle {
            p0: self.points[f.p0 as usize],
            p1: self.points[f.p1 as usize],
            p2: self.points[f.p2 as usize],
        })
    }

    /// Splits the mesh into its triangle index list and its unique points.
    pub fn into_parts(self) -> (Vec<[u32; 3]>, Vec<Vector3>) {
        let VertexIndex { points, facets } = self;
        (facets.iter().map(Facet::indices).collect(), points)
    }
}

impl TriangleMesh for VertexIndex {
    fn from_triangles(triangles: Vec<Triangle>) -> Self {
        // Triangle soup repeats every shared corner; equal coordinates collapse
        // onto a single point.
        let mut points = AttributeDeduplicator::new();
        let facets = triangles
            .iter()
            .map(|t| Facet {
                p0: points.insert(t.p0),
                p1: points.insert(t.p1),
                p2: points.insert(t.p2),
            })
            .collect();
        let points = points.into_values();
        log::debug!(
            "indexed {} triangles onto {} unique points",
            triangles.len(),
            points.len()
        );
        VertexIndex { points, facets }
    }

    fn triangle_count(&self) -> usize {
        self.facets.len()
    }

    fn as_triangle_slice(&self) -> Option<&[Triangle]> {
        None
    }
}

impl From<VertexIndex> for GeometryBuffer {
    fn from(mesh: VertexIndex) -> Self {
        let VertexIndex { points, facets } = mesh;
        GeometryBuffer {
            positions: points,
            faces: facets.iter().map(|f| Face::new(f.indices())).collect(),
            ..GeometryBuffer::default()
        }
    }
}
