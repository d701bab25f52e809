use cgmath::{InnerSpace, Zero};

use crate::error::{Error, Result};

pub type Vector3 = cgmath::Vector3<f32>;

// We rely on Vector3 being repr(c).
static_assertions::assert_eq_size!(Vector3, [f32; 3]);
static_assertions::assert_eq_align!(Vector3, f32);

#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Triangle {
    pub p0: Vector3,
    pub p1: Vector3,
    pub p2: Vector3,
}

impl Triangle {
    pub fn new(p0: Vector3, p1: Vector3, p2: Vector3) -> Self {
        Self { p0, p1, p2 }
    }

    pub fn points(&self) -> [Vector3; 3] {
        [self.p0, self.p1, self.p2]
    }

    /// Unit normal following the winding order (counter-clockwise is front
    /// facing). Degenerate triangles yield the zero vector.
    pub fn normal(&self) -> Vector3 {
        normal_of(self.p0, self.p1, self.p2)
    }
}

impl std::default::Default for Triangle {
    fn default() -> Self {
        Self {
            p0: Vector3::zero(),
            p1: Vector3::zero(),
            p2: Vector3::zero(),
        }
    }
}

pub(crate) fn normal_of(p0: Vector3, p1: Vector3, p2: Vector3) -> Vector3 {
    let n = (p1 - p0).cross(p2 - p0);
    if n.magnitude2() > 0.0 {
        n.normalize()
    } else {
        Vector3::zero()
    }
}

/// Returns the corner triples that split a polygon with `arity` corners into
/// triangles.
///
/// Quads are always split along the 0-2 diagonal into `(0, 1, 2)` and
/// `(2, 3, 0)`. Larger polygons are fanned around the first corner.
pub fn triangulate(arity: usize) -> Result<Vec<[usize; 3]>> {
    match arity {
        0..=2 => Err(Error::precondition(format!(
            "a face needs at least 3 vertices, got {arity}"
        ))),
        3 => Ok(vec![[0, 1, 2]]),
        4 => Ok(vec![[0, 1, 2], [2, 3, 0]]),
        n => Ok((1..n - 1).map(|i| [0, i, i + 1]).collect()),
    }
}

/// Splits a polygon given by its corner values into triangles.
pub fn triangulate_polygon<T: Copy>(corners: &[T]) -> Result<Vec<[T; 3]>> {
    Ok(triangulate(corners.len())?
        .into_iter()
        .map(|[a, b, c]| [corners[a], corners[b], corners[c]])
        .collect())
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn quads_split_along_first_diagonal() {
        assert_eq!(vec![[0, 1, 2], [2, 3, 0]], triangulate(4).unwrap());
        assert_eq!(
            vec![[10, 11, 12], [12, 13, 10]],
            triangulate_polygon(&[10u32, 11, 12, 13]).unwrap()
        );
    }

    #[test]
    fn ngons_are_fanned() {
        assert_eq!(
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]],
            triangulate(5).unwrap()
        );
    }

    #[test]
    fn degenerate_faces_are_rejected() {
        assert!(matches!(triangulate(2), Err(Error::Precondition(_))));
        assert!(matches!(triangulate(0), Err(Error::Precondition(_))));
    }

    #[test]
    fn normal_follows_winding() {
        let t = Triangle::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let n = t.normal();
        assert_float_eq!(n.z, 1.0, abs <= 0.0001);

        let flipped = Triangle::new(t.p0, t.p2, t.p1);
        assert_float_eq!(flipped.normal().z, -1.0, abs <= 0.0001);
    }

    #[test]
    fn degenerate_triangle_has_zero_normal() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(Vector3::zero(), Triangle::new(p, p, p).normal());
    }
}
