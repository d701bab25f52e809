pub struct TestModel {
    pub bytes: &'static [u8],
    pub triangles: usize,
    pub unique_vertices: usize,
}

/// A cube spanning 0-20 on every axis, two triangles per side.
pub const STL_CUBE: TestModel = TestModel {
    bytes: include_bytes!("../../../res/cube/cube-bin.stl"),
    triangles: 12,
    unique_vertices: 8,
};

/// The same cube as [`STL_CUBE`], ASCII encoded.
pub const STL_CUBE_ASCII: TestModel = TestModel {
    bytes: include_bytes!("../../../res/cube/cube-ascii.stl"),
    triangles: 12,
    unique_vertices: 8,
};

/// Two quads sharing an edge with normals, UVs and vertex colors.
pub const PLY_PLANE: TestModel = TestModel {
    bytes: include_bytes!("../../../res/plane/plane.ply"),
    triangles: 4,
    unique_vertices: 6,
};
