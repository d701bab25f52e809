use std::collections::HashSet;
use std::io::Cursor;

use meshport_mesh::{Error, GeometryBuffer, Triangle, TriangleMesh, Vector3, VertexIndex};
use meshport_stl::{StlConfig, StlReader, StlWriter};
use meshport_test_data::{STL_CUBE, STL_CUBE_ASCII};

#[test]
#[wasm_bindgen_test::wasm_bindgen_test]
fn parse_cube() {
    let mesh = meshport_stl::parse_stl::<VertexIndex>(STL_CUBE.bytes).unwrap();
    // Expect 12 triangles (2 per face x 6 faces)
    assert_eq!(STL_CUBE.triangles, mesh.triangle_count());
    assert_eq!(STL_CUBE.unique_vertices, mesh.points.len());
}

#[test]
#[wasm_bindgen_test::wasm_bindgen_test]
fn parse_ascii_cube() {
    let mesh = meshport_stl::parse_stl::<VertexIndex>(STL_CUBE_ASCII.bytes).unwrap();
    assert_eq!(STL_CUBE_ASCII.triangles, mesh.triangle_count());
    assert_eq!(STL_CUBE_ASCII.unique_vertices, mesh.points.len());
}

#[test]
fn both_encodings_agree() {
    let binary = meshport_stl::parse_stl::<Vec<Triangle>>(STL_CUBE.bytes).unwrap();
    let ascii = meshport_stl::parse_stl::<Vec<Triangle>>(STL_CUBE_ASCII.bytes).unwrap();
    assert_eq!(binary, ascii);

    // Expect a cube from 0-20 on x,y,z.
    assert_eq!(
        Triangle {
            p0: Vector3::new(0.0, 20.0, 20.0),
            p1: Vector3::new(20.0, 0.0, 20.0),
            p2: Vector3::new(20.0, 20.0, 20.0),
        },
        binary[0]
    );
}

// Triangle sets compared by position, independent of the vertex table order.
fn triangle_set(mesh: &VertexIndex) -> HashSet<[[u32; 3]; 3]> {
    mesh.triangles()
        .map(|t| t.points().map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]))
        .collect()
}

#[test]
fn binary_round_trip() {
    let cube = meshport_stl::parse_stl::<VertexIndex>(STL_CUBE.bytes).unwrap();

    let mut out = Cursor::new(Vec::new());
    let triangles: Vec<Triangle> = cube.triangles().collect();
    out.write_stl(&triangles, &StlConfig::binary()).unwrap();
    assert_eq!(84 + 50 * 12, out.get_ref().len());

    out.set_position(0);
    let decoded: VertexIndex = out.read_stl().unwrap();
    assert_eq!(triangle_set(&cube), triangle_set(&decoded));
    assert_eq!(cube.points.len(), decoded.points.len());
}

#[test]
fn ascii_round_trip_is_exact() {
    let soup = vec![Triangle {
        p0: Vector3::new(0.1, -2.5e-7, 1234.5678),
        p1: Vector3::new(1.0e7, 1.0 / 3.0, -0.0),
        p2: Vector3::new(7.0, 8.0, 9.0),
    }];
    let mut out = Cursor::new(Vec::new());
    out.write_stl(&soup, &StlConfig::ascii()).unwrap();

    out.set_position(0);
    let decoded: Vec<Triangle> = out.read_stl().unwrap();
    assert_eq!(soup, decoded);
}

#[test]
fn file_round_trip_from_faces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quad.stl");

    let quad = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    meshport_stl::write_stl(&path, [&quad[..]], &StlConfig::binary()).unwrap();
    assert_eq!(84 + 2 * 50, std::fs::metadata(&path).unwrap().len());

    let (tris, points) = meshport_stl::read_indexed(&path).unwrap();
    assert_eq!(quad, points);
    assert_eq!(vec![[0, 1, 2], [2, 3, 0]], tris);
}

#[test]
fn mesh_round_trip_through_ascii_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.stl");

    let cube = GeometryBuffer::from(meshport_stl::parse_stl::<VertexIndex>(STL_CUBE.bytes).unwrap());
    meshport_stl::write_mesh(&path, &cube, &StlConfig::ascii()).unwrap();

    let info = meshport_stl::read_info(&path).unwrap();
    assert_eq!(meshport_stl::Encoding::Ascii, info.encoding);
    assert_eq!(12, info.triangles);

    let decoded: GeometryBuffer = meshport_stl::read_stl(&path).unwrap();
    assert_eq!(cube.positions, decoded.positions);
    assert_eq!(cube.faces, decoded.faces);
}

#[test]
fn empty_mesh() {
    let mut out = Cursor::new(Vec::new());
    out.write_stl(&[], &StlConfig::binary()).unwrap();
    assert_eq!(84, out.get_ref().len());

    out.set_position(0);
    let decoded: VertexIndex = out.read_stl().unwrap();
    assert_eq!(0, decoded.triangle_count());
}

#[test]
fn truncated_file_is_an_error() {
    let data = &STL_CUBE.bytes[..STL_CUBE.bytes.len() - 10];
    let err = meshport_stl::parse_stl::<VertexIndex>(data).unwrap_err();
    assert!(matches!(err, Error::Truncated(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = meshport_stl::read_stl::<VertexIndex, _>(dir.path().join("missing.stl")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
#[wasm_bindgen_test::wasm_bindgen_test]
fn solid_header_with_trailing_byte_reads_as_binary() {
    let mut data = b"solid exported".to_vec();
    data.resize(80, 0);
    data.extend_from_slice(&1u32.to_le_bytes());
    for v in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        data.extend_from_slice(&v.to_le_bytes());
    }
    data.extend_from_slice(&[0, 0, 0xff]);
    let tris = meshport_stl::parse_stl::<Vec<Triangle>>(&data).unwrap();
    let expected = Triangle::new(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    );
    assert_eq!(vec![expected], tris);
}

#[test]
#[wasm_bindgen_test::wasm_bindgen_test]
fn garbled_ascii_is_a_format_error() {
    let mut data = STL_CUBE_ASCII.bytes.to_vec();
    let at = data.iter().position(|&b| b == b'\n').unwrap() + 3;
    data[at] = 0xc3;
    let err = meshport_stl::parse_stl::<VertexIndex>(&data).unwrap_err();
    assert!(matches!(err, Error::Format(_)));
}
