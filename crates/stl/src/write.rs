use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use meshport_mesh::{triangulate_polygon, Error, Result, Triangle, Vector3};

use crate::StlConfig;

/// Turns faces given as position lists into triangles.
///
/// Quads split into `(0, 1, 2)` and `(2, 3, 0)`, larger polygons are fanned.
pub fn triangulate_faces<I, F>(faces: I) -> Result<Vec<Triangle>>
where
    I: IntoIterator<Item = F>,
    F: AsRef<[Vector3]>,
{
    let mut triangles = Vec::new();
    for (i, face) in faces.into_iter().enumerate() {
        let face = face.as_ref();
        let tris = triangulate_polygon(face).map_err(|_| {
            Error::precondition(format!("face {i} has {} vertices, at least 3 are required", face.len()))
        })?;
        triangles.extend(tris.into_iter().map(|[p0, p1, p2]| Triangle { p0, p1, p2 }));
    }
    Ok(triangles)
}

fn write_vector<W: Write>(w: &mut W, v: Vector3) -> std::io::Result<()> {
    w.write_f32::<LittleEndian>(v.x)?;
    w.write_f32::<LittleEndian>(v.y)?;
    w.write_f32::<LittleEndian>(v.z)
}

/// Writes binary STL. The output only depends on the triangles and the
/// config.
pub fn write_binary<W: Write>(w: &mut W, triangles: &[Triangle], config: &StlConfig) -> Result<()> {
    let count = u32::try_from(triangles.len()).map_err(|_| {
        Error::precondition(format!(
            "{} triangles do not fit into a binary STL",
            triangles.len()
        ))
    })?;

    let mut header = [0u8; 80];
    let text = config.header.as_bytes();
    let n = text.len().min(header.len());
    header[..n].copy_from_slice(&text[..n]);
    w.write_all(&header)?;

    w.write_u32::<LittleEndian>(count)?;
    for t in triangles {
        write_vector(w, t.normal())?;
        write_vector(w, t.p0)?;
        write_vector(w, t.p1)?;
        write_vector(w, t.p2)?;
        w.write_u16::<LittleEndian>(config.attribute)?;
    }
    log::debug!("wrote {count} triangles as binary STL");
    Ok(())
}

/// Writes ASCII STL. Numbers use the shortest representation that reads back
/// to the same `f32`.
pub fn write_ascii<W: Write>(w: &mut W, triangles: &[Triangle], config: &StlConfig) -> Result<()> {
    let name = &config.solid_name;
    writeln!(w, "solid {name}")?;
    for t in triangles {
        let n = t.normal();
        writeln!(w, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(w, "    outer loop")?;
        for p in t.points() {
            writeln!(w, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(w, "    endloop")?;
        writeln!(w, "  endfacet")?;
    }
    writeln!(w, "endsolid {name}")?;
    log::debug!("wrote {} triangles as ASCII STL", triangles.len());
    Ok(())
}
