//! Reading and writing STL triangle soup.
//!
//! Binary files are an 80 byte header, a little endian `u32` triangle count
//! and 50 bytes per triangle: a normal and three vertices as `f32` followed by
//! a 2 byte "attribute byte count". ASCII files spell the same data out with
//! `solid`/`facet normal`/`outer loop`/`vertex` keywords.
//!
//! Normals stored in a file are not kept on import; consumers recompute them
//! from the winding order. On export every triangle gets the normal implied
//! by its winding.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use meshport_mesh::{GeometryBuffer, Result, Triangle, TriangleMesh, Vector3, VertexIndex};

mod read;
mod write;

pub use read::{detect_encoding, read_ascii, read_binary};
pub use write::{triangulate_faces, write_ascii, write_binary};

/// The two encodings of STL files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Binary,
}

#[derive(Debug, Clone)]
pub struct StlConfig {
    pub encoding: Encoding,
    /// Text placed in the 80 byte binary header. Longer text is cut off.
    pub header: String,
    /// Name following `solid`/`endsolid` in ASCII files.
    pub solid_name: String,
    /// Value of the per-triangle attribute field in binary files.
    pub attribute: u16,
}

impl StlConfig {
    pub fn binary() -> Self {
        Self::default()
    }

    pub fn ascii() -> Self {
        Self {
            encoding: Encoding::Ascii,
            ..Self::default()
        }
    }
}

impl Default for StlConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Binary,
            header: "Exported by meshport".to_string(),
            solid_name: "meshport".to_string(),
            attribute: 0,
        }
    }
}

fn read_any<M: TriangleMesh, T: Read + Seek>(f: &mut T) -> Result<M> {
    let triangles = match detect_encoding(f)? {
        Encoding::Binary => {
            let triangles = read_binary(f)?;
            let end = f.stream_position()?;
            let len = f.seek(SeekFrom::End(0))?;
            if len > end {
                log::warn!("ignoring {} bytes after the last STL triangle", len - end);
            }
            triangles
        }
        Encoding::Ascii => read_ascii(std::io::BufReader::new(f))?,
    };
    Ok(M::from_triangles(triangles))
}

/// Reads an STL file of either encoding.
pub fn read_stl<M: TriangleMesh, P: AsRef<Path>>(p: P) -> Result<M> {
    let mut f = BufReader::new(File::open(p)?);
    read_any(&mut f)
}

pub fn parse_stl<M: TriangleMesh>(data: &[u8]) -> Result<M> {
    let mut c = std::io::Cursor::new(data);
    read_any(&mut c)
}

/// Reads an STL file into a triangle index list and its unique vertices.
pub fn read_indexed<P: AsRef<Path>>(p: P) -> Result<(Vec<[u32; 3]>, Vec<Vector3>)> {
    Ok(read_stl::<VertexIndex, _>(p)?.into_parts())
}

pub trait StlReader: Read {
    fn read_stl<M: TriangleMesh>(&mut self) -> Result<M>;
}

impl<T: Read + Seek> StlReader for T {
    fn read_stl<M: TriangleMesh>(&mut self) -> Result<M> {
        read_any(self)
    }
}

/// Writes faces given as lists of positions.
///
/// Faces with more than three corners are triangulated; faces with fewer
/// are rejected.
pub fn write_stl<P, I, F>(p: P, faces: I, config: &StlConfig) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = F>,
    F: AsRef<[Vector3]>,
{
    let triangles = triangulate_faces(faces)?;
    write_triangles(p, &triangles, config)
}

/// Writes every face of a mesh, triangulated.
pub fn write_mesh<P: AsRef<Path>>(p: P, mesh: &GeometryBuffer, config: &StlConfig) -> Result<()> {
    mesh.validate()?;
    let triangles: Vec<Triangle> = mesh.triangles().collect();
    write_triangles(p, &triangles, config)
}

fn write_triangles<P: AsRef<Path>>(p: P, triangles: &[Triangle], config: &StlConfig) -> Result<()> {
    let mut f = BufWriter::new(File::create(p)?);
    match config.encoding {
        Encoding::Binary => write_binary(&mut f, triangles, config)?,
        Encoding::Ascii => write_ascii(&mut f, triangles, config)?,
    }
    f.flush()?;
    Ok(())
}

pub trait StlWriter: Write {
    fn write_stl(&mut self, triangles: &[Triangle], config: &StlConfig) -> Result<()>;
}

impl<T: Write> StlWriter for T {
    fn write_stl(&mut self, triangles: &[Triangle], config: &StlConfig) -> Result<()> {
        match config.encoding {
            Encoding::Binary => write_binary(self, triangles, config),
            Encoding::Ascii => write_ascii(self, triangles, config),
        }
    }
}

/// Summary of an STL file without building a mesh from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StlInfo {
    pub encoding: Encoding,
    pub triangles: usize,
}

pub fn read_info<P: AsRef<Path>>(p: P) -> Result<StlInfo> {
    let mut f = BufReader::new(File::open(p)?);
    let encoding = detect_encoding(&mut f)?;
    let triangles: Vec<Triangle> = read_any(&mut f)?;
    Ok(StlInfo {
        encoding,
        triangles: triangles.len(),
    })
}
