//! Reading and writing PLY polygon files.
//!
//! A PLY file is a text header declaring elements (`vertex`, `face`, ...) and
//! the typed properties of their rows, followed by the rows themselves as
//! ASCII or as little/big endian binary. Reading is driven by the header, so
//! elements and properties this crate has no use for are decoded and skipped.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use meshport_mesh::{GeometryBuffer, Result};

pub mod header;
mod read;
mod write;

pub use header::{Element, Format, Header, Property, ScalarType};
pub use read::{read_data, ElementData, PlyData, Value};
pub use write::{write_to, PlyEncoder, VertexLayout};

/// Where vertex colors come from on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    /// No color properties are written.
    None,
    /// The mesh's per-corner color table, when it has one.
    Vertex,
    /// The diffuse color of each face's material.
    Material,
}

#[derive(Debug, Clone)]
pub struct PlyConfig {
    pub format: Format,
    /// Written as a `comment` line; empty comments are left out.
    pub comment: String,
    pub normals: bool,
    pub uvs: bool,
    pub colors: ColorSource,
}

impl Default for PlyConfig {
    fn default() -> Self {
        Self {
            format: Format::Ascii,
            comment: "Created by meshport".to_string(),
            normals: true,
            uvs: true,
            colors: ColorSource::Vertex,
        }
    }
}

pub fn read_ply<P: AsRef<Path>>(p: P) -> Result<GeometryBuffer> {
    let f = BufReader::new(File::open(p)?);
    read_data(f)?.into_geometry()
}

pub fn parse_ply(data: &[u8]) -> Result<GeometryBuffer> {
    read_data(data)?.into_geometry()
}

pub fn write_ply<P: AsRef<Path>>(p: P, mesh: &GeometryBuffer, config: &PlyConfig) -> Result<()> {
    let encoder = PlyEncoder::new(mesh, config)?;
    let mut f = BufWriter::new(File::create(p)?);
    encoder.write(&mut f)?;
    f.flush()?;
    Ok(())
}

/// Header of a PLY file, for inspecting it without decoding the body.
pub fn read_header<P: AsRef<Path>>(p: P) -> Result<Header> {
    let mut f = BufReader::new(File::open(p)?);
    Header::read(&mut f)
}
