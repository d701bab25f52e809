//! Export of meshes as POV-Ray `mesh2` declarations.
//!
//! Each mesh becomes a `#declare` holding its vertex, normal, uv and texture
//! tables plus the per-triangle indices into them; `object` blocks then place
//! declared meshes in the scene. There is no reader.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use meshport_mesh::{GeometryBuffer, Result};

mod names;
mod writer;

pub use names::{clean_name, NameSet};
pub use writer::PovWriter;

/// Indentation unit for nested blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    None,
    Tab,
    Spaces(usize),
}

#[derive(Debug, Clone)]
pub struct PovConfig {
    pub indent: Indent,
    /// Put every list entry on its own line instead of one line per list.
    pub list_line_feed: bool,
    /// Texture faces by their vertex colors when the mesh has them, instead
    /// of by material.
    pub use_vertex_colors: bool,
}

impl Default for PovConfig {
    fn default() -> Self {
        Self {
            indent: Indent::Spaces(4),
            list_line_feed: false,
            use_vertex_colors: true,
        }
    }
}

/// Writes every mesh as a declaration followed by one untransformed instance
/// of it. Returns the identifiers the meshes were declared under.
pub fn write_pov<P, S>(p: P, meshes: &[(S, &GeometryBuffer)], config: &PovConfig) -> Result<Vec<String>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let mut writer = PovWriter::new(BufWriter::new(File::create(p)?), config.clone());
    writer.comment("Exported by meshport")?;
    let mut declared = Vec::with_capacity(meshes.len());
    for (name, mesh) in meshes {
        declared.push(writer.write_mesh(name.as_ref(), mesh)?);
    }
    for name in &declared {
        writer.write_instance(name, None)?;
    }
    writer.flush()?;
    Ok(declared)
}
