use std::path::PathBuf;

use clap::{Parser, Subcommand};
use meshport_pov::Indent;

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Meshes to read (.stl or .ply).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output path; the extension (.stl, .ply, .pov or .inc) selects the format.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Write ASCII STL or PLY instead of binary.
    #[arg(long)]
    pub ascii: bool,

    /// Write big endian binary PLY.
    #[arg(long, conflicts_with = "ascii")]
    pub big_endian: bool,

    #[arg(long)]
    pub no_normals: bool,

    #[arg(long)]
    pub no_uvs: bool,

    #[arg(long)]
    pub no_colors: bool,

    /// Color faces by their material instead of by vertex colors.
    #[arg(long)]
    pub material_colors: bool,

    /// One list entry per line in POV output.
    #[arg(long)]
    pub line_feed: bool,

    /// Indentation of POV output: `tab`, `none` or a number of spaces.
    #[arg(long, default_value = "4", value_parser = parse_indent)]
    pub indent: Indent,
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    pub input: PathBuf,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert meshes between STL, PLY and POV-Ray.
    Convert(ConvertArgs),
    /// Print what a mesh file contains.
    Info(InfoArgs),
}

fn parse_indent(s: &str) -> Result<Indent, String> {
    match s {
        "tab" => Ok(Indent::Tab),
        "none" => Ok(Indent::None),
        _ => s
            .parse()
            .map(Indent::Spaces)
            .map_err(|_| format!("expected 'tab', 'none' or a number of spaces, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_flags() {
        let args = Args::try_parse_from([
            "meshport", "convert", "a.stl", "b.stl", "-o", "out.pov", "--indent", "tab", "--line-feed",
        ])
        .unwrap();
        let Commands::Convert(convert) = args.command else {
            panic!("expected convert");
        };
        assert_eq!(2, convert.inputs.len());
        assert_eq!(PathBuf::from("out.pov"), convert.output);
        assert_eq!(Indent::Tab, convert.indent);
        assert!(convert.line_feed);
        assert!(!convert.ascii);
    }

    #[test]
    fn indent_defaults_to_spaces() {
        let args = Args::try_parse_from(["meshport", "convert", "a.ply", "-o", "b.ply"]).unwrap();
        let Commands::Convert(convert) = args.command else {
            panic!("expected convert");
        };
        assert_eq!(Indent::Spaces(4), convert.indent);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Args::try_parse_from(["meshport", "convert", "-o", "b.ply"]).is_err());
        assert!(Args::try_parse_from(["meshport", "convert", "a.ply", "-o", "b.pov", "--indent", "wide"]).is_err());
        assert!(
            Args::try_parse_from(["meshport", "convert", "a.ply", "-o", "b.ply", "--ascii", "--big-endian"])
                .is_err()
        );
    }
}
