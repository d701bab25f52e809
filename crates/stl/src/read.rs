use std::io::{BufRead, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use meshport_mesh::{Error, Result, Triangle, TruncationContext, Vector3};

use crate::Encoding;

const HEADER_LEN: u64 = 80;
const TRIANGLE_LEN: u64 = 50;

/// Guesses the encoding of the STL data at the current position of `f`,
/// leaving the position unchanged.
///
/// ASCII files must start with `solid`. Some binary exporters also start their
/// header with `solid`, so data whose size matches the binary layout exactly
/// is treated as binary regardless of its first bytes, as is data with bytes
/// that never appear in ASCII STL and room for every declared triangle.
pub fn detect_encoding<T: Read + Seek>(f: &mut T) -> Result<Encoding> {
    let start = f.stream_position()?;
    let len = f.seek(SeekFrom::End(0))? - start;
    f.seek(SeekFrom::Start(start))?;

    let mut head = Vec::with_capacity(HEADER_LEN as usize + 4);
    f.by_ref().take(HEADER_LEN + 4).read_to_end(&mut head)?;
    f.seek(SeekFrom::Start(start))?;

    let text = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &head[i..])
        .unwrap_or_default();
    if !text.starts_with(b"solid") {
        return Ok(Encoding::Binary);
    }
    if head.len() == HEADER_LEN as usize + 4 {
        let count = u32::from_le_bytes([head[80], head[81], head[82], head[83]]) as u64;
        let binary_len = HEADER_LEN + 4 + count * TRIANGLE_LEN;
        if binary_len == len {
            log::debug!("binary STL with a header starting with 'solid'");
            return Ok(Encoding::Binary);
        }
        if binary_len < len && head.iter().any(|&b| b == 0 || !b.is_ascii()) {
            log::debug!("binary STL with a 'solid' header and trailing bytes");
            return Ok(Encoding::Binary);
        }
    }
    Ok(Encoding::Ascii)
}

fn read_vector<T: Read>(f: &mut T) -> std::io::Result<Vector3> {
    Ok(Vector3 {
        x: f.read_f32::<LittleEndian>()?,
        y: f.read_f32::<LittleEndian>()?,
        z: f.read_f32::<LittleEndian>()?,
    })
}

/// Reads binary STL triangles from the current position of `f`.
pub fn read_binary<T: Read>(f: &mut T) -> Result<Vec<Triangle>> {
    // Binary files start with an 80 byte header. There is no defined structure for this
    // header but some implementations will stash some metadata in this header. For now
    // we'll just skip the header and load the geometry.
    let mut header = [0u8; HEADER_LEN as usize];
    f.read_exact(&mut header)
        .or_truncated(|| "STL header is shorter than 80 bytes".to_string())?;

    // Immediately following the header is an unsigned 32-bit integer that indicates the
    // number of triagles that follow.
    let n_triangles = f
        .read_u32::<LittleEndian>()
        .or_truncated(|| "missing STL triangle count".to_string())? as usize;

    // Don't trust the count for the allocation; a corrupt header would
    // otherwise reserve gigabytes before the first read fails.
    let mut data = Vec::<Triangle>::with_capacity(n_triangles.min(1 << 16));
    for i in 0..n_triangles {
        let truncated = || format!("STL declares {n_triangles} triangles but ends in triangle {i}");
        // Each triangle is specified by a normal vector followed by 3 verticies of the
        // triangle. While the normal vector may be included, it is generally expected
        // that verticies be listed in counter-clockwise order and so the normal vector
        // maybe specified as (0, 0, 0).
        let _normal = read_vector(f).or_truncated(truncated)?;
        let p0 = read_vector(f).or_truncated(truncated)?;
        let p1 = read_vector(f).or_truncated(truncated)?;
        let p2 = read_vector(f).or_truncated(truncated)?;
        data.push(Triangle { p0, p1, p2 });
        // After the triangle geometry there is a 2-byte unsigned integer called the
        // "attribute byte count". There is no standard structure of this field, but
        // some applications use this for color data.
        let _attribute_byte_count = f.read_u16::<LittleEndian>().or_truncated(truncated)?;
    }
    log::debug!("read {} triangles from binary STL", data.len());
    Ok(data)
}

/// Reads ASCII STL line by line, keeping track of line numbers for errors.
struct Lines<R> {
    inner: R,
    raw: Vec<u8>,
    buf: String,
    number: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            raw: Vec::new(),
            buf: String::new(),
            number: 0,
        }
    }

    /// Moves to the next non-blank line. Returns `false` at the end of input.
    fn advance(&mut self) -> Result<bool> {
        loop {
            self.raw.clear();
            if self.inner.read_until(b'\n', &mut self.raw)? == 0 {
                return Ok(false);
            }
            self.number += 1;
            self.buf.clear();
            match std::str::from_utf8(&self.raw) {
                Ok(line) => self.buf.push_str(line),
                Err(_) => return Err(self.error("not valid UTF-8 text")),
            }
            if !self.buf.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    /// Like `advance`, but running out of input is an error.
    fn require(&mut self, missing: &str) -> Result<()> {
        if self.advance()? {
            Ok(())
        } else {
            Err(Error::truncated(missing.to_string()))
        }
    }

    fn tokens(&self) -> Vec<&str> {
        self.buf.split_whitespace().collect()
    }

    fn error(&self, msg: impl std::fmt::Display) -> Error {
        Error::format(format!("line {}: {}", self.number, msg))
    }
}

fn parse_coords<R: BufRead>(lines: &Lines<R>, tokens: &[&str]) -> Result<Vector3> {
    let mut coords = [0f32; 3];
    for (c, token) in coords.iter_mut().zip(tokens) {
        *c = token
            .parse()
            .map_err(|_| lines.error(format_args!("invalid number '{token}'")))?;
    }
    Ok(Vector3::from(coords))
}

/// Expects a line made of exactly `keywords`, e.g. `outer loop`.
fn expect_keywords<R: BufRead>(lines: &mut Lines<R>, keywords: &[&str]) -> Result<()> {
    let expected = keywords.join(" ");
    lines.require(&format!("expected '{expected}' before end of input"))?;
    let tokens = lines.tokens();
    if tokens != keywords {
        let found = tokens.join(" ");
        return Err(lines.error(format_args!("expected '{expected}', found '{found}'")));
    }
    Ok(())
}

fn read_vertex<R: BufRead>(lines: &mut Lines<R>) -> Result<Vector3> {
    lines.require("facet ends before its third vertex")?;
    let tokens = lines.tokens();
    match tokens.as_slice() {
        ["vertex", coords @ ..] if coords.len() == 3 => parse_coords(lines, coords),
        ["vertex", coords @ ..] => Err(lines.error(format_args!(
            "vertex needs 3 coordinates, found {}",
            coords.len()
        ))),
        _ => Err(lines.error(format_args!("expected 'vertex', found '{}'", tokens.join(" ")))),
    }
}

/// Reads ASCII STL.
pub fn read_ascii<R: BufRead>(r: R) -> Result<Vec<Triangle>> {
    let mut lines = Lines::new(r);

    lines.require("empty STL file")?;
    if lines.tokens().first() != Some(&"solid") {
        return Err(lines.error("ASCII STL must start with 'solid'"));
    }

    let mut data = Vec::new();
    loop {
        lines.require("missing 'endsolid'")?;
        let tokens = lines.tokens();
        match tokens.as_slice() {
            ["endsolid", ..] => break,
            ["facet", "normal", normal @ ..] => {
                if normal.len() != 3 {
                    return Err(lines.error(format_args!(
                        "facet normal needs 3 components, found {}",
                        normal.len()
                    )));
                }
                // Validated but dropped, like the binary normal.
                parse_coords(&lines, normal)?;
            }
            _ => {
                let found = tokens.join(" ");
                return Err(lines.error(format_args!("expected 'facet normal', found '{found}'")));
            }
        }
        expect_keywords(&mut lines, &["outer", "loop"])?;
        let p0 = read_vertex(&mut lines)?;
        let p1 = read_vertex(&mut lines)?;
        let p2 = read_vertex(&mut lines)?;
        data.push(Triangle { p0, p1, p2 });
        expect_keywords(&mut lines, &["endloop"])?;
        expect_keywords(&mut lines, &["endfacet"])?;
    }
    log::debug!("read {} triangles from ASCII STL", data.len());
    Ok(data)
}
