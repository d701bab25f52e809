use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use meshport_mesh::{Error, Result};

/// Body encoding declared by the `format` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl Format {
    pub fn keyword(self) -> &'static str {
        match self {
            Format::Ascii => "ascii",
            Format::BinaryLittleEndian => "binary_little_endian",
            Format::BinaryBigEndian => "binary_big_endian",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascii" => Ok(Format::Ascii),
            "binary_little_endian" => Ok(Format::BinaryLittleEndian),
            "binary_big_endian" => Ok(Format::BinaryBigEndian),
            _ => Err(Error::format(format!("unknown PLY format '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ScalarType {
    pub fn keyword(self) -> &'static str {
        match self {
            ScalarType::Int8 => "char",
            ScalarType::UInt8 => "uchar",
            ScalarType::Int16 => "short",
            ScalarType::UInt16 => "ushort",
            ScalarType::Int32 => "int",
            ScalarType::UInt32 => "uint",
            ScalarType::Float32 => "float",
            ScalarType::Float64 => "double",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }

    /// Whether `value` lies within the range of this type.
    pub fn holds(self, value: f64) -> bool {
        let (min, max) = match self {
            ScalarType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            ScalarType::UInt8 => (0.0, u8::MAX as f64),
            ScalarType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            ScalarType::UInt16 => (0.0, u16::MAX as f64),
            ScalarType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            ScalarType::UInt32 => (0.0, u32::MAX as f64),
            ScalarType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            ScalarType::Float64 => return !value.is_nan(),
        };
        (min..=max).contains(&value)
    }
}

impl FromStr for ScalarType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "char" | "int8" => ScalarType::Int8,
            "uchar" | "uint8" => ScalarType::UInt8,
            "short" | "int16" => ScalarType::Int16,
            "ushort" | "uint16" => ScalarType::UInt16,
            "int" | "int32" => ScalarType::Int32,
            "uint" | "uint32" => ScalarType::UInt32,
            "float" | "float32" => ScalarType::Float32,
            "double" | "float64" => ScalarType::Float64,
            _ => return Err(Error::format(format!("unknown PLY type '{s}'"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Scalar {
        name: String,
        ty: ScalarType,
    },
    List {
        name: String,
        count: ScalarType,
        item: ScalarType,
    },
}

impl Property {
    pub fn scalar(name: &str, ty: ScalarType) -> Self {
        Property::Scalar {
            name: name.to_string(),
            ty,
        }
    }

    pub fn list(name: &str, count: ScalarType, item: ScalarType) -> Self {
        Property::List {
            name: name.to_string(),
            count,
            item,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Scalar { name, ty } => write!(f, "property {} {name}", ty.keyword()),
            Property::List { name, count, item } => write!(
                f,
                "property list {} {} {name}",
                count.keyword(),
                item.keyword()
            ),
        }
    }
}

/// A named record type and the ordered schema of its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub count: usize,
    pub properties: Vec<Property>,
}

impl Element {
    pub fn new(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            count,
            properties: Vec::new(),
        }
    }

    /// Position of the property called `name` within a row.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub comments: Vec<String>,
    pub elements: Vec<Element>,
}

impl Header {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            comments: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Parses everything up to and including `end_header`, leaving `r`
    /// positioned at the first byte of the body.
    pub fn read<R: BufRead>(r: &mut R) -> Result<Self> {
        let mut line = String::new();
        let mut number = 0;
        let mut next_line = |line: &mut String| -> Result<usize> {
            line.clear();
            if r.read_line(line)? == 0 {
                return Err(Error::truncated("PLY header ends before 'end_header'"));
            }
            number += 1;
            Ok(number)
        };

        next_line(&mut line)?;
        if line.trim_end() != "ply" {
            return Err(Error::format("missing 'ply' magic number"));
        }

        let mut format = None;
        let mut comments = Vec::new();
        let mut elements: Vec<Element> = Vec::new();
        loop {
            let n = next_line(&mut line)?;
            let err = |msg: String| Error::format(format!("header line {n}: {msg}"));
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [] => {}
                ["end_header"] => break,
                ["format", fmt, version] => {
                    if *version != "1.0" {
                        return Err(err(format!("unsupported PLY version '{version}'")));
                    }
                    format = Some(fmt.parse::<Format>()?);
                }
                ["comment" | "obj_info", ..] => {
                    let text = line.trim().splitn(2, char::is_whitespace).nth(1);
                    comments.push(text.unwrap_or_default().trim().to_string());
                }
                ["element", name, count] => {
                    let count = count
                        .parse()
                        .map_err(|_| err(format!("invalid element count '{count}'")))?;
                    elements.push(Element::new(name, count));
                }
                ["property", rest @ ..] => {
                    let property = match rest {
                        ["list", count, item, name] => Property::list(name, count.parse()?, item.parse()?),
                        [ty, name] => Property::scalar(name, ty.parse()?),
                        _ => return Err(err(format!("malformed property '{}'", line.trim()))),
                    };
                    let element = elements
                        .last_mut()
                        .ok_or_else(|| err("property declared before any element".to_string()))?;
                    element.properties.push(property);
                }
                _ => return Err(err(format!("unexpected '{}'", line.trim()))),
            }
        }

        let format = format.ok_or_else(|| Error::format("PLY header has no 'format' line"))?;
        Ok(Header {
            format,
            comments,
            elements,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "ply")?;
        writeln!(w, "format {} 1.0", self.format.keyword())?;
        // A comment runs to the end of its header line.
        for line in self.comments.iter().flat_map(|c| c.lines()) {
            writeln!(w, "comment {line}")?;
        }
        for element in &self.elements {
            writeln!(w, "element {} {}", element.name, element.count)?;
            for property in &element.properties {
                writeln!(w, "{property}")?;
            }
        }
        writeln!(w, "end_header")?;
        Ok(())
    }
}
