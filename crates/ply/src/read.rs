use std::io::{BufRead, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use meshport_mesh::{
    AttributeTable, Color, DedupKey, Error, Face, GeometryBuffer, Result, TruncationContext, Uv, Vector3,
};

use crate::header::{Element, Format, Header, Property, ScalarType};

/// One decoded property value. Every PLY scalar type fits into an `f64`
/// without loss.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    List(Vec<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            Value::List(items) => Some(items),
            Value::Scalar(_) => None,
        }
    }
}

/// The rows of one element, each row ordered like the element's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub element: Element,
    pub rows: Vec<Vec<Value>>,
}

/// A whole PLY file before it is interpreted as geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyData {
    pub header: Header,
    pub elements: Vec<ElementData>,
}

impl PlyData {
    pub fn element(&self, name: &str) -> Option<&ElementData> {
        self.elements.iter().find(|e| e.element.name == name)
    }
}

/// Source of property values for one body encoding.
trait RowSource {
    fn begin_row(&mut self, element: &Element, row: usize) -> Result<()>;
    fn scalar(&mut self, ty: ScalarType) -> Result<f64>;
    fn end_row(&mut self) -> Result<()>;
}

struct AsciiRows<R> {
    inner: R,
    line: String,
    tokens: Vec<String>,
    next: usize,
    context: String,
}

impl<R: BufRead> AsciiRows<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
            tokens: Vec::new(),
            next: 0,
            context: String::new(),
        }
    }
}

impl<R: BufRead> RowSource for AsciiRows<R> {
    fn begin_row(&mut self, element: &Element, row: usize) -> Result<()> {
        self.context = format!("{} {row}", element.name);
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Err(Error::truncated(format!(
                    "PLY declares {} {} rows but ends at row {row}",
                    element.count, element.name
                )));
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }
        self.tokens = self.line.split_whitespace().map(str::to_string).collect();
        self.next = 0;
        Ok(())
    }

    fn scalar(&mut self, ty: ScalarType) -> Result<f64> {
        let token = self.tokens.get(self.next).ok_or_else(|| {
            Error::format(format!(
                "{}: row has fewer values than its properties",
                self.context
            ))
        })?;
        self.next += 1;
        let value: f64 = token.parse().map_err(|_| {
            Error::format(format!("{}: invalid number '{token}'", self.context))
        })?;
        if !ty.is_float() && (value.fract() != 0.0 || !ty.holds(value)) {
            return Err(Error::format(format!(
                "{}: '{token}' is not a valid {}",
                self.context,
                ty.keyword()
            )));
        }
        Ok(value)
    }

    fn end_row(&mut self) -> Result<()> {
        if self.next != self.tokens.len() {
            return Err(Error::format(format!(
                "{}: row has {} values but its properties only use {}",
                self.context,
                self.tokens.len(),
                self.next
            )));
        }
        Ok(())
    }
}

struct BinaryRows<R, B> {
    inner: R,
    context: String,
    order: std::marker::PhantomData<B>,
}

impl<R: Read, B: ByteOrder> BinaryRows<R, B> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            context: String::new(),
            order: std::marker::PhantomData,
        }
    }
}

impl<R: Read, B: ByteOrder> RowSource for BinaryRows<R, B> {
    fn begin_row(&mut self, element: &Element, row: usize) -> Result<()> {
        self.context = format!(
            "PLY declares {} {} rows but ends in row {row}",
            element.count, element.name
        );
        Ok(())
    }

    fn scalar(&mut self, ty: ScalarType) -> Result<f64> {
        let r = &mut self.inner;
        let value = match ty {
            ScalarType::Int8 => r.read_i8().map(f64::from),
            ScalarType::UInt8 => r.read_u8().map(f64::from),
            ScalarType::Int16 => r.read_i16::<B>().map(f64::from),
            ScalarType::UInt16 => r.read_u16::<B>().map(f64::from),
            ScalarType::Int32 => r.read_i32::<B>().map(f64::from),
            ScalarType::UInt32 => r.read_u32::<B>().map(f64::from),
            ScalarType::Float32 => r.read_f32::<B>().map(f64::from),
            ScalarType::Float64 => r.read_f64::<B>(),
        };
        value.or_truncated(|| self.context.clone())
    }

    fn end_row(&mut self) -> Result<()> {
        Ok(())
    }
}

fn read_elements<S: RowSource>(source: &mut S, header: &Header) -> Result<Vec<ElementData>> {
    let mut elements = Vec::with_capacity(header.elements.len());
    for element in &header.elements {
        // Counts come from the file; cap the up-front allocation.
        let mut rows = Vec::with_capacity(element.count.min(1 << 16));
        for row in 0..element.count {
            source.begin_row(element, row)?;
            let mut values = Vec::with_capacity(element.properties.len());
            for property in &element.properties {
                values.push(match property {
                    Property::Scalar { ty, .. } => Value::Scalar(source.scalar(*ty)?),
                    Property::List { count, item, .. } => {
                        let n = source.scalar(*count)?;
                        if n < 0.0 {
                            return Err(Error::format(format!(
                                "{} {row}: negative list length {n}",
                                element.name
                            )));
                        }
                        let items = (0..n as usize)
                            .map(|_| source.scalar(*item))
                            .collect::<Result<Vec<_>>>()?;
                        Value::List(items)
                    }
                });
            }
            source.end_row()?;
            rows.push(values);
        }
        log::debug!("read {} {} rows", rows.len(), element.name);
        elements.push(ElementData {
            element: element.clone(),
            rows,
        });
    }
    Ok(elements)
}

/// Reads a complete PLY file, header and body, without interpreting it.
pub fn read_data<R: BufRead>(mut r: R) -> Result<PlyData> {
    let header = Header::read(&mut r)?;
    let elements = match header.format {
        Format::Ascii => read_elements(&mut AsciiRows::new(r), &header)?,
        Format::BinaryLittleEndian => {
            read_elements(&mut BinaryRows::<_, LittleEndian>::new(r), &header)?
        }
        Format::BinaryBigEndian => read_elements(&mut BinaryRows::<_, BigEndian>::new(r), &header)?,
    };
    Ok(PlyData { header, elements })
}

/// Looks up a group of scalar properties that must be present together.
///
/// `None` when any of them is missing; an error when one is a list.
fn channels<const N: usize>(element: &Element, names: [&str; N]) -> Result<Option<[usize; N]>> {
    let mut positions = [0; N];
    for (p, name) in positions.iter_mut().zip(names) {
        let Some(position) = element.position(name) else {
            return Ok(None);
        };
        if let Property::List { .. } = element.properties[position] {
            return Err(Error::format(format!(
                "{} property {name} must be a scalar",
                element.name
            )));
        }
        *p = position;
    }
    Ok(Some(positions))
}

/// Values of scalar properties; `channels` rules out lists.
fn scalars<const N: usize>(row: &[Value], positions: [usize; N]) -> [f32; N] {
    positions.map(|p| row[p].as_scalar().unwrap_or(f64::NAN) as f32)
}

/// Spreads per-vertex values onto the face corners.
fn corner_table<T: DedupKey + Copy>(faces: &[Face], values: &[T]) -> AttributeTable<T> {
    AttributeTable::from_corners(
        faces
            .iter()
            .map(|f| f.vertices.iter().map(|&v| values[v as usize])),
    )
}

const UV_NAMES: [[&str; 2]; 3] = [["s", "t"], ["u", "v"], ["texture_u", "texture_v"]];

impl PlyData {
    /// Interprets the `vertex` and `face` elements as geometry.
    ///
    /// Elements and properties without a meaning for [`GeometryBuffer`] are
    /// skipped.
    pub fn into_geometry(self) -> Result<GeometryBuffer> {
        let mut mesh = GeometryBuffer::new();
        let Some(vertices) = self.element("vertex") else {
            if self.element("face").map_or(false, |f| !f.rows.is_empty()) {
                return Err(Error::format("PLY has faces but no vertex element"));
            }
            log::warn!("PLY file has no vertex element");
            return Ok(mesh);
        };
        let vertex = &vertices.element;

        let [x, y, z] = channels(vertex, ["x", "y", "z"])?
            .ok_or_else(|| Error::format("vertex element needs x, y and z properties"))?;
        for (i, element) in self.elements.iter().enumerate() {
            if element.element.name != "vertex" && element.element.name != "face" {
                log::warn!("skipping element {i} '{}'", element.element.name);
            }
        }
        // Skipped vertex properties are listed once for diagnostics.
        for property in &vertex.properties {
            let known = ["x", "y", "z", "nx", "ny", "nz", "red", "green", "blue", "alpha"]
                .contains(&property.name())
                || UV_NAMES.iter().flatten().any(|n| *n == property.name());
            if !known {
                log::debug!("skipping vertex property '{}'", property.name());
            }
        }

        mesh.positions = vertices
            .rows
            .iter()
            .map(|row| Vector3::from(scalars(row, [x, y, z])))
            .collect();

        let normals = channels(vertex, ["nx", "ny", "nz"])?.map(|n| {
            vertices
                .rows
                .iter()
                .map(|row| Vector3::from(scalars(row, n)))
                .collect::<Vec<_>>()
        });
        let mut uv_channels = None;
        for names in UV_NAMES {
            if let Some(found) = channels(vertex, names)? {
                uv_channels = Some(found);
                break;
            }
        }
        let uvs: Option<Vec<Uv>> =
            uv_channels.map(|uv| vertices.rows.iter().map(|row| scalars(row, uv)).collect());
        let colors: Option<Vec<Color>> = channels(vertex, ["red", "green", "blue"])?.map(|rgb| {
            // Integer channels span their type's range; float channels are
            // already normalized.
            let range = rgb.map(|p| match &vertex.properties[p] {
                Property::Scalar { ty, .. } if !ty.is_float() => 255.0,
                _ => 1.0,
            });
            vertices
                .rows
                .iter()
                .map(|row| {
                    let c = scalars(row, rgb);
                    [c[0] / range[0], c[1] / range[1], c[2] / range[2]]
                })
                .collect()
        });

        if let Some(faces) = self.element("face") {
            let list = ["vertex_indices", "vertex_index"]
                .iter()
                .find_map(|name| faces.element.position(name))
                .ok_or_else(|| Error::format("face element has no vertex_indices list"))?;
            let n_vertices = mesh.positions.len();
            for (fi, row) in faces.rows.iter().enumerate() {
                let items = row[list]
                    .as_list()
                    .ok_or_else(|| Error::format("vertex_indices must be a list property"))?;
                if items.len() < 3 {
                    return Err(Error::format(format!(
                        "face {fi} has {} vertices, at least 3 are required",
                        items.len()
                    )));
                }
                let indices = items
                    .iter()
                    .map(|&v| {
                        if v < 0.0 || v as usize >= n_vertices {
                            Err(Error::format(format!(
                                "face {fi} references vertex {v}, but there are only {n_vertices}"
                            )))
                        } else {
                            Ok(v as u32)
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                mesh.faces.push(Face::new(indices).smooth(normals.is_some()));
            }
        }

        mesh.uvs = uvs.map(|uvs| corner_table(&mesh.faces, &uvs));
        mesh.colors = colors.map(|colors| corner_table(&mesh.faces, &colors));
        mesh.vertex_normals = normals;

        log::debug!(
            "PLY mesh with {} vertices and {} faces",
            mesh.positions.len(),
            mesh.faces.len()
        );
        Ok(mesh)
    }
}
