use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::{
    check_ply_extension,
    properties::{DynamicProperty, PlyPropertyDefinition, PlyType, XYZRgbProperty},
    PlyEncoding, PlyError, PlyPropertyTrait,
};
use crate::pointcloud::PointCloud;

// Upper bound on the declared vertex count, matching the PCD reader.
const MAX_VERTICES: usize = 50_000_000;

// The part of the header describing the vertex element.
struct VertexHeader {
    count: usize,
    properties: Vec<PlyPropertyDefinition>,
    format: PlyType,
    encoding: PlyEncoding,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<VertexHeader, PlyError> {
    let mut magic = String::new();
    reader.read_line(&mut magic)?;
    if magic.trim() != "ply" {
        return Err(PlyError::UnsupportedProperty);
    }

    let mut encoding = None;
    let mut count = None;
    let mut properties = Vec::new();
    // true while the properties being declared belong to the vertex element
    let mut in_vertex = false;

    for line in reader.lines() {
        let line = line?;
        let tokens = line.split_whitespace().collect::<Vec<_>>();

        match tokens.as_slice() {
            ["end_header"] => {
                let (Some(encoding), Some(count)) = (encoding, count) else {
                    return Err(PlyError::UnsupportedProperty);
                };
                let format = PlyType::detect_format(&properties)?;
                return Ok(VertexHeader {
                    count,
                    properties,
                    format,
                    encoding,
                });
            }
            ["format", "ascii", _] => encoding = Some(PlyEncoding::Ascii),
            ["format", "binary_little_endian", _] => {
                encoding = Some(PlyEncoding::BinaryLittleEndian)
            }
            ["format", ..] => return Err(PlyError::UnsupportedProperty),
            ["element", "vertex", n] => {
                let n: usize = n.parse().map_err(|_| PlyError::UnsupportedProperty)?;
                if n > MAX_VERTICES {
                    return Err(PlyError::TooManyVertices(n));
                }
                count = Some(n);
                in_vertex = true;
            }
            // later elements (faces, edges) are not read, but they cannot come first
            ["element", ..] if count.is_none() => return Err(PlyError::UnsupportedProperty),
            ["element", ..] => in_vertex = false,
            ["property", "list", ..] if in_vertex => return Err(PlyError::UnsupportedProperty),
            ["property", data_type, name] if in_vertex => {
                properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    data_type: data_type.parse()?,
                });
            }
            _ => {}
        }
    }

    Err(PlyError::UnsupportedProperty)
}

fn read_binary_vertices<R: Read>(
    reader: &mut R,
    header: &VertexHeader,
    out: &mut VertexSink,
) -> Result<(), PlyError> {
    let mut record = vec![0u8; header.format.size_of()];
    for _ in 0..header.count {
        reader.read_exact(&mut record)?;
        match &header.format {
            PlyType::XYZRgb => out.push(&XYZRgbProperty::decode(&record)?),
            PlyType::Dynamic(schema) => {
                out.push(&DynamicProperty::parse_from_buffer(&record, schema)?)
            }
        }
    }
    Ok(())
}

fn read_ascii_vertices<R: BufRead>(
    reader: &mut R,
    header: &VertexHeader,
    out: &mut VertexSink,
) -> Result<(), PlyError> {
    let mut lines = reader.lines();
    for index in 0..header.count {
        // blank lines between records are tolerated
        let line = loop {
            match lines.next() {
                Some(line) if line.as_ref().is_ok_and(|l| l.trim().is_empty()) => continue,
                Some(line) => break line?,
                None => return Err(PlyError::MalformedVertex(index)),
            }
        };
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        let vertex = DynamicProperty::parse_from_tokens(&tokens, &header.properties)
            .map_err(|_| PlyError::MalformedVertex(index))?;
        out.push(&vertex);
    }
    Ok(())
}

struct VertexSink {
    points: Vec<[f64; 3]>,
    colors: Vec<[u8; 3]>,
}

impl VertexSink {
    fn push(&mut self, vertex: &impl PlyPropertyTrait) {
        self.points.push(vertex.to_point());
        if let Some(color) = vertex.to_color() {
            self.colors.push(color);
        }
    }
}

/// Read a PLY file in ascii or binary little endian format with automatic layout detection.
///
/// Only the vertex element is read. Its properties must include `x`, `y` and `z`;
/// `red`, `green` and `blue` are read as colors when present.
pub fn read_ply(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let path = path.as_ref();
    check_ply_extension(path)?;

    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let header = parse_header(&mut reader)?;

    let mut sink = VertexSink {
        points: Vec::with_capacity(header.count),
        colors: Vec::new(),
    };

    match header.encoding {
        PlyEncoding::BinaryLittleEndian => read_binary_vertices(&mut reader, &header, &mut sink)?,
        PlyEncoding::Ascii => read_ascii_vertices(&mut reader, &header, &mut sink)?,
    }

    let colors = header.format.has_color().then_some(sink.colors);

    Ok(PointCloud::new(sink.points, colors, None))
}
