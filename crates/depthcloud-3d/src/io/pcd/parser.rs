use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::path::Path;

use super::{check_pcd_extension, PcdEncoding, PcdError};
use crate::pointcloud::PointCloud;

const MAX_POINT_STEP: usize = 1024;
const MAX_POINTS: usize = 50_000_000;

/// Describes a single field in a PCD point record
#[derive(Debug)]
struct PcdField {
    offset: usize, // byte offset within a binary point
    column: usize, // token index within an ascii point
    kind: char,    // PCD type: 'F' = float, 'U' = unsigned int, 'I' = signed int
}

#[derive(Debug)]
struct PcdLayout {
    fields: HashMap<String, PcdField>,
    point_step: usize,  // total bytes per point
    num_columns: usize, // total tokens per point
    num_points: usize,  // number of points
    encoding: PcdEncoding,
}

impl PcdLayout {
    fn get_field(&self, name: &str) -> Result<&PcdField, PcdError> {
        self.fields.get(name).ok_or(PcdError::UnsupportedProperty)
    }

    fn get_normal_field(&self, name: &str, short: &str) -> Option<&PcdField> {
        self.fields.get(name).or_else(|| self.fields.get(short))
    }
}

// 4-byte word of a binary record
#[inline]
fn word_at(buf: &[u8], offset: usize) -> Result<[u8; 4], PcdError> {
    buf.get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(PcdError::UnsupportedProperty)
}

fn parse_sizes<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Vec<usize>, PcdError> {
    tokens
        .map(|v| v.parse().map_err(|_| PcdError::UnsupportedProperty))
        .collect()
}

fn parse_pcd_layout<R: BufRead>(reader: &mut R) -> Result<PcdLayout, PcdError> {
    let mut field_names: Vec<String> = Vec::new();
    let mut sizes = Vec::new();
    let mut types = Vec::new();
    let mut counts = Vec::new();
    let mut points = 0usize;

    let encoding = loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(PcdError::MalformedHeader);
        }
        let line = line.trim();

        if line.starts_with("DATA") {
            match line {
                "DATA ascii" => break PcdEncoding::Ascii,
                "DATA binary" => break PcdEncoding::Binary,
                _ => return Err(PcdError::UnsupportedProperty),
            }
        }

        let mut it = line.split_whitespace();
        match it.next() {
            Some("SIZE") => sizes = parse_sizes(it)?,
            Some("TYPE") => {
                types = it
                    .map(|v| v.chars().next().ok_or(PcdError::UnsupportedProperty))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Some("COUNT") => counts = parse_sizes(it)?,
            Some("POINTS") => {
                points = parse_sizes(it.take(1))?
                    .pop()
                    .ok_or(PcdError::UnsupportedProperty)?;
            }
            Some("FIELDS") => field_names = it.map(String::from).collect(),
            _ => {}
        }
    };

    if field_names.is_empty()
        || sizes.len() != field_names.len()
        || types.len() != field_names.len()
        || (!counts.is_empty() && counts.len() != field_names.len())
    {
        return Err(PcdError::UnsupportedProperty);
    }

    // Compute byte offsets and token columns for each field
    let mut offset = 0usize;
    let mut column = 0usize;
    let mut fields = HashMap::new();

    for (i, name) in field_names.iter().enumerate() {
        // a missing COUNT line means one element per field
        let count = counts.get(i).copied().unwrap_or(1);
        let size = sizes[i];
        let kind = types[i];

        match name.as_str() {
            "x" | "y" | "z" | "normal_x" | "normal_y" | "normal_z" | "nx" | "ny" | "nz" => {
                if !(size == 4 && count == 1 && kind == 'F') {
                    return Err(PcdError::UnsupportedProperty);
                }
            }
            "rgb" => {
                if !(size == 4 && count == 1 && matches!(kind, 'U' | 'I' | 'F')) {
                    return Err(PcdError::UnsupportedProperty);
                }
            }
            _ => {}
        }

        if fields.contains_key(name) {
            return Err(PcdError::MalformedHeader);
        }
        fields.insert(
            name.clone(),
            PcdField {
                offset,
                column,
                kind,
            },
        );

        let field_bytes = size.checked_mul(count).ok_or(PcdError::MalformedHeader)?;

        offset = offset
            .checked_add(field_bytes)
            .ok_or(PcdError::MalformedHeader)?;
        column = column.checked_add(count).ok_or(PcdError::MalformedHeader)?;

        if offset > MAX_POINT_STEP {
            return Err(PcdError::MalformedHeader);
        }
    }

    Ok(PcdLayout {
        fields,
        point_step: offset,
        num_columns: column,
        num_points: points,
        encoding,
    })
}

#[inline]
fn unpack_rgb(rgb: u32) -> [u8; 3] {
    [
        ((rgb >> 16) & 0xFF) as u8,
        ((rgb >> 8) & 0xFF) as u8,
        (rgb & 0xFF) as u8,
    ]
}

// Field offsets resolved once per file
struct PcdAccessors<'a> {
    xyz: [&'a PcdField; 3],
    rgb: Option<&'a PcdField>,
    normals: Option<[&'a PcdField; 3]>,
}

impl<'a> PcdAccessors<'a> {
    fn new(layout: &'a PcdLayout) -> Result<Self, PcdError> {
        let xyz = [
            layout.get_field("x")?,
            layout.get_field("y")?,
            layout.get_field("z")?,
        ];
        let rgb = layout.fields.get("rgb");
        let normals = match (
            layout.get_normal_field("normal_x", "nx"),
            layout.get_normal_field("normal_y", "ny"),
            layout.get_normal_field("normal_z", "nz"),
        ) {
            (Some(nx), Some(ny), Some(nz)) => Some([nx, ny, nz]),
            _ => None,
        };
        Ok(Self { xyz, rgb, normals })
    }
}

#[derive(Default)]
struct PcdPoints {
    points: Vec<[f64; 3]>,
    colors: Vec<[u8; 3]>,
    normals: Vec<[f64; 3]>,
}

impl PcdPoints {
    fn into_pointcloud(self) -> PointCloud {
        PointCloud::new(
            self.points,
            (!self.colors.is_empty()).then_some(self.colors),
            (!self.normals.is_empty()).then_some(self.normals),
        )
    }
}

fn read_binary_points<R: Read>(
    reader: &mut R,
    layout: &PcdLayout,
    acc: &PcdAccessors,
    out: &mut PcdPoints,
) -> Result<(), PcdError> {
    let mut buffer = vec![0u8; layout.point_step];

    for _ in 0..layout.num_points {
        reader.read_exact(&mut buffer)?;

        let float = |f: &PcdField| -> Result<f64, PcdError> {
            Ok(f32::from_le_bytes(word_at(&buffer, f.offset)?) as f64)
        };

        let [fx, fy, fz] = acc.xyz;
        out.points.push([float(fx)?, float(fy)?, float(fz)?]);

        // the packed bits are the same whatever the declared type
        if let Some(f) = acc.rgb {
            out.colors
                .push(unpack_rgb(u32::from_le_bytes(word_at(&buffer, f.offset)?)));
        }

        if let Some([nx, ny, nz]) = acc.normals {
            out.normals.push([float(nx)?, float(ny)?, float(nz)?]);
        }
    }

    Ok(())
}

fn read_ascii_points<R: BufRead>(
    reader: &mut R,
    layout: &PcdLayout,
    acc: &PcdAccessors,
    out: &mut PcdPoints,
) -> Result<(), PcdError> {
    let mut line = String::new();
    let mut index = 0usize;

    while index < layout.num_points {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::MalformedPoint(index));
        }

        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != layout.num_columns {
            return Err(PcdError::MalformedPoint(index));
        }

        let float = |f: &PcdField| -> Result<f64, PcdError> {
            tokens[f.column]
                .parse::<f32>()
                .map(|v| v as f64)
                .map_err(|_| PcdError::MalformedPoint(index))
        };

        let [fx, fy, fz] = acc.xyz;
        out.points.push([float(fx)?, float(fy)?, float(fz)?]);

        if let Some(f) = acc.rgb {
            // PCL writes float typed rgb as the float reinterpretation of the packed bits
            let token = tokens[f.column];
            let rgb = match f.kind {
                'F' => token.parse::<f32>().map(f32::to_bits).ok(),
                'I' => token.parse::<i32>().map(|v| v as u32).ok(),
                _ => token.parse::<u32>().ok(),
            }
            .ok_or(PcdError::MalformedPoint(index))?;
            out.colors.push(unpack_rgb(rgb));
        }

        if let Some([nx, ny, nz]) = acc.normals {
            out.normals.push([float(nx)?, float(ny)?, float(nz)?]);
        }

        index += 1;
    }

    Ok(())
}

/// Read a PCD file with an `ascii` or `binary` data section.
///
/// # Arguments
/// * `path` - Path to a `.pcd` file.
///
/// # Returns
/// A [`PointCloud`] containing:
/// - 3D points (always)
/// - RGB colors (if present)
/// - Normals (if present)
///
/// # Supported formats
/// - XYZ
/// - XYZRGB
/// - XYZ + normals
/// - XYZRGB + normals
pub fn read_pcd(path: impl AsRef<Path>) -> Result<PointCloud, PcdError> {
    let path = path.as_ref();
    check_pcd_extension(path)?;

    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);

    let layout = parse_pcd_layout(&mut reader)?;

    if layout.num_points > MAX_POINTS {
        return Err(PcdError::MalformedHeader);
    }

    if layout.point_step == 0 || layout.point_step > MAX_POINT_STEP {
        return Err(PcdError::MalformedHeader);
    }

    let acc = PcdAccessors::new(&layout)?;

    let mut out = PcdPoints {
        points: Vec::with_capacity(layout.num_points),
        ..Default::default()
    };

    match layout.encoding {
        PcdEncoding::Binary => read_binary_points(&mut reader, &layout, &acc, &mut out)?,
        PcdEncoding::Ascii => read_ascii_points(&mut reader, &layout, &acc, &mut out)?,
    }

    Ok(out.into_pointcloud())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fails_on_compressed_data() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
POINTS 1
DATA binary_compressed";
        let mut reader = Cursor::new(&data[..]);
        assert!(parse_pcd_layout(&mut reader).is_err());
    }

    #[test]
    fn parses_valid_binary_header() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
POINTS 10
DATA binary";
        let mut reader = Cursor::new(&data[..]);
        let layout = parse_pcd_layout(&mut reader).expect("valid binary header should parse");
        assert_eq!(layout.num_points, 10);
        assert_eq!(layout.point_step, 12);
        assert_eq!(layout.encoding, PcdEncoding::Binary);
        assert!(layout.fields.contains_key("x"));
    }

    #[test]
    fn parses_ascii_header_without_count() {
        let data = b"FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F F
POINTS 2
DATA ascii";
        let mut reader = Cursor::new(&data[..]);
        let layout = parse_pcd_layout(&mut reader).expect("valid ascii header should parse");
        assert_eq!(layout.encoding, PcdEncoding::Ascii);
        assert_eq!(layout.num_columns, 4);
        assert_eq!(layout.fields["rgb"].column, 3);
    }

    #[test]
    fn rejects_wrong_type_for_xyz() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE I I I
COUNT 1 1 1
POINTS 5
DATA binary";
        let mut reader = Cursor::new(&data[..]);
        assert!(parse_pcd_layout(&mut reader).is_err());
    }

    #[test]
    fn reads_ascii_float_rgb() -> Result<(), PcdError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let rgb = f32::from_bits(0x00FF_8000);
        let text = format!(
            "VERSION 0.7\nFIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F F\nCOUNT 1 1 1 1\n\
             WIDTH 1\nHEIGHT 1\nPOINTS 1\nDATA ascii\n0.5 -1 2 {rgb:e}\n"
        );
        std::fs::write(&path, text)?;

        let pointcloud = read_pcd(&path)?;
        assert_eq!(pointcloud.points(), &[[0.5, -1.0, 2.0]]);
        assert_eq!(pointcloud.colors(), Some(&[[255, 128, 0]][..]));
        assert!(pointcloud.normals().is_none());

        Ok(())
    }

    #[test]
    fn reads_binary_with_normals() -> Result<(), PcdError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let mut data = b"FIELDS x y z normal_x normal_y normal_z
SIZE 4 4 4 4 4 4
TYPE F F F F F F
COUNT 1 1 1 1 1 1
POINTS 1
DATA binary
"
        .to_vec();
        for v in [1.0f32, 2.0, 3.0, 0.0, 0.0, 1.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&path, data)?;

        let pointcloud = read_pcd(&path)?;
        assert_eq!(pointcloud.points(), &[[1.0, 2.0, 3.0]]);
        assert_eq!(pointcloud.normals(), Some(&[[0.0, 0.0, 1.0]][..]));
        assert!(pointcloud.colors().is_none());

        Ok(())
    }

    #[test]
    fn truncated_binary_fails() -> Result<(), PcdError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let mut data = b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 2\nDATA binary\n".to_vec();
        data.extend_from_slice(&[0u8; 12]);
        std::fs::write(&path, data)?;

        assert!(matches!(read_pcd(&path), Err(PcdError::Io(_))));

        Ok(())
    }
}
