use std::io::{BufWriter, Write};
use std::path::Path;

use super::{check_pcd_extension, PcdEncoding, PcdError};
use crate::io::quantize_color;
use crate::pointcloud::PointCloud;

// pack a color as 0x00RRGGBB, the PCL `rgb` convention
#[inline]
fn pack_rgb(rgb: [u8; 3]) -> u32 {
    ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32
}

fn write_header<W: Write>(
    writer: &mut W,
    num_points: usize,
    with_color: bool,
    encoding: PcdEncoding,
) -> Result<(), PcdError> {
    let (fields, size, kind, count) = if with_color {
        ("x y z rgb", "4 4 4 4", "F F F U", "1 1 1 1")
    } else {
        ("x y z", "4 4 4", "F F F", "1 1 1")
    };

    let data = match encoding {
        PcdEncoding::Ascii => "ascii",
        PcdEncoding::Binary => "binary",
    };

    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS {fields}")?;
    writeln!(writer, "SIZE {size}")?;
    writeln!(writer, "TYPE {kind}")?;
    writeln!(writer, "COUNT {count}")?;
    writeln!(writer, "WIDTH {num_points}")?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {num_points}")?;
    writeln!(writer, "DATA {data}")?;

    Ok(())
}

/// Write a point cloud to a PCD file.
///
/// The cloud is stored unorganized (`HEIGHT 1`) with the fields `x y z` as 32-bit floats
/// and, when the cloud has colors, `rgb` as an unsigned integer packed as `0x00RRGGBB`.
/// Normals are not written.
///
/// # Arguments
///
/// * `path` - Path to a `.pcd` file.
/// * `pointcloud` - The point cloud to write.
/// * `encoding` - The encoding of the data section.
pub fn write_pcd(
    path: impl AsRef<Path>,
    pointcloud: &PointCloud,
    encoding: PcdEncoding,
) -> Result<(), PcdError> {
    let path = path.as_ref();
    check_pcd_extension(path)?;

    let colors = pointcloud.colors_normalized();
    if let Some(colors) = &colors {
        if colors.len() != pointcloud.len() {
            return Err(PcdError::ColorCountMismatch {
                points: pointcloud.len(),
                colors: colors.len(),
            });
        }
    }

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_header(&mut writer, pointcloud.len(), colors.is_some(), encoding)?;

    for (i, point) in pointcloud.points().iter().enumerate() {
        let [x, y, z] = point.map(|v| v as f32);
        let rgb = colors
            .as_ref()
            .and_then(|colors| colors.get(i))
            .map(|&color| pack_rgb(quantize_color(color)));

        match encoding {
            PcdEncoding::Ascii => {
                write!(writer, "{x} {y} {z}")?;
                if let Some(rgb) = rgb {
                    write!(writer, " {rgb}")?;
                }
                writeln!(writer)?;
            }
            PcdEncoding::Binary => {
                writer.write_all(&x.to_le_bytes())?;
                writer.write_all(&y.to_le_bytes())?;
                writer.write_all(&z.to_le_bytes())?;
                if let Some(rgb) = rgb {
                    writer.write_all(&rgb.to_le_bytes())?;
                }
            }
        }
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_rgb() {
        assert_eq!(pack_rgb([0x12, 0x34, 0x56]), 0x0012_3456);
    }

    #[test]
    fn writes_ascii_header_and_records() -> Result<(), PcdError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let pointcloud = PointCloud::new(
            vec![[1.0, -2.5, 3.0], [0.0, 0.0, 0.0]],
            Some(vec![[255, 0, 0], [0, 0, 255]]),
            None,
        );
        write_pcd(&path, &pointcloud, PcdEncoding::Ascii)?;

        let text = std::fs::read_to_string(&path)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert!(lines.contains(&"FIELDS x y z rgb"));
        assert!(lines.contains(&"POINTS 2"));
        assert!(lines.contains(&"DATA ascii"));
        assert_eq!(lines[lines.len() - 2], "1 -2.5 3 16711680");
        assert_eq!(lines[lines.len() - 1], "0 0 0 255");

        Ok(())
    }

    #[test]
    fn binary_record_size() -> Result<(), PcdError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let pointcloud = PointCloud::new(vec![[0.0; 3]; 3], None, None);
        write_pcd(&path, &pointcloud, PcdEncoding::Binary)?;

        let bytes = std::fs::read(&path)?;
        let header_end = bytes
            .windows(12)
            .position(|w| w == b"DATA binary\n")
            .map(|p| p + 12)
            .ok_or(PcdError::MalformedHeader)?;
        assert_eq!(bytes.len() - header_end, 3 * 12);

        Ok(())
    }

    #[test]
    fn rejects_color_count_mismatch() -> Result<(), PcdError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let pointcloud = PointCloud::new(vec![[0.0; 3]; 3], Some(vec![[1, 2, 3]]), None);
        for encoding in [PcdEncoding::Ascii, PcdEncoding::Binary] {
            assert!(matches!(
                write_pcd(&path, &pointcloud, encoding),
                Err(PcdError::ColorCountMismatch {
                    points: 3,
                    colors: 1
                })
            ));
        }
        assert!(!path.exists());

        Ok(())
    }

    #[test]
    fn rejects_wrong_extension() {
        let pointcloud = PointCloud::new(vec![], None, None);
        assert!(matches!(
            write_pcd("cloud.ply", &pointcloud, PcdEncoding::Binary),
            Err(PcdError::InvalidFileExtension(_))
        ));
    }
}
