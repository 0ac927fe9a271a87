use std::io::{BufWriter, Write};
use std::path::Path;

use super::{check_ply_extension, PlyEncoding, PlyError};
use crate::io::quantize_color;
use crate::pointcloud::PointCloud;

/// Write a point cloud to a PLY file.
///
/// Vertices are written as `float x y z` and, when the cloud has colors,
/// `uchar red green blue`. Normals are not written.
///
/// # Arguments
///
/// * `path` - Path to a `.ply` file.
/// * `pointcloud` - The point cloud to write.
/// * `encoding` - The encoding of the body.
pub fn write_ply(
    path: impl AsRef<Path>,
    pointcloud: &PointCloud,
    encoding: PlyEncoding,
) -> Result<(), PlyError> {
    let path = path.as_ref();
    check_ply_extension(path)?;

    let colors = pointcloud.colors_normalized();
    if let Some(colors) = &colors {
        if colors.len() != pointcloud.len() {
            return Err(PlyError::ColorCountMismatch {
                points: pointcloud.len(),
                colors: colors.len(),
            });
        }
    }

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    let format = match encoding {
        PlyEncoding::Ascii => "ascii",
        PlyEncoding::BinaryLittleEndian => "binary_little_endian",
    };

    writeln!(writer, "ply")?;
    writeln!(writer, "format {format} 1.0")?;
    writeln!(writer, "element vertex {}", pointcloud.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    if colors.is_some() {
        writeln!(writer, "property uchar red")?;
        writeln!(writer, "property uchar green")?;
        writeln!(writer, "property uchar blue")?;
    }
    writeln!(writer, "end_header")?;

    for (i, point) in pointcloud.points().iter().enumerate() {
        let [x, y, z] = point.map(|v| v as f32);
        let rgb = colors
            .as_ref()
            .and_then(|colors| colors.get(i))
            .map(|&color| quantize_color(color));

        match encoding {
            PlyEncoding::Ascii => {
                write!(writer, "{x} {y} {z}")?;
                if let Some([r, g, b]) = rgb {
                    write!(writer, " {r} {g} {b}")?;
                }
                writeln!(writer)?;
            }
            PlyEncoding::BinaryLittleEndian => {
                writer.write_all(&x.to_le_bytes())?;
                writer.write_all(&y.to_le_bytes())?;
                writer.write_all(&z.to_le_bytes())?;
                if let Some(rgb) = rgb {
                    writer.write_all(&rgb)?;
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
    fn writes_ascii_ply() -> Result<(), PlyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.ply");

        let pointcloud = PointCloud::new(
            vec![[0.5, 0.25, -1.0]],
            Some(vec![[1, 2, 3]]),
            None,
        );
        write_ply(&path, &pointcloud, PlyEncoding::Ascii)?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with("ply\nformat ascii 1.0\nelement vertex 1\n"));
        assert!(text.contains("property uchar blue\nend_header\n"));
        assert!(text.ends_with("0.5 0.25 -1 1 2 3\n"));

        Ok(())
    }

    #[test]
    fn rejects_color_count_mismatch() -> Result<(), PlyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.ply");

        let short = PointCloud::new(vec![[0.0; 3]; 2], Some(vec![[9, 9, 9]]), None);
        assert!(matches!(
            write_ply(&path, &short, PlyEncoding::BinaryLittleEndian),
            Err(PlyError::ColorCountMismatch {
                points: 2,
                colors: 1
            })
        ));

        let long = PointCloud::new(vec![[0.0; 3]], Some(vec![[9, 9, 9]; 2]), None);
        assert!(matches!(
            write_ply(&path, &long, PlyEncoding::Ascii),
            Err(PlyError::ColorCountMismatch {
                points: 1,
                colors: 2
            })
        ));
        assert!(!path.exists());

        Ok(())
    }

    #[test]
    fn writes_positions_only_without_colors() -> Result<(), PlyError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.ply");

        let pointcloud = PointCloud::new(vec![[0.0; 3]; 2], None, None);
        write_ply(&path, &pointcloud, PlyEncoding::BinaryLittleEndian)?;

        let bytes = std::fs::read(&path)?;
        assert!(!bytes.windows(3).any(|w| w == b"red"));
        let header_end = bytes
            .windows(11)
            .position(|w| w == b"end_header\n")
            .map(|p| p + 11)
            .ok_or(PlyError::UnsupportedProperty)?;
        assert_eq!(bytes.len() - header_end, 2 * 12);

        Ok(())
    }
}
