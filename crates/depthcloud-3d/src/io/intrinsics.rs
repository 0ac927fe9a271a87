use std::io::Read;
use std::path::{Path, PathBuf};

use crate::camera::CameraIntrinsics;

/// Error types for the intrinsics module.
#[derive(Debug, thiserror::Error)]
pub enum IntrinsicsError {
    /// The intrinsics file does not exist or cannot be opened
    #[error("Intrinsics file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the intrinsics file
    #[error("Failed to read intrinsics file")]
    Io(#[from] std::io::Error),

    /// A required field is missing or has an invalid value
    #[error("Malformed intrinsics: {0}")]
    Malformed(String),
}

// All fields are read as floats so that `640` and `640.0` are both accepted for the
// image dimensions. Unknown fields are ignored.
#[derive(serde::Deserialize)]
struct IntrinsicsRecord {
    cx: f64,
    cy: f64,
    fx: f64,
    fy: f64,
    width: f64,
    height: f64,
}

// image decoders report dimensions as u32, larger values cannot describe a real image
fn to_dimension(name: &str, value: f64) -> Result<usize, IntrinsicsError> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
        return Err(IntrinsicsError::Malformed(format!(
            "`{name}` must be a positive integer, got {value}"
        )));
    }
    if value > u32::MAX as f64 {
        return Err(IntrinsicsError::Malformed(format!(
            "`{name}` must be at most {}, got {value}",
            u32::MAX
        )));
    }
    Ok(value as usize)
}

/// Parse camera intrinsics from a JSON document.
///
/// The document must be an object with the numeric fields `cx`, `cy`, `fx`, `fy`,
/// `width` and `height`.
///
/// # Example
///
/// ```
/// use depthcloud_3d::io::intrinsics::parse_intrinsics_json;
///
/// let json = r#"{"cx": 319.5, "cy": 239.5, "fx": 525.0, "fy": 525.0, "width": 640, "height": 480}"#;
/// let intrinsics = parse_intrinsics_json(json).unwrap();
/// assert_eq!(intrinsics.width, 640);
/// ```
pub fn parse_intrinsics_json(json: &str) -> Result<CameraIntrinsics, IntrinsicsError> {
    let record: IntrinsicsRecord =
        serde_json::from_str(json).map_err(|e| IntrinsicsError::Malformed(e.to_string()))?;

    if record.fx == 0.0 || record.fy == 0.0 {
        return Err(IntrinsicsError::Malformed(
            "focal lengths must be non-zero".to_string(),
        ));
    }

    Ok(CameraIntrinsics {
        cx: record.cx,
        cy: record.cy,
        fx: record.fx,
        fy: record.fy,
        width: to_dimension("width", record.width)?,
        height: to_dimension("height", record.height)?,
    })
}

/// Read camera intrinsics from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to a JSON file with the fields described in [`parse_intrinsics_json`].
///
/// # Errors
///
/// [`IntrinsicsError::NotFound`] if the file cannot be opened and
/// [`IntrinsicsError::Malformed`] if a field is missing or not numeric.
pub fn read_intrinsics_json(path: impl AsRef<Path>) -> Result<CameraIntrinsics, IntrinsicsError> {
    let path = path.as_ref();
    let mut file =
        std::fs::File::open(path).map_err(|_| IntrinsicsError::NotFound(path.to_path_buf()))?;

    let mut json = String::new();
    file.read_to_string(&mut json)?;

    parse_intrinsics_json(&json)
}

/// Write camera intrinsics to a JSON file.
pub fn write_intrinsics_json(
    path: impl AsRef<Path>,
    intrinsics: &CameraIntrinsics,
) -> Result<(), IntrinsicsError> {
    let json = serde_json::to_string_pretty(intrinsics)
        .map_err(|e| IntrinsicsError::Malformed(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_fields() -> Result<(), IntrinsicsError> {
        let json = r#"{"cx": 1.5, "cy": 2.5, "fx": 3.0, "fy": 4.0, "width": 8, "height": 6.0, "model": "pinhole"}"#;
        let intrinsics = parse_intrinsics_json(json)?;
        assert_eq!(intrinsics, CameraIntrinsics::new(1.5, 2.5, 3.0, 4.0, 8, 6));
        Ok(())
    }

    #[test]
    fn rejects_missing_field() {
        let json = r#"{"cx": 1.5, "cy": 2.5, "fx": 3.0, "width": 8, "height": 6}"#;
        let err = parse_intrinsics_json(json).unwrap_err();
        assert!(matches!(err, IntrinsicsError::Malformed(ref msg) if msg.contains("fy")));
    }

    #[test]
    fn rejects_non_numeric_field() {
        let json = r#"{"cx": "center", "cy": 2.5, "fx": 3.0, "fy": 4.0, "width": 8, "height": 6}"#;
        assert!(matches!(
            parse_intrinsics_json(json),
            Err(IntrinsicsError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_fractional_dimensions() {
        let json = r#"{"cx": 1.5, "cy": 2.5, "fx": 3.0, "fy": 4.0, "width": 8.5, "height": 6}"#;
        assert!(matches!(
            parse_intrinsics_json(json),
            Err(IntrinsicsError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_oversized_dimensions() {
        let json = r#"{"cx": 1.5, "cy": 2.5, "fx": 3.0, "fy": 4.0, "width": 1e10, "height": 1e10}"#;
        let err = parse_intrinsics_json(json).unwrap_err();
        assert!(matches!(err, IntrinsicsError::Malformed(ref msg) if msg.contains("width")));

        let json = r#"{"cx": 1.5, "cy": 2.5, "fx": 3.0, "fy": 4.0, "width": 4294967295, "height": 4294967296}"#;
        let err = parse_intrinsics_json(json).unwrap_err();
        assert!(matches!(err, IntrinsicsError::Malformed(ref msg) if msg.contains("height")));
    }

    #[test]
    fn rejects_zero_focal_length() {
        let json = r#"{"cx": 1.5, "cy": 2.5, "fx": 0.0, "fy": 4.0, "width": 8, "height": 6}"#;
        assert!(matches!(
            parse_intrinsics_json(json),
            Err(IntrinsicsError::Malformed(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        assert!(matches!(
            read_intrinsics_json("does/not/exist.json"),
            Err(IntrinsicsError::NotFound(_))
        ));
    }

    #[test]
    fn write_then_read_file() -> Result<(), IntrinsicsError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("intrinsics.json");

        let intrinsics = CameraIntrinsics::new(319.5, 239.5, 525.0, 525.0, 640, 480);
        write_intrinsics_json(&path, &intrinsics)?;
        assert_eq!(read_intrinsics_json(&path)?, intrinsics);

        Ok(())
    }
}
