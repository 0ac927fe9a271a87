mod parser;
mod writer;

pub use parser::*;
pub use writer::*;

/// Error types for the PCD module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PcdError {
    /// Failed to read or write the PCD file
    #[error("Failed to access PCD file")]
    Io(#[from] std::io::Error),

    /// Unsupported header
    #[error("Unsupported PCD header")]
    UnsupportedProperty,

    /// Malformed PCD header
    #[error("Malformed PCD header")]
    MalformedHeader,

    /// Malformed point record
    #[error("Malformed PCD point record {0}")]
    MalformedPoint(usize),

    /// The point cloud has a different number of colors than points
    #[error("Point cloud has {points} points but {colors} colors")]
    ColorCountMismatch {
        /// The number of points.
        points: usize,
        /// The number of colors.
        colors: usize,
    },

    /// Invalid PCD file extension
    #[error("Invalid PCD file extension. Got:{0}")]
    InvalidFileExtension(String),
}

/// The encoding of the PCD `DATA` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdEncoding {
    /// One whitespace separated record per line.
    Ascii,
    /// Packed little endian records.
    Binary,
}

pub(crate) fn check_pcd_extension(path: &std::path::Path) -> Result<(), PcdError> {
    let Some(file_ext) = path.extension() else {
        return Err(PcdError::InvalidFileExtension("".into()));
    };

    if !file_ext.eq_ignore_ascii_case("pcd") {
        return Err(PcdError::InvalidFileExtension(
            file_ext.to_string_lossy().to_string(),
        ));
    }

    Ok(())
}
