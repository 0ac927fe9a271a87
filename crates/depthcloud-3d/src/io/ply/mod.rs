mod parser;
mod properties;
mod writer;

pub use parser::*;
pub use properties::*;
pub use writer::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write the PLY file
    #[error("Failed to access PLY file")]
    Io(#[from] std::io::Error),

    /// Failed to deserialize PLY file
    #[error("Failed to deserialize PLY file")]
    Deserialize(#[from] bincode::error::DecodeError),

    /// Unsupported PLY property
    #[error("Unsupported PLY property")]
    UnsupportedProperty,

    /// Malformed vertex record
    #[error("Malformed PLY vertex {0}")]
    MalformedVertex(usize),

    /// The header declares more vertices than the reader accepts
    #[error("PLY file declares too many vertices: {0}")]
    TooManyVertices(usize),

    /// The point cloud has a different number of colors than points
    #[error("Point cloud has {points} points but {colors} colors")]
    ColorCountMismatch {
        /// The number of points.
        points: usize,
        /// The number of colors.
        colors: usize,
    },

    /// Invalid PLY file extension
    #[error("Invalid PLY file extension. Got:{0}")]
    InvalidFileExtension(String),
}

/// The encoding of the PLY body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyEncoding {
    /// One whitespace separated vertex per line.
    Ascii,
    /// Packed little endian vertices.
    BinaryLittleEndian,
}

pub(crate) fn check_ply_extension(path: &std::path::Path) -> Result<(), PlyError> {
    let Some(file_ext) = path.extension() else {
        return Err(PlyError::InvalidFileExtension("".into()));
    };

    if !file_ext.eq_ignore_ascii_case("ply") {
        return Err(PlyError::InvalidFileExtension(
            file_ext.to_string_lossy().to_string(),
        ));
    }

    Ok(())
}
