use std::path::PathBuf;

/// Error types for reading and writing images.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// The input file is missing.
    #[error("Image file {0} does not exist")]
    FileDoesNotExist(PathBuf),

    /// The file extension does not match the codec.
    #[error("Unexpected image file extension: {0}")]
    InvalidFileExtension(PathBuf),

    /// The file cannot be opened, read or created.
    #[error("Image file access failed. {0}")]
    FileError(#[from] std::io::Error),

    /// The decoded samples do not form a valid image.
    #[error("Decoded samples do not form an image. {0}")]
    ImageCreationError(#[from] depthcloud_image::ImageError),

    /// The image crate failed to decode the file.
    #[error("Image decoding failed. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// The decoded pixel layout is not a color or depth layout.
    #[error("Unsupported pixel layout for this image")]
    UnsupportedImageFormat,

    /// The PNG encoder failed.
    #[error("PNG encoding failed. {0}")]
    PngEncodingError(String),

    /// The PNG decoder failed or the samples have the wrong layout.
    #[error("PNG decoding failed. {0}")]
    PngDecodeError(String),
}
