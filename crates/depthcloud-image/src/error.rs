use crate::image::ImageSize;

/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// The sample buffer does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// The number of samples of the image does not fit in memory.
    #[error("Image size {0} is too large")]
    SizeOverflow(ImageSize),
}
