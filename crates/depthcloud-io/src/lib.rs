#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`IoError`](error::IoError) variants for file access and
/// encoding/decoding failures.
pub mod error;

/// High-level image reading functions.
///
/// Decodes any format supported by the `image` crate into the color and depth
/// layouts used by the back-projection.
pub mod functional;

/// PNG image encoding and decoding.
///
/// Read and write 8-bit RGB and 16-bit grayscale PNG images.
pub mod png;

/// Internal utility functions for image bit depth conversion.
mod conv_utils;

pub(crate) use conv_utils::*;
