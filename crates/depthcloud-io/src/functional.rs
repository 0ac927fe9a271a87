use std::path::Path;

use depthcloud_image::{Image, ImageSize};

use crate::error::IoError;

// open the file, map it to memory and let the image crate guess the format
fn decode_image_any(file_path: impl AsRef<Path>) -> Result<image::DynamicImage, IoError> {
    let file_path = file_path.as_ref();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let file = std::fs::File::open(file_path)?;
    // SAFETY: the mapping is read-only and dropped before returning
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let img = image::ImageReader::new(std::io::Cursor::new(&mmap[..]))
        .with_guessed_format()?
        .decode()?;

    Ok(img)
}

/// Reads a color image from the given file path.
///
/// The method reads any format supported by the image crate and converts the
/// result to 8-bit RGB. Alpha channels are dropped and grayscale images are
/// replicated over the three channels.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// A RGB image with three channels (rgb8).
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let img = decode_image_any(file_path)?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}

/// Reads a depth image from the given file path.
///
/// 16-bit grayscale images are returned as is. 8-bit grayscale images are
/// widened without rescaling so the raw sensor units are kept. Any other
/// layout is rejected.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// A grayscale image with a single channel (mono16).
pub fn read_image_any_mono16(file_path: impl AsRef<Path>) -> Result<Image<u16, 1>, IoError> {
    let img = decode_image_any(file_path)?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    let data = match img.color() {
        image::ColorType::L16 => img.into_luma16().into_raw(),
        image::ColorType::L8 => img
            .into_luma8()
            .into_raw()
            .into_iter()
            .map(u16::from)
            .collect(),
        _ => return Err(IoError::UnsupportedImageFormat),
    };

    Ok(Image::new(size, data)?)
}
