use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use depthcloud_image::{Image, ImageSize};
use png::{BitDepth, ColorType, Decoder, Encoder};

use crate::{convert_buf_u16_u8, convert_buf_u8_u16, error::IoError};

// The two sample layouts a back-projection consumes.
#[derive(Clone, Copy, Debug)]
enum PngLayout {
    Rgb8,
    Gray16,
}

impl PngLayout {
    fn color_type(self) -> ColorType {
        match self {
            PngLayout::Rgb8 => ColorType::Rgb,
            PngLayout::Gray16 => ColorType::Grayscale,
        }
    }

    fn bit_depth(self) -> BitDepth {
        match self {
            PngLayout::Rgb8 => BitDepth::Eight,
            PngLayout::Gray16 => BitDepth::Sixteen,
        }
    }
}

/// Read a color PNG image as 8-bit RGB.
///
/// The file must store 8-bit RGB samples, no conversion is done.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
pub fn read_image_png_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let (size, bytes) = decode_png(file_path.as_ref(), PngLayout::Rgb8)?;
    Ok(Image::new(size, bytes)?)
}

/// Read a depth PNG image as 16-bit single channel samples.
///
/// This is the usual container of raw depth maps produced by RGB-D sensors.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
pub fn read_image_png_mono16(file_path: impl AsRef<Path>) -> Result<Image<u16, 1>, IoError> {
    let (size, bytes) = decode_png(file_path.as_ref(), PngLayout::Gray16)?;
    Ok(Image::new(size, convert_buf_u8_u16(bytes))?)
}

fn decode_png(path: &Path, layout: PngLayout) -> Result<(ImageSize, Vec<u8>), IoError> {
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }

    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if !is_png {
        return Err(IoError::InvalidFileExtension(path.to_path_buf()));
    }

    let decode_err = |e: png::DecodingError| IoError::PngDecodeError(e.to_string());

    let mut reader = Decoder::new(BufReader::new(File::open(path)?))
        .read_info()
        .map_err(decode_err)?;

    let mut bytes = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut bytes).map_err(decode_err)?;

    if (frame.color_type, frame.bit_depth) != (layout.color_type(), layout.bit_depth()) {
        return Err(IoError::PngDecodeError(format!(
            "{} holds {:?} {:?} samples, expected {layout:?}",
            path.display(),
            frame.color_type,
            frame.bit_depth
        )));
    }

    bytes.truncate(frame.buffer_size());

    let size = ImageSize {
        width: frame.width as usize,
        height: frame.height as usize,
    };

    Ok((size, bytes))
}

/// Write an 8-bit RGB image as a PNG file.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG image.
/// * `image` - The color image.
pub fn write_image_png_rgb8(
    file_path: impl AsRef<Path>,
    image: &Image<u8, 3>,
) -> Result<(), IoError> {
    encode_png(file_path.as_ref(), image.size(), image.as_slice(), PngLayout::Rgb8)
}

/// Write a 16-bit depth image as a grayscale PNG file.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG image.
/// * `image` - The depth image.
pub fn write_image_png_mono16(
    file_path: impl AsRef<Path>,
    image: &Image<u16, 1>,
) -> Result<(), IoError> {
    let bytes = convert_buf_u16_u8(image.as_slice());
    encode_png(file_path.as_ref(), image.size(), &bytes, PngLayout::Gray16)
}

fn encode_png(
    path: &Path,
    size: ImageSize,
    bytes: &[u8],
    layout: PngLayout,
) -> Result<(), IoError> {
    let encode_err = |e: png::EncodingError| IoError::PngEncodingError(e.to_string());

    let [width, height]: [u32; 2] = size.into();
    let mut encoder = Encoder::new(BufWriter::new(File::create(path)?), width, height);
    encoder.set_color(layout.color_type());
    encoder.set_depth(layout.bit_depth());

    let mut writer = encoder.write_header().map_err(encode_err)?;
    writer.write_image_data(bytes).map_err(encode_err)?;
    writer.finish().map_err(encode_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_png_rgb8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("color.png");

        let image = Image::<u8, 3>::new([2, 2].into(), (0..12).collect())?;
        write_image_png_rgb8(&file_path, &image)?;

        let image_back = read_image_png_rgb8(&file_path)?;
        assert_eq!(image_back.size(), image.size());
        assert_eq!(image_back.as_slice(), image.as_slice());

        Ok(())
    }

    #[test]
    fn read_write_png_mono16() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("depth.png");

        let image = Image::<u16, 1>::new([3, 1].into(), vec![0, 1000, 65535])?;
        write_image_png_mono16(&file_path, &image)?;

        let image_back = read_image_png_mono16(&file_path)?;
        assert_eq!(image_back.width(), 3);
        assert_eq!(image_back.height(), 1);
        assert_eq!(image_back.as_slice(), &[0, 1000, 65535]);

        Ok(())
    }

    #[test]
    fn read_png_wrong_layout() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("color.png");

        let image = Image::<u8, 3>::from_size_val([2, 2].into(), 10)?;
        write_image_png_rgb8(&file_path, &image)?;

        assert!(matches!(
            read_image_png_mono16(&file_path),
            Err(IoError::PngDecodeError(_))
        ));

        Ok(())
    }

    #[test]
    fn read_png_missing_file() {
        let res = read_image_png_rgb8("does/not/exist.png");
        assert!(matches!(res, Err(IoError::FileDoesNotExist(_))));
    }
}
