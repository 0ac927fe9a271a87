use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use depthcloud_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Number of samples in an image of this size with `channels` samples per pixel.
    ///
    /// Returns `None` if the count does not fit in a `usize`.
    #[inline]
    pub fn num_samples(&self, channels: usize) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(channels)
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

impl From<ImageSize> for [u32; 2] {
    fn from(size: ImageSize) -> Self {
        [size.width as u32, size.height as u32]
    }
}

/// An owned raster with `CHANNELS` interleaved samples per pixel.
///
/// Samples are stored row by row, so the flat buffer has the (H, W, C) layout and the
/// sample `c` of pixel `(x, y)` lives at `(y * width + x) * CHANNELS + c`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Wrap a flat sample buffer.
    ///
    /// # Errors
    ///
    /// [`ImageError::InvalidChannelShape`] if `data` does not hold exactly
    /// `width * height * CHANNELS` samples, [`ImageError::SizeOverflow`] if that count
    /// does not fit in a `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use depthcloud_image::{Image, ImageSize};
    ///
    /// let depth = Image::<u16, 1>::new(
    ///     ImageSize {
    ///         width: 4,
    ///         height: 2,
    ///     },
    ///     vec![1000; 8],
    /// ).unwrap();
    ///
    /// assert_eq!(depth.width(), 4);
    /// assert_eq!(depth.height(), 2);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = size
            .num_samples(CHANNELS)
            .ok_or(ImageError::SizeOverflow(size))?;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }

        Ok(Self { size, data })
    }

    /// Create an image with every sample set to `val`.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let len = size
            .num_samples(CHANNELS)
            .ok_or(ImageError::SizeOverflow(size))?;
        Self::new(size, vec![val; len])
    }

    /// The size of the image in pixels.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// The number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// The samples as a flat slice in (H, W, C) order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The samples of pixel `(x, y)`, or `None` outside the image.
    ///
    /// # Examples
    ///
    /// ```
    /// use depthcloud_image::Image;
    ///
    /// let color = Image::<u8, 3>::new([2, 1].into(), vec![1, 2, 3, 4, 5, 6]).unwrap();
    ///
    /// assert_eq!(color.pixel(1, 0), Some(&[4, 5, 6]));
    /// assert_eq!(color.pixel(2, 0), None);
    /// ```
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[T; CHANNELS]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let start = (y * self.width() + x) * CHANNELS;
        self.data[start..start + CHANNELS].try_into().ok()
    }
}
