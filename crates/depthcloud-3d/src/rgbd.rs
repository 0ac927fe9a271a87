use depthcloud_image::{Image, ImageSize};

use crate::camera::CameraIntrinsics;
use crate::pointcloud::PointCloud;

/// Default divisor from raw depth units to meters (millimeter sensors).
pub const DEFAULT_DEPTH_SCALE: f64 = 1000.0;

/// Error types for the rgbd module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RgbdError {
    /// A flat buffer does not hold one entry per pixel of the intrinsics grid
    #[error("{name} buffer has {actual} elements, expected {expected} for a {size} grid")]
    DimensionMismatch {
        /// Which buffer failed the check, `color` or `depth`.
        name: &'static str,
        /// The grid declared by the intrinsics.
        size: ImageSize,
        /// The expected number of elements.
        expected: usize,
        /// The number of elements supplied.
        actual: usize,
    },

    /// An image does not have the size declared by the intrinsics
    #[error("{name} image is {actual}, expected {expected}")]
    ImageSizeMismatch {
        /// Which image failed the check, `color` or `depth`.
        name: &'static str,
        /// The size declared by the intrinsics.
        expected: ImageSize,
        /// The size of the image.
        actual: ImageSize,
    },

    /// The grid declared by the intrinsics has more samples than fit in memory
    #[error("{0} is too large to back-project")]
    GridTooLarge(ImageSize),

    /// The depth scale is zero, negative or not finite
    #[error("Invalid depth scale: {0}")]
    InvalidScale(f64),

    /// A focal length is zero or not finite
    #[error("Invalid focal lengths: fx = {fx}, fy = {fy}")]
    InvalidFocalLength {
        /// The horizontal focal length.
        fx: f64,
        /// The vertical focal length.
        fy: f64,
    },
}

/// What to do with pixels whose raw depth is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidDepthPolicy {
    /// Emit the pixel as a point at the camera origin.
    #[default]
    Keep,
    /// Leave the pixel out of the point cloud.
    Skip,
}

/// A color image paired with the depth image registered to it.
#[derive(Debug, Clone)]
pub struct RgbdImage {
    color: Image<u8, 3>,
    depth: Image<u16, 1>,
}

impl RgbdImage {
    /// Pairs a color and a depth image of the same size.
    pub fn new(color: Image<u8, 3>, depth: Image<u16, 1>) -> Result<Self, RgbdError> {
        if color.size() != depth.size() {
            return Err(RgbdError::ImageSizeMismatch {
                name: "depth",
                expected: color.size(),
                actual: depth.size(),
            });
        }
        Ok(Self { color, depth })
    }

    /// Returns the size shared by both images.
    pub fn size(&self) -> ImageSize {
        self.color.size()
    }

    /// The color image.
    pub fn color(&self) -> &Image<u8, 3> {
        &self.color
    }

    /// The depth image.
    pub fn depth(&self) -> &Image<u16, 1> {
        &self.depth
    }

    /// Get the raw depth value at a specific pixel.
    #[inline]
    pub fn get_depth(&self, x: usize, y: usize) -> Option<u16> {
        self.depth.pixel(x, y).map(|&[raw]| raw)
    }

    /// Get the color value at a specific pixel.
    #[inline]
    pub fn get_color(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        self.color.pixel(x, y).copied()
    }

    /// Back-project the image pair into a colored point cloud.
    ///
    /// See [`rgbd_to_pointcloud`].
    pub fn to_pointcloud(
        &self,
        intrinsics: &CameraIntrinsics,
        depth_scale: f64,
        policy: InvalidDepthPolicy,
    ) -> Result<PointCloud, RgbdError> {
        rgbd_to_pointcloud_with_policy(&self.color, &self.depth, intrinsics, depth_scale, policy)
    }
}

// checks that a flat buffer holds `channels` samples for every pixel of `size`
fn check_buffer_len(
    name: &'static str,
    size: ImageSize,
    channels: usize,
    actual: usize,
) -> Result<(), RgbdError> {
    let expected = size
        .num_samples(channels)
        .ok_or(RgbdError::GridTooLarge(size))?;

    if actual != expected {
        return Err(RgbdError::DimensionMismatch {
            name,
            size,
            expected,
            actual,
        });
    }

    Ok(())
}

fn check_image_size<T, const C: usize>(
    name: &'static str,
    image: &Image<T, C>,
    intrinsics: &CameraIntrinsics,
) -> Result<(), RgbdError> {
    let size = intrinsics.image_size();
    check_buffer_len(name, size, C, image.as_slice().len())?;

    // same number of samples laid out on a different grid, e.g. a transposed image
    if image.size() != size {
        return Err(RgbdError::ImageSizeMismatch {
            name,
            expected: size,
            actual: image.size(),
        });
    }

    Ok(())
}

/// Back-project a color and depth image pair into a colored point cloud.
///
/// Every pixel produces exactly one point, in row-major raster order. The depth of pixel
/// `(u, v)` is `z = depth / depth_scale` and its position follows the pinhole model
/// `x = (u - cx) * z / fx`, `y = (v - cy) * z / fy`. Pixels with a raw depth of zero end
/// up at the camera origin.
///
/// # Arguments
///
/// * `color` - The color image with the size declared by the intrinsics.
/// * `depth` - The raw depth image registered to the color image.
/// * `intrinsics` - The pinhole intrinsics of the depth camera.
/// * `depth_scale` - The divisor from raw depth units to metric units.
///
/// # Errors
///
/// [`RgbdError::DimensionMismatch`] if an image does not hold one sample per pixel of the
/// intrinsics grid, [`RgbdError::ImageSizeMismatch`] if it holds the right number of pixels
/// on a different grid, [`RgbdError::InvalidScale`] if `depth_scale` is not a positive
/// finite number and [`RgbdError::InvalidFocalLength`] if `fx` or `fy` is zero or not finite.
///
/// # Example
///
/// ```
/// use depthcloud_3d::camera::CameraIntrinsics;
/// use depthcloud_3d::rgbd::rgbd_to_pointcloud;
/// use depthcloud_image::Image;
///
/// let intrinsics = CameraIntrinsics::new(0.5, 0.5, 1.0, 1.0, 2, 1);
/// let color = Image::<u8, 3>::new([2, 1].into(), vec![10, 20, 30, 40, 50, 60]).unwrap();
/// let depth = Image::<u16, 1>::new([2, 1].into(), vec![2, 4]).unwrap();
///
/// let pointcloud = rgbd_to_pointcloud(&color, &depth, &intrinsics, 1.0).unwrap();
/// assert_eq!(pointcloud.points(), &[[-1.0, -1.0, 2.0], [2.0, 2.0, 4.0]]);
/// ```
pub fn rgbd_to_pointcloud(
    color: &Image<u8, 3>,
    depth: &Image<u16, 1>,
    intrinsics: &CameraIntrinsics,
    depth_scale: f64,
) -> Result<PointCloud, RgbdError> {
    rgbd_to_pointcloud_with_policy(
        color,
        depth,
        intrinsics,
        depth_scale,
        InvalidDepthPolicy::Keep,
    )
}

/// Back-project a color and depth image pair, choosing how zero depth is handled.
///
/// With [`InvalidDepthPolicy::Skip`] the pixels with a raw depth of zero are left out and
/// the remaining points keep their relative raster order.
pub fn rgbd_to_pointcloud_with_policy(
    color: &Image<u8, 3>,
    depth: &Image<u16, 1>,
    intrinsics: &CameraIntrinsics,
    depth_scale: f64,
    policy: InvalidDepthPolicy,
) -> Result<PointCloud, RgbdError> {
    check_image_size("color", color, intrinsics)?;
    check_image_size("depth", depth, intrinsics)?;

    backproject_buffers(
        color.as_slice(),
        depth.as_slice(),
        intrinsics,
        depth_scale,
        policy,
    )
}

/// Back-project flat row-major buffers into a colored point cloud.
///
/// # Arguments
///
/// * `color` - Interleaved RGB samples, `width * height * 3` values.
/// * `depth` - Raw depth samples, `width * height` values.
/// * `intrinsics` - The pinhole intrinsics declaring the grid size.
/// * `depth_scale` - The divisor from raw depth units to metric units.
/// * `policy` - What to do with zero depth pixels.
///
/// # Errors
///
/// [`RgbdError::DimensionMismatch`] if a buffer length does not match the grid,
/// [`RgbdError::GridTooLarge`] if the grid sample count overflows,
/// [`RgbdError::InvalidScale`] if `depth_scale` is not a positive finite number and
/// [`RgbdError::InvalidFocalLength`] if `fx` or `fy` is zero or not finite.
pub fn backproject_buffers(
    color: &[u8],
    depth: &[u16],
    intrinsics: &CameraIntrinsics,
    depth_scale: f64,
    policy: InvalidDepthPolicy,
) -> Result<PointCloud, RgbdError> {
    if !depth_scale.is_finite() || depth_scale <= 0.0 {
        return Err(RgbdError::InvalidScale(depth_scale));
    }

    let (fx, fy) = (intrinsics.fx, intrinsics.fy);
    if !fx.is_finite() || !fy.is_finite() || fx == 0.0 || fy == 0.0 {
        return Err(RgbdError::InvalidFocalLength { fx, fy });
    }

    let size = intrinsics.image_size();
    check_buffer_len("depth", size, 1, depth.len())?;
    check_buffer_len("color", size, 3, color.len())?;

    let num_pixels = depth.len();
    let mut points = Vec::with_capacity(num_pixels);
    let mut colors = Vec::with_capacity(num_pixels);

    // rows outer, columns inner: same order as the flattened buffers
    for (v, (depth_row, color_row)) in depth
        .chunks_exact(size.width.max(1))
        .zip(color.chunks_exact(size.width.max(1) * 3))
        .enumerate()
    {
        for (u, (&raw, rgb)) in depth_row.iter().zip(color_row.chunks_exact(3)).enumerate() {
            if raw == 0 {
                if policy == InvalidDepthPolicy::Skip {
                    continue;
                }
                points.push([0.0, 0.0, 0.0]);
            } else {
                let z = raw as f64 / depth_scale;
                points.push(intrinsics.unproject(u as f64, v as f64, z));
            }
            colors.push([rgb[0], rgb[1], rgb[2]]);
        }
    }

    Ok(PointCloud::new(points, Some(colors), None))
}
