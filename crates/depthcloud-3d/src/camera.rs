use depthcloud_image::ImageSize;

/// The intrinsic parameters of a pinhole camera.
///
/// The focal lengths and principal point are expressed in pixels. The image
/// dimensions are the resolution of the sensor the parameters were calibrated for.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraIntrinsics {
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The image width in pixels
    pub width: usize,
    /// The image height in pixels
    pub height: usize,
}

impl CameraIntrinsics {
    /// Creates a new set of intrinsics.
    ///
    /// # Example
    ///
    /// ```
    /// use depthcloud_3d::camera::CameraIntrinsics;
    ///
    /// let intrinsics = CameraIntrinsics::new(319.5, 239.5, 525.0, 525.0, 640, 480);
    /// assert_eq!(intrinsics.image_size().width, 640);
    /// ```
    pub fn new(cx: f64, cy: f64, fx: f64, fy: f64, width: usize, height: usize) -> Self {
        Self {
            cx,
            cy,
            fx,
            fy,
            width,
            height,
        }
    }

    /// The image size the intrinsics were calibrated for.
    #[inline]
    pub fn image_size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Back-project a pixel with a metric depth into camera coordinates.
    ///
    /// # Arguments
    ///
    /// * `u` - The pixel column.
    /// * `v` - The pixel row.
    /// * `z` - The depth along the optical axis in metric units.
    ///
    /// # Returns
    ///
    /// The point `[x, y, z]` with `x = (u - cx) * z / fx` and `y = (v - cy) * z / fy`.
    #[inline]
    pub fn unproject(&self, u: f64, v: f64, z: f64) -> [f64; 3] {
        [
            (u - self.cx) * z / self.fx,
            (v - self.cy) * z / self.fy,
            z,
        ]
    }
}
