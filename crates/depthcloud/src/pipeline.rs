use std::path::PathBuf;

use depthcloud_3d::io::intrinsics::{read_intrinsics_json, IntrinsicsError};
use depthcloud_3d::io::{write_pointcloud, PointCloudIoError};
use depthcloud_3d::rgbd::{
    rgbd_to_pointcloud_with_policy, InvalidDepthPolicy, RgbdError, DEFAULT_DEPTH_SCALE,
};
use depthcloud_image::ImageSize;
use depthcloud_io::error::IoError;
use depthcloud_io::functional::{read_image_any_mono16, read_image_any_rgb8};

/// Error types for the pipeline module.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An input file does not exist
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    /// The intrinsics file is not a valid intrinsics document
    #[error("Malformed intrinsics: {0}")]
    MalformedIntrinsics(String),

    /// The images do not match the grid declared by the intrinsics
    #[error(transparent)]
    DimensionMismatch(RgbdError),

    /// The depth scale is zero, negative or not finite
    #[error("Invalid depth scale: {0}")]
    InvalidScale(f64),

    /// An input image exists but cannot be decoded
    #[error("Failed to read image. {0}")]
    ImageRead(IoError),

    /// The point cloud cannot be written to the output path
    #[error("Failed to write point cloud. {0}")]
    WriteFailed(#[from] PointCloudIoError),
}

impl From<IntrinsicsError> for PipelineError {
    fn from(err: IntrinsicsError) -> Self {
        match err {
            IntrinsicsError::NotFound(path) => Self::NotFound(path),
            IntrinsicsError::Malformed(msg) => Self::MalformedIntrinsics(msg),
            IntrinsicsError::Io(err) => Self::MalformedIntrinsics(err.to_string()),
        }
    }
}

impl From<IoError> for PipelineError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::FileDoesNotExist(path) => Self::NotFound(path),
            err => Self::ImageRead(err),
        }
    }
}

impl From<RgbdError> for PipelineError {
    fn from(err: RgbdError) -> Self {
        match err {
            RgbdError::InvalidScale(scale) => Self::InvalidScale(scale),
            err @ RgbdError::InvalidFocalLength { .. } => {
                Self::MalformedIntrinsics(err.to_string())
            }
            err => Self::DimensionMismatch(err),
        }
    }
}

/// The inputs and parameters of a single conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Path to the JSON intrinsics file.
    pub intrinsics_path: PathBuf,
    /// Path to the color image.
    pub color_path: PathBuf,
    /// Path to the 16-bit depth image.
    pub depth_path: PathBuf,
    /// Path to the `.pcd` or `.ply` output file.
    pub output_path: PathBuf,
    /// Divisor from raw depth units to metric units.
    pub depth_scale: f64,
    /// What to do with zero depth pixels.
    pub invalid_depth: InvalidDepthPolicy,
}

impl PipelineConfig {
    /// Create a configuration with a depth scale of 1000 that keeps zero depth pixels.
    pub fn new(
        intrinsics_path: impl Into<PathBuf>,
        color_path: impl Into<PathBuf>,
        depth_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            intrinsics_path: intrinsics_path.into(),
            color_path: color_path.into(),
            depth_path: depth_path.into(),
            output_path: output_path.into(),
            depth_scale: DEFAULT_DEPTH_SCALE,
            invalid_depth: InvalidDepthPolicy::default(),
        }
    }

    /// Set the divisor from raw depth units to metric units.
    pub fn with_depth_scale(mut self, depth_scale: f64) -> Self {
        self.depth_scale = depth_scale;
        self
    }

    /// Set what to do with zero depth pixels.
    pub fn with_invalid_depth(mut self, invalid_depth: InvalidDepthPolicy) -> Self {
        self.invalid_depth = invalid_depth;
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSummary {
    /// The number of points written.
    pub num_points: usize,
    /// The size of the input images.
    pub image_size: ImageSize,
}

/// Convert a color and depth image pair into a point cloud file.
///
/// Loads the intrinsics, the color image and the depth image, back-projects every pixel
/// and writes the result with the encoder selected by the output extension.
///
/// # Arguments
///
/// * `config` - The input paths, output path and projection parameters.
///
/// # Errors
///
/// Missing inputs are reported as [`PipelineError::NotFound`] before anything is
/// written. The output file is only created once the projection has succeeded.
pub fn run(config: &PipelineConfig) -> Result<PipelineSummary, PipelineError> {
    log::info!("Loading intrinsics from {}", config.intrinsics_path.display());
    let intrinsics = read_intrinsics_json(&config.intrinsics_path)?;
    log::debug!("Intrinsics: {intrinsics:?}");

    log::info!("Loading color image from {}", config.color_path.display());
    let color = read_image_any_rgb8(&config.color_path)?;
    log::debug!("Color image: {}", color.size());

    log::info!("Loading depth image from {}", config.depth_path.display());
    let depth = read_image_any_mono16(&config.depth_path)?;
    log::debug!("Depth image: {}", depth.size());

    log::info!(
        "Back-projecting with depth scale {} ({:?} invalid depth)",
        config.depth_scale,
        config.invalid_depth
    );
    let pointcloud = rgbd_to_pointcloud_with_policy(
        &color,
        &depth,
        &intrinsics,
        config.depth_scale,
        config.invalid_depth,
    )?;
    log::debug!(
        "Point cloud bounds: {:?} .. {:?}",
        pointcloud.get_min_bound(),
        pointcloud.get_max_bound()
    );

    log::info!(
        "Writing {} points to {}",
        pointcloud.len(),
        config.output_path.display()
    );
    write_pointcloud(&config.output_path, &pointcloud)?;

    Ok(PipelineSummary {
        num_points: pointcloud.len(),
        image_size: intrinsics.image_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use depthcloud_3d::camera::CameraIntrinsics;
    use depthcloud_3d::io::intrinsics::write_intrinsics_json;
    use depthcloud_3d::io::read_pointcloud;
    use depthcloud_image::Image;
    use depthcloud_io::png::{write_image_png_mono16, write_image_png_rgb8};
    use std::path::Path;

    // writes a 2x1 scene next to the returned config
    fn write_scene(dir: &Path, output: &str) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let intrinsics = CameraIntrinsics::new(0.5, 0.5, 1.0, 1.0, 2, 1);
        let color = Image::<u8, 3>::new([2, 1].into(), vec![10, 20, 30, 40, 50, 60])?;
        let depth = Image::<u16, 1>::new([2, 1].into(), vec![2000, 4000])?;

        let config = PipelineConfig::new(
            dir.join("intrinsics.json"),
            dir.join("color.png"),
            dir.join("depth.png"),
            dir.join(output),
        );

        write_intrinsics_json(&config.intrinsics_path, &intrinsics)?;
        write_image_png_rgb8(&config.color_path, &color)?;
        write_image_png_mono16(&config.depth_path, &depth)?;

        Ok(config)
    }

    #[test]
    fn converts_scene_to_pcd() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let config = write_scene(tmp_dir.path(), "cloud.pcd")?;

        let summary = run(&config)?;
        assert_eq!(summary.num_points, 2);
        assert_eq!(summary.image_size, ImageSize::from([2, 1]));

        let pointcloud = read_pointcloud(&config.output_path)?;
        let expected = [[-1.0, -1.0, 2.0], [2.0, 2.0, 4.0]];
        for (point, expected) in pointcloud.points().iter().zip(expected) {
            for axis in 0..3 {
                assert_relative_eq!(point[axis], expected[axis]);
            }
        }
        assert_eq!(pointcloud.colors(), Some(&[[10, 20, 30], [40, 50, 60]][..]));

        Ok(())
    }

    #[test]
    fn skips_invalid_depth_when_asked() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let config = write_scene(tmp_dir.path(), "cloud.ply")?;
        let depth = Image::<u16, 1>::new([2, 1].into(), vec![0, 4000])?;
        write_image_png_mono16(&config.depth_path, &depth)?;

        let summary = run(&config)?;
        assert_eq!(summary.num_points, 2);

        let config = config.with_invalid_depth(InvalidDepthPolicy::Skip);
        let summary = run(&config)?;
        assert_eq!(summary.num_points, 1);

        let pointcloud = read_pointcloud(&config.output_path)?;
        assert_eq!(pointcloud.colors(), Some(&[[40, 50, 60]][..]));

        Ok(())
    }

    #[test]
    fn missing_input_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let config = write_scene(tmp_dir.path(), "cloud.pcd")?;

        let missing = PipelineConfig {
            depth_path: tmp_dir.path().join("missing.png"),
            ..config.clone()
        };
        assert!(matches!(run(&missing), Err(PipelineError::NotFound(p)) if p == missing.depth_path));

        let missing = PipelineConfig {
            intrinsics_path: tmp_dir.path().join("missing.json"),
            ..config
        };
        assert!(matches!(run(&missing), Err(PipelineError::NotFound(_))));
        assert!(!missing.output_path.exists());

        Ok(())
    }

    #[test]
    fn reports_malformed_intrinsics() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let config = write_scene(tmp_dir.path(), "cloud.pcd")?;
        std::fs::write(&config.intrinsics_path, r#"{"cx": 0.5, "cy": 0.5, "fx": 1.0}"#)?;

        assert!(matches!(
            run(&config),
            Err(PipelineError::MalformedIntrinsics(_))
        ));

        Ok(())
    }

    #[test]
    fn focal_length_errors_are_malformed_intrinsics() {
        let err = PipelineError::from(RgbdError::InvalidFocalLength { fx: 0.0, fy: 1.0 });
        assert!(matches!(err, PipelineError::MalformedIntrinsics(ref msg) if msg.contains("fx = 0")));

        let err = PipelineError::from(RgbdError::GridTooLarge([usize::MAX, 2].into()));
        assert!(matches!(err, PipelineError::DimensionMismatch(_)));
    }

    #[test]
    fn reports_size_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let config = write_scene(tmp_dir.path(), "cloud.pcd")?;
        let depth = Image::<u16, 1>::new([1, 2].into(), vec![1000, 1000])?;
        write_image_png_mono16(&config.depth_path, &depth)?;

        assert!(matches!(
            run(&config),
            Err(PipelineError::DimensionMismatch(_))
        ));
        assert!(!config.output_path.exists());

        Ok(())
    }

    #[test]
    fn reports_invalid_scale_and_output() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let config = write_scene(tmp_dir.path(), "cloud.pcd")?;

        let bad_scale = config.clone().with_depth_scale(0.0);
        assert!(matches!(
            run(&bad_scale),
            Err(PipelineError::InvalidScale(s)) if s == 0.0
        ));

        let bad_output = PipelineConfig {
            output_path: tmp_dir.path().join("cloud.xyz"),
            ..config
        };
        assert!(matches!(
            run(&bad_output),
            Err(PipelineError::WriteFailed(_))
        ));

        Ok(())
    }
}
