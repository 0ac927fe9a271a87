use argh::FromArgs;
use std::path::PathBuf;

use depthcloud::k3d::rgbd::{InvalidDepthPolicy, DEFAULT_DEPTH_SCALE};
use depthcloud::pipeline::{self, PipelineConfig};

fn default_depth_scale() -> f64 {
    DEFAULT_DEPTH_SCALE
}

#[derive(FromArgs)]
/// Back-project a registered color and depth image pair into a colored point cloud
struct Args {
    /// path to the JSON file with the camera intrinsics
    #[argh(option)]
    intrinsics: PathBuf,

    /// path to the color image
    #[argh(option)]
    color: PathBuf,

    /// path to the 16-bit depth image
    #[argh(option)]
    depth: PathBuf,

    /// path to the output point cloud, `.pcd` or `.ply`
    #[argh(option)]
    output: PathBuf,

    /// divisor from raw depth units to meters
    #[argh(option, default = "default_depth_scale()")]
    depth_scale: f64,

    /// leave pixels without depth out of the point cloud
    #[argh(switch)]
    skip_invalid_depth: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let invalid_depth = if args.skip_invalid_depth {
        InvalidDepthPolicy::Skip
    } else {
        InvalidDepthPolicy::Keep
    };

    let config = PipelineConfig::new(args.intrinsics, args.color, args.depth, args.output)
        .with_depth_scale(args.depth_scale)
        .with_invalid_depth(invalid_depth);

    let summary = pipeline::run(&config)?;
    log::debug!("{summary:?}");

    println!(
        "Wrote {} points from a {}x{} image to {}",
        summary.num_points,
        summary.image_size.width,
        summary.image_size.height,
        config.output_path.display()
    );

    Ok(())
}
