use std::path::{Path, PathBuf};

use crate::pointcloud::PointCloud;

/// Camera intrinsics reader module.
pub mod intrinsics;

/// PCD reader and writer module.
pub mod pcd;

/// PLY reader and writer module.
pub mod ply;

/// Error types for extension based point cloud I/O.
#[derive(Debug, thiserror::Error)]
pub enum PointCloudIoError {
    /// The file extension does not select a supported format
    #[error("Unsupported point cloud file extension: {0}")]
    UnsupportedExtension(PathBuf),

    /// Failed to read or write a PCD file
    #[error(transparent)]
    Pcd(#[from] pcd::PcdError),

    /// Failed to read or write a PLY file
    #[error(transparent)]
    Ply(#[from] ply::PlyError),
}

enum PointCloudFormat {
    Pcd,
    Ply,
}

fn format_from_path(path: &Path) -> Result<PointCloudFormat, PointCloudIoError> {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match ext.as_deref() {
        Some("pcd") => Ok(PointCloudFormat::Pcd),
        Some("ply") => Ok(PointCloudFormat::Ply),
        _ => Err(PointCloudIoError::UnsupportedExtension(path.to_path_buf())),
    }
}

/// Write a point cloud, picking the encoder from the file extension.
///
/// `.pcd` files are written as binary PCD and `.ply` files as binary little endian PLY.
/// Positions are stored as 32-bit floats and colors as 8-bit channels.
///
/// # Arguments
///
/// * `path` - The destination file.
/// * `pointcloud` - The point cloud to persist.
pub fn write_pointcloud(
    path: impl AsRef<Path>,
    pointcloud: &PointCloud,
) -> Result<(), PointCloudIoError> {
    let path = path.as_ref();
    match format_from_path(path)? {
        PointCloudFormat::Pcd => pcd::write_pcd(path, pointcloud, pcd::PcdEncoding::Binary)?,
        PointCloudFormat::Ply => {
            ply::write_ply(path, pointcloud, ply::PlyEncoding::BinaryLittleEndian)?
        }
    }
    Ok(())
}

/// Read a point cloud, picking the decoder from the file extension.
pub fn read_pointcloud(path: impl AsRef<Path>) -> Result<PointCloud, PointCloudIoError> {
    let path = path.as_ref();
    let pointcloud = match format_from_path(path)? {
        PointCloudFormat::Pcd => pcd::read_pcd(path)?,
        PointCloudFormat::Ply => ply::read_ply(path)?,
    };
    Ok(pointcloud)
}

// Quantize a color in [0, 1] back to 8 bits per channel.
pub(crate) fn quantize_color(color: [f64; 3]) -> [u8; 3] {
    color.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
}
