use glam::DVec3;

/// A single point of a colored point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    /// The x coordinate in camera space.
    pub x: f64,
    /// The y coordinate in camera space.
    pub y: f64,
    /// The z coordinate in camera space.
    pub z: f64,
    /// The red channel.
    pub r: u8,
    /// The green channel.
    pub g: u8,
    /// The blue channel.
    pub b: u8,
}

/// A point cloud with points, colors, and normals.
///
/// Colors and normals, when present, hold one entry per point in the same order as the points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    ///
    /// The lengths are not checked here; the writers reject a cloud whose colors do not
    /// match its points.
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Get the colors with each 8-bit channel mapped to `[0, 1]`.
    ///
    /// Point cloud encoders consume colors in this normalized convention.
    pub fn colors_normalized(&self) -> Option<Vec<[f64; 3]>> {
        self.colors.as_ref().map(|colors| {
            colors
                .iter()
                .map(|c| {
                    [
                        c[0] as f64 / 255.0,
                        c[1] as f64 / 255.0,
                        c[2] as f64 / 255.0,
                    ]
                })
                .collect()
        })
    }

    /// Get the point at the given index together with its color.
    ///
    /// Points without color are reported as black.
    pub fn get(&self, index: usize) -> Option<ColoredPoint> {
        let [x, y, z] = *self.points.get(index)?;
        let [r, g, b] = self
            .colors
            .as_ref()
            .and_then(|colors| colors.get(index).copied())
            .unwrap_or_default();
        Some(ColoredPoint { x, y, z, r, g, b })
    }

    /// Iterate over the points together with their colors, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = ColoredPoint> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Get the minimum bound of the point cloud.
    pub fn get_min_bound(&self) -> DVec3 {
        self.points
            .iter()
            .map(|&p| DVec3::from_array(p))
            .reduce(|a, b| a.min(b))
            .unwrap_or(DVec3::ZERO)
    }

    /// Get the maximum bound of the point cloud.
    pub fn get_max_bound(&self) -> DVec3 {
        self.points
            .iter()
            .map(|&p| DVec3::from_array(p))
            .reduce(|a, b| a.max(b))
            .unwrap_or(DVec3::ZERO)
    }
}
