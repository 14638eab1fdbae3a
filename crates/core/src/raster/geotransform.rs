//! North-up affine georeferencing

use serde::{Deserialize, Serialize};

/// Relative tolerance when comparing lattices of co-registered rasters.
const GRID_TOLERANCE: f64 = 1e-9;

/// Maps pixel indices to map coordinates for a north-up grid.
///
/// `x = origin_x + col * pixel_width`, `y = origin_y + row * pixel_height`,
/// where the origin is the outer corner of pixel `(0, 0)` and `pixel_height`
/// is negative for the usual top-down row order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= GRID_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    fn at(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Center of pixel `(col, row)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.at(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Outer corner of pixel `(col, row)`
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.at(col as f64, row as f64)
    }

    /// Fractional `(col, row)` of a map coordinate; NaN for a degenerate grid
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Transform of a window whose first pixel is `(col, row)` of this grid
    pub fn offset(&self, col: usize, row: usize) -> Self {
        let (origin_x, origin_y) = self.pixel_to_geo_corner(col, row);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    pub fn same_resolution(&self, other: &GeoTransform) -> bool {
        close(self.pixel_width, other.pixel_width) && close(self.pixel_height, other.pixel_height)
    }

    /// Same resolution and same origin
    pub fn same_grid(&self, other: &GeoTransform) -> bool {
        self.same_resolution(other)
            && close(self.origin_x, other.origin_x)
            && close(self.origin_y, other.origin_y)
    }

    /// `(min_x, min_y, max_x, max_y)` covered by `width` x `height` pixels
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(width, height);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_and_inverse() {
        let gt = GeoTransform::new(300_000.0, 4_600_000.0, 10.0, -10.0);
        assert_eq!(gt.pixel_to_geo(2, 1), (300_025.0, 4_599_985.0));

        let (col, row) = gt.geo_to_pixel(300_025.0, 4_599_985.0);
        assert_relative_eq!(col, 2.5, epsilon = 1e-10);
        assert_relative_eq!(row, 1.5, epsilon = 1e-10);

        let flat = GeoTransform::new(0.0, 0.0, 0.0, -10.0);
        assert!(flat.geo_to_pixel(1.0, 1.0).0.is_nan());
    }

    #[test]
    fn test_bounds_of_top_down_grid() {
        let gt = GeoTransform::new(0.0, 100.0, 20.0, -20.0);
        assert_eq!(gt.bounds(3, 5), (0.0, 0.0, 60.0, 100.0));
    }

    #[test]
    fn test_offset_keeps_resolution() {
        let gt = GeoTransform::new(500.0, 1000.0, 20.0, -20.0);
        let window = gt.offset(3, 2);

        assert_relative_eq!(window.origin_x, 560.0, epsilon = 1e-10);
        assert_relative_eq!(window.origin_y, 960.0, epsilon = 1e-10);
        assert!(window.same_resolution(&gt));
        assert!(!window.same_grid(&gt));
        assert!(gt.same_grid(&GeoTransform::new(500.0 + 1e-8, 1000.0, 20.0, -20.0)));
    }
}
