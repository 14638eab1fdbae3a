//! Axis-aligned geographic extents

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Build from a `(min_x, min_y, max_x, max_y)` tuple as returned by `GeoTransform::bounds`
    pub fn from_bounds(bounds: (f64, f64, f64, f64)) -> Self {
        Self::new(bounds.0, bounds.1, bounds.2, bounds.3)
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    /// Whether the extent encloses no area
    pub fn is_empty(&self) -> bool {
        !(self.max_x > self.min_x && self.max_y > self.min_y)
    }

    /// Half-open containment: the max edges belong to the neighbouring cell
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y > self.min_y && y <= self.max_y
    }

    /// Overlap of two extents, `None` when they do not share any area
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let out = Extent::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(a.intersection(&b), Some(Extent::new(5.0, 5.0, 10.0, 10.0)));

        let far = Extent::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.intersection(&far), None);
    }

    #[test]
    fn test_contains_is_half_open() {
        let e = Extent::new(0.0, 0.0, 10.0, 10.0);
        assert!(e.contains(0.0, 10.0));
        assert!(!e.contains(10.0, 5.0));
        assert!(!e.contains(5.0, 0.0));
    }
}
