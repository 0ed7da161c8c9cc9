//! Axis-aligned limits on node positions.

use glam::{DVec2, Vec3};

use crate::config::{DEFAULT_BOUNDS_MAX, DEFAULT_BOUNDS_MIN};

/// Per-axis position limits. An infinite component disables that side of the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_BOUNDS_MIN,
            max: DEFAULT_BOUNDS_MAX,
        }
    }
}

impl Bounds {
    /// Create bounds from two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Bounds that never clamp.
    pub fn unbounded() -> Self {
        Self {
            min: Vec3::NEG_INFINITY,
            max: Vec3::INFINITY,
        }
    }

    /// Clamp `pos` on every axis side that has a finite limit.
    pub fn clamp(&self, pos: Vec3) -> Vec3 {
        let (lo, hi) = (self.min.to_array(), self.max.to_array());
        let mut out = pos.to_array();
        for axis in 0..3 {
            if lo[axis].is_finite() {
                out[axis] = out[axis].max(lo[axis]);
            }
            if hi[axis].is_finite() {
                out[axis] = out[axis].min(hi[axis]);
            }
        }
        Vec3::from_array(out)
    }

    /// Whether both limits of `axis` (0 = x, 1 = y, 2 = z) are finite.
    pub fn is_finite_axis(&self, axis: usize) -> bool {
        self.min[axis].is_finite() && self.max[axis].is_finite()
    }

    /// Midpoint of the x/y limits, keeping `fallback` on axes that are open.
    pub fn center_xy(&self, fallback: DVec2) -> DVec2 {
        let mut center = fallback;
        if self.is_finite_axis(0) {
            center.x = (self.min.x as f64 + self.max.x as f64) * 0.5;
        }
        if self.is_finite_axis(1) {
            center.y = (self.min.y as f64 + self.max.y as f64) * 0.5;
        }
        center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_ordered() {
        let b = Bounds::new(Vec3::new(10.0, -5.0, 1.0), Vec3::new(-10.0, 5.0, -1.0));
        assert_eq!(b.min, Vec3::new(-10.0, -5.0, -1.0));
        assert_eq!(b.max, Vec3::new(10.0, 5.0, 1.0));
    }

    #[test]
    fn clamps_only_finite_sides() {
        let b = Bounds::new(
            Vec3::new(f32::NEG_INFINITY, -1.0, 0.0),
            Vec3::new(5.0, f32::INFINITY, f32::INFINITY),
        );
        let p = b.clamp(Vec3::new(-1e5, -3.0, -2.0));
        assert_eq!(p, Vec3::new(-1e5, -1.0, 0.0));
        let p = b.clamp(Vec3::new(9.0, 1e5, 1e5));
        assert_eq!(p, Vec3::new(5.0, 1e5, 1e5));
    }

    #[test]
    fn unbounded_is_identity() {
        let p = Vec3::new(123.0, -456.0, 7.0);
        assert_eq!(Bounds::unbounded().clamp(p), p);
    }

    #[test]
    fn center_uses_finite_pairs_only() {
        let center = Bounds::default().center_xy(DVec2::new(3.0, 4.0));
        assert_eq!(center, DVec2::new(3.0, 200.0));

        let b = Bounds::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(30.0, 20.0, 0.0));
        assert_eq!(b.center_xy(DVec2::ZERO), DVec2::new(10.0, 10.0));
    }
}
