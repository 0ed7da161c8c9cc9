//! Explicit position update from net forces.

use glam::{DVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::config::LayoutConfig;
use crate::{LayoutError, Result};

/// Positions further than this from the origin are treated as a diverged layout.
pub const POSITION_MAGNITUDE_THRESHOLD: f64 = 1e6;

/// Displacement totals of one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    /// Sum of every node's displacement length.
    pub total: f64,
    /// `total` divided by the node count, pinned nodes included.
    pub average: f64,
    /// Largest single-node displacement.
    pub max: f64,
}

impl StepStats {
    /// The `(total, average, max)` triple.
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.total, self.average, self.max)
    }
}

/// Reject positions that are non-finite or implausibly far from the origin.
pub fn validate_position(pos: Vec3, context: &'static str, index: usize) -> Result<()> {
    if !pos.is_finite() {
        return Err(LayoutError::NonFinitePosition { context, index });
    }
    let magnitude = pos.as_dvec3().length();
    if !magnitude.is_finite() || magnitude > POSITION_MAGNITUDE_THRESHOLD {
        return Err(LayoutError::PositionMagnitude {
            magnitude,
            threshold: POSITION_MAGNITUDE_THRESHOLD,
            context,
            index,
        });
    }
    Ok(())
}

/// Move every unpinned node by `delta_t * force`, clamped in length and to `bounds`.
///
/// `xy` mirrors the x/y of `positions` in f64 and is kept in sync. Pinned
/// nodes are only clamped. Fails on the first node whose new position is
/// invalid.
pub fn integrate(
    positions: &mut [Vec3],
    xy: &mut [DVec2],
    pinned: &[bool],
    forces: &[DVec2],
    config: &LayoutConfig,
    bounds: &Bounds,
) -> Result<StepStats> {
    let n = positions.len();
    let mut total = 0.0;
    let mut max = 0.0_f64;

    for i in 0..n {
        if pinned[i] {
            positions[i] = bounds.clamp(positions[i]);
            xy[i] = DVec2::new(positions[i].x as f64, positions[i].y as f64);
            continue;
        }

        let mut delta = config.delta_t * forces[i];
        let len_sq = delta.length_squared();
        if len_sq > config.max_displacement_squared {
            delta *= (config.max_displacement_squared / len_sq).sqrt();
        }

        let pos = &mut positions[i];
        pos.x += delta.x as f32;
        pos.y += delta.y as f32;
        *pos = bounds.clamp(*pos);
        validate_position(*pos, "step:post", i)?;
        xy[i] = DVec2::new(pos.x as f64, pos.y as f64);

        let dist = delta.length();
        total += dist;
        max = max.max(dist);
    }

    Ok(StepStats {
        total,
        average: total / n as f64,
        max,
    })
}
