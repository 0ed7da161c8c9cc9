//! Tunables for the force simulation.
//!
//! A [`LayoutConfig`] can be built in code or loaded from JSON. Every field
//! has a default, so partial documents are accepted:
//!
//! ```json
//! { "spring_rest_length": 80.0, "delta_t": 0.01 }
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{LayoutError, Result};

/// Lower bound applied to new layouts. Only the y axis is limited.
pub const DEFAULT_BOUNDS_MIN: Vec3 = Vec3::new(f32::NEG_INFINITY, -100.0, f32::NEG_INFINITY);

/// Upper bound applied to new layouts. Only the y axis is limited.
pub const DEFAULT_BOUNDS_MAX: Vec3 = Vec3::new(f32::INFINITY, 500.0, f32::INFINITY);

/// Configuration for the force-directed layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance at which an edge spring exerts no force.
    pub spring_rest_length: f64,
    /// Scale of the inverse-square repulsion between nodes.
    pub repulsive_force_constant: f64,
    /// Hookean stiffness of edge springs.
    pub spring_constant: f64,
    /// Integration time step.
    pub delta_t: f64,
    /// Coefficient of the quadratic pull toward the center position.
    pub center_force: f64,
    /// Largest single-node displacement still considered stable.
    pub stabilized_max_displacement: f64,
    /// Average displacement still considered stable.
    pub stabilized_avg_displacement: f64,
    /// Upper limit on the squared length of one node's step.
    pub max_displacement_squared: f64,
    /// Suggested seconds between host updates. Not enforced by the layout.
    pub update_interval: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spring_rest_length: 50.0,
            repulsive_force_constant: 6250.0,
            spring_constant: 1.0,
            delta_t: 0.02,
            center_force: 0.0001,
            stabilized_max_displacement: 0.02,
            stabilized_avg_displacement: 0.01,
            max_displacement_squared: 100.0,
            update_interval: 0.1,
        }
    }
}

impl LayoutConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.as_ref().display(), "layout_config_loaded");
        Ok(config)
    }

    /// Check that no value would feed NaN or runaway steps into integration.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("spring_rest_length", self.spring_rest_length),
            ("repulsive_force_constant", self.repulsive_force_constant),
            ("spring_constant", self.spring_constant),
            ("delta_t", self.delta_t),
            ("center_force", self.center_force),
            ("stabilized_max_displacement", self.stabilized_max_displacement),
            ("stabilized_avg_displacement", self.stabilized_avg_displacement),
            ("max_displacement_squared", self.max_displacement_squared),
            ("update_interval", self.update_interval),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(LayoutError::InvalidConfig(format!("{name} must be finite, got {value}")));
            }
        }

        let non_negative = [
            ("spring_rest_length", self.spring_rest_length),
            ("delta_t", self.delta_t),
            ("stabilized_max_displacement", self.stabilized_max_displacement),
            ("stabilized_avg_displacement", self.stabilized_avg_displacement),
            ("max_displacement_squared", self.max_displacement_squared),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(LayoutError::InvalidConfig(format!("{name} must be >= 0, got {value}")));
            }
        }

        Ok(())
    }
}
