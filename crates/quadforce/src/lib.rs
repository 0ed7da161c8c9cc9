//! Force-directed graph layout with a Barnes-Hut quadtree.
//!
//! Nodes repel each other with an inverse-square force, edges act as
//! springs with a rest length, and a quadratic centering force keeps the
//! graph near a target point. Iterating these forces moves the nodes in the
//! plane until per-step displacement drops below the stabilization
//! thresholds.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ ForceLayout  │──▶│  QuadTree  │──▶│    Forces    │──▶│  Integrator  │
//! │ nodes, edges │   │ (rebuilt   │   │ repulsion ∥  │   │ clamp, bound │
//! │ pins, bounds │   │  per step) │   │ springs, ctr │   │ statistics   │
//! └──────────────┘   └────────────┘   └──────────────┘   └──────────────┘
//!        ▲                                                       │
//!        └──────── stabilization check, `changed` / `stabilized` ┘
//! ```
//!
//! Only the repulsion pass runs in parallel (rayon); everything else in a
//! step is sequential.
//!
//! ## Example
//!
//! ```
//! use glam::Vec3;
//! use quadforce::ForceLayout;
//!
//! let mut layout = ForceLayout::new();
//! let a = layout.add_node(Vec3::new(0.0, 0.0, 0.0))?;
//! let b = layout.add_node(Vec3::new(200.0, 0.0, 0.0))?;
//! layout.add_edge(a, b, true);
//!
//! let stats = layout.step(10)?;
//! assert!(stats.max > 0.0);
//! # Ok::<(), quadforce::LayoutError>(())
//! ```

mod bounds;
pub mod config;
mod error;
mod forces;
mod integrator;
mod layout;
pub mod quadtree;
mod signal;

pub use bounds::Bounds;
pub use config::{DEFAULT_BOUNDS_MAX, DEFAULT_BOUNDS_MIN, LayoutConfig};
pub use error::LayoutError;
pub use forces::ForceAccumulator;
pub use integrator::{POSITION_MAGNITUDE_THRESHOLD, StepStats, integrate, validate_position};
pub use layout::{Callback, ForceLayout};
pub use quadtree::{BARNES_HUT_THETA, COINCIDENT_JITTER, QuadTree};
pub use signal::{HandlerError, HandlerId, HandlerResult, Signal};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
