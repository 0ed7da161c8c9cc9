//! The layout controller: node storage, bounds policy and the active/inactive
//! state machine driven by a host update loop.

use std::fmt;
use std::time::{Duration, Instant};

use glam::{DVec2, Vec3};
use tracing::{debug, error, info, warn};

use crate::bounds::Bounds;
use crate::config::{DEFAULT_BOUNDS_MAX, DEFAULT_BOUNDS_MIN, LayoutConfig};
use crate::forces::ForceAccumulator;
use crate::integrator::{StepStats, integrate, validate_position};
use crate::signal::{HandlerResult, Signal};
use crate::{LayoutError, Result};

/// One-shot completion callback, invoked by the next [`ForceLayout::stop`].
pub type Callback = Box<dyn FnOnce() -> HandlerResult + Send>;

/// Force-directed layout over a growing set of nodes.
///
/// Node ids are dense indices handed out by [`add_node`](Self::add_node).
/// Nodes and edges are never removed individually; [`clear`](Self::clear)
/// resets everything.
///
/// The layout is single-writer: it performs no locking of its own. It is
/// `Send`, so a host may move it to a worker thread for
/// [`until_stable`](Self::until_stable).
pub struct ForceLayout {
    config: LayoutConfig,
    center: DVec2,
    bounds: Bounds,
    auto_center_within_bounds: bool,
    active: bool,

    positions: Vec<Vec3>,
    edges: Vec<Vec<usize>>,
    pinned: Vec<bool>,
    forces: ForceAccumulator,
    last_results: StepStats,

    callback: Option<Callback>,
    changed: Signal,
    stabilized: Signal,
}

impl fmt::Debug for ForceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceLayout")
            .field("config", &self.config)
            .field("center", &self.center)
            .field("bounds", &self.bounds)
            .field("auto_center_within_bounds", &self.auto_center_within_bounds)
            .field("active", &self.active)
            .field("node_count", &self.positions.len())
            .field("last_results", &self.last_results)
            .field("has_callback", &self.callback.is_some())
            .field("changed", &self.changed)
            .field("stabilized", &self.stabilized)
            .finish()
    }
}

impl Default for ForceLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceLayout {
    /// Layout with default tunables and default bounds.
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    /// Layout with custom tunables, default bounds and auto-centering.
    pub fn with_config(config: LayoutConfig) -> Self {
        Self::with_bounds(config, Vec3::ZERO, DEFAULT_BOUNDS_MIN, DEFAULT_BOUNDS_MAX, true)
    }

    /// Fully specified layout. Only the x/y of `center` are used.
    pub fn with_bounds(
        config: LayoutConfig,
        center: Vec3,
        bounds_min: Vec3,
        bounds_max: Vec3,
        auto_center_within_bounds: bool,
    ) -> Self {
        let mut layout = Self {
            config,
            center: DVec2::new(center.x as f64, center.y as f64),
            bounds: Bounds::new(bounds_min, bounds_max),
            auto_center_within_bounds,
            active: false,
            positions: Vec::new(),
            edges: Vec::new(),
            pinned: Vec::new(),
            forces: ForceAccumulator::new(),
            last_results: StepStats::default(),
            callback: None,
            changed: Signal::new("changed"),
            stabilized: Signal::new("stabilized"),
        };
        layout.refresh_center_from_bounds();
        layout
    }

    /// Drop all nodes and edges and return to the inactive state.
    ///
    /// A pending callback is discarded without being invoked. Signal
    /// handlers stay connected.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.edges.clear();
        self.pinned.clear();
        self.forces.resize(0);
        self.last_results = StepStats::default();
        self.active = false;
        self.callback = None;
    }

    /// Add a node and return its id. The position is clamped to the bounds.
    pub fn add_node(&mut self, position: Vec3) -> Result<usize> {
        let index = self.positions.len();
        validate_position(position, "add_node", index)?;

        self.positions.push(self.bounds.clamp(position));
        self.edges.push(Vec::new());
        self.pinned.push(false);
        self.forces.resize(index + 1);
        Ok(index)
    }

    /// Connect `source` to `target`, and `target` back to `source` when
    /// `mirror` is set. Does nothing if either id is unknown.
    pub fn add_edge(&mut self, source: usize, target: usize, mirror: bool) {
        let len = self.edges.len();
        if source >= len || target >= len {
            debug!(source, target, node_count = len, "add_edge_ignored");
            return;
        }
        self.edges[source].push(target);
        if mirror {
            self.edges[target].push(source);
        }
    }

    /// Move a node. An unknown id is ignored; an invalid position is an error.
    pub fn set_position(&mut self, index: usize, position: Vec3) -> Result<()> {
        if index >= self.positions.len() {
            return Ok(());
        }
        validate_position(position, "set_position", index)?;
        self.positions[index] = self.bounds.clamp(position);
        Ok(())
    }

    /// Pin or unpin a node. An unknown id is ignored.
    pub fn pin_node(&mut self, index: usize, pinned: bool) {
        if let Some(slot) = self.pinned.get_mut(index) {
            *slot = pinned;
        }
    }

    /// Run `iterations` simulation steps and return the statistics of the last one.
    ///
    /// Zero iterations returns the previous results unchanged; an empty
    /// layout always reports zeros.
    pub fn step(&mut self, iterations: usize) -> Result<StepStats> {
        let n = self.positions.len();
        if n == 0 {
            self.last_results = StepStats::default();
            return Ok(self.last_results);
        }

        let started = Instant::now();
        let mut xy = Vec::with_capacity(n);
        for (i, pos) in self.positions.iter_mut().enumerate() {
            validate_position(*pos, "step:pre", i)?;
            *pos = self.bounds.clamp(*pos);
            xy.push(DVec2::new(pos.x as f64, pos.y as f64));
        }

        for _ in 0..iterations {
            let forces = self.forces.accumulate(&xy, &self.edges, &self.config, self.center);
            self.last_results = integrate(
                &mut self.positions,
                &mut xy,
                &self.pinned,
                forces,
                &self.config,
                &self.bounds,
            )?;
        }

        debug!(
            iterations,
            nodes = n,
            total = self.last_results.total,
            average = self.last_results.average,
            max = self.last_results.max,
            duration_us = started.elapsed().as_micros() as u64,
            "layout_step"
        );

        Ok(self.last_results)
    }

    /// Step an active layout and stop it once both the average and the
    /// maximum displacement fall below their thresholds.
    ///
    /// An inactive layout is not stepped; the previous results are returned.
    pub fn update(&mut self, iterations: usize) -> Result<StepStats> {
        if !self.active {
            return Ok(self.last_results);
        }

        let stats = self.step(iterations)?;
        if stats.average < self.config.stabilized_avg_displacement
            && stats.max < self.config.stabilized_max_displacement
        {
            info!(
                nodes = self.positions.len(),
                average = stats.average,
                max = stats.max,
                "layout_stabilized"
            );
            self.stop();
            self.stabilized.emit();
        }
        Ok(stats)
    }

    /// Activate without a completion callback, discarding any pending one.
    pub fn start(&mut self) {
        self.arm(None);
    }

    /// Activate and invoke `callback` on the next [`stop`](Self::stop).
    pub fn start_with<F>(&mut self, callback: F)
    where
        F: FnOnce() -> HandlerResult + Send + 'static,
    {
        self.arm(Some(Box::new(callback)));
    }

    fn arm(&mut self, callback: Option<Callback>) {
        self.callback = callback;
        self.active = true;
        debug!(has_callback = self.callback.is_some(), "layout_started");
        self.changed.emit();
    }

    /// Deactivate without invoking the pending callback. The callback stays
    /// armed and fires on the next [`stop`](Self::stop).
    pub fn cancel(&mut self) {
        self.active = false;
        debug!(has_callback = self.callback.is_some(), "layout_cancelled");
        self.changed.emit();
    }

    /// Deactivate and invoke the pending callback, if any, exactly once.
    ///
    /// `changed` is emitted on every call, including when already inactive.
    pub fn stop(&mut self) {
        self.active = false;
        if let Some(callback) = self.callback.take() {
            if let Err(e) = callback() {
                error!(error = %e, "layout_callback_failed");
            }
        }
        debug!("layout_stopped");
        self.changed.emit();
    }

    /// Restart from the inactive state, discarding any pending callback.
    pub fn run(&mut self) {
        self.active = false;
        self.start();
    }

    /// Like [`run`](Self::run), with a new completion callback.
    pub fn run_with<F>(&mut self, callback: F)
    where
        F: FnOnce() -> HandlerResult + Send + 'static,
    {
        self.active = false;
        self.start_with(callback);
    }

    /// Start and call [`update`](Self::update) until the layout stabilizes or
    /// `timeout` elapses, in which case it is stopped.
    ///
    /// Blocks the calling thread for the whole run; the timeout is only
    /// checked between updates.
    pub fn until_stable(&mut self, iterations_per_update: usize, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        self.start();
        let mut updates = 0u64;
        while self.active {
            self.update(iterations_per_update)?;
            updates += 1;
            if started.elapsed() > timeout {
                warn!(
                    updates,
                    timeout_ms = timeout.as_millis() as u64,
                    average = self.last_results.average,
                    max = self.last_results.max,
                    "layout_timeout"
                );
                self.stop();
                break;
            }
        }
        info!(
            updates,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "layout_until_stable_complete"
        );
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Position of node `index`.
    pub fn position(&self, index: usize) -> Result<Vec3> {
        self.positions
            .get(index)
            .copied()
            .ok_or(LayoutError::IndexOutOfRange {
                index,
                len: self.positions.len(),
            })
    }

    /// Mutable access to a node's position. Writes are not validated or clamped
    /// until the next step.
    pub fn position_mut(&mut self, index: usize) -> Result<&mut Vec3> {
        let len = self.positions.len();
        self.positions
            .get_mut(index)
            .ok_or(LayoutError::IndexOutOfRange { index, len })
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Positions as a flat `x, y, z, x, y, z, ...` slice, ready for upload.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Neighbors stored for node `index`, if it exists.
    pub fn edges_of(&self, index: usize) -> Option<&[usize]> {
        self.edges.get(index).map(Vec::as_slice)
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.pinned.get(index).copied().unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Statistics of the most recent iteration.
    pub fn results(&self) -> StepStats {
        self.last_results
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LayoutConfig {
        &mut self.config
    }

    /// Point the centering force pulls toward, with z = 0.
    pub fn center_position(&self) -> Vec3 {
        Vec3::new(self.center.x as f32, self.center.y as f32, 0.0)
    }

    /// Set the centering target. Only x/y are used. Auto-centering will
    /// override it on the next bounds change.
    pub fn set_center_position(&mut self, center: Vec3) {
        self.center = DVec2::new(center.x as f64, center.y as f64);
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Replace the bounds and clamp every node into them immediately.
    pub fn set_bounds(&mut self, min: Vec3, max: Vec3) {
        self.bounds = Bounds::new(min, max);
        for pos in &mut self.positions {
            *pos = self.bounds.clamp(*pos);
        }
        self.refresh_center_from_bounds();
    }

    pub fn auto_center_within_bounds(&self) -> bool {
        self.auto_center_within_bounds
    }

    pub fn set_auto_center_within_bounds(&mut self, enabled: bool) {
        self.auto_center_within_bounds = enabled;
        self.refresh_center_from_bounds();
    }

    /// Emitted on every start, cancel and stop.
    pub fn changed(&self) -> &Signal {
        &self.changed
    }

    /// Emitted after [`update`](Self::update) detects a stable layout.
    pub fn stabilized(&self) -> &Signal {
        &self.stabilized
    }

    fn refresh_center_from_bounds(&mut self) {
        if self.auto_center_within_bounds {
            self.center = self.bounds.center_xy(self.center);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_signal(signal: &Signal) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        signal.connect(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        count
    }

    #[test]
    fn layout_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ForceLayout>();
    }

    #[test]
    fn default_center_follows_finite_y_bounds() {
        let layout = ForceLayout::new();
        assert_eq!(layout.center_position(), Vec3::new(0.0, 200.0, 0.0));
        assert!(layout.auto_center_within_bounds());
    }

    #[test]
    fn manual_center_survives_without_auto_center() {
        let mut layout = ForceLayout::with_bounds(
            LayoutConfig::default(),
            Vec3::new(5.0, 6.0, 7.0),
            Vec3::splat(-10.0),
            Vec3::splat(10.0),
            false,
        );
        assert_eq!(layout.center_position(), Vec3::new(5.0, 6.0, 0.0));

        layout.set_bounds(Vec3::splat(-100.0), Vec3::splat(300.0));
        assert_eq!(layout.center_position(), Vec3::new(5.0, 6.0, 0.0));

        layout.set_auto_center_within_bounds(true);
        assert_eq!(layout.center_position(), Vec3::new(100.0, 100.0, 0.0));
    }

    #[test]
    fn add_node_clamps_and_validates() {
        let mut layout = ForceLayout::new();
        let id = layout.add_node(Vec3::new(1.0, 1000.0, 3.0)).unwrap();
        assert_eq!(id, 0);
        assert_eq!(layout.position(0).unwrap(), Vec3::new(1.0, 500.0, 3.0));

        let err = layout.add_node(Vec3::new(f32::NAN, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, LayoutError::NonFinitePosition { context: "add_node", index: 1 }));
        assert_eq!(layout.node_count(), 1);
    }

    #[test]
    fn out_of_range_mutations_are_ignored() {
        let mut layout = ForceLayout::new();
        layout.add_node(Vec3::ZERO).unwrap();

        layout.add_edge(0, 5, true);
        layout.pin_node(9, true);
        layout.set_position(9, Vec3::ONE).unwrap();

        assert_eq!(layout.edges_of(0), Some(&[][..]));
        assert!(!layout.is_pinned(9));
        assert!(matches!(
            layout.position(9),
            Err(LayoutError::IndexOutOfRange { index: 9, len: 1 })
        ));
        assert!(layout.position_mut(1).is_err());
    }

    #[test]
    fn mirrored_and_one_way_edges() {
        let mut layout = ForceLayout::new();
        for _ in 0..3 {
            layout.add_node(Vec3::ZERO).unwrap();
        }
        layout.add_edge(0, 1, true);
        layout.add_edge(1, 2, false);

        assert_eq!(layout.edges_of(0), Some(&[1][..]));
        assert_eq!(layout.edges_of(1), Some(&[0, 2][..]));
        assert_eq!(layout.edges_of(2), Some(&[][..]));
    }

    #[test]
    fn step_on_empty_layout_reports_zeros() {
        let mut layout = ForceLayout::new();
        assert_eq!(layout.step(10).unwrap(), StepStats::default());
    }

    #[test]
    fn update_is_noop_while_inactive() {
        let mut layout = ForceLayout::new();
        layout.add_node(Vec3::ZERO).unwrap();
        layout.add_node(Vec3::new(10.0, 0.0, 0.0)).unwrap();

        let stats = layout.update(5).unwrap();
        assert_eq!(stats, StepStats::default());
        assert_eq!(layout.position(1).unwrap(), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn stop_invokes_callback_once_and_always_emits_changed() {
        let mut layout = ForceLayout::new();
        let changed = counting_signal(layout.changed());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        layout.start_with(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(layout.is_active());
        layout.stop();
        layout.stop();

        assert!(!layout.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(changed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancel_defers_callback_to_next_stop() {
        let mut layout = ForceLayout::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        layout.start_with(move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        layout.cancel();
        assert!(!layout.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        layout.stop();
        layout.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_discards_previous_callback() {
        let mut layout = ForceLayout::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let (f, s) = (first.clone(), second.clone());

        layout.start_with(move || {
            f.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        layout.run_with(move || {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(layout.is_active());
        layout.stop();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_callback_is_swallowed() {
        let mut layout = ForceLayout::new();
        layout.start_with(|| Err("callback failed".into()));
        layout.stop();
        assert!(!layout.is_active());
    }

    #[test]
    fn clear_resets_to_inactive_empty_state() {
        let mut layout = ForceLayout::new();
        layout.add_node(Vec3::ZERO).unwrap();
        layout.add_node(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        layout.step(1).unwrap();
        layout.start();

        layout.clear();
        assert_eq!(layout.node_count(), 0);
        assert!(!layout.is_active());
        assert_eq!(layout.results(), StepStats::default());
        assert_eq!(layout.add_node(Vec3::ZERO).unwrap(), 0);
    }

    #[test]
    fn positions_flat_matches_positions() {
        let mut layout = ForceLayout::new();
        layout.add_node(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        layout.add_node(Vec3::new(4.0, 5.0, 6.0)).unwrap();
        assert_eq!(layout.positions_flat(), &[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0][..]);
    }
}
