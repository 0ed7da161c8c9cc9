//! Layout command implementation.
//!
//! Drives a [`ForceLayout`] the way a host update loop would: populate it,
//! run it until it stabilizes or times out, and report the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use quadforce::{ForceLayout, StepStats};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::graph::GraphFile;

/// Where the graph comes from.
#[derive(Debug, Clone)]
pub enum GraphSource {
    File(PathBuf),
    Random { nodes: usize, edges: usize, seed: u64 },
}

/// Summary printed to stdout after a run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub nodes: usize,
    pub edges: usize,
    pub stable: bool,
    pub elapsed_ms: u64,
    pub stats: StepStats,
}

/// File written by `--output`.
#[derive(Debug, Serialize)]
struct LayoutOutput<'a> {
    positions: Vec<[f32; 3]>,
    stats: &'a StepStats,
}

pub fn execute(config: &Config, source: &GraphSource, output: Option<&Path>) -> Result<Report> {
    config.validate()?;

    let graph = match source {
        GraphSource::File(path) => GraphFile::load(path)?,
        GraphSource::Random { nodes, edges, seed } => GraphFile::random(*nodes, *edges, *seed),
    };

    let mut layout = ForceLayout::with_config(config.layout.clone());
    graph.populate(&mut layout)?;

    let stable = Arc::new(AtomicBool::new(false));
    let flag = stable.clone();
    layout.stabilized().connect(move || {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    info!(
        nodes = layout.node_count(),
        edges = graph.edges.len(),
        iterations_per_update = config.iterations_per_update,
        timeout_secs = config.timeout_secs,
        "layout_run_started"
    );

    let started = Instant::now();
    layout
        .until_stable(config.iterations_per_update, config.timeout()?)
        .context("Layout diverged")?;

    let report = Report {
        nodes: layout.node_count(),
        edges: graph.edges.len(),
        stable: stable.load(Ordering::SeqCst),
        elapsed_ms: started.elapsed().as_millis() as u64,
        stats: layout.results(),
    };

    if let Some(path) = output {
        write_positions(&layout, &report.stats, path)?;
        info!(path = %path.display(), "layout_positions_written");
    }

    Ok(report)
}

fn write_positions(layout: &ForceLayout, stats: &StepStats, path: &Path) -> Result<()> {
    let out = LayoutOutput {
        positions: layout.positions().iter().map(|p| p.to_array()).collect(),
        stats,
    };
    let contents = serde_json::to_string_pretty(&out)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write positions to {}", path.display()))?;
    Ok(())
}
