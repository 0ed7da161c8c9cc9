//! Net force per node: Barnes-Hut repulsion, edge springs and centering.

use std::collections::HashSet;

use glam::DVec2;
use rayon::prelude::*;

use crate::config::LayoutConfig;
use crate::quadtree::{BARNES_HUT_THETA, QuadTree};

/// Reusable force buffer, index-aligned with the layout's nodes.
#[derive(Debug, Clone, Default)]
pub struct ForceAccumulator {
    forces: Vec<DVec2>,
}

impl ForceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the buffer to `node_count` nodes, zeroing new slots.
    pub fn resize(&mut self, node_count: usize) {
        self.forces.resize(node_count, DVec2::ZERO);
    }

    /// Recompute the net force on every node from scratch.
    ///
    /// `edges[i]` lists the neighbors of node `i`. A quadtree is built over
    /// `positions` for this call only.
    pub fn accumulate(
        &mut self,
        positions: &[DVec2],
        edges: &[Vec<usize>],
        config: &LayoutConfig,
        center: DVec2,
    ) -> &[DVec2] {
        self.forces.clear();
        self.forces.resize(positions.len(), DVec2::ZERO);
        if positions.is_empty() {
            return &self.forces;
        }

        let tree = QuadTree::build(positions);
        add_repulsion(&mut self.forces, &tree, config.repulsive_force_constant);
        add_springs(
            &mut self.forces,
            positions,
            edges,
            config.spring_constant,
            config.spring_rest_length,
        );
        add_centering(&mut self.forces, positions, center, config.center_force);

        &self.forces
    }
}

/// Barnes-Hut repulsion, split by node index across the rayon pool.
///
/// Each worker folds into its own full-length buffer; the buffers are summed
/// afterwards on the calling thread.
fn add_repulsion(forces: &mut [DVec2], tree: &QuadTree<'_>, repulsive_constant: f64) {
    let n = forces.len();
    let chunk = n.div_ceil(rayon::current_num_threads().max(1)).max(1);

    let partials: Vec<Vec<DVec2>> = (0..n)
        .into_par_iter()
        .with_min_len(chunk)
        .fold(
            || vec![DVec2::ZERO; n],
            |mut local, i| {
                let mut rng = rand::rng();
                local[i] += tree.repulsion(i, BARNES_HUT_THETA, repulsive_constant, &mut rng);
                local
            },
        )
        .collect();

    for local in partials {
        for (force, contribution) in forces.iter_mut().zip(local) {
            *force += contribution;
        }
    }
}

/// Hookean springs along edges, each undirected edge applied once.
///
/// A mirrored pair `i -> j`, `j -> i` is applied from its lower endpoint.
/// One-directional entries are applied from whichever side stores them.
fn add_springs(
    forces: &mut [DVec2],
    positions: &[DVec2],
    edges: &[Vec<usize>],
    spring_constant: f64,
    rest_length: f64,
) {
    // Lower-to-higher entries; a higher-to-lower entry is skipped when its
    // reverse is in here.
    let ascending: HashSet<(usize, usize)> = edges
        .iter()
        .enumerate()
        .flat_map(|(i, neighbors)| neighbors.iter().filter(move |&&j| i < j).map(move |&j| (i, j)))
        .collect();

    for (i, neighbors) in edges.iter().enumerate() {
        let pi = positions[i];
        for &j in neighbors {
            if j == i || (j < i && ascending.contains(&(j, i))) {
                continue;
            }
            let delta = pi - positions[j];
            let dist = delta.length();
            if dist == 0.0 {
                continue;
            }

            let f = spring_constant * (dist - rest_length) * (delta / dist);
            forces[i] -= f;
            forces[j] += f;
        }
    }
}

/// Component-wise `c * d * |d|` pull toward `center`.
fn add_centering(forces: &mut [DVec2], positions: &[DVec2], center: DVec2, coefficient: f64) {
    for (force, &pos) in forces.iter_mut().zip(positions) {
        let diff = center - pos;
        *force += coefficient * diff * diff.abs();
    }
}
