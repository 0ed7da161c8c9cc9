//! Graph input for the CLI: JSON files and seeded random graphs.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use quadforce::ForceLayout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Half-width of the square random nodes are scattered in.
const RANDOM_EXTENT: f32 = 100.0;

/// A graph description as read from disk.
///
/// ```json
/// { "nodes": [[0, 0, 0], [100, 0, 0]], "edges": [[0, 1]], "pinned": [0] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<[f32; 3]>,
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
    #[serde(default)]
    pub pinned: Vec<usize>,
}

impl GraphFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse graph file {}", path.display()))
    }

    /// `node_count` nodes scattered uniformly in [-100, 100]² and up to
    /// `edge_count` random edges. Self-loops are skipped.
    pub fn random(node_count: usize, edge_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let nodes = (0..node_count)
            .map(|_| {
                [
                    rng.random_range(-RANDOM_EXTENT..RANDOM_EXTENT),
                    rng.random_range(-RANDOM_EXTENT..RANDOM_EXTENT),
                    0.0,
                ]
            })
            .collect();

        let mut edges = Vec::with_capacity(edge_count);
        if node_count > 1 {
            for _ in 0..edge_count {
                let source = rng.random_range(0..node_count);
                let target = rng.random_range(0..node_count);
                if source != target {
                    edges.push([source, target]);
                }
            }
        }

        Self {
            nodes,
            edges,
            pinned: Vec::new(),
        }
    }

    /// Populate `layout` with this graph. Edges are mirrored; edges or pins
    /// referring to unknown nodes are ignored by the layout.
    pub fn populate(&self, layout: &mut ForceLayout) -> Result<()> {
        for (i, &[x, y, z]) in self.nodes.iter().enumerate() {
            layout
                .add_node(Vec3::new(x, y, z))
                .with_context(|| format!("Invalid position for node {}", i))?;
        }
        for &[source, target] in &self.edges {
            layout.add_edge(source, target, true);
        }
        for &index in &self.pinned {
            layout.pin_node(index, true);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_graph_is_seeded_and_in_range() {
        let a = GraphFile::random(50, 80, 7);
        let b = GraphFile::random(50, 80, 7);
        assert_eq!(a, b);
        assert_eq!(a.nodes.len(), 50);
        assert!(a.edges.len() <= 80);
        assert!(a
            .nodes
            .iter()
            .all(|n| n[0].abs() <= RANDOM_EXTENT && n[1].abs() <= RANDOM_EXTENT && n[2] == 0.0));
        assert!(a.edges.iter().all(|&[s, t]| s != t && s < 50 && t < 50));
    }

    #[test]
    fn single_node_graph_has_no_edges() {
        let graph = GraphFile::random(1, 10, 1);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn populate_mirrors_edges_and_pins() {
        let graph: GraphFile = serde_json::from_str(
            r#"{ "nodes": [[0, 0, 0], [10, 0, 0], [0, 10, 0]], "edges": [[0, 1], [1, 9]], "pinned": [2, 5] }"#,
        )
        .unwrap();
        let mut layout = ForceLayout::new();
        graph.populate(&mut layout).unwrap();

        assert_eq!(layout.node_count(), 3);
        assert_eq!(layout.edges_of(0), Some(&[1][..]));
        assert_eq!(layout.edges_of(1), Some(&[0][..]));
        assert!(layout.is_pinned(2));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = GraphFile::load(Path::new("/nonexistent/graph.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/graph.json"));
    }
}
