//! Times a batch of simulation steps on a small random graph.
//!
//! Run with: cargo run --release --example profile_step

use std::time::Instant;

use glam::Vec3;
use quadforce::ForceLayout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    tracing_subscriber::fmt::init();

    let node_count = 100;
    let edge_count = 200;
    let iterations = 10;
    let mut rng = StdRng::seed_from_u64(42);

    let mut layout = ForceLayout::new();
    for _ in 0..node_count {
        let x = rng.random_range(-100.0..100.0);
        let y = rng.random_range(-100.0..100.0);
        layout
            .add_node(Vec3::new(x, y, 0.0))
            .expect("Failed to add node");
    }
    for _ in 0..edge_count {
        let source = rng.random_range(0..node_count);
        let target = rng.random_range(0..node_count);
        if source != target {
            layout.add_edge(source, target, true);
        }
    }

    println!(
        "Stepping {} nodes / {} edges for {} iterations...",
        node_count, edge_count, iterations
    );

    let start = Instant::now();
    let stats = layout.step(iterations).expect("Layout step failed");
    let elapsed = start.elapsed();

    println!("Elapsed: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
    println!(
        "Per iteration: {:.3} ms",
        elapsed.as_secs_f64() * 1000.0 / iterations as f64
    );
    println!(
        "Displacement: total={:.4} average={:.4} max={:.4}",
        stats.total, stats.average, stats.max
    );
}
