//! Barnes-Hut quadtree for O(n log n) repulsion approximation.
//!
//! The tree is rebuilt from the current positions on every iteration and
//! dropped when the iteration ends. Cells live contiguously in one arena and
//! refer to their children by index; the four children of a cell are always
//! allocated together, so a cell only records the index of the first one.
//!
//! Child order inside a block of four:
//!
//! ```text
//! +-------+-------+
//! |   2   |   3   |  (NW, NE)
//! +-------+-------+
//! |   0   |   1   |  (SW, SE)
//! +-------+-------+
//! ```

use glam::DVec2;
use rand::Rng;

/// Opening angle below which a cell is approximated by its center of mass.
pub const BARNES_HUT_THETA: f64 = 0.5;

/// Side of the square from which the push between two coincident points is drawn.
pub const COINCIDENT_JITTER: f64 = 60.0;

/// Points a leaf holds before it must subdivide.
const CAPACITY: usize = 1;

/// Below this depth leaves subdivide on overflow; at it they just grow.
/// Guarantees termination when points coincide exactly.
const MAX_DEPTH: usize = 24;

/// Softening added to the squared distance of an approximated cell.
const SOFTENING_SQ: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Cell {
    center: DVec2,
    half_size: f64,
    /// Sum of contained positions while building, their mean afterwards.
    mass_center: DVec2,
    mass: f64,
    /// Head of this leaf's point list (threaded through `QuadTree::next`).
    first_point: Option<usize>,
    point_count: usize,
    first_child: Option<usize>,
}

impl Cell {
    fn new(center: DVec2, half_size: f64) -> Self {
        Self {
            center,
            half_size,
            mass_center: DVec2::ZERO,
            mass: 0.0,
            first_point: None,
            point_count: 0,
            first_child: None,
        }
    }

    fn contains(&self, pos: DVec2) -> bool {
        pos.x >= self.center.x - self.half_size
            && pos.x < self.center.x + self.half_size
            && pos.y >= self.center.y - self.half_size
            && pos.y < self.center.y + self.half_size
    }

    fn quadrant(&self, pos: DVec2) -> usize {
        let right = (pos.x >= self.center.x) as usize;
        let top = (pos.y >= self.center.y) as usize;
        (top << 1) | right
    }
}

/// A Barnes-Hut quadtree over a borrowed slice of 2D positions.
#[derive(Debug)]
pub struct QuadTree<'a> {
    cells: Vec<Cell>,
    /// Next point in the same leaf, indexed by point.
    next: Vec<Option<usize>>,
    positions: &'a [DVec2],
}

impl<'a> QuadTree<'a> {
    /// Build a tree over `positions`.
    ///
    /// The root is a square centered on the bounding box of all points with
    /// half-size equal to half the larger extent plus one, so even a single
    /// point or a collinear set gets a non-degenerate cell.
    pub fn build(positions: &'a [DVec2]) -> Self {
        let mut tree = Self {
            cells: Vec::with_capacity(positions.len() * 2 + 1),
            next: vec![None; positions.len()],
            positions,
        };

        let (min, max) = positions
            .iter()
            .fold((DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        let (center, half_size) = if positions.is_empty() {
            (DVec2::ZERO, 1.0)
        } else {
            let extent = max - min;
            let half = extent.x.max(extent.y) * 0.5 + 1.0;
            ((min + max) * 0.5, if half <= 0.0 { 1.0 } else { half })
        };
        tree.cells.push(Cell::new(center, half_size));

        for (index, &pos) in positions.iter().enumerate() {
            tree.insert(0, index, pos, 0);
        }

        for cell in &mut tree.cells {
            if cell.mass > 0.0 {
                cell.mass_center /= cell.mass;
            }
        }

        tree
    }

    fn insert(&mut self, cell: usize, index: usize, pos: DVec2, depth: usize) {
        // Children are chosen by `quadrant` alone: recomputed child edges can
        // round past the parent's split line.
        if depth == 0 && !self.cells[cell].contains(pos) {
            return;
        }

        {
            let c = &mut self.cells[cell];
            c.mass_center += pos;
            c.mass += 1.0;
        }

        let first_child = match self.cells[cell].first_child {
            Some(first) => first,
            None if self.cells[cell].point_count < CAPACITY || depth >= MAX_DEPTH => {
                self.push_point(cell, index);
                return;
            }
            None => {
                let first = self.subdivide(cell);
                let mut moved = self.cells[cell].first_point.take();
                self.cells[cell].point_count = 0;
                while let Some(idx) = moved {
                    moved = self.next[idx].take();
                    let p = self.positions[idx];
                    let q = self.cells[cell].quadrant(p);
                    self.insert(first + q, idx, p, depth + 1);
                }
                first
            }
        };

        let q = self.cells[cell].quadrant(pos);
        self.insert(first_child + q, index, pos, depth + 1);
    }

    fn push_point(&mut self, cell: usize, index: usize) {
        let c = &mut self.cells[cell];
        self.next[index] = c.first_point;
        c.first_point = Some(index);
        c.point_count += 1;
    }

    fn subdivide(&mut self, cell: usize) -> usize {
        let (center, half) = (self.cells[cell].center, self.cells[cell].half_size);
        let q = half / 2.0;
        let first = self.cells.len();
        for i in 0..4 {
            let dx = if i & 1 != 0 { q } else { -q };
            let dy = if i & 2 != 0 { q } else { -q };
            self.cells.push(Cell::new(center + DVec2::new(dx, dy), q));
        }
        self.cells[cell].first_child = Some(first);
        first
    }

    /// Number of cells in the arena.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of points counted at the root.
    pub fn mass(&self) -> f64 {
        self.cells[0].mass
    }

    /// Mean position of every point in the tree.
    pub fn center_of_mass(&self) -> DVec2 {
        self.cells[0].mass_center
    }

    /// Center and half-size of the root cell.
    pub fn root_bounds(&self) -> (DVec2, f64) {
        (self.cells[0].center, self.cells[0].half_size)
    }

    /// Repulsive force on point `index` from every other point.
    ///
    /// Distant cells whose `size / distance` falls below `theta` act as a
    /// single mass at their center of mass. Exactly coincident points push
    /// each other by a random offset drawn from `rng` instead of dividing by
    /// zero.
    pub fn repulsion<R: Rng>(
        &self,
        index: usize,
        theta: f64,
        repulsive_constant: f64,
        rng: &mut R,
    ) -> DVec2 {
        let mut force = DVec2::ZERO;
        self.accumulate(0, index, self.positions[index], theta, repulsive_constant, rng, &mut force);
        force
    }

    #[allow(clippy::too_many_arguments)]
    fn accumulate<R: Rng>(
        &self,
        cell: usize,
        index: usize,
        pos: DVec2,
        theta: f64,
        k: f64,
        rng: &mut R,
        force: &mut DVec2,
    ) {
        let c = &self.cells[cell];
        if c.mass == 0.0 {
            return;
        }

        match c.first_child {
            None => {
                let mut point = c.first_point;
                while let Some(other) = point {
                    point = self.next[other];
                    if other == index {
                        continue;
                    }
                    let d = pos - self.positions[other];
                    let dist_sq = d.length_squared();
                    if dist_sq == 0.0 {
                        *force += DVec2::new(
                            rng.random_range(-0.5..0.5) * COINCIDENT_JITTER,
                            rng.random_range(-0.5..0.5) * COINCIDENT_JITTER,
                        );
                        continue;
                    }
                    *force += (k / dist_sq) * (d / dist_sq.sqrt());
                }
            }
            Some(first) => {
                let delta = pos - c.mass_center;
                let dist_sq = delta.length_squared() + SOFTENING_SQ;
                let dist = dist_sq.sqrt();
                let size = c.half_size * 2.0;
                if size / dist < theta {
                    *force += (k * c.mass / dist_sq) * (delta / dist);
                } else {
                    for child in first..first + 4 {
                        self.accumulate(child, index, pos, theta, k, rng, force);
                    }
                }
            }
        }
    }
}
