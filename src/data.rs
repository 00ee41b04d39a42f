//! Board storage and the numerical core: the point set, its dispersion
//! dynamic, and the Voronoi/Delaunay geometry derived from the convex hull.

use std::f64::consts::TAU;
use std::sync::Mutex;

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::BoardError;
use crate::hull::{HullEngine, HullMesh};
use crate::parallel::WorkerPool;
use crate::sphere::{
    fibonacci_sphere_points, random_cube_points_with_rng, random_sphere_points_with_rng,
};
use crate::util::Timed;

/// A Voronoi edge: the pair of Voronoi vertices bounding the border between
/// two adjacent cells. One record per hull half-edge, so each undirected
/// border appears twice, once per direction.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Edge {
    /// Index into the Voronoi vertex array.
    pub a: u32,
    /// Index into the Voronoi vertex array.
    pub b: u32,
}

/// Arrangement used when re-seeding the whole point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLayout {
    /// Uniformly random on the sphere surface.
    Random,
    /// Fibonacci golden-angle spiral, nearly equidistributed.
    Spiral,
}

/// Scratch lists accumulated per point during the half-edge scan, guarded by
/// a per-point mutex while workers append concurrently.
#[derive(Default)]
struct CellScratch {
    neighbors: Vec<u32>,
    corners: Vec<u32>,
}

/// Owns the point set, the step buffer and all derived geometry arrays.
///
/// Invariants: every point and every Voronoi vertex has unit norm, and the
/// step buffer always has the same length as the point set. The derived
/// arrays (`vertices`, `neighbors`, `faces`, `edges`) describe the point set
/// as of the last `rebuild_geometry`; the facade tracks whether they are
/// current.
pub struct BoardData {
    /// Points on the unit sphere, one per Voronoi cell. Rebuilds may permute
    /// this array (the hull reorders its vertex buffer).
    pub(crate) nodes: Vec<DVec3>,
    /// Pending dispersion increment per point. Carries over between steps;
    /// the force phase damps and redirects the previous value.
    pub(crate) next_step: Vec<DVec3>,
    /// Voronoi vertices, one per hull face (the face circumcenter direction).
    pub(crate) vertices: Vec<DVec3>,
    /// Delaunay neighbors per point, in half-edge scan order.
    pub(crate) neighbors: Vec<Vec<u32>>,
    /// Voronoi-vertex indices bounding each cell, sorted counterclockwise as
    /// seen from outside the sphere.
    pub(crate) faces: Vec<Vec<u32>>,
    /// Voronoi edges, one per hull half-edge.
    pub(crate) edges: Vec<Edge>,

    pool: WorkerPool,
    rng: ChaCha8Rng,
    hull: Box<dyn HullEngine + Send + Sync>,
}

impl BoardData {
    pub fn new(
        node_count: usize,
        seed: Option<u64>,
        threads: Option<usize>,
        hull: Box<dyn HullEngine + Send + Sync>,
    ) -> Self {
        let pool = match threads {
            Some(t) => WorkerPool::new(t),
            None => WorkerPool::with_hardware_threads(),
        };
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let nodes = random_cube_points_with_rng(node_count, &mut rng);
        let next_step = vec![DVec3::ZERO; node_count];

        log::debug!(
            "board data: {} nodes, {} workers",
            node_count,
            pool.workers()
        );

        Self {
            nodes,
            next_step,
            vertices: Vec::new(),
            neighbors: Vec::new(),
            faces: Vec::new(),
            edges: Vec::new(),
            pool,
            rng,
            hull,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total squared step magnitude, a scalar measure of how much the point
    /// set is still moving.
    pub fn temperature(&self) -> f64 {
        self.next_step.iter().map(|s| s.length_squared()).sum()
    }

    /// Index of the node closest to `pos` on the sphere (maximal dot
    /// product), or `None` on an empty board.
    pub fn nearest_node(&self, pos: DVec3) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.dot(pos).total_cmp(&b.dot(pos)))
            .map(|(i, _)| i)
    }

    /// Grow or shrink the point set by `delta` nodes.
    ///
    /// New nodes are random unit vectors with zeroed step slots; shrinking
    /// drops nodes from the tail. A `delta` below `-n` is clamped to
    /// removing everything.
    pub fn add_nodes(&mut self, delta: isize) {
        let count = self.nodes.len() as isize;
        let delta = delta.max(-count);

        if delta > 0 {
            let fresh = random_cube_points_with_rng(delta as usize, &mut self.rng);
            self.nodes.extend(fresh);
            self.next_step
                .extend(std::iter::repeat(DVec3::ZERO).take(delta as usize));
        } else {
            let keep = (count + delta) as usize;
            self.nodes.truncate(keep);
            self.next_step.truncate(keep);
        }
    }

    /// Append a single node at a caller-given position (normalized onto the
    /// sphere) with a zeroed step slot.
    pub fn add_node_at(&mut self, pos: DVec3) {
        self.nodes.push(pos.normalize());
        self.next_step.push(DVec3::ZERO);
    }

    /// Remove one node. Negative indices wrap from the end, so `-1` removes
    /// the last node. The tail node is swapped into the freed slot; order is
    /// not preserved.
    pub fn remove_node(&mut self, node_id: isize) -> Result<(), BoardError> {
        let count = self.nodes.len() as isize;
        if count == 0 {
            return Err(BoardError::EmptyBoard);
        }
        let idx = (((node_id % count) + count) % count) as usize;
        self.nodes.swap_remove(idx);
        self.next_step.swap_remove(idx);
        Ok(())
    }

    /// Re-seed every node in place, keeping the count, and zero the step
    /// buffer.
    pub fn reset_nodes(&mut self, layout: FaceLayout) {
        let n = self.nodes.len();
        self.nodes = match layout {
            FaceLayout::Random => random_sphere_points_with_rng(n, &mut self.rng),
            FaceLayout::Spiral => fibonacci_sphere_points(n),
        };
        self.next_step = vec![DVec3::ZERO; n];
    }

    /// One step of the repulsive dispersion dynamic.
    ///
    /// Every node accumulates an inverse-square rejection from every other
    /// node, the increment is projected onto the tangent plane and damped,
    /// then all nodes advance and are reprojected onto the sphere. Force and
    /// integration are separate parallel passes, so all forces read the same
    /// point positions.
    pub fn update_dispersion(&mut self) {
        let n = self.nodes.len();
        if n == 0 {
            return;
        }
        let alpha = 0.1 / (n as f64).sqrt();
        let beta = 0.5 / (n as f64).sqrt();

        let nodes = &self.nodes;
        self.pool.for_each_chunk_mut(&mut self.next_step, |lo, steps| {
            for (k, step) in steps.iter_mut().enumerate() {
                let i = lo + k;
                let p = nodes[i];
                let mut rejection = DVec3::ZERO;
                for (j, &q) in nodes.iter().enumerate() {
                    let d = q - p;
                    // The self-term has zero difference; giving it a unit
                    // squared norm keeps the division defined and its
                    // contribution zero.
                    let sq = if j == i { 1.0 } else { d.length_squared() };
                    rejection += d / (sq * sq.sqrt());
                }
                let drift = *step - alpha * rejection;
                *step = beta * (drift - p.dot(drift) * p);
            }
        });

        let steps = &self.next_step;
        self.pool.for_each_chunk_mut(&mut self.nodes, |lo, chunk| {
            for (k, p) in chunk.iter_mut().enumerate() {
                *p = (*p + steps[lo + k]).normalize();
            }
        });
    }

    /// Rebuild all derived geometry from the current point set.
    ///
    /// On success every derived array is consistent with `nodes` (which the
    /// hull may have permuted). On a hull failure nothing is modified. With
    /// three or fewer points the hull is not a surface; the derived arrays
    /// come back empty and that counts as success.
    pub fn rebuild_geometry(&mut self) -> Result<(), BoardError> {
        let _t = Timed::debug("geometry rebuild");

        if self.nodes.len() <= 3 {
            self.vertices = Vec::new();
            self.neighbors = Vec::new();
            self.faces = Vec::new();
            self.edges = Vec::new();
            return Ok(());
        }

        let HullMesh {
            vertices: hull_vertices,
            faces: hull_faces,
            half_edges,
        } = self.hull.hull(&self.nodes)?;

        // The hull reorders its vertex buffer; adopt its order so all face
        // and half-edge indices line up.
        self.nodes = hull_vertices;
        let n = self.nodes.len();
        let face_count = hull_faces.len();
        let edge_count = half_edges.len();

        // Voronoi vertices: the outward normal of each hull face, which for
        // points on the sphere is the face's circumcenter direction.
        let mut vertices = vec![DVec3::ZERO; face_count];
        let nodes = &self.nodes;
        self.pool.for_each_chunk_mut(&mut vertices, |lo, chunk| {
            for (k, out) in chunk.iter_mut().enumerate() {
                let face = &hull_faces[lo + k];
                let mut e = face.half_edge;
                let mut v = [0u32; 3];
                for slot in &mut v {
                    let he = &half_edges[e as usize];
                    *slot = he.end_vertex;
                    e = he.next;
                }
                // Walking `next` three times must close the triangle.
                debug_assert_eq!(e, face.half_edge);
                let a = nodes[v[1] as usize] - nodes[v[0] as usize];
                let b = nodes[v[2] as usize] - nodes[v[1] as usize];
                *out = a.cross(b).normalize();
            }
        });

        // Edge records plus raw neighbor/corner lists. Half-edges emanating
        // from the same node land on different workers, so each node's lists
        // are guarded by their own lock; the edge array itself is written
        // without contention, one slot per half-edge.
        let mut edges = vec![Edge { a: 0, b: 0 }; edge_count];
        let scratch: Vec<Mutex<CellScratch>> =
            (0..n).map(|_| Mutex::new(CellScratch::default())).collect();
        self.pool.for_each_chunk_mut(&mut edges, |lo, chunk| {
            for (k, out) in chunk.iter_mut().enumerate() {
                let he = &half_edges[lo + k];
                let twin = &half_edges[he.opp as usize];
                *out = Edge {
                    a: he.face,
                    b: twin.face,
                };
                let mut cell = scratch[he.end_vertex as usize].lock().unwrap();
                cell.neighbors.push(twin.end_vertex);
                cell.corners.push(he.face);
            }
        });

        let mut neighbors = Vec::with_capacity(n);
        let mut faces = Vec::with_capacity(n);
        for cell in scratch {
            let cell = cell.into_inner().unwrap();
            neighbors.push(cell.neighbors);
            faces.push(cell.corners);
        }

        // Sort each cell's corners counterclockwise around its node, viewed
        // from outside the sphere.
        let verts = &vertices;
        self.pool.for_each_chunk_mut(&mut faces, |lo, chunk| {
            for (k, cell) in chunk.iter_mut().enumerate() {
                let i = lo + k;
                assert!(
                    cell.len() >= 3,
                    "cell {} has only {} corners; hull is not a closed surface",
                    i,
                    cell.len()
                );
                let m = nodes[i];
                let first = verts[cell[0] as usize];
                let r = first.cross(m).normalize();
                let u = m.cross(r).normalize();
                let mut keyed: Vec<(u32, f64)> = cell
                    .iter()
                    .map(|&v| {
                        let p = verts[v as usize];
                        let x = r.dot(p);
                        let y = u.dot(p);
                        let rho = (x * x + y * y).sqrt();
                        let acos = (y / rho).clamp(-1.0, 1.0).acos();
                        let angle = if x >= 0.0 { acos } else { TAU - acos };
                        (v, angle)
                    })
                    .collect();
                keyed.sort_by(|a, b| a.1.total_cmp(&b.1));
                for (slot, (v, _)) in cell.iter_mut().zip(keyed) {
                    *slot = v;
                }
            }
        });

        self.vertices = vertices;
        self.neighbors = neighbors;
        self.faces = faces;
        self.edges = edges;

        log::debug!(
            "geometry: {} cells, {} vertices, {} edge records",
            n,
            face_count,
            edge_count
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::QhullEngine;

    fn board_data(n: usize, seed: u64) -> BoardData {
        BoardData::new(n, Some(seed), Some(4), Box::new(QhullEngine))
    }

    fn assert_unit(points: &[DVec3]) {
        for p in points {
            assert!((p.length() - 1.0).abs() < 1e-10, "norm = {}", p.length());
        }
    }

    #[test]
    fn test_construction_invariants() {
        let data = board_data(64, 1);
        assert_eq!(data.nodes.len(), 64);
        assert_eq!(data.next_step.len(), 64);
        assert_unit(&data.nodes);
        assert_eq!(data.temperature(), 0.0);
    }

    #[test]
    fn test_add_nodes_grows_with_zeroed_steps() {
        let mut data = board_data(10, 2);
        data.update_dispersion();
        data.add_nodes(5);
        assert_eq!(data.nodes.len(), 15);
        assert_eq!(data.next_step.len(), 15);
        assert_unit(&data.nodes);
        for s in &data.next_step[10..] {
            assert_eq!(*s, DVec3::ZERO);
        }
    }

    #[test]
    fn test_add_nodes_clamps_removal() {
        let mut data = board_data(10, 3);
        data.add_nodes(-100);
        assert_eq!(data.nodes.len(), 0);
        assert_eq!(data.next_step.len(), 0);
    }

    #[test]
    fn test_remove_node_swaps_from_tail() {
        let mut data = board_data(5, 4);
        let original = data.nodes.clone();
        data.remove_node(1).unwrap();

        assert_eq!(data.nodes.len(), 4);
        assert_eq!(data.next_step.len(), 4);
        // Every survivor was in the original set, and the removed slot now
        // holds what used to be the tail.
        assert_eq!(data.nodes[1], original[4]);
        for p in &data.nodes {
            assert!(original.contains(p));
        }
    }

    #[test]
    fn test_remove_node_wraps_negative() {
        let mut data = board_data(3, 5);
        let last = data.nodes[2];
        data.remove_node(-1).unwrap();
        assert_eq!(data.nodes.len(), 2);
        assert!(!data.nodes.contains(&last));
    }

    #[test]
    fn test_remove_node_empty_fails() {
        let mut data = board_data(0, 6);
        assert!(matches!(
            data.remove_node(-1),
            Err(BoardError::EmptyBoard)
        ));
    }

    #[test]
    fn test_dispersion_keeps_unit_norm() {
        let mut data = board_data(40, 7);
        for _ in 0..20 {
            data.update_dispersion();
            assert_unit(&data.nodes);
            assert_eq!(data.next_step.len(), data.nodes.len());
        }
        assert!(data.temperature() > 0.0);
    }

    #[test]
    fn test_step_stays_tangential() {
        let mut data = board_data(30, 8);
        data.update_dispersion();
        // The force phase projects each step onto the tangent plane of the
        // position it read. Snapshot those positions, run one more step, and
        // check the resulting steps against the snapshot.
        let nodes = data.nodes.clone();
        data.update_dispersion();
        for (p, s) in nodes.iter().zip(&data.next_step) {
            assert!(p.dot(*s).abs() < 1e-12, "radial component {}", p.dot(*s));
        }
    }

    #[test]
    fn test_rebuild_degenerate_is_empty() {
        let mut data = board_data(3, 9);
        data.rebuild_geometry().unwrap();
        assert!(data.vertices.is_empty());
        assert!(data.neighbors.is_empty());
        assert!(data.faces.is_empty());
        assert!(data.edges.is_empty());
    }

    #[test]
    fn test_rebuild_counts() {
        let mut data = board_data(50, 10);
        data.rebuild_geometry().unwrap();

        let n = data.nodes.len();
        assert_eq!(n, 50);
        // Closed triangulation of a sphere: F = 2n - 4, half-edges = 6n - 12.
        assert_eq!(data.vertices.len(), 2 * n - 4);
        assert_eq!(data.edges.len(), 6 * n - 12);
        assert_eq!(data.neighbors.len(), n);
        assert_eq!(data.faces.len(), n);
        assert_unit(&data.vertices);
        for cell in &data.faces {
            assert!(cell.len() >= 3);
        }
    }
}
