//! Read-mostly facade over the board data, tracking geometry staleness.

use glam::DVec3;

use crate::data::{BoardData, Edge, FaceLayout};
use crate::error::BoardError;
use crate::hull::{HullEngine, QhullEngine};

/// Construction options for a [`Board`].
#[derive(Debug, Clone, Default)]
pub struct BoardConfig {
    /// Seed for the board's RNG. `None` seeds from entropy; a fixed seed
    /// makes construction and `add_faces` deterministic.
    pub seed: Option<u64>,
    /// Worker thread count. `None` uses the available hardware parallelism.
    /// Captured once at construction.
    pub threads: Option<usize>,
}

/// A dynamic spherical tessellation: points ("face centers") on the unit
/// sphere plus the Voronoi diagram they induce.
///
/// Mutations (adding, removing or moving points) mark the derived geometry
/// stale. Queries that read derived geometry fail with
/// [`BoardError::StaleGeometry`] until [`Board::update_geometry_if_needed`]
/// has run; queries that only touch the raw point set always succeed.
pub struct Board {
    data: BoardData,
    needs_update: bool,
}

impl Board {
    /// Create a board with `face_count` random points and default options.
    pub fn new(face_count: usize) -> Self {
        Self::with_config(face_count, BoardConfig::default())
    }

    /// Create a board with explicit options.
    pub fn with_config(face_count: usize, config: BoardConfig) -> Self {
        Self::with_hull_engine(face_count, config, Box::new(QhullEngine))
    }

    /// Create a board computing hulls through a caller-supplied engine.
    pub fn with_hull_engine(
        face_count: usize,
        config: BoardConfig,
        hull: Box<dyn HullEngine + Send + Sync>,
    ) -> Self {
        Self {
            data: BoardData::new(face_count, config.seed, config.threads, hull),
            needs_update: true,
        }
    }

    fn guarded(&self) -> Result<&BoardData, BoardError> {
        if self.needs_update {
            Err(BoardError::StaleGeometry)
        } else {
            Ok(&self.data)
        }
    }

    // --- mutations ------------------------------------------------------

    /// Add (`delta > 0`) or drop (`delta < 0`) faces. Removal past empty is
    /// clamped; a zero delta changes nothing and keeps the geometry fresh.
    pub fn add_faces(&mut self, delta: isize) {
        if delta != 0 {
            self.data.add_nodes(delta);
            self.needs_update = true;
        }
    }

    /// Add one face at a given position (normalized onto the sphere).
    pub fn add_face_at(&mut self, pos: DVec3) {
        self.data.add_node_at(pos);
        self.needs_update = true;
    }

    /// Remove one face. Negative ids wrap from the end (`-1` is the last
    /// face). Fails only on an empty board.
    pub fn remove_face(&mut self, face_id: isize) -> Result<(), BoardError> {
        self.data.remove_node(face_id)?;
        self.needs_update = true;
        Ok(())
    }

    /// Re-seed all faces in place with the chosen arrangement.
    pub fn reset_faces(&mut self, layout: FaceLayout) {
        self.data.reset_nodes(layout);
        self.needs_update = true;
    }

    /// Run one dispersion step, nudging faces toward an even spread.
    pub fn update_dispersion(&mut self) {
        self.data.update_dispersion();
        self.needs_update = true;
    }

    /// Rebuild the derived geometry if any mutation happened since the last
    /// rebuild. A hull failure propagates unchanged and leaves the board
    /// stale.
    pub fn update_geometry_if_needed(&mut self) -> Result<(), BoardError> {
        if self.needs_update {
            self.data.rebuild_geometry()?;
            self.needs_update = false;
        }
        Ok(())
    }

    // --- queries on the raw point set (never stale) ---------------------

    /// Number of faces, or 0 while the point set is too small to tessellate
    /// (a hull of three or fewer points is not a surface).
    pub fn face_count(&self) -> usize {
        let count = self.data.node_count();
        if count > 3 {
            count
        } else {
            0
        }
    }

    /// All face centers.
    #[inline]
    pub fn face_centers(&self) -> &[DVec3] {
        &self.data.nodes
    }

    /// One face center.
    #[inline]
    pub fn face_center(&self, face_id: usize) -> DVec3 {
        self.data.nodes[face_id]
    }

    /// Face centers as a flat `x y z`-interleaved buffer.
    #[inline]
    pub fn face_centers_flat(&self) -> &[f64] {
        bytemuck::cast_slice(&self.data.nodes)
    }

    /// Total squared step magnitude; drops toward zero as the dispersion
    /// dynamic settles.
    #[inline]
    pub fn temperature(&self) -> f64 {
        self.data.temperature()
    }

    /// The face whose center is closest to `pos`, or `None` on an empty
    /// board.
    #[inline]
    pub fn nearest_face(&self, pos: DVec3) -> Option<usize> {
        self.data.nearest_node(pos)
    }

    // --- queries on derived geometry (fail while stale) -----------------

    /// Delaunay neighbors of a face, in half-edge scan order.
    pub fn face_neighbors(&self, face_id: usize) -> Result<&[u32], BoardError> {
        Ok(&self.guarded()?.neighbors[face_id])
    }

    /// Indices of the Voronoi vertices bounding a face, counterclockwise
    /// viewed from outside the sphere.
    pub fn face_vertices(&self, face_id: usize) -> Result<&[u32], BoardError> {
        Ok(&self.guarded()?.faces[face_id])
    }

    /// Number of Voronoi vertices.
    pub fn vertex_count(&self) -> Result<usize, BoardError> {
        Ok(self.guarded()?.vertices.len())
    }

    /// One Voronoi vertex position.
    pub fn vertex_position(&self, vertex_id: usize) -> Result<DVec3, BoardError> {
        Ok(self.guarded()?.vertices[vertex_id])
    }

    /// All Voronoi vertex positions.
    pub fn vertex_positions(&self) -> Result<&[DVec3], BoardError> {
        Ok(&self.guarded()?.vertices)
    }

    /// Voronoi vertices as a flat `x y z`-interleaved buffer.
    pub fn vertex_positions_flat(&self) -> Result<&[f64], BoardError> {
        Ok(bytemuck::cast_slice(&self.guarded()?.vertices))
    }

    /// Number of Voronoi edge records (one per hull half-edge; each
    /// undirected border appears twice).
    pub fn edge_count(&self) -> Result<usize, BoardError> {
        Ok(self.guarded()?.edges.len())
    }

    /// One edge record.
    pub fn edge(&self, edge_id: usize) -> Result<Edge, BoardError> {
        Ok(self.guarded()?.edges[edge_id])
    }

    /// All edge records.
    pub fn edges(&self) -> Result<&[Edge], BoardError> {
        Ok(&self.guarded()?.edges)
    }

    /// Edge records as a flat buffer of vertex-index pairs.
    pub fn edges_flat(&self) -> Result<&[u32], BoardError> {
        Ok(bytemuck::cast_slice(&self.guarded()?.edges))
    }
}
