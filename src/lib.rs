//! Dynamic spherical tessellation on the unit sphere.
//!
//! A board holds a variable-sized set of points on the sphere, disperses
//! them with an inverse-square repulsion dynamic, and derives the spherical
//! Voronoi diagram they induce (and its Delaunay dual) from a 3-D convex
//! hull. Mutations mark the derived geometry stale; an explicit rebuild
//! refreshes it.
//!
//! # Example
//!
//! ```
//! use hexboard::{Board, BoardConfig};
//!
//! let mut board = Board::with_config(
//!     100,
//!     BoardConfig {
//!         seed: Some(42),
//!         ..Default::default()
//!     },
//! );
//!
//! // Relax the arrangement a little, then build the tessellation.
//! for _ in 0..10 {
//!     board.update_dispersion();
//! }
//! board.update_geometry_if_needed().expect("rebuild should succeed");
//!
//! assert_eq!(board.face_count(), 100);
//! for id in 0..board.face_count() {
//!     assert!(board.face_vertices(id).unwrap().len() >= 3);
//! }
//! ```

mod board;
mod data;
mod error;
mod hull;
mod parallel;
mod sphere;
mod util;
pub mod validation;

pub use board::{Board, BoardConfig};
pub use data::{Edge, FaceLayout};
pub use error::BoardError;
pub use hull::{HalfEdge, HullEngine, HullError, HullFace, HullMesh, QhullEngine};
pub use parallel::WorkerPool;
pub use sphere::{
    fibonacci_sphere_points, random_cube_points_with_rng, random_sphere_points_with_rng,
};
