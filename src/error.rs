//! Error types for the board facade.

use std::fmt;

use crate::hull::HullError;

/// Errors surfaced at the board API boundary.
#[derive(Debug, Clone)]
pub enum BoardError {
    /// A query that needs derived geometry was made while the point set has
    /// pending changes. Call `update_geometry_if_needed` first.
    StaleGeometry,

    /// A removal was requested on a board with no points.
    EmptyBoard,

    /// The convex-hull routine failed or returned a malformed mesh; the
    /// board keeps its previous geometry and stays stale.
    Hull(HullError),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::StaleGeometry => {
                write!(f, "geometry is stale; call update_geometry_if_needed first")
            }
            BoardError::EmptyBoard => write!(f, "cannot remove a face from an empty board"),
            BoardError::Hull(e) => write!(f, "convex hull failure: {}", e),
        }
    }
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoardError::Hull(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HullError> for BoardError {
    fn from(e: HullError) -> Self {
        BoardError::Hull(e)
    }
}
