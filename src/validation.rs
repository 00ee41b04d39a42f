//! Consistency checks for rebuilt board geometry.
//!
//! Diagnostic only: nothing in the rebuild path calls this. Tests (and
//! curious callers) use it to confirm the derived arrays describe a closed
//! tessellation of the sphere.

use std::collections::HashSet;

use glam::DVec3;

use crate::board::Board;
use crate::error::BoardError;

/// Signed area of a spherical polygon on the unit sphere. Positive for
/// counterclockwise winding viewed from outside.
fn spherical_polygon_area(vertices: &[DVec3]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    // Spherical excess, summed over the fan of triangles from vertex 0:
    // tan(E/2) = v0·(v1×v2) / (1 + v0·v1 + v1·v2 + v2·v0)
    let v0 = vertices[0];
    let mut total = 0.0;
    for i in 1..(n - 1) {
        let v1 = vertices[i];
        let v2 = vertices[i + 1];
        let triple = v0.dot(v1.cross(v2));
        let denom = 1.0 + v0.dot(v1) + v1.dot(v2) + v2.dot(v0);
        total += 2.0 * triple.atan2(denom);
    }
    total
}

/// Results of validating a board's derived geometry.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Total number of cells.
    pub num_cells: usize,
    /// Cells with fewer than 3 corners (invalid polygons).
    pub degenerate_cells: Vec<usize>,
    /// Directed edge records with no record in the opposite direction.
    pub unpaired_edges: Vec<(u32, u32)>,
    /// Voronoi vertices that are not unit length.
    pub nonunit_vertices: Vec<usize>,
    /// Cells wound clockwise (or flat) instead of counterclockwise.
    pub wrong_winding_cells: Vec<usize>,
    /// Total surface area; 4π for a complete sphere.
    pub total_area: f64,
    /// Euler characteristic components (V - E + F should equal 2).
    pub euler_v: usize,
    pub euler_e: usize,
    pub euler_f: usize,
}

impl ValidationResult {
    /// Whether the geometry passed every hard check.
    pub fn is_valid(&self) -> bool {
        self.degenerate_cells.is_empty()
            && self.unpaired_edges.is_empty()
            && self.nonunit_vertices.is_empty()
            && self.wrong_winding_cells.is_empty()
            && self.euler_check()
    }

    /// Check Euler characteristic: V - E + F = 2 for a sphere.
    pub fn euler_check(&self) -> bool {
        (self.euler_v as i64) - (self.euler_e as i64) + (self.euler_f as i64) == 2
    }

    /// Check that the cells tile the whole sphere (area within 1% of 4π).
    pub fn area_check(&self) -> bool {
        let expected = 4.0 * std::f64::consts::PI;
        (self.total_area - expected).abs() / expected < 0.01
    }
}

/// Validate a board's derived geometry.
///
/// Fails with [`BoardError::StaleGeometry`] if the board has pending
/// changes; an empty (degenerate) geometry validates trivially.
pub fn validate_board(board: &Board) -> Result<ValidationResult, BoardError> {
    let num_cells = board.face_count();
    let vertices = board.vertex_positions()?;
    let edges = board.edges()?;

    let mut result = ValidationResult {
        num_cells,
        euler_v: vertices.len(),
        euler_e: edges.len() / 2,
        euler_f: num_cells,
        ..Default::default()
    };
    if num_cells == 0 {
        result.euler_v = 0;
        result.euler_e = 0;
        return Ok(result);
    }

    for (i, v) in vertices.iter().enumerate() {
        if (v.length() - 1.0).abs() > 1e-9 {
            result.nonunit_vertices.push(i);
        }
    }

    let directed: HashSet<(u32, u32)> = edges.iter().map(|e| (e.a, e.b)).collect();
    for e in edges {
        if !directed.contains(&(e.b, e.a)) {
            result.unpaired_edges.push((e.a, e.b));
        }
    }

    for cell_idx in 0..num_cells {
        let corner_ids = board.face_vertices(cell_idx)?;
        if corner_ids.len() < 3 {
            result.degenerate_cells.push(cell_idx);
            continue;
        }
        let corners: Vec<DVec3> = corner_ids
            .iter()
            .map(|&v| vertices[v as usize])
            .collect();
        let area = spherical_polygon_area(&corners);
        result.total_area += area;
        if area <= 0.0 {
            result.wrong_winding_cells.push(cell_idx);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardConfig;

    fn fresh_board(n: usize, seed: u64) -> Board {
        let mut board = Board::with_config(
            n,
            BoardConfig {
                seed: Some(seed),
                threads: Some(4),
            },
        );
        board.update_geometry_if_needed().unwrap();
        board
    }

    #[test]
    fn test_random_board_is_valid() {
        let board = fresh_board(200, 12345);
        let result = validate_board(&board).unwrap();
        assert!(
            result.is_valid(),
            "validation failed: {:?}",
            (
                &result.degenerate_cells,
                &result.unpaired_edges,
                &result.nonunit_vertices,
                &result.wrong_winding_cells,
                result.euler_check(),
            )
        );
        assert!(result.area_check(), "total area {}", result.total_area);
    }

    #[test]
    fn test_relaxed_board_stays_valid() {
        let mut board = fresh_board(100, 999);
        for _ in 0..50 {
            board.update_dispersion();
        }
        board.update_geometry_if_needed().unwrap();
        let result = validate_board(&board).unwrap();
        assert!(result.is_valid());
        assert!(result.area_check());
    }

    #[test]
    fn test_degenerate_board_validates_empty() {
        let board = fresh_board(3, 5);
        let result = validate_board(&board).unwrap();
        assert_eq!(result.num_cells, 0);
        assert!(result.unpaired_edges.is_empty());
    }

    #[test]
    fn test_stale_board_rejected() {
        let mut board = fresh_board(20, 6);
        board.add_faces(1);
        assert!(matches!(
            validate_board(&board),
            Err(BoardError::StaleGeometry)
        ));
    }
}
