//! Convex-hull seam: the half-edge mesh consumed by the geometry rebuild and
//! the default qhull-backed engine producing it.
//!
//! The hull algorithm itself is external. The rebuild only relies on the
//! mesh contract below: every face is a triangle oriented CCW when viewed
//! from outside (normals point away from the origin), walking `next` three
//! times returns to the starting half-edge, and every half-edge has a twin
//! in the adjacent face.

use std::fmt;

use glam::DVec3;
use qhull::Qh;
use rustc_hash::FxHashMap;

/// Directed edge of a triangular hull mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Vertex this half-edge points to.
    pub end_vertex: u32,
    /// Next half-edge within the same face.
    pub next: u32,
    /// Twin half-edge in the adjacent face.
    pub opp: u32,
    /// Owning face.
    pub face: u32,
}

/// A hull face, stored as one of its three half-edges.
#[derive(Debug, Clone, Copy)]
pub struct HullFace {
    pub half_edge: u32,
}

/// A closed triangular mesh in half-edge form.
///
/// `vertices` holds the input points, possibly permuted relative to the
/// buffer the hull was computed from; face and half-edge indices refer to
/// this array.
#[derive(Debug)]
pub struct HullMesh {
    pub vertices: Vec<DVec3>,
    pub faces: Vec<HullFace>,
    pub half_edges: Vec<HalfEdge>,
}

/// Errors from a hull engine or from malformed engine output.
#[derive(Debug, Clone)]
pub enum HullError {
    /// The backend rejected the input or failed internally.
    Failed(String),
    /// A facet with other than three vertices was returned.
    NonTriangularFace { arity: usize },
    /// A half-edge has no twin; the mesh is not a closed surface.
    MissingTwin { from: u32, to: u32 },
    /// The hull references fewer vertices than were supplied (coincident
    /// or interior points).
    DroppedVertices { expected: usize, actual: usize },
}

impl fmt::Display for HullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HullError::Failed(msg) => write!(f, "hull computation failed: {}", msg),
            HullError::NonTriangularFace { arity } => {
                write!(f, "hull returned a facet with {} vertices", arity)
            }
            HullError::MissingTwin { from, to } => {
                write!(f, "half-edge ({}, {}) has no twin", from, to)
            }
            HullError::DroppedVertices { expected, actual } => {
                write!(
                    f,
                    "hull kept {} of {} input points (coincident input?)",
                    actual, expected
                )
            }
        }
    }
}

impl std::error::Error for HullError {}

/// The external convex-hull routine, abstracted so tests and alternative
/// backends can be injected.
///
/// Implementations must be pure: same points in, same mesh out, no retained
/// state across calls.
pub trait HullEngine {
    fn hull(&self, points: &[DVec3]) -> Result<HullMesh, HullError>;
}

/// Default hull engine backed by the qhull library.
#[derive(Debug, Default)]
pub struct QhullEngine;

impl HullEngine for QhullEngine {
    fn hull(&self, points: &[DVec3]) -> Result<HullMesh, HullError> {
        let pts: Vec<[f64; 3]> = points.iter().map(|p| p.to_array()).collect();

        let qh = Qh::builder()
            .compute(true)
            .build_from_iter(pts)
            .map_err(|e| HullError::Failed(format!("{:?}", e)))?;

        let mut triangles: Vec<[u32; 3]> = Vec::new();
        for simplex in qh.simplices() {
            let vertices = simplex
                .vertices()
                .ok_or_else(|| HullError::Failed("facet without vertex set".to_string()))?;
            let indices: Vec<usize> = vertices
                .iter()
                .map(|v| {
                    v.index(&qh)
                        .ok_or_else(|| HullError::Failed("unindexed hull vertex".to_string()))
                })
                .collect::<Result<_, _>>()?;

            if indices.len() != 3 {
                return Err(HullError::NonTriangularFace {
                    arity: indices.len(),
                });
            }
            triangles.push([indices[0] as u32, indices[1] as u32, indices[2] as u32]);
        }

        build_half_edge_mesh(points, triangles)
    }
}

/// Assemble a half-edge mesh from hull triangles given as original point
/// indices.
///
/// Triangles are re-oriented outward where needed, vertices are compacted in
/// first-appearance order (so the output vertex array is a permutation of
/// the input points) and twins are resolved through a directed-edge map.
fn build_half_edge_mesh(
    points: &[DVec3],
    mut triangles: Vec<[u32; 3]>,
) -> Result<HullMesh, HullError> {
    // Orient every triangle CCW from outside. The origin is interior to the
    // hull, so the outward side is the one the vertex sum points to.
    for tri in &mut triangles {
        let a = points[tri[0] as usize];
        let b = points[tri[1] as usize];
        let c = points[tri[2] as usize];
        let normal = (b - a).cross(c - b);
        if normal.dot(a + b + c) < 0.0 {
            tri.swap(1, 2);
        }
    }

    // Compact vertices in first-appearance order and rewrite the triangles
    // to the new indexing.
    let mut remap = vec![u32::MAX; points.len()];
    let mut vertices = Vec::with_capacity(points.len());
    for tri in &mut triangles {
        for idx in tri.iter_mut() {
            let slot = &mut remap[*idx as usize];
            if *slot == u32::MAX {
                *slot = vertices.len() as u32;
                vertices.push(points[*idx as usize]);
            }
            *idx = *slot;
        }
    }
    if vertices.len() != points.len() {
        return Err(HullError::DroppedVertices {
            expected: points.len(),
            actual: vertices.len(),
        });
    }

    // Emit three half-edges per face; half-edge 3f+k ends at tri[k] and
    // starts at tri[(k+2)%3], so walking `next` from 3f+0 yields the face's
    // vertices in order.
    let mut faces = Vec::with_capacity(triangles.len());
    let mut half_edges = Vec::with_capacity(triangles.len() * 3);
    let mut twin_of: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    twin_of.reserve(triangles.len() * 3);

    for (f, tri) in triangles.iter().enumerate() {
        let base = (3 * f) as u32;
        faces.push(HullFace { half_edge: base });
        for k in 0..3 {
            half_edges.push(HalfEdge {
                end_vertex: tri[k],
                next: base + ((k as u32 + 1) % 3),
                opp: u32::MAX,
                face: f as u32,
            });
            let from = tri[(k + 2) % 3];
            twin_of.insert((from, tri[k]), base + k as u32);
        }
    }

    for (f, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            let from = tri[(k + 2) % 3];
            let to = tri[k];
            let opp = *twin_of
                .get(&(to, from))
                .ok_or(HullError::MissingTwin { from, to })?;
            half_edges[3 * f + k].opp = opp;
        }
    }

    Ok(HullMesh {
        vertices,
        faces,
        half_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Vec<DVec3> {
        let s = 1.0 / 3.0f64.sqrt();
        vec![
            DVec3::new(s, s, s),
            DVec3::new(s, -s, -s),
            DVec3::new(-s, s, -s),
            DVec3::new(-s, -s, s),
        ]
    }

    #[test]
    fn test_hull_tetrahedron() {
        let points = tetrahedron();
        let mesh = QhullEngine.hull(&points).expect("hull should succeed");

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces.len(), 4);
        assert_eq!(mesh.half_edges.len(), 12);
    }

    #[test]
    fn test_face_cycles_are_triangles() {
        let points = tetrahedron();
        let mesh = QhullEngine.hull(&points).expect("hull should succeed");

        for face in &mesh.faces {
            let mut e = face.half_edge;
            for _ in 0..3 {
                e = mesh.half_edges[e as usize].next;
            }
            assert_eq!(e, face.half_edge, "next^3 must return to the start");
        }
    }

    #[test]
    fn test_twins_are_mutual() {
        let points = tetrahedron();
        let mesh = QhullEngine.hull(&points).expect("hull should succeed");

        for (h, he) in mesh.half_edges.iter().enumerate() {
            let twin = &mesh.half_edges[he.opp as usize];
            assert_eq!(twin.opp as usize, h, "twin of twin must be self");
            assert_ne!(he.face, twin.face, "twins live in different faces");
        }
    }

    #[test]
    fn test_faces_oriented_outward() {
        let points = tetrahedron();
        let mesh = QhullEngine.hull(&points).expect("hull should succeed");

        for face in &mesh.faces {
            let mut e = face.half_edge;
            let mut v = [0u32; 3];
            for slot in &mut v {
                let he = &mesh.half_edges[e as usize];
                *slot = he.end_vertex;
                e = he.next;
            }
            let a = mesh.vertices[v[0] as usize];
            let b = mesh.vertices[v[1] as usize];
            let c = mesh.vertices[v[2] as usize];
            let normal = (b - a).cross(c - b);
            assert!(normal.dot(a + b + c) > 0.0, "face normal must point outward");
        }
    }

    #[test]
    fn test_vertices_are_permutation_of_input() {
        let points = tetrahedron();
        let mesh = QhullEngine.hull(&points).expect("hull should succeed");

        for p in &points {
            assert!(
                mesh.vertices.iter().any(|v| (*v - *p).length() < 1e-12),
                "input point missing from hull vertices"
            );
        }
    }

    #[test]
    fn test_insufficient_points_fail() {
        let points = vec![DVec3::X, DVec3::Y, DVec3::Z];
        assert!(QhullEngine.hull(&points).is_err());
    }
}
