//! Edge and halfedge collapse.
//!
//! A collapse merges the two ends of an edge into one vertex, removes both
//! halves of the edge and deletes any face that is left with two sides. The
//! result can be non-manifold; nothing here checks the link condition.

use log::debug;
use nalgebra::Point3;

use super::fixer::delete_two_edge_face;
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex};

fn midpoint(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    Point3::from((a.coords + b.coords) * 0.5)
}

/// Merge `origin(he)` into `origin(pair(he))` and unlink both halves.
///
/// Callers have checked that `he` is registered. Returns `false` when the
/// edge lacks a pair or either half is not linked into a loop.
fn collapse_into_pair_origin<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, he: HalfEdgeId<I>) -> bool {
    let Some(he_pair) = mesh.pair(he).valid() else {
        return false;
    };
    let links = [
        mesh.next(he),
        mesh.prev(he),
        mesh.next(he_pair),
        mesh.prev(he_pair),
    ];
    if links.iter().any(|h| !h.is_valid()) {
        return false;
    }
    let [hen, hep, he_pairn, he_pairp] = links;

    let f = mesh.face_of(he);
    let fp = mesh.face_of(he_pair);
    let v = mesh.origin(he);
    let vp = mesh.origin(he_pair);
    let star: Vec<_> = mesh.vertex_halfedges(v).collect();

    if f.is_valid() {
        mesh.set_face_halfedge(f, hen);
    }
    if fp.is_valid() {
        mesh.set_face_halfedge(fp, he_pairn);
    }
    mesh.set_next(hep, hen);
    mesh.set_next(he_pairp, he_pairn);
    for out in star {
        mesh.set_vertex(out, vp);
    }
    mesh.set_vertex_halfedge(vp, hen);

    mesh.remove_halfedge(he);
    mesh.remove_halfedge(he_pair);
    mesh.remove_vertex(v);
    if f.is_valid() {
        delete_two_edge_face(mesh, f);
    }
    if fp.is_valid() {
        delete_two_edge_face(mesh, fp);
    }
    true
}

/// Collapse `he` onto its end vertex. The start vertex is removed.
pub fn collapse_halfedge<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, he: HalfEdgeId<I>) -> bool {
    mesh.contains_halfedge(he) && collapse_into_pair_origin(mesh, he)
}

/// Like [`collapse_halfedge`], but refuses when the start vertex lies on a
/// boundary.
pub fn collapse_halfedge_boundary_preserving<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    he: HalfEdgeId<I>,
) -> bool {
    if !mesh.contains_halfedge(he) || mesh.is_boundary_vertex(mesh.origin(he)) {
        return false;
    }
    collapse_into_pair_origin(mesh, he)
}

/// Collapse the edge through `e` to its midpoint.
///
/// The canonical half's start vertex is removed and the surviving vertex moves
/// to the midpoint.
///
/// # Example
/// ```
/// use hemesh::mesh::{build_from_triangles, HalfEdgeMesh};
/// use hemesh::ops::collapse::collapse_edge;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
/// ];
/// let faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
/// let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
///
/// let e = mesh.edge_at(0).unwrap();
/// assert!(collapse_edge(&mut mesh, e));
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 2);
/// ```
pub fn collapse_edge<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, e: HalfEdgeId<I>) -> bool {
    if !mesh.contains_halfedge(e) {
        return false;
    }
    let Some(he) = mesh.edge_of(e) else {
        return false;
    };
    let v = mesh.origin(he);
    let vp = mesh.dest(he);
    let mid = midpoint(mesh.position(v), mesh.position(vp));
    let before = *mesh.position(vp);
    mesh.set_position(vp, mid);
    if collapse_into_pair_origin(mesh, he) {
        true
    } else {
        mesh.set_position(vp, before);
        false
    }
}

/// Collapse the edge through `e` without moving the mesh boundary.
///
/// - Neither end on a boundary: collapse to the midpoint.
/// - One end on a boundary: the boundary vertex stays where it is.
/// - Both ends on a boundary: only an edge along the boundary collapses, to
///   its midpoint, and never when `strict` is set.
pub fn collapse_edge_boundary_preserving<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    e: HalfEdgeId<I>,
    strict: bool,
) -> bool {
    if !mesh.contains_halfedge(e) {
        return false;
    }
    let Some(he) = mesh.edge_of(e) else {
        return false;
    };
    let v = mesh.origin(he);
    let vp = mesh.dest(he);
    let before = *mesh.position(vp);
    let target = match (mesh.is_boundary_vertex(v), mesh.is_boundary_vertex(vp)) {
        (true, true) => {
            if strict || !mesh.is_inner_boundary(he) {
                return false;
            }
            midpoint(mesh.position(v), &before)
        }
        (true, false) => *mesh.position(v),
        (false, false) => midpoint(mesh.position(v), &before),
        (false, true) => before,
    };
    mesh.set_position(vp, target);
    if collapse_into_pair_origin(mesh, he) {
        true
    } else {
        mesh.set_position(vp, before);
        false
    }
}

/// Collapse every edge shorter than `d`. Returns how many were collapsed.
///
/// The short edges are collected up front. An edge that a previous collapse
/// already removed is skipped.
pub fn collapse_degenerate_edges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, d: f64) -> usize {
    let sq = d * d;
    let short: Vec<_> = mesh
        .edge_ids()
        .filter(|&e| (mesh.position(mesh.dest(e)) - mesh.position(mesh.origin(e))).norm_squared() < sq)
        .collect();
    let mut collapsed = 0usize;
    for e in short {
        if mesh.contains_halfedge(e) && collapse_edge(mesh, e) {
            collapsed += 1;
        }
    }
    debug!("collapsed {} edges shorter than {}", collapsed, d);
    collapsed
}
