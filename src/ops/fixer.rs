//! Local repairs: two-sided faces, valence-two vertices, edge flips and
//! removal of elements no face uses.

use std::collections::HashSet;

use log::debug;
use nalgebra::{Point3, Vector3};

use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, Selection, VertexId};

/// Delete a face bounded by two halfedges, pairing their pairs directly.
///
/// Returns `false` if `f` is not in the mesh or is not two-sided.
pub fn delete_two_edge_face<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, f: FaceId<I>) -> bool {
    if !mesh.contains_face(f) {
        return false;
    }
    let Some(he) = mesh.face(f).halfedge().valid() else {
        return false;
    };
    let Some(hen) = mesh.next(he).valid() else {
        return false;
    };
    if mesh.next(hen) != he {
        return false;
    }

    let he_pair = mesh.pair(he);
    let hen_pair = mesh.pair(hen);
    let v = mesh.origin(he);
    let vn = mesh.origin(hen);
    let v_next = mesh.next_in_vertex(he);
    let vn_next = mesh.next_in_vertex(hen);

    mesh.remove_face(f);
    mesh.remove_halfedge(he);
    mesh.remove_halfedge(hen);
    for (vertex, out) in [(v, v_next), (vn, vn_next)] {
        if out.is_valid() && mesh.contains_halfedge(out) {
            mesh.set_vertex_halfedge(vertex, out);
        } else {
            mesh.clear_vertex_halfedge(vertex);
        }
    }

    match (he_pair.valid(), hen_pair.valid()) {
        (Some(a), Some(b)) => mesh.set_pair(a, b),
        (Some(a), None) => mesh.clear_pair(a),
        (None, Some(b)) => mesh.clear_pair(b),
        (None, None) => {}
    }
    true
}

/// Delete every two-sided face. Returns how many were deleted.
pub fn delete_two_edge_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> usize {
    let faces: Vec<_> = mesh.face_ids().collect();
    let deleted = faces
        .into_iter()
        .filter(|&f| delete_two_edge_face(mesh, f))
        .count();
    if deleted > 0 {
        debug!("deleted {} two-sided faces", deleted);
    }
    deleted
}

/// Remove a vertex with exactly two outgoing halfedges, joining its two edges
/// into one.
///
/// Returns `false` if `v` is not in the mesh or its valence is not two.
pub fn delete_two_edge_vertex<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, v: VertexId<I>) -> bool {
    if !mesh.contains_vertex(v) || mesh.valence(v) != 2 {
        return false;
    }
    let he0 = mesh.vertex(v).halfedge();
    let he1 = mesh.next_in_vertex(he0);
    let he0n = mesh.next(he0);
    let he1n = mesh.next(he1);
    let he0p = mesh.pair(he0);
    let he1p = mesh.pair(he1);
    if [he1, he0n, he1n, he0p, he1p].iter().any(|h| !h.is_valid()) || he0 == he1 {
        return false;
    }

    mesh.set_next(he0p, he1n);
    mesh.set_next(he1p, he0n);
    if let Some(f) = mesh.face_of(he0).valid() {
        mesh.set_face_halfedge(f, he1p);
    }
    if let Some(f) = mesh.face_of(he1).valid() {
        mesh.set_face_halfedge(f, he0p);
    }
    let (a, b) = (mesh.origin(he0n), mesh.origin(he1n));
    mesh.set_vertex_halfedge(a, he0n);
    mesh.set_vertex_halfedge(b, he1n);

    mesh.remove_halfedge(he0);
    mesh.remove_halfedge(he1);
    mesh.set_pair(he0p, he1p);
    mesh.remove_vertex(v);
    true
}

/// Project `p` onto the plane through `origin` with unit normal `n`.
fn project(p: &Point3<f64>, origin: &Point3<f64>, n: &Vector3<f64>) -> Point3<f64> {
    p - n * n.dot(&(p - origin))
}

fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

/// Replace the diagonal `e` of the two triangles sharing it with the other
/// diagonal.
///
/// Refused (returns `false`) unless both sides of `e` are triangles, the
/// other diagonal does not already exist, and the quad they form is convex
/// when projected on the plane through the edge midpoint perpendicular to
/// the edge normal. Convexity is tested by comparing the quad area split along
/// each diagonal.
pub fn flip_edge<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, e: HalfEdgeId<I>) -> bool {
    if !mesh.contains_halfedge(e) {
        return false;
    }
    let Some(pair) = mesh.pair(e).valid() else {
        return false;
    };
    let (Some(t1), Some(t2)) = (mesh.face_of(e).valid(), mesh.face_of(pair).valid()) else {
        return false;
    };
    if mesh.face_order(t1) != 3 || mesh.face_order(t2) != 3 {
        return false;
    }

    let he2t1 = mesh.next(e);
    let he3t1 = mesh.next(he2t1);
    let he2t2 = mesh.next(pair);
    let he3t2 = mesh.next(he2t2);
    let (va, vb) = (mesh.origin(e), mesh.origin(pair));
    let (vc, vd) = (mesh.origin(he3t1), mesh.origin(he3t2));
    if mesh.search_halfedge(vc, vd).is_some() {
        return false;
    }

    let origin = mesh.edge_midpoint(e);
    let n = mesh.edge_normal(e);
    let [a, b, c, d] = [va, vb, vc, vd].map(|v| project(mesh.position(v), &origin, &n));
    let before = triangle_area(&a, &b, &c) + triangle_area(&a, &d, &b);
    let after = triangle_area(&a, &d, &c) + triangle_area(&c, &d, &b);
    if after <= 0.0 {
        return false;
    }
    let ratio = before / after;
    if !(0.99999..=1.000001).contains(&ratio) {
        return false;
    }

    mesh.set_vertex_halfedge(va, he2t2);
    mesh.set_vertex_halfedge(vb, he2t1);
    mesh.set_vertex(e, vc);
    mesh.set_vertex(pair, vd);

    mesh.set_next(he2t1, e);
    mesh.set_next(e, he3t2);
    mesh.set_next(he3t2, he2t1);
    mesh.set_face(he3t2, t1);
    mesh.set_face_halfedge(t1, e);

    mesh.set_next(he2t2, pair);
    mesh.set_next(pair, he3t1);
    mesh.set_next(he3t1, he2t2);
    mesh.set_face(he3t1, t2);
    mesh.set_face_halfedge(t2, pair);
    true
}

/// Keep only the vertices and halfedges used by some face.
///
/// Each kept vertex points at a face halfedge. Kept halfedges whose pair was
/// dropped are unpaired, so call [`HalfEdgeMesh::cap_halfedges`] afterwards to
/// restore caps along the border.
pub fn clean_unused_elements_by_face<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let mut vertices: Vec<VertexId<I>> = Vec::new();
    let mut seen_vertices: HashSet<VertexId<I>> = HashSet::new();
    let mut halfedges: Vec<HalfEdgeId<I>> = Vec::new();
    let mut seen_halfedges: HashSet<HalfEdgeId<I>> = HashSet::new();

    let faces: Vec<_> = mesh.face_ids().collect();
    for f in faces {
        let hes: Vec<_> = mesh.face_halfedges(f).collect();
        for he in hes {
            let v = mesh.origin(he);
            if seen_vertices.insert(v) {
                vertices.push(v);
                mesh.set_vertex_halfedge(v, he);
            }
            if seen_halfedges.insert(he) {
                halfedges.push(he);
            }
        }
    }

    for &he in &halfedges {
        if !seen_halfedges.contains(&mesh.pair(he)) {
            mesh.clear_pair(he);
            let v = mesh.origin(he);
            mesh.set_vertex_halfedge(v, he);
        }
    }

    let dropped_vertices = mesh.num_vertices().saturating_sub(vertices.len());
    let dropped_halfedges = mesh.num_halfedges().saturating_sub(halfedges.len());
    mesh.clear_vertices();
    for v in vertices {
        mesh.add_vertex(v);
    }
    mesh.clear_halfedges();
    mesh.add_halfedges(&halfedges);
    debug!(
        "dropped {} unused vertices and {} unused halfedges",
        dropped_vertices, dropped_halfedges
    );
}

/// Remove the selected faces, drop what they leave unused and cap the new
/// border.
pub fn delete_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, faces: &Selection<I>) {
    for f in faces.face_ids() {
        mesh.remove_face(f);
    }
    clean_unused_elements_by_face(mesh);
    mesh.cap_halfedges();
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Point every vertex at an outgoing registered halfedge.
    ///
    /// Vertices with several outgoing halfedges end up with the last one in
    /// halfedge iteration order.
    pub fn fix_halfedge_vertex_assignment(&mut self) {
        let hes: Vec<_> = self.halfedge_ids().collect();
        for he in hes {
            let v = self.origin(he);
            if v.is_valid() {
                self.set_vertex_halfedge(v, he);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_quads, build_from_triangles};

    fn unit_square_triangles() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    fn diagonal(mesh: &HalfEdgeMesh) -> HalfEdgeId {
        mesh.edge_ids().find(|&e| !mesh.is_boundary_edge(e)).unwrap()
    }

    #[test]
    fn test_flip_square_diagonal() {
        let mut mesh = unit_square_triangles();
        let e = diagonal(&mesh);
        let v1 = mesh.vertex_at(1).unwrap();
        let v3 = mesh.vertex_at(3).unwrap();

        assert!(flip_edge(&mut mesh, e));
        let ends = [mesh.origin(e), mesh.dest(e)];
        assert!(ends.contains(&v1) && ends.contains(&v3));
        assert_eq!(mesh.num_faces(), 2);
        for f in mesh.face_ids() {
            assert_eq!(mesh.face_order(f), 3);
            assert!(mesh.face_normal(f).z > 0.0);
        }
        assert!(mesh.is_valid());

        // flipping back restores the first diagonal
        assert!(flip_edge(&mut mesh, e));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_flip_refuses_concave_quad() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.2, 0.2, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: HalfEdgeMesh =
            build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
        let e = diagonal(&mesh);
        assert!(!flip_edge(&mut mesh, e));

        let boundary = mesh.edge_ids().find(|&e| mesh.is_boundary_edge(e)).unwrap();
        assert!(!flip_edge(&mut mesh, boundary));
    }

    #[test]
    fn test_delete_two_edge_vertex() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: HalfEdgeMesh = build_from_quads(&vertices, &[[0, 1, 2, 3]]).unwrap();
        let v1 = mesh.vertex_at(1).unwrap();
        assert_eq!(mesh.valence(v1), 2);

        assert!(delete_two_edge_vertex(&mut mesh, v1));
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_halfedges(), 6);
        assert_eq!(mesh.face_order(mesh.face_at(0).unwrap()), 3);
        assert!(mesh.is_valid());

        assert!(!delete_two_edge_vertex(&mut mesh, v1));
    }

    #[test]
    fn test_delete_two_edge_face() {
        let mut mesh = unit_square_triangles();
        let f = mesh.face_at(0).unwrap();
        assert!(!delete_two_edge_face(&mut mesh, f));
        assert_eq!(delete_two_edge_faces(&mut mesh), 0);
    }

    #[test]
    fn test_clean_and_delete_faces() {
        let mut mesh = unit_square_triangles();
        let mut sel = Selection::new();
        sel.add_face(mesh.face_at(1).unwrap());

        delete_faces(&mut mesh, &sel);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_halfedges(), 6);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_fix_vertex_assignment() {
        let mut mesh = unit_square_triangles();
        for v in mesh.vertex_ids().collect::<Vec<_>>() {
            mesh.clear_vertex_halfedge(v);
        }
        mesh.fix_halfedge_vertex_assignment();
        for v in mesh.vertex_ids() {
            let he = mesh.vertex(v).halfedge();
            assert_eq!(mesh.origin(he), v);
        }
        assert!(mesh.is_valid());
    }
}
