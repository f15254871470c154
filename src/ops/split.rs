//! Edge and face splitting.
//!
//! Every split returns a [`Selection`] of what it created, or `None` when the
//! split does not apply (element not in the mesh, no pair, vertices not on the
//! face). Nothing here returns an error: degenerate geometry either takes a
//! dedicated path or makes the split a no-op.
//!
//! # Example
//!
//! ```
//! use hemesh::mesh::{build_from_quads, HalfEdgeMesh};
//! use hemesh::ops::split::split_edge_midpoint;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh: HalfEdgeMesh = build_from_quads(&vertices, &[[0, 1, 2, 3]]).unwrap();
//!
//! let e = mesh.edge_at(0).unwrap();
//! let created = split_edge_midpoint(&mut mesh, e).unwrap();
//! assert_eq!(created.num_vertices(), 1);
//! assert_eq!(mesh.num_vertices(), 5);
//! assert_eq!(mesh.face_order(mesh.face_at(0).unwrap()), 5);
//! ```

use log::debug;
use nalgebra::Point3;

use super::fixer::delete_two_edge_face;
use crate::mesh::{Element, FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, Selection, VertexId, EPSILON};

/// The canonical half of the edge through `e`, falling back to the pair when
/// neither side has a face.
fn canonical<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, e: HalfEdgeId<I>) -> Option<HalfEdgeId<I>> {
    let pair = mesh.pair(e).valid()?;
    Some(if mesh.is_edge(e) { e } else { pair })
}

fn lerp(a: &Point3<f64>, b: &Point3<f64>, t: f64) -> Point3<f64> {
    Point3::from(a.coords + (b.coords - a.coords) * t)
}

/// Insert a new vertex at `position` into the edge through `e`.
///
/// Both halves of the edge are split, so both adjacent faces gain a corner.
/// Per-corner texture coordinates on the new halfedges are interpolated by
/// the new vertex's distance to each end. The new vertex gets temporary label
/// 1.
///
/// The returned selection holds the new vertex, the new edge and the edge
/// that remains of the original.
pub fn split_edge<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    e: HalfEdgeId<I>,
    position: Point3<f64>,
) -> Option<Selection<I>> {
    if !mesh.contains_halfedge(e) {
        return None;
    }
    let he0 = canonical(mesh, e)?;
    let he1 = mesh.pair(he0);
    let he0n = mesh.next(he0).valid()?;
    let he1n = mesh.next(he1).valid()?;

    let d0 = (position - mesh.position(mesh.origin(he0))).norm();
    let d1 = (position - mesh.position(mesh.origin(he1))).norm();
    let (f0, f1) = if d0 + d1 > 0.0 {
        (d1 / (d0 + d1), d0 / (d0 + d1))
    } else {
        (0.5, 0.5)
    };

    let v_new = mesh.create_vertex(position);
    let he0new = mesh.create_halfedge();
    let he1new = mesh.create_halfedge();
    mesh.set_vertex(he0new, v_new);
    mesh.set_vertex(he1new, v_new);
    mesh.set_vertex_halfedge(v_new, he0new);

    mesh.set_next(he0new, he0n);
    mesh.copy_halfedge_properties(he0new, he0);
    mesh.set_next(he1new, he1n);
    mesh.copy_halfedge_properties(he1new, he1);
    for (new, from, to, f) in [(he0new, he0, he0n, f0), (he1new, he1, he1n, f1)] {
        if let (Some(a), Some(b)) = (mesh.halfedge(from).uvw, mesh.halfedge(to).uvw) {
            mesh.halfedge_mut(new).uvw = Some(a * f + b * (1.0 - f));
        }
    }

    mesh.set_next(he0, he0new);
    mesh.set_next(he1, he1new);
    mesh.set_pair(he0, he1new);
    mesh.set_pair(he0new, he1);

    if let Some(f) = mesh.face_of(he0).valid() {
        mesh.set_face(he0new, f);
    }
    if let Some(f) = mesh.face_of(he1).valid() {
        mesh.set_face(he1new, f);
    }

    mesh.vertex_mut(v_new).set_temporary_label(1);
    mesh.add_vertex(v_new);
    mesh.add_halfedge(he0new);
    mesh.add_halfedge(he1new);

    let mut out = Selection::new();
    // he0/he1new bound the piece at the start, he0new/he1 the piece at the end
    let old_edge = if mesh.is_edge(he0) { he0 } else { he1new };
    let new_edge = if mesh.is_edge(he0new) { he0new } else { he1 };
    out.add_halfedge(mesh, new_edge);
    out.add_halfedge(mesh, old_edge);
    out.add_vertex(v_new);
    Some(out)
}

/// Split the edge through `e` at fraction `f` of the way along its canonical
/// half.
pub fn split_edge_at<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    e: HalfEdgeId<I>,
    f: f64,
) -> Option<Selection<I>> {
    let t = if mesh.is_edge(e) { f } else { 1.0 - f };
    let a = *mesh.position(mesh.origin(e));
    let b = *mesh.position(mesh.dest(e).valid()?);
    split_edge(mesh, e, lerp(&a, &b, t))
}

/// Split the edge through `e` at its midpoint.
pub fn split_edge_midpoint<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    e: HalfEdgeId<I>,
) -> Option<Selection<I>> {
    split_edge_at(mesh, e, 0.5)
}

/// Split the edge through `e` at several fractions of its canonical half.
///
/// Fractions are sorted first; values outside `(0, 1)` are ignored. Returns
/// the merged selections of all splits.
pub fn split_edge_fractions<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    e: HalfEdgeId<I>,
    fractions: &[f64],
) -> Option<Selection<I>> {
    let he0 = canonical(mesh, e)?;
    let vb = mesh.origin(mesh.pair(he0));
    let a = *mesh.position(mesh.origin(he0));
    let b = *mesh.position(vb);

    let mut sorted: Vec<f64> = fractions
        .iter()
        .copied()
        .filter(|&f| f > 0.0 && f < 1.0)
        .collect();
    sorted.sort_by(f64::total_cmp);

    let mut out = Selection::new();
    let mut current = he0;
    for f in sorted {
        let created = split_edge(mesh, current, lerp(&a, &b, f))?;
        // keep splitting the piece that still ends at b
        current = created
            .edge_ids()
            .find(|&h| mesh.origin(h) == vb || mesh.dest(h) == vb)?;
        out.union(&created);
    }
    Some(out)
}

/// Split the edge through `e` into `n` equal parts.
pub fn divide_edge<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    e: HalfEdgeId<I>,
    n: usize,
) -> Option<Selection<I>> {
    if n < 2 {
        return Some(Selection::new());
    }
    let fractions: Vec<f64> = (1..n).map(|i| i as f64 / n as f64).collect();
    split_edge_fractions(mesh, e, &fractions)
}

/// Split every edge of the mesh at its midpoint.
pub fn split_edges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Selection<I> {
    let edges: Vec<_> = mesh.edge_ids().collect();
    split_all(mesh, edges)
}

/// Split at its midpoint every edge bounding a face of `selection`.
///
/// The selection is completed with those edges first, and receives the new
/// edges afterwards.
pub fn split_edges_in<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    selection: &mut Selection<I>,
) -> Selection<I> {
    selection.collect_edges_by_face(mesh);
    let edges: Vec<_> = selection.halfedge_ids().collect();
    let out = split_all(mesh, edges);
    selection.add_halfedges(mesh, out.edge_ids());
    out
}

fn split_all<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, edges: Vec<HalfEdgeId<I>>) -> Selection<I> {
    debug!("splitting {} edges", edges.len());
    let mut out = Selection::new();
    for e in edges {
        if let Some(created) = split_edge_midpoint(mesh, e) {
            out.union(&created);
        }
    }
    out
}

/// Divide `face` along a new edge from `vi` to `vj`.
///
/// Both vertices must be corners of `face`. The original face keeps the
/// corners from `vi` up to `vj`; a new face copying its properties takes the
/// rest. The new halfedges get temporary label 1 and take the texture
/// coordinates of the corners they start at. Returns the new edge and face.
///
/// If `vi` and `vj` coincide within [`EPSILON`], no edge is inserted. `vj` is
/// merged into `vi` instead, the boundary is pinched into two loops, and any
/// loop left with two sides is deleted. The selection then holds the new face
/// if it survived.
///
/// Returns `None` if either vertex is not on the face, if they are the same
/// vertex, or if they are adjacent on the face and distinct.
pub fn split_face<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    face: FaceId<I>,
    vi: VertexId<I>,
    vj: VertexId<I>,
) -> Option<Selection<I>> {
    if vi == vj || !mesh.contains_face(face) {
        return None;
    }
    let hei = mesh.halfedge_in_face_from(face, vi)?;
    let hej = mesh.halfedge_in_face_from(face, vj)?;
    let ti = mesh.halfedge(hei).uvw;
    let tj = mesh.halfedge(hej).uvw;
    let heip = mesh.prev(hei);
    let hejp = mesh.prev(hej);

    let degenerate = (mesh.position(vi) - mesh.position(vj)).norm() <= EPSILON;
    if degenerate {
        if mesh.next(hei) == hej && heip == hej {
            return None;
        }
        return Some(merge_split_vertices(mesh, face, vi, vj, hei, hej));
    }
    if mesh.next(hei) == hej || mesh.next(hej) == hei {
        return None;
    }

    let he0new = mesh.create_halfedge();
    let he1new = mesh.create_halfedge();
    mesh.set_vertex(he0new, vj);
    mesh.halfedge_mut(he0new).uvw = tj;
    mesh.set_vertex(he1new, vi);
    mesh.halfedge_mut(he1new).uvw = ti;

    mesh.set_next(he0new, hei);
    mesh.set_next(he1new, hej);
    mesh.set_next(heip, he1new);
    mesh.set_next(hejp, he0new);
    mesh.set_pair(he0new, he1new);
    mesh.halfedge_mut(he0new).set_temporary_label(1);
    mesh.halfedge_mut(he1new).set_temporary_label(1);
    mesh.set_face(he0new, face);

    let face_new = mesh.create_face();
    mesh.set_face_halfedge(face, hei);
    mesh.set_face_halfedge(face_new, hej);
    mesh.copy_face_properties(face_new, face);
    mesh.assign_face_to_loop(face_new, hej);
    mesh.add_halfedge(he0new);
    mesh.add_halfedge(he1new);
    mesh.add_face(face_new);

    let mut out = Selection::new();
    let edge = if mesh.is_edge(he0new) { he0new } else { he1new };
    out.add_halfedge(mesh, edge);
    out.add_face(face_new);
    Some(out)
}

/// The coincident-vertex path of [`split_face`].
fn merge_split_vertices<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    face: FaceId<I>,
    vi: VertexId<I>,
    vj: VertexId<I>,
    hei: HalfEdgeId<I>,
    hej: HalfEdgeId<I>,
) -> Selection<I> {
    debug!("face split vertices coincide, merging {:?} into {:?}", vj, vi);
    let heip = mesh.prev(hei);
    let hejp = mesh.prev(hej);

    let star: Vec<_> = mesh.vertex_halfedges(vj).collect();
    for he in star {
        mesh.set_vertex(he, vi);
    }
    mesh.set_next(heip, hej);
    mesh.set_next(hejp, hei);

    let face_new = mesh.create_face();
    mesh.set_face_halfedge(face, hei);
    mesh.set_face_halfedge(face_new, hej);
    mesh.copy_face_properties(face_new, face);
    mesh.assign_face_to_loop(face_new, hej);
    mesh.add_face(face_new);
    mesh.remove_vertex(vj);

    let mut out = Selection::new();
    out.add_face(face_new);
    if mesh.face_order(face) == 2 {
        delete_two_edge_face(mesh, face);
    }
    if mesh.face_order(face_new) == 2 {
        delete_two_edge_face(mesh, face_new);
        out.remove_face(face_new);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_facelist, build_from_quads, FacelistOptions};
    use nalgebra::Vector3;

    fn unit_square() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_quads(&vertices, &[[0, 1, 2, 3]]).unwrap()
    }

    fn two_quads() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        build_from_quads(&vertices, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap()
    }

    #[test]
    fn test_split_edge_counts() {
        let mut mesh = two_quads();
        let (v, he, f) = (mesh.num_vertices(), mesh.num_halfedges(), mesh.num_faces());
        let shared = mesh
            .edge_ids()
            .find(|&e| !mesh.is_boundary_edge(e))
            .unwrap();

        let created = split_edge_midpoint(&mut mesh, shared).unwrap();
        assert_eq!(mesh.num_vertices(), v + 1);
        assert_eq!(mesh.num_halfedges(), he + 2);
        assert_eq!(mesh.num_faces(), f);
        assert!(mesh.is_valid());

        let v_new = created.vertex_ids().next().unwrap();
        assert_eq!(mesh.position(v_new), &Point3::new(1.0, 0.5, 0.0));
        assert_eq!(mesh.vertex(v_new).temporary_label(), 1);
        assert_eq!(mesh.valence(v_new), 2);
        // the two halfedges leaving the new vertex pair with the old halves
        for he in mesh.vertex_halfedges(v_new) {
            assert_eq!(mesh.pair(mesh.pair(he)), he);
            assert_eq!(mesh.origin(mesh.pair(he)), mesh.dest(he));
        }
        for face in mesh.face_ids() {
            assert_eq!(mesh.face_order(face), 5);
        }
        assert_eq!(created.num_edges(), 2);
    }

    #[test]
    fn test_split_boundary_edge_keeps_cap_loop() {
        let mut mesh = unit_square();
        let e = mesh.edge_at(0).unwrap();
        split_edge_at(&mut mesh, e, 0.25).unwrap();
        assert_eq!(mesh.num_halfedges(), 10);
        assert_eq!(mesh.boundary_halfedges().len(), 5);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_split_edge_interpolates_uvw() {
        let mut mesh = unit_square();
        let f = mesh.face_at(0).unwrap();
        let hes: Vec<_> = mesh.face_halfedges(f).collect();
        for (i, &he) in hes.iter().enumerate() {
            mesh.halfedge_mut(he).uvw = Some(Vector3::new(i as f64, 0.0, 0.0));
        }
        let e = hes[0];
        let pos = lerp(mesh.position(mesh.origin(e)), mesh.position(mesh.dest(e)), 0.25);
        split_edge(&mut mesh, e, pos).unwrap();
        let he_new = mesh.next(e);
        let uvw = mesh.halfedge(he_new).uvw.unwrap();
        assert!((uvw.x - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_divide_edge() {
        let mut mesh = unit_square();
        let e = mesh.edge_at(0).unwrap();
        let a = *mesh.position(mesh.origin(e));
        let created = divide_edge(&mut mesh, e, 4).unwrap();
        assert_eq!(created.num_vertices(), 3);
        assert_eq!(mesh.num_vertices(), 7);
        assert_eq!(mesh.face_order(mesh.face_at(0).unwrap()), 7);

        // new vertices march away from the start of the original edge
        let dists: Vec<f64> = created
            .vertex_ids()
            .map(|v| (mesh.position(v) - a).norm())
            .collect();
        assert!((dists[0] - 0.25).abs() < 1e-12);
        assert!((dists[1] - 0.5).abs() < 1e-12);
        assert!((dists[2] - 0.75).abs() < 1e-12);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_divide_shared_edge_keeps_order() {
        let mut mesh = two_quads();
        let shared = mesh
            .edge_ids()
            .find(|&e| !mesh.is_boundary_edge(e))
            .unwrap();
        let created = divide_edge(&mut mesh, shared, 4).unwrap();
        assert_eq!(created.num_vertices(), 3);
        assert_eq!(created.num_edges(), 4);
        assert!(mesh.is_valid());

        for face in mesh.face_ids() {
            assert_eq!(mesh.face_order(face), 7);
            let column: Vec<f64> = mesh
                .face_vertices(face)
                .map(|v| *mesh.position(v))
                .filter(|p| p.x == 1.0)
                .map(|p| p.y)
                .collect();
            assert_eq!(column.len(), 5);
            // the corners on x = 1 form one monotonic run of the loop
            let ordered = (0..column.len()).any(|k| {
                let mut c = column.clone();
                c.rotate_left(k);
                c.windows(2).all(|w| w[0] < w[1]) || c.windows(2).all(|w| w[0] > w[1])
            });
            assert!(ordered, "corners out of order: {:?}", column);
        }
    }

    #[test]
    fn test_split_edge_returns_both_pieces() {
        let mut mesh = two_quads();
        let shared = mesh
            .edge_ids()
            .find(|&e| !mesh.is_boundary_edge(e))
            .unwrap();
        let created = split_edge_midpoint(&mut mesh, shared).unwrap();
        let v_new = created.vertex_ids().next().unwrap();

        let mut ends: Vec<f64> = created
            .edge_ids()
            .map(|h| {
                assert!(mesh.origin(h) == v_new || mesh.dest(h) == v_new);
                let far = if mesh.origin(h) == v_new { mesh.dest(h) } else { mesh.origin(h) };
                mesh.position(far).y
            })
            .collect();
        ends.sort_by(f64::total_cmp);
        assert_eq!(ends, vec![0.0, 1.0]);
    }

    #[test]
    fn test_split_all_edges() {
        let mut mesh = two_quads();
        let edges = mesh.num_edges();
        let created = split_edges(&mut mesh);
        assert_eq!(created.num_vertices(), edges);
        assert_eq!(mesh.num_edges(), 2 * edges);
        assert!(mesh.is_valid());

        let mut fresh = two_quads();
        let mut sel = Selection::new();
        sel.add_face(fresh.face_at(0).unwrap());
        let created = split_edges_in(&mut fresh, &mut sel);
        assert_eq!(created.num_vertices(), 4);
        assert_eq!(sel.num_edges(), 8);
        assert!(fresh.is_valid());
    }

    #[test]
    fn test_split_face() {
        let mut mesh = unit_square();
        let f = mesh.face_at(0).unwrap();
        let v0 = mesh.vertex_at(0).unwrap();
        let v1 = mesh.vertex_at(1).unwrap();
        let v2 = mesh.vertex_at(2).unwrap();

        assert!(split_face(&mut mesh, f, v0, v1).is_none());
        assert!(split_face(&mut mesh, f, v0, v0).is_none());

        let created = split_face(&mut mesh, f, v0, v2).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.face_order(f), 3);
        let f_new = created.face_ids().next().unwrap();
        assert_eq!(mesh.face_order(f_new), 3);
        assert_eq!(mesh.face(f_new).temporary_label(), mesh.face(f).temporary_label());

        let e = created.edge_ids().next().unwrap();
        assert_eq!(mesh.halfedge(e).temporary_label(), 1);
        assert!(!mesh.is_boundary_edge(e));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_split_face_coincident_vertices() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let options = FacelistOptions::new().with_merge_duplicates(false);
        let mut mesh: HalfEdgeMesh =
            build_from_facelist(&vertices, &[[0, 1, 2, 3]], &options).unwrap();
        let f = mesh.face_at(0).unwrap();
        let v0 = mesh.vertex_at(0).unwrap();
        let v2 = mesh.vertex_at(2).unwrap();

        let created = split_face(&mut mesh, f, v0, v2).unwrap();
        assert_eq!(mesh.num_vertices(), 3);
        assert!(!mesh.contains_vertex(v2));
        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(created.num_faces(), 0);
        assert_eq!(mesh.num_halfedges(), 4);
        assert!(mesh.boundary_halfedges().len() == 4);
        assert!(mesh.is_valid());
    }
}
