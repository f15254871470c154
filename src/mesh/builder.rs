//! Mesh construction from face-vertex lists.
//!
//! [`build_from_facelist`] is the seam between file formats and the topology
//! core. It creates one halfedge per face corner, then runs
//! [`pair_halfedges`](HalfEdgeMesh::pair_halfedges) and, unless disabled,
//! [`cap_halfedges`](HalfEdgeMesh::cap_halfedges), so every mesh it returns
//! satisfies the structural invariants and has no unpaired halfedges.

use std::collections::{HashMap, VecDeque};

use log::{debug, warn};
use nalgebra::Point3;

use super::element::{Element, TexCoord};
use super::halfedge::HalfEdgeMesh;
use super::index::{HalfEdgeId, MeshIndex, VertexId};
use super::EPSILON;
use crate::error::{MeshError, Result};

/// Options for [`build_from_facelist`].
#[derive(Debug, Clone)]
pub struct FacelistOptions {
    /// Snap vertices closer than `epsilon` onto the first such vertex.
    pub merge_duplicates: bool,

    /// Merge distance.
    pub epsilon: f64,

    /// Re-orient faces so neighbours traverse shared edges in opposite
    /// directions.
    pub check_normals: bool,

    /// Close the remaining boundary with face-less cap halfedges.
    pub cap: bool,
}

impl Default for FacelistOptions {
    fn default() -> Self {
        Self {
            merge_duplicates: false,
            epsilon: EPSILON,
            check_normals: false,
            cap: true,
        }
    }
}

impl FacelistOptions {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable duplicate vertex merging.
    pub fn with_merge_duplicates(mut self, merge: bool) -> Self {
        self.merge_duplicates = merge;
        self
    }

    /// Set the merge distance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Enable or disable orientation repair.
    pub fn with_check_normals(mut self, check: bool) -> Self {
        self.check_normals = check;
        self
    }

    /// Enable or disable boundary capping.
    pub fn with_cap(mut self, cap: bool) -> Self {
        self.cap = cap;
        self
    }
}

/// Build a half-edge mesh from vertex positions and polygon index lists.
///
/// Faces may have any number of corners. Consecutive repeated corners are
/// dropped and faces left with fewer than three are skipped. Every vertex
/// and face records its input index in its temporary label.
///
/// # Example
/// ```
/// use hemesh::mesh::{build_from_facelist, FacelistOptions, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.5, 2.0, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3], vec![3, 2, 4]];
///
/// let mesh: HalfEdgeMesh =
///     build_from_facelist(&vertices, &faces, &FacelistOptions::default()).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// assert_eq!(mesh.num_unpaired_halfedges(), 0);
/// ```
pub fn build_from_facelist<I: MeshIndex, F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
    options: &FacelistOptions,
) -> Result<HalfEdgeMesh<I>> {
    build_from_facelist_with_uvw(vertices, None, faces, options)
}

/// Like [`build_from_facelist`], with one texture coordinate per input vertex.
pub fn build_from_facelist_with_uvw<I: MeshIndex, F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    uvw: Option<&[TexCoord]>,
    faces: &[F],
    options: &FacelistOptions,
) -> Result<HalfEdgeMesh<I>> {
    if !(options.epsilon >= 0.0 && options.epsilon.is_finite()) {
        return Err(MeshError::invalid_param(
            "epsilon",
            options.epsilon,
            "must be finite and non-negative",
        ));
    }
    if let Some(uvw) = uvw {
        if uvw.len() != vertices.len() {
            return Err(MeshError::invalid_param(
                "uvw",
                uvw.len(),
                "must have one entry per vertex",
            ));
        }
    }

    for (fi, face) in faces.iter().enumerate() {
        let face = face.as_ref();
        if face.len() < 3 {
            return Err(MeshError::DegenerateFace { face: fi });
        }
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
    }

    // Input vertex -> accepted input vertex.
    let remap: Vec<usize> = if options.merge_duplicates {
        merge_duplicate_vertices(vertices, options.epsilon)
    } else {
        (0..vertices.len()).collect()
    };

    let mut polygons: Vec<(usize, Vec<usize>)> = Vec::with_capacity(faces.len());
    let mut skipped = 0usize;
    for (fi, face) in faces.iter().enumerate() {
        let corners = collapse_repeated_corners(face.as_ref(), &remap);
        if corners.len() < 3 {
            skipped += 1;
            continue;
        }
        polygons.push((fi, corners));
    }
    if skipped > 0 {
        warn!("facelist: skipped {} degenerate face(s)", skipped);
    }

    if options.check_normals {
        let flipped = unify_orientation(&mut polygons);
        debug!("facelist: reversed {} face(s) for consistent orientation", flipped);
    }

    let mut mesh: HalfEdgeMesh<I> = HalfEdgeMesh::with_capacity(vertices.len(), polygons.len());

    let mut vertex_ids: Vec<VertexId<I>> = vec![VertexId::invalid(); vertices.len()];
    for (i, pos) in vertices.iter().enumerate() {
        if remap[i] != i {
            continue;
        }
        let v = mesh.create_vertex(*pos);
        let rec = mesh.vertex_mut(v);
        rec.set_temporary_label(i as i32);
        rec.uvw = uvw.map(|uvw| uvw[i]);
        mesh.add_vertex(v);
        vertex_ids[i] = v;
    }

    for (fi, corners) in &polygons {
        let f = mesh.create_face();
        mesh.face_mut(f).set_temporary_label(*fi as i32);

        let mut hes: Vec<HalfEdgeId<I>> = Vec::with_capacity(corners.len());
        for &(input, accepted) in corners_with_input(faces[*fi].as_ref(), corners, &remap).iter() {
            let he = mesh.create_halfedge();
            let v = vertex_ids[accepted];
            mesh.set_vertex(he, v);
            mesh.set_face(he, f);
            if !mesh.vertex(v).halfedge().is_valid() {
                mesh.set_vertex_halfedge(v, he);
            }
            if let Some(uvw) = uvw {
                if input != accepted && uvw[input] != uvw[accepted] {
                    mesh.halfedge_mut(he).uvw = Some(uvw[input]);
                }
            }
            hes.push(he);
        }
        mesh.cycle_halfedges(&hes);
        mesh.set_face_halfedge(f, hes[0]);
        mesh.add_face(f);
        mesh.add_halfedges(&hes);
    }

    debug!(
        "facelist: {} vertices, {} faces, {} halfedges",
        mesh.num_vertices(),
        mesh.num_faces(),
        mesh.num_halfedges()
    );

    mesh.pair_halfedges();
    if options.cap {
        mesh.cap_halfedges();
    }

    Ok(mesh)
}

/// Build a half-edge mesh from vertices and triangle faces.
///
/// # Example
/// ```
/// use hemesh::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    build_from_facelist(vertices, faces, &FacelistOptions::default())
}

/// Build a half-edge mesh from vertices and quad faces (counter-clockwise).
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<HalfEdgeMesh<I>> {
    build_from_facelist(vertices, faces, &FacelistOptions::default())
}

/// Convert a mesh back to positions and polygons.
///
/// Vertices are numbered in vertex-set order; faces come out in face-set
/// order with their corners starting at the face's halfedge.
pub fn to_facelist<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let vertices: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<Vec<usize>> = mesh
        .face_ids()
        .map(|f| {
            mesh.face_vertices(f)
                .filter_map(|v| mesh.index_of_vertex(v))
                .collect()
        })
        .collect();

    (vertices, faces)
}

/// Map each vertex to the first earlier vertex within `epsilon`, or itself.
fn merge_duplicate_vertices(vertices: &[Point3<f64>], epsilon: f64) -> Vec<usize> {
    let sq_epsilon = epsilon * epsilon;
    let cell = epsilon.max(f64::MIN_POSITIVE);
    let cell_of = |p: &Point3<f64>| {
        (
            (p.x / cell).floor() as i64,
            (p.y / cell).floor() as i64,
            (p.z / cell).floor() as i64,
        )
    };

    let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
    let mut remap = Vec::with_capacity(vertices.len());

    for (i, p) in vertices.iter().enumerate() {
        let (cx, cy, cz) = cell_of(p);
        let mut target: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &j in bucket {
                        if (vertices[j] - p).norm_squared() < sq_epsilon
                            && target.map_or(true, |t| j < t)
                        {
                            target = Some(j);
                        }
                    }
                }
            }
        }
        match target {
            Some(j) => remap.push(j),
            None => {
                grid.entry((cx, cy, cz)).or_default().push(i);
                remap.push(i);
            }
        }
    }

    let merged = remap.iter().enumerate().filter(|(i, &j)| *i != j).count();
    if merged > 0 {
        debug!("facelist: merged {} duplicate vertices", merged);
    }
    remap
}

/// Remap corners and drop repeats of the previous corner (cyclically).
fn collapse_repeated_corners(face: &[usize], remap: &[usize]) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::with_capacity(face.len());
    for &vi in face {
        let v = remap[vi];
        if out.last() != Some(&v) {
            out.push(v);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Pair each kept corner with the input index it came from, so per-corner
/// texture coordinates survive merging.
fn corners_with_input(input: &[usize], corners: &[usize], remap: &[usize]) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(corners.len());
    for &accepted in corners {
        let original = input
            .iter()
            .copied()
            .find(|&vi| remap[vi] == accepted)
            .unwrap_or(accepted);
        out.push((original, accepted));
    }
    out
}

/// Flip faces so that neighbours run through shared edges in opposite
/// directions. Each connected component keeps the orientation of its first
/// face. Returns the number of reversed faces.
fn unify_orientation(polygons: &mut [(usize, Vec<usize>)]) -> usize {
    let mut by_edge: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (pi, (_, corners)) in polygons.iter().enumerate() {
        let n = corners.len();
        for k in 0..n {
            let (a, b) = (corners[k], corners[(k + 1) % n]);
            by_edge.entry((a.min(b), a.max(b))).or_default().push(pi);
        }
    }

    let has_directed = |corners: &[usize], a: usize, b: usize| {
        let n = corners.len();
        (0..n).any(|k| corners[k] == a && corners[(k + 1) % n] == b)
    };

    let mut visited = vec![false; polygons.len()];
    let mut flipped = 0usize;
    let mut queue = VecDeque::new();

    for seed in 0..polygons.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(pi) = queue.pop_front() {
            let corners = polygons[pi].1.clone();
            let n = corners.len();
            for k in 0..n {
                let (a, b) = (corners[k], corners[(k + 1) % n]);
                let Some(neighbours) = by_edge.get(&(a.min(b), a.max(b))) else {
                    continue;
                };
                for &qi in neighbours {
                    if visited[qi] {
                        continue;
                    }
                    visited[qi] = true;
                    if has_directed(&polygons[qi].1, a, b) {
                        polygons[qi].1.reverse();
                        flipped += 1;
                    }
                    queue.push_back(qi);
                }
            }
        }
    }

    flipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Bucket;

    fn tetrahedron() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]];
        (vertices, faces)
    }

    /// Three quads in a row, every quad listing its own four corners.
    fn quad_strip_soup() -> (Vec<Point3<f64>>, Vec<[usize; 4]>) {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for i in 0..3 {
            let x = i as f64;
            let base = vertices.len();
            vertices.push(Point3::new(x, 0.0, 0.0));
            vertices.push(Point3::new(x + 1.0, 0.0, 0.0));
            vertices.push(Point3::new(x + 1.0, 1.0, 0.0));
            vertices.push(Point3::new(x, 1.0, 0.0));
            faces.push([base, base + 1, base + 2, base + 3]);
        }
        (vertices, faces)
    }

    #[test]
    fn test_tetrahedron() {
        let (vertices, faces) = tetrahedron();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_halfedges(), 12);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_single_triangle() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();

        assert_eq!(mesh.num_faces(), 1);
        // 3 faced halfedges + 3 caps
        assert_eq!(mesh.num_halfedges(), 6);
        assert_eq!(mesh.num_edges(), 3);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
        }
    }

    #[test]
    fn test_quad_strip_merge_then_cap() {
        let (vertices, faces) = quad_strip_soup();
        let options = FacelistOptions::new()
            .with_merge_duplicates(true)
            .with_cap(false);
        let mut mesh: HalfEdgeMesh = build_from_facelist(&vertices, &faces, &options).unwrap();

        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(mesh.num_halfedges(), 12);
        assert_eq!(mesh.num_edges(), 2);
        assert_eq!(mesh.num_unpaired_halfedges(), 8);

        let caps = mesh.cap_halfedges();
        assert_eq!(caps.len(), 8);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert_eq!(mesh.num_edges(), 10);
        assert_eq!(mesh.euler_characteristic(), 1);
        assert!(mesh.is_valid());

        // the caps form a single face-less loop
        let start = caps[0];
        let cap_loop: Vec<_> = mesh.loop_halfedges(start).collect();
        assert_eq!(cap_loop.len(), 8);
        assert_eq!(mesh.next(*cap_loop.last().unwrap()), start);
        for he in cap_loop {
            assert!(mesh.is_outer_boundary(he));
            assert_eq!(mesh.halfedge(he).bucket(), Bucket::NonEdge);
        }
    }

    #[test]
    fn test_without_merge_labels_record_input() {
        let (vertices, faces) = quad_strip_soup();
        let mesh: HalfEdgeMesh =
            build_from_facelist(&vertices, &faces, &FacelistOptions::default()).unwrap();

        // nothing shared: three separate quads
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_edges(), 12);
        for (i, v) in mesh.vertex_ids().enumerate() {
            assert_eq!(mesh.vertex(v).temporary_label(), i as i32);
        }
        for (i, f) in mesh.face_ids().enumerate() {
            assert_eq!(mesh.face(f).temporary_label(), i as i32);
        }
    }

    #[test]
    fn test_to_facelist_roundtrip() {
        let (vertices, faces) = tetrahedron();
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        let (out_verts, out_faces) = to_facelist(&mesh);

        assert_eq!(out_verts, vertices);
        let expected: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
        assert_eq!(out_faces, expected);
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let result: Result<HalfEdgeMesh> = build_from_triangles(&vertices, &[[0, 1, 2]]);
        assert!(matches!(
            result,
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 1 })
        ));
    }

    #[test]
    fn test_repeated_corners() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        // the second face collapses to an edge and is skipped
        let faces = vec![vec![0, 1, 1, 2, 3, 0], vec![0, 0, 2]];
        let mesh: HalfEdgeMesh =
            build_from_facelist(&vertices, &faces, &FacelistOptions::default()).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.face_order(mesh.face_at(0).unwrap()), 4);

        let short = vec![vec![0, 1]];
        let result: Result<HalfEdgeMesh> =
            build_from_facelist(&vertices, &short, &FacelistOptions::default());
        assert!(matches!(result, Err(MeshError::DegenerateFace { face: 0 })));
    }

    #[test]
    fn test_check_normals_flips_inconsistent_face() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        // both faces run 0 -> 1
        let faces = vec![[0, 1, 2], [0, 1, 3]];

        let plain: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        assert_eq!(plain.num_edges(), 6);

        let options = FacelistOptions::new().with_check_normals(true);
        let fixed: HalfEdgeMesh = build_from_facelist(&vertices, &faces, &options).unwrap();
        // the shared edge is now paired
        assert_eq!(fixed.num_edges(), 5);
        assert!(fixed.is_valid());
        let f0 = fixed.face_at(0).unwrap();
        let f1 = fixed.face_at(1).unwrap();
        assert!(fixed.face_normal(f0).dot(&fixed.face_normal(f1)) > 0.0);
    }

    #[test]
    fn test_per_corner_uvw_survives_merge() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let uvw = vec![
            TexCoord::new(0.0, 0.0, 0.0),
            TexCoord::new(1.0, 0.0, 0.0),
            TexCoord::new(0.0, 1.0, 0.0),
            TexCoord::new(0.5, 0.5, 0.0),
            TexCoord::new(1.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [3, 4, 2]];
        let options = FacelistOptions::new().with_merge_duplicates(true);
        let mesh: HalfEdgeMesh =
            build_from_facelist_with_uvw(&vertices, Some(&uvw), &faces, &options).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        let f1 = mesh.face_at(1).unwrap();
        let he = mesh.face(f1).halfedge();
        assert_eq!(mesh.halfedge_uvw(he), Some(TexCoord::new(0.5, 0.5, 0.0)));
        let f0 = mesh.face_at(0).unwrap();
        let he1 = mesh.next(mesh.face(f0).halfedge());
        assert_eq!(mesh.halfedge(he1).uvw, None);
        assert_eq!(mesh.halfedge_uvw(he1), Some(TexCoord::new(1.0, 0.0, 0.0)));
    }
}
