//! Polygon triangulation.
//!
//! Every face with more than three sides is replaced by triangles. The
//! triangles for each face are computed first, read-only and in parallel
//! across faces; the topology is then rebuilt sequentially and the new
//! halfedges are paired and capped.
//!
//! Each polygon is ear-clipped in the plane of its Newell normal. If clipping
//! gets stuck (self-intersecting or badly degenerate polygons) the rest of the
//! polygon is fanned from its first remaining corner.
//!
//! # Example
//!
//! ```
//! use hemesh::prelude::*;
//! use hemesh::algo::triangulate::{triangulate, TriangulateOptions};
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
//! let triangles = triangulate(&mut mesh, &TriangulateOptions::default());
//! assert_eq!(triangles.num_faces(), 2);
//! assert_eq!(mesh.num_faces(), 2);
//! ```

use log::debug;
use nalgebra::{Point2, Point3, Vector3};
use rayon::prelude::*;

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, Selection};

use super::Progress;

/// Options for [`triangulate`].
#[derive(Debug)]
pub struct TriangulateOptions {
    /// Whether to compute the per-face triangles in parallel (default: true).
    pub parallel: bool,

    /// Progress callback for the rebuild phase.
    pub progress: Progress,
}

impl Default for TriangulateOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            progress: Progress::none(),
        }
    }
}

impl TriangulateOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Report rebuild progress through `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }
}

const AREA_EPSILON: f64 = 1e-12;

fn cross2(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn in_triangle(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> bool {
    cross2(a, b, p) >= 0.0 && cross2(b, c, p) >= 0.0 && cross2(c, a, p) >= 0.0
}

fn fan(corners: &[usize], out: &mut Vec<[usize; 3]>) {
    for k in 1..corners.len().saturating_sub(1) {
        out.push([corners[0], corners[k], corners[k + 1]]);
    }
}

/// Triangulate a simple polygon given by its corners in loop order.
///
/// Returns index triples into `points`, wound like the polygon. A polygon
/// with fewer than three corners has no triangles; any other polygon of `n`
/// corners yields `n - 2`.
pub fn triangulate_polygon(points: &[Point3<f64>]) -> Vec<[usize; 3]> {
    let n = points.len();
    let mut tris = Vec::with_capacity(n.saturating_sub(2));
    if n < 3 {
        return tris;
    }
    if n == 3 {
        tris.push([0, 1, 2]);
        return tris;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let p = &points[i];
        let q = &points[(i + 1) % n];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }
    let corners: Vec<usize> = (0..n).collect();
    let Some(normal) = normal.try_normalize(f64::EPSILON) else {
        fan(&corners, &mut tris);
        return tris;
    };

    let helper = if normal.x.abs() > 0.9 {
        Vector3::y()
    } else {
        Vector3::x()
    };
    let u = helper.cross(&normal).normalize();
    let v = normal.cross(&u);
    let flat: Vec<Point2<f64>> = points
        .iter()
        .map(|p| Point2::new(p.coords.dot(&u), p.coords.dot(&v)))
        .collect();

    let mut remaining = corners;
    let mut i = 0;
    let mut misses = 0;
    while remaining.len() > 3 {
        let m = remaining.len();
        let a = remaining[(i + m - 1) % m];
        let b = remaining[i];
        let c = remaining[(i + 1) % m];
        let (pa, pb, pc) = (&flat[a], &flat[b], &flat[c]);

        let is_ear = cross2(pa, pb, pc) > AREA_EPSILON
            && !remaining
                .iter()
                .filter(|&&k| k != a && k != b && k != c)
                .any(|&k| in_triangle(&flat[k], pa, pb, pc));
        if is_ear {
            tris.push([a, b, c]);
            remaining.remove(i);
            if i >= remaining.len() {
                i = 0;
            }
            misses = 0;
            continue;
        }

        i = (i + 1) % m;
        misses += 1;
        if misses > m {
            fan(&remaining, &mut tris);
            return tris;
        }
    }
    tris.push([remaining[0], remaining[1], remaining[2]]);
    tris
}

fn face_triangles<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>) -> Vec<[usize; 3]> {
    let points: Vec<Point3<f64>> = mesh.face_vertices(f).map(|v| *mesh.position(v)).collect();
    triangulate_polygon(&points)
}

/// Replace `face` by `tris`, without pairing the new halfedges.
fn rebuild_face<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    face: FaceId<I>,
    tris: &[[usize; 3]],
    triangles: &mut Selection<I>,
) {
    if tris.len() == 1 {
        triangles.add_face(face);
        return;
    }
    if tris.is_empty() {
        return;
    }

    let hes: Vec<_> = mesh.face_halfedges(face).collect();
    let corners: Vec<_> = hes
        .iter()
        .map(|&he| (mesh.origin(he), mesh.halfedge(he).uvw))
        .collect();
    for &he in &hes {
        mesh.clear_pair(he);
        mesh.remove_halfedge(he);
    }

    for tri in tris {
        let f = mesh.create_face();
        mesh.add_face(f);
        mesh.copy_face_properties(f, face);
        triangles.add_face(f);

        let loop_hes = [
            mesh.create_halfedge(),
            mesh.create_halfedge(),
            mesh.create_halfedge(),
        ];
        for (&he, &corner) in loop_hes.iter().zip(tri) {
            let (v, uvw) = corners[corner];
            mesh.halfedge_mut(he).uvw = uvw;
            mesh.set_vertex(he, v);
            mesh.set_vertex_halfedge(v, he);
            mesh.set_face(he, f);
        }
        mesh.cycle_halfedges(&loop_hes);
        mesh.set_face_halfedge(f, loop_hes[0]);
        mesh.add_halfedges(&loop_hes);
    }
    mesh.remove_face(face);
}

fn triangulate_faces<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    faces: &[FaceId<I>],
    options: &TriangulateOptions,
) -> Selection<I> {
    debug!("triangulating {} faces", faces.len());
    let per_face: Vec<Vec<[usize; 3]>> = if options.parallel {
        let shared = &*mesh;
        faces.par_iter().map(|&f| face_triangles(shared, f)).collect()
    } else {
        faces.iter().map(|&f| face_triangles(mesh, f)).collect()
    };

    let mut triangles = Selection::new();
    let total = faces.len();
    for (i, (&f, tris)) in faces.iter().zip(&per_face).enumerate() {
        options.progress.report(i, total, "Triangulating faces");
        rebuild_face(mesh, f, tris, &mut triangles);
    }
    options.progress.report(total, total, "Triangulating faces");

    mesh.pair_halfedges();
    mesh.cap_halfedges();
    debug!("triangulation produced {} triangles", triangles.num_faces());
    triangles
}

/// Triangulate every face of `mesh`. Returns the selection of all resulting
/// triangles, including faces that already were triangles.
pub fn triangulate<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &TriangulateOptions,
) -> Selection<I> {
    let faces: Vec<_> = mesh.face_ids().collect();
    triangulate_faces(mesh, &faces, options)
}

/// Triangulate the faces of `selection`.
///
/// The selection's faces are replaced by the resulting triangles, which are
/// also returned.
pub fn triangulate_selection<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    selection: &mut Selection<I>,
    options: &TriangulateOptions,
) -> Selection<I> {
    let faces: Vec<_> = selection
        .face_ids()
        .filter(|&f| mesh.contains_face(f))
        .collect();
    let triangles = triangulate_faces(mesh, &faces, options);
    selection.clear_faces();
    selection.union(&triangles);
    triangles
}
