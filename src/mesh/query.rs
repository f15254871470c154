//! Read-only navigation, classification and geometry.
//!
//! Nothing here mutates the mesh or caches anything, so these methods are safe
//! to call from many threads at once on a shared `&HalfEdgeMesh`.
//!
//! Circulators follow pointers as they are. If a loop is broken (a `next` or
//! `pair` pointer unset mid-edit) they stop at the gap instead of wrapping, and
//! they never take more steps than there are halfedges in the arena.

use nalgebra::{Point3, Vector3};

use super::element::TexCoord;
use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};

impl<I: MeshIndex> HalfEdgeMesh<I> {
    // ==================== Navigation ====================

    /// Opposite halfedge.
    #[inline]
    pub fn pair(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).pair
    }

    /// Next halfedge in the loop.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Previous halfedge in the loop.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Start vertex.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).vertex
    }

    /// End vertex, the start of `next`. Invalid if `next` is unset.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        let next = self.next(he);
        if next.is_valid() {
            self.origin(next)
        } else {
            VertexId::invalid()
        }
    }

    /// Incident face.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Next outgoing halfedge around the start vertex: `next(pair(he))`.
    #[inline]
    pub fn next_in_vertex(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        let pair = self.pair(he);
        if pair.is_valid() {
            self.next(pair)
        } else {
            HalfEdgeId::invalid()
        }
    }

    /// Previous outgoing halfedge around the start vertex: `pair(prev(he))`.
    #[inline]
    pub fn prev_in_vertex(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        let prev = self.prev(he);
        if prev.is_valid() {
            self.pair(prev)
        } else {
            HalfEdgeId::invalid()
        }
    }

    // ==================== Circulators ====================

    /// Iterate over outgoing halfedges around a vertex.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, self.vertex(v).halfedge)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v)
            .map(|he| self.dest(he))
            .filter(|n| n.is_valid())
    }

    /// Iterate over faces around a vertex, skipping boundary gaps.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v).filter_map(|he| self.face_of(he).valid())
    }

    /// Number of outgoing halfedges around a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    /// Iterate over the `next` loop starting at `he`.
    pub fn loop_halfedges(&self, he: HalfEdgeId<I>) -> HalfEdgeLoopIter<'_, I> {
        HalfEdgeLoopIter::new(self, he)
    }

    /// Iterate over halfedges around a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> HalfEdgeLoopIter<'_, I> {
        HalfEdgeLoopIter::new(self, self.face(f).halfedge)
    }

    /// Iterate over vertices of a face.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.origin(he))
    }

    /// Number of corners of a face.
    pub fn face_order(&self, f: FaceId<I>) -> usize {
        self.face_halfedges(f).count()
    }

    /// Distinct faces sharing an edge with `f`.
    pub fn face_neighbors(&self, f: FaceId<I>) -> Vec<FaceId<I>> {
        let mut out: Vec<FaceId<I>> = Vec::new();
        for he in self.face_halfedges(f) {
            let pair = self.pair(he);
            if !pair.is_valid() {
                continue;
            }
            let nf = self.face_of(pair);
            if nf.is_valid() && nf != f && !out.contains(&nf) {
                out.push(nf);
            }
        }
        out
    }

    /// The halfedge of `f` that starts at `v`.
    pub fn halfedge_in_face_from(&self, f: FaceId<I>, v: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.face_halfedges(f).find(|&he| self.origin(he) == v)
    }

    /// A registered halfedge running from `v0` to `v1`.
    ///
    /// Looks around `v0` first and falls back to a scan of every halfedge,
    /// so it also works while pairs are still missing.
    pub fn search_halfedge(&self, v0: VertexId<I>, v1: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.vertex_halfedges(v0)
            .find(|&he| self.dest(he) == v1)
            .or_else(|| {
                self.halfedge_ids()
                    .find(|&he| self.origin(he) == v0 && self.dest(he) == v1)
            })
    }

    /// Every registered halfedge without a face.
    pub fn boundary_halfedges(&self) -> Vec<HalfEdgeId<I>> {
        self.halfedge_ids()
            .filter(|&he| !self.face_of(he).is_valid())
            .collect()
    }

    // ==================== Classification ====================

    /// The canonical half of the edge `he` belongs to.
    pub fn edge_of(&self, he: HalfEdgeId<I>) -> Option<HalfEdgeId<I>> {
        let pair = self.pair(he);
        if !pair.is_valid() {
            return None;
        }
        if self.is_edge(he) {
            Some(he)
        } else if self.is_edge(pair) {
            Some(pair)
        } else {
            None
        }
    }

    /// True when `he` has no face.
    #[inline]
    pub fn is_outer_boundary(&self, he: HalfEdgeId<I>) -> bool {
        !self.face_of(he).is_valid()
    }

    /// True when `he` has a face but its pair does not (or it has no pair).
    pub fn is_inner_boundary(&self, he: HalfEdgeId<I>) -> bool {
        if !self.face_of(he).is_valid() {
            return false;
        }
        let pair = self.pair(he);
        !pair.is_valid() || !self.face_of(pair).is_valid()
    }

    /// True when either side of the edge through `he` lacks a face.
    pub fn is_boundary_edge(&self, he: HalfEdgeId<I>) -> bool {
        self.is_outer_boundary(he) || self.is_inner_boundary(he)
    }

    /// True when some outgoing halfedge of `v` has no face or no pair.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        self.vertex_halfedges(v)
            .any(|he| !self.face_of(he).is_valid() || !self.pair(he).is_valid())
    }

    /// True when some side of `f` borders a hole.
    pub fn is_boundary_face(&self, f: FaceId<I>) -> bool {
        self.face_halfedges(f).any(|he| self.is_inner_boundary(he))
    }

    // ==================== Geometry ====================

    /// Unit normal of a face by Newell's method, zero for a degenerate face.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        self.newell_vector(f)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Area of a (planar) face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        0.5 * self.newell_vector(f).norm()
    }

    /// Sum of `p_i x p_{i+1}` over the face boundary: twice the vector area.
    fn newell_vector(&self, f: FaceId<I>) -> Vector3<f64> {
        let pts: Vec<Point3<f64>> = self.face_vertices(f).map(|v| *self.position(v)).collect();
        let n = pts.len();
        let mut sum = Vector3::<f64>::zeros();
        for i in 0..n {
            sum += pts[i].coords.cross(&pts[(i + 1) % n].coords);
        }
        sum
    }

    /// Average of a face's corners.
    pub fn face_center(&self, f: FaceId<I>) -> Point3<f64> {
        let mut sum = Vector3::<f64>::zeros();
        let mut count = 0usize;
        for v in self.face_vertices(f) {
            sum += self.position(v).coords;
            count += 1;
        }
        if count == 0 {
            return Point3::origin();
        }
        Point3::from(sum / count as f64)
    }

    /// Compute the length of an edge.
    pub fn edge_length(&self, he: HalfEdgeId<I>) -> f64 {
        self.edge_vector(he).norm()
    }

    /// Compute the edge vector (from origin to destination).
    pub fn edge_vector(&self, he: HalfEdgeId<I>) -> Vector3<f64> {
        let p0 = self.position(self.origin(he));
        let p1 = self.position(self.dest(he));
        p1 - p0
    }

    /// Compute the midpoint of an edge.
    pub fn edge_midpoint(&self, he: HalfEdgeId<I>) -> Point3<f64> {
        let p0 = self.position(self.origin(he));
        let p1 = self.position(self.dest(he));
        Point3::from((p0.coords + p1.coords) * 0.5)
    }

    /// Normalized average of the normals of the faces on either side.
    pub fn edge_normal(&self, he: HalfEdgeId<I>) -> Vector3<f64> {
        let mut n = Vector3::<f64>::zeros();
        let f = self.face_of(he);
        if f.is_valid() {
            n += self.face_normal(f);
        }
        let pair = self.pair(he);
        if pair.is_valid() {
            let fp = self.face_of(pair);
            if fp.is_valid() {
                n += self.face_normal(fp);
            }
        }
        n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// Texture coordinate at the start of `he`: its own, else its vertex's.
    pub fn halfedge_uvw(&self, he: HalfEdgeId<I>) -> Option<TexCoord> {
        let rec = self.halfedge(he);
        rec.uvw.or_else(|| self.vertex(rec.vertex).uvw)
    }

    /// Axis-aligned bounds of the registered vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut ids = self.vertex_ids();
        let first = *self.position(ids.next()?);
        let (mut min, mut max) = (first, first);
        for v in ids {
            let p = self.position(v);
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }
}

/// Iterator over outgoing halfedges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    remaining: usize,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            mesh,
            start,
            current: start,
            remaining: mesh.halfedges.len(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_valid() || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;

        // If he goes v -> w, pair(he) goes w -> v and the halfedge after it
        // leaves v again.
        let next = self.mesh.next_in_vertex(self.current);
        self.current = if next == self.start {
            HalfEdgeId::invalid()
        } else {
            next
        };

        Some(result)
    }
}

/// Iterator over a `next` loop, such as the boundary of a face.
pub struct HalfEdgeLoopIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    remaining: usize,
}

impl<'a, I: MeshIndex> HalfEdgeLoopIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            mesh,
            start,
            current: start,
            remaining: mesh.halfedges.len(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for HalfEdgeLoopIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_valid() || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;
        let next = self.mesh.next(self.current);
        self.current = if next == self.start {
            HalfEdgeId::invalid()
        } else {
            next
        };

        Some(result)
    }
}
