//! Subsets of mesh elements.
//!
//! A [`Selection`] holds element handles only, split the same way the mesh
//! splits them (vertices, faces, edges, non-edge halfedges, unpaired
//! halfedges). It never owns or borrows its mesh: every operation that reads
//! topology takes the parent mesh as an argument, and it is the caller's job to
//! pass the mesh the handles came from.
//!
//! Edits to the mesh do not update selections. A selection may keep handles of
//! elements that have since been removed, and a halfedge may sit in a partition
//! that no longer matches its pair and face pointers. Use
//! [`clean_selection`](Selection::clean_selection) to drop removed elements.
//!
//! # Example
//!
//! ```
//! use hemesh::mesh::{build_from_quads, HalfEdgeMesh, Selection};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(2.0, 1.0, 0.0),
//! ];
//! let mesh: HalfEdgeMesh = build_from_quads(&vertices, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap();
//!
//! let mut sel = Selection::new();
//! sel.add_face(mesh.face_at(0).unwrap());
//! sel.grow(&mesh, 1);
//! assert_eq!(sel.num_faces(), 2);
//! assert_eq!(sel.outer_edges(&mesh).len(), 6);
//! ```

use nalgebra::Vector3;

use super::element::Element;
use super::halfedge::{Bucket, HalfEdgeMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::ras::Ras;

/// A set of vertices, faces and halfedges of one mesh.
#[derive(Debug, Clone)]
pub struct Selection<I: MeshIndex = u32> {
    vertices: Ras<VertexId<I>>,
    faces: Ras<FaceId<I>>,
    edges: Ras<HalfEdgeId<I>>,
    non_edges: Ras<HalfEdgeId<I>>,
    unpaired: Ras<HalfEdgeId<I>>,
}

impl<I: MeshIndex> Default for Selection<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets are keyed by arena slot.
#[inline]
fn slot(index: usize) -> u64 {
    index as u64
}

impl<I: MeshIndex> Selection<I> {
    /// An empty selection.
    pub fn new() -> Self {
        Self {
            vertices: Ras::new(),
            faces: Ras::new(),
            edges: Ras::new(),
            non_edges: Ras::new(),
            unpaired: Ras::new(),
        }
    }

    // ==================== Membership ====================

    /// Add a vertex.
    pub fn add_vertex(&mut self, v: VertexId<I>) {
        self.vertices.add(slot(v.index()), v);
    }

    /// Add several vertices.
    pub fn add_vertices(&mut self, vs: impl IntoIterator<Item = VertexId<I>>) {
        for v in vs {
            self.add_vertex(v);
        }
    }

    /// Add a face.
    pub fn add_face(&mut self, f: FaceId<I>) {
        self.faces.add(slot(f.index()), f);
    }

    /// Add several faces.
    pub fn add_faces(&mut self, fs: impl IntoIterator<Item = FaceId<I>>) {
        for f in fs {
            self.add_face(f);
        }
    }

    /// Add a halfedge to the partition `mesh` currently puts it in.
    pub fn add_halfedge(&mut self, mesh: &HalfEdgeMesh<I>, he: HalfEdgeId<I>) {
        if self.contains_halfedge(he) {
            return;
        }
        let bucket = if !mesh.pair(he).is_valid() {
            Bucket::Unpaired
        } else if mesh.is_edge(he) {
            Bucket::Edge
        } else {
            Bucket::NonEdge
        };
        self.insert_halfedge(bucket, he);
    }

    fn insert_halfedge(&mut self, bucket: Bucket, he: HalfEdgeId<I>) {
        let set = match bucket {
            Bucket::Detached => return,
            Bucket::Unpaired => &mut self.unpaired,
            Bucket::Edge => &mut self.edges,
            Bucket::NonEdge => &mut self.non_edges,
        };
        set.add(slot(he.index()), he);
    }

    /// Add several halfedges.
    pub fn add_halfedges(
        &mut self,
        mesh: &HalfEdgeMesh<I>,
        hes: impl IntoIterator<Item = HalfEdgeId<I>>,
    ) {
        for he in hes {
            self.add_halfedge(mesh, he);
        }
    }

    /// Remove a vertex.
    pub fn remove_vertex(&mut self, v: VertexId<I>) {
        self.vertices.remove(slot(v.index()));
    }

    /// Remove a face.
    pub fn remove_face(&mut self, f: FaceId<I>) {
        self.faces.remove(slot(f.index()));
    }

    /// Remove a halfedge from whichever partition holds it.
    pub fn remove_halfedge(&mut self, he: HalfEdgeId<I>) {
        let key = slot(he.index());
        self.edges.remove(key);
        self.non_edges.remove(key);
        self.unpaired.remove(key);
    }

    /// Whether the vertex is selected.
    pub fn contains_vertex(&self, v: VertexId<I>) -> bool {
        self.vertices.contains_key(slot(v.index()))
    }

    /// Whether the face is selected. Always false for an invalid handle.
    pub fn contains_face(&self, f: FaceId<I>) -> bool {
        f.is_valid() && self.faces.contains_key(slot(f.index()))
    }

    /// Whether the halfedge is selected, in any partition.
    pub fn contains_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        let key = slot(he.index());
        self.edges.contains_key(key)
            || self.non_edges.contains_key(key)
            || self.unpaired.contains_key(key)
    }

    /// Whether the halfedge is selected as an edge.
    pub fn contains_edge(&self, e: HalfEdgeId<I>) -> bool {
        self.edges.contains_key(slot(e.index()))
    }

    /// Deselect all vertices.
    pub fn clear_vertices(&mut self) {
        self.vertices.clear();
    }

    /// Deselect all faces.
    pub fn clear_faces(&mut self) {
        self.faces.clear();
    }

    /// Deselect all edges, keeping non-edge and unpaired halfedges.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
    }

    /// Deselect all halfedges.
    pub fn clear_halfedges(&mut self) {
        self.edges.clear();
        self.non_edges.clear();
        self.unpaired.clear();
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.clear_vertices();
        self.clear_faces();
        self.clear_halfedges();
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty() && self.num_halfedges() == 0
    }

    // ==================== Counts and iteration ====================

    /// Number of selected vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of selected faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of selected edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of selected halfedges, all partitions.
    pub fn num_halfedges(&self) -> usize {
        self.edges.len() + self.non_edges.len() + self.unpaired.len()
    }

    /// Number of selected unpaired halfedges.
    pub fn num_unpaired_halfedges(&self) -> usize {
        self.unpaired.len()
    }

    /// Selected vertices.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertices.iter()
    }

    /// Selected faces.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.faces.iter()
    }

    /// Selected edges.
    pub fn edge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.edges.iter()
    }

    /// Selected halfedges: edges, then non-edges, then unpaired.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.edges
            .iter()
            .chain(self.non_edges.iter())
            .chain(self.unpaired.iter())
    }

    /// Selected unpaired halfedges.
    pub fn unpaired_halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.unpaired.iter()
    }

    // ==================== Set algebra ====================

    /// Add everything in `other`.
    pub fn union(&mut self, other: &Selection<I>) {
        self.add_faces(other.face_ids());
        self.add_vertices(other.vertex_ids());
        for (bucket, src) in [
            (Bucket::Edge, &other.edges),
            (Bucket::NonEdge, &other.non_edges),
            (Bucket::Unpaired, &other.unpaired),
        ] {
            for he in src.iter() {
                if !self.contains_halfedge(he) {
                    self.insert_halfedge(bucket, he);
                }
            }
        }
    }

    /// Remove everything in `other`.
    pub fn subtract(&mut self, other: &Selection<I>) {
        for f in other.face_ids() {
            self.remove_face(f);
        }
        for he in other.halfedge_ids() {
            self.remove_halfedge(he);
        }
        for v in other.vertex_ids() {
            self.remove_vertex(v);
        }
    }

    /// Keep only what is also in `other`.
    pub fn intersect(&mut self, other: &Selection<I>) {
        retain(&mut self.faces, |f| other.contains_face(f));
        retain(&mut self.vertices, |v| other.contains_vertex(v));
        for set in [&mut self.edges, &mut self.non_edges, &mut self.unpaired] {
            retain(set, |he| other.contains_halfedge(he));
        }
    }

    // ==================== Growing and shrinking ====================

    /// Add every face sharing an edge with a selected face, `n` times over.
    pub fn grow(&mut self, mesh: &HalfEdgeMesh<I>, n: usize) {
        for _ in 0..n {
            let current = self.faces.to_vec();
            for f in current {
                self.add_faces(mesh.face_neighbors(f));
            }
        }
    }

    /// Remove every selected face on the border of the face selection, `n`
    /// times over.
    pub fn shrink(&mut self, mesh: &HalfEdgeMesh<I>, n: usize) {
        for _ in 0..n {
            for e in self.outer_edges(mesh) {
                let f1 = mesh.face_of(e);
                let f2 = mesh.face_of(mesh.pair(e));
                if !self.contains_face(f1) && f2.is_valid() {
                    self.remove_face(f2);
                }
                if !self.contains_face(f2) && f1.is_valid() {
                    self.remove_face(f1);
                }
            }
        }
    }

    /// Replace the face selection with the ring of faces `n` steps out.
    ///
    /// `surround(mesh, 1)` selects the faces that touch the current selection
    /// by an edge but are not in it.
    pub fn surround(&mut self, mesh: &HalfEdgeMesh<I>, n: usize) {
        if n == 0 {
            return;
        }
        self.grow(mesh, n - 1);
        let current = self.faces.to_vec();
        for &f in &current {
            self.add_faces(mesh.face_neighbors(f));
        }
        for f in current {
            self.remove_face(f);
        }
    }

    // ==================== Inversion ====================

    /// Select exactly the mesh faces that were not selected.
    pub fn invert_faces(&mut self, mesh: &HalfEdgeMesh<I>) {
        let inverted: Vec<_> = mesh.face_ids().filter(|&f| !self.contains_face(f)).collect();
        self.clear_faces();
        self.add_faces(inverted);
    }

    /// Select exactly the mesh edges that were not selected. Other halfedges
    /// are left alone.
    pub fn invert_edges(&mut self, mesh: &HalfEdgeMesh<I>) {
        let inverted: Vec<_> = mesh.edge_ids().filter(|&e| !self.contains_edge(e)).collect();
        self.clear_edges();
        for e in inverted {
            self.insert_halfedge(Bucket::Edge, e);
        }
    }

    /// Select exactly the mesh halfedges that were not selected.
    pub fn invert_halfedges(&mut self, mesh: &HalfEdgeMesh<I>) {
        let inverted: Vec<_> = mesh
            .halfedge_ids()
            .filter(|&he| !self.contains_halfedge(he))
            .collect();
        self.clear_halfedges();
        self.add_halfedges(mesh, inverted);
    }

    /// Select exactly the mesh vertices that were not selected.
    pub fn invert_vertices(&mut self, mesh: &HalfEdgeMesh<I>) {
        let inverted: Vec<_> = mesh
            .vertex_ids()
            .filter(|&v| !self.contains_vertex(v))
            .collect();
        self.clear_vertices();
        self.add_vertices(inverted);
    }

    /// Invert faces, halfedges and vertices.
    pub fn invert(&mut self, mesh: &HalfEdgeMesh<I>) {
        self.invert_faces(mesh);
        self.invert_halfedges(mesh);
        self.invert_vertices(mesh);
    }

    /// Drop every element that is no longer registered in `mesh`, and move
    /// surviving halfedges to the partition `mesh` now puts them in.
    pub fn clean_selection(&mut self, mesh: &HalfEdgeMesh<I>) {
        retain(&mut self.faces, |f| mesh.contains_face(f));
        retain(&mut self.vertices, |v| mesh.contains_vertex(v));
        let hes: Vec<_> = self
            .halfedge_ids()
            .filter(|&he| mesh.contains_halfedge(he))
            .collect();
        self.clear_halfedges();
        self.add_halfedges(mesh, hes);
    }

    // ==================== Completion ====================

    /// Add the corners of selected faces and the start vertices of selected
    /// halfedges.
    pub fn collect_vertices(&mut self, mesh: &HalfEdgeMesh<I>) {
        for f in self.faces.to_vec() {
            self.add_vertices(mesh.face_vertices(f));
        }
        let starts: Vec<_> = self.halfedge_ids().map(|he| mesh.origin(he)).collect();
        self.add_vertices(starts);
    }

    /// Add the faces around selected vertices and the faces of selected
    /// halfedges.
    pub fn collect_faces(&mut self, mesh: &HalfEdgeMesh<I>) {
        for v in self.vertices.to_vec() {
            self.add_faces(mesh.vertex_faces(v));
        }
        let faces: Vec<_> = self
            .halfedge_ids()
            .filter_map(|he| mesh.face_of(he).valid())
            .collect();
        self.add_faces(faces);
    }

    /// Add the edges bounding selected faces.
    pub fn collect_edges_by_face(&mut self, mesh: &HalfEdgeMesh<I>) {
        for f in self.faces.to_vec() {
            let edges: Vec<_> = mesh.face_halfedges(f).filter_map(|he| mesh.edge_of(he)).collect();
            self.add_halfedges(mesh, edges);
        }
    }

    /// Add the edges around selected vertices.
    pub fn collect_edges_by_vertex(&mut self, mesh: &HalfEdgeMesh<I>) {
        for v in self.vertices.to_vec() {
            let edges: Vec<_> = mesh
                .vertex_halfedges(v)
                .filter_map(|he| mesh.edge_of(he))
                .collect();
            self.add_halfedges(mesh, edges);
        }
    }

    /// Add the halfedges of selected faces and their pairs.
    pub fn collect_halfedges(&mut self, mesh: &HalfEdgeMesh<I>) {
        for f in self.faces.to_vec() {
            for he in mesh.face_halfedges(f) {
                self.add_halfedge(mesh, he);
                let pair = mesh.pair(he);
                if pair.is_valid() {
                    self.add_halfedge(mesh, pair);
                }
            }
        }
    }

    /// Rebuild the vertex and halfedge selection from the selected faces.
    ///
    /// Selects each face's corners and halfedges, plus the face-less pairs
    /// along the mesh border. Afterwards every selected vertex whose
    /// representative halfedge lies outside the selection is pointed at one
    /// inside it, which is why the mesh is borrowed mutably.
    pub fn complete_from_faces(&mut self, mesh: &mut HalfEdgeMesh<I>) {
        self.clear_halfedges();
        self.clear_vertices();
        let faces = self.faces.to_vec();
        for &f in &faces {
            let hes: Vec<_> = mesh.face_halfedges(f).collect();
            for he in hes {
                self.add_vertex(mesh.origin(he));
                self.add_halfedge(mesh, he);
                let pair = mesh.pair(he);
                if pair.is_valid() && mesh.is_outer_boundary(pair) {
                    self.add_halfedge(mesh, pair);
                }
            }
        }
        for &f in &faces {
            let hes: Vec<_> = mesh.face_halfedges(f).collect();
            for he in hes {
                let v = mesh.origin(he);
                if !self.contains_halfedge(mesh.vertex(v).halfedge()) {
                    mesh.set_vertex_halfedge(v, he);
                }
            }
        }
    }

    // ==================== Derived sets ====================

    /// Edges of the selected faces that border an unselected face or a hole.
    pub fn outer_edges(&self, mesh: &HalfEdgeMesh<I>) -> Vec<HalfEdgeId<I>> {
        self.face_edges_where(mesh, true)
    }

    /// Edges of the selected faces with a selected face on both sides.
    pub fn inner_edges(&self, mesh: &HalfEdgeMesh<I>) -> Vec<HalfEdgeId<I>> {
        self.face_edges_where(mesh, false)
    }

    fn face_edges_where(&self, mesh: &HalfEdgeMesh<I>, outer: bool) -> Vec<HalfEdgeId<I>> {
        let mut edges = self.clone();
        edges.collect_edges_by_face(mesh);
        edges
            .halfedge_ids()
            .filter(|&he| mesh.is_edge(he))
            .filter(|&e| {
                let both = self.contains_face(mesh.face_of(e))
                    && self.contains_face(mesh.face_of(mesh.pair(e)));
                both != outer
            })
            .collect()
    }

    /// Endpoints of [`outer_edges`](Self::outer_edges), first-seen order.
    pub fn outer_vertices(&self, mesh: &HalfEdgeMesh<I>) -> Vec<VertexId<I>> {
        endpoints(mesh, self.outer_edges(mesh))
    }

    /// Collected vertices that are not outer vertices.
    pub fn inner_vertices(&self, mesh: &HalfEdgeMesh<I>) -> Vec<VertexId<I>> {
        let outer = self.outer_vertices(mesh);
        let mut all = self.clone();
        all.collect_vertices(mesh);
        all.vertex_ids().filter(|v| !outer.contains(v)).collect()
    }

    /// Endpoints of outer edges that lie on the mesh border.
    pub fn boundary_vertices(&self, mesh: &HalfEdgeMesh<I>) -> Vec<VertexId<I>> {
        let border = self.outer_edges(mesh).into_iter().filter(|&e| {
            !mesh.face_of(e).is_valid() || !mesh.face_of(mesh.pair(e)).is_valid()
        });
        endpoints(mesh, border)
    }

    /// Halfedges around the selected faces whose own face is unselected or
    /// missing.
    pub fn outer_halfedges(&self, mesh: &HalfEdgeMesh<I>) -> Vec<HalfEdgeId<I>> {
        let mut all = self.clone();
        all.collect_halfedges(mesh);
        all.halfedge_ids()
            .filter(|&he| !self.contains_face(mesh.face_of(he)))
            .collect()
    }

    /// Halfedges around the selected faces with a selected face on both sides.
    pub fn inner_halfedges(&self, mesh: &HalfEdgeMesh<I>) -> Vec<HalfEdgeId<I>> {
        let mut all = self.clone();
        all.collect_halfedges(mesh);
        all.halfedge_ids()
            .filter(|&he| {
                let pair = mesh.pair(he);
                pair.is_valid()
                    && self.contains_face(mesh.face_of(he))
                    && self.contains_face(mesh.face_of(pair))
            })
            .collect()
    }

    // ==================== Constructors ====================

    /// Every registered element.
    pub fn select_all(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        sel.add_faces(mesh.face_ids());
        sel.add_halfedges(mesh, mesh.halfedge_ids());
        sel.add_vertices(mesh.vertex_ids());
        sel
    }

    /// Every face.
    pub fn select_all_faces(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        sel.add_faces(mesh.face_ids());
        sel
    }

    /// Every edge.
    pub fn select_all_edges(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        sel.add_halfedges(mesh, mesh.edge_ids());
        sel
    }

    /// Every halfedge.
    pub fn select_all_halfedges(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        sel.add_halfedges(mesh, mesh.halfedge_ids());
        sel
    }

    /// Every vertex.
    pub fn select_all_vertices(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        sel.add_vertices(mesh.vertex_ids());
        sel
    }

    /// Faces across from a face-less halfedge.
    pub fn select_boundary_faces(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        for he in mesh.boundary_halfedges() {
            let pair = mesh.pair(he);
            if let Some(f) = pair.valid().and_then(|p| mesh.face_of(p).valid()) {
                sel.add_face(f);
            }
        }
        sel
    }

    /// Edges with a face on one side only.
    pub fn select_boundary_edges(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        let edges: Vec<_> = mesh.edge_ids().filter(|&e| mesh.is_inner_boundary(e)).collect();
        sel.add_halfedges(mesh, edges);
        sel
    }

    /// Start vertices of face-less halfedges.
    pub fn select_boundary_vertices(mesh: &HalfEdgeMesh<I>) -> Self {
        let mut sel = Self::new();
        sel.add_vertices(mesh.boundary_halfedges().into_iter().map(|he| mesh.origin(he)));
        sel
    }

    /// Faces whose label equals `label`.
    pub fn select_faces_with_label(mesh: &HalfEdgeMesh<I>, label: i32) -> Self {
        let mut sel = Self::new();
        sel.add_faces(
            mesh.faces()
                .filter(|(_, rec)| rec.label() == label)
                .map(|(f, _)| f),
        );
        sel
    }

    /// Faces whose temporary label equals `label`.
    pub fn select_faces_with_temporary_label(mesh: &HalfEdgeMesh<I>, label: i32) -> Self {
        let mut sel = Self::new();
        sel.add_faces(
            mesh.faces()
                .filter(|(_, rec)| rec.temporary_label() == label)
                .map(|(f, _)| f),
        );
        sel
    }

    /// Edges whose label equals `label`.
    pub fn select_edges_with_label(mesh: &HalfEdgeMesh<I>, label: i32) -> Self {
        let mut sel = Self::new();
        let edges: Vec<_> = mesh
            .edge_ids()
            .filter(|&e| mesh.halfedge(e).label() == label)
            .collect();
        sel.add_halfedges(mesh, edges);
        sel
    }

    /// Vertices whose label equals `label`.
    pub fn select_vertices_with_label(mesh: &HalfEdgeMesh<I>, label: i32) -> Self {
        let mut sel = Self::new();
        sel.add_vertices(
            mesh.vertices()
                .filter(|(_, rec)| rec.label() == label)
                .map(|(v, _)| v),
        );
        sel
    }

    /// Faces whose normal lies within `angle` radians of `direction`.
    pub fn select_faces_with_normal(
        mesh: &HalfEdgeMesh<I>,
        direction: &Vector3<f64>,
        angle: f64,
    ) -> Self {
        let mut sel = Self::new();
        let Some(dir) = direction.try_normalize(f64::EPSILON) else {
            return sel;
        };
        let cos_angle = angle.cos();
        sel.add_faces(
            mesh.face_ids()
                .filter(|&f| dir.dot(&mesh.face_normal(f)) > cos_angle),
        );
        sel
    }
}

/// Keep the items of `set` that satisfy `keep`.
fn retain<T: Copy>(set: &mut Ras<T>, mut keep: impl FnMut(T) -> bool) {
    let kept: Vec<(u64, T)> = set
        .keys()
        .iter()
        .copied()
        .zip(set.iter())
        .filter(|&(_, item)| keep(item))
        .collect();
    set.clear();
    for (key, item) in kept {
        set.add(key, item);
    }
}

fn endpoints<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    edges: impl IntoIterator<Item = HalfEdgeId<I>>,
) -> Vec<VertexId<I>> {
    let mut out: Vec<VertexId<I>> = Vec::new();
    for e in edges {
        for v in [mesh.origin(e), mesh.dest(e)] {
            if v.is_valid() && !out.contains(&v) {
                out.push(v);
            }
        }
    }
    out
}
