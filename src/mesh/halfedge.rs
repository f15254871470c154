//! Half-edge mesh structure.
//!
//! This module holds the element records and [`HalfEdgeMesh`], which owns them
//! and exposes the only sanctioned way to change connectivity.
//!
//! # Structure
//!
//! - Each face boundary is a cycle of **halfedges** linked by `next` (with `prev`
//!   kept consistent by [`HalfEdgeMesh::set_next`])
//! - Each halfedge has one start vertex, at most one **pair** running the other
//!   way, and at most one face. A halfedge with no face faces the outside of a
//!   hole or open border
//! - Each vertex stores one outgoing halfedge, each face one boundary halfedge
//!
//! # Storage
//!
//! Records live in arenas (`Vec`s indexed by the handle types). Registration is a
//! separate step: a record is part of the mesh only while its handle sits in one
//! of the random-access sets. Removing an element takes it out of its set but
//! leaves the record and its pointers untouched in the arena.
//!
//! Registered halfedges are split three ways, tracked by a [`Bucket`] tag on
//! every halfedge:
//!
//! - **edge**: paired, has a face, and is the canonical half of its edge
//! - **non-edge**: paired, but not canonical
//! - **unpaired**: no pair
//!
//! A halfedge is canonical when its pair has no face, or when both have faces
//! and its key is the smaller one. The tag is recomputed inside every mutator
//! that changes a pair or face pointer.

use nalgebra::Point3;

use super::element::{Element, ElementData, KeyAllocator, TexCoord};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use super::ras::Ras;
use crate::error::{MeshError, Result};

/// Value of an unset color.
pub const NO_COLOR: i32 = -1;

/// A vertex of the mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    pub(crate) data: ElementData,

    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// Optional texture coordinate, used by halfedges that carry none.
    pub uvw: Option<TexCoord>,

    /// Packed color, [`NO_COLOR`] if unset.
    pub color: i32,

    /// One outgoing halfedge.
    pub(crate) halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    pub(crate) fn new(key: u64, position: Point3<f64>) -> Self {
        Self {
            data: ElementData::new(key),
            position,
            uvw: None,
            color: NO_COLOR,
            halfedge: HalfEdgeId::invalid(),
        }
    }

    /// Representative outgoing halfedge.
    #[inline]
    pub fn halfedge(&self) -> HalfEdgeId<I> {
        self.halfedge
    }

    /// Copy labels, color and texture coordinate from `other`.
    pub fn copy_properties(&mut self, other: &Self) {
        self.data.copy_from(&other.data);
        self.color = other.color;
        self.uvw = other.uvw;
    }
}

impl<I: MeshIndex> Element for Vertex<I> {
    fn data(&self) -> &ElementData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ElementData {
        &mut self.data
    }
}

/// Which halfedge partition of the mesh a halfedge currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Not registered in the mesh.
    Detached,
    /// Registered, no pair.
    Unpaired,
    /// Registered, canonical half of a paired edge.
    Edge,
    /// Registered, paired but not canonical.
    NonEdge,
}

/// A directed halfedge.
#[derive(Debug, Clone)]
pub struct HalfEdge<I: MeshIndex = u32> {
    pub(crate) data: ElementData,
    pub(crate) vertex: VertexId<I>,
    pub(crate) pair: HalfEdgeId<I>,
    pub(crate) next: HalfEdgeId<I>,
    pub(crate) prev: HalfEdgeId<I>,
    pub(crate) face: FaceId<I>,
    pub(crate) bucket: Bucket,

    /// Per-corner texture coordinate.
    pub uvw: Option<TexCoord>,

    /// Packed color, [`NO_COLOR`] if unset.
    pub color: i32,
}

impl<I: MeshIndex> HalfEdge<I> {
    pub(crate) fn new(key: u64) -> Self {
        Self {
            data: ElementData::new(key),
            vertex: VertexId::invalid(),
            pair: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            bucket: Bucket::Detached,
            uvw: None,
            color: NO_COLOR,
        }
    }

    /// Start vertex.
    #[inline]
    pub fn vertex(&self) -> VertexId<I> {
        self.vertex
    }

    /// Opposite halfedge.
    #[inline]
    pub fn pair(&self) -> HalfEdgeId<I> {
        self.pair
    }

    /// Next halfedge in the loop.
    #[inline]
    pub fn next(&self) -> HalfEdgeId<I> {
        self.next
    }

    /// Previous halfedge in the loop.
    #[inline]
    pub fn prev(&self) -> HalfEdgeId<I> {
        self.prev
    }

    /// Incident face, invalid when the halfedge faces a hole.
    #[inline]
    pub fn face(&self) -> FaceId<I> {
        self.face
    }

    /// Current partition.
    #[inline]
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// True when there is no face on this side.
    #[inline]
    pub fn is_outer_boundary(&self) -> bool {
        !self.face.is_valid()
    }

    /// Copy labels, color and texture coordinate from `other`.
    pub fn copy_properties(&mut self, other: &Self) {
        self.data.copy_from(&other.data);
        self.color = other.color;
        self.uvw = other.uvw;
    }
}

impl<I: MeshIndex> Element for HalfEdge<I> {
    fn data(&self) -> &ElementData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ElementData {
        &mut self.data
    }
}

/// A polygonal face.
#[derive(Debug, Clone)]
pub struct Face<I: MeshIndex = u32> {
    pub(crate) data: ElementData,
    pub(crate) halfedge: HalfEdgeId<I>,

    /// Packed color, [`NO_COLOR`] if unset.
    pub color: i32,

    /// Texture id, -1 if unset.
    pub texture_id: i32,
}

impl<I: MeshIndex> Face<I> {
    pub(crate) fn new(key: u64) -> Self {
        Self {
            data: ElementData::new(key),
            halfedge: HalfEdgeId::invalid(),
            color: NO_COLOR,
            texture_id: -1,
        }
    }

    /// Representative boundary halfedge.
    #[inline]
    pub fn halfedge(&self) -> HalfEdgeId<I> {
        self.halfedge
    }

    /// Copy labels, color and texture id from `other`.
    pub fn copy_properties(&mut self, other: &Self) {
        self.data.copy_from(&other.data);
        self.color = other.color;
        self.texture_id = other.texture_id;
    }
}

impl<I: MeshIndex> Element for Face<I> {
    fn data(&self) -> &ElementData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ElementData {
        &mut self.data
    }
}

/// A polygon mesh in half-edge representation.
///
/// Not safe for concurrent mutation (all mutators take `&mut self`), but all
/// read accessors are pure, so `&HalfEdgeMesh` can be shared between threads.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,

    pub(crate) vertex_set: Ras<VertexId<I>>,
    pub(crate) face_set: Ras<FaceId<I>>,
    pub(crate) edge_set: Ras<HalfEdgeId<I>>,
    pub(crate) non_edge_set: Ras<HalfEdgeId<I>>,
    pub(crate) unpaired_set: Ras<HalfEdgeId<I>>,

    keys: KeyAllocator,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Quads dominate typical input: about 4 halfedges per face, half of
        // them canonical.
        let num_halfedges = num_faces * 4;

        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
            vertex_set: Ras::with_capacity(num_vertices),
            face_set: Ras::with_capacity(num_faces),
            edge_set: Ras::with_capacity(num_halfedges / 2),
            non_edge_set: Ras::with_capacity(num_halfedges / 2),
            unpaired_set: Ras::new(),
            keys: KeyAllocator::new(),
        }
    }

    // ==================== Element creation ====================

    /// Create a detached vertex. It becomes part of the mesh on
    /// [`add_vertex`](Self::add_vertex).
    pub fn create_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        let key = self.keys.next_key();
        self.vertices.push(Vertex::new(key, position));
        id
    }

    /// Create a detached halfedge with no pointers set.
    pub fn create_halfedge(&mut self) -> HalfEdgeId<I> {
        let id = HalfEdgeId::new(self.halfedges.len());
        let key = self.keys.next_key();
        self.halfedges.push(HalfEdge::new(key));
        id
    }

    /// Create a detached face with no halfedge.
    pub fn create_face(&mut self) -> FaceId<I> {
        let id = FaceId::new(self.faces.len());
        let key = self.keys.next_key();
        self.faces.push(Face::new(key));
        id
    }

    /// Create a vertex and register it.
    pub fn insert_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let v = self.create_vertex(position);
        self.add_vertex(v);
        v
    }

    // ==================== Registration ====================

    /// Register a vertex. No-op if already registered.
    pub fn add_vertex(&mut self, v: VertexId<I>) {
        let key = self.vertex(v).key();
        self.vertex_set.add(key, v);
    }

    /// Register a face. No-op if already registered.
    pub fn add_face(&mut self, f: FaceId<I>) {
        let key = self.face(f).key();
        self.face_set.add(key, f);
    }

    /// Register a halfedge into the partition its current pair and face
    /// pointers select. No-op if already registered.
    pub fn add_halfedge(&mut self, he: HalfEdgeId<I>) {
        if self.halfedge(he).bucket != Bucket::Detached {
            return;
        }
        let bucket = self.classify(he);
        let key = self.halfedge(he).key();
        if let Some(set) = self.bucket_set_mut(bucket) {
            set.add(key, he);
        }
        self.halfedge_mut(he).bucket = bucket;
    }

    /// Register several halfedges.
    pub fn add_halfedges(&mut self, hes: &[HalfEdgeId<I>]) {
        for &he in hes {
            self.add_halfedge(he);
        }
    }

    /// Deregister a vertex. Its record and pointers stay in the arena.
    pub fn remove_vertex(&mut self, v: VertexId<I>) {
        let key = self.vertex(v).key();
        self.vertex_set.remove(key);
    }

    /// Deregister a face.
    pub fn remove_face(&mut self, f: FaceId<I>) {
        let key = self.face(f).key();
        self.face_set.remove(key);
    }

    /// Deregister a halfedge from whichever partition holds it.
    pub fn remove_halfedge(&mut self, he: HalfEdgeId<I>) {
        let bucket = self.halfedge(he).bucket;
        let key = self.halfedge(he).key();
        if let Some(set) = self.bucket_set_mut(bucket) {
            set.remove(key);
        }
        self.halfedge_mut(he).bucket = Bucket::Detached;
    }

    /// Deregister several halfedges.
    pub fn remove_halfedges(&mut self, hes: &[HalfEdgeId<I>]) {
        for &he in hes {
            self.remove_halfedge(he);
        }
    }

    /// Deregister every vertex.
    pub fn clear_vertices(&mut self) {
        self.vertex_set.clear();
    }

    /// Deregister every face.
    pub fn clear_faces(&mut self) {
        self.face_set.clear();
    }

    /// Deregister every halfedge.
    pub fn clear_halfedges(&mut self) {
        let all: Vec<_> = self.halfedge_ids().collect();
        for he in all {
            self.halfedge_mut(he).bucket = Bucket::Detached;
        }
        self.edge_set.clear();
        self.non_edge_set.clear();
        self.unpaired_set.clear();
    }

    /// Remove everything, arenas included. Keys keep counting up.
    pub fn clear(&mut self) {
        self.clear_vertices();
        self.clear_faces();
        self.clear_halfedges();
        self.vertices.clear();
        self.halfedges.clear();
        self.faces.clear();
    }

    /// Whether the vertex is registered.
    #[inline]
    pub fn contains_vertex(&self, v: VertexId<I>) -> bool {
        v.index() < self.vertices.len() && self.vertex_set.contains_key(self.vertex(v).key())
    }

    /// Whether the halfedge is registered.
    #[inline]
    pub fn contains_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        he.index() < self.halfedges.len() && self.halfedge(he).bucket != Bucket::Detached
    }

    /// Whether the face is registered.
    #[inline]
    pub fn contains_face(&self, f: FaceId<I>) -> bool {
        f.index() < self.faces.len() && self.face_set.contains_key(self.face(f).key())
    }

    fn bucket_set_mut(&mut self, bucket: Bucket) -> Option<&mut Ras<HalfEdgeId<I>>> {
        match bucket {
            Bucket::Detached => None,
            Bucket::Unpaired => Some(&mut self.unpaired_set),
            Bucket::Edge => Some(&mut self.edge_set),
            Bucket::NonEdge => Some(&mut self.non_edge_set),
        }
    }

    fn bucket_set(&self, bucket: Bucket) -> Option<&Ras<HalfEdgeId<I>>> {
        match bucket {
            Bucket::Detached => None,
            Bucket::Unpaired => Some(&self.unpaired_set),
            Bucket::Edge => Some(&self.edge_set),
            Bucket::NonEdge => Some(&self.non_edge_set),
        }
    }

    // ==================== Accessors ====================

    /// Number of registered vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertex_set.len()
    }

    /// Number of registered halfedges, all three partitions.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.edge_set.len() + self.non_edge_set.len() + self.unpaired_set.len()
    }

    /// Number of edges (canonical halfedges).
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edge_set.len()
    }

    /// Number of registered halfedges without a pair.
    #[inline]
    pub fn num_unpaired_halfedges(&self) -> usize {
        self.unpaired_set.len()
    }

    /// Number of registered faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.face_set.len()
    }

    /// Get a vertex record.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a mutable vertex record. Topology pointers are not reachable
    /// through it.
    #[inline]
    pub fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a halfedge record.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    /// Get a mutable halfedge record.
    #[inline]
    pub fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get a face record.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get a mutable face record.
    #[inline]
    pub fn face_mut(&mut self, id: FaceId<I>) -> &mut Face<I> {
        &mut self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId<I>, pos: Point3<f64>) {
        self.vertex_mut(v).position = pos;
    }

    /// Vertex at position `i` of the vertex set.
    pub fn vertex_at(&self, i: usize) -> Option<VertexId<I>> {
        self.vertex_set.get(i)
    }

    /// Face at position `i` of the face set.
    pub fn face_at(&self, i: usize) -> Option<FaceId<I>> {
        self.face_set.get(i)
    }

    /// Edge at position `i` of the edge set.
    pub fn edge_at(&self, i: usize) -> Option<HalfEdgeId<I>> {
        self.edge_set.get(i)
    }

    /// Unpaired halfedge at position `i`.
    pub fn unpaired_halfedge_at(&self, i: usize) -> Option<HalfEdgeId<I>> {
        self.unpaired_set.get(i)
    }

    /// Position of a vertex in the vertex set.
    pub fn index_of_vertex(&self, v: VertexId<I>) -> Option<usize> {
        self.vertex_set.index_of(self.vertex(v).key())
    }

    /// Position of a face in the face set.
    pub fn index_of_face(&self, f: FaceId<I>) -> Option<usize> {
        self.face_set.index_of(self.face(f).key())
    }

    /// Position of a halfedge inside its own partition.
    pub fn index_of_halfedge(&self, he: HalfEdgeId<I>) -> Option<usize> {
        let rec = self.halfedge(he);
        self.bucket_set(rec.bucket)?.index_of(rec.key())
    }

    /// Registered vertex with the given key.
    pub fn vertex_with_key(&self, key: u64) -> Option<VertexId<I>> {
        self.vertex_set.get_with_key(key)
    }

    /// Registered face with the given key.
    pub fn face_with_key(&self, key: u64) -> Option<FaceId<I>> {
        self.face_set.get_with_key(key)
    }

    /// Registered halfedge with the given key, from any partition.
    pub fn halfedge_with_key(&self, key: u64) -> Option<HalfEdgeId<I>> {
        self.edge_set
            .get_with_key(key)
            .or_else(|| self.non_edge_set.get_with_key(key))
            .or_else(|| self.unpaired_set.get_with_key(key))
    }

    // ==================== Iteration ====================

    /// Iterate over registered vertices in set order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_set.iter()
    }

    /// Iterate over registered vertices with their records.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId<I>, &Vertex<I>)> + '_ {
        self.vertex_set.iter().map(move |v| (v, self.vertex(v)))
    }

    /// Iterate over all registered halfedges: edges, then non-edges, then
    /// unpaired.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.edge_set
            .iter()
            .chain(self.non_edge_set.iter())
            .chain(self.unpaired_set.iter())
    }

    /// Iterate over edges (canonical halfedges).
    pub fn edge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.edge_set.iter()
    }

    /// Iterate over paired, non-canonical halfedges.
    pub fn non_edge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.non_edge_set.iter()
    }

    /// Iterate over unpaired halfedges.
    pub fn unpaired_halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.unpaired_set.iter()
    }

    /// Iterate over registered faces.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.face_set.iter()
    }

    /// Iterate over registered faces with their records.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId<I>, &Face<I>)> + '_ {
        self.face_set.iter().map(move |f| (f, self.face(f)))
    }

    // ==================== Classification ====================

    /// Whether `he` is the canonical half of its edge.
    ///
    /// False without a face or without a pair. Otherwise true when the pair
    /// has no face, or when both have faces and `he` has the smaller key.
    pub fn is_edge(&self, he: HalfEdgeId<I>) -> bool {
        let rec = self.halfedge(he);
        if !rec.face.is_valid() || !rec.pair.is_valid() {
            return false;
        }
        let pair = self.halfedge(rec.pair);
        if !pair.face.is_valid() {
            return true;
        }
        rec.key() < pair.key()
    }

    /// The partition `he` belongs in given its current pointers.
    fn classify(&self, he: HalfEdgeId<I>) -> Bucket {
        if !self.halfedge(he).pair.is_valid() {
            Bucket::Unpaired
        } else if self.is_edge(he) {
            Bucket::Edge
        } else {
            Bucket::NonEdge
        }
    }

    /// Move a registered halfedge into the partition its pointers select.
    fn rebucket(&mut self, he: HalfEdgeId<I>) {
        let current = self.halfedge(he).bucket;
        if current == Bucket::Detached {
            return;
        }
        let wanted = self.classify(he);
        if wanted == current {
            return;
        }
        let key = self.halfedge(he).key();
        if let Some(set) = self.bucket_set_mut(current) {
            set.remove(key);
        }
        if let Some(set) = self.bucket_set_mut(wanted) {
            set.add(key, he);
        }
        self.halfedge_mut(he).bucket = wanted;
    }

    // ==================== Topology mutators ====================

    /// Pair two halfedges symmetrically.
    ///
    /// A previous mate of either halfedge that still points back at it is
    /// left unpaired, so pair symmetry holds afterwards. Both halfedges (and
    /// any released mate) are re-classified.
    pub fn set_pair(&mut self, a: HalfEdgeId<I>, b: HalfEdgeId<I>) {
        debug_assert!(a != b, "cannot pair {:?} with itself", a);
        for (he, mate) in [(a, b), (b, a)] {
            let old = self.halfedge(he).pair;
            if old.is_valid() && old != mate && self.halfedge(old).pair == he {
                self.halfedge_mut(old).pair = HalfEdgeId::invalid();
                self.rebucket(old);
            }
        }
        self.halfedge_mut(a).pair = b;
        self.halfedge_mut(b).pair = a;
        self.rebucket(a);
        self.rebucket(b);
    }

    /// Pair two halfedges, refusing if either is already paired elsewhere.
    pub fn try_set_pair(&mut self, a: HalfEdgeId<I>, b: HalfEdgeId<I>) -> Result<()> {
        if a == b {
            return Err(MeshError::invalid_state(format!(
                "cannot pair halfedge {} with itself",
                self.halfedge(a).key()
            )));
        }
        for (he, mate) in [(a, b), (b, a)] {
            let old = self.halfedge(he).pair;
            if old.is_valid() && old != mate {
                return Err(MeshError::AlreadyPaired {
                    he: self.halfedge(he).key(),
                    pair: self.halfedge(old).key(),
                });
            }
        }
        self.set_pair(a, b);
        Ok(())
    }

    /// Unpair `he` and its mate. Both move to the unpaired partition.
    pub fn clear_pair(&mut self, he: HalfEdgeId<I>) {
        let mate = self.halfedge(he).pair;
        if !mate.is_valid() {
            return;
        }
        self.halfedge_mut(he).pair = HalfEdgeId::invalid();
        if self.halfedge(mate).pair == he {
            self.halfedge_mut(mate).pair = HalfEdgeId::invalid();
        }
        self.rebucket(he);
        self.rebucket(mate);
    }

    /// Set `he.next = hen` and `hen.prev = he`.
    #[inline]
    pub fn set_next(&mut self, he: HalfEdgeId<I>, hen: HalfEdgeId<I>) {
        self.halfedge_mut(he).next = hen;
        self.halfedge_mut(hen).prev = he;
    }

    /// Unset `he.next`, and the back pointer if it still refers to `he`.
    pub fn clear_next(&mut self, he: HalfEdgeId<I>) {
        let hen = self.halfedge(he).next;
        if hen.is_valid() && self.halfedge(hen).prev == he {
            self.halfedge_mut(hen).prev = HalfEdgeId::invalid();
        }
        self.halfedge_mut(he).next = HalfEdgeId::invalid();
    }

    /// Unset `he.prev`, and the forward pointer if it still refers to `he`.
    pub fn clear_prev(&mut self, he: HalfEdgeId<I>) {
        let hep = self.halfedge(he).prev;
        if hep.is_valid() && self.halfedge(hep).next == he {
            self.halfedge_mut(hep).next = HalfEdgeId::invalid();
        }
        self.halfedge_mut(he).prev = HalfEdgeId::invalid();
    }

    /// Set the start vertex of a halfedge.
    #[inline]
    pub fn set_vertex(&mut self, he: HalfEdgeId<I>, v: VertexId<I>) {
        self.halfedge_mut(he).vertex = v;
    }

    /// Unset the start vertex of a halfedge.
    #[inline]
    pub fn clear_vertex(&mut self, he: HalfEdgeId<I>) {
        self.halfedge_mut(he).vertex = VertexId::invalid();
    }

    /// Set the face of a halfedge; re-classifies it and its pair.
    pub fn set_face(&mut self, he: HalfEdgeId<I>, f: FaceId<I>) {
        self.halfedge_mut(he).face = f;
        self.rebucket_with_pair(he);
    }

    /// Unset the face of a halfedge; re-classifies it and its pair.
    pub fn clear_face(&mut self, he: HalfEdgeId<I>) {
        self.halfedge_mut(he).face = FaceId::invalid();
        self.rebucket_with_pair(he);
    }

    fn rebucket_with_pair(&mut self, he: HalfEdgeId<I>) {
        self.rebucket(he);
        let pair = self.halfedge(he).pair;
        if pair.is_valid() {
            self.rebucket(pair);
        }
    }

    /// Set the representative outgoing halfedge of a vertex.
    #[inline]
    pub fn set_vertex_halfedge(&mut self, v: VertexId<I>, he: HalfEdgeId<I>) {
        self.vertex_mut(v).halfedge = he;
    }

    /// Unset the representative halfedge of a vertex.
    #[inline]
    pub fn clear_vertex_halfedge(&mut self, v: VertexId<I>) {
        self.vertex_mut(v).halfedge = HalfEdgeId::invalid();
    }

    /// Set the representative halfedge of a face.
    #[inline]
    pub fn set_face_halfedge(&mut self, f: FaceId<I>, he: HalfEdgeId<I>) {
        self.face_mut(f).halfedge = he;
    }

    /// Unset the representative halfedge of a face.
    #[inline]
    pub fn clear_face_halfedge(&mut self, f: FaceId<I>) {
        self.face_mut(f).halfedge = HalfEdgeId::invalid();
    }

    /// Link `hes` into a loop in list order: each halfedge's next is the
    /// following one, the last wraps to the first.
    pub fn cycle_halfedges(&mut self, hes: &[HalfEdgeId<I>]) {
        let n = hes.len();
        if n == 0 {
            return;
        }
        for j in 0..n {
            self.set_next(hes[j], hes[(j + 1) % n]);
        }
    }

    /// Link `hes` into a loop against list order: each halfedge's next is the
    /// preceding one, the first wraps to the last.
    pub fn cycle_halfedges_reverse(&mut self, hes: &[HalfEdgeId<I>]) {
        let n = hes.len();
        if n == 0 {
            return;
        }
        self.set_next(hes[0], hes[n - 1]);
        for j in 1..n {
            self.set_next(hes[j], hes[j - 1]);
        }
    }

    /// Set the face of every halfedge in the loop starting at `start`.
    pub fn assign_face_to_loop(&mut self, f: FaceId<I>, start: HalfEdgeId<I>) {
        let limit = self.halfedges.len();
        let mut he = start;
        for _ in 0..limit {
            self.set_face(he, f);
            he = self.halfedge(he).next;
            if he == start || !he.is_valid() {
                break;
            }
        }
    }

    /// Copy labels, color and texture coordinate from one halfedge to another.
    pub fn copy_halfedge_properties(&mut self, dst: HalfEdgeId<I>, src: HalfEdgeId<I>) {
        let src = self.halfedge(src).clone();
        self.halfedge_mut(dst).copy_properties(&src);
    }

    /// Copy labels, color and texture id from one face to another.
    pub fn copy_face_properties(&mut self, dst: FaceId<I>, src: FaceId<I>) {
        let src = self.face(src).clone();
        self.face_mut(dst).copy_properties(&src);
    }

    /// Copy labels, color and texture coordinate from one vertex to another.
    pub fn copy_vertex_properties(&mut self, dst: VertexId<I>, src: VertexId<I>) {
        let src = self.vertex(src).clone();
        self.vertex_mut(dst).copy_properties(&src);
    }

    // ==================== Validation ====================

    /// Check every structural invariant.
    ///
    /// - each registered halfedge sits in exactly the partition its pointers
    ///   select
    /// - pairs are symmetric and `next`/`prev` agree
    /// - a vertex's halfedge starts at that vertex
    /// - a face's halfedge belongs to the face and its loop closes with every
    ///   member on the same face
    pub fn validate(&self) -> Result<()> {
        for bucket in [Bucket::Edge, Bucket::NonEdge, Bucket::Unpaired] {
            let Some(set) = self.bucket_set(bucket) else {
                continue;
            };
            for he in set.iter() {
                let tagged = self.halfedge(he).bucket;
                if tagged != bucket {
                    return Err(MeshError::invalid_state(format!(
                        "{:?} is stored as {:?} but tagged {:?}",
                        he, bucket, tagged
                    )));
                }
                let wanted = self.classify(he);
                if wanted != bucket {
                    return Err(MeshError::invalid_state(format!(
                        "{:?} is stored as {:?} but classifies as {:?}",
                        he, bucket, wanted
                    )));
                }
            }
        }

        for he in self.halfedge_ids() {
            let rec = self.halfedge(he);
            if rec.pair.is_valid() && self.halfedge(rec.pair).pair != he {
                return Err(MeshError::invalid_state(format!(
                    "pair of {:?} is {:?}, which pairs with {:?}",
                    he,
                    rec.pair,
                    self.halfedge(rec.pair).pair
                )));
            }
            if rec.next.is_valid() && self.halfedge(rec.next).prev != he {
                return Err(MeshError::invalid_state(format!(
                    "next of {:?} is {:?}, whose prev is {:?}",
                    he,
                    rec.next,
                    self.halfedge(rec.next).prev
                )));
            }
            if !rec.vertex.is_valid() {
                return Err(MeshError::invalid_state(format!("{:?} has no vertex", he)));
            }
        }

        for (v, rec) in self.vertices() {
            if rec.halfedge.is_valid() && self.halfedge(rec.halfedge).vertex != v {
                return Err(MeshError::invalid_state(format!(
                    "halfedge {:?} of {:?} starts at {:?}",
                    rec.halfedge,
                    v,
                    self.halfedge(rec.halfedge).vertex
                )));
            }
        }

        let limit = self.halfedges.len();
        for (f, rec) in self.faces() {
            let start = rec.halfedge;
            if !start.is_valid() {
                return Err(MeshError::invalid_state(format!("{:?} has no halfedge", f)));
            }
            let mut he = start;
            let mut closed = false;
            for _ in 0..=limit {
                if self.halfedge(he).face != f {
                    return Err(MeshError::invalid_state(format!(
                        "{:?} in the loop of {:?} belongs to {:?}",
                        he,
                        f,
                        self.halfedge(he).face
                    )));
                }
                he = self.halfedge(he).next;
                if !he.is_valid() {
                    break;
                }
                if he == start {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(MeshError::invalid_state(format!(
                    "loop of {:?} does not close",
                    f
                )));
            }
        }

        Ok(())
    }

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// `V - E + F`.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A lone triangle with no pairs: three unpaired halfedges.
    fn bare_triangle() -> (HalfEdgeMesh, [HalfEdgeId; 3], FaceId) {
        let mut mesh = HalfEdgeMesh::new();
        let v = [
            mesh.insert_vertex(Point3::new(0.0, 0.0, 0.0)),
            mesh.insert_vertex(Point3::new(1.0, 0.0, 0.0)),
            mesh.insert_vertex(Point3::new(0.0, 1.0, 0.0)),
        ];
        let f = mesh.create_face();
        let hes = [mesh.create_halfedge(), mesh.create_halfedge(), mesh.create_halfedge()];
        for i in 0..3 {
            mesh.set_vertex(hes[i], v[i]);
            mesh.set_vertex_halfedge(v[i], hes[i]);
            mesh.set_face(hes[i], f);
        }
        mesh.cycle_halfedges(&hes);
        mesh.set_face_halfedge(f, hes[0]);
        mesh.add_face(f);
        mesh.add_halfedges(&hes);
        (mesh, hes, f)
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_detached_until_added() {
        let mut mesh = HalfEdgeMesh::<u32>::new();
        let v = mesh.create_vertex(Point3::new(1.0, 2.0, 3.0));
        assert!(!mesh.contains_vertex(v));
        assert_eq!(mesh.num_vertices(), 0);

        mesh.add_vertex(v);
        mesh.add_vertex(v);
        assert!(mesh.contains_vertex(v));
        assert_eq!(mesh.num_vertices(), 1);
        assert_eq!(mesh.vertex_with_key(mesh.vertex(v).key()), Some(v));
        assert_eq!(mesh.vertex(v).label(), -1);
        assert_eq!(mesh.vertex(v).temporary_label(), -1);
    }

    #[test]
    fn test_keys_unique_across_kinds() {
        let mut mesh = HalfEdgeMesh::<u32>::new();
        let v = mesh.create_vertex(Point3::origin());
        let he = mesh.create_halfedge();
        let f = mesh.create_face();
        let keys = [mesh.vertex(v).key(), mesh.halfedge(he).key(), mesh.face(f).key()];
        assert_eq!(keys, [0, 1, 2]);
    }

    #[test]
    fn test_unpaired_partition() {
        let (mesh, hes, _) = bare_triangle();
        assert_eq!(mesh.num_halfedges(), 3);
        assert_eq!(mesh.num_unpaired_halfedges(), 3);
        assert_eq!(mesh.num_edges(), 0);
        for he in hes {
            assert_eq!(mesh.halfedge(he).bucket(), Bucket::Unpaired);
        }
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_set_pair_rebuckets() {
        let (mut mesh, hes, _) = bare_triangle();
        let cap = mesh.create_halfedge();
        mesh.set_vertex(cap, mesh.halfedge(hes[1]).vertex());
        mesh.add_halfedge(cap);
        assert_eq!(mesh.halfedge(cap).bucket(), Bucket::Unpaired);

        mesh.set_pair(hes[0], cap);
        // the faced half wins over the face-less one
        assert_eq!(mesh.halfedge(hes[0]).bucket(), Bucket::Edge);
        assert_eq!(mesh.halfedge(cap).bucket(), Bucket::NonEdge);
        assert_eq!(mesh.num_unpaired_halfedges(), 2);
        assert_eq!(mesh.num_edges(), 1);

        mesh.clear_pair(cap);
        assert_eq!(mesh.halfedge(hes[0]).bucket(), Bucket::Unpaired);
        assert_eq!(mesh.halfedge(cap).bucket(), Bucket::Unpaired);
        assert_eq!(mesh.num_unpaired_halfedges(), 4);
    }

    #[test]
    fn test_lower_key_is_canonical() {
        let (mut mesh, hes, _) = bare_triangle();
        let f2 = mesh.create_face();
        let other = mesh.create_halfedge();
        mesh.set_face(other, f2);
        mesh.add_halfedge(other);

        mesh.set_pair(other, hes[2]);
        assert!(mesh.halfedge(hes[2]).key() < mesh.halfedge(other).key());
        assert_eq!(mesh.halfedge(hes[2]).bucket(), Bucket::Edge);
        assert_eq!(mesh.halfedge(other).bucket(), Bucket::NonEdge);

        // losing its face hands canonicity to the mate
        mesh.clear_face(hes[2]);
        assert_eq!(mesh.halfedge(hes[2]).bucket(), Bucket::NonEdge);
        assert_eq!(mesh.halfedge(other).bucket(), Bucket::Edge);
    }

    #[test]
    fn test_repair_releases_old_mate() {
        let (mut mesh, hes, _) = bare_triangle();
        mesh.set_pair(hes[0], hes[1]);
        mesh.set_pair(hes[0], hes[2]);
        assert_eq!(mesh.halfedge(hes[1]).pair(), HalfEdgeId::invalid());
        assert_eq!(mesh.halfedge(hes[1]).bucket(), Bucket::Unpaired);
        assert!(mesh.try_set_pair(hes[1], hes[2]).is_err());
        assert!(mesh.try_set_pair(hes[0], hes[2]).is_ok());
    }

    #[test]
    fn test_remove_keeps_record() {
        let (mut mesh, hes, f) = bare_triangle();
        mesh.remove_halfedge(hes[1]);
        assert!(!mesh.contains_halfedge(hes[1]));
        assert_eq!(mesh.num_halfedges(), 2);
        // pointers of the removed record are untouched
        assert_eq!(mesh.halfedge(hes[1]).face(), f);
        assert_eq!(mesh.halfedge(hes[1]).bucket(), Bucket::Detached);
    }

    #[test]
    fn test_cycle_reverse() {
        let mut mesh = HalfEdgeMesh::<u32>::new();
        let hes: Vec<_> = (0..4).map(|_| mesh.create_halfedge()).collect();
        mesh.cycle_halfedges_reverse(&hes);
        assert_eq!(mesh.halfedge(hes[0]).next(), hes[3]);
        assert_eq!(mesh.halfedge(hes[3]).next(), hes[2]);
        assert_eq!(mesh.halfedge(hes[1]).next(), hes[0]);
        assert_eq!(mesh.halfedge(hes[3]).prev(), hes[0]);
    }

    #[test]
    fn test_validate_reports_broken_loop() {
        let (mut mesh, hes, _) = bare_triangle();
        mesh.clear_next(hes[2]);
        let err = mesh.validate().unwrap_err();
        assert!(err.to_string().contains("does not close"));
    }
}
