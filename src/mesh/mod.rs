//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation of polygon meshes
//! and the read-only query surface over it.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`]. Faces may have any number of sides,
//! boundaries are allowed, and every halfedge is kept in one of three
//! partitions (edge, non-edge, unpaired) by the mutators that change its pair
//! or face. See the [`halfedge`] module docs for the layout.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe handles:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a halfedge
//! - [`FaceId`] - Identifies a face
//!
//! An edge is named by its canonical halfedge. Handles are generic over the
//! underlying integer type ([`MeshIndex`] trait), allowing you to choose `u16`,
//! `u32`, or `u64` based on mesh size.
//!
//! Each element also carries a key (unique within its mesh) and two labels; see
//! [`Element`].
//!
//! # Construction
//!
//! Meshes are typically constructed from file I/O or from face-vertex lists:
//!
//! ```
//! use hemesh::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_unpaired_halfedges(), 0);
//! ```

mod builder;
mod element;
pub mod halfedge;
mod index;
mod query;
mod ras;
mod selection;

pub use builder::{
    build_from_facelist, build_from_facelist_with_uvw, build_from_quads, build_from_triangles,
    to_facelist, FacelistOptions,
};
pub use element::{Element, ElementData, KeyAllocator, Labels, TexCoord};
pub use halfedge::{Bucket, Face, HalfEdge, HalfEdgeMesh, Vertex, NO_COLOR};
pub use index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use query::{HalfEdgeLoopIter, VertexHalfEdgeIter};
pub use ras::Ras;
pub use selection::Selection;

/// Distance below which two points are considered coincident.
pub const EPSILON: f64 = 1e-6;

/// [`EPSILON`] squared, for comparisons against squared distances.
pub const SQ_EPSILON: f64 = EPSILON * EPSILON;
