//! Topology-changing operations on a [`HalfEdgeMesh`](crate::mesh::HalfEdgeMesh).
//!
//! - **Pairing**: match unpaired halfedges into edges
//! - **Capping**: close boundary loops with face-less halfedges or new faces
//! - **Splitting**: insert vertices into edges, cut faces between two corners
//! - **Collapsing**: merge the ends of an edge
//! - **Fixing**: two-sided faces, valence-two vertices, edge flips, cleanup
//!
//! Pairing and capping are methods on the mesh, since the builder runs them
//! on every new mesh. The rest are free functions taking the mesh mutably.

pub mod cap;
pub mod collapse;
pub mod fixer;
pub mod pair;
pub mod split;

pub use cap::CapOptions;
pub use collapse::{
    collapse_degenerate_edges, collapse_edge, collapse_edge_boundary_preserving,
    collapse_halfedge, collapse_halfedge_boundary_preserving,
};
pub use fixer::{
    clean_unused_elements_by_face, delete_faces, delete_two_edge_face, delete_two_edge_faces,
    delete_two_edge_vertex, flip_edge,
};
pub use split::{
    divide_edge, split_edge, split_edge_at, split_edge_fractions, split_edge_midpoint,
    split_edges, split_edges_in, split_face,
};
