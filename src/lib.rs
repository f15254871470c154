//! # hemesh
//!
//! A half-edge kernel for polygon meshes with boundaries.
//!
//! The mesh keeps every halfedge in one of three partitions (edges, non-edge
//! halves, unpaired) and keeps those partitions current through its
//! mutators. On top of that sit the primitives that every higher-level
//! modifier is built from:
//!
//! - **Pairing**: match loose directed halfedges into edges
//! - **Capping**: close boundaries with face-less halfedges, or fill holes
//! - **Split and collapse**: insert vertices into edges, cut faces, merge edges
//! - **Selections**: id sets over one mesh with grow/shrink and set algebra
//! - **Triangulation**: parallel ear clipping of every polygon
//!
//! ## Quick Start
//!
//! ```no_run
//! use hemesh::prelude::*;
//!
//! let mut mesh: HalfEdgeMesh = hemesh::io::load("model.obj").unwrap();
//! println!("Vertices: {}", mesh.num_vertices());
//! println!("Holes capped: {}", mesh.cap_holes(&CapOptions::default()).unwrap().len());
//! hemesh::io::save(&mesh, "closed.ply").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use hemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(2.0, 0.5, 0.0),
//! ];
//! // a quad and a triangle sharing the edge 1-2
//! let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
//!
//! let mesh: HalfEdgeMesh =
//!     build_from_facelist(&vertices, &faces, &FacelistOptions::default()).unwrap();
//! assert_eq!(mesh.num_faces(), 2);
//! assert_eq!(mesh.num_edges(), 6);
//! // the open border is capped with face-less halfedges
//! assert_eq!(mesh.num_unpaired_halfedges(), 0);
//! assert_eq!(mesh.boundary_halfedges().len(), 5);
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use hemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! # ];
//! # let faces = vec![[0, 1, 2]];
//! # let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! let v = mesh.vertex_at(0).unwrap();
//! for neighbor in mesh.vertex_neighbors(v) {
//!     println!("Neighbor: {:?}", neighbor);
//! }
//!
//! let f = mesh.face_at(0).unwrap();
//! for he in mesh.face_halfedges(f) {
//!     println!("{:?} -> {:?}", mesh.origin(he), mesh.dest(he));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod ops;

/// Prelude module for convenient imports.
///
/// ```
/// use hemesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_facelist, build_from_quads, build_from_triangles, to_facelist, Element,
        Face, FaceId, FacelistOptions, HalfEdge, HalfEdgeId, HalfEdgeMesh, MeshIndex,
        Selection, Vertex, VertexId,
    };
    pub use crate::ops::CapOptions;
}

pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::algo::{triangulate, TriangulateOptions};
    use super::ops::{collapse_edge, split_edge_midpoint};
    use super::prelude::*;
    use nalgebra::Point3;

    fn tetrahedron() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_tetrahedron() {
        let mut mesh = tetrahedron();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_halfedges(), 12);
        assert_eq!(mesh.num_edges(), 6);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v));
            assert_eq!(mesh.valence(v), 3);
        }

        let e = mesh.edge_at(0).unwrap();
        let a = mesh.origin(e);
        let created = split_edge_midpoint(&mut mesh, e).unwrap();
        let m = created.vertex_ids().next().unwrap();
        assert_eq!(created.num_vertices(), 1);
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_halfedges(), 14);
        assert_eq!(mesh.euler_characteristic(), 2);

        let triangles = triangulate(&mut mesh, &TriangulateOptions::default());
        assert_eq!(triangles.num_faces(), 6);
        assert_eq!(mesh.num_halfedges(), 18);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.is_valid());

        // undo the split: a and m have exactly two common neighbours
        let e = mesh.search_halfedge(a, m).unwrap();
        assert!(collapse_edge(&mut mesh, e));
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.is_valid());
    }
}
