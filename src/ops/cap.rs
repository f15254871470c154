//! Boundary capping.
//!
//! [`cap_halfedges`](HalfEdgeMesh::cap_halfedges) gives every unpaired
//! halfedge a face-less partner and links the partners into loops, so the
//! mesh ends up with no unpaired halfedges. [`cap_holes`](HalfEdgeMesh::cap_holes)
//! goes one step further and closes every boundary loop with a new face.

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex};

/// Options for [`HalfEdgeMesh::cap_holes`].
#[derive(Debug, Clone, Default)]
pub struct CapOptions {
    /// Upper bound on loop walks, counting retries. `None` picks a bound from
    /// the number of boundary halfedges.
    pub max_iterations: Option<usize>,
}

impl CapOptions {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loop walk bound.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }
}

/// How a walk along unpaired halfedges ended.
enum LoopWalk<I: MeshIndex> {
    /// Came back to the start vertex.
    Closed(Vec<HalfEdgeId<I>>),
    /// Ran out of continuations: an open polyline.
    Open(Vec<HalfEdgeId<I>>),
    /// Reached a halfedge already on the walk before closing.
    Branched,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Pair every unpaired halfedge with a new face-less halfedge running the
    /// other way, then link the new halfedges into loops.
    ///
    /// Returns the new halfedges in the order of the halfedges they cap.
    pub fn cap_halfedges(&mut self) -> Vec<HalfEdgeId<I>> {
        let unpaired = self.unpaired_set.to_vec();
        debug!("capping {} unpaired halfedges", unpaired.len());

        let mut caps: Vec<HalfEdgeId<I>> = Vec::with_capacity(unpaired.len());
        let mut skipped = 0usize;
        for &he in &unpaired {
            let end = self.dest(he);
            if !end.is_valid() {
                skipped += 1;
                continue;
            }
            let cap = self.create_halfedge();
            self.set_vertex(cap, end);
            self.set_pair(he, cap);
            self.add_halfedge(cap);
            caps.push(cap);
        }
        if skipped > 0 {
            warn!("left {} halfedges without a loop uncapped", skipped);
        }

        // A cap from w to v continues with the first unused cap leaving v.
        let mut used = vec![false; caps.len()];
        for i in 0..caps.len() {
            let cap = caps[i];
            if self.next(cap).is_valid() {
                continue;
            }
            let target = self.origin(self.pair(cap));
            let found = (0..caps.len()).find(|&j| !used[j] && self.origin(caps[j]) == target);
            if let Some(j) = found {
                self.set_next(cap, caps[j]);
                used[j] = true;
            }
        }

        debug!("capped {} halfedges", caps.len());
        caps
    }

    /// Remove every face-less halfedge.
    ///
    /// Each removed halfedge is unpaired first, and its start vertex is moved
    /// to the next outgoing halfedge so it stays attached to the faced part.
    pub fn uncap_boundary_halfedges(&mut self) -> usize {
        let boundary = self.boundary_halfedges();
        for &he in &boundary {
            let v = self.origin(he);
            let successor = self.next_in_vertex(he);
            if v.is_valid() && successor.is_valid() {
                self.set_vertex_halfedge(v, successor);
            }
            self.clear_pair(he);
            self.remove_halfedge(he);
        }
        debug!("removed {} boundary halfedges", boundary.len());
        boundary.len()
    }

    /// Close every boundary loop with a new face.
    ///
    /// Existing caps are removed first. Each closed loop of unpaired halfedges
    /// then gets one face bounded by new halfedges that pair with the loop and
    /// run the opposite way. An open chain gets its partner halfedges linked
    /// in order but no face. Returns the new faces.
    ///
    /// # Errors
    /// `max_iterations` of zero is rejected.
    pub fn cap_holes(&mut self, options: &CapOptions) -> Result<Vec<FaceId<I>>> {
        if options.max_iterations == Some(0) {
            return Err(MeshError::invalid_param(
                "max_iterations",
                0,
                "must be at least 1",
            ));
        }

        self.uncap_boundary_halfedges();

        let mut pending: Vec<HalfEdgeId<I>> = self
            .unpaired_set
            .iter()
            .filter(|&he| self.next(he).is_valid())
            .collect();
        let limit = options
            .max_iterations
            .unwrap_or(2 * pending.len() + 16);
        debug!("capping holes bounded by {} unpaired halfedges", pending.len());

        let mut faces: Vec<FaceId<I>> = Vec::new();
        let mut iterations = 0usize;

        while !pending.is_empty() {
            if iterations >= limit {
                warn!(
                    "stopped capping after {} walks, {} halfedges left open",
                    iterations,
                    pending.len()
                );
                break;
            }
            iterations += 1;

            match self.walk_unpaired_loop(&pending) {
                LoopWalk::Closed(hes) => {
                    trace!("closing loop of {} halfedges", hes.len());
                    remove_all(&mut pending, &hes);
                    let f = self.close_loop(&hes);
                    faces.push(f);
                }
                LoopWalk::Open(hes) => {
                    warn!("boundary of {} halfedges does not close", hes.len());
                    remove_all(&mut pending, &hes);
                    self.cap_polyline(&hes);
                }
                LoopWalk::Branched => {
                    trace!("loop from {:?} branches, dropping its start", pending[0]);
                    pending.remove(0);
                }
            }
        }

        self.pair_halfedges();
        debug!("capped {} holes", faces.len());
        Ok(faces)
    }

    /// Follow unpaired halfedges from `pending[0]` until the walk returns to
    /// its start vertex, runs out of continuations or repeats a halfedge.
    fn walk_unpaired_loop(&self, pending: &[HalfEdgeId<I>]) -> LoopWalk<I> {
        let start = pending[0];
        let home = self.origin(start);
        let mut hes = vec![start];
        let mut seen: HashSet<HalfEdgeId<I>> = HashSet::new();
        seen.insert(start);

        let mut he = start;
        loop {
            let end = self.dest(he);
            if end == home {
                return LoopWalk::Closed(hes);
            }
            let Some(hen) = pending.iter().copied().find(|&c| self.origin(c) == end) else {
                return LoopWalk::Open(hes);
            };
            if !seen.insert(hen) {
                return LoopWalk::Branched;
            }
            hes.push(hen);
            he = hen;
        }
    }

    /// New face with reversed halfedges pairing the loop `hes`.
    fn close_loop(&mut self, hes: &[HalfEdgeId<I>]) -> FaceId<I> {
        let f = self.create_face();
        self.add_face(f);
        let caps = self.partner_halfedges(hes);
        for &cap in &caps {
            self.set_face(cap, f);
        }
        self.set_face_halfedge(f, caps[0]);
        self.cycle_halfedges_reverse(&caps);
        f
    }

    /// Face-less reversed partners for an open chain, linked but not cycled.
    fn cap_polyline(&mut self, hes: &[HalfEdgeId<I>]) {
        let caps = self.partner_halfedges(hes);
        for j in 1..caps.len() {
            self.set_next(caps[j], caps[j - 1]);
        }
    }

    fn partner_halfedges(&mut self, hes: &[HalfEdgeId<I>]) -> Vec<HalfEdgeId<I>> {
        let mut caps = Vec::with_capacity(hes.len());
        for &he in hes {
            let cap = self.create_halfedge();
            let end = self.dest(he);
            self.set_vertex(cap, end);
            self.set_pair(cap, he);
            self.add_halfedge(cap);
            caps.push(cap);
        }
        caps
    }

    /// Give the face-less loop through `he` a new face.
    ///
    /// Returns `None` if `he` already has a face, is not registered, or its
    /// loop does not close.
    pub fn create_face_from_halfedge_loop(&mut self, he: HalfEdgeId<I>) -> Option<FaceId<I>> {
        if !self.contains_halfedge(he) || self.face_of(he).is_valid() {
            return None;
        }
        let hes: Vec<HalfEdgeId<I>> = self.loop_halfedges(he).collect();
        let last = *hes.last()?;
        if self.next(last) != he {
            return None;
        }
        let f = self.create_face();
        self.set_face_halfedge(f, he);
        for &h in &hes {
            self.set_face(h, f);
        }
        self.add_face(f);
        Some(f)
    }

    /// [`create_face_from_halfedge_loop`](Self::create_face_from_halfedge_loop)
    /// for several loops; halfedges on a loop that was already filled are
    /// skipped.
    pub fn create_faces_from_halfedge_loops(&mut self, hes: &[HalfEdgeId<I>]) -> Vec<FaceId<I>> {
        hes.iter()
            .filter_map(|&he| self.create_face_from_halfedge_loop(he))
            .collect()
    }
}

fn remove_all<T: PartialEq>(list: &mut Vec<T>, gone: &[T]) {
    list.retain(|x| !gone.contains(x));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_facelist, build_from_quads, FacelistOptions};
    use nalgebra::Point3;

    /// 3x1 strip of quads sharing their inner edges.
    fn quad_strip() -> HalfEdgeMesh {
        let mut vertices = Vec::new();
        for x in 0..4 {
            vertices.push(Point3::new(x as f64, 0.0, 0.0));
            vertices.push(Point3::new(x as f64, 1.0, 0.0));
        }
        let faces: Vec<[usize; 4]> = (0..3)
            .map(|i| [2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1])
            .collect();
        build_from_quads(&vertices, &faces).unwrap()
    }

    /// Two separate triangles: two boundary loops.
    fn two_islands() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let options = FacelistOptions::new().with_cap(false);
        build_from_facelist(&vertices, &[[0, 1, 2], [3, 4, 5]], &options).unwrap()
    }

    #[test]
    fn test_cap_every_loop() {
        let mut mesh = two_islands();
        assert_eq!(mesh.num_unpaired_halfedges(), 6);

        let caps = mesh.cap_halfedges();
        assert_eq!(caps.len(), 6);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert!(mesh.is_valid());

        for &cap in &caps {
            assert!(mesh.is_outer_boundary(cap));
            assert_eq!(mesh.loop_halfedges(cap).count(), 3);
            assert_eq!(mesh.next(mesh.next(mesh.next(cap))), cap);
        }
    }

    #[test]
    fn test_uncap_restores_unpaired() {
        let mut mesh = quad_strip();
        assert_eq!(mesh.num_halfedges(), 20);

        assert_eq!(mesh.uncap_boundary_halfedges(), 8);
        assert_eq!(mesh.num_halfedges(), 12);
        assert_eq!(mesh.num_unpaired_halfedges(), 8);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(mesh.face_of(mesh.vertex(v).halfedge()).is_valid());
        }
    }

    #[test]
    fn test_cap_holes_closes_strip() {
        let mut mesh = quad_strip();
        let faces = mesh.cap_holes(&CapOptions::default()).unwrap();

        assert_eq!(faces.len(), 1);
        assert_eq!(mesh.face_order(faces[0]), 8);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert_eq!(mesh.num_halfedges(), 20);
        // a disc glued to a disc
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.is_valid());

        // the new face faces the other way
        let n = mesh.face_normal(faces[0]);
        assert!((n.z + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cap_holes_two_loops() {
        let mut mesh = two_islands();
        let faces = mesh.cap_holes(&CapOptions::default()).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_open_chain_gets_no_face() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let options = FacelistOptions::new().with_cap(false);
        let mut mesh: HalfEdgeMesh = build_from_facelist(&vertices, &[[0, 1, 2]], &options).unwrap();
        // drop one side so the boundary is a two-halfedge chain
        let v2 = mesh.vertex_at(2).unwrap();
        let gap = mesh.search_halfedge(v2, mesh.vertex_at(0).unwrap()).unwrap();
        mesh.remove_halfedge(gap);
        let before = mesh.num_halfedges();

        let faces = mesh.cap_holes(&CapOptions::new().with_max_iterations(64)).unwrap();
        assert!(faces.is_empty());
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
        assert_eq!(mesh.num_halfedges(), before + 2);
        assert_eq!(mesh.boundary_halfedges().len(), 2);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut mesh = quad_strip();
        let options = CapOptions::new().with_max_iterations(0);
        assert!(mesh.cap_holes(&options).is_err());
    }

    #[test]
    fn test_face_from_cap_loop() {
        let mut mesh = two_islands();
        let caps = mesh.cap_halfedges();
        let f = mesh.create_face_from_halfedge_loop(caps[0]).unwrap();
        assert_eq!(mesh.face_order(f), 3);
        assert!(mesh.create_face_from_halfedge_loop(caps[0]).is_none());

        let filled = mesh.create_faces_from_halfedge_loops(&caps);
        assert_eq!(filled.len(), 1);
        assert_eq!(mesh.num_faces(), 4);
        assert!(mesh.boundary_halfedges().is_empty());
        assert!(mesh.is_valid());
    }
}
