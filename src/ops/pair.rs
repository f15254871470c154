//! Halfedge pairing.
//!
//! Unpaired halfedges are grouped per vertex into an outgoing list (the
//! halfedge starts there) and an incoming list (it ends there). Each outgoing
//! halfedge is then matched against the incoming list of the same vertex for
//! one running the opposite way between the same two vertices.
//!
//! Matching is first-found-wins: vertices are visited in the order they were
//! first seen while walking the unpaired set, and each list keeps unpaired-set
//! order. On input with duplicate directed edges the result therefore depends on
//! that order. Duplicates that stay unmatched are reported, never paired.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

struct VertexLists<I: MeshIndex> {
    outgoing: Vec<HalfEdgeId<I>>,
    incoming: Vec<HalfEdgeId<I>>,
}

impl<I: MeshIndex> VertexLists<I> {
    fn new() -> Self {
        Self {
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Pair every unpaired halfedge that has an oppositely directed partner.
    ///
    /// Returns the mismatched pairs: unpaired halfedges that share both start
    /// and end vertex with another unpaired halfedge, so they would pair with
    /// the same partner. They are left unpaired.
    ///
    /// # Example
    /// ```
    /// use hemesh::mesh::{build_from_facelist, FacelistOptions, HalfEdgeMesh};
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    /// ];
    /// let faces = vec![[0, 1, 2], [1, 3, 2]];
    /// let options = FacelistOptions::new().with_cap(false);
    ///
    /// let mut mesh: HalfEdgeMesh = build_from_facelist(&vertices, &faces, &options).unwrap();
    /// // the builder already paired the shared diagonal
    /// assert_eq!(mesh.num_unpaired_halfedges(), 4);
    /// assert!(mesh.pair_halfedges().is_empty());
    /// ```
    pub fn pair_halfedges(&mut self) -> Vec<(HalfEdgeId<I>, HalfEdgeId<I>)> {
        let unpaired = self.unpaired_set.to_vec();
        self.pair_halfedges_in(&unpaired)
    }

    /// Pair halfedges from `candidates` with each other.
    ///
    /// Candidates that are already paired, or whose `next` is unset, are
    /// ignored.
    pub fn pair_halfedges_in(
        &mut self,
        candidates: &[HalfEdgeId<I>],
    ) -> Vec<(HalfEdgeId<I>, HalfEdgeId<I>)> {
        debug!("pairing {} unpaired halfedges", candidates.len());

        let mut order: Vec<VertexId<I>> = Vec::new();
        let mut lists: HashMap<VertexId<I>, VertexLists<I>> = HashMap::new();
        let mut skipped = 0usize;

        for &he in candidates {
            if self.pair(he).is_valid() {
                continue;
            }
            let start = self.origin(he);
            let end = self.dest(he);
            if !start.is_valid() || !end.is_valid() {
                skipped += 1;
                continue;
            }
            lists
                .entry(start)
                .or_insert_with(|| {
                    order.push(start);
                    VertexLists::new()
                })
                .outgoing
                .push(he);
            lists
                .entry(end)
                .or_insert_with(|| {
                    order.push(end);
                    VertexLists::new()
                })
                .incoming
                .push(he);
        }
        if skipped > 0 {
            debug!("skipped {} halfedges without a loop", skipped);
        }

        let mut paired = 0usize;
        let mut mismatched: Vec<(HalfEdgeId<I>, HalfEdgeId<I>)> = Vec::new();
        let mut reported: HashSet<(HalfEdgeId<I>, HalfEdgeId<I>)> = HashSet::new();

        for v in order {
            let Some(vl) = lists.get(&v) else {
                continue;
            };
            for &he in &vl.outgoing {
                if self.pair(he).is_valid() {
                    continue;
                }
                let he_end = self.dest(he);

                let partner = vl.incoming.iter().copied().find(|&he2| {
                    !self.pair(he2).is_valid()
                        && self.origin(he) == self.dest(he2)
                        && self.origin(he2) == he_end
                });
                if let Some(he2) = partner {
                    self.set_pair(he, he2);
                    paired += 1;
                    continue;
                }

                let twin = vl.outgoing.iter().copied().find(|&he2| {
                    he2 != he && !self.pair(he2).is_valid() && self.dest(he2) == he_end
                });
                if let Some(he2) = twin {
                    let key = if he < he2 { (he, he2) } else { (he2, he) };
                    if reported.insert(key) {
                        mismatched.push(key);
                    }
                }
            }
        }

        debug!("paired {} halfedge pairs", paired);
        if !mismatched.is_empty() {
            warn!(
                "{} pair(s) of identical directed halfedges left unpaired",
                mismatched.len()
            );
        }
        mismatched
    }
}
