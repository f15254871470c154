//! Element identity: keys, labels and the traversal flag.
//!
//! Every vertex, halfedge and face carries an [`ElementData`] block. The key is
//! handed out by the owning mesh's [`KeyAllocator`] when the element is created
//! and is what equality of elements means across copies and selections. Keys are
//! sequential within one mesh and never reused.
//!
//! Two independent `i32` labels are packed into one `u64` word ([`Labels`]):
//! the persistent *label*, meant for user data, and the scratch *temporary
//! label*, which algorithms use to tag the elements they create (split
//! operations set it to 1 on new vertices and edges, the facelist builder sets
//! it to the input index). Both start at [`Labels::UNSET`].

use std::hash::{Hash, Hasher};

use nalgebra::Vector3;

/// Per-corner or per-vertex texture coordinate (u, v, w).
pub type TexCoord = Vector3<f64>;

/// Issues sequential element keys for one mesh.
#[derive(Debug, Clone, Default)]
pub struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    /// Allocator whose first key is 0.
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocator whose first key is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Hand out the next key.
    #[inline]
    pub fn next_key(&mut self) -> u64 {
        let key = self.next;
        self.next += 1;
        key
    }

    /// The key the next call to [`next_key`](Self::next_key) will return.
    #[inline]
    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// Two `i32` labels packed into one word: label in the high half, temporary
/// label in the low half.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Labels(u64);

impl Labels {
    /// Value of a label that was never set.
    pub const UNSET: i32 = -1;

    /// Both labels unset.
    pub const fn new() -> Self {
        Self::pack(Self::UNSET, Self::UNSET)
    }

    #[inline]
    const fn pack(label: i32, temporary: i32) -> Self {
        Self(((label as u32 as u64) << 32) | (temporary as u32 as u64))
    }

    /// The persistent label.
    #[inline]
    pub fn label(self) -> i32 {
        (self.0 >> 32) as u32 as i32
    }

    /// The scratch label.
    #[inline]
    pub fn temporary_label(self) -> i32 {
        self.0 as u32 as i32
    }

    /// Replace the persistent label, keeping the scratch label.
    #[inline]
    pub fn set_label(&mut self, label: i32) {
        *self = Self::pack(label, self.temporary_label());
    }

    /// Replace the scratch label, keeping the persistent label.
    #[inline]
    pub fn set_temporary_label(&mut self, temporary: i32) {
        *self = Self::pack(self.label(), temporary);
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Labels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Labels")
            .field("label", &self.label())
            .field("temporary", &self.temporary_label())
            .finish()
    }
}

/// Identity block shared by all element kinds.
///
/// Two blocks are equal when their keys are; labels and the visited flag are
/// ignored.
#[derive(Debug, Clone)]
pub struct ElementData {
    key: u64,
    labels: Labels,
    visited: bool,
}

impl ElementData {
    /// Fresh identity with the given key, unset labels and not visited.
    pub fn new(key: u64) -> Self {
        Self {
            key,
            labels: Labels::new(),
            visited: false,
        }
    }

    /// Copy labels and the visited flag from `other`. The key is kept.
    pub fn copy_from(&mut self, other: &ElementData) {
        self.labels = other.labels;
        self.visited = other.visited;
    }
}

impl PartialEq for ElementData {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ElementData {}

impl Hash for ElementData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Access to the identity block of a mesh element.
///
/// Implemented by [`Vertex`](super::Vertex), [`HalfEdge`](super::HalfEdge) and
/// [`Face`](super::Face); everything except `data`/`data_mut` has a default.
pub trait Element {
    /// The identity block.
    fn data(&self) -> &ElementData;

    /// The identity block, mutably.
    fn data_mut(&mut self) -> &mut ElementData;

    /// Key assigned at creation.
    #[inline]
    fn key(&self) -> u64 {
        self.data().key
    }

    /// Both labels.
    #[inline]
    fn labels(&self) -> Labels {
        self.data().labels
    }

    /// The persistent label.
    #[inline]
    fn label(&self) -> i32 {
        self.data().labels.label()
    }

    /// Set the persistent label.
    #[inline]
    fn set_label(&mut self, label: i32) {
        self.data_mut().labels.set_label(label);
    }

    /// The scratch label.
    #[inline]
    fn temporary_label(&self) -> i32 {
        self.data().labels.temporary_label()
    }

    /// Set the scratch label.
    #[inline]
    fn set_temporary_label(&mut self, label: i32) {
        self.data_mut().labels.set_temporary_label(label);
    }

    /// Traversal flag.
    #[inline]
    fn is_visited(&self) -> bool {
        self.data().visited
    }

    /// Mark as visited.
    #[inline]
    fn set_visited(&mut self) {
        self.data_mut().visited = true;
    }

    /// Clear the traversal flag.
    #[inline]
    fn clear_visited(&mut self) {
        self.data_mut().visited = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_default_unset() {
        let labels = Labels::default();
        assert_eq!(labels.label(), -1);
        assert_eq!(labels.temporary_label(), -1);
    }

    #[test]
    fn test_labels_are_independent() {
        let mut labels = Labels::new();
        labels.set_label(42);
        assert_eq!(labels.label(), 42);
        assert_eq!(labels.temporary_label(), -1);

        labels.set_temporary_label(-7);
        assert_eq!(labels.label(), 42);
        assert_eq!(labels.temporary_label(), -7);

        labels.set_label(i32::MIN);
        assert_eq!(labels.label(), i32::MIN);
        assert_eq!(labels.temporary_label(), -7);
    }

    #[test]
    fn test_keys_are_sequential() {
        let mut keys = KeyAllocator::new();
        assert_eq!(keys.next_key(), 0);
        assert_eq!(keys.next_key(), 1);
        assert_eq!(keys.peek(), 2);

        let mut offset = KeyAllocator::starting_at(100);
        assert_eq!(offset.next_key(), 100);
    }

    #[test]
    fn test_copy_keeps_key() {
        let mut a = ElementData::new(1);
        let mut b = ElementData::new(2);
        b.labels.set_label(5);
        b.visited = true;

        a.copy_from(&b);
        assert_eq!(a.key, 1);
        assert_eq!(a.labels.label(), 5);
        assert!(a.visited);
    }

    #[test]
    fn test_equality_by_key() {
        use std::collections::HashSet;

        let a = ElementData::new(3);
        let mut b = ElementData::new(3);
        b.labels.set_label(9);
        b.labels.set_temporary_label(1);
        b.visited = true;
        assert_eq!(a, b);
        assert_ne!(a, ElementData::new(4));

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
