//! Random-access set.
//!
//! [`Ras`] keeps its items in a dense `Vec` and a key-to-slot map next to it, so
//! membership, key lookup, positional access and removal are all O(1) on
//! average. Removal moves the last item into the vacated slot: iteration order
//! is insertion order only until the first removal.
//!
//! Items are stored by value (the mesh stores element handles) and identified by
//! the `u64` key the caller supplies with each insertion.

use std::collections::HashMap;

/// Dense set of items addressed by key and by position.
#[derive(Debug, Clone)]
pub struct Ras<T: Copy> {
    items: Vec<T>,
    keys: Vec<u64>,
    slots: HashMap<u64, usize>,
}

impl<T: Copy> Default for Ras<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Ras<T> {
    /// Empty set.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            keys: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Empty set with room for `n` items.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            items: Vec::with_capacity(n),
            keys: Vec::with_capacity(n),
            slots: HashMap::with_capacity(n),
        }
    }

    /// Insert `item` under `key`. Inserting a key that is already present
    /// does nothing and returns `false`.
    pub fn add(&mut self, key: u64, item: T) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, self.items.len());
        self.items.push(item);
        self.keys.push(key);
        true
    }

    /// Remove the item stored under `key`, returning it.
    pub fn remove(&mut self, key: u64) -> Option<T> {
        let slot = self.slots.remove(&key)?;
        Some(self.take_slot(slot))
    }

    /// Remove the item at `index`, returning it.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        self.slots.remove(&self.keys[index]);
        Some(self.take_slot(index))
    }

    fn take_slot(&mut self, slot: usize) -> T {
        let item = self.items.swap_remove(slot);
        self.keys.swap_remove(slot);
        if slot < self.items.len() {
            self.slots.insert(self.keys[slot], slot);
        }
        item
    }

    /// Item at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    /// Position of the item stored under `key`.
    #[inline]
    pub fn index_of(&self, key: u64) -> Option<usize> {
        self.slots.get(&key).copied()
    }

    /// Item stored under `key`.
    #[inline]
    pub fn get_with_key(&self, key: u64) -> Option<T> {
        self.index_of(key).map(|i| self.items[i])
    }

    /// Whether `key` is present.
    #[inline]
    pub fn contains_key(&self, key: u64) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.items.clear();
        self.keys.clear();
        self.slots.clear();
    }

    /// Items in storage order.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, T>> {
        self.items.iter().copied()
    }

    /// Keys in storage order.
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    /// Items as a slice in storage order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Copy of the items in storage order.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

impl<'a, T: Copy> IntoIterator for &'a Ras<T> {
    type Item = T;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Ras<char> {
        let mut ras = Ras::new();
        for (k, c) in ['a', 'b', 'c', 'd'].into_iter().enumerate() {
            ras.add(k as u64 * 10, c);
        }
        ras
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut ras = letters();
        assert!(!ras.add(20, 'z'));
        assert_eq!(ras.len(), 4);
        assert_eq!(ras.get_with_key(20), Some('c'));
    }

    #[test]
    fn test_remove_swaps_last_in() {
        let mut ras = letters();
        assert_eq!(ras.remove(0), Some('a'));
        assert_eq!(ras.len(), 3);
        // 'd' moved into slot 0
        assert_eq!(ras.get(0), Some('d'));
        assert_eq!(ras.index_of(30), Some(0));
        assert!(!ras.contains_key(0));
        assert_eq!(ras.remove(0), None);
    }

    #[test]
    fn test_remove_at_and_last() {
        let mut ras = letters();
        assert_eq!(ras.remove_at(3), Some('d'));
        assert_eq!(ras.remove_at(3), None);
        assert_eq!(ras.iter().collect::<String>(), "abc");
        assert_eq!(ras.keys(), &[0, 10, 20]);
    }

    #[test]
    fn test_positions_stay_consistent() {
        let mut ras = Ras::new();
        for k in 0..100u64 {
            ras.add(k, k as usize);
        }
        for k in (0..100u64).step_by(3) {
            ras.remove(k);
        }
        for (i, item) in ras.iter().enumerate() {
            assert_eq!(ras.index_of(item as u64), Some(i));
        }
        ras.clear();
        assert!(ras.is_empty());
    }
}
