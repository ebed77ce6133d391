//! OpenHashMap: the open-addressing map engine.
//!
//! Hashing, growth and the public API live here; slot storage and the
//! backward-shift repair are in `slot_table`. Every entry point that runs
//! user `Hash`/`KeyEq` code holds a debug reentrancy scope for exactly the
//! duration of that code, never across a returned borrow.

use crate::capacity;
use crate::cursor::{Cursor, CursorMut};
use crate::error::InsertError;
use crate::iter::{Drain, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::key_eq::{EqualTo, KeyEq};
use crate::reentrancy::DebugReentrancy;
use crate::slot_table::{Slot, SlotTable};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;
use tracing::trace;

pub struct OpenHashMap<K, V, S = DefaultHashBuilder, E = EqualTo> {
    hasher: S,
    key_eq: E,
    pub(crate) table: SlotTable<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> OpenHashMap<K, V> {
    /// Empty map with no storage; the first insertion allocates.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Empty map with exactly `capacity` slots. The capacity is used as
    /// given; later growth picks from the prime table.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> OpenHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::with_capacity_hasher_and_key_eq(capacity, hasher, EqualTo)
    }
}

impl<K, V, S, E> OpenHashMap<K, V, S, E> {
    pub fn with_capacity_hasher_and_key_eq(capacity: usize, hasher: S, key_eq: E) -> Self {
        if capacity > 0 {
            trace!(capacity, "Allocating open hash map table.");
        }
        Self {
            hasher,
            key_eq,
            table: SlotTable::with_capacity(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of slots in the current table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    /// Drop every entry. The table keeps its capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Cursor at the lowest occupied slot, or at the end when empty.
    pub fn cursor_front(&self) -> Cursor<'_, K, V, S, E> {
        let idx = self.table.next_occupied(0);
        Cursor::new(self, idx)
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V, S, E> {
        let idx = self.table.next_occupied(0);
        CursorMut::new(self, idx)
    }

    /// Entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.table)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.table)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Move every entry out, leaving an empty map with the same capacity.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        let capacity = self.table.capacity();
        let table = core::mem::replace(&mut self.table, SlotTable::with_capacity(capacity));
        Drain::new(table)
    }
}

impl<K, V, S, E> OpenHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Slot index of `key`, if present.
    pub(crate) fn find_index(&self, key: &K) -> Option<usize> {
        let capacity = self.table.capacity();
        if capacity == 0 {
            return None;
        }
        let _g = self.reentrancy.enter();
        let home = capacity::map_key(self.hasher.hash_one(key), capacity);
        match self.table.probe(home, |k| self.key_eq.equivalent(k, key)) {
            Some(Slot::Occupied(idx)) => Some(idx),
            _ => None,
        }
    }

    /// Grow if the load factor requires it, then probe for `key`.
    fn reserve_slot(&mut self, key: &K) -> Slot {
        let _g = self.reentrancy.enter();
        let capacity = self.table.capacity();
        if self.table.len() >= capacity::grow_threshold(capacity) {
            grow_table(&mut self.table, &self.hasher, capacity::next_capacity(capacity));
        }
        let capacity = self.table.capacity();
        let home = capacity::map_key(self.hasher.hash_one(key), capacity);
        let key_eq = &self.key_eq;
        match self.table.probe(home, |k| key_eq.equivalent(k, key)) {
            Some(slot) => slot,
            None => unreachable!(
                "open hash map invariant violated: probe cycle in table of capacity {capacity} \
                 with {} entries found no vacant slot",
                self.table.len()
            ),
        }
    }

    /// Insert-or-get: construct the value with `f` only if `key` is absent.
    ///
    /// Returns the slot index of the entry and whether it was inserted.
    fn emplace_index<F>(&mut self, key: K, f: F) -> (usize, bool)
    where
        F: FnOnce() -> V,
    {
        match self.reserve_slot(&key) {
            Slot::Occupied(idx) => (idx, false),
            Slot::Vacant(idx) => {
                self.table.write(idx, key, f());
                (idx, true)
            }
        }
    }

    /// Remove the entry at an occupied slot and repair the probe chains
    /// that ran through it.
    pub(crate) fn remove_index(&mut self, idx: usize) -> (K, V) {
        let _g = self.reentrancy.enter();
        let pair = self.table.take(idx);
        let capacity = self.table.capacity();
        let hasher = &self.hasher;
        self.table
            .compact(idx, |k| capacity::map_key(hasher.hash_one(k), capacity));
        pair
    }

    /// Insert `key` with a value built by `f` unless it is already present.
    ///
    /// The returned flag is `true` when the entry was newly inserted; when
    /// `false` the cursor points at the existing entry and `f` was not run.
    /// May grow the table first.
    pub fn try_emplace_with<F>(&mut self, key: K, f: F) -> (CursorMut<'_, K, V, S, E>, bool)
    where
        F: FnOnce() -> V,
    {
        let (idx, inserted) = self.emplace_index(key, f);
        (CursorMut::new(self, idx), inserted)
    }

    /// As `try_emplace_with`; `value` is dropped if the key is present.
    pub fn try_emplace(&mut self, key: K, value: V) -> (CursorMut<'_, K, V, S, E>, bool) {
        self.try_emplace_with(key, || value)
    }

    pub fn get_or_insert_with<F>(&mut self, key: K, f: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let (idx, _) = self.emplace_index(key, f);
        self.table.pair_mut(idx).1
    }

    pub fn get_or_insert(&mut self, key: K, value: V) -> &mut V {
        self.get_or_insert_with(key, || value)
    }

    /// Value for `key`, inserting `V::default()` first if absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Strict insert: fails with `DuplicateKey` and leaves the map unchanged
    /// if `key` is already present.
    pub fn insert(&mut self, key: K, value: V) -> Result<&mut V, InsertError> {
        match self.reserve_slot(&key) {
            Slot::Occupied(_) => Err(InsertError::DuplicateKey),
            Slot::Vacant(idx) => {
                self.table.write(idx, key, value);
                Ok(self.table.pair_mut(idx).1)
            }
        }
    }

    /// Insert or overwrite, returning the previous value. The stored key is
    /// kept when overwriting.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Option<V> {
        match self.reserve_slot(&key) {
            Slot::Occupied(idx) => Some(core::mem::replace(self.table.pair_mut(idx).1, value)),
            Slot::Vacant(idx) => {
                self.table.write(idx, key, value);
                None
            }
        }
    }

    /// Cursor at `key`'s entry.
    pub fn find(&self, key: &K) -> Option<Cursor<'_, K, V, S, E>> {
        let idx = self.find_index(key)?;
        Some(Cursor::new(self, idx))
    }

    pub fn find_mut(&mut self, key: &K) -> Option<CursorMut<'_, K, V, S, E>> {
        let idx = self.find_index(key)?;
        Some(CursorMut::new(self, idx))
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = self.find_index(key)?;
        Some(&self.table.pair(idx).1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.find_index(key)?;
        Some(self.table.pair_mut(idx).1)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let idx = self.find_index(key)?;
        let (k, v) = self.table.pair(idx);
        Some((k, v))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let idx = self.find_index(key)?;
        Some(self.remove_index(idx))
    }

    /// Drop `key`'s entry. Returns whether it was present.
    pub fn erase(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Grow until `additional` more entries fit without further growth.
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .table
            .len()
            .checked_add(additional)
            .unwrap_or_else(|| panic!("capacity overflow"));
        let capacity = capacity::capacity_for(self.table.capacity(), required);
        if capacity != self.table.capacity() {
            let _g = self.reentrancy.enter();
            grow_table(&mut self.table, &self.hasher, capacity);
        }
    }

    /// Keep only the entries for which `f` returns `true`.
    ///
    /// Each entry is visited exactly once even though removals shift later
    /// entries backwards.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let capacity = self.table.capacity();
        // Start right after an empty slot: compaction never crosses it, so
        // removals only move entries that have not been visited yet.
        let Some(empty) = (0..capacity).find(|&idx| !self.table.is_occupied(idx)) else {
            return;
        };
        let mut step = 1;
        while step < capacity {
            let idx = (empty + step) % capacity;
            if self.table.is_occupied(idx) {
                let (k, v) = self.table.pair_mut(idx);
                if !f(k, v) {
                    drop(self.remove_index(idx));
                    // `idx` may now hold a shifted entry; look again.
                    continue;
                }
            }
            step += 1;
        }
    }

    /// Every occupied slot is reachable from its home bucket through
    /// occupied slots only.
    #[cfg(test)]
    pub(crate) fn assert_probe_invariant(&self) {
        let capacity = self.table.capacity();
        let mut idx = self.table.next_occupied(0);
        let mut live = 0;
        while idx < capacity {
            live += 1;
            let home = capacity::map_key(self.hasher.hash_one(&self.table.pair(idx).0), capacity);
            let mut p = home;
            while p != idx {
                assert!(
                    self.table.is_occupied(p),
                    "slot {idx} (home {home}) is cut off by empty slot {p}"
                );
                p = (p + 1) % capacity;
            }
            idx = self.table.next_occupied(idx + 1);
        }
        assert_eq!(live, self.table.len());
        assert!(self.table.len() <= capacity);
    }
}

/// Replace `table` with an empty one of `capacity` slots and move every
/// entry across. All home buckets are computed against the old table
/// first; the move itself runs no user code, so a panicking hasher leaves
/// `table` exactly as it was.
fn grow_table<K, V, S>(table: &mut SlotTable<K, V>, hasher: &S, capacity: usize)
where
    K: Hash,
    S: BuildHasher,
{
    trace!(
        from = table.capacity(),
        to = capacity,
        len = table.len(),
        "Growing open hash map table."
    );
    let mut homes = Vec::with_capacity(table.len());
    let mut idx = table.next_occupied(0);
    while idx < table.capacity() {
        homes.push((idx, capacity::map_key(hasher.hash_one(&table.pair(idx).0), capacity)));
        idx = table.next_occupied(idx + 1);
    }
    let mut old = core::mem::replace(table, SlotTable::with_capacity(capacity));
    for (idx, home) in homes {
        let (key, value) = old.take(idx);
        table.insert_unique(home, key, value);
    }
}

impl<K, V> Default for OpenHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, E> Clone for OpenHashMap<K, V, S, E>
where
    K: Clone + Hash,
    V: Clone,
    S: Clone + BuildHasher,
    E: Clone,
{
    /// Rehashes every entry into a fresh table of the same capacity.
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity_hasher_and_key_eq(
            self.capacity(),
            self.hasher.clone(),
            self.key_eq.clone(),
        );
        let capacity = copy.capacity();
        for (k, v) in self.iter() {
            let home = capacity::map_key(copy.hasher.hash_one(k), capacity);
            copy.table.insert_unique(home, k.clone(), v.clone());
        }
        copy
    }
}

impl<K, V, S, E> fmt::Debug for OpenHashMap<K, V, S, E>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, E> PartialEq for OpenHashMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Same keys with equal values; slot layout and capacity are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| v == ov))
    }
}

impl<K, V, S, E> Eq for OpenHashMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

impl<K, V, S, E> Index<&K> for OpenHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not present in OpenHashMap")
    }
}

impl<K, V, S, E> Extend<(K, V)> for OpenHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// First insertion wins: pairs whose key is already present are dropped.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let hint = iter.size_hint().0;
        self.reserve(if self.is_empty() { hint } else { (hint + 1) / 2 });
        for (k, v) in iter {
            let _ = self.emplace_index(k, || v);
        }
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for OpenHashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_capacity_hasher_and_key_eq(0, S::default(), E::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S, E> IntoIterator for OpenHashMap<K, V, S, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter::new(self.table)
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a OpenHashMap<K, V, S, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut OpenHashMap<K, V, S, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::hash::Hasher;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    /// Raw hash equals the integer key; exercises the avalanche mix.
    #[derive(Clone, Default)]
    struct IdentityBuildHasher;
    #[derive(Default)]
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityBuildHasher {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }
        fn write_u32(&mut self, n: u32) {
            self.0 = u64::from(n);
        }
        fn write_i32(&mut self, n: i32) {
            self.0 = n as u64;
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn write_usize(&mut self, n: usize) {
            self.0 = n as u64;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    /// Every key hashes alike, so every entry shares one probe chain.
    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> ConstHasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0x5eed
        }
    }

    struct Tracked {
        value: i32,
        drops: Rc<Cell<usize>>,
    }
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    /// Invariant: first insertion wins; a duplicate returns the existing
    /// entry without running the value factory or changing `len`.
    #[test]
    fn try_emplace_is_first_insert_wins_and_lazy() {
        let mut m: OpenHashMap<String, i32> = OpenHashMap::new();
        let calls = Cell::new(0);
        let (c, inserted) = m.try_emplace_with("k".to_string(), || {
            calls.set(calls.get() + 1);
            1
        });
        assert!(inserted);
        assert_eq!(c.value(), Some(&1));

        let (c, inserted) = m.try_emplace_with("k".to_string(), || {
            calls.set(calls.get() + 1);
            2
        });
        assert!(!inserted);
        assert_eq!(c.value(), Some(&1));
        assert_eq!(calls.get(), 1, "factory must not run for a present key");
        assert_eq!(m.len(), 1);
    }

    /// Invariant: strict `insert` rejects duplicates and leaves the value alone.
    #[test]
    fn insert_rejects_duplicates() {
        let mut m: OpenHashMap<&'static str, i32> = OpenHashMap::new();
        *m.insert("a", 1).unwrap() += 10;
        match m.insert("a", 2) {
            Err(InsertError::DuplicateKey) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(m.get(&"a"), Some(&11));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn insert_or_assign_overwrites_and_returns_previous() {
        let mut m: OpenHashMap<u32, &'static str> = OpenHashMap::new();
        assert_eq!(m.insert_or_assign(1, "one"), None);
        assert_eq!(m.insert_or_assign(1, "uno"), Some("one"));
        assert_eq!(m[&1], "uno");
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn get_or_default_acts_like_subscript() {
        let mut m: OpenHashMap<&'static str, Vec<u8>> = OpenHashMap::new();
        m.get_or_default("a").push(1);
        m.get_or_default("a").push(2);
        *m.get_or_insert("b", vec![9]) = vec![7];
        assert_eq!(m.get(&"a"), Some(&vec![1, 2]));
        assert_eq!(m.get(&"b"), Some(&vec![7]));
    }

    /// Invariant: a fresh map owns no slots; growth follows the prime list
    /// and happens before `len` would pass 3/5 of capacity.
    #[test]
    fn growth_follows_prime_list_and_load_factor() {
        let mut m: OpenHashMap<u32, u32> = OpenHashMap::new();
        assert_eq!(m.capacity(), 0);
        assert!(m.get(&1).is_none());

        let mut seen = Vec::new();
        for i in 0..200 {
            m.try_emplace(i, i);
            if seen.last() != Some(&m.capacity()) {
                seen.push(m.capacity());
            }
            assert!(m.len() * 5 <= m.capacity() * 3 + 5, "load factor exceeded");
        }
        assert_eq!(seen, vec![5, 11, 23, 47, 97, 197, 397]);
        for i in 0..200 {
            assert_eq!(m.get(&i), Some(&i));
        }
        m.assert_probe_invariant();
    }

    /// Invariant: an explicit capacity is used as given, then growth picks
    /// the next prime above it.
    #[test]
    fn explicit_capacity_is_not_rounded() {
        let mut m: OpenHashMap<u32, u32> = OpenHashMap::with_capacity(10);
        assert_eq!(m.capacity(), 10);
        for i in 0..6 {
            m.try_emplace(i, i);
        }
        assert_eq!(m.capacity(), 10);
        m.try_emplace(6, 6);
        assert_eq!(m.capacity(), 11);
        m.assert_probe_invariant();
    }

    #[test]
    fn reserve_grows_once_to_fit() {
        let mut m: OpenHashMap<u32, u32> = OpenHashMap::new();
        m.reserve(50);
        assert_eq!(m.capacity(), 97);
        for i in 0..50 {
            m.try_emplace(i, i);
        }
        assert_eq!(m.capacity(), 97);
        m.reserve(0);
        assert_eq!(m.capacity(), 97);
    }

    /// Invariant: every surviving key stays reachable after erasures under
    /// total collision (one chain wrapping around the table).
    #[test]
    fn erase_under_total_collision_keeps_chain_reachable() {
        let mut m: OpenHashMap<u32, u32, ConstBuildHasher> =
            OpenHashMap::with_hasher(ConstBuildHasher);
        for i in 0..40 {
            m.try_emplace(i, i * 10);
        }
        for i in (0..40).step_by(3) {
            assert_eq!(m.remove(&i), Some(i * 10));
            m.assert_probe_invariant();
        }
        for i in 0..40 {
            let expected = if i % 3 == 0 { None } else { Some(i * 10) };
            assert_eq!(m.get(&i).copied(), expected, "key {i}");
        }
    }

    #[test]
    fn erase_absent_key_is_noop() {
        let mut m: OpenHashMap<u32, u32> = OpenHashMap::new();
        assert!(!m.erase(&3));
        m.try_emplace(1, 1);
        assert!(!m.erase(&3));
        assert_eq!(m.len(), 1);
        assert!(m.erase(&1));
        assert!(m.is_empty());
    }

    #[test]
    fn identity_hash_scenario_first_insert_wins() {
        let mut m: OpenHashMap<i32, i32, IdentityBuildHasher> =
            OpenHashMap::with_hasher(IdentityBuildHasher);
        for i in 0..100 {
            m.try_emplace(i, i * 2 + 1);
        }
        for i in (0..100).step_by(2) {
            m.erase(&i);
        }
        m.assert_probe_invariant();
        for i in (1..200).step_by(2) {
            m.try_emplace(i, i * 3 + 1);
        }
        for i in 0..200 {
            let expected = match i {
                i if i % 2 == 0 => None,
                i if i < 100 => Some(i * 2 + 1),
                i => Some(i * 3 + 1),
            };
            assert_eq!(m.get(&i).copied(), expected, "key {i}");
        }
        assert_eq!(m.len(), 100);
    }

    /// Invariant: `retain` visits each entry exactly once, even when
    /// removals shift entries across the end of the table.
    #[test]
    fn retain_visits_each_entry_once_under_collision() {
        let mut m: OpenHashMap<u32, u32, ConstBuildHasher> =
            OpenHashMap::with_hasher(ConstBuildHasher);
        for i in 0..30 {
            m.try_emplace(i, 0);
        }
        m.retain(|k, v| {
            *v += 1;
            k % 2 == 0
        });
        assert_eq!(m.len(), 15);
        for (k, v) in m.iter() {
            assert_eq!(k % 2, 0);
            assert_eq!(*v, 1, "key {k} visited {v} times");
        }
        m.assert_probe_invariant();
    }

    #[test]
    fn clone_rehashes_into_independent_storage() {
        let mut m: OpenHashMap<String, i32> = OpenHashMap::new();
        for i in 0..20 {
            m.try_emplace(format!("k{i}"), i);
        }
        let mut c = m.clone();
        assert_eq!(c, m);
        assert_eq!(c.capacity(), m.capacity());
        c.assert_probe_invariant();

        *c.get_mut(&"k3".to_string()).unwrap() = 300;
        c.remove(&"k4".to_string());
        assert_eq!(m.get(&"k3".to_string()), Some(&3));
        assert!(m.contains_key(&"k4".to_string()));
        assert_ne!(c, m);
    }

    #[test]
    fn take_leaves_source_empty_and_usable() {
        let mut m: OpenHashMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
        let moved = core::mem::take(&mut m);
        assert_eq!(moved.len(), 10);
        assert!(m.is_empty());
        assert_eq!(m.capacity(), 0);
        m.try_emplace(1, 1);
        assert_eq!(m.len(), 1);
    }

    /// Invariant: each value is dropped exactly once across growth, erase,
    /// clear and map drop.
    #[test]
    fn values_drop_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        let mut m: OpenHashMap<u32, Tracked> = OpenHashMap::new();
        for i in 0..50 {
            m.try_emplace(
                i,
                Tracked {
                    value: i as i32,
                    drops: drops.clone(),
                },
            );
        }
        assert_eq!(drops.get(), 0, "growth must move, not drop");
        // Duplicate emplace drops only the rejected value.
        m.try_emplace(
            0,
            Tracked {
                value: -1,
                drops: drops.clone(),
            },
        );
        assert_eq!(drops.get(), 1);
        assert_eq!(m.get(&0).map(|t| t.value), Some(0));

        for i in 0..10 {
            m.erase(&i);
        }
        assert_eq!(drops.get(), 11);
        m.clear();
        assert_eq!(drops.get(), 51);
        assert!(m.is_empty());

        for i in 0..5 {
            m.try_emplace(
                i,
                Tracked {
                    value: 0,
                    drops: drops.clone(),
                },
            );
        }
        drop(m);
        assert_eq!(drops.get(), 56);
    }

    /// Invariant: a hasher that panics during growth leaves the map as it
    /// was before the insertion: same capacity, every entry still present,
    /// and nothing dropped twice.
    #[test]
    fn panicking_hasher_during_growth_keeps_map_intact() {
        #[derive(Clone)]
        struct FlakyBuildHasher(Rc<Cell<usize>>);
        struct FlakyHasher(Rc<Cell<usize>>, u64);
        impl BuildHasher for FlakyBuildHasher {
            type Hasher = FlakyHasher;
            fn build_hasher(&self) -> FlakyHasher {
                FlakyHasher(self.0.clone(), 0)
            }
        }
        impl Hasher for FlakyHasher {
            fn write(&mut self, bytes: &[u8]) {
                for &b in bytes {
                    self.1 = self.1.wrapping_mul(31).wrapping_add(u64::from(b));
                }
            }
            fn finish(&self) -> u64 {
                let left = self.0.get();
                if left == 0 {
                    panic!("hasher budget exhausted");
                }
                self.0.set(left - 1);
                self.1
            }
        }

        let budget = Rc::new(Cell::new(usize::MAX));
        let drops = Rc::new(Cell::new(0));
        let mut m: OpenHashMap<u32, Tracked, FlakyBuildHasher> =
            OpenHashMap::with_hasher(FlakyBuildHasher(budget.clone()));
        for i in 0..3 {
            m.try_emplace(
                i,
                Tracked {
                    value: i as i32,
                    drops: drops.clone(),
                },
            );
        }
        assert_eq!(m.capacity(), 5);

        // The next insertion grows 5 -> 11; allow one rehash, then fail.
        budget.set(1);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            m.try_emplace(
                3,
                Tracked {
                    value: 3,
                    drops: drops.clone(),
                },
            );
        }));
        assert!(res.is_err());
        budget.set(usize::MAX);
        // Only the rejected value has been dropped.
        assert_eq!(drops.get(), 1);
        assert_eq!(m.len(), 3);
        assert_eq!(m.capacity(), 5);
        for i in 0..3 {
            assert_eq!(m.get(&i).map(|t| t.value), Some(i as i32), "key {i}");
        }
        m.assert_probe_invariant();

        // The map is still usable and grows normally afterwards.
        m.try_emplace(
            3,
            Tracked {
                value: 3,
                drops: drops.clone(),
            },
        );
        assert_eq!(m.capacity(), 11);
        assert_eq!(m.len(), 4);
        drop(m);
        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn debug_and_index_render_entries() {
        let mut m: OpenHashMap<u32, &'static str> = OpenHashMap::new();
        m.try_emplace(7, "seven");
        assert_eq!(format!("{:?}", m), r#"{7: "seven"}"#);
        assert_eq!(m[&7], "seven");
    }

    #[test]
    #[should_panic(expected = "key not present")]
    fn index_panics_on_missing_key() {
        let m: OpenHashMap<u32, u32> = OpenHashMap::new();
        let _v: u32 = m[&1];
    }

    #[test]
    fn custom_key_eq_functor() {
        #[derive(Clone, Default)]
        struct LowerHasher;
        impl BuildHasher for LowerHasher {
            type Hasher = std::collections::hash_map::DefaultHasher;
            fn build_hasher(&self) -> Self::Hasher {
                Default::default()
            }
        }
        // Hash only the length so case-insensitive equality stays consistent.
        #[derive(Clone, Debug)]
        struct Name(String);
        impl Hash for Name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.len().hash(state);
            }
        }
        let eq = |a: &Name, b: &Name| a.0.eq_ignore_ascii_case(&b.0);
        let mut m = OpenHashMap::with_capacity_hasher_and_key_eq(0, LowerHasher, eq);
        m.try_emplace(Name("Alice".into()), 1);
        let (_, inserted) = m.try_emplace(Name("ALICE".into()), 2);
        assert!(!inserted);
        assert_eq!(m.get(&Name("alice".into())), Some(&1));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn iteration_is_slot_order_and_covers_everything() {
        let m: OpenHashMap<u32, u32> = (0..64).map(|i| (i, i + 1)).collect();
        let keys: BTreeSet<u32> = m.keys().copied().collect();
        assert_eq!(keys, (0..64).collect::<BTreeSet<u32>>());
        let slots: Vec<usize> = {
            let mut c = m.cursor_front();
            let mut v = Vec::new();
            while !c.is_end() {
                v.push(c.index());
                c.move_next();
            }
            v
        };
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(m.values().sum::<u32>(), (1..=64).sum::<u32>());
    }

    /// Invariant (debug-only): re-entering the map from `Eq` during a probe
    /// panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_find() {
        struct ReentryKey {
            id: u32,
            map: *const OpenHashMap<ReentryKey, i32, ConstBuildHasher>,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if !other.map.is_null() {
                    // SAFETY: the map outlives the probe that calls us.
                    let m = unsafe { &*other.map };
                    let probe = ReentryKey {
                        id: self.id,
                        map: core::ptr::null(),
                    };
                    let _ = m.contains_key(&probe);
                }
                self.id == other.id
            }
        }
        impl Eq for ReentryKey {}
        impl Hash for ReentryKey {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        let mut m: OpenHashMap<ReentryKey, i32, ConstBuildHasher> =
            OpenHashMap::with_hasher(ConstBuildHasher);
        m.try_emplace(
            ReentryKey {
                id: 1,
                map: core::ptr::null(),
            },
            1,
        );
        let query = ReentryKey {
            id: 2,
            map: &m as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.find(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
