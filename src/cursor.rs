//! Bidirectional cursors over a map's slots.
//!
//! A cursor is a slot index into one map. Valid positions are occupied
//! slots plus the end position, which equals the map's capacity. Moving
//! skips empty slots. `Cursor` borrows the map shared and is `Copy`;
//! `CursorMut` borrows it exclusively and can mutate or remove the entry
//! under it. Because the borrow covers the whole map, growth cannot happen
//! while any cursor is alive.

use crate::key_eq::KeyEq;
use crate::open_hash_map::OpenHashMap;
use core::fmt;
use core::hash::{BuildHasher, Hash};

pub struct Cursor<'a, K, V, S, E> {
    map: &'a OpenHashMap<K, V, S, E>,
    idx: usize,
}

impl<'a, K, V, S, E> Cursor<'a, K, V, S, E> {
    pub(crate) fn new(map: &'a OpenHashMap<K, V, S, E>, idx: usize) -> Self {
        debug_assert!(idx == map.capacity() || map.table.is_occupied(idx));
        Self { map, idx }
    }

    /// Slot index; equals the map's capacity at the end.
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn is_end(&self) -> bool {
        self.idx == self.map.capacity()
    }

    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        if self.is_end() {
            return None;
        }
        let (k, v) = self.map.table.pair(self.idx);
        Some((k, v))
    }

    pub fn key(&self) -> Option<&'a K> {
        self.key_value().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.key_value().map(|(_, v)| v)
    }

    /// Advance to the next occupied slot or the end. No-op at the end.
    pub fn move_next(&mut self) {
        if !self.is_end() {
            self.idx = self.map.table.next_occupied(self.idx + 1);
        }
    }

    /// Step back to the previous occupied slot. Returns `false`, leaving the
    /// cursor in place, when there is none.
    pub fn move_prev(&mut self) -> bool {
        match self.map.table.prev_occupied(self.idx) {
            Some(idx) => {
                self.idx = idx;
                true
            }
            None => false,
        }
    }
}

impl<K, V, S, E> Clone for Cursor<'_, K, V, S, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, S, E> Copy for Cursor<'_, K, V, S, E> {}

/// Cursors are equal when they point at the same slot of the same map.
impl<K, V, S, E> PartialEq for Cursor<'_, K, V, S, E> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.map, other.map) && self.idx == other.idx
    }
}

impl<K, V, S, E> Eq for Cursor<'_, K, V, S, E> {}

impl<K: fmt::Debug, V: fmt::Debug, S, E> fmt::Debug for Cursor<'_, K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.idx)
            .field("entry", &self.key_value())
            .finish()
    }
}

pub struct CursorMut<'a, K, V, S, E> {
    map: &'a mut OpenHashMap<K, V, S, E>,
    idx: usize,
}

impl<'a, K, V, S, E> CursorMut<'a, K, V, S, E> {
    pub(crate) fn new(map: &'a mut OpenHashMap<K, V, S, E>, idx: usize) -> Self {
        debug_assert!(idx == map.capacity() || map.table.is_occupied(idx));
        Self { map, idx }
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn is_end(&self) -> bool {
        self.idx == self.map.capacity()
    }

    pub fn key(&self) -> Option<&K> {
        self.as_cursor().key()
    }

    pub fn value(&self) -> Option<&V> {
        self.as_cursor().value()
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        if self.is_end() {
            return None;
        }
        Some(self.map.table.pair_mut(self.idx).1)
    }

    pub fn key_value_mut(&mut self) -> Option<(&K, &mut V)> {
        if self.is_end() {
            return None;
        }
        Some(self.map.table.pair_mut(self.idx))
    }

    /// Consume the cursor, keeping the value borrow for the map's lifetime.
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        if self.is_end() {
            return None;
        }
        Some(self.map.table.pair_mut(self.idx).1)
    }

    /// Shared view of the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, S, E> {
        Cursor::new(&*self.map, self.idx)
    }

    pub fn move_next(&mut self) {
        if !self.is_end() {
            self.idx = self.map.table.next_occupied(self.idx + 1);
        }
    }

    pub fn move_prev(&mut self) -> bool {
        match self.map.table.prev_occupied(self.idx) {
            Some(idx) => {
                self.idx = idx;
                true
            }
            None => false,
        }
    }
}

impl<K, V, S, E> CursorMut<'_, K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Remove the entry under the cursor and return it.
    ///
    /// Compaction may shift a later entry into the vacated slot; the cursor
    /// then stays put and points at it. Otherwise it advances to the next
    /// occupied slot. An entry that wrapped around the end of the table can
    /// be shifted back past the cursor, so a front-to-back walk that removes
    /// may see such an entry twice; use `OpenHashMap::retain` for exactly
    /// once semantics.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        if self.is_end() {
            return None;
        }
        let pair = self.map.remove_index(self.idx);
        if !self.map.table.is_occupied(self.idx) {
            self.idx = self.map.table.next_occupied(self.idx + 1);
        }
        Some(pair)
    }
}

impl<'a, K, V, S, E> From<CursorMut<'a, K, V, S, E>> for Cursor<'a, K, V, S, E> {
    fn from(cursor: CursorMut<'a, K, V, S, E>) -> Self {
        Cursor::new(cursor.map, cursor.idx)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S, E> fmt::Debug for CursorMut<'_, K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("index", &self.idx)
            .field("entry", &self.as_cursor().key_value())
            .finish()
    }
}
