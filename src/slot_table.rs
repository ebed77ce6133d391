//! SlotTable: fixed-capacity slot storage with out-of-band occupancy.
//!
//! Every slot is a `MaybeUninit<(K, V)>`; the occupancy bitset is the only
//! source of truth for which slots hold a live pair. The table knows
//! nothing about hashing: probing starts from a caller-supplied home
//! bucket, and compaction asks the caller for the home bucket of each
//! entry it considers moving.

use crate::fixed_buffer::FixedBuffer;
use crate::occupancy::OccupancyBits;
use core::mem::MaybeUninit;

/// Outcome of a linear probe.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Slot {
    /// The probe matched a live entry at this index.
    Occupied(usize),
    /// The probe hit an empty slot before any match.
    Vacant(usize),
}

pub(crate) struct SlotTable<K, V> {
    slots: FixedBuffer<MaybeUninit<(K, V)>>,
    occupied: OccupancyBits,
    len: usize,
}

impl<K, V> SlotTable<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let table = Self {
            slots: FixedBuffer::uninit(capacity),
            occupied: OccupancyBits::new(capacity),
            len: 0,
        };
        debug_assert_eq!(table.occupied.len(), table.slots.len());
        table
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn is_occupied(&self, idx: usize) -> bool {
        idx < self.capacity() && self.occupied.is_set(idx)
    }

    /// First occupied index at or after `from`, or `capacity()`.
    #[inline]
    pub(crate) fn next_occupied(&self, from: usize) -> usize {
        self.occupied.next_set(from.min(self.capacity()))
    }

    /// Last occupied index strictly before `before`.
    #[inline]
    pub(crate) fn prev_occupied(&self, before: usize) -> Option<usize> {
        self.occupied.prev_set(before.min(self.capacity()))
    }

    pub(crate) fn pair(&self, idx: usize) -> &(K, V) {
        assert!(self.is_occupied(idx), "slot {idx} is not occupied");
        // SAFETY: the occupancy bit is set only while the cell holds a live pair.
        unsafe { self.slots[idx].assume_init_ref() }
    }

    pub(crate) fn pair_mut(&mut self, idx: usize) -> (&K, &mut V) {
        assert!(self.is_occupied(idx), "slot {idx} is not occupied");
        // SAFETY: as in `pair`.
        let (k, v) = unsafe { self.slots[idx].assume_init_mut() };
        (&*k, v)
    }

    /// Split borrow used by iterators: raw cells plus the bitset that says
    /// which of them are live.
    pub(crate) fn parts(&self) -> (&[MaybeUninit<(K, V)>], &OccupancyBits) {
        (&self.slots, &self.occupied)
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [MaybeUninit<(K, V)>], &OccupancyBits) {
        (&mut self.slots, &self.occupied)
    }

    /// Linear probe from `home`, wrapping once around the table.
    ///
    /// Returns `None` only when a full cycle finds neither a match nor an
    /// empty slot, or when the table has no slots.
    pub(crate) fn probe<F>(&self, home: usize, mut matches: F) -> Option<Slot>
    where
        F: FnMut(&K) -> bool,
    {
        let capacity = self.capacity();
        if capacity == 0 {
            return None;
        }
        let mut idx = home;
        loop {
            if !self.occupied.is_set(idx) {
                return Some(Slot::Vacant(idx));
            }
            // SAFETY: the occupancy bit for `idx` was checked just above.
            let (key, _) = unsafe { self.slots[idx].assume_init_ref() };
            if matches(key) {
                return Some(Slot::Occupied(idx));
            }
            idx += 1;
            if idx == capacity {
                idx = 0;
            }
            if idx == home {
                return None;
            }
        }
    }

    /// Place a pair whose key is known to be absent at the first empty slot
    /// on the probe path from `home`.
    pub(crate) fn insert_unique(&mut self, home: usize, key: K, value: V) -> usize {
        match self.probe(home, |_| false) {
            Some(Slot::Vacant(idx)) => {
                self.write(idx, key, value);
                idx
            }
            _ => panic!(
                "open hash map invariant violated: no vacant slot in table of capacity {}",
                self.capacity()
            ),
        }
    }

    pub(crate) fn write(&mut self, idx: usize, key: K, value: V) {
        assert!(
            idx < self.capacity() && !self.occupied.is_set(idx),
            "slot {idx} is not vacant"
        );
        self.slots[idx].write((key, value));
        self.occupied.set(idx);
        self.len += 1;
    }

    /// Move the pair out of an occupied slot, leaving it empty. Does not
    /// repair probe chains; see `compact`.
    pub(crate) fn take(&mut self, idx: usize) -> (K, V) {
        assert!(self.is_occupied(idx), "slot {idx} is not occupied");
        self.occupied.clear(idx);
        self.len -= 1;
        // SAFETY: the bit was set, so the cell held a live pair; clearing it
        // first hands ownership to the caller exactly once.
        unsafe { self.slots[idx].assume_init_read() }
    }

    /// Backward-shift compaction after `gap` was emptied.
    ///
    /// Walks forward from `gap` until an empty slot. An entry at `pos` whose
    /// home bucket lies cyclically at or before the gap would be cut off
    /// from its home by the gap, so it moves into the gap and `pos` becomes
    /// the new gap. Entries sitting at their home bucket, or whose home lies
    /// between the gap and `pos`, stay. Returns the number of moved entries.
    pub(crate) fn compact<H>(&mut self, gap: usize, mut home_of: H) -> usize
    where
        H: FnMut(&K) -> usize,
    {
        let capacity = self.capacity();
        let distance = |from: usize, to: usize| (to + capacity - from) % capacity;
        let mut gap = gap;
        let mut pos = gap;
        let mut moved = 0;
        loop {
            pos += 1;
            if pos == capacity {
                pos = 0;
            }
            // The current gap is always empty, so a full cycle stops here too.
            if !self.occupied.is_set(pos) {
                return moved;
            }
            let home = home_of(&self.pair(pos).0);
            if distance(home, gap) < distance(home, pos) {
                let (key, value) = self.take(pos);
                self.write(gap, key, value);
                gap = pos;
                moved += 1;
            }
        }
    }

    /// Drop every live pair, keeping the capacity.
    pub(crate) fn clear(&mut self) {
        if core::mem::needs_drop::<(K, V)>() {
            let mut idx = self.next_occupied(0);
            while idx < self.capacity() {
                drop(self.take(idx));
                idx = self.next_occupied(idx + 1);
            }
        }
        self.occupied.clear_all();
        self.len = 0;
    }
}

impl<K, V> Drop for SlotTable<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}
