//! Iterators over an `OpenHashMap`, all in slot-index order.

use crate::occupancy::OccupancyBits;
use crate::slot_table::SlotTable;
use core::iter::{Enumerate, FusedIterator};
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::slice;

/// Iterator over shared entries.
pub struct Iter<'a, K, V> {
    slots: Enumerate<slice::Iter<'a, MaybeUninit<(K, V)>>>,
    occupied: &'a OccupancyBits,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(table: &'a SlotTable<K, V>) -> Self {
        let (slots, occupied) = table.parts();
        Self {
            slots: slots.iter().enumerate(),
            occupied,
            remaining: table.len(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let occupied = self.occupied;
        let (_, slot) = self.slots.find(|(idx, _)| occupied.is_set(*idx))?;
        self.remaining -= 1;
        // SAFETY: the occupancy bit for this index is set.
        let (k, v) = unsafe { slot.assume_init_ref() };
        Some((k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let occupied = self.occupied;
        let (_, slot) = self.slots.rfind(|(idx, _)| occupied.is_set(*idx))?;
        self.remaining -= 1;
        // SAFETY: as in `next`.
        let (k, v) = unsafe { slot.assume_init_ref() };
        Some((k, v))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            occupied: self.occupied,
            remaining: self.remaining,
        }
    }
}

/// Iterator over entries with mutable values.
pub struct IterMut<'a, K, V> {
    slots: Enumerate<slice::IterMut<'a, MaybeUninit<(K, V)>>>,
    occupied: &'a OccupancyBits,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(table: &'a mut SlotTable<K, V>) -> Self {
        let remaining = table.len();
        let (slots, occupied) = table.parts_mut();
        Self {
            slots: slots.iter_mut().enumerate(),
            occupied,
            remaining,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let occupied = self.occupied;
        let (_, slot) = self.slots.find(|(idx, _)| occupied.is_set(*idx))?;
        self.remaining -= 1;
        // SAFETY: the occupancy bit for this index is set, and each cell is
        // yielded at most once.
        let (k, v) = unsafe { slot.assume_init_mut() };
        Some((&*k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let occupied = self.occupied;
        let (_, slot) = self.slots.rfind(|(idx, _)| occupied.is_set(*idx))?;
        self.remaining -= 1;
        // SAFETY: as in `next`.
        let (k, v) = unsafe { slot.assume_init_mut() };
        Some((&*k, v))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Owning iterator. Entries not yielded are dropped with the iterator.
pub struct IntoIter<K, V> {
    table: SlotTable<K, V>,
    next: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(table: SlotTable<K, V>) -> Self {
        Self { table, next: 0 }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let idx = self.table.next_occupied(self.next);
        if idx == self.table.capacity() {
            return None;
        }
        self.next = idx + 1;
        // Slots are emptied without compaction: the table is never probed again.
        Some(self.table.take(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

/// Draining iterator returned by `OpenHashMap::drain`. The map is already
/// empty when this is created; dropping it early drops the rest.
pub struct Drain<'a, K, V> {
    inner: IntoIter<K, V>,
    _map: PhantomData<&'a mut ()>,
}

impl<K, V> Drain<'_, K, V> {
    pub(crate) fn new(table: SlotTable<K, V>) -> Self {
        Self {
            inner: IntoIter::new(table),
            _map: PhantomData,
        }
    }
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K, V> FusedIterator for Drain<'_, K, V> {}
