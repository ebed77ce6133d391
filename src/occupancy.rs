//! Packed occupancy bitset, one bit per slot.
//!
//! A guard bit is kept set at index `len` (one past the last slot), so a
//! forward scan for the next occupied slot always terminates at `len`,
//! which doubles as the end position of every cursor.

use crate::fixed_buffer::FixedBuffer;

#[derive(Clone, Debug)]
pub(crate) struct OccupancyBits {
    bytes: FixedBuffer<u8>,
    len: usize,
}

impl OccupancyBits {
    pub(crate) fn new(len: usize) -> Self {
        let mut bits = Self {
            bytes: FixedBuffer::new((len >> 3) + 1),
            len,
        };
        bits.bytes[len >> 3] |= 1 << (len & 7);
        bits
    }

    /// Number of logical bits, excluding the guard.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_set(&self, idx: usize) -> bool {
        debug_assert!(idx <= self.len);
        self.bytes[idx >> 3] & (1 << (idx & 7)) != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "guard bit is not writable");
        self.bytes[idx >> 3] |= 1 << (idx & 7);
    }

    #[inline]
    pub(crate) fn clear(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "guard bit is not writable");
        self.bytes[idx >> 3] &= !(1 << (idx & 7));
    }

    /// Smallest set index `>= from`; `len` when no slot at or after `from`
    /// is set.
    pub(crate) fn next_set(&self, from: usize) -> usize {
        debug_assert!(from <= self.len);
        let mut idx = from;
        loop {
            let pending = self.bytes[idx >> 3] >> (idx & 7);
            if pending != 0 {
                return idx + pending.trailing_zeros() as usize;
            }
            idx = (idx | 7) + 1;
        }
    }

    /// Largest set index `< before`, if any.
    pub(crate) fn prev_set(&self, before: usize) -> Option<usize> {
        debug_assert!(before <= self.len);
        let mut end = before;
        while end > 0 {
            let last = end - 1;
            let pending = self.bytes[last >> 3] & (0xff >> (7 - (last & 7)));
            if pending != 0 {
                return Some((last & !7) + 7 - pending.leading_zeros() as usize);
            }
            end = last & !7;
        }
        None
    }

    pub(crate) fn clear_all(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
        self.bytes[self.len >> 3] |= 1 << (self.len & 7);
    }
}

#[cfg(test)]
mod tests {
    use super::OccupancyBits;

    #[test]
    fn guard_bit_is_set_past_the_end() {
        for len in [0usize, 1, 7, 8, 9, 16, 23] {
            let bits = OccupancyBits::new(len);
            assert!(bits.is_set(len), "guard missing for len {len}");
            assert!((0..len).all(|i| !bits.is_set(i)));
            assert_eq!(bits.next_set(0), len);
        }
    }

    #[test]
    fn set_clear_and_scan() {
        let mut bits = OccupancyBits::new(23);
        bits.set(3);
        bits.set(8);
        bits.set(22);
        assert_eq!(bits.next_set(0), 3);
        assert_eq!(bits.next_set(4), 8);
        assert_eq!(bits.next_set(9), 22);
        assert_eq!(bits.next_set(23), 23);
        assert_eq!(bits.prev_set(22), Some(8));
        assert_eq!(bits.prev_set(3), None);

        bits.clear(8);
        assert!(!bits.is_set(8));
        assert_eq!(bits.next_set(4), 22);
    }

    /// Invariant: `prev_set` agrees with a bit-by-bit scan across byte
    /// boundaries and never reports the guard bit.
    #[test]
    fn prev_set_matches_linear_scan() {
        let len = 37;
        let mut bits = OccupancyBits::new(len);
        for idx in [0, 6, 7, 8, 15, 16, 29, 36] {
            bits.set(idx);
        }
        for before in 0..=len {
            let expected = (0..before).rev().find(|&idx| bits.is_set(idx));
            assert_eq!(bits.prev_set(before), expected, "before {before}");
        }
        assert_eq!(bits.prev_set(len), Some(36));
        assert_eq!(bits.prev_set(7), Some(6));
        assert_eq!(bits.prev_set(6), Some(0));
        assert_eq!(bits.prev_set(0), None);

        let empty = OccupancyBits::new(16);
        assert_eq!(empty.prev_set(16), None);
    }

    #[test]
    fn clear_all_keeps_guard() {
        let mut bits = OccupancyBits::new(11);
        (0..11).for_each(|i| bits.set(i));
        bits.clear_all();
        assert_eq!(bits.next_set(0), 11);
        assert_eq!(bits.len(), 11);
    }
}
