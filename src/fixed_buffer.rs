//! FixedBuffer: owned storage whose length is chosen at runtime and never changes.
//!
//! The map keeps two of these per table: one of uninitialized key/value
//! cells and one of occupancy bytes. Growth replaces a buffer wholesale; it
//! is never resized in place.

use core::mem::MaybeUninit;
use core::ops::{Deref, DerefMut};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixedBuffer<T> {
    items: Box<[T]>,
}

impl<T: Default> FixedBuffer<T> {
    /// Allocate `len` default-initialized elements.
    pub fn new(len: usize) -> Self {
        Self::from_fn(len, |_| T::default())
    }
}

impl<T> FixedBuffer<MaybeUninit<T>> {
    /// Allocate `len` cells without initializing them. The caller tracks
    /// which cells hold a live `T`; dropping the buffer never drops them.
    pub fn uninit(len: usize) -> Self {
        Self::from_fn(len, |_| MaybeUninit::uninit())
    }
}

impl<T> FixedBuffer<T> {
    pub fn from_fn<F>(len: usize, f: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        Self {
            items: (0..len).map(f).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for FixedBuffer<T> {
    fn default() -> Self {
        Self {
            items: Box::new([]),
        }
    }
}

impl<T> Deref for FixedBuffer<T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> DerefMut for FixedBuffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}
