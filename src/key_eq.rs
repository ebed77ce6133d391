//! Equality functor used to compare stored keys against a probe key.

/// Key comparison used while probing. Must agree with the map's hasher:
/// keys that compare equal must hash equal.
pub trait KeyEq<K: ?Sized> {
    fn equivalent(&self, stored: &K, probe: &K) -> bool;
}

/// Default comparison through `K: Eq`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct EqualTo;

impl<K: Eq + ?Sized> KeyEq<K> for EqualTo {
    #[inline]
    fn equivalent(&self, stored: &K, probe: &K) -> bool {
        stored == probe
    }
}

impl<K: ?Sized, F> KeyEq<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn equivalent(&self, stored: &K, probe: &K) -> bool {
        self(stored, probe)
    }
}
