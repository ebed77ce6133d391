//! Debug-only detection of user code re-entering a map mid-probe.
//!
//! `Hash`, `Eq` and `KeyEq` implementations run while a probe or a
//! compaction pass is in flight and the table may be transiently
//! inconsistent. Each map owns one tracker; entry points that call user
//! code hold a scope for the duration of the call. In release builds the
//! tracker is zero-sized and `enter` does nothing.

use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Single-writer structure: keep the owning map !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Open a probe scope. Panics in debug builds if one is already open.
    #[inline]
    pub(crate) fn enter(&self) -> ProbeScope<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "reentrancy detected: map accessed from Hash/Eq during a probe"
            );
            ProbeScope { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ProbeScope { _z: PhantomData }
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII scope returned by `DebugReentrancy::enter`.
pub(crate) struct ProbeScope<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ProbeScope<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(false);
    }
}
