//! open-hashmap: an open-addressing hash map with linear probing,
//! prime-sized tables and backward-shift deletion (no tombstones).
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a flat, single-allocation map whose lookups walk one contiguous
//!   run of slots, and whose deletions leave no tombstones behind.
//! - Layers:
//!   - FixedBuffer<T>: a boxed slice fixed at construction; owns nothing
//!     beyond its elements.
//!   - OccupancyBits: one bit per slot plus a guard bit at index
//!     `capacity`, so forward scans stop without a bounds check.
//!   - SlotTable<K, V>: `MaybeUninit<(K, V)>` slots plus occupancy. Knows
//!     how to probe from a home bucket and how to compact after a removal,
//!     but never hashes; callers supply home buckets.
//!   - OpenHashMap<K, V, S, E>: hashing, growth and the public API.
//!     `S: BuildHasher` produces raw hashes, `E: KeyEq<K>` compares keys.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (the reentrancy tracker holds a raw
//!   pointer marker).
//! - Keys are unique. `try_emplace` is first-insertion-wins; strict
//!   `insert` reports `InsertError::DuplicateKey`.
//! - `len <= floor(capacity * 3 / 5)` is restored before every insertion
//!   by growing to the next capacity in `capacity::PRIME_CAPACITIES`.
//! - Every live entry is reachable from its home bucket through occupied
//!   slots only. Removal restores this by shifting later entries of the
//!   broken run backwards.
//!
//! Bucket selection
//! - The raw hash goes through an avalanche mix (xor-shift, then a
//!   Fibonacci multiply) before the modulus by capacity. Identity hashes on
//!   small integers therefore still spread over the table.
//!
//! Growth
//! - A map built with `new()` owns no slots. Inserting while
//!   `len >= grow_threshold(capacity)` allocates the next table and moves
//!   every entry across, rehashing each key once. An explicit
//!   `with_capacity(n)` is used as given; growth then picks the first
//!   prime above `n`.
//! - Growth hashes every key against the old table before moving
//!   anything. The move that follows runs no user code, so a hasher that
//!   panics mid-growth leaves the map with its old table and every entry.
//!
//! Removal and compaction
//! - After the slot at `gap` is emptied, the scan walks forward until the
//!   next empty slot. An entry at `pos` whose home bucket is `home` moves
//!   into the gap when the gap lies on the cyclic range `[home, pos)`; the
//!   vacated `pos` becomes the new gap. The walk is iterative and
//!   wraps around the end of the table.
//!
//! Reentrancy policy
//! - User `Hash` and `KeyEq` code runs while a probe, growth or compaction
//!   is in flight. Each such section holds a debug-only scope; reentering
//!   the same map from user code during that window panics in debug
//!   builds. Returned borrows and cursors never hold the scope, and
//!   `Drop` for removed keys and values runs after the table is
//!   consistent again.
//!
//! Cursors
//! - `Cursor`/`CursorMut` are slot indices bound to a borrow of the map.
//!   The end position equals `capacity()`. Since the borrow covers the
//!   whole map, no cursor can observe growth.
//!
//! Notes and non-goals
//! - No heterogeneous (`Borrow`-based) lookup; queries take `&K`.
//! - No concurrency, no persistence, no shrinking on removal.
//! - Iteration order is slot order and changes on growth.

pub mod capacity;
mod cursor;
mod error;
pub mod fixed_buffer;
pub mod iter;
mod key_eq;
mod occupancy;
mod open_hash_map;
mod open_hash_map_proptest;
mod reentrancy;
mod slot_table;

// Public surface
pub use cursor::{Cursor, CursorMut};
pub use error::InsertError;
pub use iter::{Drain, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use key_eq::{EqualTo, KeyEq};
pub use open_hash_map::OpenHashMap;
