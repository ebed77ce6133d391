//! Table sizing and bucket selection.

/// Ascending capacities used for growth. Past the last entry the next
/// capacity is `2 * n + 1`.
pub const PRIME_CAPACITIES: [usize; 28] = [
    5, 11, 23, 47, 97, 197, 397, 797, 1597, 3203, 6421, 12853, 25717, 51437, 102877, 205759,
    411527, 823117, 1646237, 3292489, 6584983, 13169977, 26339969, 52679969, 105359939,
    210719881, 421439783, 842879579,
];

/// Load factor numerator: a table grows before `len` would pass
/// `capacity * LOAD_FACTOR_NUM / LOAD_FACTOR_DEN`.
pub const LOAD_FACTOR_NUM: usize = 3;
pub const LOAD_FACTOR_DEN: usize = 5;

/// Next capacity strictly greater than `current`.
pub fn next_capacity(current: usize) -> usize {
    PRIME_CAPACITIES
        .iter()
        .copied()
        .find(|&p| p > current)
        .unwrap_or_else(|| {
            current
                .checked_mul(2)
                .and_then(|n| n.checked_add(1))
                .unwrap_or_else(|| panic!("capacity overflow"))
        })
}

/// `floor(capacity * 3 / 5)` without intermediate overflow. Inserting
/// while `len >= grow_threshold(capacity)` grows the table first.
#[inline]
pub fn grow_threshold(capacity: usize) -> usize {
    capacity / LOAD_FACTOR_DEN * LOAD_FACTOR_NUM
        + capacity % LOAD_FACTOR_DEN * LOAD_FACTOR_NUM / LOAD_FACTOR_DEN
}

/// Smallest capacity reachable from `current` by growth steps that holds
/// `required` entries below the load factor.
pub fn capacity_for(current: usize, required: usize) -> usize {
    let mut capacity = current;
    while grow_threshold(capacity) < required {
        capacity = next_capacity(capacity);
    }
    capacity
}

#[cfg(target_pointer_width = "64")]
#[inline]
fn avalanche(hash: u64) -> usize {
    const MULTIPLIER: u64 = 11400714819323198485;
    let h = hash ^ (hash >> 7) ^ (hash << 11);
    h.wrapping_mul(MULTIPLIER) as usize
}

#[cfg(not(target_pointer_width = "64"))]
#[inline]
fn avalanche(hash: u64) -> usize {
    const MULTIPLIER: u32 = 2654435761;
    let h = hash as u32;
    let h = h ^ (h >> 5) ^ (h << 7);
    h.wrapping_mul(MULTIPLIER) as usize
}

/// Home bucket for a raw hash in a table of `capacity` slots.
///
/// The raw hash is mixed before the modulus, so weak hashers (identity on
/// small integers) still spread across a prime-sized table.
#[inline]
pub fn map_key(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    avalanche(hash) % capacity
}
