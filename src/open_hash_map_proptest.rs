#![cfg(test)]

// Property tests for OpenHashMap kept inside the crate so they can check
// the probe invariant on the internal slot table after every operation.

use crate::{InsertError, OpenHashMap};
use core::fmt::Debug;
use core::hash::{BuildHasher, Hash, Hasher};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    TryEmplace(usize, i32),
    Insert(usize, i32),
    InsertOrAssign(usize, i32),
    Remove(usize),
    Find(usize),
    Mutate(usize, i32),
    Retain(i32),
    Iterate,
    Reserve(usize),
    Clear,
}

fn arb_ops(pool_len: usize, max_ops: usize) -> impl Strategy<Value = Vec<OpI>> {
    let idx = 0..pool_len;
    let op = prop_oneof![
        4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::TryEmplace(i, v)),
        2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
        2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertOrAssign(i, v)),
        3 => idx.clone().prop_map(OpI::Remove),
        2 => idx.clone().prop_map(OpI::Find),
        1 => (idx, any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
        1 => (2i32..5).prop_map(OpI::Retain),
        1 => Just(OpI::Iterate),
        1 => (0usize..20).prop_map(OpI::Reserve),
        1 => Just(OpI::Clear),
    ];
    proptest::collection::vec(op, 1..max_ops)
}

fn arb_string_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let len = pool.len();
        arb_ops(len, 80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Small integer keys under an identity hash pile into neighbouring buckets,
// so runs wrap around the end of small tables.
fn arb_dense_scenario() -> impl Strategy<Value = (usize, Vec<u16>, Vec<OpI>)> {
    (
        proptest::sample::select(vec![0usize, 1, 2, 3, 5, 7, 10]),
        proptest::collection::vec(0u16..32, 1..=24),
    )
        .prop_flat_map(|(capacity, pool)| {
            let len = pool.len();
            arb_ops(len, 120).prop_map(move |ops| (capacity, pool.clone(), ops))
        })
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `try_emplace` is first-insertion-wins and runs the factory only on insert.
// - Strict `insert` fails with `DuplicateKey` exactly when the key is present.
// - `insert_or_assign` returns the previous value.
// - `remove` returns the model's value; lookups agree with the model.
// - `retain` visits each live entry exactly once.
// - After every op: len parity, load factor, and every entry reachable from
//   its home bucket.
fn run_state_machine<K, S>(
    mut sut: OpenHashMap<K, i32, S>,
    pool: &[K],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    K: Clone + Debug + Eq + Hash + Ord,
    S: BuildHasher,
{
    let mut model: HashMap<K, i32> = HashMap::new();
    let factory_calls = Rc::new(Cell::new(0));

    for op in ops {
        let capacity_before = sut.capacity();
        match op {
            OpI::TryEmplace(i, v) => {
                let k = pool[i].clone();
                let already = model.get(&k).copied();
                let counter = factory_calls.clone();
                let before = counter.get();
                let (c, inserted) = sut.try_emplace_with(k.clone(), move || {
                    counter.set(counter.get() + 1);
                    v
                });
                prop_assert_eq!(c.key(), Some(&k));
                let stored = c.value().copied();
                match already {
                    Some(old) => {
                        prop_assert!(!inserted);
                        prop_assert_eq!(stored, Some(old), "existing value must be kept");
                        prop_assert_eq!(factory_calls.get(), before, "factory ran on duplicate");
                    }
                    None => {
                        prop_assert!(inserted);
                        prop_assert_eq!(stored, Some(v));
                        prop_assert_eq!(factory_calls.get(), before + 1);
                        model.insert(k, v);
                    }
                }
            }
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.insert(k.clone(), v) {
                    Ok(slot) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        prop_assert_eq!(*slot, v);
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when key exists");
                    }
                }
            }
            OpI::InsertOrAssign(i, v) => {
                let k = pool[i].clone();
                let prev = sut.insert_or_assign(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove_entry(k);
                match model.remove(k) {
                    Some(mv) => {
                        let (kk, vv) = removed.expect("present in model");
                        prop_assert_eq!(&kk, k);
                        prop_assert_eq!(vv, mv);
                    }
                    None => prop_assert!(removed.is_none()),
                }
                prop_assert_eq!(sut.capacity(), capacity_before, "removal never shrinks");
            }
            OpI::Find(i) => {
                let k = &pool[i];
                let c = sut.find(k);
                prop_assert_eq!(c.is_some(), model.contains_key(k));
                if let Some(c) = c {
                    prop_assert_eq!(c.key(), Some(k));
                    prop_assert_eq!(c.value(), model.get(k));
                }
                prop_assert_eq!(sut.get(k), model.get(k));
                prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(v) = sut.get_mut(k) {
                    *v = v.wrapping_add(d);
                    let mv = model.get_mut(k).expect("present in model");
                    *mv = mv.wrapping_add(d);
                } else {
                    prop_assert!(!model.contains_key(k));
                }
            }
            OpI::Retain(m) => {
                let mut visited = Vec::new();
                sut.retain(|k, v| {
                    visited.push(k.clone());
                    v.rem_euclid(m) != 0
                });
                let visited_set: BTreeSet<K> = visited.iter().cloned().collect();
                prop_assert_eq!(visited.len(), visited_set.len(), "entry visited twice");
                let m_keys: BTreeSet<K> = model.keys().cloned().collect();
                prop_assert_eq!(visited_set, m_keys);
                model.retain(|_, v| v.rem_euclid(m) != 0);
            }
            OpI::Iterate => {
                let s_keys: Vec<K> = sut.keys().cloned().collect();
                let s_set: BTreeSet<K> = s_keys.iter().cloned().collect();
                let m_keys: BTreeSet<K> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys.len(), s_set.len());
                prop_assert_eq!(s_set, m_keys);
                prop_assert_eq!(sut.iter().len(), model.len());
            }
            OpI::Reserve(n) => {
                sut.reserve(n);
                prop_assert!(
                    sut.len() + n <= crate::capacity::grow_threshold(sut.capacity()),
                    "reserve left no room for {} more",
                    n
                );
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), capacity_before, "clear keeps capacity");
            }
        }

        // Post-conditions after each op
        sut.assert_probe_invariant();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.len() <= sut.capacity());
        prop_assert!(sut.capacity() >= capacity_before, "capacity never shrinks");
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
    }
    Ok(())
}

// Collision variant: every key hashes alike, so the whole map is one run.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

#[derive(Clone, Default)]
struct IdentityBuildHasher;
struct IdentityHasher(u64);
impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher(0)
    }
}
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u16(&mut self, n: u16) {
        self.0 = u64::from(n);
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_string_scenario()) {
        run_state_machine(OpenHashMap::<String, i32>::new(), &pool, ops)?;
    }

    // Same invariants under worst-case collision behavior. Every removal
    // compacts the single run, including across the end of the table.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_string_scenario()) {
        let sut = OpenHashMap::<String, i32, ConstBuildHasher>::with_hasher(ConstBuildHasher);
        run_state_machine(sut, &pool, ops)?;
    }

    // Identity hashes on a small key range with tiny, non-prime starting
    // capacities: runs wrap around and compaction crosses index 0.
    #[test]
    fn prop_state_machine_dense_wraparound((capacity, pool, ops) in arb_dense_scenario()) {
        let sut = OpenHashMap::<u16, i32, IdentityBuildHasher>::with_capacity_and_hasher(
            capacity,
            IdentityBuildHasher,
        );
        run_state_machine(sut, &pool, ops)?;
    }

    // Cursor removal leaves exactly the kept entries and a consistent table.
    #[test]
    fn prop_cursor_remove_current_matches_filter(
        keys in proptest::collection::btree_set(0u16..64, 0..40),
        m in 2u16..5,
    ) {
        let mut sut = OpenHashMap::<u16, u16, IdentityBuildHasher>::with_hasher(IdentityBuildHasher);
        for &k in &keys {
            sut.try_emplace(k, k);
        }
        let mut c = sut.cursor_front_mut();
        while !c.is_end() {
            if c.value().is_some_and(|v| v % m == 0) {
                let (k, v) = c.remove_current().expect("cursor not at end");
                prop_assert_eq!(k % m, 0);
                prop_assert_eq!(k, v);
            } else {
                c.move_next();
            }
        }
        sut.assert_probe_invariant();
        let expected: BTreeSet<u16> = keys.iter().copied().filter(|k| k % m != 0).collect();
        let actual: BTreeSet<u16> = sut.keys().copied().collect();
        prop_assert_eq!(actual, expected);
    }
}
