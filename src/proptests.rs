use super::*;

use crate::node::{Link, Slot};
use crate::pool::ROOT;
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Structural invariants of a finished array:
/// - every occupied non-root slot is `base ^ c` of its parent for one byte `c`
/// - free slots form a consistent doubly-linked list
/// - keys reachable through terminator slots and suffix nodes match `len`
fn validate_array(da: &DoubleArray) {
    let nodes = da.nodes();
    assert_eq!(nodes.len() % 256, 0, "array must grow in whole blocks");

    let mut keys = 0usize;
    let mut occupied = 0usize;
    if let Link::Suffix { .. } = nodes[ROOT as usize].link() {
        keys += 1;
    }

    for (i, node) in nodes.iter().enumerate().skip(1) {
        match node.slot() {
            Slot::Free { next, prev } => {
                assert!(nodes[next as usize].is_free(), "free {i} links to used {next}");
                assert!(nodes[prev as usize].is_free(), "free {i} links to used {prev}");
                assert_eq!(nodes[next as usize].prev_free() as usize, i);
                assert_eq!(nodes[prev as usize].next_free() as usize, i);
            }
            Slot::Occupied { parent } => {
                occupied += 1;
                let Link::Branch { base } = nodes[parent as usize].link() else {
                    panic!("slot {i} hangs below suffix node {parent}");
                };
                let edge = base ^ i as u32;
                assert!(edge < 256, "slot {i} is not a child of {parent}");
                if edge == 0 {
                    keys += 1;
                } else if let Link::Suffix { tail } = node.link() {
                    let (suffix, _) = da.tail_entry(tail);
                    assert!(!suffix.contains(&0));
                    keys += 1;
                }
            }
        }
    }

    assert_eq!(occupied, da.num_nodes(), "num_nodes must count occupied slots");
    assert_eq!(keys, da.num_keys(), "reachable keys must match num_keys");
    assert_eq!(da.alloc_bytes(), nodes.len() * 8 + da.tail_len());
}

fn build_from(model: &BTreeMap<Vec<u8>, i32>) -> DoubleArray {
    let keys: Vec<&Vec<u8>> = model.keys().collect();
    let values: Vec<i32> = model.values().copied().collect();
    DoubleArray::build(&keys, &values).unwrap()
}

fn expected_prefixes(model: &BTreeMap<Vec<u8>, i32>, probe: &[u8]) -> Vec<(Vec<u8>, i32)> {
    model
        .iter()
        .filter(|(k, _)| probe.starts_with(k))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn expected_predictions(model: &BTreeMap<Vec<u8>, i32>, probe: &[u8]) -> Vec<(Vec<u8>, i32)> {
    model
        .range(probe.to_vec()..)
        .take_while(|(k, _)| k.starts_with(probe))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet forces shared prefixes and deep branching.
    let byte = prop::sample::select(vec![1u8, b'a', b'b', b'c', 0x7f, 0xff]);
    prop::collection::vec(byte, 0..=12)
}

fn probe_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Includes 0 and a byte that no key uses.
    let byte = prop::sample::select(vec![0u8, 1, b'a', b'b', b'c', b'd', 0x7f, 0xff]);
    prop::collection::vec(byte, 0..=14)
}

fn model_strategy() -> impl Strategy<Value = BTreeMap<Vec<u8>, i32>> {
    prop::collection::btree_map(key_strategy(), any::<i32>(), 1..=300)
}

#[derive(Clone, Debug, Arbitrary)]
enum Query {
    Lookup(#[proptest(strategy = "probe_strategy()")] Vec<u8>),
    Prefix(#[proptest(strategy = "probe_strategy()")] Vec<u8>),
    Predictive(#[proptest(strategy = "probe_strategy()")] Vec<u8>),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(model in model_strategy(), queries in prop::collection::vec(any::<Query>(), 0..=200)) {
        let da = build_from(&model);
        validate_array(&da);

        for (k, v) in &model {
            prop_assert_eq!(da.lookup(k), Some(*v));
        }

        for query in queries {
            match query {
                Query::Lookup(probe) => {
                    prop_assert_eq!(da.lookup(&probe), model.get(&probe).copied());
                }
                Query::Prefix(probe) => {
                    let got: Vec<(Vec<u8>, i32)> = da.prefix_iter(&probe).collect();
                    prop_assert_eq!(got, expected_prefixes(&model, &probe));
                }
                Query::Predictive(probe) => {
                    let got: Vec<(Vec<u8>, i32)> = da.predictive_iter(&probe).collect();
                    prop_assert_eq!(got, expected_predictions(&model, &probe));
                }
            }
        }

        let got: Vec<(Vec<u8>, i32)> = da.iter().collect();
        let expected: Vec<(Vec<u8>, i32)> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_unsorted_rejected(model in prop::collection::btree_map(key_strategy(), any::<i32>(), 2..=50), at in any::<prop::sample::Index>()) {
        let mut keys: Vec<Vec<u8>> = model.keys().cloned().collect();
        let values: Vec<i32> = model.values().copied().collect();
        let i = 1 + at.index(keys.len() - 1);
        keys.swap(i - 1, i);
        prop_assert_eq!(
            DoubleArray::build(&keys, &values).unwrap_err(),
            BuildError::UnsortedKeys { index: i }
        );
    }

    #[test]
    fn prop_duplicate_rejected(model in prop::collection::btree_map(key_strategy(), any::<i32>(), 1..=50), at in any::<prop::sample::Index>()) {
        let mut keys: Vec<Vec<u8>> = model.keys().cloned().collect();
        let mut values: Vec<i32> = model.values().copied().collect();
        let i = at.index(keys.len());
        keys.insert(i, keys[i].clone());
        values.insert(i, values[i]);
        prop_assert_eq!(
            DoubleArray::build(&keys, &values).unwrap_err(),
            BuildError::DuplicateKey { index: i + 1 }
        );
    }

    #[test]
    fn prop_terminator_rejected(model in prop::collection::btree_map(key_strategy(), any::<i32>(), 1..=50), at in any::<prop::sample::Index>()) {
        let mut keys: Vec<Vec<u8>> = model.keys().cloned().collect();
        let values: Vec<i32> = model.values().copied().collect();
        let i = at.index(keys.len());
        // Appending a zero keeps the order intact, so only the byte is wrong.
        let position = keys[i].len();
        keys[i].push(0);
        prop_assert_eq!(
            DoubleArray::build(&keys, &values).unwrap_err(),
            BuildError::ReservedByteInKey { index: i, position }
        );
    }
}

fn for_each_subset<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    for mask in 1u32..(1 << items.len()) {
        let subset = items
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, item)| item.clone())
            .collect();
        f(subset);
    }
}

#[test]
fn exhaustive_small_key_sets() {
    // Sorted universe mixing terminal keys, shared prefixes and tails.
    let universe: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"b".to_vec(),
        b"ba".to_vec(),
        b"bab".to_vec(),
        b"c".to_vec(),
    ];
    let probes: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abcd".to_vec(),
        b"b".to_vec(),
        b"bab".to_vec(),
        b"ca".to_vec(),
        b"d".to_vec(),
    ];

    for_each_subset(&universe, |keys| {
        let model: BTreeMap<Vec<u8>, i32> = keys
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k, i as i32 * 10 - 5))
            .collect();
        let da = build_from(&model);
        validate_array(&da);

        for probe in &probes {
            assert_eq!(da.lookup(probe), model.get(probe).copied(), "lookup {probe:?}");
            let got: Vec<_> = da.prefix_iter(probe).collect();
            assert_eq!(got, expected_prefixes(&model, probe), "prefix {probe:?}");
            let got: Vec<_> = da.predictive_iter(probe).collect();
            assert_eq!(got, expected_predictions(&model, probe), "predictive {probe:?}");
        }
    });
}

#[test]
fn deep_keys_do_not_recurse() {
    // Two keys sharing a long prefix branch only at the very end.
    let mut a = vec![b'x'; 100_000];
    let mut b = a.clone();
    a.push(b'a');
    b.push(b'b');
    let da = DoubleArray::build(&[&a, &b], &[1, 2]).unwrap();
    validate_array(&da);
    assert_eq!(da.lookup(&a), Some(1));
    assert_eq!(da.lookup(&b), Some(2));
    assert_eq!(da.iter().count(), 2);
    assert_eq!(da.prefix_iter(&b).count(), 1);
}
