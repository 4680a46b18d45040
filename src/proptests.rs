use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Check every structural invariant of `t` from scratch: parent links,
/// subtree sizes, balance factors against recomputed heights, the AVL bound,
/// key order and that every arena slot is reachable.
fn validate_table<K: Ord + std::fmt::Debug, V>(t: &AvlTable<K, V>) {
    fn walk<K, V>(
        t: &AvlTable<K, V>,
        link: Option<usize>,
        parent: Option<usize>,
        seen: &mut usize,
    ) -> (usize, i32) {
        let Some(i) = link else {
            return (0, 0);
        };
        *seen += 1;
        let node = &t.nodes[i];
        assert_eq!(node.parent, parent, "parent link of node {i}");
        let (ls, lh) = walk(t, node.left, Some(i), seen);
        let (rs, rh) = walk(t, node.right, Some(i), seen);
        assert_eq!(node.size, ls + rs + 1, "subtree size of node {i}");
        assert_eq!(i32::from(node.balance), lh - rh, "balance factor of node {i}");
        assert!((lh - rh).abs() <= 1, "node {i} is out of balance: {}", lh - rh);
        (node.size, lh.max(rh) + 1)
    }

    let mut seen = 0;
    let (size, _) = walk(t, t.root, None, &mut seen);
    assert_eq!(size, t.len(), "root size must match len");
    assert_eq!(seen, t.nodes.len(), "every arena slot must be reachable");

    let keys: Vec<&K> = t.iter().map(|(k, _)| k).collect();
    assert_eq!(keys.len(), t.len());
    for pair in keys.windows(2) {
        assert!(pair[0] <= pair[1], "keys out of order: {:?} > {:?}", pair[0], pair[1]);
    }
}

type Model = Vec<(u8, u16)>;

fn lower_bound(m: &Model, key: u8) -> usize {
    m.partition_point(|(k, _)| *k < key)
}

fn upper_bound(m: &Model, key: u8) -> usize {
    m.partition_point(|(k, _)| *k <= key)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 4)]
    Insert(u8, u16),
    Prepend(u8, u16),
    #[proptest(weight = 2)]
    Put(u8, u16),
    InsertAt(usize, u16),
    #[proptest(weight = 2)]
    RemoveAt(usize, #[proptest(strategy = "1usize..5")] usize),
    Remove(u8),
    TakeAt(usize),
    PutAt(usize, u16),
}

fn apply(t: &mut AvlTable<u8, u16>, m: &mut Model, op: Op) -> Result<()> {
    match op {
        Op::Insert(key, value) => {
            let pos = upper_bound(m, key);
            m.insert(pos, (key, value));
            assert_eq!(t.insert(key, value), pos);
        }
        Op::Prepend(key, value) => {
            let pos = lower_bound(m, key);
            m.insert(pos, (key, value));
            assert_eq!(t.prepend(key, value), pos);
        }
        Op::Put(key, value) => {
            let pos = lower_bound(m, key);
            if m.get(pos).map_or(false, |row| row.0 == key) {
                m[pos].1 = value;
            } else {
                m.insert(pos, (key, value));
            }
            assert_eq!(t.put(key, value), pos);
        }
        Op::InsertAt(pick, value) => {
            let rank = pick % (m.len() + 1);
            // Reuse a neighbour's key so the order stays intact.
            let key = m.get(rank).or(m.last()).map_or(0, |row| row.0);
            m.insert(rank, (key, value));
            assert_eq!(t.insert_at(rank, key, value)?, rank);
        }
        Op::RemoveAt(pick, count) => {
            let rank = pick % (m.len() + 1);
            let end = (rank + count).min(m.len());
            m.drain(rank..end);
            assert_eq!(t.remove_at(rank, count), end - rank);
        }
        Op::Remove(key) => {
            let range = lower_bound(m, key)..upper_bound(m, key);
            let expected = range.len();
            m.drain(range);
            assert_eq!(t.remove(&key), expected);
        }
        Op::TakeAt(pick) => {
            if m.is_empty() {
                assert!(t.take_at(0).is_err());
            } else {
                let rank = pick % m.len();
                assert_eq!(t.take_at(rank)?, m.remove(rank));
            }
        }
        Op::PutAt(pick, value) => {
            if !m.is_empty() {
                let rank = pick % m.len();
                let old = std::mem::replace(&mut m[rank].1, value);
                assert_eq!(t.put_at(rank, value)?, old);
            }
        }
    }
    Ok(())
}

fn contents(t: &AvlTable<u8, u16>) -> Model {
    t.iter().map(|(k, v)| (*k, *v)).collect()
}

fn byte_key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet with both extreme byte values so prefix bounds hit the
    // 0xFF carry case often.
    prop::collection::vec(prop::sample::select(vec![0x00u8, 0x01, 0x7f, 0xfe, 0xff]), 0..=4)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_sorted_vec(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mut t: AvlTable<u8, u16> = AvlTable::new();
        let mut m: Model = Vec::new();

        for op in ops {
            apply(&mut t, &mut m, op).unwrap();
            validate_table(&t);
            prop_assert_eq!(t.len(), m.len());
        }

        prop_assert_eq!(contents(&t), m);
    }

    #[test]
    fn prop_rank_and_cursor_agree(keys in prop::collection::vec(any::<u8>(), 0..=300)) {
        let t: AvlTable<u8, usize> = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        validate_table(&t);

        let mut cursor = t.begin();
        for rank in 0..t.len() {
            prop_assert_eq!(cursor.rank(), rank);
            prop_assert_eq!(cursor.row(), t.row_at(rank).ok());
            prop_assert_eq!(t.at(rank).unwrap().row(), cursor.row());
            cursor.move_next();
        }
        prop_assert!(cursor.is_back());

        for rank in (0..t.len()).rev() {
            prop_assert!(cursor.move_prev());
            prop_assert_eq!(cursor.row(), t.row_at(rank).ok());
        }
        prop_assert!(cursor.is_front());
    }

    #[test]
    fn prop_bounds_bracket_duplicates(
        keys in prop::collection::vec(0u8..16, 0..=200),
        probe in 0u8..18,
    ) {
        let mut m: Model = Vec::new();
        let mut t: AvlTable<u8, u16> = AvlTable::new();
        for (i, key) in keys.into_iter().enumerate() {
            let pos = upper_bound(&m, key);
            m.insert(pos, (key, i as u16));
            t.insert(key, i as u16);
        }

        let lo = t.lower(&probe);
        let hi = t.upper(&probe);
        prop_assert_eq!(lo.rank(), lower_bound(&m, probe));
        prop_assert_eq!(hi.rank(), upper_bound(&m, probe));
        prop_assert_eq!(t.count(&probe), hi.rank() - lo.rank());
        prop_assert_eq!(t.contains(&probe), hi.rank() > lo.rank());

        // Duplicates come out in insertion order.
        let run: Vec<u16> = t.all(&probe).map(|(_, v)| *v).collect();
        let expected: Vec<u16> = m[lo.rank()..hi.rank()].iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(run, expected);
    }

    #[test]
    fn prop_partial_tuple_keys(
        rows in prop::collection::vec((0u8..6, 0u8..6), 0..=150),
        a in 0u8..7,
    ) {
        let t: AvlTable<(u8, u8), ()> = rows.iter().map(|k| (*k, ())).collect();
        validate_table(&t);

        let mut sorted = rows.clone();
        sorted.sort();
        let expected = sorted.iter().filter(|(x, _)| *x == a).count();
        prop_assert_eq!(t.count(&(a,)), expected);
        prop_assert_eq!(t.lower(&(a,)).rank(), sorted.partition_point(|(x, _)| *x < a));
        prop_assert!(t.all(&(a,)).all(|((x, _), _)| *x == a));
        prop_assert_eq!(t.count(&()), rows.len());
    }

    #[test]
    fn prop_store_prefix_bounds(
        keys in prop::collection::btree_set(byte_key_strategy(), 0..=60),
        prefix in byte_key_strategy(),
    ) {
        let mut store = Store::new();
        for key in &keys {
            store.put(key, Box::new(key.len() as u64)).unwrap();
        }
        let sorted: Vec<&Vec<u8>> = keys.iter().collect();

        let range = store.prefix_range(&prefix);
        let matching: Vec<&Vec<u8>> =
            sorted.iter().copied().filter(|k| k.starts_with(&prefix)).collect();
        prop_assert_eq!(range.len(), matching.len());
        prop_assert_eq!(range.start, sorted.partition_point(|k| k.as_slice() < prefix.as_slice()));
        let found: Vec<&[u8]> = store.prefix_iter(&prefix).map(|(k, _)| k).collect();
        let expected: Vec<&[u8]> = matching.iter().map(|k| k.as_slice()).collect();
        prop_assert_eq!(found, expected);

        let erased = store.prefix_erase(&prefix).unwrap();
        prop_assert_eq!(erased, matching.len());
        prop_assert_eq!(store.len(), keys.len() - matching.len());
        prop_assert!(store.iter().all(|(k, _)| !k.starts_with(&prefix)));
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7];

    for_each_permutation(&keys, |perm| {
        let mut t: AvlTable<u8, ()> = AvlTable::new();
        for (i, k) in perm.into_iter().enumerate() {
            t.insert(k, ());
            assert_eq!(t.len(), i + 1);
            validate_table(&t);
        }
        let got: Vec<u8> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, keys);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7];

    // Insert in a fixed order, then remove in all permutations.
    let base: AvlTable<u8, ()> = keys.iter().map(|k| (*k, ())).collect();
    validate_table(&base);

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut remaining = keys.clone();
        for k in perm {
            assert_eq!(t.remove(&k), 1);
            remaining.retain(|r| *r != k);
            validate_table(&t);
            let got: Vec<u8> = t.iter().map(|(k, _)| *k).collect();
            assert_eq!(got, remaining);
        }
        assert!(t.is_empty());
        assert!(t.root.is_none());
    });
}

#[test]
fn exhaustive_remove_with_duplicates() {
    // Every removal order of ranks from a table with a run of equal keys.
    let base: AvlTable<u8, u8> =
        [(2, 0), (1, 1), (2, 2), (3, 3), (2, 4), (1, 5)].into_iter().collect();
    let expected: Vec<(u8, u8)> = base.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(expected, [(1, 1), (1, 5), (2, 0), (2, 2), (2, 4), (3, 3)]);

    let values: Vec<u8> = (0..6).collect();
    for_each_permutation(&values, |perm| {
        let mut t = base.clone();
        let mut m = expected.clone();
        for v in perm {
            let rank = m.iter().position(|row| row.1 == v).unwrap();
            assert_eq!(t.take_at(rank).unwrap(), m.remove(rank));
            validate_table(&t);
        }
        assert!(t.is_empty());
    });
}

#[test]
fn seeded_random_stress() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut t: AvlTable<u8, u16> = AvlTable::new();
    let mut m: Model = Vec::new();

    for _ in 0..20_000u32 {
        let grow = m.len() < 64 || rng.gen_bool(0.55);
        let op = if grow {
            match rng.gen_range(0..4) {
                0 => Op::Insert(rng.gen(), rng.gen()),
                1 => Op::Prepend(rng.gen(), rng.gen()),
                2 => Op::InsertAt(rng.gen(), rng.gen()),
                _ => Op::Put(rng.gen(), rng.gen()),
            }
        } else {
            match rng.gen_range(0..4) {
                0 => Op::RemoveAt(rng.gen(), rng.gen_range(1..5)),
                1 => Op::Remove(rng.gen()),
                2 => Op::PutAt(rng.gen(), rng.gen()),
                _ => Op::TakeAt(rng.gen()),
            }
        };
        apply(&mut t, &mut m, op).unwrap();
        validate_table(&t);
    }

    assert_eq!(contents(&t), m);
}
