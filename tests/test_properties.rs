use phrase_large_table::{
    make_token, MemoryChunk, PhraseArrayLevel, PhraseBitmapIndex, PhraseIndexError, PhraseTokens, Ucs4,
    PHRASE_INDEX_LIBRARY_COUNT,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<Ucs4>, u32),
    Remove(Vec<Ucs4>, u32),
}

// A small alphabet spread over a few buckets keeps collisions frequent.
fn code_point() -> impl Strategy<Value = Ucs4> {
    prop_oneof![
        0x4E00u32..0x4E04,
        0x4F60u32..0x4F63,
        0x0061u32..0x0063,
        Just(0x2_4E00u32),
    ]
}

fn phrase() -> impl Strategy<Value = Vec<Ucs4>> {
    prop::collection::vec(code_point(), 1..5)
}

fn token() -> impl Strategy<Value = u32> {
    (0..PHRASE_INDEX_LIBRARY_COUNT, 0u32..8).prop_map(|(lib, local)| make_token(lib, local))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (phrase(), token()).prop_map(|(p, t)| Op::Add(p, t)),
        1 => (phrase(), token()).prop_map(|(p, t)| Op::Remove(p, t)),
    ]
}

fn lookup(index: &PhraseBitmapIndex, key: &[Ucs4]) -> Vec<u32> {
    let mut tokens = PhraseTokens::all_enabled();
    index.search(key, &mut tokens);
    let mut found: Vec<u32> = tokens.iter().collect();
    found.sort_unstable();
    found
}

/// Applies `ops` to an index and to a plain multiset model, checking each result.
fn apply(ops: &[Op]) -> (PhraseBitmapIndex, Vec<(Vec<Ucs4>, u32)>) {
    let mut index = PhraseBitmapIndex::new();
    let mut model: Vec<(Vec<Ucs4>, u32)> = Vec::new();

    for op in ops {
        match op {
            Op::Add(p, t) => {
                index.add_index(p, *t).unwrap();
                model.push((p.clone(), *t));
            }
            Op::Remove(p, t) => {
                let result = index.remove_index(p, *t);
                match model.iter().position(|(mp, mt)| mp == p && mt == t) {
                    Some(i) => {
                        assert_eq!(result, Ok(()));
                        model.swap_remove(i);
                    }
                    None => assert_eq!(result, Err(PhraseIndexError::ItemNotFound)),
                }
            }
        }
    }
    (index, model)
}

fn all_sorted(index: &PhraseBitmapIndex) -> bool {
    (0..256)
        .filter_map(|b| index.bucket(b))
        .all(|bucket| (1..=bucket.max_length()).filter_map(|l| bucket.array(l)).all(|a| a.is_sorted()))
}

proptest! {
    #[test]
    fn arrays_stay_sorted(ops in prop::collection::vec(op(), 0..80)) {
        let (index, model) = apply(&ops);
        prop_assert!(all_sorted(&index));
        prop_assert_eq!(index.len(), model.len());
    }

    #[test]
    fn search_matches_model(ops in prop::collection::vec(op(), 0..80), probe in phrase()) {
        let (index, model) = apply(&ops);
        let mut expected: Vec<u32> = model
            .iter()
            .filter(|(p, _)| *p == probe)
            .map(|(_, t)| *t)
            .collect();
        expected.sort_unstable();
        prop_assert_eq!(lookup(&index, &probe), expected);
    }

    #[test]
    fn added_token_is_found_until_removed(p in phrase(), t in token(), others in prop::collection::vec((phrase(), token()), 0..20)) {
        let mut index = PhraseBitmapIndex::new();
        for (q, qt) in &others {
            index.add_index(q, *qt).unwrap();
        }
        index.add_index(&p, t).unwrap();
        prop_assert!(lookup(&index, &p).contains(&t));

        index.remove_index(&p, t).unwrap();
        let remaining = others.iter().filter(|(q, qt)| *q == p && *qt == t).count();
        let found = lookup(&index, &p).iter().filter(|&&x| x == t).count();
        prop_assert_eq!(found, remaining);
    }

    #[test]
    fn store_load_is_stable(ops in prop::collection::vec(op(), 0..60), probes in prop::collection::vec(phrase(), 1..10)) {
        let (index, _) = apply(&ops);
        let mut first = MemoryChunk::new();
        index.store(&mut first, 0).unwrap();

        let shared = first.clone().into_shared();
        let mut loaded = PhraseBitmapIndex::new();
        loaded.load(&shared, 0, shared.len()).unwrap();

        for probe in &probes {
            let mut a = PhraseTokens::all_enabled();
            let mut b = PhraseTokens::all_enabled();
            prop_assert_eq!(index.search(probe, &mut a), loaded.search(probe, &mut b));
            prop_assert_eq!(a, b);
        }

        let mut second = MemoryChunk::new();
        loaded.store(&mut second, 0).unwrap();
        prop_assert_eq!(first, second);
    }
}
