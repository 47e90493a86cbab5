//! Integration test: single-threaded list behaviour end to end.
//!
//! Walks the documented lifecycle (init, inserts, positional inserts,
//! deletes, searches, ranged display, cleanup) and replays seeded op
//! sequences against a `Vec` model.

use arenalist_list::{ConcurrentList, ListError, NODE_SIZE};
use arenalist_test_utils::{check_list, list_with, op_sequence, seeded_values, Op};

#[test]
fn three_inserts_fit_a_64_byte_pool() {
    let list = ConcurrentList::init(64).unwrap();
    for v in [1, 2, 3] {
        list.insert(v).unwrap();
    }
    assert_eq!(list.render(None, None), "[1, 2, 3]");

    list.delete(2).unwrap();
    assert_eq!(list.render(None, None), "[1, 3]");
    assert_eq!(list.search(2), Err(ListError::NotFound));
    check_list(&list).unwrap();

    list.cleanup();
    assert_eq!(list.render(None, None), "[]");
}

#[test]
fn positional_inserts_build_expected_order() {
    let list = list_with(&[10, 40], 256);
    let ten = list.search(10).unwrap();
    let forty = list.search(40).unwrap();

    let twenty = list.insert_after(Some(ten), 20).unwrap();
    list.insert_before(Some(forty), 30).unwrap();
    list.insert_before(Some(ten), 5).unwrap();
    list.insert_after(Some(forty), 50).unwrap();

    assert_eq!(list.values(), vec![5, 10, 20, 30, 40, 50]);
    assert_eq!(list.render(Some(twenty), Some(forty)), "[20, 30, 40]");
    check_list(&list).unwrap();
}

#[test]
fn freed_slots_are_reused_first_fit() {
    let list = ConcurrentList::init(NODE_SIZE * 3).unwrap();
    let a = list.insert(1).unwrap();
    list.insert(2).unwrap();
    list.insert(3).unwrap();
    list.delete(1).unwrap();

    // The hole at offset 0 is the first gap that fits.
    let d = list.insert(4).unwrap();
    assert_eq!(d.offset(), a.offset());
    assert_eq!(list.values(), vec![2, 3, 4]);
    assert_eq!(list.get(a), Err(ListError::NullReference));
    check_list(&list).unwrap();
}

#[test]
fn duplicates_are_deleted_head_first() {
    let values = seeded_values(0x5eed, 40, 4);
    let list = list_with(&values, NODE_SIZE * 64);
    let mut model = values.clone();

    for v in seeded_values(0xdead, 40, 4) {
        let expected = model.iter().position(|&m| m == v);
        match expected {
            Some(i) => {
                model.remove(i);
                assert_eq!(list.delete(v), Ok(()));
            }
            None => assert_eq!(list.delete(v), Err(ListError::NotFound)),
        }
        assert_eq!(list.values(), model);
    }
}

#[test]
fn seeded_workloads_match_vec_model() {
    for seed in 0..16u64 {
        let list = ConcurrentList::init(NODE_SIZE * 512).unwrap();
        let mut model: Vec<u16> = Vec::new();

        for op in op_sequence(seed, 300, 12) {
            let result = op.apply(&list);
            match op {
                Op::Insert(v) => {
                    assert_eq!(result, Ok(()), "seed {seed}: {op:?}");
                    model.push(v);
                }
                Op::Delete(v) => match model.iter().position(|&m| m == v) {
                    Some(i) => {
                        model.remove(i);
                        assert_eq!(result, Ok(()), "seed {seed}: {op:?}");
                    }
                    None => assert_eq!(result, Err(ListError::NotFound), "seed {seed}: {op:?}"),
                },
                Op::Search(v) => {
                    let expected = if model.is_empty() {
                        Err(ListError::EmptyList)
                    } else if model.contains(&v) {
                        Ok(())
                    } else {
                        Err(ListError::NotFound)
                    };
                    assert_eq!(result, expected, "seed {seed}: {op:?}");
                }
            }
        }

        assert_eq!(list.values(), model, "seed {seed}");
        check_list(&list).unwrap_or_else(|e| panic!("seed {seed}: {e}"));
    }
}

#[test]
fn operations_after_cleanup_fail_cleanly() {
    let list = list_with(&[1, 2], 64);
    let one = list.search(1).unwrap();
    list.cleanup();

    assert!(list.is_empty());
    assert_eq!(list.search(1), Err(ListError::EmptyList));
    assert_eq!(list.delete(1), Err(ListError::NotFound));
    // Allocation comes first, so a dead pool is reported before the stale
    // reference.
    assert!(matches!(
        list.insert_after(Some(one), 3),
        Err(ListError::AllocationFailed(_))
    ));
    assert_eq!(list.get(one), Err(ListError::NullReference));
    assert!(matches!(list.insert(3), Err(ListError::AllocationFailed(_))));
    assert!(matches!(list.pool_stats(), Err(ListError::Pool(_))));
}
