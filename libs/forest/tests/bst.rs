#![feature(allocator_api)]

mod common;

use std::cell::Cell;
use std::rc::Rc;

use forest::{BinarySearchTree, FnCompare};
use rand::seq::SliceRandom;

use crate::common::{Model, Tracked};

#[test]
fn bounds_on_duplicates() {
    common::init_tracing();

    let tree: BinarySearchTree<u32> = [0, 1, 1, 2, 3, 5].into_iter().collect();
    tree.assert_valid();

    let lower = tree.lower_bound(&1);
    assert_eq!(lower.get(), Some(&1));
    assert_eq!(lower.peek_prev(), Some(&0));

    let upper = tree.upper_bound(&1);
    assert_eq!(upper.get(), Some(&2));

    assert_eq!(tree.count(&1), 2);
    assert_eq!(tree.count(&4), 0);
    assert_eq!(tree.lower_bound(&4).get(), Some(&5));
    assert!(tree.upper_bound(&5).is_end());

    let (lo, hi) = tree.equal_range_cursors(&1);
    assert_eq!(lo, lower);
    assert_eq!(hi, upper);
}

#[test]
fn lower_bound_is_first_inserted_duplicate() {
    let drops = Rc::new(Cell::new(0));
    let mut tree: BinarySearchTree<Tracked> = BinarySearchTree::new();

    // the middle key is inserted first so later duplicates end up deep in its right subtree
    for (key, tag) in [5, 1, 9, 5, 5, 3, 5, 7].into_iter().zip(0..) {
        tree.insert(Tracked::new(key, tag, &drops));
    }
    tree.assert_valid();

    let probe = Tracked::new(5, u32::MAX, &drops);
    let tags: Vec<_> = tree.equal_range(&probe).map(|t| t.tag).collect();
    assert_eq!(tags, [0, 3, 4, 6]);
    assert_eq!(tree.lower_bound(&probe).get().map(|t| t.tag), Some(0));
    assert_eq!(tree.upper_bound(&probe).get().map(|t| t.key), Some(7));
    assert_eq!(tree.count(&probe), 4);
}

#[test]
fn insert_unique() {
    let mut tree: BinarySearchTree<u32> = [50, 100, 150].into_iter().collect();

    let (cursor, inserted) = tree.insert_unique(100);
    assert!(!inserted);
    assert_eq!(cursor.get(), Some(&100));
    assert_eq!(tree.len(), 3);

    let (cursor, inserted) = tree.insert_unique(101);
    assert!(inserted);
    assert_eq!(cursor.get(), Some(&101));
    assert_eq!(cursor.peek_prev(), Some(&100));
    assert_eq!(cursor.peek_next(), Some(&150));
    assert_eq!(tree.len(), 4);

    let (_, inserted) = tree.insert_unique(0);
    assert!(inserted);
    let (_, inserted) = tree.insert_unique(200);
    assert!(inserted);

    tree.assert_valid();
    assert_eq!(
        tree.iter().copied().collect::<Vec<_>>(),
        [0, 50, 100, 101, 150, 200]
    );
}

#[test]
fn insert_unique_into_empty_tree() {
    let mut tree: BinarySearchTree<u32> = BinarySearchTree::new();
    let (cursor, inserted) = tree.insert_unique(1);
    assert!(inserted);
    assert_eq!(cursor.get(), Some(&1));
    tree.assert_valid();
}

#[test]
fn sorted_input_degenerates() {
    let tree: BinarySearchTree<u32> = (0..100).collect();
    tree.assert_valid();
    assert_eq!(tree.height(), 99);

    // lookups still work on the degenerate shape
    assert!(tree.contains(&99));
    assert_eq!(tree.lower_bound(&42).get(), Some(&42));
}

#[test]
fn random_inserts_and_removals() {
    common::init_tracing();

    let mut rng = rand::rng();
    let mut values: Vec<u32> = (0..500).map(|v| v % 97).collect();
    values.shuffle(&mut rng);

    let mut tree: BinarySearchTree<u32> = BinarySearchTree::new();
    let mut model = Model::default();

    for &value in &values {
        tree.insert(value);
        model.insert(value);
    }
    tree.assert_valid();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), model.0);

    values.shuffle(&mut rng);
    for &value in values.iter().take(300) {
        assert_eq!(tree.remove(&value), model.remove(value));
        tree.assert_valid();
    }

    assert_eq!(tree.len(), model.0.len());
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), model.0);
    assert_eq!(
        tree.iter().rev().copied().collect::<Vec<_>>(),
        model.0.iter().rev().copied().collect::<Vec<_>>()
    );
    for key in 0..97 {
        assert_eq!(tree.count(&key), model.count(key));
    }
}

#[test]
fn clear_is_idempotent() {
    let drops = Rc::new(Cell::new(0));
    let mut tree: BinarySearchTree<Tracked> = BinarySearchTree::new();
    for key in 0..10 {
        tree.insert(Tracked::new(key, 0, &drops));
    }

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(drops.get(), 10);
    tree.assert_valid();

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(drops.get(), 10);

    // still usable afterwards
    tree.insert(Tracked::new(1, 0, &drops));
    assert_eq!(tree.len(), 1);
    tree.assert_valid();
}

#[test]
fn closure_comparator() {
    let mut tree: BinarySearchTree<i32, _> =
        BinarySearchTree::with_comparator(FnCompare(|a: &i32, b: &i32| {
            a.unsigned_abs() < b.unsigned_abs()
        }));

    tree.extend([-3, 2, -1, 3, 0]);
    tree.assert_valid();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [0, -1, 2, -3, 3]);
    assert_eq!(tree.count(&3), 2);
    assert_eq!(tree.find(&-2).get(), Some(&2));
}
