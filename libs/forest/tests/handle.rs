#![feature(allocator_api)]

mod common;

use std::cell::Cell;
use std::rc::Rc;

use forest::{AvlTree, BinarySearchTree, NodeHandle};

use crate::common::{TestAlloc, Tracked};

#[test]
fn round_trip_keeps_the_element_in_place() {
    let drops = Rc::new(Cell::new(0));
    let mut tree: AvlTree<Tracked> = AvlTree::new();
    for key in [4, 2, 6, 1, 3, 5, 7] {
        tree.insert(Tracked::new(key, key, &drops));
    }

    let probe = Tracked::new(3, 0, &drops);
    let before = core::ptr::from_ref(tree.find(&probe).get().unwrap());

    let handle = tree.extract_value(&probe);
    assert_eq!(core::ptr::from_ref(handle.value().unwrap()), before);
    assert_eq!(tree.len(), 6);
    tree.assert_valid();

    let cursor = tree.insert_node(handle).unwrap();
    assert_eq!(core::ptr::from_ref(cursor.get().unwrap()), before);
    tree.assert_valid();

    // only the probe has been dropped, the element itself was never moved or copied
    drop(probe);
    assert_eq!(drops.get(), 1);
    assert_eq!(tree.iter().map(|t| t.key).collect::<Vec<_>>(), [1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn round_trip_matches_direct_insertion() {
    let mut direct: BinarySearchTree<u32> = [8, 3, 10, 1, 6].into_iter().collect();
    let mut via_handle = direct.clone();
    let mut donor: AvlTree<u32> = [6, 7, 9].into_iter().collect();

    direct.insert(7);
    let handle = donor.extract_value(&7);
    via_handle.insert_node(handle);

    via_handle.assert_valid();
    assert_eq!(direct, via_handle);
    assert_eq!(donor.iter().copied().collect::<Vec<_>>(), [6, 9]);
}

#[test]
fn dropping_a_handle_frees_the_node() {
    let alloc = TestAlloc::new();
    let drops = Rc::new(Cell::new(0));

    let mut tree: AvlTree<Tracked, _, TestAlloc> = AvlTree::new_in(alloc.clone());
    for key in 0..5 {
        tree.insert(Tracked::new(key, 0, &drops));
    }
    // the sentinel plus five nodes
    assert_eq!(alloc.live(), 6);

    let probe = Tracked::new(2, 0, &drops);
    let handle = tree.extract_value(&probe);
    drop(probe);
    assert_eq!(alloc.live(), 6);
    assert_eq!(drops.get(), 1);

    drop(handle);
    assert_eq!(alloc.live(), 5);
    assert_eq!(drops.get(), 2);

    drop(tree);
    assert_eq!(alloc.live(), 0);
    assert_eq!(drops.get(), 6);
}

#[test]
fn into_value_frees_the_node() {
    let alloc = TestAlloc::new();
    let mut tree: BinarySearchTree<u32, _, TestAlloc> = BinarySearchTree::new_in(alloc.clone());
    tree.extend([3, 1, 2]);

    let handle = tree.extract_value(&1);
    assert_eq!(handle.allocator().map(TestAlloc::live), Some(4));
    assert_eq!(handle.into_value(), Some(1));
    assert_eq!(alloc.live(), 3);
}

#[test]
fn empty_handles() {
    let mut tree: AvlTree<u32> = [1, 2, 3].into_iter().collect();

    let handle = tree.extract_value(&4);
    assert!(handle.is_empty());
    assert!(tree.insert_node(handle).is_none());

    let mut cursor = tree.cursor_front_mut();
    assert!(!cursor.insert_node_hint(NodeHandle::empty()));
    assert_eq!(cursor.get(), Some(&1));

    let mut end = tree.cursor_end_mut();
    assert!(end.extract().is_none());
    assert_eq!(end.remove_current(), None);

    assert_eq!(tree.len(), 3);
}

#[test]
fn hinted_node_insertion() {
    let mut tree: AvlTree<u32> = [10, 30].into_iter().collect();
    let mut donor: AvlTree<u32> = [20, 40].into_iter().collect();

    let twenty = donor.extract_value(&20);
    let forty = donor.extract_value(&40);

    let mut cursor = tree.find_mut(&30);
    assert!(cursor.insert_node_hint(twenty));
    assert_eq!(cursor.get(), Some(&20));

    cursor.move_next();
    cursor.move_next();
    assert!(cursor.is_end());
    assert!(cursor.insert_node_hint(forty));
    assert_eq!(cursor.get(), Some(&40));

    tree.assert_valid();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [10, 20, 30, 40]);
    assert!(donor.is_empty());
}

#[test]
fn remove_current_walks_forward() {
    let mut tree: AvlTree<u32> = (0..6).collect();

    let mut cursor = tree.find_mut(&2);
    assert_eq!(cursor.remove_current(), Some(2));
    assert_eq!(cursor.get(), Some(&3));
    assert_eq!(cursor.remove_current(), Some(3));

    let mut cursor = tree.cursor_back_mut();
    assert_eq!(cursor.remove_current(), Some(5));
    assert!(cursor.is_end());

    tree.assert_valid();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [0, 1, 4]);
}

#[test]
fn unique_node_insertion() {
    let mut tree: AvlTree<u32> = [10, 20, 30].into_iter().collect();
    let mut donor: BinarySearchTree<u32> = [20, 25].into_iter().collect();

    // an equivalent element is present, the handle comes back with its node
    let twenty = donor.extract_value(&20);
    let address = core::ptr::from_ref(twenty.value().unwrap());
    let twenty = tree.insert_node_unique(twenty).unwrap_err();
    assert_eq!(core::ptr::from_ref(twenty.value().unwrap()), address);
    assert_eq!(tree.count(&20), 1);

    // no equivalent element, the node is linked in
    let twenty_five = donor.extract_value(&25);
    let address = core::ptr::from_ref(twenty_five.value().unwrap());
    let cursor = tree.insert_node_unique(twenty_five).unwrap();
    assert_eq!(core::ptr::from_ref(cursor.get().unwrap()), address);
    assert_eq!(cursor.peek_prev(), Some(&20));
    assert_eq!(cursor.peek_next(), Some(&30));

    // empty handles are handed back as well
    assert!(tree.insert_node_unique(NodeHandle::empty()).unwrap_err().is_empty());

    tree.assert_valid();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [10, 20, 25, 30]);
    assert!(donor.is_empty());
    drop(twenty);
}
