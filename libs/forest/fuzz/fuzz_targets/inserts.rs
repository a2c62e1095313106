#![no_main]

use forest::{AvlTree, BinarySearchTree};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|inserts: Vec<u16>| {
    let mut avl: AvlTree<u16> = AvlTree::new();
    let mut bst: BinarySearchTree<u16> = BinarySearchTree::new();

    for i in inserts {
        avl.insert(i);
        bst.insert(i);
        avl.assert_valid();
    }

    bst.assert_valid();
    assert_eq!(avl, bst);
});
