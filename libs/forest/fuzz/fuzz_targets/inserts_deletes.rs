#![no_main]

use arbitrary::Arbitrary;
use forest::AvlTree;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert(u8),
    InsertUnique(u8),
    Remove(u8),
    PopFirst,
    PopLast,
    MoveToOther(u8),
    MergeBack,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut tree: AvlTree<u8> = AvlTree::new();
    let mut other: AvlTree<u8> = AvlTree::new();

    for op in ops {
        match op {
            Op::Insert(value) => {
                tree.insert(value);
            }
            Op::InsertUnique(value) => {
                tree.insert_unique(value);
            }
            Op::Remove(value) => {
                tree.remove(&value);
            }
            Op::PopFirst => {
                tree.pop_first();
            }
            Op::PopLast => {
                tree.pop_last();
            }
            Op::MoveToOther(value) => {
                other.insert_node(tree.extract_value(&value));
                other.assert_valid();
            }
            Op::MergeBack => {
                tree.merge(&mut other);
                assert!(other.is_empty());
            }
        }

        tree.assert_valid();
    }
});
