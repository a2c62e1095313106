//! Balancing policies.
//!
//! A [`Tree`](crate::Tree) performs all ordering work itself and then hands the structural
//! aftermath of every splice to its policy. [`Unbalanced`] ignores it, giving a plain binary
//! search tree whose shape depends on the insertion order. [`Avl`] keeps every node's subtree
//! heights within one of each other by walking from the point of change up to the root and
//! rotating where needed.

use core::alloc::Allocator;
use core::ptr::NonNull;

use crate::node::{self, Link, Node, Side};
use crate::raw::RawTree;

/// A tree balancing policy. This trait is sealed; see [`Unbalanced`] and [`Avl`].
pub trait Balance: sealed::Sealed {}

pub(crate) mod sealed {
    use super::*;

    pub trait Sealed {
        /// Called after `node` was spliced in as a leaf.
        #[doc(hidden)]
        unsafe fn after_link<T, A: Allocator>(raw: &mut RawTree<T, A>, node: NonNull<Node<T>>);

        /// Called after a node was unlinked. `start` is the parent of the vacated slot.
        #[doc(hidden)]
        unsafe fn after_unlink<T, A: Allocator>(raw: &mut RawTree<T, A>, start: Link<T>);

        /// Checks the policy's own invariant at `node`, panicking if it does not hold.
        #[doc(hidden)]
        unsafe fn assert_node_valid<T>(node: NonNull<Node<T>>);
    }
}

/// No balancing at all: a plain binary search tree.
///
/// Sorted insertion degrades it into a linked list. The height fields of its nodes are never
/// maintained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unbalanced;

impl Balance for Unbalanced {}

impl sealed::Sealed for Unbalanced {
    #[inline]
    unsafe fn after_link<T, A: Allocator>(_raw: &mut RawTree<T, A>, _node: NonNull<Node<T>>) {}

    #[inline]
    unsafe fn after_unlink<T, A: Allocator>(_raw: &mut RawTree<T, A>, _start: Link<T>) {}

    #[inline]
    unsafe fn assert_node_valid<T>(_node: NonNull<Node<T>>) {}
}

/// AVL height balancing.
///
/// Every node records the height of its subtree (a leaf has height 0, a missing child counts as
/// -1). After each insertion or removal the heights along the path to the root are recomputed and
/// any node whose children differ in height by two is fixed with a single or double rotation.
/// This bounds the height of the tree by roughly `1.44 * log2(n)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Avl;

impl Balance for Avl {}

impl sealed::Sealed for Avl {
    unsafe fn after_link<T, A: Allocator>(raw: &mut RawTree<T, A>, node: NonNull<Node<T>>) {
        // Safety: ensured by caller
        unsafe {
            debug_assert_eq!(node::height(node), 0);
            let parent = node::parent(node).filter(|&p| !raw.is_sentinel(p));
            Self::rebalance_from(raw, parent);
        }
    }

    unsafe fn after_unlink<T, A: Allocator>(raw: &mut RawTree<T, A>, start: Link<T>) {
        // Safety: ensured by caller
        unsafe { Self::rebalance_from(raw, start) }
    }

    unsafe fn assert_node_valid<T>(node: NonNull<Node<T>>) {
        // Safety: ensured by caller
        unsafe {
            let height = node::height(node);
            let expected = node::node_height(node);
            assert_eq!(
                height, expected,
                "AVL height violation at {node:?}: recorded {height}, subtrees give {expected}"
            );

            let bf = node::balance_factor(node);
            assert!(
                (-1..=1).contains(&bf),
                "AVL balance violation: node {node:?} has balance factor {bf}"
            );
        }
    }
}

impl Avl {
    /// Walks from `start` up to the root, fixing heights and rotating unbalanced nodes.
    ///
    /// The walk never stops early: removals can unbalance several ancestors, and the extra
    /// iterations after an insertion only recompute heights that are already correct.
    unsafe fn rebalance_from<T, A: Allocator>(raw: &mut RawTree<T, A>, start: Link<T>) {
        let mut curr = start;

        // Safety: ensured by caller, all nodes on the path are linked real nodes
        unsafe {
            while let Some(node) = curr {
                node::set_height(node, node::node_height(node));

                let bf = node::balance_factor(node);
                let top = if bf >= 2 {
                    let left = node::left(node).expect("left-heavy node must have a left child");
                    if node::balance_factor(left) < 0 {
                        // left-right case
                        let pivot = node::right(left)
                            .expect("right-heavy node must have a right child");
                        Self::rotate_at(raw, pivot, Side::Left);
                    }
                    let pivot = node::left(node).expect("left-heavy node must have a left child");
                    Self::rotate_at(raw, pivot, Side::Right);
                    pivot
                } else if bf <= -2 {
                    let right = node::right(node)
                        .expect("right-heavy node must have a right child");
                    if node::balance_factor(right) > 0 {
                        // right-left case
                        let pivot = node::left(right)
                            .expect("left-heavy node must have a left child");
                        Self::rotate_at(raw, pivot, Side::Right);
                    }
                    let pivot = node::right(node)
                        .expect("right-heavy node must have a right child");
                    Self::rotate_at(raw, pivot, Side::Left);
                    pivot
                } else {
                    node
                };

                let parent = node::parent(top).expect("linked node must have a parent");
                curr = (!raw.is_sentinel(parent)).then_some(parent);
            }
        }
    }

    /// Rotates `x` above its parent `z`, making `z` the `side` child of `x`.
    ///
    /// `x`'s former `side` child becomes the opposite child of `z`. A right rotation at `z` is
    /// `rotate_at(z.left, Side::Right)`. The heights of `z` and then `x` are recomputed.
    unsafe fn rotate_at<T, A: Allocator>(raw: &mut RawTree<T, A>, x: NonNull<Node<T>>, side: Side) {
        // Safety: ensured by caller
        unsafe {
            let z = node::parent(x).expect("linked node must have a parent");
            debug_assert!(!raw.is_sentinel(z), "cannot rotate the root upwards");
            debug_assert_eq!(node::child(z, side.opposite()), Some(x));

            let p_z = node::parent(z).expect("linked node must have a parent");
            let y = node::child(x, side);

            tracing::trace!("rotate {side} at {z:?}");

            // x takes z's place
            raw.replace_child(p_z, z, Some(x));
            node::set_parent(x, Some(p_z));

            // z becomes the `side` child of x
            node::set_child(x, side, Some(z));
            node::set_parent(z, Some(x));

            // y moves over to z
            node::set_child(z, side.opposite(), y);
            if let Some(y) = y {
                node::set_parent(y, Some(z));
            }

            node::set_height(z, node::node_height(z));
            node::set_height(x, node::node_height(x));
        }
    }
}
