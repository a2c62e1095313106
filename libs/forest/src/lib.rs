//! # Node-based ordered multisets: a plain binary search tree and an AVL tree.
//!
//! Both trees store every element in its own heap node, linked to its parent and its two
//! children. Elements are kept in the order of a comparator (ascending [`Ord`] by default),
//! duplicates are allowed and keep their insertion order.
//!
//! Each tree owns one extra node, the *sentinel*, that never holds an element. It marks the end
//! position of cursors and iterators and keeps pointers to the root, the first and the last
//! element, so `first`, `last` and stepping off either end are all constant time.
//!
//! Because nodes never move, an element can be detached from a tree into a [`NodeHandle`] and
//! reinserted into this or another tree without moving or copying the element itself.
//! [`Tree::merge`] does the same for a whole tree.
//!
//! ## when to use this
//!
//! - **need a multiset** - equivalent elements are stored side by side, in insertion order.
//! - **need stable element addresses** - an element stays at the same address for as long as it
//!   is part of a tree and even when moving between trees via a [`NodeHandle`].
//! - **need positional access** - [`Cursor`]s and [`CursorMut`]s walk the tree in both
//!   directions, and [`CursorMut`] can extract and insert at its position.
//!
//! ## which tree
//!
//! - [`AvlTree`] keeps its height within `~1.44 * log2(n)` through rotations, so all operations
//!   are logarithmic regardless of insertion order.
//! - [`BinarySearchTree`] does no balancing. It is cheaper to modify when insertion order is
//!   random but degrades to a linked list on sorted input.
//!
//! ## features
//!
//! The following features are available:
//!
//! | Feature | Default | Explanation                                                    |
//! |:--------|:--------|:---------------------------------------------------------------|
//! | `dot`   | `false` | Enables `Tree::dot`, which renders the tree in graphviz format |

#![cfg_attr(not(test), no_std)]
#![feature(allocator_api)]

extern crate alloc;

mod balance;
mod compare;
mod cursor;
#[cfg(feature = "dot")]
mod dot;
mod error;
mod handle;
mod iter;
mod node;
mod raw;
mod tree;

pub use balance::{Avl, Balance, Unbalanced};
pub use compare::{Compare, FnCompare, Greater, Less, Transparent};
pub use cursor::{Cursor, CursorMut};
#[cfg(feature = "dot")]
pub use dot::Dot;
pub use error::{EmplaceError, TryInsertError};
pub use handle::NodeHandle;
pub use iter::{IntoIter, Iter, Range};
pub use tree::{AvlTree, BinarySearchTree, Tree};
