use alloc::alloc::Global;
use core::alloc::{AllocError, Allocator};
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::{fmt, mem};

use crate::balance::{Avl, Balance, Unbalanced};
use crate::compare::{Compare, Less, Transparent};
use crate::cursor::{Cursor, CursorMut};
use crate::error::{EmplaceError, TryInsertError};
use crate::handle::NodeHandle;
use crate::iter::{IntoIter, Iter, Range};
use crate::node::{self, Link, Node, Side};
use crate::raw::{DeallocOnUnwind, RawTree};

/// A plain binary search tree. Its shape, and therefore its performance, depends on the order
/// elements are inserted in.
pub type BinarySearchTree<T, C = Less, A = Global> = Tree<T, C, A, Unbalanced>;

/// A height-balanced binary search tree.
pub type AvlTree<T, C = Less, A = Global> = Tree<T, C, A, Avl>;

/// An ordered multiset stored as a binary tree of individually allocated nodes.
///
/// Elements are ordered by the comparator `C` (ascending [`Ord`] by default). Equivalent
/// elements are allowed and keep the order they were inserted in. Every element lives in its
/// own node allocated from `A`, and nodes never move: a node can be detached into a
/// [`NodeHandle`] and moved into another tree without touching the element.
///
/// The balancing policy `B` is usually picked through one of the aliases [`AvlTree`] and
/// [`BinarySearchTree`].
///
/// ```
/// use forest::AvlTree;
///
/// let mut tree: AvlTree<u32> = AvlTree::new();
/// tree.insert(3);
/// tree.insert(1);
/// tree.insert(3);
///
/// assert_eq!(tree.len(), 3);
/// assert_eq!(tree.count(&3), 2);
/// assert_eq!(tree.first(), Some(&1));
/// ```
pub struct Tree<T, C = Less, A: Allocator = Global, B = Avl> {
    pub(crate) raw: RawTree<T, A>,
    cmp: C,
    _balance: PhantomData<B>,
}

impl<T, B: Balance> Tree<T, Less, Global, B> {
    /// Creates an empty tree ordered by [`Ord`].
    ///
    /// This allocates the tree's sentinel node.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator_in(Less, Global)
    }
}

impl<T, A: Allocator, B: Balance> Tree<T, Less, A, B> {
    /// Creates an empty tree ordered by [`Ord`], allocating from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_comparator_in(Less, alloc)
    }

    /// Like [`new_in`](Self::new_in), but reports allocation failure instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns an error if the sentinel node could not be allocated.
    pub fn try_new_in(alloc: A) -> Result<Self, AllocError> {
        Self::try_with_comparator_in(Less, alloc)
    }
}

impl<T, C, B: Balance> Tree<T, C, Global, B> {
    /// Creates an empty tree ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_in(cmp, Global)
    }
}

impl<T, C, A: Allocator, B: Balance> Tree<T, C, A, B> {
    /// Creates an empty tree ordered by `cmp`, allocating from `alloc`.
    pub fn with_comparator_in(cmp: C, alloc: A) -> Self {
        Self {
            raw: RawTree::new_in(alloc),
            cmp,
            _balance: PhantomData,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the sentinel node could not be allocated.
    pub fn try_with_comparator_in(cmp: C, alloc: A) -> Result<Self, AllocError> {
        Ok(Self {
            raw: RawTree::try_new_in(alloc)?,
            cmp,
            _balance: PhantomData,
        })
    }

    /// Returns the number of elements in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// The maximum number of elements the tree could theoretically hold.
    pub fn max_size(&self) -> usize {
        self.raw.max_size()
    }

    /// Returns a reference to the underlying allocator.
    pub fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    /// Returns a reference to the comparator that orders the tree.
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Returns the smallest element.
    pub fn first(&self) -> Option<&T> {
        // Safety: `first` only returns real nodes
        self.raw.first().map(|node| unsafe { node::value(node) })
    }

    /// Returns the largest element.
    pub fn last(&self) -> Option<&T> {
        // Safety: `last` only returns real nodes
        self.raw.last().map(|node| unsafe { node::value(node) })
    }

    /// Returns an iterator over the elements in order. Iterate it backwards for reverse order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.raw)
    }

    /// Returns a cursor at the smallest element, or the end position if the tree is empty.
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        Cursor::new(&self.raw, self.raw.first().unwrap_or(self.raw.sentinel()))
    }

    /// Returns a cursor at the largest element, or the end position if the tree is empty.
    pub fn cursor_back(&self) -> Cursor<'_, T, A> {
        Cursor::new(&self.raw, self.raw.last().unwrap_or(self.raw.sentinel()))
    }

    /// Returns a cursor at the end position, one past the largest element.
    pub fn cursor_end(&self) -> Cursor<'_, T, A> {
        Cursor::new(&self.raw, self.raw.sentinel())
    }

    /// Mutable version of [`cursor_front`](Self::cursor_front).
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, C, A, B> {
        let node = self.raw.first().unwrap_or(self.raw.sentinel());
        CursorMut::new(self, node)
    }

    /// Mutable version of [`cursor_back`](Self::cursor_back).
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, C, A, B> {
        let node = self.raw.last().unwrap_or(self.raw.sentinel());
        CursorMut::new(self, node)
    }

    /// Mutable version of [`cursor_end`](Self::cursor_end).
    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, T, C, A, B> {
        let node = self.raw.sentinel();
        CursorMut::new(self, node)
    }

    /// Removes and returns the smallest element.
    pub fn pop_first(&mut self) -> Option<T> {
        let node = self.raw.first()?;
        // Safety: `node` is a real node of this tree
        unsafe {
            self.unlink_node(node);
            Some(self.free_node(node))
        }
    }

    /// Removes and returns the largest element.
    pub fn pop_last(&mut self) -> Option<T> {
        let node = self.raw.last()?;
        // Safety: `node` is a real node of this tree
        unsafe {
            self.unlink_node(node);
            Some(self.free_node(node))
        }
    }

    /// Drops all elements. The tree stays usable, and calling this on an empty tree is a no-op.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Exchanges the contents (elements, comparator and allocator) of two trees.
    pub fn swap(&mut self, other: &mut Self) {
        self.raw.swap(&mut other.raw);
        mem::swap(&mut self.cmp, &mut other.cmp);
    }

    /// Returns the height of the tree, measured by walking it: `-1` for an empty tree, `0` for a
    /// single element.
    pub fn height(&self) -> isize {
        self.raw.height()
    }

    /// Returns an object that renders the tree in graphviz `dot` format.
    #[cfg(feature = "dot")]
    pub fn dot(&self) -> crate::dot::Dot<'_, T, A> {
        crate::dot::Dot { raw: &self.raw }
    }

    /// Detaches `node` and restores the balance invariant.
    ///
    /// # Safety
    ///
    /// `node` must be a real node of this tree.
    pub(crate) unsafe fn unlink_node(&mut self, node: NonNull<Node<T>>) {
        // Safety: ensured by caller
        unsafe {
            let start = self.raw.unlink(node);
            B::after_unlink(&mut self.raw, start);
        }
    }

    /// Moves the value out of a detached node and frees it.
    ///
    /// # Safety
    ///
    /// `node` must be detached, hold an initialized value and belong to this tree's allocator.
    pub(crate) unsafe fn free_node(&mut self, node: NonNull<Node<T>>) -> T {
        // Safety: ensured by caller
        unsafe {
            let value = node::read_value(node);
            self.raw.dealloc_node(node);
            value
        }
    }
}

impl<T, C: Compare<T>, A: Allocator, B: Balance> Tree<T, C, A, B> {
    /// Runs `find` against the value of the detached `node`. If `find` unwinds (a panicking
    /// comparator), the node is dropped and freed instead of leaking.
    unsafe fn locate(
        &self,
        node: NonNull<Node<T>>,
        find: impl FnOnce(&T) -> Option<(NonNull<Node<T>>, Side)>,
    ) -> Option<(NonNull<Node<T>>, Side)> {
        let guard = DropOnUnwind {
            raw: &self.raw,
            node,
        };
        // Safety: ensured by caller
        let position = find(unsafe { node::value(node) });
        mem::forget(guard);
        position
    }

    /// Splices a detached node into its ordered position, after all equivalent elements.
    unsafe fn link_node(&mut self, node: NonNull<Node<T>>) {
        // Safety: ensured by caller
        unsafe {
            let position = self.locate(node, |value| {
                self.raw.leaf_position(|existing| self.cmp.less(value, existing))
            });
            self.raw.link_at(node, position);
            B::after_link(&mut self.raw, node);
        }
    }

    /// Splices a detached node directly in front of `hint` if that is where
    /// [`link_node`](Self::link_node) would put it, otherwise searches from the root.
    pub(crate) unsafe fn link_node_hint(&mut self, node: NonNull<Node<T>>, hint: NonNull<Node<T>>) {
        let sentinel = self.raw.sentinel();

        // Safety: ensured by caller
        unsafe {
            let position = self.locate(node, |value| {
                let fits = (hint == sentinel || self.cmp.less(value, node::value(hint))) && {
                    let prev = node::step_prev(hint, sentinel);
                    prev == sentinel || !self.cmp.less(value, node::value(prev))
                };

                if fits {
                    self.raw.position_before(hint)
                } else {
                    tracing::trace!("insertion hint rejected, searching from the root");
                    self.raw.leaf_position(|existing| self.cmp.less(value, existing))
                }
            });
            self.raw.link_at(node, position);
            B::after_link(&mut self.raw, node);
        }
    }

    /// Inserts `value` after all elements equivalent to it and returns a cursor to it.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if no node could
    /// be allocated.
    pub fn insert(&mut self, value: T) -> Cursor<'_, T, A> {
        let node = self.raw.alloc_node();
        // Safety: the node is fresh and receives its value before linking
        unsafe {
            node::write_value(node, value);
            self.link_node(node);
        }
        Cursor::new(&self.raw, node)
    }

    /// Like [`insert`](Self::insert), but hands the value back if no node could be allocated.
    ///
    /// # Errors
    ///
    /// Returns an error if the node could not be allocated. The tree is unchanged.
    pub fn try_insert(&mut self, value: T) -> Result<Cursor<'_, T, A>, TryInsertError<T>> {
        let Ok(node) = self.raw.try_alloc_node() else {
            return Err(TryInsertError::new(value));
        };

        // Safety: the node is fresh and receives its value before linking
        unsafe {
            node::write_value(node, value);
            self.link_node(node);
        }
        Ok(Cursor::new(&self.raw, node))
    }

    /// Allocates a node first and then constructs the element in place with `f`.
    ///
    /// If `f` panics, the node is released again and the tree is left unchanged.
    pub fn insert_with<F>(&mut self, f: F) -> Cursor<'_, T, A>
    where
        F: FnOnce() -> T,
    {
        let node = self.raw.alloc_node();
        let guard = DeallocOnUnwind {
            raw: &self.raw,
            node,
        };
        let value = f();
        mem::forget(guard);

        // Safety: the node is fresh and receives its value before linking
        unsafe {
            node::write_value(node, value);
            self.link_node(node);
        }
        Cursor::new(&self.raw, node)
    }

    /// Fallible version of [`insert_with`](Self::insert_with).
    ///
    /// # Errors
    ///
    /// Returns [`EmplaceError::Alloc`] if no node could be allocated (in which case `f` is never
    /// called) and [`EmplaceError::Construct`] if `f` fails. The tree is unchanged in both cases.
    pub fn try_insert_with<F, E>(&mut self, f: F) -> Result<Cursor<'_, T, A>, EmplaceError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let node = self.raw.try_alloc_node()?;
        let guard = DeallocOnUnwind {
            raw: &self.raw,
            node,
        };
        let value = f().map_err(EmplaceError::Construct)?;
        mem::forget(guard);

        // Safety: the node is fresh and receives its value before linking
        unsafe {
            node::write_value(node, value);
            self.link_node(node);
        }
        Ok(Cursor::new(&self.raw, node))
    }

    /// Inserts `value` unless an equivalent element is already present.
    ///
    /// Returns a cursor to the inserted or the already present element, and whether an
    /// insertion took place. When nothing is inserted, `value` is dropped.
    pub fn insert_unique(&mut self, value: T) -> (Cursor<'_, T, A>, bool) {
        let lower = self.raw.lower_bound(|existing| self.cmp.less(existing, &value));

        // Safety: `lower` is a real node unless it is the sentinel
        if !self.raw.is_sentinel(lower) && !self.cmp.less(&value, unsafe { node::value(lower) }) {
            return (Cursor::new(&self.raw, lower), false);
        }

        let node = self.raw.alloc_node();
        // Safety: the node is fresh and the slot in front of the lower bound is exactly where the
        // value belongs
        unsafe {
            node::write_value(node, value);
            let position = self.raw.position_before(lower);
            self.raw.link_at(node, position);
            B::after_link(&mut self.raw, node);
        }
        (Cursor::new(&self.raw, node), true)
    }

    /// Moves the node owned by `handle` into this tree.
    ///
    /// Returns `None` if the handle is empty. The handle's allocator must be able to free memory
    /// allocated by this tree's allocator and vice versa.
    pub fn insert_node(&mut self, handle: NodeHandle<T, A>) -> Option<Cursor<'_, T, A>> {
        let (node, _alloc) = handle.into_raw()?;
        // Safety: the handle owned a detached, initialized node
        unsafe {
            self.link_node(node);
        }
        Some(Cursor::new(&self.raw, node))
    }

    /// Moves the node owned by `handle` into this tree unless an equivalent element is already
    /// present.
    ///
    /// # Errors
    ///
    /// Hands `handle` back untouched if an equivalent element is present or the handle is
    /// empty.
    pub fn insert_node_unique(
        &mut self,
        handle: NodeHandle<T, A>,
    ) -> Result<Cursor<'_, T, A>, NodeHandle<T, A>> {
        let Some(value) = handle.value() else {
            return Err(handle);
        };

        let lower = self.raw.lower_bound(|existing| self.cmp.less(existing, value));
        // Safety: `lower` is a real node unless it is the sentinel
        if !self.raw.is_sentinel(lower) && !self.cmp.less(value, unsafe { node::value(lower) }) {
            return Err(handle);
        }

        let Some((node, _alloc)) = handle.into_raw() else {
            return Err(NodeHandle::empty());
        };
        // Safety: the handle owned a detached, initialized node and the slot in front of the
        // lower bound is exactly where its value belongs
        unsafe {
            let position = self.raw.position_before(lower);
            self.raw.link_at(node, position);
            B::after_link(&mut self.raw, node);
        }
        Ok(Cursor::new(&self.raw, node))
    }

    /// Replaces the contents of the tree with the elements of `iter`.
    pub fn assign<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.clear();
        self.extend(iter);
    }

    /// Returns a cursor to an element equivalent to `value`, or the end position.
    ///
    /// With duplicates present, which of the equivalent elements is found is unspecified. Use
    /// [`lower_bound`](Self::lower_bound) to get the first one.
    pub fn find(&self, value: &T) -> Cursor<'_, T, A> {
        let node = self.raw.find(
            |existing| self.cmp.less(existing, value),
            |existing| self.cmp.less(value, existing),
        );
        Cursor::new(&self.raw, node)
    }

    /// Heterogeneous version of [`find`](Self::find).
    pub fn find_key<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, T, A>
    where
        C: Transparent<T, Q>,
    {
        let node = self.raw.find(
            |existing| self.cmp.value_less(existing, key),
            |existing| self.cmp.key_less(key, existing),
        );
        Cursor::new(&self.raw, node)
    }

    /// Like [`find`](Self::find), but returns a [`CursorMut`].
    pub fn find_mut(&mut self, value: &T) -> CursorMut<'_, T, C, A, B> {
        let node = self.find(value).current;
        CursorMut::new(self, node)
    }

    /// Returns `true` if an element equivalent to `value` is present.
    pub fn contains(&self, value: &T) -> bool {
        !self.find(value).is_end()
    }

    /// Heterogeneous version of [`contains`](Self::contains).
    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        C: Transparent<T, Q>,
    {
        !self.find_key(key).is_end()
    }

    /// Returns a cursor to the first element that is not ordered before `value`.
    pub fn lower_bound(&self, value: &T) -> Cursor<'_, T, A> {
        let node = self.raw.lower_bound(|existing| self.cmp.less(existing, value));
        Cursor::new(&self.raw, node)
    }

    /// Heterogeneous version of [`lower_bound`](Self::lower_bound).
    pub fn lower_bound_key<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, T, A>
    where
        C: Transparent<T, Q>,
    {
        let node = self.raw.lower_bound(|existing| self.cmp.value_less(existing, key));
        Cursor::new(&self.raw, node)
    }

    /// Like [`lower_bound`](Self::lower_bound), but returns a [`CursorMut`].
    pub fn lower_bound_mut(&mut self, value: &T) -> CursorMut<'_, T, C, A, B> {
        let node = self.lower_bound(value).current;
        CursorMut::new(self, node)
    }

    /// Returns a cursor to the first element that is ordered after `value`.
    pub fn upper_bound(&self, value: &T) -> Cursor<'_, T, A> {
        let node = self.raw.upper_bound(|existing| self.cmp.less(value, existing));
        Cursor::new(&self.raw, node)
    }

    /// Heterogeneous version of [`upper_bound`](Self::upper_bound).
    pub fn upper_bound_key<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, T, A>
    where
        C: Transparent<T, Q>,
    {
        let node = self.raw.upper_bound(|existing| self.cmp.key_less(key, existing));
        Cursor::new(&self.raw, node)
    }

    /// Like [`upper_bound`](Self::upper_bound), but returns a [`CursorMut`].
    pub fn upper_bound_mut(&mut self, value: &T) -> CursorMut<'_, T, C, A, B> {
        let node = self.upper_bound(value).current;
        CursorMut::new(self, node)
    }

    /// Returns an iterator over all elements equivalent to `value`.
    pub fn equal_range(&self, value: &T) -> Range<'_, T> {
        let (lower, upper) = self.equal_range_cursors(value);
        self.range_between(lower.current, upper.current)
    }

    /// Heterogeneous version of [`equal_range`](Self::equal_range).
    pub fn equal_range_key<Q: ?Sized>(&self, key: &Q) -> Range<'_, T>
    where
        C: Transparent<T, Q>,
    {
        let lower = self.lower_bound_key(key).current;
        let upper = self.upper_bound_key(key).current;
        self.range_between(lower, upper)
    }

    /// Returns the [lower](Self::lower_bound) and [upper](Self::upper_bound) bound of `value`.
    pub fn equal_range_cursors(&self, value: &T) -> (Cursor<'_, T, A>, Cursor<'_, T, A>) {
        (self.lower_bound(value), self.upper_bound(value))
    }

    fn range_between(&self, front: NonNull<Node<T>>, back: NonNull<Node<T>>) -> Range<'_, T> {
        Range {
            front,
            back,
            sentinel: self.raw.sentinel(),
            _tree: PhantomData,
        }
    }

    /// Returns the number of elements equivalent to `value`.
    pub fn count(&self, value: &T) -> usize {
        self.count_from(self.lower_bound(value), |existing| {
            !self.cmp.less(value, existing)
        })
    }

    /// Heterogeneous version of [`count`](Self::count).
    pub fn count_key<Q: ?Sized>(&self, key: &Q) -> usize
    where
        C: Transparent<T, Q>,
    {
        self.count_from(self.lower_bound_key(key), |existing| {
            !self.cmp.key_less(key, existing)
        })
    }

    /// Counts elements forward from `cursor` for as long as `equal` holds.
    fn count_from(
        &self,
        mut cursor: Cursor<'_, T, A>,
        mut equal: impl FnMut(&T) -> bool,
    ) -> usize {
        let mut count = 0;
        while let Some(existing) = cursor.get() {
            if !equal(existing) {
                break;
            }
            count += 1;
            cursor.move_next();
        }
        count
    }

    /// Detaches an element equivalent to `value` and returns it as a [`NodeHandle`], or an empty
    /// handle if there is none.
    pub fn extract_value(&mut self, value: &T) -> NodeHandle<T, A>
    where
        A: Clone,
    {
        self.find_mut(value).extract().unwrap_or_default()
    }

    /// Removes an element equivalent to `value` and returns it.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        self.find_mut(value).remove_current()
    }

    /// Moves every element of `source` into this tree, leaving `source` empty.
    ///
    /// No element is moved or copied in memory, the nodes themselves are relinked. `source` may
    /// use a different comparator and balancing policy. Both trees' allocators must be able to
    /// free each other's allocations.
    pub fn merge<C2, B2: Balance>(&mut self, source: &mut Tree<T, C2, A, B2>) {
        tracing::trace!(into = self.len(), from = source.len(), "merge");

        let mut hint = self.raw.sentinel();
        while let Some(node) = source.raw.first() {
            // Safety: `node` is a real node of `source`, once unlinked it is a detached node with
            // an initialized value
            unsafe {
                source.unlink_node(node);
                self.link_node_hint(node, hint);
                hint = node::next(node, self.raw.sentinel());
            }
        }
    }

    /// Asserts all structural invariants of the tree.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violation found. This checks the sentinel's
    /// root/first/last links, the parent links of every node, that the in-order sequence is
    /// sorted, the element count and, for [`AvlTree`]s, every node's height and balance.
    #[track_caller]
    pub fn assert_valid(&self) {
        let sentinel = self.raw.sentinel();

        // Safety: every node visited is reachable from the root and thus a real node
        unsafe {
            let Some(root) = self.raw.root() else {
                assert_eq!(self.raw.len(), 0, "empty tree must have length 0");
                assert_eq!(
                    node::left(sentinel),
                    Some(sentinel),
                    "empty tree's sentinel must point at itself as the last element"
                );
                assert_eq!(
                    node::right(sentinel),
                    Some(sentinel),
                    "empty tree's sentinel must point at itself as the first element"
                );
                return;
            };

            assert_eq!(node::parent(root), Some(sentinel), "root must hang off the sentinel");
            assert_eq!(
                node::right(sentinel),
                Some(node::find_minimum(root)),
                "sentinel must point at the minimum as the first element"
            );
            assert_eq!(
                node::left(sentinel),
                Some(node::find_maximum(root)),
                "sentinel must point at the maximum as the last element"
            );

            let mut count = 0;
            let mut prev: Link<T> = None;
            let mut curr = node::find_minimum(root);
            while curr != sentinel {
                count += 1;
                assert!(
                    count <= self.raw.len(),
                    "more nodes reachable than the recorded length {}",
                    self.raw.len()
                );

                for side in [Side::Left, Side::Right] {
                    if let Some(child) = node::child(curr, side) {
                        assert_eq!(
                            node::parent(child),
                            Some(curr),
                            "{side} child of {curr:?} does not link back to it"
                        );
                    }
                }

                if curr != root {
                    let parent = node::parent(curr).expect("linked node must have a parent");
                    let is_left = node::left(parent) == Some(curr);
                    let is_right = node::right(parent) == Some(curr);
                    assert!(
                        is_left ^ is_right,
                        "{curr:?} must be exactly one child of its parent {parent:?}"
                    );
                }

                if let Some(prev) = prev {
                    assert!(
                        !self.cmp.less(node::value(curr), node::value(prev)),
                        "ordering violation: {curr:?} is ordered before its predecessor {prev:?}"
                    );
                }

                B::assert_node_valid(curr);

                prev = Some(curr);
                curr = node::next(curr, sentinel);
            }

            assert_eq!(count, self.raw.len(), "recorded length does not match node count");
        }
    }
}

/// Owns a detached, initialized node while its position is searched for, dropping it if the
/// comparator unwinds.
struct DropOnUnwind<'a, T, A: Allocator> {
    raw: &'a RawTree<T, A>,
    node: NonNull<Node<T>>,
}

impl<T, A: Allocator> Drop for DropOnUnwind<'_, T, A> {
    fn drop(&mut self) {
        // Safety: the node is detached, initialized and was allocated by `raw`
        unsafe {
            node::drop_value(self.node);
            self.raw.dealloc_node(self.node);
        }
    }
}

impl<T, C: Default, A: Allocator + Default, B: Balance> Default for Tree<T, C, A, B> {
    fn default() -> Self {
        Self::with_comparator_in(C::default(), A::default())
    }
}

impl<T: Clone, C: Clone, A: Allocator + Clone, B: Balance> Clone for Tree<T, C, A, B> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone_structure(),
            cmp: self.cmp.clone(),
            _balance: PhantomData,
        }
    }
}

impl<T, C, A, B> FromIterator<T> for Tree<T, C, A, B>
where
    C: Compare<T> + Default,
    A: Allocator + Default,
    B: Balance,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}

impl<T, C, A, B, const N: usize> From<[T; N]> for Tree<T, C, A, B>
where
    C: Compare<T> + Default,
    A: Allocator + Default,
    B: Balance,
{
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, C: Compare<T>, A: Allocator, B: Balance> Extend<T> for Tree<T, C, A, B> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T: Copy + 'a, C: Compare<T>, A: Allocator, B: Balance> Extend<&'a T> for Tree<T, C, A, B> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, C, A: Allocator, B> IntoIterator for Tree<T, C, A, B> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { raw: self.raw }
    }
}

impl<'a, T, C, A: Allocator, B: Balance> IntoIterator for &'a Tree<T, C, A, B> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, C, C2, A, A2, B, B2> PartialEq<Tree<T, C2, A2, B2>> for Tree<T, C, A, B>
where
    T: PartialEq,
    A: Allocator,
    A2: Allocator,
    B: Balance,
    B2: Balance,
{
    fn eq(&self, other: &Tree<T, C2, A2, B2>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, C, A: Allocator, B: Balance> Eq for Tree<T, C, A, B> {}

impl<T, C, C2, A, A2, B, B2> PartialOrd<Tree<T, C2, A2, B2>> for Tree<T, C, A, B>
where
    T: PartialOrd,
    A: Allocator,
    A2: Allocator,
    B: Balance,
    B2: Balance,
{
    fn partial_cmp(&self, other: &Tree<T, C2, A2, B2>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, C, A: Allocator, B: Balance> Ord for Tree<T, C, A, B> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, C, A: Allocator, B: Balance> Hash for Tree<T, C, A, B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for value in self {
            value.hash(state);
        }
    }
}

impl<T: fmt::Debug, C, A: Allocator, B: Balance> fmt::Debug for Tree<T, C, A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnCompare, Greater};
    use alloc::string::String;
    use alloc::vec::Vec;

    fn collect<C: Compare<u32>, B: Balance>(tree: &Tree<u32, C, Global, B>) -> Vec<u32> {
        tree.iter().copied().collect()
    }

    #[test]
    fn empty_tree() {
        let tree: AvlTree<u32> = AvlTree::new();
        tree.assert_valid();
        assert!(tree.is_empty());
        assert_eq!(tree.first(), None);
        assert_eq!(tree.last(), None);
        assert_eq!(tree.height(), -1);
        assert!(tree.find(&1).is_end());
        assert!(tree.lower_bound(&1).is_end());
        assert!(tree.upper_bound(&1).is_end());
        assert_eq!(tree.count(&1), 0);
    }

    #[test]
    fn single_element() {
        let mut tree: BinarySearchTree<u32> = BinarySearchTree::new();
        tree.insert(7);
        tree.assert_valid();
        assert_eq!(tree.first(), Some(&7));
        assert_eq!(tree.last(), Some(&7));
        assert_eq!(tree.height(), 0);

        assert_eq!(tree.pop_last(), Some(7));
        tree.assert_valid();
        assert!(tree.is_empty());
        assert_eq!(tree.pop_first(), None);
    }

    #[test]
    fn extract_two_children_with_adjacent_predecessor() {
        // 20 has children 10 and 30, and 10 (its predecessor) has no right child
        let mut tree: BinarySearchTree<u32> = [20, 10, 30, 5].into_iter().collect();

        let handle = tree.extract_value(&20);
        assert_eq!(handle.value(), Some(&20));
        tree.assert_valid();
        assert_eq!(collect(&tree), [5, 10, 30]);
    }

    #[test]
    fn extract_two_children_with_deep_predecessor() {
        // 15 is the predecessor of 20, deep in the left subtree, and has a left child 12
        let mut tree: BinarySearchTree<u32> = [20, 10, 30, 5, 15, 12].into_iter().collect();

        assert_eq!(tree.remove(&20), Some(20));
        tree.assert_valid();
        assert_eq!(collect(&tree), [5, 10, 12, 15, 30]);

        // the predecessor took over the root slot
        assert_eq!(tree.height(), 2);
        // Safety: the nodes belong to the tree under test
        unsafe {
            assert_eq!(*node::value(tree.raw.root().unwrap()), 15);
        }
    }

    #[test]
    fn extract_bounds_and_root() {
        let mut tree: AvlTree<u32> = (1..=9).collect();

        assert_eq!(tree.pop_first(), Some(1));
        assert_eq!(tree.first(), Some(&2));
        assert_eq!(tree.pop_last(), Some(9));
        assert_eq!(tree.last(), Some(&8));

        let root = tree.raw.root().unwrap();
        // Safety: the nodes belong to the tree under test
        let root_value = unsafe { *node::value(root) };
        assert_eq!(tree.remove(&root_value), Some(root_value));
        tree.assert_valid();
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn missing_values() {
        let mut tree: AvlTree<u32> = [1, 3, 5].into_iter().collect();
        assert!(tree.extract_value(&2).is_empty());
        assert_eq!(tree.remove(&4), None);
        assert!(!tree.contains(&0));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn lower_bound_finds_first_duplicate() {
        let mut tree =
            AvlTree::with_comparator(FnCompare(|a: &(u32, u32), b: &(u32, u32)| a.0 < b.0));

        for seq in 0..20 {
            tree.insert((seq % 4, seq));
        }
        tree.assert_valid();

        // equal keys keep insertion order
        let twos: Vec<_> = tree.equal_range(&(2, 0)).map(|&(_, seq)| seq).collect();
        assert_eq!(twos, [2, 6, 10, 14, 18]);

        assert_eq!(tree.lower_bound(&(2, 99)).get(), Some(&(2, 2)));
        assert_eq!(tree.upper_bound(&(2, 99)).get(), Some(&(3, 3)));
        assert_eq!(tree.count(&(1, 0)), 5);
    }

    #[test]
    fn descending_comparator() {
        let tree: AvlTree<u32, Greater> = (0..10).collect();
        tree.assert_valid();
        assert_eq!(tree.first(), Some(&9));
        assert_eq!(tree.lower_bound(&5).get(), Some(&5));
        assert_eq!(tree.upper_bound(&5).get(), Some(&4));
    }

    #[test]
    fn transparent_lookups() {
        let mut tree: AvlTree<String> = AvlTree::new();
        for word in ["lonfo", "non", "vaterca", "lonfo", "gronda"] {
            tree.insert(String::from(word));
        }

        assert!(tree.contains_key("non"));
        assert!(!tree.contains_key("sedonfo"));
        assert_eq!(tree.count_key("lonfo"), 2);
        assert_eq!(tree.find_key("gronda").get().map(String::as_str), Some("gronda"));
        assert_eq!(tree.lower_bound_key("m").get().map(String::as_str), Some("non"));
        assert_eq!(tree.upper_bound_key("non").get().map(String::as_str), Some("vaterca"));
        assert_eq!(tree.equal_range_key("lonfo").count(), 2);
    }

    #[test]
    fn clone_preserves_shape() {
        let tree: BinarySearchTree<u32> = [50, 20, 80, 10, 30, 90, 25].into_iter().collect();
        let clone = tree.clone();

        clone.assert_valid();
        assert_eq!(clone, tree);
        assert_eq!(clone.height(), tree.height());
        // Safety: the nodes belong to the tree under test
        unsafe {
            assert_eq!(*node::value(clone.raw.root().unwrap()), 50);
        }

        let empty: AvlTree<u32> = AvlTree::new();
        assert!(empty.clone().is_empty());
    }

    #[test]
    fn swap_and_assign() {
        let mut a: AvlTree<u32> = [1, 2, 3].into_iter().collect();
        let mut b: AvlTree<u32> = [7].into_iter().collect();

        a.swap(&mut b);
        assert_eq!(collect(&a), [7]);
        assert_eq!(collect(&b), [1, 2, 3]);

        a.assign([4, 4, 0]);
        a.assert_valid();
        assert_eq!(collect(&a), [0, 4, 4]);
    }

    #[test]
    fn relational_operators() {
        let a: AvlTree<u32> = [1, 2, 3].into_iter().collect();
        let b: BinarySearchTree<u32> = [3, 2, 1].into_iter().collect();
        let c: AvlTree<u32> = [1, 2].into_iter().collect();
        let d: AvlTree<u32> = [1, 3].into_iter().collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c < a);
        assert!(a < d);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn debug_formats_as_set() {
        let tree: AvlTree<u32> = [2, 1].into_iter().collect();
        assert_eq!(alloc::format!("{tree:?}"), "{1, 2}");
    }

    #[test]
    fn max_size_is_nonzero() {
        let tree: AvlTree<u64> = AvlTree::new();
        assert!(tree.max_size() > 0);
        assert!(tree.max_size() < usize::MAX / mem::size_of::<u64>());
    }
}
