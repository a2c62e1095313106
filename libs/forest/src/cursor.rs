use alloc::alloc::Global;
use core::alloc::Allocator;
use core::fmt;
use core::ptr::{self, NonNull};

use crate::balance::Balance;
use crate::compare::Compare;
use crate::handle::NodeHandle;
use crate::node::{self, Node};
use crate::raw::RawTree;
use crate::{Avl, Less, Tree};

/// A cursor which provides read-only access to a [`Tree`].
///
/// A cursor points either at an element or at the *end* position, which sits between the last
/// and the first element. Moving forward from the last element reaches the end, moving forward
/// again wraps around to the first element (and likewise backwards).
pub struct Cursor<'a, T, A: Allocator = Global> {
    pub(crate) current: NonNull<Node<T>>,
    pub(crate) raw: &'a RawTree<T, A>,
}

impl<'a, T, A: Allocator> Cursor<'a, T, A> {
    pub(crate) fn new(raw: &'a RawTree<T, A>, current: NonNull<Node<T>>) -> Self {
        Self { current, raw }
    }

    /// Returns the element the cursor points at, or `None` at the end position.
    pub fn get(&self) -> Option<&'a T> {
        if self.is_end() {
            None
        } else {
            // Safety: `current` is a real node of the borrowed tree
            Some(unsafe { node::value(self.current) })
        }
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.raw.is_sentinel(self.current)
    }

    /// Moves to the next element, from the last element to the end and from the end to the first
    /// element.
    pub fn move_next(&mut self) {
        // Safety: `current` belongs to the borrowed tree
        self.current = unsafe { node::step_next(self.current, self.raw.sentinel()) };
    }

    /// Moves to the previous element, from the first element to the end and from the end to the
    /// last element.
    pub fn move_prev(&mut self) {
        // Safety: `current` belongs to the borrowed tree
        self.current = unsafe { node::step_prev(self.current, self.raw.sentinel()) };
    }

    /// Returns the element after the current one without moving the cursor.
    pub fn peek_next(&self) -> Option<&'a T> {
        let mut next = *self;
        next.move_next();
        next.get()
    }

    /// Returns the element before the current one without moving the cursor.
    pub fn peek_prev(&self) -> Option<&'a T> {
        let mut prev = *self;
        prev.move_prev();
        prev.get()
    }
}

impl<T, A: Allocator> Clone for Cursor<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Allocator> Copy for Cursor<'_, T, A> {}

impl<T, A: Allocator> PartialEq for Cursor<'_, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current && ptr::eq(self.raw, other.raw)
    }
}

impl<T, A: Allocator> Eq for Cursor<'_, T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Cursor<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.get()).finish()
    }
}

/// A cursor which provides mutable access to a [`Tree`].
///
/// Besides moving around, a `CursorMut` can detach the element it points at and splice new
/// elements in right before it, skipping the descent from the root when the position is right.
pub struct CursorMut<'a, T, C = Less, A: Allocator = Global, B = Avl> {
    pub(crate) current: NonNull<Node<T>>,
    pub(crate) tree: &'a mut Tree<T, C, A, B>,
}

impl<'a, T, C, A: Allocator, B: Balance> CursorMut<'a, T, C, A, B> {
    pub(crate) fn new(tree: &'a mut Tree<T, C, A, B>, current: NonNull<Node<T>>) -> Self {
        Self { current, tree }
    }

    /// Returns the element the cursor points at, or `None` at the end position.
    pub fn get(&self) -> Option<&T> {
        self.as_cursor().get()
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.tree.raw.is_sentinel(self.current)
    }

    /// See [`Cursor::move_next`].
    pub fn move_next(&mut self) {
        // Safety: `current` belongs to the borrowed tree
        self.current = unsafe { node::step_next(self.current, self.tree.raw.sentinel()) };
    }

    /// See [`Cursor::move_prev`].
    pub fn move_prev(&mut self) {
        // Safety: `current` belongs to the borrowed tree
        self.current = unsafe { node::step_prev(self.current, self.tree.raw.sentinel()) };
    }

    /// Returns the element after the current one without moving the cursor.
    pub fn peek_next(&self) -> Option<&T> {
        self.as_cursor().peek_next()
    }

    /// Returns the element before the current one without moving the cursor.
    pub fn peek_prev(&self) -> Option<&T> {
        self.as_cursor().peek_prev()
    }

    /// Returns a read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, T, A> {
        Cursor::new(&self.tree.raw, self.current)
    }

    /// Detaches the current element and returns it as a [`NodeHandle`]. The cursor moves on to
    /// the next element.
    ///
    /// Returns `None` (and leaves the tree untouched) at the end position.
    pub fn extract(&mut self) -> Option<NodeHandle<T, A>>
    where
        A: Clone,
    {
        let node = self.detach_current()?;
        // Safety: the node was just detached from our tree and allocated by its allocator
        Some(unsafe { NodeHandle::from_raw(node, self.tree.raw.allocator().clone()) })
    }

    /// Removes the current element and returns its value. The cursor moves on to the next
    /// element.
    pub fn remove_current(&mut self) -> Option<T> {
        let node = self.detach_current()?;
        // Safety: the node was just detached from our tree
        Some(unsafe { self.tree.free_node(node) })
    }

    fn detach_current(&mut self) -> Option<NonNull<Node<T>>> {
        if self.is_end() {
            return None;
        }

        let node = self.current;
        // Safety: `node` is a real node of our tree
        unsafe {
            self.current = node::next(node, self.tree.raw.sentinel());
            self.tree.unlink_node(node);
        }
        Some(node)
    }
}

impl<'a, T, C: Compare<T>, A: Allocator, B: Balance> CursorMut<'a, T, C, A, B> {
    /// Inserts `value` using the cursor position as a hint and moves the cursor to the new
    /// element.
    ///
    /// When the new element belongs directly in front of the current position it is spliced in
    /// there without searching the tree. Otherwise the hint is ignored and the element is
    /// inserted as by [`Tree::insert`]. Either way, the element ends up in the same place.
    pub fn insert_before_hint(&mut self, value: T) {
        let node = self.tree.raw.alloc_node();
        // Safety: the node is fresh and the hint belongs to our tree
        unsafe {
            node::write_value(node, value);
            self.tree.link_node_hint(node, self.current);
        }
        self.current = node;
    }

    /// Like [`insert_before_hint`](Self::insert_before_hint), but moves an extracted node into
    /// the tree.
    ///
    /// Returns `false` (and leaves the cursor where it was) when the handle is empty.
    pub fn insert_node_hint(&mut self, handle: NodeHandle<T, A>) -> bool {
        let Some((node, _alloc)) = handle.into_raw() else {
            return false;
        };

        // Safety: the handle owned a detached, initialized node
        unsafe {
            self.tree.link_node_hint(node, self.current);
        }
        self.current = node;
        true
    }
}

impl<T: fmt::Debug, C, A: Allocator, B: Balance> fmt::Debug for CursorMut<'_, T, C, A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{AvlTree, BinarySearchTree};
    use alloc::vec::Vec;

    #[test]
    fn cursor_wraps_around_the_end() {
        let tree: AvlTree<u32> = [10, 20, 30].into_iter().collect();

        let mut cursor = tree.cursor_back();
        assert_eq!(cursor.get(), Some(&30));
        assert_eq!(cursor.peek_next(), None);

        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor.get(), None);
        assert_eq!(cursor.peek_next(), Some(&10));
        assert_eq!(cursor.peek_prev(), Some(&30));

        cursor.move_next();
        assert_eq!(cursor, tree.cursor_front());
        cursor.move_prev();
        assert_eq!(cursor, tree.cursor_end());
    }

    #[test]
    fn cursors_of_different_trees_differ() {
        let a: AvlTree<u32> = AvlTree::new();
        let b: AvlTree<u32> = AvlTree::new();
        assert_eq!(a.cursor_end(), a.cursor_front());
        assert_ne!(a.cursor_end(), b.cursor_end());
    }

    #[test]
    fn extract_while_walking() {
        let mut tree: BinarySearchTree<u32> = (0..10).collect();

        let mut cursor = tree.cursor_front_mut();
        while let Some(&value) = cursor.get() {
            if value % 2 == 0 {
                let handle = cursor.extract().unwrap();
                assert_eq!(handle.value(), Some(&value));
            } else {
                cursor.move_next();
            }
        }
        assert!(cursor.extract().is_none());

        tree.assert_valid();
        assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [1, 3, 5, 7, 9]);
    }

    #[test]
    fn hinted_insert_lands_in_order() {
        let mut tree: AvlTree<u32> = [10, 20, 30].into_iter().collect();

        // correct hint
        let mut cursor = tree.find_mut(&20);
        cursor.insert_before_hint(15);
        assert_eq!(cursor.get(), Some(&15));
        assert_eq!(cursor.peek_next(), Some(&20));

        // wrong hint falls back to a regular insert
        let mut cursor = tree.cursor_front_mut();
        cursor.insert_before_hint(25);
        assert_eq!(cursor.get(), Some(&25));
        assert_eq!(cursor.peek_prev(), Some(&20));

        // equal elements stay in insertion order, even when hinted in front of an equal element
        let mut cursor = tree.find_mut(&20);
        cursor.insert_before_hint(20);
        assert_eq!(cursor.peek_prev(), Some(&20));
        assert_eq!(cursor.peek_next(), Some(&25));

        tree.assert_valid();
        assert_eq!(
            tree.iter().copied().collect::<Vec<_>>(),
            [10, 15, 20, 20, 25, 30]
        );
    }
}
