use alloc::alloc::Global;
use core::alloc::{Allocator, Layout};
use core::fmt;
use core::mem::{self, ManuallyDrop};
use core::ptr::NonNull;

use crate::node::{self, Node};

/// Owns a single node that has been detached from a tree.
///
/// A handle is obtained from [`CursorMut::extract`](crate::CursorMut::extract) or
/// [`Tree::extract_value`](crate::Tree::extract_value) and can be moved into any tree with the
/// same element and allocator types through [`Tree::insert_node`](crate::Tree::insert_node) or
/// [`CursorMut::insert_node_hint`](crate::CursorMut::insert_node_hint). Neither direction moves
/// or copies the value: the node allocation itself changes owner.
///
/// A handle may also be *empty*, which is what an unsuccessful `extract_value` returns.
/// Dropping a non-empty handle drops the value and frees the node.
///
/// The receiving tree frees the node with its own allocator, which therefore has to be able to
/// deallocate memory from the allocator the handle was created with (as is always the case for
/// [`Global`]).
pub struct NodeHandle<T, A: Allocator = Global> {
    inner: Option<(NonNull<Node<T>>, A)>,
}

// Safety: the handle exclusively owns the node and its value
unsafe impl<T: Send, A: Allocator + Send> Send for NodeHandle<T, A> {}
// Safety: shared access only ever hands out `&T`
unsafe impl<T: Sync, A: Allocator + Sync> Sync for NodeHandle<T, A> {}

impl<T, A: Allocator> NodeHandle<T, A> {
    /// Creates a handle that holds no node.
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// # Safety
    ///
    /// `node` must be detached, hold an initialized value and have been allocated by `alloc`.
    pub(crate) unsafe fn from_raw(node: NonNull<Node<T>>, alloc: A) -> Self {
        Self {
            inner: Some((node, alloc)),
        }
    }

    /// Gives up ownership of the node without dropping it.
    pub(crate) fn into_raw(self) -> Option<(NonNull<Node<T>>, A)> {
        let mut this = ManuallyDrop::new(self);
        this.inner.take()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn value(&self) -> Option<&T> {
        self.inner.as_ref().map(|(node, _)| {
            // Safety: a held node always carries an initialized value
            unsafe { node::value(*node) }
        })
    }

    /// Mutable access to the value. The node is not part of any tree, so any change is allowed.
    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut().map(|(node, _)| {
            // Safety: a held node always carries an initialized value
            unsafe { node::value_mut(*node) }
        })
    }

    /// Moves the value out and frees the node.
    pub fn into_value(self) -> Option<T> {
        let (node, alloc) = self.into_raw()?;

        // Safety: we own the node, its value is initialized and is read exactly once
        unsafe {
            let value = node::read_value(node);
            alloc.deallocate(node.cast(), Layout::new::<Node<T>>());
            Some(value)
        }
    }

    pub fn allocator(&self) -> Option<&A> {
        self.inner.as_ref().map(|(_, alloc)| alloc)
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.inner, &mut other.inner);
    }
}

impl<T, A: Allocator> Default for NodeHandle<T, A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, A: Allocator> Drop for NodeHandle<T, A> {
    fn drop(&mut self) {
        if let Some((node, alloc)) = self.inner.take() {
            // Safety: we own the node and its value is initialized
            unsafe {
                node::drop_value(node);
                alloc.deallocate(node.cast(), Layout::new::<Node<T>>());
            }
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for NodeHandle<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => f.debug_tuple("NodeHandle").field(value).finish(),
            None => f.write_str("NodeHandle(<empty>)"),
        }
    }
}
