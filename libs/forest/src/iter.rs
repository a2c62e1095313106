use alloc::alloc::Global;
use core::alloc::Allocator;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::node::{self, Node};
use crate::raw::RawTree;

/// An iterator over references to the elements of a [`Tree`](crate::Tree), in order.
pub struct Iter<'a, T> {
    pub(crate) head: NonNull<Node<T>>,
    pub(crate) tail: NonNull<Node<T>>,
    pub(crate) sentinel: NonNull<Node<T>>,
    pub(crate) len: usize,
    pub(crate) _tree: PhantomData<&'a T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new<A: Allocator>(raw: &'a RawTree<T, A>) -> Self {
        let sentinel = raw.sentinel();
        Self {
            head: raw.first().unwrap_or(sentinel),
            tail: raw.last().unwrap_or(sentinel),
            sentinel,
            len: raw.len(),
            _tree: PhantomData,
        }
    }
}

impl<T> Clone for Iter<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;

        let head = self.head;
        // Safety: `len > 0` means `head` is a real node of the borrowed tree
        unsafe {
            if self.len > 0 {
                self.head = node::next(head, self.sentinel);
            }
            Some(node::value(head))
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;

        let tail = self.tail;
        // Safety: `len > 0` means `tail` is a real node of the borrowed tree
        unsafe {
            if self.len > 0 {
                self.tail = node::prev(tail, self.sentinel);
            }
            Some(node::value(tail))
        }
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// An owning iterator over the elements of a [`Tree`](crate::Tree), in order.
///
/// Each node is unlinked and freed as its value is yielded. Elements not consumed are dropped
/// with the iterator.
pub struct IntoIter<T, A: Allocator = Global> {
    pub(crate) raw: RawTree<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    fn take(&mut self, node: NonNull<Node<T>>) -> T {
        // Safety: `node` is a real node of `raw`. The tree is only ever drained from its ends
        // so it does not need to stay balanced.
        unsafe {
            self.raw.unlink(node);
            let value = node::read_value(node);
            self.raw.dealloc_node(node);
            value
        }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.raw.first()?;
        Some(self.take(first))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.len(), Some(self.raw.len()))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let last = self.raw.last()?;
        Some(self.take(last))
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(Iter::new(&self.raw)).finish()
    }
}

/// An iterator over a contiguous run of elements, such as the result of
/// [`Tree::equal_range`](crate::Tree::equal_range).
pub struct Range<'a, T> {
    /// First node to yield, or equal to `back` when exhausted.
    pub(crate) front: NonNull<Node<T>>,
    /// One past the last node to yield. May be the sentinel.
    pub(crate) back: NonNull<Node<T>>,
    pub(crate) sentinel: NonNull<Node<T>>,
    pub(crate) _tree: PhantomData<&'a T>,
}

impl<T> Clone for Range<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T: fmt::Debug> fmt::Debug for Range<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, T> Iterator for Range<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let front = self.front;
        // Safety: `front` lies strictly before `back`, so it is a real node
        unsafe {
            self.front = node::next(front, self.sentinel);
            Some(node::value(front))
        }
    }
}

impl<'a, T> DoubleEndedIterator for Range<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        // Safety: `back` lies strictly after `front`, so its predecessor is a real node
        unsafe {
            self.back = node::step_prev(self.back, self.sentinel);
            Some(node::value(self.back))
        }
    }
}

impl<T> FusedIterator for Range<'_, T> {}
