use alloc::alloc::handle_alloc_error;
use core::alloc::{AllocError, Allocator, Layout};
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::node::{self, Link, Node, Side};

/// The untyped-ordering core shared by every tree variant.
///
/// `RawTree` owns the sentinel, the allocator and the element count. It knows how to allocate
/// and free nodes, how to splice a node in at a given leaf position and how to unlink a node,
/// keeping the sentinel's root/min/max encoding intact. It never compares values itself:
/// ordering decisions are made by the caller and passed in as positions or predicates, and
/// balancing is layered on top by the [`Balance`](crate::Balance) policies.
pub struct RawTree<T, A: Allocator> {
    sentinel: NonNull<Node<T>>,
    len: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

// Safety: the tree exclusively owns all of its nodes, sending it sends the `T`s and the allocator
unsafe impl<T: Send, A: Allocator + Send> Send for RawTree<T, A> {}
// Safety: shared access only ever hands out `&T`
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawTree<T, A> {}

impl<T, A: Allocator> Drop for RawTree<T, A> {
    fn drop(&mut self) {
        self.clear();
        // Safety: the sentinel was allocated from `self.alloc` with the node layout
        unsafe {
            self.alloc.deallocate(self.sentinel.cast(), Self::LAYOUT);
        }
    }
}

impl<T, A: Allocator> RawTree<T, A> {
    const LAYOUT: Layout = Layout::new::<Node<T>>();

    pub(crate) fn try_new_in(alloc: A) -> Result<Self, AllocError> {
        let sentinel = alloc.allocate(Self::LAYOUT)?.cast::<Node<T>>();

        // Safety: freshly allocated with the right layout
        unsafe {
            sentinel.write(Node::new());
            node::set_parent(sentinel, Some(sentinel));
            node::set_left(sentinel, Some(sentinel));
            node::set_right(sentinel, Some(sentinel));
        }

        Ok(Self {
            sentinel,
            len: 0,
            alloc,
            _marker: PhantomData,
        })
    }

    pub(crate) fn new_in(alloc: A) -> Self {
        match Self::try_new_in(alloc) {
            Ok(raw) => raw,
            Err(AllocError) => handle_alloc_error(Self::LAYOUT),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub(crate) fn sentinel(&self) -> NonNull<Node<T>> {
        self.sentinel
    }

    #[inline]
    pub(crate) fn is_sentinel(&self, node: NonNull<Node<T>>) -> bool {
        node == self.sentinel
    }

    /// Largest number of nodes the address space could theoretically hold.
    pub(crate) fn max_size(&self) -> usize {
        (usize::MAX >> 1) / Self::LAYOUT.size()
    }

    #[inline]
    pub(crate) fn root(&self) -> Link<T> {
        // Safety: the sentinel is always valid
        let root = unsafe { node::parent(self.sentinel) };
        root.filter(|&root| root != self.sentinel)
    }

    #[inline]
    pub(crate) fn first(&self) -> Link<T> {
        // Safety: the sentinel is always valid
        let min = unsafe { node::right(self.sentinel) };
        min.filter(|&min| min != self.sentinel)
    }

    #[inline]
    pub(crate) fn last(&self) -> Link<T> {
        // Safety: the sentinel is always valid
        let max = unsafe { node::left(self.sentinel) };
        max.filter(|&max| max != self.sentinel)
    }

    /// Allocates a detached node whose value slot is still uninitialized.
    pub(crate) fn try_alloc_node(&self) -> Result<NonNull<Node<T>>, AllocError> {
        let ptr = self.alloc.allocate(Self::LAYOUT)?.cast::<Node<T>>();
        // Safety: freshly allocated with the right layout
        unsafe {
            ptr.write(Node::new());
        }
        Ok(ptr)
    }

    pub(crate) fn alloc_node(&self) -> NonNull<Node<T>> {
        match self.try_alloc_node() {
            Ok(ptr) => ptr,
            Err(AllocError) => handle_alloc_error(Self::LAYOUT),
        }
    }

    /// Returns a node's storage to the allocator without touching its value.
    ///
    /// # Safety
    ///
    /// `node` must have been allocated by this tree's allocator (or one it was cloned from),
    /// must be detached and its value must be dropped or moved out already.
    pub(crate) unsafe fn dealloc_node(&self, node: NonNull<Node<T>>) {
        // Safety: ensured by caller
        unsafe {
            self.alloc.deallocate(node.cast(), Self::LAYOUT);
        }
    }

    /// Finds the leaf position a new value would be spliced into.
    ///
    /// `goes_left(existing)` decides the direction at each node; returning `false` for equal
    /// elements places the new value after all of its equivalents.
    pub(crate) fn leaf_position(
        &self,
        mut goes_left: impl FnMut(&T) -> bool,
    ) -> Option<(NonNull<Node<T>>, Side)> {
        let mut curr = self.root()?;
        loop {
            // Safety: `curr` is a linked real node
            let side = if goes_left(unsafe { node::value(curr) }) {
                Side::Left
            } else {
                Side::Right
            };

            // Safety: `curr` is a linked real node
            match unsafe { node::child(curr, side) } {
                Some(child) => curr = child,
                None => return Some((curr, side)),
            }
        }
    }

    /// Splices the detached `node` in as the `side` child of `parent`, or as the root when
    /// `position` is `None` (which is only valid for an empty tree).
    ///
    /// # Safety
    ///
    /// `node` must be detached with an initialized value, the position must be a free child
    /// slot of a node in this tree and must respect the ordering of the tree.
    pub(crate) unsafe fn link_at(
        &mut self,
        node: NonNull<Node<T>>,
        position: Option<(NonNull<Node<T>>, Side)>,
    ) {
        // Safety: ensured by caller
        unsafe {
            match position {
                None => {
                    debug_assert_eq!(self.len, 0);
                    node::set_parent(node, Some(self.sentinel));
                    node::set_parent(self.sentinel, Some(node));
                    node::set_left(self.sentinel, Some(node));
                    node::set_right(self.sentinel, Some(node));
                }
                Some((parent, side)) => {
                    debug_assert!(node::child(parent, side).is_none());
                    node::set_parent(node, Some(parent));
                    node::set_child(parent, side, Some(node));

                    match side {
                        Side::Left if node::right(self.sentinel) == Some(parent) => {
                            node::set_right(self.sentinel, Some(node));
                        }
                        Side::Right if node::left(self.sentinel) == Some(parent) => {
                            node::set_left(self.sentinel, Some(node));
                        }
                        _ => {}
                    }
                }
            }
        }

        self.len += 1;
    }

    /// Free leaf slot directly in front of `pos` in iteration order. `pos` may be the sentinel,
    /// in which case the slot after the current maximum is returned.
    pub(crate) unsafe fn position_before(
        &self,
        pos: NonNull<Node<T>>,
    ) -> Option<(NonNull<Node<T>>, Side)> {
        // Safety: ensured by caller
        unsafe {
            if pos == self.sentinel {
                return self.last().map(|max| (max, Side::Right));
            }

            match node::left(pos) {
                None => Some((pos, Side::Left)),
                Some(left) => Some((node::find_maximum(left), Side::Right)),
            }
        }
    }

    /// Makes `new` take `old`'s place as child of `parent` (which may be the sentinel).
    #[inline]
    pub(crate) unsafe fn replace_child(
        &mut self,
        parent: NonNull<Node<T>>,
        old: NonNull<Node<T>>,
        new: Link<T>,
    ) {
        // Safety: ensured by caller
        unsafe {
            if parent == self.sentinel {
                node::set_parent(self.sentinel, Some(new.unwrap_or(self.sentinel)));
            } else if node::left(parent) == Some(old) {
                node::set_left(parent, new);
            } else {
                debug_assert_eq!(node::right(parent), Some(old));
                node::set_right(parent, new);
            }
        }
    }

    /// Detaches `node` from the tree without touching its value.
    ///
    /// Returns the node at which the structure changed, i.e. the parent of the vacated slot,
    /// which is where rebalancing has to start from. Returns `None` when that is the sentinel.
    ///
    /// # Safety
    ///
    /// `node` must be a real node currently linked into this tree.
    pub(crate) unsafe fn unlink(&mut self, node: NonNull<Node<T>>) -> Link<T> {
        debug_assert!(!self.is_sentinel(node));
        debug_assert!(self.len > 0);

        // Safety: ensured by caller
        unsafe {
            // Maintain the sentinel's bounds first, while the neighbours are still reachable.
            // A node with two children is never the minimum or the maximum.
            if node::right(self.sentinel) == Some(node) {
                let succ = node::next(node, self.sentinel);
                node::set_right(self.sentinel, Some(succ));
            }
            if node::left(self.sentinel) == Some(node) {
                let pred = node::prev(node, self.sentinel);
                node::set_left(self.sentinel, Some(pred));
            }

            if let (Some(left), Some(_)) = (node::left(node), node::right(node)) {
                tracing::trace!("unlink: node has two children, swapping with its predecessor");
                let pred = node::find_maximum(left);
                self.swap_with_predecessor(node, pred);
            }

            // `node` has at most one child now
            let parent = node::parent(node).expect("linked node must have a parent");
            let child = node::left(node).or(node::right(node));

            self.replace_child(parent, node, child);
            if let Some(child) = child {
                node::set_parent(child, Some(parent));
            }

            node::unlink(node);
            self.len -= 1;

            (parent != self.sentinel).then_some(parent)
        }
    }

    /// Exchanges the structural positions of `node` and its in-order predecessor `pred` (the
    /// rightmost node of `node`'s left subtree). Only links and heights move, values stay put.
    unsafe fn swap_with_predecessor(&mut self, node: NonNull<Node<T>>, pred: NonNull<Node<T>>) {
        // Safety: ensured by caller
        unsafe {
            debug_assert!(node::right(pred).is_none());

            let parent = node::parent(node).expect("linked node must have a parent");
            let left = node::left(node).expect("node must have two children");
            let right = node::right(node).expect("node must have two children");
            let pred_parent = node::parent(pred).expect("linked node must have a parent");
            let pred_left = node::left(pred);

            // pred takes node's slot under node's parent
            self.replace_child(parent, node, Some(pred));
            node::set_parent(pred, Some(parent));

            // pred adopts node's right subtree
            node::set_right(pred, Some(right));
            node::set_parent(right, Some(pred));

            if pred == left {
                // pred was node's direct left child: node hangs off pred's left
                node::set_left(pred, Some(node));
                node::set_parent(node, Some(pred));
            } else {
                node::set_left(pred, Some(left));
                node::set_parent(left, Some(pred));

                // pred was the right child of its parent
                node::set_right(pred_parent, Some(node));
                node::set_parent(node, Some(pred_parent));
            }

            // node inherits pred's (at most one, left) child
            node::set_left(node, pred_left);
            node::set_right(node, None);
            if let Some(pred_left) = pred_left {
                node::set_parent(pred_left, Some(node));
            }

            let height = node::height(node);
            node::set_height(node, node::height(pred));
            node::set_height(pred, height);
        }
    }

    /// Lowest node whose value is not ordered before the key, or the sentinel.
    ///
    /// Among equivalent elements this is always the first one in iteration order.
    pub(crate) fn lower_bound(&self, mut value_less: impl FnMut(&T) -> bool) -> NonNull<Node<T>> {
        let mut result = self.sentinel;
        let mut curr = self.root();
        while let Some(node) = curr {
            // Safety: `node` is a linked real node
            unsafe {
                if value_less(node::value(node)) {
                    curr = node::right(node);
                } else {
                    result = node;
                    curr = node::left(node);
                }
            }
        }
        result
    }

    /// Lowest node whose value is ordered after the key, or the sentinel.
    pub(crate) fn upper_bound(&self, mut key_less: impl FnMut(&T) -> bool) -> NonNull<Node<T>> {
        let mut result = self.sentinel;
        let mut curr = self.root();
        while let Some(node) = curr {
            // Safety: `node` is a linked real node
            unsafe {
                if key_less(node::value(node)) {
                    result = node;
                    curr = node::left(node);
                } else {
                    curr = node::right(node);
                }
            }
        }
        result
    }

    /// First node encountered on the search path that is equivalent to the key, or the sentinel.
    pub(crate) fn find(
        &self,
        mut value_less: impl FnMut(&T) -> bool,
        mut key_less: impl FnMut(&T) -> bool,
    ) -> NonNull<Node<T>> {
        let mut curr = self.root();
        while let Some(node) = curr {
            // Safety: `node` is a linked real node
            unsafe {
                let value = node::value(node);
                if key_less(value) {
                    curr = node::left(node);
                } else if value_less(value) {
                    curr = node::right(node);
                } else {
                    return node;
                }
            }
        }
        self.sentinel
    }

    /// Height of the tree (a single node has height 0, the empty tree -1), measured by walking
    /// every path instead of trusting the stored height fields.
    pub(crate) fn height(&self) -> isize {
        let Some(mut node) = self.root() else {
            return -1;
        };

        let mut depth: isize = 0;
        let mut max = 0;

        // Safety: all nodes reached are linked real nodes
        unsafe {
            'descend: loop {
                while let Some(left) = node::left(node) {
                    node = left;
                    depth += 1;
                }
                max = max.max(depth);

                loop {
                    if let Some(right) = node::right(node) {
                        node = right;
                        depth += 1;
                        continue 'descend;
                    }

                    // climb until we arrive from a left child, that parent's right subtree is next
                    loop {
                        let parent = node::parent(node).expect("linked node must have a parent");
                        if parent == self.sentinel {
                            return max;
                        }
                        depth -= 1;
                        let from_left = node::left(parent) == Some(node);
                        node = parent;
                        if from_left {
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Drops all values and frees all nodes, leaving an empty tree.
    pub(crate) fn clear(&mut self) {
        let Some(root) = self.root() else {
            return;
        };

        // Reset first so that a panicking destructor leaks the rest instead of leaving dangling
        // links behind.
        // Safety: the sentinel is always valid
        unsafe {
            node::set_parent(self.sentinel, Some(self.sentinel));
            node::set_left(self.sentinel, Some(self.sentinel));
            node::set_right(self.sentinel, Some(self.sentinel));
        }
        self.len = 0;

        // Post-order teardown through the parent links, no recursion and no extra memory.
        let mut curr = root;
        // Safety: every node reached is owned by this tree and freed exactly once
        unsafe {
            loop {
                if let Some(left) = node::left(curr) {
                    node::set_left(curr, None);
                    curr = left;
                    continue;
                }
                if let Some(right) = node::right(curr) {
                    node::set_right(curr, None);
                    curr = right;
                    continue;
                }

                let parent = node::parent(curr);
                node::drop_value(curr);
                self.dealloc_node(curr);

                match parent {
                    Some(parent) if parent != self.sentinel => curr = parent,
                    _ => break,
                }
            }
        }
    }

    /// Swaps the entire contents (nodes, count, allocator) of two trees in O(1).
    pub(crate) fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }
}

impl<T: Clone, A: Allocator + Clone> RawTree<T, A> {
    /// Deep copy preserving the exact shape (and heights) of `self`.
    pub(crate) fn clone_structure(&self) -> Self {
        let mut out = Self::new_in(self.alloc.clone());

        let Some(src_root) = self.root() else {
            return out;
        };

        // Safety: `src` walks linked nodes of `self`, `dst` walks the nodes just created in
        // `out`. The partially built copy is always a well-formed tree so dropping `out` on a
        // panicking `clone` frees exactly what was built.
        unsafe {
            let dst_root = out.clone_node(src_root);
            node::set_parent(dst_root, Some(out.sentinel));
            node::set_parent(out.sentinel, Some(dst_root));

            let (mut src, mut dst) = (src_root, dst_root);
            loop {
                if let Some(src_left) = node::left(src)
                    && node::left(dst).is_none()
                {
                    let dst_left = out.clone_node(src_left);
                    node::set_left(dst, Some(dst_left));
                    node::set_parent(dst_left, Some(dst));
                    (src, dst) = (src_left, dst_left);
                    continue;
                }

                if let Some(src_right) = node::right(src)
                    && node::right(dst).is_none()
                {
                    let dst_right = out.clone_node(src_right);
                    node::set_right(dst, Some(dst_right));
                    node::set_parent(dst_right, Some(dst));
                    (src, dst) = (src_right, dst_right);
                    continue;
                }

                if src == src_root {
                    break;
                }
                src = node::parent(src).expect("linked node must have a parent");
                dst = node::parent(dst).expect("linked node must have a parent");
            }

            node::set_right(out.sentinel, Some(node::find_minimum(dst_root)));
            node::set_left(out.sentinel, Some(node::find_maximum(dst_root)));
        }
        out.len = self.len;

        out
    }

    /// Allocates a detached copy of `src` (value and height).
    unsafe fn clone_node(&self, src: NonNull<Node<T>>) -> NonNull<Node<T>> {
        let dst = self.alloc_node();
        let guard = DeallocOnUnwind { raw: self, node: dst };
        // Safety: `src` is a linked real node, `dst` a fresh detached one
        unsafe {
            let value = node::value(src).clone();
            core::mem::forget(guard);
            node::write_value(dst, value);
            node::set_height(dst, node::height(src));
        }
        dst
    }
}

/// Releases a freshly allocated, still uninitialized node if value construction unwinds.
pub(crate) struct DeallocOnUnwind<'a, T, A: Allocator> {
    pub(crate) raw: &'a RawTree<T, A>,
    pub(crate) node: NonNull<Node<T>>,
}

impl<T, A: Allocator> Drop for DeallocOnUnwind<'_, T, A> {
    fn drop(&mut self) {
        // Safety: the node was allocated by `raw` and holds no value yet
        unsafe { self.raw.dealloc_node(self.node) }
    }
}
