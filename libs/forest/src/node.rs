//! Node storage and the link-level walks shared by both tree variants.
//!
//! Every tree owns one extra node, the *sentinel*, which never holds a value. Its links are
//! repurposed: `parent` points to the root, `left` to the maximum and `right` to the minimum
//! element. In an empty tree all three point back at the sentinel itself. The root's `parent`
//! is the sentinel, which lets successor/predecessor walks terminate without a null check.

use core::fmt;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

pub(crate) type Link<T> = Option<NonNull<Node<T>>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A single allocation of a tree: structural links, the AVL height and the value slot.
///
/// The value slot is uninitialized for the sentinel and for nodes that are allocated but not
/// yet constructed. The height is only maintained by the AVL policy; binary search trees keep
/// the field for layout parity and leave it at zero.
pub struct Node<T> {
    parent: Link<T>,
    left: Link<T>,
    right: Link<T>,
    height: i8,
    value: MaybeUninit<T>,
}

impl<T> Node<T> {
    pub(crate) const fn new() -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            height: 0,
            value: MaybeUninit::uninit(),
        }
    }
}

// The accessors below go through raw place expressions so that no `&`/`&mut Node<T>` is ever
// materialized while other pointers into the same node are live.

#[inline]
pub(crate) unsafe fn parent<T>(node: NonNull<Node<T>>) -> Link<T> {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).parent }
}

#[inline]
pub(crate) unsafe fn set_parent<T>(node: NonNull<Node<T>>, link: Link<T>) {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).parent = link }
}

#[inline]
pub(crate) unsafe fn left<T>(node: NonNull<Node<T>>) -> Link<T> {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).left }
}

#[inline]
pub(crate) unsafe fn set_left<T>(node: NonNull<Node<T>>, link: Link<T>) {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).left = link }
}

#[inline]
pub(crate) unsafe fn right<T>(node: NonNull<Node<T>>) -> Link<T> {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).right }
}

#[inline]
pub(crate) unsafe fn set_right<T>(node: NonNull<Node<T>>, link: Link<T>) {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).right = link }
}

#[inline]
pub(crate) unsafe fn child<T>(node: NonNull<Node<T>>, side: Side) -> Link<T> {
    // Safety: ensured by caller
    unsafe {
        match side {
            Side::Left => left(node),
            Side::Right => right(node),
        }
    }
}

#[inline]
pub(crate) unsafe fn set_child<T>(node: NonNull<Node<T>>, side: Side, link: Link<T>) {
    // Safety: ensured by caller
    unsafe {
        match side {
            Side::Left => set_left(node, link),
            Side::Right => set_right(node, link),
        }
    }
}

#[inline]
pub(crate) unsafe fn height<T>(node: NonNull<Node<T>>) -> i8 {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).height }
}

#[inline]
pub(crate) unsafe fn set_height<T>(node: NonNull<Node<T>>, height: i8) {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).height = height }
}

/// Height of an optional subtree, where a missing child counts as `-1`.
#[inline]
pub(crate) unsafe fn link_height<T>(link: Link<T>) -> i8 {
    match link {
        // Safety: ensured by caller
        Some(node) => unsafe { height(node) },
        None => -1,
    }
}

/// Recomputes the height of `node` from its children: `1 + max(height(left), height(right))`.
#[inline]
pub(crate) unsafe fn node_height<T>(node: NonNull<Node<T>>) -> i8 {
    // Safety: ensured by caller
    unsafe { link_height(left(node)).max(link_height(right(node))) + 1 }
}

/// Difference `height(left) - height(right)`, missing children counting as `-1`.
#[inline]
pub(crate) unsafe fn balance_factor<T>(node: NonNull<Node<T>>) -> i8 {
    // Safety: ensured by caller
    unsafe { link_height(left(node)) - link_height(right(node)) }
}

/// Returns a reference to the value stored in `node`.
///
/// # Safety
///
/// `node` must not be a sentinel and its value must be initialized. The returned lifetime is
/// unbounded, callers must tie it to a borrow of the owning tree or handle.
#[inline]
pub(crate) unsafe fn value<'a, T>(node: NonNull<Node<T>>) -> &'a T {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).value.assume_init_ref() }
}

#[inline]
pub(crate) unsafe fn value_mut<'a, T>(node: NonNull<Node<T>>) -> &'a mut T {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).value.assume_init_mut() }
}

#[inline]
pub(crate) unsafe fn write_value<T>(node: NonNull<Node<T>>, value: T) {
    // Safety: ensured by caller
    unsafe {
        (*node.as_ptr()).value.write(value);
    }
}

#[inline]
pub(crate) unsafe fn read_value<T>(node: NonNull<Node<T>>) -> T {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).value.assume_init_read() }
}

#[inline]
pub(crate) unsafe fn drop_value<T>(node: NonNull<Node<T>>) {
    // Safety: ensured by caller
    unsafe { (*node.as_ptr()).value.assume_init_drop() }
}

/// Resets all structural links of a node that is no longer part of any tree.
#[inline]
pub(crate) unsafe fn unlink<T>(node: NonNull<Node<T>>) {
    // Safety: ensured by caller
    unsafe {
        set_parent(node, None);
        set_left(node, None);
        set_right(node, None);
        set_height(node, 0);
    }
}

pub(crate) unsafe fn find_minimum<T>(mut curr: NonNull<Node<T>>) -> NonNull<Node<T>> {
    // Safety: ensured by caller
    while let Some(l) = unsafe { left(curr) } {
        curr = l;
    }

    curr
}

pub(crate) unsafe fn find_maximum<T>(mut curr: NonNull<Node<T>>) -> NonNull<Node<T>> {
    // Safety: ensured by caller
    while let Some(r) = unsafe { right(curr) } {
        curr = r;
    }

    curr
}

/// In-order successor of `node`, which must be a real (non-sentinel) node.
///
/// Returns `sentinel` when `node` is the maximum.
pub(crate) unsafe fn next<T>(
    node: NonNull<Node<T>>,
    sentinel: NonNull<Node<T>>,
) -> NonNull<Node<T>> {
    debug_assert_ne!(node, sentinel);

    // Safety: ensured by caller
    unsafe {
        if let Some(r) = right(node) {
            return find_minimum(r);
        }

        let mut curr = node;
        loop {
            let p = parent(curr).expect("linked node must have a parent");
            if p == sentinel || right(p) != Some(curr) {
                return p;
            }
            curr = p;
        }
    }
}

/// In-order predecessor of `node`, which must be a real (non-sentinel) node.
///
/// Returns `sentinel` when `node` is the minimum.
pub(crate) unsafe fn prev<T>(
    node: NonNull<Node<T>>,
    sentinel: NonNull<Node<T>>,
) -> NonNull<Node<T>> {
    debug_assert_ne!(node, sentinel);

    // Safety: ensured by caller
    unsafe {
        if let Some(l) = left(node) {
            return find_maximum(l);
        }

        let mut curr = node;
        loop {
            let p = parent(curr).expect("linked node must have a parent");
            if p == sentinel || left(p) != Some(curr) {
                return p;
            }
            curr = p;
        }
    }
}

/// Cyclic step forward: the sentinel steps to the minimum (or stays put when the tree is empty).
#[inline]
pub(crate) unsafe fn step_next<T>(
    node: NonNull<Node<T>>,
    sentinel: NonNull<Node<T>>,
) -> NonNull<Node<T>> {
    // Safety: ensured by caller
    unsafe {
        if node == sentinel {
            right(sentinel).unwrap_or(sentinel)
        } else {
            next(node, sentinel)
        }
    }
}

/// Cyclic step backward: the sentinel steps to the maximum (or stays put when the tree is empty).
#[inline]
pub(crate) unsafe fn step_prev<T>(
    node: NonNull<Node<T>>,
    sentinel: NonNull<Node<T>>,
) -> NonNull<Node<T>> {
    // Safety: ensured by caller
    unsafe {
        if node == sentinel {
            left(sentinel).unwrap_or(sentinel)
        } else {
            prev(node, sentinel)
        }
    }
}
