//! Ordering predicates used by the trees.
//!
//! Trees do not rely on [`Ord`] directly. Instead they are parameterized over a comparator
//! implementing [`Compare`], a strict weak ordering expressed as a single `less` predicate.
//! Two elements `a` and `b` are considered *equivalent* when neither `less(a, b)` nor
//! `less(b, a)` holds.
//!
//! Lookups with a key type other than the element type (say `&str` into a tree of `String`s) are
//! only available when the comparator opts in by implementing [`Transparent`] for that key type.

use core::borrow::Borrow;
use core::fmt;

/// A strict weak ordering over `T`.
///
/// Implementations must be irreflexive (`!less(a, a)`), transitive and their equivalence
/// relation must be transitive too. A comparator that violates these rules will not cause
/// memory unsafety, but the tree's iteration order and lookups become unspecified.
pub trait Compare<T: ?Sized> {
    /// Returns `true` if `a` is ordered strictly before `b`.
    fn less(&self, a: &T, b: &T) -> bool;
}

/// A comparator that can also order elements of type `T` against lookup keys of type `Q`.
///
/// This is the capability that unlocks the heterogeneous `*_key` lookup methods of
/// [`Tree`](crate::Tree). The ordering between values and keys must agree with
/// [`Compare::less`], i.e. converting a key to an equivalent value and comparing that must give
/// the same answer.
pub trait Transparent<T: ?Sized, Q: ?Sized>: Compare<T> {
    /// Returns `true` if `value` is ordered strictly before `key`.
    fn value_less(&self, value: &T, key: &Q) -> bool;
    /// Returns `true` if `key` is ordered strictly before `value`.
    fn key_less(&self, key: &Q, value: &T) -> bool;
}

/// Ascending order according to [`Ord`]. This is the default comparator.
///
/// `Less` is transparent for every key type the element type can be [borrowed](Borrow) as.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Less;

impl<T: Ord + ?Sized> Compare<T> for Less {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

impl<T, Q> Transparent<T, Q> for Less
where
    T: Borrow<Q> + Ord + ?Sized,
    Q: Ord + ?Sized,
{
    #[inline]
    fn value_less(&self, value: &T, key: &Q) -> bool {
        value.borrow() < key
    }

    #[inline]
    fn key_less(&self, key: &Q, value: &T) -> bool {
        key < value.borrow()
    }
}

/// Descending order according to [`Ord`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Greater;

impl<T: Ord + ?Sized> Compare<T> for Greater {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        a > b
    }
}

impl<T, Q> Transparent<T, Q> for Greater
where
    T: Borrow<Q> + Ord + ?Sized,
    Q: Ord + ?Sized,
{
    #[inline]
    fn value_less(&self, value: &T, key: &Q) -> bool {
        value.borrow() > key
    }

    #[inline]
    fn key_less(&self, key: &Q, value: &T) -> bool {
        key > value.borrow()
    }
}

/// Adapts a closure `Fn(&T, &T) -> bool` into a comparator.
///
/// Closures are never transparent, lookups go through the element type.
#[derive(Clone, Copy, Default)]
pub struct FnCompare<F>(pub F);

impl<F> fmt::Debug for FnCompare<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnCompare").finish_non_exhaustive()
    }
}

impl<T, F> Compare<T> for FnCompare<F>
where
    T: ?Sized,
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        (self.0)(a, b)
    }
}

impl<T: ?Sized, C: Compare<T> + ?Sized> Compare<T> for &C {
    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        (**self).less(a, b)
    }
}
