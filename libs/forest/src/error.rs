use core::alloc::AllocError;
use core::fmt;

/// Returned by [`Tree::try_insert`](crate::Tree::try_insert) when no node could be allocated.
///
/// The value that was supposed to be inserted is handed back.
pub struct TryInsertError<T> {
    value: T,
}

impl<T> TryInsertError<T> {
    pub(crate) fn new(value: T) -> Self {
        Self { value }
    }

    /// Returns the value that could not be inserted.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for TryInsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryInsertError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for TryInsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

impl<T> core::error::Error for TryInsertError<T> {}

/// Returned by [`Tree::try_insert_with`](crate::Tree::try_insert_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmplaceError<E> {
    /// No node could be allocated, the constructor was never called.
    Alloc,
    /// The constructor failed. The node has been released again.
    Construct(E),
}

impl<E> From<AllocError> for EmplaceError<E> {
    fn from(_: AllocError) -> Self {
        Self::Alloc
    }
}

impl<E: fmt::Display> fmt::Display for EmplaceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmplaceError::Alloc => f.write_str("memory allocation failed"),
            EmplaceError::Construct(err) => write!(f, "failed to construct value: {err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> core::error::Error for EmplaceError<E> {}
