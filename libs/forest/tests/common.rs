#![allow(unused, reason = "not used by all tests")]
#![feature(allocator_api)]

use std::alloc::{AllocError, Allocator, Global, Layout};
use std::cell::Cell;
use std::cmp::Ordering;
use std::ptr::NonNull;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Allocator that tracks the number of live allocations and can be told to start failing.
#[derive(Clone, Debug, Default)]
pub struct TestAlloc {
    live: Rc<Cell<usize>>,
    total: Rc<Cell<usize>>,
    /// Number of further allocations that may succeed, unlimited when `None`.
    budget: Rc<Cell<Option<usize>>>,
}

impl TestAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.get()
    }

    pub fn total(&self) -> usize {
        self.total.get()
    }

    pub fn fail_after(&self, allocations: usize) {
        self.budget.set(Some(allocations));
    }

    pub fn never_fail(&self) {
        self.budget.set(None);
    }
}

// Safety: all allocations are forwarded to `Global`
unsafe impl Allocator for TestAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if let Some(budget) = self.budget.get() {
            if budget == 0 {
                return Err(AllocError);
            }
            self.budget.set(Some(budget - 1));
        }

        let ptr = Global.allocate(layout)?;
        self.live.set(self.live.get() + 1);
        self.total.set(self.total.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        // Safety: ensured by caller
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// An element that counts how often it was dropped. Ordered by `key` only, `tag` tells
/// equivalent elements apart.
#[derive(Debug)]
pub struct Tracked {
    pub key: u32,
    pub tag: u32,
    drops: Rc<Cell<usize>>,
}

impl Tracked {
    pub fn new(key: u32, tag: u32, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            key,
            tag,
            drops: drops.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Tracked {}

impl PartialOrd for Tracked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tracked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Sorted model of a multiset, equal keys in insertion order.
#[derive(Debug, Default)]
pub struct Model(pub Vec<u32>);

impl Model {
    pub fn insert(&mut self, value: u32) {
        let idx = self.0.partition_point(|&v| v <= value);
        self.0.insert(idx, value);
    }

    pub fn remove(&mut self, value: u32) -> Option<u32> {
        let idx = self.0.binary_search(&value).ok()?;
        Some(self.0.remove(idx))
    }

    pub fn count(&self, value: u32) -> usize {
        self.0.iter().filter(|&&v| v == value).count()
    }
}
