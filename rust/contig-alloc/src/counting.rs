//! An instrumentation wrapper that tallies a strategy's operations.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AllocError, AllocStrategy, Global};

/// Shared operation tallies for a [`CountingStrategy`].
#[derive(Debug, Default)]
pub struct StrategyCounters {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    constructions: AtomicUsize,
    destructions: AtomicUsize,
}

impl StrategyCounters {
    /// Successful storage acquisitions.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Storage releases.
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Elements brought into existence through the construct hook.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::Relaxed)
    }

    /// Elements destroyed through the destroy hook.
    pub fn destructions(&self) -> usize {
        self.destructions.load(Ordering::Relaxed)
    }
}

/// Counts allocations, deallocations, constructions and destructions going
/// through an inner strategy.
///
/// The tallies live behind an `Arc`, so clones and copy-forks of the
/// strategy report into the same counters. Equivalence and the propagation
/// policy delegate to the inner strategy: counting changes what is observed,
/// never which buffers are interchangeable.
#[derive(Debug, Clone)]
pub struct CountingStrategy<S = Global> {
    inner: S,
    counters: Arc<StrategyCounters>,
}

impl<S: AllocStrategy> CountingStrategy<S> {
    /// Wraps `inner` with a fresh set of counters.
    pub fn new(inner: S) -> CountingStrategy<S> {
        CountingStrategy {
            inner,
            counters: Arc::new(StrategyCounters::default()),
        }
    }

    /// The shared tallies.
    pub fn counters(&self) -> &StrategyCounters {
        &self.counters
    }

    /// The wrapped strategy.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl Default for CountingStrategy<Global> {
    fn default() -> CountingStrategy<Global> {
        CountingStrategy::new(Global)
    }
}

impl<S: AllocStrategy> AllocStrategy for CountingStrategy<S> {
    const PROPAGATE_ON_COPY: bool = S::PROPAGATE_ON_COPY;
    const PROPAGATE_ON_MOVE: bool = S::PROPAGATE_ON_MOVE;
    const PROPAGATE_ON_SWAP: bool = S::PROPAGATE_ON_SWAP;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.counters.deallocations.fetch_add(1, Ordering::Relaxed);
    }

    unsafe fn construct<T>(&self, slot: *mut T, value: T) {
        unsafe { self.inner.construct(slot, value) };
        self.counters.constructions.fetch_add(1, Ordering::Relaxed);
    }

    unsafe fn destroy<T>(&self, slot: *mut T) {
        unsafe { self.inner.destroy(slot) };
        self.counters.destructions.fetch_add(1, Ordering::Relaxed);
    }

    fn is_equivalent(&self, other: &CountingStrategy<S>) -> bool {
        self.inner.is_equivalent(&other.inner)
    }

    fn fork_for_copy(&self) -> CountingStrategy<S> {
        CountingStrategy {
            inner: self.inner.fork_for_copy(),
            counters: self.counters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_storage_traffic() {
        let strategy = CountingStrategy::default();
        let layout = Layout::array::<u32>(8).unwrap();
        let ptr = strategy.allocate(layout).unwrap();
        unsafe { strategy.deallocate(ptr, layout) };
        assert_eq!(strategy.counters().allocations(), 1);
        assert_eq!(strategy.counters().deallocations(), 1);
    }

    #[test]
    fn counts_element_lifecycle() {
        let strategy = CountingStrategy::default();
        let layout = Layout::new::<Box<u32>>();
        let ptr = strategy.allocate(layout).unwrap().cast::<Box<u32>>();
        unsafe {
            strategy.construct(ptr.as_ptr(), Box::new(7));
            strategy.destroy(ptr.as_ptr());
            strategy.deallocate(ptr.cast(), layout);
        }
        assert_eq!(strategy.counters().constructions(), 1);
        assert_eq!(strategy.counters().destructions(), 1);
    }

    #[test]
    fn forks_share_counters_and_failed_allocations_do_not_count() {
        let strategy = CountingStrategy::new(crate::BudgetStrategy::with_limit(16));
        let fork = strategy.fork_for_copy();
        assert!(strategy.allocate(Layout::array::<u8>(64).unwrap()).is_err());
        assert_eq!(fork.counters().allocations(), 0);

        let layout = Layout::array::<u8>(8).unwrap();
        let ptr = fork.allocate(layout).unwrap();
        unsafe { fork.deallocate(ptr, layout) };
        assert_eq!(strategy.counters().allocations(), 1);
        assert!(strategy.is_equivalent(&fork));
    }
}
