//! A strategy drawing storage from a fixed byte budget.
//!
//! Useful both for bounding the memory a set of containers may consume and
//! for deterministic allocation-failure injection in tests.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AllocError, AllocStrategy, Global};

/// A shared pool of allocatable bytes.
///
/// Cloning a `Budget` yields another handle to the same pool; the pool is
/// released when the last handle goes away.
#[derive(Debug, Clone)]
pub struct Budget(Arc<BudgetNode>);

#[derive(Debug)]
struct BudgetNode {
    limit: usize,
    used: AtomicUsize,
}

impl Budget {
    /// Creates a budget of `limit` bytes.
    pub fn new(limit: usize) -> Budget {
        Budget(Arc::new(BudgetNode {
            limit,
            used: AtomicUsize::new(0),
        }))
    }

    /// An effectively unlimited budget.
    pub fn unlimited() -> Budget {
        Budget::new(usize::MAX)
    }

    /// Bytes currently drawn from the pool.
    ///
    /// Diagnostic only; the value may be outdated as soon as it is read.
    pub fn used(&self) -> usize {
        self.0.used.load(Ordering::Relaxed)
    }

    /// Bytes still available for drawing.
    pub fn remaining(&self) -> usize {
        self.0.limit.saturating_sub(self.used())
    }

    /// Whether `other` is a handle to the same pool.
    pub fn same_pool(&self, other: &Budget) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn draw(&self, amount: usize) -> bool {
        let mut used = self.0.used.load(Ordering::Relaxed);
        loop {
            let Some(next) = used.checked_add(amount) else {
                return false;
            };
            if next > self.0.limit {
                return false;
            }
            match self.0.used.compare_exchange_weak(
                used,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => used = actual,
            }
        }
    }

    fn refund(&self, amount: usize) {
        self.0.used.fetch_sub(amount, Ordering::Relaxed);
    }
}

/// An allocation strategy that draws storage bytes from a [`Budget`].
///
/// Requests beyond the remaining budget fail with [`AllocError`]; the bytes
/// of a successful request return to the pool on deallocation. The storage
/// itself comes from [`Global`].
///
/// Two instances are equivalent when they draw from the same pool. The
/// strategy propagates on copy, move and swap, so a container adopting
/// another's buffer also adopts the pool that buffer is charged against.
#[derive(Debug, Clone)]
pub struct BudgetStrategy {
    budget: Budget,
    inner: Global,
}

impl BudgetStrategy {
    /// Creates a strategy drawing from `budget`.
    pub fn new(budget: Budget) -> BudgetStrategy {
        BudgetStrategy {
            budget,
            inner: Global,
        }
    }

    /// Creates a strategy with its own fresh pool of `limit` bytes.
    pub fn with_limit(limit: usize) -> BudgetStrategy {
        BudgetStrategy::new(Budget::new(limit))
    }

    /// The pool this strategy draws from.
    pub fn budget(&self) -> &Budget {
        &self.budget
    }
}

impl AllocStrategy for BudgetStrategy {
    const PROPAGATE_ON_COPY: bool = true;
    const PROPAGATE_ON_MOVE: bool = true;
    const PROPAGATE_ON_SWAP: bool = true;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if !self.budget.draw(layout.size()) {
            log::trace!(
                "budget exhausted: requested {} bytes, {} remaining",
                layout.size(),
                self.budget.remaining()
            );
            return Err(AllocError::new(layout));
        }
        self.inner
            .allocate(layout)
            .inspect_err(|_| self.budget.refund(layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.budget.refund(layout.size());
    }

    fn is_equivalent(&self, other: &BudgetStrategy) -> bool {
        self.budget.same_pool(&other.budget)
    }

    fn fork_for_copy(&self) -> BudgetStrategy {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_and_refund() {
        let budget = Budget::new(100);
        assert!(budget.draw(60));
        assert_eq!(budget.used(), 60);
        assert_eq!(budget.remaining(), 40);
        assert!(!budget.draw(41));
        assert!(budget.draw(40));
        budget.refund(100);
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn allocation_respects_limit() {
        let strategy = BudgetStrategy::with_limit(64);
        let layout = Layout::array::<u8>(48).unwrap();
        let ptr = strategy.allocate(layout).unwrap();
        assert_eq!(strategy.budget().used(), 48);

        let err = strategy.allocate(Layout::array::<u8>(32).unwrap());
        assert!(err.is_err());
        assert_eq!(strategy.budget().used(), 48);

        unsafe { strategy.deallocate(ptr, layout) };
        assert_eq!(strategy.budget().used(), 0);
    }

    #[test]
    fn equivalence_is_pool_identity() {
        let shared = Budget::new(1024);
        let a = BudgetStrategy::new(shared.clone());
        let b = BudgetStrategy::new(shared);
        let c = BudgetStrategy::with_limit(1024);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
        assert!(a.fork_for_copy().is_equivalent(&a));
    }

    #[test]
    fn clones_share_the_pool() {
        let strategy = BudgetStrategy::with_limit(32);
        let clone = strategy.clone();
        let layout = Layout::array::<u8>(24).unwrap();
        let ptr = strategy.allocate(layout).unwrap();
        assert!(clone.allocate(Layout::array::<u8>(16).unwrap()).is_err());
        unsafe { clone.deallocate(ptr, layout) };
        assert_eq!(strategy.budget().used(), 0);
    }
}
