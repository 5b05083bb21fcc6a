//! The owned storage of a contiguous container.

use std::alloc::Layout;
use std::ptr::NonNull;

use contig_alloc::AllocStrategy;

use crate::error::{Error, Result};

/// A single contiguous allocation of element slots, paired with the
/// allocation strategy that produced it.
///
/// `RawBuffer` knows nothing about which slots hold live elements; the
/// container layers its live-length invariant on top. Dropping a `RawBuffer`
/// releases the storage without touching element lifecycles.
///
/// The null state (dangling pointer, zero capacity) is how empty buffers
/// are represented; no allocation is ever made for zero capacity.
/// Zero-sized element types never allocate and report unbounded capacity.
pub(crate) struct RawBuffer<T, S: AllocStrategy> {
    ptr: NonNull<T>,
    cap: usize,
    strategy: S,
}

unsafe impl<T: Send, S: AllocStrategy + Send> Send for RawBuffer<T, S> {}
unsafe impl<T: Sync, S: AllocStrategy + Sync> Sync for RawBuffer<T, S> {}

impl<T, S: AllocStrategy> RawBuffer<T, S> {
    const IS_ZST: bool = size_of::<T>() == 0;

    /// A buffer in the null state.
    pub fn new_in(strategy: S) -> RawBuffer<T, S> {
        RawBuffer {
            ptr: NonNull::dangling(),
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            strategy,
        }
    }

    /// Allocates exactly `cap` slots, or the null state for `cap == 0`.
    pub fn allocate_in(cap: usize, strategy: S) -> Result<RawBuffer<T, S>> {
        let mut buf = RawBuffer::new_in(strategy);
        if !Self::IS_ZST && cap != 0 {
            let ptr = buf.allocate_detached(cap)?;
            buf.ptr = ptr;
            buf.cap = cap;
        }
        Ok(buf)
    }

    #[inline]
    pub fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn cap(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Replaces the storage with a fresh allocation of exactly `new_cap`
    /// slots, relocating the first `live` elements into it and releasing
    /// the old storage. On failure nothing has changed.
    pub fn reallocate(&mut self, new_cap: usize, live: usize) -> Result<()> {
        debug_assert!(new_cap >= live);
        if Self::IS_ZST {
            return Ok(());
        }
        if new_cap == 0 {
            self.release_storage();
            return Ok(());
        }
        let new_ptr = self.allocate_detached(new_cap)?;
        unsafe {
            contig_uninit::move_insert_range(new_ptr.as_ptr(), self.ptr(), live);
            self.adopt_detached(new_ptr, new_cap);
        }
        Ok(())
    }

    /// Allocates `cap` slots through this buffer's strategy without
    /// adopting them. The caller either installs the storage with
    /// [`adopt_detached`](Self::adopt_detached) or releases it with
    /// [`abandon_detached`](Self::abandon_detached).
    pub fn allocate_detached(&self, cap: usize) -> Result<NonNull<T>> {
        debug_assert!(!Self::IS_ZST && cap != 0);
        let layout = Layout::array::<T>(cap).map_err(|_| Error::CapacityOverflow)?;
        Ok(self.strategy.allocate(layout)?.cast())
    }

    /// Releases a detached allocation made by
    /// [`allocate_detached`](Self::allocate_detached).
    ///
    /// # Safety
    ///
    /// `ptr`/`cap` must come from a successful `allocate_detached` call on
    /// this buffer (or one with an equivalent strategy), and any elements
    /// constructed in the storage must already be destroyed.
    pub unsafe fn abandon_detached(&self, ptr: NonNull<T>, cap: usize) {
        let layout = Layout::array::<T>(cap).expect("layout validated at allocation");
        unsafe { self.strategy.deallocate(ptr.cast(), layout) };
    }

    /// Installs a detached allocation as this buffer's storage, releasing
    /// the previous storage.
    ///
    /// # Safety
    ///
    /// `ptr`/`cap` must come from a successful `allocate_detached` call on
    /// this buffer, and every live element must already have been relocated
    /// out of the old storage.
    pub unsafe fn adopt_detached(&mut self, ptr: NonNull<T>, cap: usize) {
        self.release_storage();
        self.ptr = ptr;
        self.cap = cap;
    }

    /// Releases the storage (if any), returning to the null state. Element
    /// lifecycles are the caller's concern.
    pub fn release_storage(&mut self) {
        if !Self::IS_ZST && self.cap != 0 {
            let layout = Layout::array::<T>(self.cap).expect("layout validated at allocation");
            unsafe { self.strategy.deallocate(self.ptr.cast(), layout) };
            self.ptr = NonNull::dangling();
            self.cap = 0;
        }
    }

    /// Releases the storage and replaces the strategy. Used when a
    /// propagation policy adopts a foreign instance: the old storage must
    /// go back through the strategy that allocated it first.
    pub fn reset_with_strategy(&mut self, strategy: S) {
        self.release_storage();
        self.strategy = strategy;
    }

    /// Exchanges storage (pointer and capacity) but not strategies.
    ///
    /// Only meaningful when the two strategies are equivalent, so either
    /// instance can later release either storage.
    pub fn swap_storage(&mut self, other: &mut RawBuffer<T, S>) {
        std::mem::swap(&mut self.ptr, &mut other.ptr);
        std::mem::swap(&mut self.cap, &mut other.cap);
    }
}

impl<T, S: AllocStrategy> Drop for RawBuffer<T, S> {
    fn drop(&mut self) {
        self.release_storage();
    }
}
