//! The growable container.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut, Index, IndexMut, Range, RangeBounds};
use std::ptr::NonNull;
use std::slice::SliceIndex;

use contig_alloc::{AllocStrategy, Global};
use contig_uninit as uninit;

use crate::buffer::RawBuffer;
use crate::error::{Error, Result};
use crate::into_iter::IntoIter;

/// Smallest capacity the growth policy will allocate.
const MIN_GROW_CAP: usize = 4;

/// Computes the grown capacity for appending `additional` elements to a
/// buffer of `cap` slots: at least [`MIN_GROW_CAP`], at least 1.5x the
/// current capacity, and room for the whole request up front when it
/// exceeds half of the base.
fn expanded_capacity(cap: usize, additional: usize) -> usize {
    let mut floor = cap.max(MIN_GROW_CAP);
    if additional > floor / 2 {
        floor = floor.saturating_add(additional);
    }
    floor.max(cap.saturating_add(cap / 2))
}

/// A contiguous growable sequence whose storage is managed by a pluggable
/// [`AllocStrategy`].
///
/// The buffer is a single allocation holding a live prefix of `len`
/// elements and a reserved, uninitialized tail up to `capacity()`. Storage
/// is acquired lazily: an empty container owns no allocation. Every
/// allocating operation is fallible and reports [`Error`] instead of
/// aborting; the infallible trait surfaces ([`Clone`], [`Extend`], `From`)
/// panic on allocation failure.
///
/// Appends grow the buffer geometrically ([`push`](ContigVec::push)), while
/// [`reserve`](ContigVec::reserve) and [`resize`](ContigVec::resize)
/// allocate exactly what was asked for.
///
/// # Examples
///
/// ```
/// use contig_vec::ContigVec;
///
/// let mut values: ContigVec<i32> = ContigVec::new();
/// values.push(1)?;
/// values.push(2)?;
/// values.insert(0, 0)?;
/// assert_eq!(values.as_slice(), &[0, 1, 2]);
/// assert_eq!(values.pop(), Some(2));
/// # Ok::<(), contig_vec::Error>(())
/// ```
pub struct ContigVec<T, S: AllocStrategy = Global> {
    buf: RawBuffer<T, S>,
    len: usize,
}

impl<T> ContigVec<T, Global> {
    /// Creates an empty container. Does not allocate.
    pub fn new() -> ContigVec<T> {
        ContigVec::new_in(Global)
    }

    /// Creates an empty container with storage for exactly `cap` elements.
    pub fn with_capacity(cap: usize) -> Result<ContigVec<T>> {
        ContigVec::with_capacity_in(cap, Global)
    }

    /// Creates a container holding `count` clones of `value`.
    pub fn from_elem(value: T, count: usize) -> Result<ContigVec<T>>
    where
        T: Clone,
    {
        ContigVec::from_elem_in(value, count, Global)
    }

    /// Creates a container holding `count` default values.
    pub fn from_default(count: usize) -> Result<ContigVec<T>>
    where
        T: Default,
    {
        ContigVec::from_default_in(count, Global)
    }

    /// Creates a container holding clones of `values`.
    pub fn from_slice(values: &[T]) -> Result<ContigVec<T>>
    where
        T: Clone,
    {
        ContigVec::from_slice_in(values, Global)
    }

    /// Creates a container of `count` elements produced by `f(index)`.
    pub fn from_fn<F>(count: usize, f: F) -> Result<ContigVec<T>>
    where
        F: FnMut(usize) -> T,
    {
        ContigVec::from_fn_in(count, f, Global)
    }
}

impl<T, S: AllocStrategy> ContigVec<T, S> {
    /// Creates an empty container owned by `strategy`. Does not allocate.
    pub fn new_in(strategy: S) -> ContigVec<T, S> {
        ContigVec {
            buf: RawBuffer::new_in(strategy),
            len: 0,
        }
    }

    /// Creates an empty container with storage for exactly `cap` elements,
    /// allocated through `strategy`.
    pub fn with_capacity_in(cap: usize, strategy: S) -> Result<ContigVec<T, S>> {
        Ok(ContigVec {
            buf: RawBuffer::allocate_in(cap, strategy)?,
            len: 0,
        })
    }

    /// Creates a container holding `count` clones of `value`.
    pub fn from_elem_in(value: T, count: usize, strategy: S) -> Result<ContigVec<T, S>>
    where
        T: Clone,
    {
        let mut vec = ContigVec::with_capacity_in(count, strategy)?;
        unsafe {
            uninit::fill_clone(vec.buf.ptr(), count, vec.buf.strategy(), &value);
        }
        vec.len = count;
        Ok(vec)
    }

    /// Creates a container holding `count` default values.
    pub fn from_default_in(count: usize, strategy: S) -> Result<ContigVec<T, S>>
    where
        T: Default,
    {
        let mut vec = ContigVec::with_capacity_in(count, strategy)?;
        unsafe {
            uninit::fill_default(vec.buf.ptr(), count, vec.buf.strategy());
        }
        vec.len = count;
        Ok(vec)
    }

    /// Creates a container holding clones of `values`.
    pub fn from_slice_in(values: &[T], strategy: S) -> Result<ContigVec<T, S>>
    where
        T: Clone,
    {
        let mut vec = ContigVec::with_capacity_in(values.len(), strategy)?;
        unsafe {
            uninit::clone_insert_range(vec.buf.ptr(), vec.buf.strategy(), values);
        }
        vec.len = values.len();
        Ok(vec)
    }

    /// Creates a container of `count` elements produced by `f(index)`.
    pub fn from_fn_in<F>(count: usize, mut f: F, strategy: S) -> Result<ContigVec<T, S>>
    where
        F: FnMut(usize) -> T,
    {
        let mut vec = ContigVec::with_capacity_in(count, strategy)?;
        let mut index = 0;
        let filled: std::result::Result<(), Infallible> = unsafe {
            uninit::fill_construct(vec.buf.ptr(), count, vec.buf.strategy(), || {
                let value = f(index);
                index += 1;
                Ok(value)
            })
        };
        if let Err(never) = filled {
            match never {}
        }
        vec.len = count;
        Ok(vec)
    }

    /// Number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the container holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the buffer can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.cap()
    }

    /// The strategy owning this container's storage.
    #[inline]
    pub fn strategy(&self) -> &S {
        self.buf.strategy()
    }

    /// Raw pointer to the buffer. Only the first `len` slots hold elements.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buf.ptr()
    }

    /// Mutable raw pointer to the buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.ptr()
    }

    /// The live elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    /// The live elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.buf.ptr(), self.len) }
    }

    /// Returns a reference to the element at `index`, or `None` when out of
    /// bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Returns a mutable reference to the element at `index`, or `None`
    /// when out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Bounds-checked access: fails with [`Error::OutOfBounds`] when
    /// `index >= len()`.
    pub fn at(&self, index: usize) -> Result<&T> {
        self.as_slice().get(index).ok_or(Error::OutOfBounds {
            index,
            len: self.len,
        })
    }

    /// Bounds-checked mutable access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::OutOfBounds { index, len })
    }

    /// Ensures capacity is at least `min_cap`. A no-op when already
    /// satisfied; otherwise the buffer is reallocated to exactly `min_cap`
    /// and the live elements are relocated. On failure nothing has changed.
    pub fn reserve(&mut self, min_cap: usize) -> Result<()> {
        if min_cap <= self.capacity() {
            return Ok(());
        }
        self.buf.reallocate(min_cap, self.len)
    }

    /// Reallocates down to exactly `len()` slots when capacity exceeds it.
    /// An empty container returns to the unallocated state.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if self.capacity() == self.len {
            return Ok(());
        }
        self.buf.reallocate(self.len, self.len)
    }

    /// Destroys all live elements. Capacity is unchanged.
    pub fn clear(&mut self) {
        let len = self.len;
        self.len = 0;
        unsafe { uninit::destroy_range(self.buf.ptr(), len, self.buf.strategy()) };
    }

    /// Destroys the trailing elements beyond `new_len`. A no-op when
    /// `new_len >= len()`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        let tail = self.len - new_len;
        self.len = new_len;
        unsafe {
            uninit::destroy_range(self.buf.ptr().add(new_len), tail, self.buf.strategy());
        }
    }

    /// Resizes to `new_len` elements, cloning `value` into any new tail
    /// slots. Growth reallocates to exactly `new_len`.
    pub fn resize(&mut self, new_len: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        if new_len > self.len {
            self.reserve(new_len)?;
            unsafe {
                uninit::fill_clone(
                    self.buf.ptr().add(self.len),
                    new_len - self.len,
                    self.buf.strategy(),
                    &value,
                );
            }
            self.len = new_len;
        } else {
            self.truncate(new_len);
        }
        Ok(())
    }

    /// Resizes to `new_len` elements, filling any new tail slots with
    /// values produced by `f`.
    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F) -> Result<()>
    where
        F: FnMut() -> T,
    {
        if new_len > self.len {
            self.reserve(new_len)?;
            let filled: std::result::Result<(), Infallible> = unsafe {
                uninit::fill_construct(
                    self.buf.ptr().add(self.len),
                    new_len - self.len,
                    self.buf.strategy(),
                    || Ok(f()),
                )
            };
            if let Err(never) = filled {
                match never {}
            }
            self.len = new_len;
        } else {
            self.truncate(new_len);
        }
        Ok(())
    }

    /// Appends one element. Amortized O(1): a full buffer grows to the
    /// policy-expanded capacity first.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.capacity() {
            self.grow_for(1)?;
        }
        unsafe {
            self.buf.strategy().construct(self.buf.ptr().add(self.len), value);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last element, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.buf.ptr().add(self.len).read() })
    }

    /// Inserts `value` before `index`; `index == len()` appends.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        let mut value = Some(value);
        self.insert_gap(index, 1, move |strategy, slot, _| {
            let value = value.take().expect("single insert fills one slot");
            unsafe { strategy.construct(slot, value) };
        })
    }

    /// Inserts clones of `values` before `index`.
    pub fn insert_from_slice(&mut self, index: usize, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.insert_gap(index, values.len(), |strategy, slot, k| unsafe {
            strategy.construct(slot, values[k].clone())
        })
    }

    /// Inserts `count` clones of `value` before `index`.
    pub fn insert_repeated(&mut self, index: usize, value: &T, count: usize) -> Result<()>
    where
        T: Clone,
    {
        self.insert_gap(index, count, |strategy, slot, _| unsafe {
            strategy.construct(slot, value.clone())
        })
    }

    /// Removes and returns the element at `index`, shifting the tail down
    /// over the gap. The element's successor (if any) ends up at `index`.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::OutOfBounds {
                index,
                len: self.len,
            });
        }
        unsafe {
            let p = self.buf.ptr();
            let value = p.add(index).read();
            uninit::shift_left(p.add(index), p.add(index + 1), self.len - index - 1);
            self.len -= 1;
            Ok(value)
        }
    }

    /// Destroys the elements in `range` and shifts the tail down over the
    /// gap. Accepts any range form; an empty range is a no-op.
    pub fn erase<R>(&mut self, range: R) -> Result<()>
    where
        R: RangeBounds<usize>,
    {
        let Range { start, end } = self.normalize_range(range)?;
        let count = end - start;
        if count == 0 {
            return Ok(());
        }
        let total = self.len;
        // Cap the visible region first so an unwinding element drop cannot
        // expose destroyed slots; the skipped tail leaks rather than
        // double-frees.
        self.len = start;
        unsafe {
            let p = self.buf.ptr();
            uninit::destroy_range(p.add(start), count, self.buf.strategy());
            uninit::shift_left(p.add(start), p.add(end), total - end);
        }
        self.len = total - count;
        Ok(())
    }

    /// Exchanges the two containers' buffers in O(1) without touching
    /// elements. Strategy instances are exchanged only when the policy
    /// propagates on swap.
    ///
    /// # Panics
    ///
    /// Panics when the strategies neither propagate on swap nor are
    /// equivalent: such buffers are not interchangeable.
    pub fn swap_contents(&mut self, other: &mut ContigVec<T, S>) {
        if S::PROPAGATE_ON_SWAP {
            std::mem::swap(self, other);
        } else {
            assert!(
                self.buf.strategy().is_equivalent(other.buf.strategy()),
                "cannot swap containers with non-equivalent, non-propagating strategies"
            );
            self.buf.swap_storage(&mut other.buf);
            std::mem::swap(&mut self.len, &mut other.len);
        }
    }

    /// Moves the contents out, leaving this container empty and
    /// unallocated. O(1); no element is touched.
    pub fn take(&mut self) -> ContigVec<T, S>
    where
        S: Clone,
    {
        let strategy = self.buf.strategy().clone();
        std::mem::replace(self, ContigVec::new_in(strategy))
    }

    /// Replaces this container's contents with `other`'s, consuming it.
    ///
    /// When the strategy propagates on move or the instances are
    /// equivalent, the buffer is adopted wholesale in O(1) and cannot fail.
    /// Otherwise the elements are relocated one by one into storage
    /// acquired through this container's retained strategy.
    pub fn replace_with(&mut self, mut other: ContigVec<T, S>) -> Result<()> {
        if S::PROPAGATE_ON_MOVE || self.buf.strategy().is_equivalent(other.buf.strategy()) {
            *self = other;
            return Ok(());
        }
        self.clear();
        self.reserve(other.len)?;
        unsafe {
            uninit::move_insert_range(self.buf.ptr(), other.as_ptr(), other.len);
        }
        self.len = other.len;
        // The elements now live here; `other` only releases its storage.
        other.len = 0;
        Ok(())
    }

    /// Rebinds the contents to an explicitly supplied strategy: steals the
    /// buffer when the instances are equivalent, otherwise relocates the
    /// elements into fresh storage allocated by `strategy`.
    pub fn into_strategy(mut self, strategy: S) -> Result<ContigVec<T, S>> {
        let mut out = ContigVec::new_in(strategy);
        if self.buf.strategy().is_equivalent(out.buf.strategy()) {
            out.buf.swap_storage(&mut self.buf);
            std::mem::swap(&mut out.len, &mut self.len);
        } else {
            out.reserve(self.len)?;
            unsafe {
                uninit::move_insert_range(out.buf.ptr(), self.as_ptr(), self.len);
            }
            out.len = self.len;
            self.len = 0;
        }
        Ok(out)
    }

    /// Duplicates the container. The new instance's strategy comes from
    /// [`AllocStrategy::fork_for_copy`]; storage is independent and sized
    /// exactly to the length.
    pub fn try_clone(&self) -> Result<ContigVec<T, S>>
    where
        T: Clone,
    {
        ContigVec::from_slice_in(self.as_slice(), self.buf.strategy().fork_for_copy())
    }

    /// Replaces this container's contents with clones of `source`'s.
    ///
    /// With a strategy that propagates on copy, a non-equivalent source
    /// instance is adopted: the old buffer is fully released through the
    /// strategy that allocated it before the replacement is cloned in.
    pub fn try_clone_from(&mut self, source: &ContigVec<T, S>) -> Result<()>
    where
        T: Clone,
        S: Clone,
    {
        self.clear();
        if S::PROPAGATE_ON_COPY && !self.buf.strategy().is_equivalent(source.buf.strategy()) {
            self.buf.reset_with_strategy(source.buf.strategy().clone());
        }
        self.reserve(source.len)?;
        unsafe {
            uninit::clone_insert_range(self.buf.ptr(), self.buf.strategy(), source.as_slice());
        }
        self.len = source.len;
        Ok(())
    }

    /// Appends clones of `values`, growing by the append policy.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.grow_for(values.len())?;
        unsafe {
            uninit::clone_insert_range(self.buf.ptr().add(self.len), self.buf.strategy(), values);
        }
        self.len += values.len();
        Ok(())
    }

    /// Grows to the policy-expanded capacity for `additional` more
    /// elements. A no-op when the tail already fits them.
    #[cold]
    fn grow_for(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        if needed <= self.capacity() {
            return Ok(());
        }
        let new_cap = expanded_capacity(self.capacity(), additional).max(needed);
        self.buf.reallocate(new_cap, self.len)
    }

    fn insert_gap<F>(&mut self, index: usize, gap: usize, fill: F) -> Result<()>
    where
        F: FnMut(&S, *mut T, usize),
    {
        if index > self.len {
            return Err(Error::OutOfBounds {
                index,
                len: self.len,
            });
        }
        if gap == 0 {
            return Ok(());
        }
        if self.capacity() - self.len >= gap {
            self.insert_gap_in_place(index, gap, fill);
            Ok(())
        } else {
            self.insert_gap_realloc(index, gap, fill)
        }
    }

    /// Opens a gap within existing capacity and constructs into it.
    ///
    /// A failure while filling closes the gap back over the unconstructed
    /// remainder: elements already constructed stay inserted, the tail
    /// shifts down again, and the container remains valid. Best effort,
    /// no rollback of the constructed elements.
    fn insert_gap_in_place<F>(&mut self, index: usize, gap: usize, mut fill: F)
    where
        F: FnMut(&S, *mut T, usize),
    {
        struct GapGuard<'a, T, S: AllocStrategy> {
            vec: &'a mut ContigVec<T, S>,
            index: usize,
            gap: usize,
            filled: usize,
            tail: usize,
        }

        impl<T, S: AllocStrategy> Drop for GapGuard<'_, T, S> {
            fn drop(&mut self) {
                unsafe {
                    let p = self.vec.buf.ptr();
                    uninit::shift_left(
                        p.add(self.index + self.filled),
                        p.add(self.index + self.gap),
                        self.tail,
                    );
                }
                self.vec.len = self.index + self.filled + self.tail;
            }
        }

        let tail = self.len - index;
        self.len = index;
        unsafe {
            uninit::shift_right(self.buf.ptr().add(index), tail, gap);
        }
        let mut guard = GapGuard {
            vec: self,
            index,
            gap,
            filled: 0,
            tail,
        };
        while guard.filled < gap {
            let slot = unsafe { guard.vec.buf.ptr().add(guard.index + guard.filled) };
            fill(guard.vec.buf.strategy(), slot, guard.filled);
            guard.filled += 1;
        }
        // The guard's drop closes the (now empty) remainder and publishes
        // the final length.
    }

    /// Builds a larger buffer and assembles prefix, inserted elements and
    /// suffix into it, in that order. The old buffer is released only after
    /// all three phases succeed; a failure unwinds the new buffer alone and
    /// the container is unchanged.
    fn insert_gap_realloc<F>(&mut self, index: usize, gap: usize, mut fill: F) -> Result<()>
    where
        F: FnMut(&S, *mut T, usize),
    {
        struct SpillGuard<'a, T, S: AllocStrategy> {
            buf: &'a RawBuffer<T, S>,
            ptr: NonNull<T>,
            cap: usize,
            fill_base: usize,
            constructed: usize,
        }

        impl<T, S: AllocStrategy> Drop for SpillGuard<'_, T, S> {
            fn drop(&mut self) {
                unsafe {
                    uninit::destroy_range(
                        self.ptr.as_ptr().add(self.fill_base),
                        self.constructed,
                        self.buf.strategy(),
                    );
                    self.buf.abandon_detached(self.ptr, self.cap);
                }
            }
        }

        let needed = self.len.checked_add(gap).ok_or(Error::CapacityOverflow)?;
        let new_cap = expanded_capacity(self.capacity(), gap).max(needed);
        let new_ptr = self.buf.allocate_detached(new_cap)?;
        let old = self.buf.ptr();
        unsafe {
            uninit::move_insert_range(new_ptr.as_ptr(), old, index);
            let mut guard = SpillGuard {
                buf: &self.buf,
                ptr: new_ptr,
                cap: new_cap,
                fill_base: index,
                constructed: 0,
            };
            while guard.constructed < gap {
                let slot = guard.ptr.as_ptr().add(index + guard.constructed);
                fill(guard.buf.strategy(), slot, guard.constructed);
                guard.constructed += 1;
            }
            std::mem::forget(guard);
            uninit::move_insert_range(
                new_ptr.as_ptr().add(index + gap),
                old.add(index),
                self.len - index,
            );
            self.buf.adopt_detached(new_ptr, new_cap);
        }
        self.len += gap;
        Ok(())
    }

    fn normalize_range<R>(&self, range: R) -> Result<Range<usize>>
    where
        R: RangeBounds<usize>,
    {
        use std::ops::Bound;

        let len = self.len;
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.checked_add(1).ok_or(Error::CapacityOverflow)?,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => n.checked_add(1).ok_or(Error::CapacityOverflow)?,
            Bound::Excluded(&n) => n,
            Bound::Unbounded => len,
        };
        if end > len {
            return Err(Error::OutOfBounds { index: end, len });
        }
        if start > end {
            return Err(Error::OutOfBounds { index: start, len });
        }
        Ok(start..end)
    }
}

impl<T, S: AllocStrategy> Drop for ContigVec<T, S> {
    fn drop(&mut self) {
        let len = self.len;
        self.len = 0;
        unsafe { uninit::destroy_range(self.buf.ptr(), len, self.buf.strategy()) };
        // The buffer's own drop releases the storage.
    }
}

impl<T, S: AllocStrategy> IntoIterator for ContigVec<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T, S>;

    fn into_iter(self) -> IntoIter<T, S> {
        let this = std::mem::ManuallyDrop::new(self);
        let len = this.len;
        let buf = unsafe { std::ptr::read(&this.buf) };
        IntoIter::new(buf, len)
    }
}

impl<'a, T, S: AllocStrategy> IntoIterator for &'a ContigVec<T, S> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, S: AllocStrategy> IntoIterator for &'a mut ContigVec<T, S> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T, S: AllocStrategy> Deref for ContigVec<T, S> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, S: AllocStrategy> DerefMut for ContigVec<T, S> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I: SliceIndex<[T]>, S: AllocStrategy> Index<I> for ContigVec<T, S> {
    type Output = I::Output;

    #[inline]
    fn index(&self, index: I) -> &I::Output {
        &self.as_slice()[index]
    }
}

impl<T, I: SliceIndex<[T]>, S: AllocStrategy> IndexMut<I> for ContigVec<T, S> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut I::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<T, S: AllocStrategy + Default> Default for ContigVec<T, S> {
    fn default() -> ContigVec<T, S> {
        ContigVec::new_in(S::default())
    }
}

impl<T: Clone, S: AllocStrategy + Clone> Clone for ContigVec<T, S> {
    fn clone(&self) -> ContigVec<T, S> {
        self.try_clone().expect("allocation failed while cloning")
    }

    fn clone_from(&mut self, source: &ContigVec<T, S>) {
        self.try_clone_from(source)
            .expect("allocation failed while cloning");
    }
}

impl<T: fmt::Debug, S: AllocStrategy> fmt::Debug for ContigVec<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T: PartialEq, S1: AllocStrategy, S2: AllocStrategy> PartialEq<ContigVec<T, S2>>
    for ContigVec<T, S1>
{
    fn eq(&self, other: &ContigVec<T, S2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, S: AllocStrategy> Eq for ContigVec<T, S> {}

impl<T: PartialEq, S: AllocStrategy> PartialEq<[T]> for ContigVec<T, S> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, S: AllocStrategy> PartialEq<&[T]> for ContigVec<T, S> {
    fn eq(&self, other: &&[T]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: PartialEq, S: AllocStrategy, const N: usize> PartialEq<[T; N]> for ContigVec<T, S> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialOrd, S: AllocStrategy> PartialOrd for ContigVec<T, S> {
    fn partial_cmp(&self, other: &ContigVec<T, S>) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, S: AllocStrategy> Ord for ContigVec<T, S> {
    fn cmp(&self, other: &ContigVec<T, S>) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, S: AllocStrategy> Hash for ContigVec<T, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T, S: AllocStrategy> Extend<T> for ContigVec<T, S> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.grow_for(lower)
            .expect("allocation failed while extending");
        for value in iter {
            self.push(value).expect("allocation failed while extending");
        }
    }
}

impl<T> FromIterator<T> for ContigVec<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> ContigVec<T> {
        let mut vec = ContigVec::new();
        vec.extend(iter);
        vec
    }
}

impl<T: Clone> From<&[T]> for ContigVec<T, Global> {
    fn from(values: &[T]) -> ContigVec<T> {
        ContigVec::from_slice(values).expect("allocation failed")
    }
}

impl<T, const N: usize> From<[T; N]> for ContigVec<T, Global> {
    fn from(values: [T; N]) -> ContigVec<T> {
        let mut vec = ContigVec::with_capacity(N).expect("allocation failed");
        let values = std::mem::ManuallyDrop::new(values);
        unsafe {
            uninit::move_insert_range(vec.buf.ptr(), values.as_ptr(), N);
        }
        vec.len = N;
        vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expanded_capacity_append_sequence() {
        let mut cap = 0;
        let mut observed = vec![cap];
        for _ in 0..5 {
            cap = expanded_capacity(cap, 1);
            observed.push(cap);
        }
        assert_eq!(observed, vec![0, 4, 6, 9, 13, 19]);
    }

    #[test]
    fn expanded_capacity_large_request_reserves_up_front() {
        assert_eq!(expanded_capacity(4, 3), 7);
        assert_eq!(expanded_capacity(0, 10), 14);
        // A small request never wins over geometric growth.
        assert_eq!(expanded_capacity(100, 1), 150);
    }

    #[test]
    fn new_is_unallocated() {
        let vec: ContigVec<u64> = ContigVec::new();
        assert_eq!(vec.len(), 0);
        assert_eq!(vec.capacity(), 0);
        assert!(vec.is_empty());
    }

    #[test]
    fn with_capacity_zero_does_not_allocate() {
        let vec: ContigVec<u64> = ContigVec::with_capacity(0).unwrap();
        assert_eq!(vec.capacity(), 0);
    }

    #[test]
    fn normalize_range_checks_bounds() {
        let vec: ContigVec<u8> = ContigVec::from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(vec.normalize_range(1..3).unwrap(), 1..3);
        assert_eq!(vec.normalize_range(..).unwrap(), 0..3);
        assert!(vec.normalize_range(2..5).is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = vec.normalize_range(2..1);
        assert!(reversed.is_err());
    }
}
