//! Transactional element-lifecycle primitives over raw element ranges.
//!
//! These free functions are the layer a contiguous container builds its
//! mutation paths on: bulk construction into reserved (uninitialized) slots,
//! reverse-order destruction, and in-place relocation of live ranges.
//!
//! Every bulk construction call is transactional. If producing or
//! constructing element `k` fails, whether by an `Err` from a fallible
//! producer or by an unwind out of a clone or a strategy hook, the `k`
//! elements the call itself constructed are destroyed through the strategy
//! and the failure propagates unchanged. Slots at and beyond `k` are never
//! touched. A single drop guard drives both the unwind and the `Err` path,
//! so the cleanup endpoints are identical.
//!
//! Relocation ([`move_insert_range`], [`shift_left`], [`shift_right`]) is a
//! different matter: a move is a trivial byte copy that cannot fail. The
//! source slots become logically uninitialized and the caller must stop
//! treating them as elements, but their bytes stay intact until the caller
//! abandons them, which is what makes buffer reallocation all-or-nothing.

use contig_alloc::AllocStrategy;

/// Destroys `count` live elements starting at `begin`, last element first.
///
/// Empty ranges are a no-op, including ranges at a dangling pointer.
///
/// # Safety
///
/// `begin` must point at `count` contiguous live, properly aligned elements.
/// None of them may be used again after this returns.
pub unsafe fn destroy_range<T, S: AllocStrategy>(begin: *mut T, count: usize, strategy: &S) {
    for i in (0..count).rev() {
        unsafe { strategy.destroy(begin.add(i)) };
    }
}

/// Rollback bookkeeping for bulk construction: destroys the constructed
/// prefix unless defused with `mem::forget`.
struct PartialGuard<'a, T, S: AllocStrategy> {
    base: *mut T,
    constructed: usize,
    strategy: &'a S,
}

impl<T, S: AllocStrategy> Drop for PartialGuard<'_, T, S> {
    fn drop(&mut self) {
        unsafe { destroy_range(self.base, self.constructed, self.strategy) };
    }
}

/// Constructs `count` elements at `dst` in forward order, each produced by
/// `make` and written through the strategy's construct hook.
///
/// On failure at element `k`, the elements at `[dst, dst + k)` are destroyed
/// via [`destroy_range`] and the failure propagates unchanged.
///
/// # Safety
///
/// `dst` must be valid for writes of `count` properly aligned elements, and
/// the slots must not hold live elements.
pub unsafe fn fill_construct<T, S, E, F>(
    dst: *mut T,
    count: usize,
    strategy: &S,
    mut make: F,
) -> Result<(), E>
where
    S: AllocStrategy,
    F: FnMut() -> Result<T, E>,
{
    let mut guard = PartialGuard {
        base: dst,
        constructed: 0,
        strategy,
    };
    while guard.constructed < count {
        let value = make()?;
        unsafe { strategy.construct(dst.add(guard.constructed), value) };
        guard.constructed += 1;
    }
    std::mem::forget(guard);
    Ok(())
}

/// Constructs `count` clones of `value` at `dst`. Same rollback contract as
/// [`fill_construct`].
///
/// # Safety
///
/// Same as [`fill_construct`].
pub unsafe fn fill_clone<T, S>(dst: *mut T, count: usize, strategy: &S, value: &T)
where
    T: Clone,
    S: AllocStrategy,
{
    let result: Result<(), std::convert::Infallible> =
        unsafe { fill_construct(dst, count, strategy, || Ok(value.clone())) };
    if let Err(never) = result {
        match never {}
    }
}

/// Constructs `count` default values at `dst`. Same rollback contract as
/// [`fill_construct`].
///
/// # Safety
///
/// Same as [`fill_construct`].
pub unsafe fn fill_default<T, S>(dst: *mut T, count: usize, strategy: &S)
where
    T: Default,
    S: AllocStrategy,
{
    let result: Result<(), std::convert::Infallible> =
        unsafe { fill_construct(dst, count, strategy, || Ok(T::default())) };
    if let Err(never) = result {
        match never {}
    }
}

/// Clone-constructs `src`'s elements into consecutive slots at `dst`. Same
/// rollback contract as [`fill_construct`].
///
/// # Safety
///
/// `dst` must be valid for writes of `src.len()` properly aligned elements,
/// must not overlap `src`, and the slots must not hold live elements.
pub unsafe fn clone_insert_range<T, S>(dst: *mut T, strategy: &S, src: &[T])
where
    T: Clone,
    S: AllocStrategy,
{
    let mut guard = PartialGuard {
        base: dst,
        constructed: 0,
        strategy,
    };
    for item in src {
        unsafe { strategy.construct(dst.add(guard.constructed), item.clone()) };
        guard.constructed += 1;
    }
    std::mem::forget(guard);
}

/// Relocates `count` elements from `src` to `dst` by bitwise move. Cannot
/// fail.
///
/// After the call the destination slots are live and the source slots are
/// logically uninitialized: the caller must no longer treat them as
/// elements. Their bytes remain intact, so a caller that still owns the
/// source region loses nothing if a later step fails: it simply keeps the
/// source as the live range and abandons the destination.
///
/// # Safety
///
/// `src` must point at `count` live elements, `dst` must be valid for
/// writes of `count` properly aligned elements, and the two ranges must not
/// overlap. Exactly one of the two ranges may subsequently be treated as
/// holding live elements.
pub unsafe fn move_insert_range<T>(dst: *mut T, src: *const T, count: usize) {
    unsafe { std::ptr::copy_nonoverlapping(src, dst, count) }
}

/// Closes a gap below a live range: relocates `[src, src + count)` down to
/// `dst`. The ranges may overlap.
///
/// The slots in `[dst, src)` must hold no live elements; erasure destroys
/// them before shifting. After the call the vacated trailing slots are
/// logically uninitialized.
///
/// # Safety
///
/// `src` must point at `count` live elements, `dst` must precede or equal
/// `src` within the same allocation, and `[dst, src)` must not hold live
/// elements.
pub unsafe fn shift_left<T>(dst: *mut T, src: *const T, count: usize) {
    debug_assert!(dst.cast_const() <= src);
    unsafe { std::ptr::copy(src, dst, count) }
}

/// Opens a gap for interior insertion: relocates the live range
/// `[pos, pos + count)` upward by `gap` slots. The ranges may overlap.
///
/// After the call `[pos, pos + gap)` is logically uninitialized, ready for
/// the inserted elements to be constructed into it.
///
/// # Safety
///
/// `pos` must point at `count` live elements followed by at least `gap`
/// reserved (uninitialized) slots within the same allocation.
pub unsafe fn shift_right<T>(pos: *mut T, count: usize, gap: usize) {
    unsafe { std::ptr::copy(pos, pos.add(gap), count) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contig_alloc::{CountingStrategy, Global};
    use std::alloc::Layout;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// An element that records its drops in a shared journal.
    #[derive(Clone)]
    struct Tracked {
        id: u32,
        journal: Rc<RefCell<Vec<u32>>>,
    }

    impl Tracked {
        fn new(id: u32, journal: &Rc<RefCell<Vec<u32>>>) -> Tracked {
            Tracked {
                id,
                journal: journal.clone(),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.journal.borrow_mut().push(self.id);
        }
    }

    /// Clones successfully `fuse` times, then panics.
    struct FusedClone {
        value: u32,
        fuse: Rc<RefCell<usize>>,
    }

    impl Clone for FusedClone {
        fn clone(&self) -> FusedClone {
            let mut fuse = self.fuse.borrow_mut();
            if *fuse == 0 {
                panic!("clone fuse burned out");
            }
            *fuse -= 1;
            FusedClone {
                value: self.value,
                fuse: self.fuse.clone(),
            }
        }
    }

    struct Slots<T> {
        ptr: *mut T,
        count: usize,
    }

    impl<T> Slots<T> {
        fn reserve(count: usize) -> Slots<T> {
            let layout = Layout::array::<T>(count).unwrap();
            let ptr = Global.allocate(layout).unwrap().cast::<T>().as_ptr();
            Slots { ptr, count }
        }
    }

    impl<T> Drop for Slots<T> {
        fn drop(&mut self) {
            let layout = Layout::array::<T>(self.count).unwrap();
            unsafe {
                Global.deallocate(std::ptr::NonNull::new(self.ptr).unwrap().cast(), layout)
            };
        }
    }

    #[test]
    fn destroy_range_runs_in_reverse() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let slots = Slots::<Tracked>::reserve(4);
        unsafe {
            for i in 0..4 {
                slots.ptr.add(i).write(Tracked::new(i as u32, &journal));
            }
            destroy_range(slots.ptr, 4, &Global);
        }
        assert_eq!(*journal.borrow(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn destroy_range_empty_is_noop() {
        unsafe { destroy_range(std::ptr::NonNull::<String>::dangling().as_ptr(), 0, &Global) };
    }

    #[test]
    fn fill_construct_forward_order() {
        let slots = Slots::<u32>::reserve(5);
        let mut next = 0;
        let result: Result<(), std::convert::Infallible> = unsafe {
            fill_construct(slots.ptr, 5, &Global, || {
                next += 1;
                Ok(next)
            })
        };
        result.unwrap();
        unsafe {
            for i in 0..5 {
                assert_eq!(slots.ptr.add(i).read(), i as u32 + 1);
            }
        }
    }

    #[test]
    fn fill_construct_error_rolls_back_constructed_prefix() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let slots = Slots::<Tracked>::reserve(6);
        let mut produced = 0;
        let result = unsafe {
            fill_construct(slots.ptr, 6, &Global, || {
                if produced == 3 {
                    return Err("production failed");
                }
                produced += 1;
                Ok(Tracked::new(produced, &journal))
            })
        };
        assert_eq!(result, Err("production failed"));
        // The three constructed elements are gone, in reverse order.
        assert_eq!(*journal.borrow(), vec![3, 2, 1]);
    }

    #[test]
    fn fill_clone_panic_destroys_exactly_the_prefix() {
        let strategy = CountingStrategy::default();
        let slots = Slots::<FusedClone>::reserve(8);
        let fuse = Rc::new(RefCell::new(4));
        let value = FusedClone {
            value: 9,
            fuse: fuse.clone(),
        };
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            fill_clone(slots.ptr, 8, &strategy, &value);
        }));
        assert!(outcome.is_err());
        assert_eq!(strategy.counters().constructions(), 4);
        assert_eq!(strategy.counters().destructions(), 4);
    }

    #[test]
    fn fill_default_initializes_every_slot() {
        let slots = Slots::<String>::reserve(3);
        unsafe {
            fill_default(slots.ptr, 3, &Global);
            for i in 0..3 {
                assert_eq!(slots.ptr.add(i).read(), String::new());
            }
        }
    }

    #[test]
    fn clone_insert_range_copies_and_balances_hooks() {
        let strategy = CountingStrategy::default();
        let slots = Slots::<String>::reserve(3);
        let src = [String::from("a"), String::from("b"), String::from("c")];
        unsafe {
            clone_insert_range(slots.ptr, &strategy, &src);
            assert_eq!(slots.ptr.add(2).as_ref().unwrap(), "c");
            destroy_range(slots.ptr, 3, &strategy);
        }
        assert_eq!(strategy.counters().constructions(), 3);
        assert_eq!(strategy.counters().destructions(), 3);
        assert_eq!(src[0], "a");
    }

    #[test]
    fn clone_insert_range_panic_rolls_back() {
        let strategy = CountingStrategy::default();
        let slots = Slots::<FusedClone>::reserve(4);
        let fuse = Rc::new(RefCell::new(2));
        let src = [
            FusedClone {
                value: 0,
                fuse: fuse.clone(),
            },
            FusedClone {
                value: 1,
                fuse: fuse.clone(),
            },
            FusedClone {
                value: 2,
                fuse: fuse.clone(),
            },
            FusedClone {
                value: 3,
                fuse: fuse.clone(),
            },
        ];
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            clone_insert_range(slots.ptr, &strategy, &src);
        }));
        assert!(outcome.is_err());
        assert_eq!(strategy.counters().constructions(), 2);
        assert_eq!(strategy.counters().destructions(), 2);
    }

    #[test]
    fn move_insert_range_relocates_without_drops() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let src = Slots::<Tracked>::reserve(3);
        let dst = Slots::<Tracked>::reserve(3);
        unsafe {
            for i in 0..3 {
                src.ptr.add(i).write(Tracked::new(i as u32 + 10, &journal));
            }
            move_insert_range(dst.ptr, src.ptr, 3);
            // Relocation is not a lifecycle event.
            assert!(journal.borrow().is_empty());
            assert_eq!(dst.ptr.add(1).as_ref().unwrap().id, 11);
            destroy_range(dst.ptr, 3, &Global);
        }
        assert_eq!(*journal.borrow(), vec![12, 11, 10]);
    }

    #[test]
    fn shift_left_closes_a_gap() {
        let slots = Slots::<u64>::reserve(6);
        unsafe {
            for i in 0..6 {
                slots.ptr.add(i).write(i as u64);
            }
            // Pretend [1, 3) was erased; pull [3, 6) down over it.
            shift_left(slots.ptr.add(1), slots.ptr.add(3), 3);
            let live: Vec<u64> = (0..4).map(|i| slots.ptr.add(i).read()).collect();
            assert_eq!(live, vec![0, 3, 4, 5]);
        }
    }

    #[test]
    fn shift_right_opens_a_gap() {
        let slots = Slots::<u64>::reserve(8);
        unsafe {
            for i in 0..5 {
                slots.ptr.add(i).write(i as u64);
            }
            // Open two slots before index 2.
            shift_right(slots.ptr.add(2), 3, 2);
            assert_eq!(slots.ptr.read(), 0);
            assert_eq!(slots.ptr.add(1).read(), 1);
            let moved: Vec<u64> = (4..7).map(|i| slots.ptr.add(i).read()).collect();
            assert_eq!(moved, vec![2, 3, 4]);
        }
    }

    #[test]
    fn zero_sized_elements_are_supported() {
        #[derive(Clone, Default)]
        struct Empty;
        let base = std::ptr::NonNull::<Empty>::dangling().as_ptr();
        unsafe {
            fill_default(base, 1000, &Global);
            destroy_range(base, 1000, &Global);
            shift_right(base, 10, 5);
            shift_left(base, base, 10);
        }
    }
}
