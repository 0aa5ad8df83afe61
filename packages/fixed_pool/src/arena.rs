use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::granularity::slot_array_layout;
use crate::{BackingAllocator, Error};

/// One contiguous backing-storage extent holding a fixed number of slots.
///
/// Arenas are owned exclusively by the pool. Once obtained, an arena is never
/// returned to the backing allocator before pool teardown; superseded arenas
/// stay reachable so their slots remain valid for the pool's lifetime.
///
/// The arena records the exact layout it was allocated with and replays it
/// verbatim when the extent is returned. Slots carry no occupancy tag of
/// their own; their role is tracked entirely by the pool's bookkeeping.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    /// Number of slots in the extent.
    capacity: NonZero<usize>,

    /// Exact layout obtained from the backing allocator, replayed at release.
    layout: Layout,

    /// Start of the slot array inside the backing extent.
    base: NonNull<MaybeUninit<T>>,
}

impl<T> Arena<T> {
    /// Obtains a new extent for `capacity` slots from the backing allocator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackingAllocation`] when the backing allocator
    /// declines the request.
    pub(crate) fn allocate<B>(backing: &B, capacity: NonZero<usize>) -> Result<Self, Error>
    where
        B: BackingAllocator,
    {
        let layout = slot_array_layout::<T>(capacity);

        let base = backing.allocate(layout).ok_or(Error::BackingAllocation {
            bytes: layout.size(),
        })?;

        Ok(Self {
            capacity,
            layout,
            base: base.cast::<MaybeUninit<T>>(),
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Pointer to the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<MaybeUninit<T>> {
        assert!(
            index < self.capacity.get(),
            "slot {index} index out of bounds in arena of capacity {}",
            self.capacity.get()
        );

        // SAFETY: The extent holds `capacity` consecutive slots and the index
        // is in bounds per the assertion above.
        unsafe { self.base.add(index) }
    }

    /// Returns the extent to the backing allocator it came from.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `backing` is the allocator this arena was obtained from.
    /// - No payload remains live in any slot and no slot pointer is used
    ///   after this call.
    pub(crate) unsafe fn release_to<B>(self, backing: &B)
    where
        B: BackingAllocator,
    {
        // SAFETY: Base and layout were produced together by a matching
        // allocate call on this backing allocator; the caller guarantees the
        // extent is no longer referenced.
        unsafe {
            backing.deallocate(self.base.cast::<u8>(), self.layout);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use new_zealand::nz;

    use super::*;
    use crate::SystemBacking;

    #[test]
    fn slots_are_distinct_and_writable() {
        let arena =
            Arena::<u64>::allocate(&SystemBacking, nz!(4)).expect("system allocation succeeds");

        for index in 0..4 {
            unsafe {
                arena.slot_ptr(index).write(MaybeUninit::new(index as u64 * 10));
            }
        }

        for index in 0..4 {
            let value = unsafe { arena.slot_ptr(index).read().assume_init() };
            assert_eq!(value, index as u64 * 10);
        }

        unsafe {
            arena.release_to(&SystemBacking);
        }
    }

    #[test]
    fn slot_stride_matches_payload_size() {
        let arena =
            Arena::<u32>::allocate(&SystemBacking, nz!(3)).expect("system allocation succeeds");

        let first = arena.slot_ptr(0).as_ptr() as usize;
        let second = arena.slot_ptr(1).as_ptr() as usize;
        assert_eq!(second - first, size_of::<u32>());

        unsafe {
            arena.release_to(&SystemBacking);
        }
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_slot_panics() {
        let arena =
            Arena::<u32>::allocate(&SystemBacking, nz!(2)).expect("system allocation succeeds");

        _ = arena.slot_ptr(2);
    }
}
