use std::alloc;
use std::alloc::Layout;
use std::ptr::NonNull;

/// Raw memory source from which a pool obtains its arenas.
///
/// Implementations stand in for whatever the embedding environment uses as
/// its lowest-level allocation primitive, which may be an expensive or
/// syscall-backed operation. The pool amortizes calls to this trait across
/// many individual acquisitions, so implementations are expected to be slow
/// and are never called on the hint-less acquisition path.
///
/// # Exact layout contract
///
/// Every extent is deallocated with exactly the [`Layout`] used to allocate
/// it. The pool records the layout per arena and replays it verbatim; it
/// never infers or rounds sizes on its own.
pub trait BackingAllocator {
    /// Requests one contiguous extent of memory described by `layout`.
    ///
    /// Returns `None` when the extent cannot be provided. The pool treats
    /// this as an ordinary, non-fatal outcome and surfaces it to the caller
    /// without retrying.
    ///
    /// The returned pointer must be valid for reads and writes of
    /// `layout.size()` bytes and aligned to `layout.align()`.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Returns an extent previously obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `ptr` was returned by a call to `allocate` on this same allocator.
    /// - `layout` is exactly the layout that call was made with.
    /// - The extent has not already been deallocated.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Backing allocator over the process-global allocator.
///
/// This is the default collaborator for pools that run in an ordinary hosted
/// environment. Embeddings with their own raw memory source supply a
/// [`BackingAllocator`] of their own instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBacking;

impl BackingAllocator for SystemBacking {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        assert!(
            layout.size() > 0,
            "SystemBacking cannot allocate a zero-sized extent"
        );

        // SAFETY: The layout size is asserted to be non-zero above.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarding the caller's guarantee that the pointer came from
        // a matching `alloc` call with this exact layout.
        unsafe {
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use super::*;

    #[test]
    fn system_backing_round_trip() {
        let layout = Layout::array::<u64>(16).expect("small array layout is always valid");

        let extent = SystemBacking
            .allocate(layout)
            .expect("the process allocator is not expected to fail in tests");

        // The extent must be writable and readable across its full size.
        unsafe {
            extent.as_ptr().write_bytes(0xAB, layout.size());
            assert_eq!(extent.as_ptr().read(), 0xAB);
            assert_eq!(
                extent.as_ptr().add(layout.size() - 1).read(),
                0xAB
            );
        }

        unsafe {
            SystemBacking.deallocate(extent, layout);
        }
    }

    #[test]
    fn system_backing_honors_alignment() {
        let layout = Layout::from_size_align(64, 64).expect("valid layout");

        let extent = SystemBacking
            .allocate(layout)
            .expect("the process allocator is not expected to fail in tests");

        assert_eq!(extent.as_ptr() as usize % 64, 0);

        unsafe {
            SystemBacking.deallocate(extent, layout);
        }
    }

    #[test]
    #[should_panic]
    fn zero_sized_extent_panics() {
        let layout = Layout::from_size_align(0, 1).expect("valid layout");

        _ = SystemBacking.allocate(layout);
    }
}
