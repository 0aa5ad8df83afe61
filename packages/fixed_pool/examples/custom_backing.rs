//! Demonstrates plugging a custom backing allocator into `FixedPool`.
//!
//! The backing allocator stands in for whatever raw memory source the
//! embedding environment provides; here a logging wrapper over the system
//! allocator makes the pool's amortization visible, and the granularity
//! helpers size the arenas to exact page multiples.

use std::alloc::Layout;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use fixed_pool::{BackingAllocator, FixedPool, SystemBacking, arena_bytes, capacity_align_up};

/// Stand-in for an expensive, syscall-backed memory source.
#[derive(Debug, Default)]
struct LoggingBacking {
    calls: AtomicUsize,
}

impl BackingAllocator for LoggingBacking {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        println!(
            "  backing call #{call}: allocating {} bytes",
            layout.size()
        );

        SystemBacking.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        println!("  backing free: returning {} bytes", layout.size());

        // SAFETY: Forwarding the caller's guarantee; the extent came from the
        // matching `allocate` above, which delegated to `SystemBacking`.
        unsafe {
            SystemBacking.deallocate(ptr, layout);
        }
    }
}

fn main() {
    // Size the first arena so its allocation is an exact multiple of a
    // 4096-byte page, the way a page-granular backing would want it.
    let page = NonZero::new(4096).expect("page size is not zero");
    let capacity = capacity_align_up::<[u8; 48]>(100, page);
    let capacity = NonZero::new(capacity).expect("rounding up a positive count stays positive");

    println!(
        "Requested 100 slots, page-aligned up to {} slots ({} bytes)",
        capacity,
        arena_bytes::<[u8; 48]>(capacity)
    );

    println!();
    println!("Creating the pool (one backing call):");
    let pool = FixedPool::<[u8; 48]>::builder()
        .initial_capacity(capacity)
        .backing(LoggingBacking::default())
        .build()
        .expect("the logging backing delegates to the system allocator");

    println!();
    println!("Acquiring 100 slots (no backing calls at all):");
    let mut leases = Vec::new();
    for index in 0..100 {
        let fill = u8::try_from(index).expect("index stays below 256");
        leases.push(
            pool.acquire([fill; 48])
                .expect("the aligned capacity covers all one hundred slots"),
        );
    }
    println!("  {} live payloads, zero backing calls made", pool.len());

    for lease in leases {
        pool.release(lease);
    }

    println!();
    println!("Dropping the pool (one backing free per arena):");
    drop(pool);
}
