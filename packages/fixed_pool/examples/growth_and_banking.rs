//! Demonstrates on-demand growth and banked capacity in `FixedPool`.
//!
//! This example shows how a plain acquisition refuses rather than allocate,
//! how `acquire_or_grow` obtains a new arena only when needed, and how
//! capacity added by `grow` is banked until existing capacity is exhausted.

use std::num::NonZero;

use fixed_pool::{Error, FixedPool};

fn main() {
    let pool = FixedPool::<u64>::builder()
        .initial_capacity(NonZero::new(2).expect("two is not zero"))
        .build()
        .expect("the system allocator provides the initial arena");

    println!("=== Plain acquisition never allocates ===");

    let a = pool.acquire(1).expect("capacity is available");
    let b = pool.acquire(2).expect("capacity is available");

    // The pool is now exhausted. A plain acquisition fails instead of
    // touching the backing allocator.
    match pool.acquire(3) {
        Err(Error::CapacityExhausted) => {
            println!("Exhausted pool refused a plain acquisition");
        }
        other => println!("Unexpected outcome: {other:?}"),
    }

    println!();
    println!("=== Growth on demand ===");

    // An acquisition carrying a growth size obtains a new arena instead.
    let c = pool
        .acquire_or_grow(3, NonZero::new(4).expect("four is not zero"))
        .expect("the system allocator provides the growth arena");
    println!("Grew on demand, capacity is now {}", pool.capacity());

    println!();
    println!("=== Banked capacity ===");

    // Growing ahead of time banks an arena without activating it. The banked
    // slots are drawn on only once everything already reserved is used up.
    pool.grow(NonZero::new(8).expect("eight is not zero"))
        .expect("the system allocator provides the banked arena");
    println!(
        "Banked 8 more slots, capacity is now {} with {} live payloads",
        pool.capacity(),
        pool.len()
    );

    // Draining the current arena crosses into the banked one with no further
    // backing allocation.
    let mut drained = Vec::new();
    while let Ok(lease) = pool.acquire(99) {
        drained.push(lease);
    }
    println!(
        "Drained the pool: {} live payloads out of {} slots",
        pool.len(),
        pool.capacity()
    );

    for lease in drained {
        pool.release(lease);
    }
    pool.release(a);
    pool.release(b);
    pool.release(c);

    println!();
    println!("Final pool length: {}", pool.len());
}
