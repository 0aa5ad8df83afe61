//! Basic usage example for `FixedPool`.
//!
//! This example demonstrates how to acquire and release slots, access the
//! payload through a lease, and recover a payload by value.

use std::num::NonZero;

use fixed_pool::FixedPool;

fn main() {
    // Create a pool with room for eight strings.
    let pool = FixedPool::<String>::builder()
        .initial_capacity(NonZero::new(8).expect("eight is not zero"))
        .build()
        .expect("the system allocator provides the initial arena");

    println!("Created FixedPool with capacity: {}", pool.capacity());

    // Acquire some slots.
    let first = pool
        .acquire("first".to_string())
        .expect("capacity is available");
    let second = pool
        .acquire("second".to_string())
        .expect("capacity is available");
    let mut third = pool
        .acquire("third".to_string())
        .expect("capacity is available");

    println!("Acquired 3 slots, pool length: {}", pool.len());

    // Access payloads directly through Deref and DerefMut.
    println!("First payload: {}", *first);
    third.push_str(" (edited in place)");
    println!("Third payload: {}", *third);

    // Releasing returns the slot for reuse and drops the payload.
    pool.release(first);
    println!("Released one slot, pool length: {}", pool.len());

    // The most recently released slot is the first one handed out again.
    let recycled = pool
        .acquire("recycled".to_string())
        .expect("a released slot is available");
    println!("Recycled payload: {}", *recycled);

    // `take` hands the payload back instead of dropping it.
    let kept = pool.take(second);
    println!("Took a payload out of the pool: {kept}");

    pool.release(third);
    pool.release(recycled);

    println!("Final pool length: {}", pool.len());
    assert!(pool.is_empty());
}
