//! Demonstrates sharing a `FixedPool` across threads.
//!
//! The pool's locking is a pluggable policy selected at the type level: the
//! default no-op policy confines the pool to one thread at compile time,
//! while `ThreadSafe` makes the identical pool code safe for concurrent
//! callers.

use std::num::NonZero;
use std::sync::Arc;
use std::thread;

use fixed_pool::{FixedPool, ThreadSafe};

fn main() {
    let pool = Arc::new(
        FixedPool::<usize>::builder()
            .initial_capacity(NonZero::new(16).expect("sixteen is not zero"))
            .lock(ThreadSafe::new())
            .build()
            .expect("the system allocator provides the initial arena"),
    );

    println!(
        "Sharing a pool of {} slots across 4 worker threads",
        pool.capacity()
    );

    let mut workers = Vec::new();
    for worker in 0..4 {
        let pool = Arc::clone(&pool);

        workers.push(thread::spawn(move || {
            for iteration in 0..10_000 {
                let value = worker * 100_000 + iteration;

                // Growth happens with the pool's lock released, so other
                // workers keep acquiring from reserved capacity meanwhile.
                let lease = pool
                    .acquire_or_grow(value, NonZero::new(16).expect("sixteen is not zero"))
                    .expect("the system allocator provides growth arenas");

                assert_eq!(*lease, value);

                pool.release(lease);
            }
        }));
    }

    for worker in workers {
        worker.join().expect("worker thread completed");
    }

    println!(
        "All workers done: {} live payloads, {} slots reserved",
        pool.len(),
        pool.capacity()
    );
}
