//! Cross-thread behavior of pools using a mutual-exclusion lock policy.
#![allow(
    clippy::arithmetic_side_effects,
    reason = "test code doesn't need the same rigor as production code"
)]

use std::collections::HashSet;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use fixed_pool::{FixedPool, ThreadSafe};
use new_zealand::nz;

#[test]
fn concurrent_acquire_and_release() {
    let pool = Arc::new(
        FixedPool::<usize>::builder()
            .initial_capacity(nz!(8))
            .lock(ThreadSafe::new())
            .build()
            .expect("system allocation succeeds"),
    );

    let mut workers = Vec::new();
    for worker in 0..4 {
        let pool = Arc::clone(&pool);

        workers.push(thread::spawn(move || {
            for iteration in 0..250 {
                let value = worker * 1000 + iteration;
                let lease = pool
                    .acquire_or_grow(value, nz!(4))
                    .expect("growth is backed by the system allocator");

                assert_eq!(*lease, value);

                pool.release(lease);
            }
        }));
    }

    for worker in workers {
        worker.join().expect("worker thread completed");
    }

    assert_eq!(pool.len(), 0);
    assert!(pool.capacity() >= 8);
}

#[test]
fn concurrent_holders_get_distinct_slots() {
    let pool = Arc::new(
        FixedPool::<u64>::builder()
            .initial_capacity(nz!(2))
            .lock(ThreadSafe::new())
            .build()
            .expect("system allocation succeeds"),
    );
    let observed = Arc::new(Mutex::new(Vec::new()));
    // All leases must be live at once before anyone releases, so no slot can
    // be legitimately handed out twice.
    let all_acquired = Arc::new(Barrier::new(4));

    let mut workers = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        let observed = Arc::clone(&observed);
        let all_acquired = Arc::clone(&all_acquired);

        workers.push(thread::spawn(move || {
            let mut leases = Vec::new();
            for value in 0..50 {
                leases.push(
                    pool.acquire_or_grow(value, nz!(16))
                        .expect("growth is backed by the system allocator"),
                );
            }

            let mut addresses = observed.lock().expect("lock is never poisoned");
            for lease in &leases {
                addresses.push(lease.ptr().as_ptr() as usize);
            }
            drop(addresses);

            all_acquired.wait();

            for lease in leases {
                pool.release(lease);
            }
        }));
    }

    for worker in workers {
        worker.join().expect("worker thread completed");
    }

    // 200 simultaneously live leases must have had 200 distinct addresses.
    let addresses = observed.lock().expect("lock is never poisoned");
    let distinct: HashSet<usize> = addresses.iter().copied().collect();
    assert_eq!(distinct.len(), addresses.len());

    assert_eq!(pool.len(), 0);
    assert!(pool.capacity() >= 200);
}

#[test]
fn leases_can_move_between_threads() {
    let pool = FixedPool::<String>::builder()
        .initial_capacity(nz!(2))
        .lock(ThreadSafe::new())
        .build()
        .expect("system allocation succeeds");

    let lease = pool
        .acquire("made on the main thread".to_string())
        .expect("capacity is available");

    let value = thread::scope(|scope| {
        let pool = &pool;

        scope
            .spawn(move || {
                assert_eq!(&*lease, "made on the main thread");
                pool.take(lease)
            })
            .join()
            .expect("worker thread completed")
    });

    assert_eq!(value, "made on the main thread");
    assert_eq!(pool.len(), 0);
}
