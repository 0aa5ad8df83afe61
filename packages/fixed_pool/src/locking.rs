use std::fmt;

use parking_lot::RawMutex;
use parking_lot::lock_api::RawMutex as _;

/// Locking hooks guarding a pool's shared state.
///
/// The pool does not manufacture mutual exclusion itself; it calls these
/// hooks around every access to its bookkeeping and leaves the choice of
/// policy to the embedder. With [`SingleThreaded`] every hook is a no-op and
/// the pool is only usable from one thread, which the type system enforces
/// by withholding `Sync`. With a [`MutualExclusion`] policy such as
/// [`ThreadSafe`] the same pool code becomes safe for concurrent callers,
/// without changes.
///
/// Backing allocations during growth are deliberately issued while the lock
/// is released, so a policy must tolerate acquire/release pairs that do not
/// nest with other work.
pub trait LockPolicy {
    /// Blocks until the policy's exclusion is held by the caller.
    fn acquire(&self);

    /// Releases the exclusion obtained by a matching [`acquire`](Self::acquire).
    fn release(&self);

    /// Whether the exclusion is currently held.
    ///
    /// Used only to assert required invariants in debug builds; policies
    /// without a meaningful answer report `true`.
    fn is_held(&self) -> bool;
}

/// Marker for lock policies that provide real mutual exclusion.
///
/// A pool is `Sync` only when its lock policy implements this trait, so the
/// no-op [`SingleThreaded`] policy keeps the pool confined to one thread at
/// compile time.
///
/// # Safety
///
/// Implementors must guarantee that between a return from
/// [`LockPolicy::acquire`] and the matching [`LockPolicy::release`], no other
/// thread can be between its own such pair on the same policy value.
pub unsafe trait MutualExclusion: LockPolicy {}

/// No-op lock policy for pools confined to a single thread.
///
/// All hooks do nothing. [`is_held`](LockPolicy::is_held) reports `true` so
/// that invariant assertions written against the hooks hold vacuously.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleThreaded;

impl LockPolicy for SingleThreaded {
    fn acquire(&self) {}

    fn release(&self) {}

    fn is_held(&self) -> bool {
        true
    }
}

/// Mutual-exclusion policy over a raw mutex, for pools shared across threads.
pub struct ThreadSafe {
    raw: RawMutex,
}

impl ThreadSafe {
    /// Creates a new, unlocked policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw: RawMutex::INIT,
        }
    }
}

impl Default for ThreadSafe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThreadSafe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSafe")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}

impl LockPolicy for ThreadSafe {
    fn acquire(&self) {
        self.raw.lock();
    }

    fn release(&self) {
        // SAFETY: The pool only releases on the thread that performed the
        // matching acquire, and never releases without holding the lock.
        unsafe {
            self.raw.unlock();
        }
    }

    fn is_held(&self) -> bool {
        self.raw.is_locked()
    }
}

// SAFETY: ThreadSafe wraps a real mutex; between acquire and release no other
// thread can complete its own acquire on the same value.
unsafe impl MutualExclusion for ThreadSafe {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn single_threaded_always_reports_held() {
        let policy = SingleThreaded;

        assert!(policy.is_held());
        policy.acquire();
        assert!(policy.is_held());
        policy.release();
        assert!(policy.is_held());
    }

    #[test]
    fn thread_safe_tracks_held_state() {
        let policy = ThreadSafe::new();

        assert!(!policy.is_held());
        policy.acquire();
        assert!(policy.is_held());
        policy.release();
        assert!(!policy.is_held());
    }

    #[test]
    fn thread_safe_excludes_concurrent_holders() {
        let policy = Arc::new(ThreadSafe::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let policy = Arc::clone(&policy);
            let counter = Arc::clone(&counter);

            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    policy.acquire();
                    // Non-atomic read-modify-write is only correct if the
                    // policy really excludes other holders.
                    let observed = counter.load(Ordering::Relaxed);
                    counter.store(observed + 1, Ordering::Relaxed);
                    policy.release();
                }
            }));
        }

        for handle in handles {
            handle.join().expect("worker thread completed");
        }

        assert_eq!(counter.load(Ordering::Relaxed), 4000);
    }

    #[test]
    fn debug_output_names_the_policy() {
        let policy = ThreadSafe::new();
        let debug_output = format!("{policy:?}");
        assert!(debug_output.contains("ThreadSafe"));
    }
}
