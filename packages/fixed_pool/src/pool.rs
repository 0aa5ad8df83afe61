use std::cell::UnsafeCell;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{mem, ptr, thread};

use crate::error::Result;
use crate::{
    Arena, BackingAllocator, DropPolicy, Error, FixedPoolBuilder, Lease, LockPolicy,
    MutualExclusion, SingleThreaded, SlotCoordinates, SystemBacking,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// An object pool for fixed-size payloads that amortizes backing allocations
/// across many acquisitions and grows on demand.
///
/// `FixedPool` serves and reclaims storage for many equally-sized payloads of
/// one caller-chosen type `T`. It is built for environments where every
/// backing allocation is expensive or tightly controlled: the pool obtains
/// whole arenas of slots from a pluggable [`BackingAllocator`] and hands them
/// out one slot at a time, so the cost of one backing call is spread over
/// many acquisitions. Capacity that was reserved but never used is never
/// given back early; it stays banked until needed or until the pool is
/// dropped.
///
/// # Capacity model
///
/// - Fresh slots come from a bump cursor over the **active arena**.
/// - Released slots go onto a free stack and are reused most-recent-first.
/// - Arenas added by [`grow()`](Self::grow) are **banked**: they are not
///   touched until the active arena and the free stack are both exhausted,
///   at which point the oldest banked arena is activated.
/// - [`acquire()`](Self::acquire) never calls the backing allocator. Only
///   [`acquire_or_grow()`](Self::acquire_or_grow), [`grow()`](Self::grow),
///   and construction do.
///
/// # Thread safety
///
/// Locking is a pluggable policy, not something the pool manufactures. With
/// the default [`SingleThreaded`] policy all lock hooks are no-ops and the
/// pool is not [`Sync`]; with a [`MutualExclusion`] policy such as
/// [`ThreadSafe`][crate::ThreadSafe] the same code is safe for concurrent
/// callers. The backing call made during growth runs while the lock is
/// released, so other threads keep acquiring from already-reserved capacity
/// while one thread grows.
///
/// # Examples
///
/// Basic acquire and release:
///
/// ```
/// use std::num::NonZero;
///
/// use fixed_pool::FixedPool;
///
/// let pool = FixedPool::<String>::builder()
///     .initial_capacity(NonZero::new(4).unwrap())
///     .build()
///     .unwrap();
///
/// let lease = pool.acquire("Hello, World!".to_string()).unwrap();
/// assert_eq!(lease.len(), 13);
///
/// // Releasing recycles the slot for later acquisitions.
/// pool.release(lease);
/// assert!(pool.is_empty());
/// ```
///
/// Exhaustion and growth:
///
/// ```
/// use std::num::NonZero;
///
/// use fixed_pool::{Error, FixedPool};
///
/// let pool = FixedPool::<u64>::builder()
///     .initial_capacity(NonZero::new(1).unwrap())
///     .build()
///     .unwrap();
///
/// let first = pool.acquire(1).unwrap();
///
/// // Without a growth size, an exhausted pool refuses.
/// assert!(matches!(pool.acquire(2), Err(Error::CapacityExhausted)));
///
/// // With one, it obtains a new arena from the backing allocator.
/// let second = pool.acquire_or_grow(2, NonZero::new(8).unwrap()).unwrap();
/// assert_eq!(pool.capacity(), 9);
///
/// pool.release(first);
/// pool.release(second);
/// ```
pub struct FixedPool<T, B: BackingAllocator = SystemBacking, L: LockPolicy = SingleThreaded> {
    /// We need to uniquely identify each pool to ensure that leases are not
    /// returned to the wrong pool. If the pool ID does not match when a lease
    /// is returned, we panic.
    pool_id: u64,

    /// Shared mutable state; read and written only under the lock policy,
    /// except in `Drop`, where `&mut self` already guarantees exclusivity.
    state: UnsafeCell<PoolState<T>>,

    backing: B,

    lock: L,

    /// Drop policy that determines how the pool handles live payloads when
    /// dropped.
    drop_policy: DropPolicy,
}

/// Shared mutable state of a pool.
#[derive(Debug)]
struct PoolState<T> {
    /// Ordered arena collection. Entries up to and including `active` have
    /// been activated (all fully consumed except possibly the last); entries
    /// beyond it are banked for later activation, oldest first.
    arenas: Vec<Arena<T>>,

    /// Index of the arena currently supplying fresh slots.
    active: usize,

    /// Next untouched slot in the active arena.
    cursor: usize,

    /// One past the last slot of the active arena. `cursor == cursor_limit`
    /// means the active arena is exhausted.
    cursor_limit: usize,

    /// Released slots available for reuse, most recently freed last.
    free: Vec<SlotCoordinates>,

    /// Slot count across all arenas, banked included.
    total_capacity: usize,

    /// Live payload count.
    len: usize,
}

impl<T> PoolState<T> {
    /// Makes `arenas[index]` the arena the cursor bumps through.
    fn activate(&mut self, index: usize) {
        let capacity = self
            .arenas
            .get(index)
            .expect("only existing arenas are ever activated")
            .capacity();

        self.active = index;
        self.cursor = 0;
        self.cursor_limit = capacity.get();
    }

    #[cfg(debug_assertions)]
    #[allow(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "integrity check needs array access"
    )]
    fn integrity_check(&self) {
        assert!(self.active < self.arenas.len());
        assert!(self.cursor <= self.cursor_limit);
        assert_eq!(
            self.cursor_limit,
            self.arenas[self.active].capacity().get()
        );

        let mut seen = HashSet::new();
        for coordinates in &self.free {
            assert!(
                coordinates.arena_index() <= self.active,
                "free stack addresses a banked arena"
            );

            let consumed = if coordinates.arena_index() == self.active {
                self.cursor
            } else {
                self.arenas[coordinates.arena_index()].capacity().get()
            };
            assert!(
                coordinates.slot_index() < consumed,
                "free stack addresses an untouched slot"
            );

            assert!(
                seen.insert(*coordinates),
                "free stack holds duplicate coordinates"
            );
        }

        let activated: usize = self
            .arenas
            .iter()
            .take(self.active + 1)
            .map(|arena| arena.capacity().get())
            .sum();
        let untouched = self.cursor_limit - self.cursor;
        assert_eq!(
            self.len + self.free.len() + untouched,
            activated,
            "live, free, and untouched slots must cover the activated capacity"
        );

        let total: usize = self
            .arenas
            .iter()
            .map(|arena| arena.capacity().get())
            .sum();
        assert_eq!(self.total_capacity, total);
    }
}

impl<T> FixedPool<T> {
    /// Creates a builder for configuring and constructing a [`FixedPool`].
    ///
    /// You must specify the initial capacity using
    /// [`initial_capacity()`](FixedPoolBuilder::initial_capacity) before
    /// calling [`build()`](FixedPoolBuilder::build).
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<u64>::builder()
    ///     .initial_capacity(NonZero::new(16).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// assert!(pool.is_empty());
    /// ```
    #[inline]
    pub fn builder() -> FixedPoolBuilder<T> {
        FixedPoolBuilder::new()
    }
}

impl<T, B, L> FixedPool<T, B, L>
where
    B: BackingAllocator,
    L: LockPolicy,
{
    /// Creates a new pool with the specified configuration, performing its
    /// single initial backing allocation.
    ///
    /// This method is used internally by the builder to construct the pool.
    pub(crate) fn new_inner(
        capacity: NonZero<usize>,
        backing: B,
        lock: L,
        drop_policy: DropPolicy,
    ) -> Result<Self> {
        assert!(
            mem::size_of::<T>() > 0,
            "FixedPool must have non-zero payload size"
        );

        let arena = Arena::allocate(&backing, capacity)?;

        let state = PoolState {
            arenas: vec![arena],
            active: 0,
            cursor: 0,
            cursor_limit: capacity.get(),
            free: Vec::new(),
            total_capacity: capacity.get(),
            len: 0,
        };

        Ok(Self {
            pool_id: generate_pool_id(),
            state: UnsafeCell::new(state),
            backing,
            lock,
            drop_policy,
        })
    }

    /// The number of payloads currently live in the pool.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Tests loop on len targets; mutation can hang them.
    pub fn len(&self) -> usize {
        self.lock.acquire();
        // SAFETY: The lock is held, so this read cannot race a writer.
        let len = unsafe { (*self.state.get()).len };
        self.lock.release();
        len
    }

    /// Whether the pool has no live payloads.
    ///
    /// An empty pool may still be holding reserved capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of payloads the pool can reach without further backing
    /// allocation, live payloads and banked arenas included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock.acquire();
        // SAFETY: The lock is held, so this read cannot race a writer.
        let capacity = unsafe { (*self.state.get()).total_capacity };
        self.lock.release();
        capacity
    }

    /// Moves `value` into a slot of the pool, consuming only capacity that is
    /// already reserved: an untouched slot of the active arena, a banked
    /// arena, or a previously released slot, in that order of preference for
    /// fresh capacity (released slots are always reused first).
    ///
    /// This method never calls the backing allocator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] when no reserved capacity
    /// remains, leaving the pool unchanged; `value` is dropped. Use
    /// [`acquire_or_grow()`](Self::acquire_or_grow) to obtain more capacity
    /// instead.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<u64>::builder()
    ///     .initial_capacity(NonZero::new(4).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// let lease = pool.acquire(42).unwrap();
    /// assert_eq!(*lease, 42);
    /// assert_eq!(pool.len(), 1);
    ///
    /// pool.release(lease);
    /// ```
    pub fn acquire(&self, value: T) -> Result<Lease<'_, T>> {
        self.acquire_inner(value, None)
    }

    /// Like [`acquire()`](Self::acquire), but obtains a new arena of `growth`
    /// slots from the backing allocator if, and only if, no reserved
    /// capacity remains.
    ///
    /// The backing call is made while the pool's lock is released, so with a
    /// mutual-exclusion policy other threads keep acquiring from reserved
    /// capacity in the meantime. If another caller provided capacity while
    /// the lock was released, the newly obtained arena is simply banked for
    /// later use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackingAllocation`] when growth was needed and the
    /// backing allocator declined, leaving the pool unchanged; `value` is
    /// dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<u64>::builder()
    ///     .initial_capacity(NonZero::new(1).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// let first = pool.acquire_or_grow(1, NonZero::new(4).unwrap()).unwrap();
    /// // The pool had capacity, so no growth happened.
    /// assert_eq!(pool.capacity(), 1);
    ///
    /// let second = pool.acquire_or_grow(2, NonZero::new(4).unwrap()).unwrap();
    /// // This time the pool was exhausted and grew by exactly four slots.
    /// assert_eq!(pool.capacity(), 5);
    /// # pool.release(first);
    /// # pool.release(second);
    /// ```
    pub fn acquire_or_grow(&self, value: T, growth: NonZero<usize>) -> Result<Lease<'_, T>> {
        self.acquire_inner(value, Some(growth))
    }

    fn acquire_inner(&self, value: T, growth: Option<NonZero<usize>>) -> Result<Lease<'_, T>> {
        self.lock.acquire();

        loop {
            debug_assert!(self.lock.is_held());

            // SAFETY: The lock is held, making this the only live reference
            // to the state.
            let state = unsafe { &mut *self.state.get() };

            if state.cursor != state.cursor_limit || !state.free.is_empty() {
                break;
            }

            // Capacity banked by an earlier growth is activated before
            // anything else. Cannot overflow: active is a valid index.
            let next = state.active.wrapping_add(1);
            if next < state.arenas.len() {
                state.activate(next);
                break;
            }

            self.lock.release();

            let Some(growth) = growth else {
                return Err(Error::CapacityExhausted);
            };

            let arena = Arena::allocate(&self.backing, growth)?;

            // Another caller may have banked or activated capacity while the
            // lock was released; the loop re-evaluates, and if so the new
            // arena just banks for later use.
            self.lock.acquire();

            // SAFETY: The lock was re-acquired above.
            let state = unsafe { &mut *self.state.get() };
            state.arenas.push(arena);
            // Cannot overflow: capacity beyond virtual memory is unrepresentable.
            state.total_capacity = state.total_capacity.wrapping_add(growth.get());
        }

        // SAFETY: Every loop exit above leaves the lock held.
        let state = unsafe { &mut *self.state.get() };

        let coordinates = if let Some(coordinates) = state.free.pop() {
            coordinates
        } else {
            let coordinates = SlotCoordinates::from_parts(state.active, state.cursor);
            // Cannot overflow: the cursor is bounded by cursor_limit.
            state.cursor = state.cursor.wrapping_add(1);
            coordinates
        };
        debug_assert!(state.cursor <= state.cursor_limit);

        let slot = state
            .arenas
            .get(coordinates.arena_index())
            .expect("coordinates always address an existing arena")
            .slot_ptr(coordinates.slot_index());

        // SAFETY: The slot is vacant, fresh from the cursor or popped off the
        // free stack, so writing does not overwrite a live payload.
        unsafe {
            slot.cast::<T>().write(value);
        }

        // Cannot overflow: the payload count is bounded by total capacity.
        state.len = state.len.wrapping_add(1);

        #[cfg(debug_assertions)]
        state.integrity_check();

        self.lock.release();

        Ok(Lease::new(self.pool_id, coordinates, slot.cast::<T>()))
    }

    /// Obtains one new arena of `capacity` slots from the backing allocator
    /// and banks it, without activating it.
    ///
    /// The new capacity is drawn on only once the currently reserved
    /// capacity is exhausted. The backing call is made while the pool's lock
    /// is released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackingAllocation`] when the backing allocator
    /// declines; the pool is left unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<u64>::builder()
    ///     .initial_capacity(NonZero::new(2).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// pool.grow(NonZero::new(6).unwrap()).unwrap();
    /// assert_eq!(pool.capacity(), 8);
    /// ```
    pub fn grow(&self, capacity: NonZero<usize>) -> Result<()> {
        // The backing call happens without the lock so concurrent
        // acquisitions can keep draining already-reserved capacity.
        let arena = Arena::allocate(&self.backing, capacity)?;

        self.lock.acquire();
        // SAFETY: The lock is held, making this the only live reference to
        // the state.
        let state = unsafe { &mut *self.state.get() };
        state.arenas.push(arena);
        // Cannot overflow: capacity beyond virtual memory is unrepresentable.
        state.total_capacity = state.total_capacity.wrapping_add(capacity.get());
        self.lock.release();

        Ok(())
    }

    /// Returns a leased slot to the pool, dropping the payload.
    ///
    /// The slot goes onto the free stack and is the first candidate for the
    /// next acquisition. The payload's `Drop` runs after the pool's lock has
    /// been released, so payloads may themselves interact with the pool while
    /// being dropped.
    ///
    /// # Panics
    ///
    /// Panics if the lease belongs to a different pool.
    pub fn release(&self, lease: Lease<'_, T>) {
        // Payload drop runs outside the lock.
        drop(self.take(lease));
    }

    /// Returns a leased slot to the pool and hands the payload back to the
    /// caller instead of dropping it.
    ///
    /// # Panics
    ///
    /// Panics if the lease belongs to a different pool.
    ///
    /// # Example
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use fixed_pool::FixedPool;
    ///
    /// let pool = FixedPool::<String>::builder()
    ///     .initial_capacity(NonZero::new(2).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// let lease = pool.acquire("payload".to_string()).unwrap();
    /// let value = pool.take(lease);
    ///
    /// assert_eq!(value, "payload");
    /// assert!(pool.is_empty());
    /// ```
    #[must_use = "use release() if the payload is not needed"]
    pub fn take(&self, lease: Lease<'_, T>) -> T {
        assert!(
            lease.pool_id() == self.pool_id,
            "attempted to release a lease from a different pool (lease pool ID: {}, this pool ID: {})",
            lease.pool_id(),
            self.pool_id
        );

        // Read the payload out before the slot becomes reusable; the lease
        // guarantees exclusive access up to this point.
        // SAFETY: The lease addresses a slot holding an initialized payload.
        let value = unsafe { lease.ptr().read() };

        let coordinates = lease.coordinates();

        self.lock.acquire();
        // SAFETY: The lock is held, making this the only live reference to
        // the state.
        let state = unsafe { &mut *self.state.get() };
        state.free.push(coordinates);
        // Cannot underflow: a live lease implies at least one live payload.
        state.len = state.len.wrapping_sub(1);
        #[cfg(debug_assertions)]
        state.integrity_check();
        self.lock.release();

        value
    }
}

impl<T, B, L> Drop for FixedPool<T, B, L>
where
    B: BackingAllocator,
    L: LockPolicy,
{
    fn drop(&mut self) {
        // Exclusive access is guaranteed by `&mut self`; no locking here.
        let state = self.state.get_mut();

        let live = state.len;

        // Drop payloads still live in the consumed regions: every slot before
        // the cursor of an activated arena that is not on the free stack.
        let freed: HashSet<SlotCoordinates> = state.free.iter().copied().collect();

        for (arena_index, arena) in state.arenas.iter().enumerate() {
            if arena_index > state.active {
                // Banked arenas hold no payloads.
                break;
            }

            let consumed = if arena_index == state.active {
                state.cursor
            } else {
                arena.capacity().get()
            };

            for slot_index in 0..consumed {
                if freed.contains(&SlotCoordinates::from_parts(arena_index, slot_index)) {
                    continue;
                }

                // SAFETY: Every consumed, non-freed slot holds an initialized
                // payload that nothing else will drop.
                unsafe {
                    ptr::drop_in_place(arena.slot_ptr(slot_index).cast::<T>().as_ptr());
                }
            }
        }

        // Return every extent to the backing allocator, exact layouts replayed.
        for arena in state.arenas.drain(..) {
            // SAFETY: Payloads were dropped above and no slot pointer survives
            // the pool; the arena came from this same backing allocator.
            unsafe {
                arena.release_to(&self.backing);
            }
        }

        // We do this check at the end so the memory is cleaned up first.
        //
        // If we are already panicking, we do not want to panic again because
        // that would simply obscure whatever the original panic was.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotDropItems) {
            assert!(
                live == 0,
                "dropped a non-empty FixedPool with {live} live payloads - this is forbidden by DropPolicy::MustNotDropItems"
            );
        }
    }
}

impl<T, B, L> fmt::Debug for FixedPool<T, B, L>
where
    B: BackingAllocator + fmt::Debug,
    L: LockPolicy + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lock.acquire();
        // SAFETY: The lock is held, so these reads cannot race a writer.
        let (len, capacity) = unsafe {
            let state = &*self.state.get();
            (state.len, state.total_capacity)
        };
        self.lock.release();

        f.debug_struct("FixedPool")
            .field("pool_id", &self.pool_id)
            .field("len", &len)
            .field("capacity", &capacity)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

// SAFETY: The pool exclusively owns its arenas and payloads; moving it to
// another thread moves them with it. The raw pointers involved target memory
// the pool owns.
unsafe impl<T, B, L> Send for FixedPool<T, B, L>
where
    T: Send,
    B: BackingAllocator + Send,
    L: LockPolicy + Send,
{
}

// SAFETY: Every access to the shared state goes through the lock policy, and
// MutualExclusion guarantees the policy provides real mutual exclusion.
// Payloads move in and out on any thread, hence T: Send.
unsafe impl<T, B, L> Sync for FixedPool<T, B, L>
where
    T: Send,
    B: BackingAllocator + Sync,
    L: MutualExclusion + Sync,
{
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::undocumented_unsafe_blocks,
    reason = "test code doesn't need the same rigor as production code"
)]
mod tests {
    use std::alloc::Layout;
    use std::cell::Cell;
    use std::ptr::NonNull;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::ThreadSafe;

    assert_impl_all!(FixedPool<u64>: Send, std::fmt::Debug);
    assert_not_impl_any!(FixedPool<u64>: Sync);
    assert_impl_all!(FixedPool<u64, SystemBacking, ThreadSafe>: Send, Sync);

    /// Backing allocator test double that records every call and can be told
    /// to deny further allocations.
    #[derive(Clone, Debug, Default)]
    struct CountingBacking {
        log: Arc<Mutex<CallLog>>,
    }

    #[derive(Debug, Default)]
    struct CallLog {
        allocated: Vec<usize>,
        freed: Vec<usize>,
        deny: bool,
    }

    impl CountingBacking {
        fn set_deny(&self, deny: bool) {
            self.log.lock().expect("lock is never poisoned").deny = deny;
        }

        fn allocation_count(&self) -> usize {
            self.log.lock().expect("lock is never poisoned").allocated.len()
        }

        fn free_count(&self) -> usize {
            self.log.lock().expect("lock is never poisoned").freed.len()
        }

        fn allocated_sizes(&self) -> Vec<usize> {
            self.log.lock().expect("lock is never poisoned").allocated.clone()
        }

        fn freed_sizes(&self) -> Vec<usize> {
            self.log.lock().expect("lock is never poisoned").freed.clone()
        }
    }

    impl BackingAllocator for CountingBacking {
        fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            {
                let mut log = self.log.lock().expect("lock is never poisoned");
                if log.deny {
                    return None;
                }
                log.allocated.push(layout.size());
            }

            SystemBacking.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.log
                .lock()
                .expect("lock is never poisoned")
                .freed
                .push(layout.size());

            unsafe {
                SystemBacking.deallocate(ptr, layout);
            }
        }
    }

    /// Test helper that counts how many times it has been dropped.
    struct DropTracker {
        drops: Rc<Cell<u32>>,
    }

    impl DropTracker {
        fn new() -> (Self, Rc<Cell<u32>>) {
            let drops = Rc::new(Cell::new(0));
            (
                Self {
                    drops: Rc::clone(&drops),
                },
                drops,
            )
        }
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn smoke_test() {
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(3))
            .build()
            .expect("system allocation succeeds");

        let lease_a = pool.acquire(42).expect("capacity is available");
        let lease_b = pool.acquire(43).expect("capacity is available");
        let lease_c = pool.acquire(44).expect("capacity is available");

        assert_eq!(*lease_a, 42);
        assert_eq!(*lease_b, 43);
        assert_eq!(*lease_c, 44);
        assert_eq!(pool.len(), 3);

        pool.release(lease_b);
        assert_eq!(pool.len(), 2);

        let lease_d = pool.acquire(45).expect("a released slot is available");

        assert_eq!(*lease_a, 42);
        assert_eq!(*lease_c, 44);
        assert_eq!(*lease_d, 45);

        pool.release(lease_a);
        pool.release(lease_c);
        pool.release(lease_d);
        assert!(pool.is_empty());
    }

    #[test]
    fn every_reserved_slot_is_usable_and_no_more() {
        let pool = FixedPool::<usize>::builder()
            .initial_capacity(nz!(5))
            .build()
            .expect("system allocation succeeds");

        let mut leases = Vec::new();
        for value in 0..5 {
            leases.push(pool.acquire(value).expect("capacity is available"));
        }

        assert!(matches!(pool.acquire(99), Err(Error::CapacityExhausted)));

        // The failure left the pool fully usable.
        pool.release(leases.pop().expect("five leases were collected"));
        let lease = pool.acquire(99).expect("a released slot is available");
        assert_eq!(*lease, 99);
    }

    #[test]
    fn released_slot_is_reused_first_and_identically() {
        let pool = FixedPool::<u64>::builder()
            .initial_capacity(nz!(4))
            .build()
            .expect("system allocation succeeds");

        let first = pool.acquire(1).expect("capacity is available");
        let first_addr = first.ptr().as_ptr() as usize;
        pool.release(first);

        let second = pool.acquire(2).expect("a released slot is available");
        let second_addr = second.ptr().as_ptr() as usize;

        assert_eq!(first_addr, second_addr);
    }

    #[test]
    fn hint_less_acquisition_never_calls_backing() {
        let backing = CountingBacking::default();
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(1))
            .backing(backing.clone())
            .build()
            .expect("counting backing delegates to the system allocator");

        let _lease = pool.acquire(1).expect("capacity is available");
        assert!(matches!(pool.acquire(2), Err(Error::CapacityExhausted)));
        assert!(matches!(pool.acquire(3), Err(Error::CapacityExhausted)));

        assert_eq!(backing.allocation_count(), 1);
    }

    #[test]
    fn growth_banks_until_reserved_capacity_is_exhausted() {
        let backing = CountingBacking::default();
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .backing(backing.clone())
            .build()
            .expect("counting backing delegates to the system allocator");

        let _lease_a = pool.acquire(1).expect("capacity is available");

        pool.grow(nz!(3)).expect("growth is backed by the system allocator");
        assert_eq!(backing.allocation_count(), 2);
        assert_eq!(pool.capacity(), 5);

        // Drain the first arena, then cross into the banked one. No further
        // backing allocation may happen at any point.
        let _lease_b = pool.acquire(2).expect("capacity is available");
        let _lease_c = pool.acquire(3).expect("the banked arena is activated");
        let _lease_d = pool.acquire(4).expect("capacity is available");
        let _lease_e = pool.acquire(5).expect("capacity is available");

        assert_eq!(backing.allocation_count(), 2);
        assert!(matches!(pool.acquire(6), Err(Error::CapacityExhausted)));
    }

    #[test]
    fn acquire_or_grow_expands_by_exactly_the_requested_amount() {
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(1))
            .build()
            .expect("system allocation succeeds");

        let _first = pool.acquire(0).expect("capacity is available");

        let _grown = pool
            .acquire_or_grow(1, nz!(4))
            .expect("growth is backed by the system allocator");
        assert_eq!(pool.capacity(), 5);

        for value in 2..5 {
            drop(pool.acquire(value).expect("grown capacity is available"));
        }
        // Note: the three leases above were dropped without release, so their
        // slots stay consumed; only fresh cursor capacity was used.
        assert!(matches!(pool.acquire(5), Err(Error::CapacityExhausted)));
    }

    #[test]
    fn acquire_or_grow_uses_reserved_capacity_before_growing() {
        let backing = CountingBacking::default();
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .backing(backing.clone())
            .build()
            .expect("counting backing delegates to the system allocator");

        let _lease_a = pool.acquire_or_grow(1, nz!(8)).expect("capacity is available");
        let _lease_b = pool.acquire_or_grow(2, nz!(8)).expect("capacity is available");

        assert_eq!(backing.allocation_count(), 1);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn failed_growth_leaves_the_pool_unchanged() {
        let backing = CountingBacking::default();
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(1))
            .backing(backing.clone())
            .build()
            .expect("counting backing delegates to the system allocator");

        let _lease = pool.acquire(1).expect("capacity is available");

        backing.set_deny(true);
        let outcome = pool.acquire_or_grow(2, nz!(4));
        assert!(matches!(
            outcome,
            Err(Error::BackingAllocation { bytes }) if bytes == 4 * size_of::<u32>()
        ));
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.len(), 1);

        assert!(matches!(
            pool.grow(nz!(4)),
            Err(Error::BackingAllocation { .. })
        ));
        assert_eq!(pool.capacity(), 1);

        // Once the backing recovers, the same calls succeed.
        backing.set_deny(false);
        let _grown = pool
            .acquire_or_grow(2, nz!(4))
            .expect("the backing allocator recovered");
        assert_eq!(pool.capacity(), 5);
    }

    #[test]
    fn consumption_runs_through_every_grown_arena() {
        let pool = FixedPool::<usize>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        pool.grow(nz!(3)).expect("growth is backed by the system allocator");
        pool.grow(nz!(4)).expect("growth is backed by the system allocator");
        assert_eq!(pool.capacity(), 9);

        let mut leases = Vec::new();
        for value in 0..9 {
            leases.push(pool.acquire(value).expect("reserved capacity remains"));
        }
        assert!(matches!(pool.acquire(9), Err(Error::CapacityExhausted)));

        for (value, lease) in leases.iter().enumerate() {
            assert_eq!(**lease, value);
        }

        for lease in leases {
            pool.release(lease);
        }
        assert!(pool.is_empty());

        // All nine slots are reusable after release.
        let mut leases = Vec::new();
        for value in 0..9 {
            leases.push(pool.acquire(value).expect("released capacity remains"));
        }
        assert_eq!(pool.len(), 9);
    }

    #[test]
    fn destruction_returns_every_extent_with_its_exact_size() {
        let backing = CountingBacking::default();

        {
            let pool = FixedPool::<u64>::builder()
                .initial_capacity(nz!(4))
                .backing(backing.clone())
                .build()
                .expect("counting backing delegates to the system allocator");

            pool.grow(nz!(2)).expect("growth is backed by the system allocator");
            pool.grow(nz!(8)).expect("growth is backed by the system allocator");

            // Leave a mix of live, released, and untouched slots behind.
            let lease_a = pool.acquire(1).expect("capacity is available");
            let _lease_b = pool.acquire(2).expect("capacity is available");
            pool.release(lease_a);
        }

        // Two growth events: exactly three deallocations, sizes matching the
        // allocations one for one.
        assert_eq!(backing.allocation_count(), 3);
        assert_eq!(backing.free_count(), 3);

        let mut allocated = backing.allocated_sizes();
        let mut freed = backing.freed_sizes();
        allocated.sort_unstable();
        freed.sort_unstable();
        assert_eq!(allocated, freed);
        assert_eq!(
            allocated.iter().sum::<usize>(),
            (4 + 2 + 8) * size_of::<u64>()
        );
    }

    #[test]
    fn take_hands_the_payload_back() {
        let pool = FixedPool::<String>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        let lease = pool.acquire("payload".to_string()).expect("capacity is available");
        let value = pool.take(lease);

        assert_eq!(value, "payload");
        assert!(pool.is_empty());
    }

    #[test]
    fn release_drops_the_payload_exactly_once() {
        let pool = FixedPool::<DropTracker>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        let (tracker, drops) = DropTracker::new();
        let lease = pool.acquire(tracker).expect("capacity is available");
        assert_eq!(drops.get(), 0);

        pool.release(lease);
        assert_eq!(drops.get(), 1);

        drop(pool);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn abandoned_payloads_are_dropped_at_teardown() {
        let (tracker, drops) = DropTracker::new();

        {
            let pool = FixedPool::<DropTracker>::builder()
                .initial_capacity(nz!(2))
                .build()
                .expect("system allocation succeeds");

            let lease = pool.acquire(tracker).expect("capacity is available");
            std::mem::forget(lease);

            assert_eq!(drops.get(), 0);
        }

        assert_eq!(drops.get(), 1);
    }

    #[test]
    #[should_panic]
    fn must_not_drop_items_panics_on_live_payloads() {
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .drop_policy(DropPolicy::MustNotDropItems)
            .build()
            .expect("system allocation succeeds");

        let lease = pool.acquire(42).expect("capacity is available");
        std::mem::forget(lease);

        // Dropping the pool must panic because a payload is still live.
    }

    #[test]
    fn must_not_drop_items_accepts_an_empty_pool() {
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .drop_policy(DropPolicy::MustNotDropItems)
            .build()
            .expect("system allocation succeeds");

        let lease = pool.acquire(42).expect("capacity is available");
        pool.release(lease);
    }

    #[test]
    #[should_panic]
    fn releasing_to_a_different_pool_panics() {
        let pool_a = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");
        let pool_b = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        let lease = pool_a.acquire(42).expect("capacity is available");

        pool_b.release(lease);
    }

    #[test]
    fn free_slots_are_found_across_arena_boundaries() {
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        pool.grow(nz!(2)).expect("growth is backed by the system allocator");

        let lease_a = pool.acquire(1).expect("capacity is available");
        let a_addr = lease_a.ptr().as_ptr() as usize;
        let _lease_b = pool.acquire(2).expect("capacity is available");
        let _lease_c = pool.acquire(3).expect("the banked arena is activated");

        // Release a slot in the first, superseded arena while the second is
        // active; it must still be the next one handed out.
        pool.release(lease_a);

        let lease_d = pool.acquire(4).expect("a released slot is available");
        assert_eq!(lease_d.ptr().as_ptr() as usize, a_addr);
    }

    #[test]
    fn debug_output_reports_usage() {
        let pool = FixedPool::<u32>::builder()
            .initial_capacity(nz!(4))
            .build()
            .expect("system allocation succeeds");

        let _lease = pool.acquire(1).expect("capacity is available");

        let debug_output = format!("{pool:?}");
        assert!(debug_output.contains("FixedPool"));
        assert!(debug_output.contains("len: 1"));
        assert!(debug_output.contains("capacity: 4"));
    }

    #[test]
    #[should_panic]
    fn zero_sized_payload_panics() {
        drop(FixedPool::<()>::builder().initial_capacity(nz!(1)).build());
    }
}
