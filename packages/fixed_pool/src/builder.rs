use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{
    BackingAllocator, DropPolicy, Error, FixedPool, LockPolicy, SingleThreaded, SystemBacking,
};

/// Builder for configuring and constructing a [`FixedPool`].
///
/// [`FixedPool`] requires the initial capacity to be specified at
/// construction time via [`initial_capacity()`](Self::initial_capacity); all
/// other settings are optional. Building performs the pool's single initial
/// backing allocation, so it is fallible.
///
/// # Examples
///
/// Using the defaults (process-global backing, single-threaded locking):
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
/// ```
///
/// Swapping in a mutual-exclusion lock policy for cross-thread use:
///
/// ```
/// use std::num::NonZero;
///
/// use fixed_pool::{FixedPool, ThreadSafe};
///
/// let pool = FixedPool::<u64>::builder()
///     .initial_capacity(NonZero::new(16).unwrap())
///     .lock(ThreadSafe::new())
///     .build()
///     .unwrap();
/// ```
#[must_use]
pub struct FixedPoolBuilder<T, B = SystemBacking, L = SingleThreaded> {
    initial_capacity: Option<NonZero<usize>>,
    backing: B,
    lock: L,
    drop_policy: DropPolicy,
    _payload: PhantomData<fn() -> T>,
}

impl<T> FixedPoolBuilder<T> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            initial_capacity: None,
            backing: SystemBacking,
            lock: SingleThreaded,
            drop_policy: DropPolicy::default(),
            _payload: PhantomData,
        }
    }
}

impl<T, B, L> FixedPoolBuilder<T, B, L>
where
    B: BackingAllocator,
    L: LockPolicy,
{
    /// Sets the slot count of the pool's first arena. Mandatory.
    #[inline]
    pub fn initial_capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Replaces the backing allocator the pool obtains its arenas from.
    ///
    /// Defaults to [`SystemBacking`], the process-global allocator.
    #[inline]
    pub fn backing<B2: BackingAllocator>(self, backing: B2) -> FixedPoolBuilder<T, B2, L> {
        FixedPoolBuilder {
            initial_capacity: self.initial_capacity,
            backing,
            lock: self.lock,
            drop_policy: self.drop_policy,
            _payload: PhantomData,
        }
    }

    /// Replaces the lock policy guarding the pool's shared state.
    ///
    /// Defaults to [`SingleThreaded`], the no-op policy; the resulting pool
    /// is then not [`Sync`]. Supply a [`MutualExclusion`][crate::MutualExclusion]
    /// policy such as [`ThreadSafe`][crate::ThreadSafe] to share the pool
    /// across threads.
    #[inline]
    pub fn lock<L2: LockPolicy>(self, lock: L2) -> FixedPoolBuilder<T, B, L2> {
        FixedPoolBuilder {
            initial_capacity: self.initial_capacity,
            backing: self.backing,
            lock,
            drop_policy: self.drop_policy,
            _payload: PhantomData,
        }
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to
    /// treat payloads still live when the pool is dropped.
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool, performing its single initial backing allocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackingAllocation`] when the backing allocator
    /// declines the initial arena; this is the only failure source.
    ///
    /// # Panics
    ///
    /// Panics if no initial capacity has been set, or if `T` is zero-sized.
    pub fn build(self) -> Result<FixedPool<T, B, L>, Error> {
        let capacity = self
            .initial_capacity
            .expect("initial capacity must be set using .initial_capacity() before calling .build()");

        FixedPool::new_inner(capacity, self.backing, self.lock, self.drop_policy)
    }
}

impl<T, B, L> fmt::Debug for FixedPoolBuilder<T, B, L>
where
    B: fmt::Debug,
    L: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPoolBuilder")
            .field("initial_capacity", &self.initial_capacity)
            .field("backing", &self.backing)
            .field("lock", &self.lock)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(FixedPoolBuilder<String>: Send, std::fmt::Debug);

    #[test]
    fn defaults_build_a_working_pool() {
        let pool = FixedPoolBuilder::<u32>::new()
            .initial_capacity(nz!(4))
            .build()
            .expect("system allocation succeeds");

        assert_eq!(pool.capacity(), 4);
        assert!(pool.is_empty());
    }

    #[test]
    fn drop_policy_can_be_overridden() {
        let builder = FixedPoolBuilder::<u32>::new()
            .drop_policy(DropPolicy::MustNotDropItems)
            .drop_policy(DropPolicy::MayDropItems);

        assert_eq!(builder.drop_policy, DropPolicy::MayDropItems);
    }

    #[test]
    fn capacity_can_be_overridden() {
        let builder = FixedPoolBuilder::<u32>::new()
            .initial_capacity(nz!(4))
            .initial_capacity(nz!(8));

        assert_eq!(builder.initial_capacity, Some(nz!(8)));
    }

    #[test]
    fn builder_is_debug() {
        let builder = FixedPoolBuilder::<u32>::new().initial_capacity(nz!(4));
        let debug_output = format!("{builder:?}");
        assert!(debug_output.contains("FixedPoolBuilder"));
    }

    #[test]
    #[should_panic]
    fn build_without_capacity_panics() {
        drop(FixedPoolBuilder::<u32>::new().build());
    }

    #[test]
    #[should_panic]
    fn zero_sized_payload_panics() {
        drop(FixedPoolBuilder::<()>::new().initial_capacity(nz!(4)).build());
    }
}
