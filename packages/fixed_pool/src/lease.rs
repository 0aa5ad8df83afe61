use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::SlotCoordinates;

/// Exclusive handle to one acquired slot of a pool.
///
/// A lease is returned by every successful acquisition and is the only way
/// to reach the payload. It cannot be copied or cloned, so each slot has at
/// most one handle; releasing consumes the handle, which makes double
/// release and use-after-release unrepresentable rather than merely
/// undefined. The lifetime parameter ties the lease to its pool, so a lease
/// can never outlive the storage it points into.
///
/// The payload is reached through [`Deref`] and [`DerefMut`]; the holder has
/// exclusive access for the whole life of the lease. For interop with
/// foreign code, [`ptr()`](Lease::ptr) exposes the raw payload pointer.
///
/// Dropping a lease without returning it to the pool leaves the payload
/// live; it stays in place, inaccessible, until the pool itself is dropped.
/// Return leases with [`release`](crate::FixedPool::release) or
/// [`take`](crate::FixedPool::take) to make their slots reusable.
///
/// # Example
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
/// let mut lease = pool.acquire("Hello".to_string()).unwrap();
///
/// // Direct access through Deref and DerefMut.
/// assert_eq!(&*lease, "Hello");
/// lease.push_str(", World!");
/// assert_eq!(lease.len(), 13);
///
/// // Releasing consumes the handle, preventing reuse.
/// pool.release(lease);
/// ```
pub struct Lease<'pool, T> {
    /// Ensures this handle can only be returned to the pool it came from.
    pool_id: u64,

    coordinates: SlotCoordinates,

    ptr: NonNull<T>,

    /// Ties the handle to the pool so it cannot outlive the storage.
    _pool: PhantomData<&'pool ()>,
}

impl<T> Lease<'_, T> {
    #[must_use]
    pub(crate) fn new(pool_id: u64, coordinates: SlotCoordinates, ptr: NonNull<T>) -> Self {
        Self {
            pool_id,
            coordinates,
            ptr,
            _pool: PhantomData,
        }
    }

    /// Returns a pointer to the payload.
    ///
    /// The holder of the lease has exclusive access to the payload and may
    /// both read and write through the pointer from unsafe code, as long as
    /// no reference obtained through [`Deref`]/[`DerefMut`] is alive at the
    /// same time. The pointer stays valid until the lease is returned to the
    /// pool.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    #[must_use]
    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    #[must_use]
    pub(crate) fn coordinates(&self) -> SlotCoordinates {
        self.coordinates
    }
}

impl<T> Deref for Lease<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: The slot holds an initialized payload for the whole life of
        // the lease, and the lease is the only handle to it.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for Lease<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: As in deref; exclusivity follows from the lease being
        // borrowed exclusively here.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> fmt::Debug for Lease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("pool_id", &self.pool_id)
            .field("coordinates", &self.coordinates)
            .finish_non_exhaustive()
    }
}

// SAFETY: A lease is an exclusive handle to one payload; sending the lease
// is sending access to that payload, which is safe exactly when T is Send.
unsafe impl<T: Send> Send for Lease<'_, T> {}

// SAFETY: Sharing a lease only yields `&T` access to the payload.
unsafe impl<T: Sync> Sync for Lease<'_, T> {}

#[cfg(test)]
mod tests {
    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::FixedPool;

    assert_impl_all!(Lease<'static, u64>: Send, Sync, std::fmt::Debug);
    assert_not_impl_any!(Lease<'static, u64>: Clone, Copy);
    assert_not_impl_any!(Lease<'static, std::rc::Rc<u8>>: Send, Sync);

    #[test]
    fn deref_reaches_the_payload() {
        let pool = FixedPool::<u64>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        let mut lease = pool.acquire(42).expect("capacity is available");

        assert_eq!(*lease, 42);
        *lease += 1;
        assert_eq!(*lease, 43);

        pool.release(lease);
    }

    #[test]
    fn ptr_addresses_the_same_storage_as_deref() {
        let pool = FixedPool::<u64>::builder()
            .initial_capacity(nz!(2))
            .build()
            .expect("system allocation succeeds");

        let lease = pool.acquire(7).expect("capacity is available");

        let via_ptr = lease.ptr().as_ptr() as usize;
        let via_deref = std::ptr::from_ref(&*lease) as usize;
        assert_eq!(via_ptr, via_deref);

        pool.release(lease);
    }

    #[test]
    fn debug_output_does_not_require_debug_payload() {
        struct Opaque(#[expect(dead_code, reason = "only the layout matters")] u8);

        let pool = FixedPool::<Opaque>::builder()
            .initial_capacity(nz!(1))
            .build()
            .expect("system allocation succeeds");

        let lease = pool.acquire(Opaque(0)).expect("capacity is available");

        let debug_output = format!("{lease:?}");
        assert!(debug_output.contains("Lease"));

        pool.release(lease);
    }
}
