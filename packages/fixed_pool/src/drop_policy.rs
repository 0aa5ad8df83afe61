/// Determines payload dropping behavior when the pool is dropped.
///
/// By default, the pool will drop any still-live payloads when it is dropped.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use fixed_pool::{DropPolicy, FixedPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = FixedPool::<u32>::builder()
///     .initial_capacity(NonZero::new(8).unwrap())
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool will drop its live payloads when the pool is dropped. This is
    /// the default.
    #[default]
    MayDropItems,

    /// The pool will panic if any payload is still live when it is dropped.
    ///
    /// This may be valuable if there are external requirements before the
    /// payloads can be dropped. For example, it may be known that unsafe code
    /// holds payload pointers obtained via [`Lease::ptr()`][crate::Lease::ptr],
    /// with leases only abandoned after such pointers are gone.
    MustNotDropItems,
}
