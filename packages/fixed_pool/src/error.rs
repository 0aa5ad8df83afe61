use thiserror::Error;

/// Errors that can occur when creating, growing, or acquiring from a pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The backing allocator declined to provide an extent of the requested size.
    ///
    /// This is the only external failure source of the pool. It is surfaced
    /// as-is and never retried internally.
    #[error("backing allocator failed to provide {bytes} bytes")]
    BackingAllocation {
        /// Exact byte size that was requested from the backing allocator.
        bytes: usize,
    },

    /// An acquisition without a growth size found no free, banked, or
    /// untouched capacity to hand out.
    ///
    /// Acquisitions without a growth size never perform backing allocations,
    /// so this outcome leaves the pool byte-for-byte unchanged.
    #[error("pool capacity is exhausted and no growth was requested")]
    CapacityExhausted,
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn backing_allocation_reports_requested_bytes() {
        let error = Error::BackingAllocation { bytes: 4096 };

        assert!(error.to_string().contains("4096"));
    }

    #[test]
    fn capacity_exhausted_is_error() {
        let error = Error::CapacityExhausted;

        // Verify it is a valid Error that can be used in Result context.
        let result: Result<()> = Err(error);
        assert!(result.is_err());
    }
}
