//! Helpers for sizing arenas against an external allocation granularity.
//!
//! Embeddings whose backing allocator works in fixed granules (typically
//! pages) waste the tail of any extent that is not an exact multiple of the
//! granule size. These helpers reconcile a requested slot count with the
//! nearest count whose arena allocation is an exact multiple of the
//! granularity, rounding down or up. They are free functions so capacities
//! can be sized before any pool exists.

use std::alloc::Layout;
use std::mem;
use std::num::NonZero;

/// Layout of the backing extent for a `capacity`-slot arena of `T`.
///
/// This is the single source of truth for arena sizing; the pool allocates
/// exactly this layout and replays it at deallocation.
///
/// # Panics
///
/// Panics if `T` is zero-sized or if the layout calculation overflows.
#[must_use]
pub(crate) fn slot_array_layout<T>(capacity: NonZero<usize>) -> Layout {
    assert!(
        mem::size_of::<T>() > 0,
        "fixed-size pools cannot hold zero-sized payloads"
    );

    Layout::array::<T>(capacity.get())
        .expect("arena size calculation cannot overflow for reasonable capacity values")
}

/// Exact byte size of the backing allocation for a `capacity`-slot arena of `T`.
///
/// # Panics
///
/// Panics if `T` is zero-sized or if the size calculation overflows.
#[must_use]
pub fn arena_bytes<T>(capacity: NonZero<usize>) -> usize {
    slot_array_layout::<T>(capacity).size()
}

/// Number of slots per exactly-filled granule multiple.
///
/// Slot counts that are multiples of this step, and only those, produce
/// arena sizes that are exact multiples of the granularity.
fn slots_per_granule<T>(granularity: NonZero<usize>) -> usize {
    assert!(
        granularity.get().is_power_of_two(),
        "allocation granularity must be a power of two, got {granularity}"
    );

    let stride = mem::size_of::<T>();
    assert!(
        stride > 0,
        "fixed-size pools cannot hold zero-sized payloads"
    );

    #[expect(
        clippy::integer_division,
        reason = "the gcd divides the granularity exactly"
    )]
    let step = granularity.get() / num_integer::gcd(stride, granularity.get());

    step
}

/// Largest slot count not exceeding `capacity` whose arena allocation size is
/// an exact multiple of `granularity`.
///
/// May return zero when no such count exists at or below `capacity`.
///
/// # Panics
///
/// Panics if `granularity` is not a power of two or if `T` is zero-sized.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use fixed_pool::{arena_bytes, capacity_align_down};
///
/// let granularity = NonZero::new(4096).unwrap();
/// let aligned = capacity_align_down::<u64>(1000, granularity);
///
/// assert!(aligned <= 1000);
/// assert_eq!(
///     arena_bytes::<u64>(NonZero::new(aligned).unwrap()) % 4096,
///     0
/// );
/// ```
#[must_use]
pub fn capacity_align_down<T>(capacity: usize, granularity: NonZero<usize>) -> usize {
    let step = slots_per_granule::<T>(granularity);

    #[expect(
        clippy::arithmetic_side_effects,
        reason = "step is at least one and the remainder never exceeds capacity"
    )]
    let aligned = capacity - capacity % step;

    aligned
}

/// Smallest slot count not below `capacity` whose arena allocation size is an
/// exact multiple of `granularity`.
///
/// # Panics
///
/// Panics if `granularity` is not a power of two, if `T` is zero-sized, or if
/// the aligned count does not fit in `usize`.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use fixed_pool::{arena_bytes, capacity_align_up};
///
/// let granularity = NonZero::new(4096).unwrap();
/// let aligned = capacity_align_up::<u64>(1000, granularity);
///
/// assert!(aligned >= 1000);
/// assert_eq!(
///     arena_bytes::<u64>(NonZero::new(aligned).unwrap()) % 4096,
///     0
/// );
/// ```
#[must_use]
pub fn capacity_align_up<T>(capacity: usize, granularity: NonZero<usize>) -> usize {
    let step = slots_per_granule::<T>(granularity);

    capacity
        .checked_next_multiple_of(step)
        .expect("aligned capacity exceeds the range of usize")
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    reason = "test code doesn't need the same overflow rigor as production code"
)]
mod tests {
    use new_zealand::nz;

    use super::*;

    // Odd stride, so slot counts and byte multiples interact non-trivially.
    #[repr(C)]
    #[allow(dead_code, reason = "used only as a layout specimen")]
    struct ThreeBytes([u8; 3]);

    fn assert_alignment_properties<T>(capacity: usize, granularity: NonZero<usize>) {
        let down = capacity_align_down::<T>(capacity, granularity);
        let up = capacity_align_up::<T>(capacity, granularity);
        let step = granularity.get() / num_integer::gcd(mem::size_of::<T>(), granularity.get());

        assert!(down <= capacity, "down {down} > requested {capacity}");
        assert!(up >= capacity, "up {up} < requested {capacity}");
        assert!(capacity - down < step, "down {down} not within one granule of {capacity}");
        assert!(up - capacity < step, "up {up} not within one granule of {capacity}");

        if let Some(down) = NonZero::new(down) {
            assert_eq!(arena_bytes::<T>(down) % granularity.get(), 0);
        }
        if let Some(up) = NonZero::new(up) {
            assert_eq!(arena_bytes::<T>(up) % granularity.get(), 0);
        }
    }

    #[test]
    fn arena_bytes_is_slot_count_times_stride() {
        assert_eq!(arena_bytes::<u64>(nz!(10)), 80);
        assert_eq!(arena_bytes::<ThreeBytes>(nz!(10)), 30);
    }

    #[test]
    fn aligned_counts_produce_exact_granule_multiples() {
        for granularity in [nz!(8), nz!(64), nz!(4096)] {
            for capacity in 0..200 {
                assert_alignment_properties::<u8>(capacity, granularity);
                assert_alignment_properties::<u32>(capacity, granularity);
                assert_alignment_properties::<u64>(capacity, granularity);
                assert_alignment_properties::<ThreeBytes>(capacity, granularity);
                assert_alignment_properties::<[u64; 7]>(capacity, granularity);
            }
        }
    }

    #[test]
    fn down_matches_exhaustive_search() {
        let granularity = nz!(64);

        for capacity in 1..100 {
            let expected = (0..=capacity)
                .rev()
                .find(|&count| {
                    count == 0 || (count * mem::size_of::<ThreeBytes>()) % granularity.get() == 0
                })
                .expect("zero always qualifies");

            assert_eq!(
                capacity_align_down::<ThreeBytes>(capacity, granularity),
                expected
            );
        }
    }

    #[test]
    fn already_aligned_counts_are_unchanged() {
        // 512 u64 slots are exactly one 4096-byte granule.
        assert_eq!(capacity_align_down::<u64>(512, nz!(4096)), 512);
        assert_eq!(capacity_align_up::<u64>(512, nz!(4096)), 512);
    }

    #[test]
    #[should_panic]
    fn non_power_of_two_granularity_panics() {
        _ = capacity_align_up::<u64>(16, nz!(24));
    }

    #[test]
    #[should_panic]
    fn zero_sized_payload_panics() {
        _ = arena_bytes::<()>(nz!(1));
    }
}
