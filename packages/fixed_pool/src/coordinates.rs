/// Internal coordinates locating one slot within the pool's arena collection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct SlotCoordinates {
    /// The index of the arena containing this slot.
    arena_index: usize,
    /// The index within the arena where this slot is stored.
    slot_index: usize,
}

impl SlotCoordinates {
    #[must_use]
    pub(crate) fn from_parts(arena_index: usize, slot_index: usize) -> Self {
        Self {
            arena_index,
            slot_index,
        }
    }

    /// Returns the index of the arena containing this slot.
    #[must_use]
    pub(crate) fn arena_index(&self) -> usize {
        self.arena_index
    }

    /// Returns the index within the arena where this slot is stored.
    #[must_use]
    pub(crate) fn slot_index(&self) -> usize {
        self.slot_index
    }
}
