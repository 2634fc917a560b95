//! The application identity stamped on each cache block at insertion.

use crate::error::ReplacementError;

/// One of the two applications sharing the cache.
///
/// Modeled as an enum rather than a raw `u8` so the "any other value signals
/// a caller bug" case from the original is unrepresentable everywhere except
/// the boundary where a raw `core_id` first enters the crate (see
/// [`Owner::from_core_id`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Application running on core 0.
    Core0,
    /// Application running on core 1.
    Core1,
}

impl Owner {
    /// Parses a raw core id supplied by the surrounding simulator.
    ///
    /// # Errors
    /// Returns [`ReplacementError::InvalidOwner`] if `raw` is not 0 or 1.
    pub fn from_core_id(raw: u8, set_id: u64) -> Result<Self, ReplacementError> {
        match raw {
            0 => Ok(Owner::Core0),
            1 => Ok(Owner::Core1),
            _ => Err(ReplacementError::InvalidOwner { set_id, raw }),
        }
    }

    /// The array index this owner occupies in per-owner state (`0` or `1`).
    pub fn index(self) -> usize {
        match self {
            Owner::Core0 => 0,
            Owner::Core1 => 1,
        }
    }

    /// The other owner sharing the set.
    pub fn other(self) -> Owner {
        match self {
            Owner::Core0 => Owner::Core1,
            Owner::Core1 => Owner::Core0,
        }
    }
}

impl From<Owner> for u8 {
    fn from(owner: Owner) -> u8 {
        owner.index() as u8
    }
}
