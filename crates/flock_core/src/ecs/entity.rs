//! Entity handle with generational index
//!
//! Entities are lightweight 64-bit ids. The generation half changes every
//! time a slot is recycled, so an id stops resolving as soon as its entity
//! is destroyed, even after the slot is handed out again.

use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit generation | 32-bit slot + 1]
/// - Slot: position in the store's entity table, offset by one so that a
///   valid id is never zero
/// - Generation: incremented on entity destruction
///
/// The all-zero id is [`Entity::NONE`] and is never issued.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u64);

impl Entity {
    /// "No entity" sentinel.
    pub const NONE: Self = Self(0);

    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (slot as u64 + 1))
    }

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Table slot, or `None` for the sentinel.
    pub(crate) const fn slot(self) -> Option<u32> {
        let low = self.0 as u32;
        if low == 0 {
            None
        } else {
            Some(low - 1)
        }
    }

    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot() {
            Some(slot) => write!(f, "Entity({}v{})", slot, self.generation()),
            None => f.write_str("Entity(NONE)"),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
