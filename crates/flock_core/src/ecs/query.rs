//! Component queries
//!
//! A query pairs a comparison mode with a component mask and decides which
//! entities a system sees.

use crate::ecs::ComponentMask;
use serde::{Deserialize, Serialize};

/// How a system's mask is compared against an entity's mask.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryComparison {
    /// Entity-independent pass: the system runs once per frame with no entities.
    #[default]
    None,
    /// At least one of the queried components is present.
    Any,
    /// Every queried component is present.
    All,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComponentQuery {
    pub comparison: QueryComparison,
    pub mask: ComponentMask,
}

impl ComponentQuery {
    pub const fn new(comparison: QueryComparison, mask: ComponentMask) -> Self {
        Self { comparison, mask }
    }

    /// Query for global passes that do not iterate entities.
    pub const fn none() -> Self {
        Self::new(QueryComparison::None, ComponentMask::NONE)
    }

    pub const fn any(mask: ComponentMask) -> Self {
        Self::new(QueryComparison::Any, mask)
    }

    pub const fn all(mask: ComponentMask) -> Self {
        Self::new(QueryComparison::All, mask)
    }

    /// Whether this query walks entities at all.
    #[inline]
    pub const fn is_global(&self) -> bool {
        matches!(self.comparison, QueryComparison::None)
    }

    /// Test an entity mask against the query. `None` never matches an
    /// entity; such systems are invoked without one.
    #[inline]
    pub const fn matches(&self, entity: ComponentMask) -> bool {
        match self.comparison {
            QueryComparison::None => false,
            QueryComparison::Any => entity.intersects(self.mask),
            QueryComparison::All => entity.contains(self.mask),
        }
    }

    /// The component whose pointers are handed to the system: the lowest
    /// queried bit.
    #[inline]
    pub const fn primary(&self) -> Option<ComponentMask> {
        if self.is_global() {
            return None;
        }
        match self.mask.lowest() {
            Some(index) => Some(ComponentMask::bit(index)),
            None => None,
        }
    }
}
