// component.rs - Component type registration
//
// Components are identified by a single bit in a 64-bit mask, not by Rust
// TypeIds. A type is described only by its stride, so any plain-data block
// can be registered.

use crate::ecs::EcsError;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of component types, one bit per registered type.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// No components. Also the ignored mask of `QueryComparison::None` systems.
    pub const NONE: Self = Self(0);
    /// Every bit set; matches any registered component in `Any` queries.
    pub const ALL: Self = Self(!0);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Mask with only bit `index` set.
    #[inline]
    pub const fn bit(index: u32) -> Self {
        Self(1 << index)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is also set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Index of the lowest set bit.
    #[inline]
    pub const fn lowest(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros())
        }
    }

    /// Iterate the indices of all set bits, lowest first.
    pub fn iter_bits(self) -> impl Iterator<Item = u32> {
        let mut remaining = self.0;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let index = remaining.trailing_zeros();
            remaining &= remaining - 1;
            Some(index)
        })
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ComponentMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for ComponentMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#018x})", self.0)
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Metadata recorded for one registered component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentType {
    pub bit: u32,
    pub stride: usize,
    pub name: String,
}

impl ComponentType {
    #[inline]
    pub fn mask(&self) -> ComponentMask {
        ComponentMask::bit(self.bit)
    }
}

/// Hands out mask bits in registration order and remembers each stride.
pub struct ComponentRegistry {
    types: Vec<ComponentType>,
}

impl ComponentRegistry {
    /// Width of the mask; there can never be more registered types than this.
    pub const MAX_TYPES: usize = u64::BITS as usize;
    /// Largest accepted stride, so slot offsets stay comfortably in range.
    pub const MAX_STRIDE: usize = 1 << 20;

    pub fn new() -> Self {
        Self {
            types: Vec::with_capacity(Self::MAX_TYPES),
        }
    }

    /// Claim the next free bit for a component of `stride` bytes.
    pub fn register(
        &mut self,
        stride: usize,
        name: impl Into<String>,
    ) -> Result<ComponentMask, EcsError> {
        if self.types.len() >= Self::MAX_TYPES {
            return Err(EcsError::ComponentTypesExhausted {
                limit: Self::MAX_TYPES,
            });
        }
        if stride > Self::MAX_STRIDE {
            return Err(EcsError::StrideTooLarge {
                stride,
                max: Self::MAX_STRIDE,
            });
        }

        let ty = ComponentType {
            bit: self.types.len() as u32,
            stride,
            name: name.into(),
        };
        tracing::debug!(bit = ty.bit, stride, name = %ty.name, "registered component type");
        let mask = ty.mask();
        self.types.push(ty);
        Ok(mask)
    }

    /// Look up a type by its (single) mask bit.
    pub fn get(&self, bit: ComponentMask) -> Option<&ComponentType> {
        if bit.count() != 1 {
            return None;
        }
        self.types.get(bit.lowest()? as usize)
    }

    #[inline]
    pub fn by_index(&self, index: u32) -> Option<&ComponentType> {
        self.types.get(index as usize)
    }

    /// Union of every registered bit.
    pub fn registered(&self) -> ComponentMask {
        match self.types.len() {
            Self::MAX_TYPES => ComponentMask::ALL,
            n => ComponentMask::from_bits((1u64 << n) - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.iter()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
