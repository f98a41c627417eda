//! Registry configuration

use crate::ecs::World;
use serde::{Deserialize, Serialize};

/// Tunables for an [`Ecs`](crate::Ecs) instance.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// { "max_entities": 4096, "min_chunk_len": 32 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Upper bound on live entities. `create_entity` returns `Entity::NONE` past it.
    pub max_entities: usize,
    /// Entity slots reserved up front.
    pub initial_entity_capacity: usize,
    /// Smallest number of entities worth handing to a worker.
    pub min_chunk_len: usize,
    /// Size of a dedicated worker pool. `None` shares rayon's global pool.
    pub worker_threads: Option<usize>,
}

impl EcsConfig {
    pub const DEFAULT_MAX_ENTITIES: usize = 1 << 20;
    pub const DEFAULT_MIN_CHUNK_LEN: usize = 64;
    /// Upper bound on the up-front reservation; storage past it grows on demand.
    pub const MAX_RESERVATION: usize = 1 << 20;

    /// Live-entity capacity after clamping to what an id can address.
    pub fn entity_limit(&self) -> usize {
        self.max_entities.min(World::MAX_SLOTS)
    }

    /// Slots worth reserving up front: the configured capacity, bounded by
    /// the entity limit and [`MAX_RESERVATION`](Self::MAX_RESERVATION).
    pub fn reserved_entities(&self) -> usize {
        self.initial_entity_capacity
            .min(self.entity_limit())
            .min(Self::MAX_RESERVATION)
    }

    /// Number of chunks a dispatch of `len` entities splits into, given the
    /// system's `max_threads` hint. A result of `1` means inline dispatch.
    pub fn chunk_count(&self, len: usize, max_threads: u32) -> usize {
        if max_threads == 0 || len == 0 {
            return 1;
        }
        let granularity = self.min_chunk_len.max(1);
        (len / granularity).clamp(1, max_threads as usize)
    }
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: Self::DEFAULT_MAX_ENTITIES,
            initial_entity_capacity: 1024,
            min_chunk_len: Self::DEFAULT_MIN_CHUNK_LEN,
            worker_threads: None,
        }
    }
}
