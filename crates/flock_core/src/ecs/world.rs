// world.rs - Entity table and component columns

use crate::ecs::storage::{Column, ComponentPtr};
use crate::ecs::{ComponentMask, ComponentQuery, ComponentRegistry, EcsError, Entity};
use crate::EcsConfig;
use bytemuck::Pod;
use std::mem::size_of;

#[derive(Clone, Copy, Debug)]
struct EntitySlot {
    generation: u32,
    mask: ComponentMask,
    alive: bool,
}

/// Owns every entity and the storage of every component type.
///
/// Invalid ids (destroyed, never issued, or [`Entity::NONE`]) are handled
/// uniformly: lookups return `None` / [`ComponentMask::NONE`] and mutations
/// are skipped and report `false`.
pub struct World {
    registry: ComponentRegistry,
    columns: Vec<Column>,
    slots: Vec<EntitySlot>,
    free: Vec<u32>,
    live: usize,
    max_entities: usize,
}

impl World {
    /// Highest slot count an id can encode (slot + 1 must fit in 32 bits).
    pub const MAX_SLOTS: usize = u32::MAX as usize - 1;

    /// Create an empty world.
    pub fn new(config: &EcsConfig) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            columns: Vec::with_capacity(ComponentRegistry::MAX_TYPES),
            slots: Vec::with_capacity(config.reserved_entities()),
            free: Vec::new(),
            live: 0,
            max_entities: config.entity_limit(),
        }
    }

    // ------------------------------------------------------------------
    // Component types
    // ------------------------------------------------------------------

    /// Register a component type of `stride` bytes and return its mask bit.
    pub fn register_component_type(&mut self, stride: usize) -> Result<ComponentMask, EcsError> {
        let name = format!("component#{}", self.registry.len());
        self.register_named(stride, name)
    }

    /// Register `T` with `size_of::<T>()` as its stride.
    pub fn register_component<T: Pod>(&mut self) -> Result<ComponentMask, EcsError> {
        self.register_named(size_of::<T>(), std::any::type_name::<T>())
    }

    fn register_named(
        &mut self,
        stride: usize,
        name: impl Into<String>,
    ) -> Result<ComponentMask, EcsError> {
        let mask = self.registry.register(stride, name)?;
        self.columns.push(Column::new(stride));
        Ok(mask)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Allocate an entity carrying every registered component in `mask`.
    ///
    /// Returns [`Entity::NONE`] once `max_entities` are alive.
    pub fn create_entity(&mut self, mask: ComponentMask) -> Entity {
        if self.live >= self.max_entities {
            tracing::warn!(capacity = self.max_entities, "entity capacity exhausted");
            return Entity::NONE;
        }

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(EntitySlot {
                    generation: 0,
                    mask: ComponentMask::NONE,
                    alive: false,
                });
                slot
            }
        };

        let entry = &mut self.slots[slot as usize];
        entry.alive = true;
        entry.mask = ComponentMask::NONE;
        let entity = Entity::new(slot, entry.generation);
        self.live += 1;

        self.attach_to_slot(slot as usize, mask);
        entity
    }

    /// Whether `entity` refers to a live entity.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.resolve(entity).is_some()
    }

    /// Current mask of `entity`, or [`ComponentMask::NONE`] if it is not alive.
    pub fn component_mask(&self, entity: Entity) -> ComponentMask {
        self.resolve(entity)
            .map(|slot| self.slots[slot].mask)
            .unwrap_or(ComponentMask::NONE)
    }

    /// Release all storage of `entity` and invalidate its id.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.resolve(entity) else {
            tracing::debug!(%entity, "destroy of invalid entity ignored");
            return false;
        };

        let mask = self.slots[slot].mask;
        for bit in mask.iter_bits() {
            self.columns[bit as usize].clear_slot(slot);
        }

        let entry = &mut self.slots[slot];
        entry.mask = ComponentMask::NONE;
        entry.alive = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot as u32);
        self.live -= 1;
        true
    }

    /// Set the registered bits of `mask` on `entity`. Bits already present
    /// keep their data; newly set ones start zeroed.
    pub fn attach_components(&mut self, entity: Entity, mask: ComponentMask) -> bool {
        let Some(slot) = self.resolve(entity) else {
            tracing::debug!(%entity, %mask, "attach to invalid entity ignored");
            return false;
        };
        self.attach_to_slot(slot, mask);
        true
    }

    /// Clear the bits of `mask` on `entity`, releasing their storage.
    pub fn detach_components(&mut self, entity: Entity, mask: ComponentMask) -> bool {
        let Some(slot) = self.resolve(entity) else {
            tracing::debug!(%entity, %mask, "detach from invalid entity ignored");
            return false;
        };

        let removed = self.slots[slot].mask & mask;
        for bit in removed.iter_bits() {
            self.columns[bit as usize].clear_slot(slot);
        }
        self.slots[slot].mask &= !removed;
        true
    }

    fn attach_to_slot(&mut self, slot: usize, mask: ComponentMask) {
        let registered = self.registry.registered();
        if !registered.contains(mask) && mask != ComponentMask::ALL {
            tracing::debug!(%mask, %registered, "ignoring unregistered component bits");
        }

        let added = mask & registered & !self.slots[slot].mask;
        for bit in added.iter_bits() {
            self.columns[bit as usize].init_slot(slot);
        }
        self.slots[slot].mask |= added;
    }

    /// Slot index of a live entity.
    #[inline]
    fn resolve(&self, entity: Entity) -> Option<usize> {
        let slot = entity.slot()? as usize;
        let entry = self.slots.get(slot)?;
        (entry.alive && entry.generation == entity.generation()).then_some(slot)
    }

    /// Slot and column of a component present on a live entity.
    #[inline]
    fn locate(&self, entity: Entity, bit: ComponentMask) -> Option<(usize, &Column)> {
        let slot = self.resolve(entity)?;
        if bit.count() != 1 || !self.slots[slot].mask.contains(bit) {
            return None;
        }
        let column = self.columns.get(bit.lowest()? as usize)?;
        Some((slot, column))
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    /// Raw address of one component of `entity`.
    ///
    /// `None` if the entity is not alive, `bit` is not a single registered
    /// bit, or the entity does not carry it.
    pub fn component_ptr(&self, entity: Entity, bit: ComponentMask) -> Option<ComponentPtr> {
        let (slot, column) = self.locate(entity, bit)?;
        column.ptr(slot)
    }

    /// Copy a component out. `T` must fit in the registered stride.
    pub fn read<T: Pod>(&self, entity: Entity, bit: ComponentMask) -> Option<T> {
        let (slot, column) = self.locate(entity, bit)?;
        column.read(slot)
    }

    /// Overwrite a component in place. Safe to call through a shared borrow,
    /// including from concurrent chunks of the same dispatch.
    pub fn write<T: Pod>(&self, entity: Entity, bit: ComponentMask, value: T) -> bool {
        match self.locate(entity, bit) {
            Some((slot, column)) => column.write(slot, &value),
            None => false,
        }
    }

    /// Read-modify-write a component. Returns `false` on a lookup miss.
    pub fn update<T: Pod>(&self, entity: Entity, bit: ComponentMask, f: impl FnOnce(&mut T)) -> bool {
        match self.read::<T>(entity, bit) {
            Some(mut value) => {
                f(&mut value);
                self.write(entity, bit, value)
            }
            None => false,
        }
    }

    /// Exclusive typed access to a component.
    pub fn get_mut<T: Pod>(&mut self, entity: Entity, bit: ComponentMask) -> Option<&mut T> {
        let (slot, _) = self.locate(entity, bit)?;
        self.columns[bit.lowest()? as usize].get_mut(slot)
    }

    /// Exclusive byte view of a component, exactly `stride` bytes long.
    pub fn component_bytes_mut(&mut self, entity: Entity, bit: ComponentMask) -> Option<&mut [u8]> {
        let (slot, _) = self.locate(entity, bit)?;
        self.columns[bit.lowest()? as usize].bytes_mut(slot)
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.live
    }

    /// Live entities with their masks, in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, ComponentMask)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.alive)
            .map(|(slot, entry)| (Entity::new(slot as u32, entry.generation), entry.mask))
    }

    /// Append every live entity matching `query` (and its mask) to the
    /// output buffers, in ascending slot order.
    pub fn collect_matching(
        &self,
        query: &ComponentQuery,
        entities: &mut Vec<Entity>,
        masks: &mut Vec<ComponentMask>,
    ) {
        for (entity, mask) in self.iter() {
            if query.matches(mask) {
                entities.push(entity);
                masks.push(mask);
            }
        }
    }

    /// Destroy every entity and drop all component storage. Registered types
    /// survive.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&EcsConfig::default())
    }
}
