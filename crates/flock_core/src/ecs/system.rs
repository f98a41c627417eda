//! System callbacks and the context they receive.
//!
//! A system is any `Fn(&mut SystemContext<'_>) + Send + Sync`. The same
//! callback may be invoked several times per frame, once per chunk, from
//! different worker threads when its `max_threads` hint allows it.
//!
//! # Parallel dispatch contract
//!
//! Chunks of one dispatch get disjoint entity lists but share the whole
//! store. Reading a neighbour's component (an entity outside the chunk) is
//! allowed; if a sibling chunk is writing that same component at the time,
//! the read may return a stale or partially written value. A system that
//! both reads neighbours and mutates the component it reads must either run
//! with `max_threads = 0` or be split into a read-only system followed by a
//! separate writing system. The scheduler does not enforce this.

use crate::ecs::storage::ComponentPtr;
use crate::ecs::{ComponentMask, Entity, TaskQueue, World};
use bytemuck::Pod;

/// Boxed system callback as stored by the registry.
pub type SystemFn = dyn Fn(&mut SystemContext<'_>) + Send + Sync;

enum WorldAccess<'a> {
    Exclusive(&'a mut World),
    Shared(&'a World),
}

/// Everything one system invocation can see.
pub struct SystemContext<'a> {
    world: WorldAccess<'a>,
    entities: &'a [Entity],
    masks: &'a [ComponentMask],
    primary: &'a [Option<ComponentPtr>],
    tasks: &'a TaskQueue,
    delta_time: f32,
    chunk_index: usize,
    chunk_count: usize,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn inline(
        world: &'a mut World,
        entities: &'a [Entity],
        masks: &'a [ComponentMask],
        primary: &'a [Option<ComponentPtr>],
        tasks: &'a TaskQueue,
        delta_time: f32,
    ) -> Self {
        Self {
            world: WorldAccess::Exclusive(world),
            entities,
            masks,
            primary,
            tasks,
            delta_time,
            chunk_index: 0,
            chunk_count: 1,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn chunk(
        world: &'a World,
        entities: &'a [Entity],
        masks: &'a [ComponentMask],
        primary: &'a [Option<ComponentPtr>],
        tasks: &'a TaskQueue,
        delta_time: f32,
        chunk_index: usize,
        chunk_count: usize,
    ) -> Self {
        Self {
            world: WorldAccess::Shared(world),
            entities,
            masks,
            primary,
            tasks,
            delta_time,
            chunk_index,
            chunk_count,
        }
    }

    /// Entities handed to this invocation, in stable slot order.
    #[inline]
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    /// Component masks, parallel to [`entities`](Self::entities).
    #[inline]
    pub fn masks(&self) -> &'a [ComponentMask] {
        self.masks
    }

    /// Pointers to each entity's primary queried component (the lowest
    /// queried bit), parallel to [`entities`](Self::entities). `None` where
    /// the entity lacks it, which only happens for `Any` queries.
    #[inline]
    pub fn primary_ptrs(&self) -> &'a [Option<ComponentPtr>] {
        self.primary
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Seconds since the previous frame.
    #[inline]
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Position of this invocation among the chunks of the current dispatch.
    #[inline]
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Shared view of the store.
    pub fn world(&self) -> &World {
        match &self.world {
            WorldAccess::Exclusive(world) => &**world,
            WorldAccess::Shared(world) => *world,
        }
    }

    /// Exclusive view of the store. Only inline dispatches get one; chunks
    /// of a parallel dispatch must defer structural changes through
    /// [`tasks`](Self::tasks).
    ///
    /// Structural changes made here invalidate [`primary_ptrs`](Self::primary_ptrs).
    pub fn world_mut(&mut self) -> Option<&mut World> {
        match &mut self.world {
            WorldAccess::Exclusive(world) => Some(&mut **world),
            WorldAccess::Shared(_) => None,
        }
    }

    /// Deferred work queue, drained after the last system of the frame.
    #[inline]
    pub fn tasks(&self) -> &'a TaskQueue {
        self.tasks
    }

    /// Queue structural work for after the frame.
    pub fn defer(&self, task: impl FnOnce(&mut World) + Send + 'static) {
        self.tasks.enqueue(task);
    }

    /// Copy a component of any entity.
    pub fn read<T: Pod>(&self, entity: Entity, bit: ComponentMask) -> Option<T> {
        self.world().read(entity, bit)
    }

    /// Overwrite a component of any entity.
    pub fn write<T: Pod>(&self, entity: Entity, bit: ComponentMask, value: T) -> bool {
        self.world().write(entity, bit, value)
    }

    /// Read-modify-write a component of any entity.
    pub fn update<T: Pod>(&self, entity: Entity, bit: ComponentMask, f: impl FnOnce(&mut T)) -> bool {
        self.world().update(entity, bit, f)
    }
}
