// context.rs - The owned registry: store, systems, scheduler and tasks

use crate::ecs::scheduler::Scheduler;
use crate::ecs::storage::ComponentPtr;
use crate::ecs::system_registry::SystemRegistry;
use crate::ecs::{
    ComponentMask, EcsError, Entity, SystemContext, SystemDescriptor, SystemHandle, TaskQueue,
    World,
};
use crate::EcsConfig;
use bytemuck::Pod;
use flock_metrics::{Counter, SystemProfiler};

/// One ECS registry with an explicit lifecycle.
///
/// ```ignore
/// let mut ecs = Ecs::init(EcsConfig::default())?;
/// let boid = ecs.register_component::<Boid>()?;
/// ecs.enable_system(SystemDescriptor::new("move").all(boid).order(100), |ctx| { /* ... */ })?;
/// let e = ecs.create_entity(boid);
/// ecs.run_systems(1.0 / 60.0);
/// ecs.terminate();
/// ```
pub struct Ecs {
    config: EcsConfig,
    world: World,
    systems: SystemRegistry,
    tasks: TaskQueue,
    scheduler: Scheduler,
    frame: u64,
}

impl Ecs {
    /// Allocate an empty registry.
    pub fn init(config: EcsConfig) -> Result<Self, EcsError> {
        let scheduler = Scheduler::new(&config)?;
        tracing::info!(
            max_entities = config.max_entities,
            min_chunk_len = config.min_chunk_len,
            worker_threads = ?config.worker_threads,
            "ecs initialized"
        );
        Ok(Self {
            world: World::new(&config),
            systems: SystemRegistry::new(),
            tasks: TaskQueue::new(),
            scheduler,
            config,
            frame: 0,
        })
    }

    /// Release every entity, component, system and pending task.
    pub fn terminate(mut self) {
        let pending = self.tasks.len();
        self.tasks.clear();
        self.systems.clear();
        self.world.clear();
        tracing::info!(frames = self.frame, dropped_tasks = pending, "ecs terminated");
    }

    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Frames completed by [`run_systems`](Self::run_systems) so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ------------------------------------------------------------------
    // Components and entities
    // ------------------------------------------------------------------

    pub fn register_component_type(&mut self, stride: usize) -> Result<ComponentMask, EcsError> {
        self.world.register_component_type(stride)
    }

    pub fn register_component<T: Pod>(&mut self) -> Result<ComponentMask, EcsError> {
        self.world.register_component::<T>()
    }

    pub fn create_entity(&mut self, mask: ComponentMask) -> Entity {
        self.world.create_entity(mask)
    }

    pub fn component_mask(&self, entity: Entity) -> ComponentMask {
        self.world.component_mask(entity)
    }

    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        self.world.destroy_entity(entity)
    }

    pub fn attach_components(&mut self, entity: Entity, mask: ComponentMask) -> bool {
        self.world.attach_components(entity, mask)
    }

    pub fn detach_components(&mut self, entity: Entity, mask: ComponentMask) -> bool {
        self.world.detach_components(entity, mask)
    }

    pub fn component_ptr(&self, entity: Entity, bit: ComponentMask) -> Option<ComponentPtr> {
        self.world.component_ptr(entity, bit)
    }

    pub fn read<T: Pod>(&self, entity: Entity, bit: ComponentMask) -> Option<T> {
        self.world.read(entity, bit)
    }

    pub fn write<T: Pod>(&self, entity: Entity, bit: ComponentMask, value: T) -> bool {
        self.world.write(entity, bit, value)
    }

    pub fn get_mut<T: Pod>(&mut self, entity: Entity, bit: ComponentMask) -> Option<&mut T> {
        self.world.get_mut(entity, bit)
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Register `callback` under `descriptor`'s name, or update the system
    /// already registered under that name.
    pub fn enable_system<F>(
        &mut self,
        descriptor: SystemDescriptor,
        callback: F,
    ) -> Result<SystemHandle, EcsError>
    where
        F: Fn(&mut SystemContext<'_>) + Send + Sync + 'static,
    {
        self.systems.enable(descriptor, Box::new(callback))
    }

    /// Remove a system. No-op (returns `false`) if it is not registered.
    pub fn disable_system(&mut self, handle: SystemHandle) -> bool {
        self.systems.disable(handle)
    }

    pub fn disable_system_by_name(&mut self, name: &str) -> bool {
        self.systems.disable_by_name(name)
    }

    /// Pause or resume a registered system.
    pub fn set_system_enabled(&mut self, handle: SystemHandle, enabled: bool) -> bool {
        self.systems.set_enabled(handle, enabled)
    }

    pub fn system_handle(&self, name: &str) -> Option<SystemHandle> {
        self.systems.handle_of(name)
    }

    pub fn system_descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems.descriptor(handle)
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Run one frame: every enabled system in order, then the task queue.
    pub fn run_systems(&mut self, delta_time: f32) {
        self.run_systems_only(delta_time);
        self.run_tasks();
        self.frame += 1;
    }

    /// Run every enabled system once without draining the task queue.
    pub fn run_systems_only(&mut self, delta_time: f32) {
        self.scheduler.run(
            &mut self.world,
            &self.systems,
            &self.tasks,
            &self.config,
            delta_time,
        );
    }

    /// Drain the deferred queue. Returns how many tasks ran.
    pub fn run_tasks(&mut self) -> usize {
        let count = self.tasks.run(&mut self.world);
        if count > 0 {
            tracing::trace!(count, "ran deferred tasks");
            self.scheduler.counters_mut().increment("tasks_run", count);
        }
        count
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Queue work for the next [`run_tasks`](Self::run_tasks).
    pub fn enqueue(&self, task: impl FnOnce(&mut World) + Send + 'static) {
        self.tasks.enqueue(task);
    }

    /// Per-system timings (empty unless the `metrics` feature is on).
    pub fn profiler(&self) -> &SystemProfiler {
        self.scheduler.profiler()
    }

    /// Dispatch counters (empty unless the `metrics` feature is on).
    pub fn counters(&self) -> &Counter {
        self.scheduler.counters()
    }
}
