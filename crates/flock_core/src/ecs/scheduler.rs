//! Frame scheduler
//!
//! Walks the registry in execution order. For each enabled system it
//! resolves the matching entities, then either calls the system once on the
//! scheduling thread or fans the match list out as contiguous chunks over the
//! worker pool and waits for every chunk before moving on. Two different
//! systems never overlap.

use crate::ecs::storage::ComponentPtr;
use crate::ecs::system_registry::{RegisteredSystem, SystemRegistry};
use crate::ecs::{ComponentMask, EcsError, Entity, SystemContext, TaskQueue, World};
use crate::EcsConfig;
use flock_metrics::{Counter, SystemProfiler};
use rayon::prelude::*;
use std::ops::Range;

/// Split `len` items into `chunks` contiguous, non-empty ranges whose sizes
/// differ by at most one. `chunks` is clamped to `1..=len`.
pub fn partition(len: usize, chunks: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let chunks = chunks.clamp(1, len);
    let base = len / chunks;
    let extra = len % chunks;

    let mut ranges = Vec::with_capacity(chunks);
    let mut start = 0;
    for index in 0..chunks {
        let size = base + usize::from(index < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Per-frame dispatch state. Match buffers are reused across systems and
/// frames.
pub(crate) struct Scheduler {
    entities: Vec<Entity>,
    masks: Vec<ComponentMask>,
    primary: Vec<Option<ComponentPtr>>,
    pool: Option<rayon::ThreadPool>,
    profiler: SystemProfiler,
    counters: Counter,
}

impl Scheduler {
    pub fn new(config: &EcsConfig) -> Result<Self, EcsError> {
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("flock-worker-{index}"))
                    .build()?,
            ),
            None => None,
        };

        Ok(Self {
            entities: Vec::with_capacity(config.reserved_entities()),
            masks: Vec::with_capacity(config.reserved_entities()),
            primary: Vec::with_capacity(config.reserved_entities()),
            pool,
            profiler: SystemProfiler::new(),
            counters: Counter::new(),
        })
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut Counter {
        &mut self.counters
    }

    /// Run every enabled system once, in order. Only systems that are
    /// actually called are timed and counted.
    pub fn run(
        &mut self,
        world: &mut World,
        systems: &SystemRegistry,
        tasks: &TaskQueue,
        config: &EcsConfig,
        delta_time: f32,
    ) {
        self.profiler.begin_frame();
        for system in systems.iter().filter(|s| s.enabled) {
            let name = system.descriptor.name();
            let _span = tracing::trace_span!("system", system = name).entered();

            if !self.collect(system, world) {
                tracing::trace!("no matching entities");
                continue;
            }

            let mut profiler = std::mem::take(&mut self.profiler);
            let invocations = profiler.time_system(name, || {
                self.dispatch(system, world, tasks, config, delta_time)
            });
            self.profiler = profiler;
            self.counters.increment("system_invocations", invocations);
        }
    }

    /// Fill the match buffers for `system`. Returns `false` when the system
    /// has nothing to run on this frame.
    fn collect(&mut self, system: &RegisteredSystem, world: &World) -> bool {
        self.entities.clear();
        self.masks.clear();
        self.primary.clear();

        let query = system.descriptor.component_query();
        if query.is_global() {
            return true;
        }

        world.collect_matching(query, &mut self.entities, &mut self.masks);
        if self.entities.is_empty() {
            return false;
        }

        match query.primary() {
            Some(bit) => self.primary.extend(
                self.entities
                    .iter()
                    .map(|&entity| world.component_ptr(entity, bit)),
            ),
            None => self.primary.resize(self.entities.len(), None),
        }
        true
    }

    /// Invoke `system` over the collected matches and return how many times
    /// its callback ran.
    fn dispatch(
        &mut self,
        system: &RegisteredSystem,
        world: &mut World,
        tasks: &TaskQueue,
        config: &EcsConfig,
        delta_time: f32,
    ) -> usize {
        let chunks = config.chunk_count(self.entities.len(), system.descriptor.thread_limit());
        tracing::trace!(matched = self.entities.len(), chunks, "dispatching");

        if chunks <= 1 {
            let mut ctx = SystemContext::inline(
                world,
                &self.entities,
                &self.masks,
                &self.primary,
                tasks,
                delta_time,
            );
            (system.callback)(&mut ctx);
            return 1;
        }

        self.counters.increment("chunks_dispatched", chunks);
        let world: &World = world;
        let ranges = partition(self.entities.len(), chunks);
        let (entities, masks, primary) = (&self.entities, &self.masks, &self.primary);
        let callback = &system.callback;
        let run_chunks = || {
            ranges
                .into_par_iter()
                .enumerate()
                .for_each(|(index, range)| {
                    let mut ctx = SystemContext::chunk(
                        world,
                        &entities[range.clone()],
                        &masks[range.clone()],
                        &primary[range],
                        tasks,
                        delta_time,
                        index,
                        chunks,
                    );
                    callback(&mut ctx);
                });
        };

        // `for_each` returns only once every chunk has finished
        match &self.pool {
            Some(pool) => pool.install(run_chunks),
            None => run_chunks(),
        }
        chunks
    }
}
