//! Flock Runtime
//!
//! Headless binary: boots the ECS, sets up the boid arena and runs a fixed
//! number of frames.
//!
//! ```text
//! flock [settings.json]
//! ```

mod settings;
mod sim;

use anyhow::{Context, Result};
use flock_core::ecs::{Ecs, SystemDescriptor};
use flock_core::time::FrameClock;
use flock_metrics::FrameTimer;
use settings::Settings;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Flock v{}", flock_core::VERSION);

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(path.as_deref())?;

    let mut ecs = Ecs::init(settings.ecs.clone()).context("failed to initialise ECS")?;
    ecs.enable_system(SystemDescriptor::new("frame begin").order(-100), |ctx| {
        tracing::trace!(dt = ctx.delta_time(), "frame begin");
    })?;

    let sim = sim::init(&mut ecs, &settings.sim)?;
    ecs.run_tasks();
    tracing::info!(
        entities = ecs.world().entity_count(),
        systems = ecs.system_count(),
        boid = %sim.boid,
        crowding = %sim.crowding,
        "simulation ready"
    );

    let mut clock = FrameClock::new();
    let mut timer = FrameTimer::new(120);
    let interval = settings.sim.log_interval;

    for frame in 1..=settings.sim.frames {
        let wall_delta = clock.tick();
        let delta_time = settings.sim.fixed_delta.unwrap_or(wall_delta);

        timer.begin();
        ecs.run_systems(delta_time);
        timer.end();

        if interval > 0 && frame % interval == 0 {
            let (min_ms, max_ms) = timer.frame_time_range_ms();
            tracing::info!(
                frame,
                fps = timer.fps(),
                frame_ms = timer.frame_time_ms(),
                last_ms = timer.last_frame_ms(),
                min_ms,
                max_ms,
                entities = ecs.world().entity_count(),
                culled = sim.stats.culled.load(Ordering::Relaxed),
                "frame stats"
            );
            for (name, timing) in ecs.profiler().slowest(3) {
                tracing::debug!(
                    system = name,
                    last_frame_us = timing.last_frame.as_micros() as u64,
                    "system timing"
                );
            }
        }
    }

    for (name, value) in ecs.counters().iter() {
        tracing::info!(counter = name, value, "dispatch counter");
    }
    tracing::info!(
        frames = clock.frame_count(),
        simulated_secs = clock.total_time().as_secs_f64(),
        "shutting down"
    );
    ecs.terminate();
    Ok(())
}
