//! Frame timing
//!
//! Measures wall-clock delta time between frames for the scheduler and
//! keeps running totals.

use std::time::{Duration, Instant};

/// Upper bound on a single frame's delta so a stall (debugger, window drag)
/// does not explode the simulation.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Wall-clock frame tracker.
pub struct FrameClock {
    frame_start: Instant,
    frame_count: u64,
    elapsed: Duration,
}

impl FrameClock {
    /// Start the clock now, so the first [`tick`](Self::tick) already sees
    /// time passed.
    pub fn new() -> Self {
        Self {
            frame_start: Instant::now(),
            frame_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Begin a new frame and return the seconds since the previous one.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.frame_start).min(MAX_FRAME_DELTA);
        self.frame_start = now;
        self.frame_count += 1;
        self.elapsed += delta;
        delta.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of all (clamped) frame deltas.
    pub fn total_time(&self) -> Duration {
        self.elapsed
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
