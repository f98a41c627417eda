//! Per-system timing, per frame and accumulated

use crate::SystemTiming;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct SystemProfiler {
    timings: HashMap<String, SystemTiming>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-frame figures. Systems that do not run this frame keep
    /// a zero `last_frame`.
    pub fn begin_frame(&mut self) {
        for timing in self.timings.values_mut() {
            timing.last_frame = Duration::ZERO;
        }
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let timing = self.timings.entry(name.to_string()).or_default();
        timing.last_frame += elapsed;
        timing.total += elapsed;
        timing.frames += 1;
        result
    }

    pub fn get(&self, name: &str) -> Option<SystemTiming> {
        self.timings.get(name).copied()
    }

    /// Systems sorted by descending time in the last frame.
    pub fn slowest(&self, limit: usize) -> Vec<(&str, SystemTiming)> {
        let mut all: Vec<(&str, SystemTiming)> = self
            .timings
            .iter()
            .map(|(name, timing)| (name.as_str(), *timing))
            .collect();
        all.sort_by(|a, b| b.1.last_frame.cmp(&a.1.last_frame));
        all.truncate(limit);
        all
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_accumulate_and_reset_per_frame() {
        let mut profiler = SystemProfiler::new();
        profiler.begin_frame();
        let value = profiler.time_system("update", || {
            std::thread::sleep(Duration::from_millis(1));
            7
        });
        assert_eq!(value, 7);

        let first = profiler.get("update").unwrap();
        assert_eq!(first.frames, 1);
        assert!(first.last_frame >= Duration::from_millis(1));

        profiler.begin_frame();
        let second = profiler.get("update").unwrap();
        assert_eq!(second.last_frame, Duration::ZERO);
        assert_eq!(second.total, first.total);
    }

    #[test]
    fn slowest_orders_by_last_frame() {
        let mut profiler = SystemProfiler::new();
        profiler.time_system("fast", || {});
        profiler.time_system("slow", || std::thread::sleep(Duration::from_millis(2)));
        let top = profiler.slowest(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, "slow");
    }
}
