//! Flock Core
//!
//! Contains the fundamental simulation pieces:
//! - Entity Component System (ECS) with a 64-bit component mask
//! - Ordered system scheduler with per-system worker fan-out
//! - Deferred task queue drained after each frame
//! - Frame clock and deterministic math

pub mod config;
pub mod ecs;
pub mod math;
pub mod time;

pub use config::EcsConfig;
pub use ecs::Ecs;
pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
