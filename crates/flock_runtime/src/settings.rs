//! Runtime settings

use anyhow::{Context, Result};
use flock_core::EcsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the binary can be told from a settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ecs: EcsConfig,
    pub sim: SimSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub boids: usize,
    pub width: f32,
    pub height: f32,
    /// Frames to run before shutting down.
    pub frames: u64,
    pub seed: u64,
    /// Use this delta every frame instead of the wall clock.
    pub fixed_delta: Option<f32>,
    pub max_speed: f32,
    pub wall_margin: f32,
    pub neighbour_radius: f32,
    /// Frames between stats log lines. `0` disables them.
    pub log_interval: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            boids: 2_000,
            width: 1280.0,
            height: 720.0,
            frames: 600,
            seed: 0x5eed,
            fixed_delta: None,
            max_speed: 120.0,
            wall_margin: 40.0,
            neighbour_radius: 16.0,
            log_interval: 120,
        }
    }
}

impl Settings {
    /// Load from a JSON file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings in {}", path.display()))?;
        Ok(settings)
    }
}
