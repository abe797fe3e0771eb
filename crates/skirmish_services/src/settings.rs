//! Settings management
//!
//! Every section and field falls back to its default, so a settings file
//! only needs the values it changes.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use skirmish_battle::collision::SymmetricHitPolicy;
use skirmish_battle::singletons::{DamagePolicy, ModeKind};
use skirmish_battle::ArenaConfig;
use skirmish_core::time::TICK_RATE_HZ;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Kernel settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    pub simulation: SimulationSettings,
    pub collision: CollisionSettings,
    pub damage: DamagePolicy,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_rate_hz: u32,
    /// Ticks a headless run simulates before stopping.
    pub tick_budget: u64,
    pub mode: ModeKind,
    pub seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            tick_budget: 600,
            mode: ModeKind::default(),
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSettings {
    pub hit_buffer_capacity: usize,
    pub symmetric_hits: SymmetricHitPolicy,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            hit_buffer_capacity: 64,
            symmetric_hits: SymmetricHitPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl KernelSettings {
    pub fn arena_config(&self) -> ArenaConfig {
        ArenaConfig {
            tick_rate_hz: self.simulation.tick_rate_hz,
            hit_buffer_capacity: self.collision.hit_buffer_capacity,
            symmetric_hits: self.collision.symmetric_hits,
            damage: self.damage,
            mode: self.simulation.mode,
            seed: self.simulation.seed,
        }
    }
}

/// Read settings from `path`. A missing file yields the defaults; a file
/// that exists but does not parse is an error.
pub fn load_settings(path: impl AsRef<Path>) -> Result<KernelSettings, ServiceError> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            return Ok(KernelSettings::default());
        }
        Err(source) => {
            return Err(ServiceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings = serde_json::from_str(&text).map_err(|source| ServiceError::Settings {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}

pub fn save_settings(path: impl AsRef<Path>, settings: &KernelSettings) -> Result<(), ServiceError> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(settings).map_err(|source| ServiceError::Settings {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ServiceError::Write {
        path: path.to_path_buf(),
        source,
    })
}
