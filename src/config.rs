// config.rs
use crate::global_variables::{PARKING_CAPACITY, PARKING_QUEUE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timings (milliseconds) and sizes for one simulation run.
///
/// Every field has a default matching the reference behaviour, so a TOML file
/// only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub parking_capacity: usize,
    pub parking_queue_size: usize,
    pub movement_tick_ms: u64,
    pub gate_poll_ms: u64,
    pub parking_dwell_ms: u64,
    pub red_dwell_ms: u64,
    pub green_dwell_ms: u64,
    pub emergency_dwell_ms: u64,
    /// Granularity at which dwell loops poll commands and coordination signals.
    pub dwell_sub_interval_ms: u64,
    pub commuter_pause_ms: u64,
    pub parking_burst_spacing_ms: u64,
    pub gridlock_spacing_ms: u64,
    pub spawn_initial_traffic: bool,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parking_capacity: PARKING_CAPACITY,
            parking_queue_size: PARKING_QUEUE_SIZE,
            movement_tick_ms: 50,
            gate_poll_ms: 100,
            parking_dwell_ms: 12_000,
            red_dwell_ms: 3_000,
            green_dwell_ms: 3_000,
            emergency_dwell_ms: 5_000,
            dwell_sub_interval_ms: 500,
            commuter_pause_ms: 500,
            parking_burst_spacing_ms: 200,
            gridlock_spacing_ms: 100,
            spawn_initial_traffic: true,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parking_capacity == 0 {
            return Err(ConfigError::Invalid("parking_capacity must be > 0".into()));
        }
        if self.parking_queue_size == 0 {
            return Err(ConfigError::Invalid("parking_queue_size must be > 0".into()));
        }
        if self.movement_tick_ms == 0 {
            return Err(ConfigError::Invalid("movement_tick_ms must be > 0".into()));
        }
        if self.dwell_sub_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dwell_sub_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Vehicles in a PARKING_FULL burst: one more than spots plus queue slots.
    pub fn parking_burst_size(&self) -> usize {
        self.parking_capacity + self.parking_queue_size + 1
    }

    pub fn movement_tick(&self) -> Duration {
        Duration::from_millis(self.movement_tick_ms)
    }

    pub fn gate_poll(&self) -> Duration {
        Duration::from_millis(self.gate_poll_ms)
    }

    pub fn parking_dwell(&self) -> Duration {
        Duration::from_millis(self.parking_dwell_ms)
    }

    pub fn commuter_pause(&self) -> Duration {
        Duration::from_millis(self.commuter_pause_ms)
    }

    pub fn sub_interval(&self) -> Duration {
        Duration::from_millis(self.dwell_sub_interval_ms)
    }

    /// Number of sub-intervals covering `dwell_ms`, rounded up.
    pub fn sub_intervals_for(&self, dwell_ms: u64) -> u64 {
        dwell_ms.div_ceil(self.dwell_sub_interval_ms)
    }
}
