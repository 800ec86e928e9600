//! Simulation tuning loaded from JSON. Every field is optional in the file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    DEFAULT_APPROACH_MARGIN_M, DEFAULT_MIN_DWELL_S, DEFAULT_MIN_LOOKAHEAD_M,
    DEFAULT_RELEASE_MARGIN_M, DEFAULT_SPAWN_GRACE_MIN, DEFAULT_SPAWN_LOOKAHEAD_MIN,
    DEFAULT_STATION_STOP_TOLERANCE_M, DEFAULT_TURNAROUND_IDLE_LIMIT_MIN, DEFAULT_YIELD_COOLDOWN_S,
};
use crate::models::network::RailwayMode;
use crate::models::TrainType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Railway mode routes prefer
    #[serde(default)]
    pub primary_mode: RailwayMode,
    /// Extra distance beyond braking distance at which a stop target is approached
    #[serde(default = "default_approach_margin")]
    pub approach_margin_m: f64,
    /// Reservations always extend at least this far ahead of a moving train
    #[serde(default = "default_min_lookahead")]
    pub min_lookahead_m: f64,
    /// Distance behind the train after which passed blocks are released
    #[serde(default = "default_release_margin")]
    pub release_margin_m: f64,
    #[serde(default = "default_stop_tolerance")]
    pub station_stop_tolerance_m: f64,
    #[serde(default = "default_yield_cooldown")]
    pub yield_cooldown_s: f64,
    #[serde(default = "default_min_dwell")]
    pub min_dwell_s: f64,
    /// Spawn entries departing within this many minutes
    #[serde(default = "default_spawn_lookahead")]
    pub spawn_lookahead_min: u32,
    /// Entries whose departure passed longer ago than this are skipped
    #[serde(default = "default_spawn_grace")]
    pub spawn_grace_min: u32,
    /// Keep trains at the terminus for reuse by the next departure
    #[serde(default = "default_service_chaining")]
    pub service_chaining: bool,
    #[serde(default = "default_turnaround_idle_limit")]
    pub turnaround_idle_limit_min: u32,
    #[serde(default)]
    pub passenger_seed: u64,
    #[serde(default = "default_train_types")]
    pub train_types: Vec<TrainType>,
}

fn default_approach_margin() -> f64 {
    DEFAULT_APPROACH_MARGIN_M
}

fn default_min_lookahead() -> f64 {
    DEFAULT_MIN_LOOKAHEAD_M
}

fn default_release_margin() -> f64 {
    DEFAULT_RELEASE_MARGIN_M
}

fn default_stop_tolerance() -> f64 {
    DEFAULT_STATION_STOP_TOLERANCE_M
}

fn default_yield_cooldown() -> f64 {
    DEFAULT_YIELD_COOLDOWN_S
}

fn default_min_dwell() -> f64 {
    DEFAULT_MIN_DWELL_S
}

fn default_spawn_lookahead() -> u32 {
    DEFAULT_SPAWN_LOOKAHEAD_MIN
}

fn default_spawn_grace() -> u32 {
    DEFAULT_SPAWN_GRACE_MIN
}

fn default_service_chaining() -> bool {
    true
}

fn default_turnaround_idle_limit() -> u32 {
    DEFAULT_TURNAROUND_IDLE_LIMIT_MIN
}

fn default_train_types() -> Vec<TrainType> {
    vec![TrainType::regional_emu()]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            primary_mode: RailwayMode::default(),
            approach_margin_m: default_approach_margin(),
            min_lookahead_m: default_min_lookahead(),
            release_margin_m: default_release_margin(),
            station_stop_tolerance_m: default_stop_tolerance(),
            yield_cooldown_s: default_yield_cooldown(),
            min_dwell_s: default_min_dwell(),
            spawn_lookahead_min: default_spawn_lookahead(),
            spawn_grace_min: default_spawn_grace(),
            service_chaining: default_service_chaining(),
            turnaround_idle_limit_min: default_turnaround_idle_limit(),
            passenger_seed: 0,
            train_types: default_train_types(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a configuration document
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or invalid values
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse simulation config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&contents)
    }

    /// # Errors
    ///
    /// Returns an error on negative distances or an invalid train type
    pub fn validate(&self) -> Result<()> {
        let distances = [
            ("approach_margin_m", self.approach_margin_m),
            ("min_lookahead_m", self.min_lookahead_m),
            ("release_margin_m", self.release_margin_m),
            ("station_stop_tolerance_m", self.station_stop_tolerance_m),
            ("yield_cooldown_s", self.yield_cooldown_s),
            ("min_dwell_s", self.min_dwell_s),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                bail!("Config value {name} must be a non-negative number, got {value}");
            }
        }
        if self.station_stop_tolerance_m <= 0.0 {
            bail!("Config value station_stop_tolerance_m must be positive");
        }
        for train_type in &self.train_types {
            if let Err(message) = train_type.validate() {
                bail!(message);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn train_type(&self, id: &str) -> Option<&TrainType> {
        self.train_types.iter().find(|t| t.id == id)
    }
}
