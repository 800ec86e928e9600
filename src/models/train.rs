use serde::{Deserialize, Serialize};

use crate::constants::kmh_to_ms;

/// Rolling stock characteristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainType {
    pub id: String,
    pub max_speed_kmh: f64,
    /// m/s²
    pub acceleration: f64,
    /// Service braking, m/s²
    pub deceleration: f64,
    /// m/s²
    pub emergency_deceleration: f64,
    #[serde(default = "default_unit_length")]
    pub unit_length_m: f64,
    #[serde(default = "default_seats")]
    pub seats_per_unit: u32,
}

fn default_unit_length() -> f64 {
    70.0
}

fn default_seats() -> u32 {
    200
}

impl TrainType {
    /// Operational maximum in m/s
    #[must_use]
    pub fn max_speed(&self) -> f64 {
        kmh_to_ms(self.max_speed_kmh)
    }

    #[must_use]
    pub fn capacity(&self, unit_count: u32) -> u32 {
        self.seats_per_unit.saturating_mul(unit_count)
    }

    /// Check the type can actually move and stop
    ///
    /// # Errors
    ///
    /// Returns a description of the first non-positive parameter
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("max speed", self.max_speed_kmh),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("emergency deceleration", self.emergency_deceleration),
            ("unit length", self.unit_length_m),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("Train type {} has invalid {name}: {value}", self.id));
            }
        }
        Ok(())
    }

    /// A regional EMU, the default catalogue entry
    #[must_use]
    pub fn regional_emu() -> Self {
        Self {
            id: "emu".to_string(),
            max_speed_kmh: 140.0,
            acceleration: 0.9,
            deceleration: 0.8,
            emergency_deceleration: 1.5,
            unit_length_m: 70.0,
            seats_per_unit: 200,
        }
    }
}

/// Operational state of a train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainState {
    /// Stock not yet in service
    Depot,
    /// At the origin waiting for the scheduled departure
    #[default]
    Preparing,
    Departing,
    Running,
    Approaching,
    AtStation,
    /// Idle at the terminus awaiting a new service
    Turnaround,
    Terminated,
}

impl TrainState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TrainState::Depot => "depot",
            TrainState::Preparing => "preparing",
            TrainState::Departing => "departing",
            TrainState::Running => "running",
            TrainState::Approaching => "approaching",
            TrainState::AtStation => "at_station",
            TrainState::Turnaround => "turnaround",
            TrainState::Terminated => "terminated",
        }
    }

    /// Whether the train is standing by plan rather than because it is held
    #[must_use]
    pub const fn is_stationary(self) -> bool {
        matches!(
            self,
            TrainState::Depot
                | TrainState::Preparing
                | TrainState::AtStation
                | TrainState::Turnaround
                | TrainState::Terminated
        )
    }
}

impl std::fmt::Display for TrainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
