//! Tuning constants shared by the graph, reservation, movement and timetable
//! layers. Values that operators are expected to change live in
//! [`crate::config::SimulationConfig`]; these are its defaults and the fixed
//! weights of the routing cost model.

/// Speed assumed for edges whose source data carries no maxspeed tag
pub const DEFAULT_LINE_SPEED_KMH: f64 = 80.0;

/// Mean earth radius used for great-circle distances
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// Routing cost model. Penalties are added to the physical length in metres.

/// Synthetic connector edges only exist to attach off-topology stop nodes
pub const CONNECTOR_PENALTY: f64 = 5_000.0;
/// Edge belongs to a different railway mode (tram, subway, ...) than the primary one
pub const NON_PRIMARY_MODE_PENALTY: f64 = 20_000.0;
/// Siding, yard, spur or non-main usage
pub const NON_MAIN_USAGE_PENALTY: f64 = 1_500.0;
/// Travelling against the direction implied by signal tagging
pub const SIGNAL_DIRECTION_PENALTY: f64 = 8_000.0;
/// Switch-to-switch edge shorter than `CROSSOVER_SHORT_M`
pub const CROSSOVER_PENALTY_LARGE: f64 = 600.0;
/// Switch-to-switch edge shorter than `CROSSOVER_MEDIUM_M`
pub const CROSSOVER_PENALTY_MEDIUM: f64 = 250.0;
/// Any other switch-to-switch edge
pub const CROSSOVER_PENALTY_SMALL: f64 = 80.0;
pub const CROSSOVER_SHORT_M: f64 = 250.0;
pub const CROSSOVER_MEDIUM_M: f64 = 900.0;
/// Minimum degree for an endpoint to count as a switch in the crossover heuristic
pub const CROSSOVER_MIN_DEGREE: usize = 3;

/// Upper bound on platform candidates considered per planned stop
pub const MAX_STOP_CANDIDATES: usize = 8;

// Movement defaults

pub const DEFAULT_APPROACH_MARGIN_M: f64 = 50.0;
pub const DEFAULT_MIN_LOOKAHEAD_M: f64 = 200.0;
pub const DEFAULT_RELEASE_MARGIN_M: f64 = 10.0;
pub const DEFAULT_STATION_STOP_TOLERANCE_M: f64 = 2.0;
pub const DEFAULT_YIELD_COOLDOWN_S: f64 = 30.0;
pub const DEFAULT_MIN_DWELL_S: f64 = 20.0;
/// Speeds below this are treated as standing still (m/s)
pub const STANDSTILL_SPEED: f64 = 0.1;
/// Speed used to creep up to a stopping point after braking short of it (m/s)
pub const CREEP_SPEED: f64 = 1.0;

// Timetable defaults

pub const DEFAULT_SPAWN_LOOKAHEAD_MIN: u32 = 1;
pub const DEFAULT_SPAWN_GRACE_MIN: u32 = 5;
pub const DEFAULT_TURNAROUND_IDLE_LIMIT_MIN: u32 = 90;
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Conversion factor between km/h and m/s
pub const KMH_PER_MS: f64 = 3.6;

#[must_use]
pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / KMH_PER_MS
}

#[must_use]
pub fn ms_to_kmh(ms: f64) -> f64 {
    ms * KMH_PER_MS
}
