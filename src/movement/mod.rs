//! Per-train kinematics and operational state machine.
//!
//! Each tick a moving train locates itself on its path, extends its
//! reservations, picks the nearer of the next scheduled stop and the end of
//! its movement authority as stopping target, and integrates speed and
//! position toward it. A train blocked by another one close ahead compares
//! priorities; the loser gives up its lookahead and waits out a cooldown.

pub mod kinematics;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SimulationConfig;
use crate::constants::{CREEP_SPEED, STANDSTILL_SPEED};
use crate::models::{Path, TrainState};
use crate::registry::{Train, TrainRegistry};
use crate::reservation::{Blocked, ReservationSystem};
use crate::time::{format_sim_time, minutes_to_seconds, SimTime};
use kinematics::{approach_speed, braking_distance, distance_travelled, step_speed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopTargetKind {
    Station,
    /// End of the movement authority
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopTarget {
    pub offset: f64,
    pub kind: StopTargetKind,
    /// Planned stop index for station targets
    pub stop_index: Option<usize>,
}

/// Live movement state of one train
#[derive(Debug, Clone)]
pub struct TrainMovement {
    pub path: Path,
    /// Metres from the path start
    pub offset: f64,
    /// m/s
    pub speed: f64,
    pub target_speed: f64,
    pub state: TrainState,
    pub current_segment: usize,
    /// Seconds left at the current stop
    pub dwell_remaining: f64,
    pub current_stop_index: Option<usize>,
    pub next_stop_index: usize,
    pub stop_target: Option<StopTarget>,
    pub reserved_until: f64,
    pub blocked: Option<Blocked>,
    /// No lookahead claims before this time after yielding
    pub yield_until: Option<SimTime>,
    /// Stopping point at the moment of yielding. Reservations during the
    /// cooldown reach no further.
    pub yield_horizon: Option<f64>,
    /// Seconds behind schedule at the last arrival or departure
    pub delay_s: f64,
    pub passengers: u32,
    pub last_node: Option<String>,
    pub arrived_at: Vec<Option<SimTime>>,
    pub departed_at: Vec<Option<SimTime>>,
    pub turnaround_since: Option<SimTime>,
    pub emergency: bool,
    rng: ChaCha8Rng,
}

impl TrainMovement {
    /// Fresh movement state standing at the first stop of `path`, with
    /// passengers boarded at the origin
    #[must_use]
    pub fn new(path: Path, stop_count: usize, train_id: &str, seed: u64, capacity: u32) -> Self {
        let last_node = path.first_node().map(str::to_string);
        let mut movement = Self {
            path,
            offset: 0.0,
            speed: 0.0,
            target_speed: 0.0,
            state: TrainState::Preparing,
            current_segment: 0,
            dwell_remaining: 0.0,
            current_stop_index: Some(0),
            next_stop_index: 1,
            stop_target: None,
            reserved_until: 0.0,
            blocked: None,
            yield_until: None,
            yield_horizon: None,
            delay_s: 0.0,
            passengers: 0,
            last_node,
            arrived_at: vec![None; stop_count],
            departed_at: vec![None; stop_count],
            turnaround_since: None,
            emergency: false,
            rng: ChaCha8Rng::seed_from_u64(passenger_seed(seed, train_id)),
        };
        movement.exchange_passengers(capacity, false);
        movement
    }

    /// Put the train on a new service starting where it stands
    pub fn reassign(&mut self, path: Path, stop_count: usize, capacity: u32) {
        self.last_node = path.first_node().map(str::to_string).or(self.last_node.take());
        self.path = path;
        self.offset = 0.0;
        self.speed = 0.0;
        self.target_speed = 0.0;
        self.state = TrainState::Preparing;
        self.current_segment = 0;
        self.dwell_remaining = 0.0;
        self.current_stop_index = Some(0);
        self.next_stop_index = 1;
        self.stop_target = None;
        self.reserved_until = 0.0;
        self.blocked = None;
        self.yield_until = None;
        self.yield_horizon = None;
        self.delay_s = 0.0;
        self.arrived_at = vec![None; stop_count];
        self.departed_at = vec![None; stop_count];
        self.turnaround_since = None;
        self.emergency = false;
        self.exchange_passengers(capacity, false);
    }

    #[must_use]
    pub fn in_cooldown(&self, now: SimTime) -> bool {
        self.yield_until.is_some_and(|until| now < until)
    }

    /// Block the train is standing or running on
    #[must_use]
    pub fn current_block(&self) -> Option<&str> {
        self.path
            .segments
            .get(self.current_segment)
            .map(|s| s.track_id.as_str())
    }

    /// Brake at the emergency rate until stationary
    pub fn request_emergency_stop(&mut self) {
        if !self.state.is_stationary() {
            self.emergency = true;
        }
    }

    fn exchange_passengers(&mut self, capacity: u32, final_stop: bool) {
        if final_stop {
            self.passengers = 0;
            return;
        }
        let alighting = self.rng.gen_range(0..=self.passengers / 2);
        self.passengers -= alighting;
        let free = capacity.saturating_sub(self.passengers);
        let boarding = self.rng.gen_range(0..=free / 2);
        self.passengers += boarding;
    }

    /// Re-reserve the block a standing train occupies and release what lies
    /// behind it. Nothing ahead is claimed.
    fn hold_position(&mut self, train_id: &str, reservations: &mut ReservationSystem, release_behind: f64) {
        let Some(segment) = self.locate() else {
            return;
        };
        let outcome = reservations.update_train(train_id, &self.path, segment, self.offset, 0.0, release_behind);
        self.reserved_until = outcome.reserved_until;
        self.blocked = outcome.blocked;
    }

    /// Segment the train occupies. A train exactly on a boundary has not yet
    /// entered the segment beyond it.
    fn locate(&mut self) -> Option<usize> {
        let segment = self.path.segment_index_at((self.offset - 1e-6).max(0.0))?;
        self.current_segment = segment;
        Some(segment)
    }

    /// Give up every reservation the train can still stop short of and
    /// start the cooldown. Returns the end of the stretch it keeps.
    fn yield_to(
        &mut self,
        train_id: &str,
        reservations: &mut ReservationSystem,
        deceleration: f64,
        cooldown_until: SimTime,
    ) -> f64 {
        let stop_at = self.offset + braking_distance(self.speed, deceleration);
        let kept_until = reservations.yield_beyond(train_id, &self.path, self.current_segment, stop_at);
        self.yield_until = Some(cooldown_until);
        self.yield_horizon = Some(stop_at);
        kept_until
    }

    fn depart(&mut self, now: SimTime, scheduled: SimTime, stop_index: usize) {
        if let Some(slot) = self.departed_at.get_mut(stop_index) {
            *slot = Some(now);
        }
        self.delay_s = (now - scheduled).max(0.0);
        self.state = TrainState::Departing;
        self.stop_target = None;
    }
}

/// Per-train RNG seed mixing the configured seed with the train id
fn passenger_seed(seed: u64, train_id: &str) -> u64 {
    train_id
        .bytes()
        .fold(seed ^ 0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

/// Drives every train in the registry through one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementSystem;

impl MovementSystem {
    /// Advance all trains by `dt` seconds ending at `now`.
    ///
    /// Trains are processed in registry order. A train that wins a priority
    /// comparison makes the other one yield after the pass, so a train is
    /// never modified while another is being stepped.
    pub fn update(
        registry: &mut TrainRegistry,
        reservations: &mut ReservationSystem,
        config: &SimulationConfig,
        now: SimTime,
        dt: f64,
    ) {
        let priorities: HashMap<String, (u32, String)> = registry
            .iter()
            .map(|t| (t.id.clone(), t.priority_key()))
            .collect();

        let mut deferred: Vec<String> = Vec::new();
        for id in registry.ids() {
            let Some(train) = registry.get_mut(&id) else {
                continue;
            };
            if let Some(loser) = step_train(train, reservations, config, &priorities, now, dt) {
                if !deferred.contains(&loser) {
                    deferred.push(loser);
                }
            }
        }

        for id in deferred {
            let Some(train) = registry.get_mut(&id) else {
                continue;
            };
            let deceleration = train.train_type.deceleration;
            let movement = &mut train.movement;
            if movement.in_cooldown(now)
                || matches!(
                    movement.state,
                    TrainState::Depot | TrainState::Turnaround | TrainState::Terminated
                )
            {
                continue;
            }
            movement.yield_to(&id, reservations, deceleration, now + config.yield_cooldown_s);
            debug!("Train {id} yields to a higher priority train");
        }
    }
}

/// One tick for one train. Returns a lower-priority train that must yield.
#[allow(clippy::too_many_lines)]
fn step_train(
    train: &mut Train,
    reservations: &mut ReservationSystem,
    config: &SimulationConfig,
    priorities: &HashMap<String, (u32, String)>,
    now: SimTime,
    dt: f64,
) -> Option<String> {
    let release_behind = train.length_m() + config.release_margin_m;
    let capacity = train.capacity();
    let id = train.id.clone();
    let train_type = &train.train_type;
    let service = &train.service;
    let m = &mut train.movement;

    match m.state {
        TrainState::Depot | TrainState::Terminated => return None,
        TrainState::Turnaround => {
            m.speed = 0.0;
            let idle = now - m.turnaround_since.unwrap_or(now);
            if idle >= minutes_to_seconds(config.turnaround_idle_limit_min) {
                info!("Train {id} idle at terminus without a new service, terminating");
                m.state = TrainState::Terminated;
                reservations.clear_train(&id);
            }
            return None;
        }
        TrainState::Preparing => {
            m.speed = 0.0;
            m.hold_position(&id, reservations, release_behind);
            let scheduled = minutes_to_seconds(service.departure_min());
            if now < scheduled {
                return None;
            }
            m.depart(now, scheduled, 0);
            info!("Train {id} ({}) departs at {}", service.train_number, format_sim_time(now));
        }
        TrainState::AtStation => {
            m.speed = 0.0;
            m.dwell_remaining -= dt;
            m.hold_position(&id, reservations, release_behind);
            if m.dwell_remaining > 0.0 {
                return None;
            }
            let stop_index = m.current_stop_index.unwrap_or(0);
            let scheduled = service
                .stops
                .get(stop_index)
                .map_or(now, |s| minutes_to_seconds(s.departure_min));
            m.depart(now, scheduled, stop_index);
        }
        TrainState::Departing | TrainState::Running | TrainState::Approaching => {}
    }

    let Some(segment_index) = m.locate() else {
        m.state = TrainState::Terminated;
        reservations.clear_train(&id);
        return None;
    };
    let segment = &m.path.segments[segment_index];
    m.last_node = Some(segment.from_node.clone());

    let limit = train_type.max_speed().min(segment.max_speed);
    let deceleration = train_type.deceleration;
    let in_cooldown = m.in_cooldown(now);
    let lookahead = if in_cooldown {
        m.yield_horizon.map_or(0.0, |horizon| (horizon - m.offset).max(0.0))
    } else {
        braking_distance(m.speed.max(limit), deceleration) + config.approach_margin_m + config.min_lookahead_m
    };

    let outcome = reservations.update_train(&id, &m.path, segment_index, m.offset, lookahead, release_behind);
    let mut authority = outcome.authority().max(m.offset);
    let mut loser = None;

    if let Some(blocked) = &outcome.blocked {
        let gap = blocked.offset - m.offset;
        let close = gap <= braking_distance(m.speed, deceleration) + config.approach_margin_m;
        if close && !in_cooldown {
            let mine = (service.departure_min(), id.clone());
            match priorities.get(&blocked.by_train) {
                Some(theirs) if *theirs < mine => {
                    let cooldown_until = now + config.yield_cooldown_s;
                    let kept_until = m.yield_to(&id, reservations, deceleration, cooldown_until);
                    authority = authority.min(kept_until).max(m.offset);
                    debug!("Train {id} yields to {}", blocked.by_train);
                }
                Some(_) => loser = Some(blocked.by_train.clone()),
                None => {}
            }
        }
    }
    m.reserved_until = outcome.reserved_until;
    m.blocked = outcome.blocked;

    // Nearer of the next scheduled stop and the end of authority
    let station = match m.path.stop_offset(m.next_stop_index) {
        Some(offset) => Some((offset, Some(m.next_stop_index))),
        None if m.path.stops.is_empty() => Some((m.path.total_length, None)),
        None => None,
    };
    let target = match station {
        Some((offset, stop_index)) if offset <= authority + 1e-6 => StopTarget {
            offset,
            kind: StopTargetKind::Station,
            stop_index,
        },
        _ => StopTarget {
            offset: authority,
            kind: StopTargetKind::Block,
            stop_index: None,
        },
    };

    let remaining = (target.offset - m.offset).max(0.0);
    let tolerance = config.station_stop_tolerance_m;
    let (desired, braking) = if m.emergency {
        (0.0, train_type.emergency_deceleration)
    } else if remaining <= tolerance {
        (0.0, deceleration)
    } else {
        let approach = approach_speed(remaining, m.speed, deceleration, dt).max(CREEP_SPEED);
        (limit.min(approach), deceleration)
    };
    m.target_speed = desired;

    let start_speed = m.speed;
    m.speed = step_speed(start_speed, desired, train_type.acceleration, braking, dt);
    m.offset += distance_travelled(start_speed, m.speed, dt).min(remaining);
    if m.emergency && m.speed <= STANDSTILL_SPEED {
        m.emergency = false;
        m.speed = 0.0;
    }

    let remaining = target.offset - m.offset;
    let reached = remaining <= tolerance && (m.speed <= CREEP_SPEED || remaining <= 1e-9);
    if !reached {
        if m.speed > STANDSTILL_SPEED || m.state != TrainState::Departing {
            m.state = if braking_distance(m.speed, deceleration) + config.approach_margin_m >= remaining {
                TrainState::Approaching
            } else {
                TrainState::Running
            };
        }
        m.stop_target = Some(target);
        return loser;
    }

    m.speed = 0.0;
    m.stop_target = None;
    match (target.kind, target.stop_index) {
        (StopTargetKind::Block, _) => {
            // Wait at the end of authority for the reservation to clear
            if m.state != TrainState::Departing {
                m.state = TrainState::Running;
            }
        }
        (StopTargetKind::Station, None) => {
            m.offset = target.offset;
            info!("Train {id} reached the end of its path");
            m.state = TrainState::Terminated;
            reservations.clear_train(&id);
        }
        (StopTargetKind::Station, Some(stop_index)) => {
            m.offset = target.offset;
            m.current_stop_index = Some(stop_index);
            m.next_stop_index = stop_index + 1;
            if let Some(slot) = m.arrived_at.get_mut(stop_index) {
                *slot = Some(now);
            }
            if let Some(stop) = m.path.stops.get(stop_index) {
                m.last_node = Some(stop.node_id.clone());
            }
            if let Some(scheduled) = service.stops.get(stop_index) {
                m.delay_s = (now - minutes_to_seconds(scheduled.arrival_min)).max(0.0);
            }

            let final_stop = stop_index + 1 >= m.path.stops.len();
            m.exchange_passengers(capacity, final_stop);

            if !final_stop {
                let departure = service
                    .stops
                    .get(stop_index)
                    .map_or(now, |s| minutes_to_seconds(s.departure_min));
                m.dwell_remaining = config.min_dwell_s.max(departure - now);
                m.state = TrainState::AtStation;
                debug!("Train {id} at stop {stop_index}, dwelling {:.0}s", m.dwell_remaining);
            } else if config.service_chaining {
                m.locate();
                let keep = m.current_block().map(str::to_string);
                reservations.yield_train(&id, keep.as_deref());
                m.state = TrainState::Turnaround;
                m.turnaround_since = Some(now);
                info!(
                    "Train {id} ({}) arrived at terminus, {:.0}s late, awaiting next service",
                    service.train_number, m.delay_s
                );
            } else {
                m.state = TrainState::Terminated;
                reservations.clear_train(&id);
                info!(
                    "Train {id} ({}) terminated, {:.0}s late",
                    service.train_number, m.delay_s
                );
            }
        }
    }
    loser
}
