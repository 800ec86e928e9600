//! Owned simulation context.
//!
//! Holds the track graph, the train registry, the reservation state and the
//! timetable, and advances all of them on a shared clock. Nothing here is
//! global, so tests and embedders can run as many independent simulations
//! as they like.

use anyhow::{anyhow, Result};
use chrono::Weekday;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::constants::ms_to_kmh;
use crate::geometry::GeoPoint;
use crate::models::{LineTemplate, Path, Positions, Stations, TimetableEntry, TrackGraph, TrainState};
use crate::movement::MovementSystem;
use crate::registry::{Train, TrainRegistry};
use crate::reservation::{ReservationListing, ReservationSystem};
use crate::time::SimTime;
use crate::timetable::{DepartureBoardRow, TimetableSystem};

/// Binary signal aspect derived from block occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAspect {
    Proceed,
    Stop,
}

/// Read-only view of a train for renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSnapshot {
    pub id: String,
    pub train_number: String,
    pub line_id: String,
    pub state: TrainState,
    pub speed_kmh: f64,
    pub position: Option<GeoPoint>,
    pub heading_deg: Option<f64>,
    pub delay_s: f64,
    pub passengers: u32,
    pub capacity: u32,
    pub next_station: Option<String>,
}

pub struct Simulation {
    graph: TrackGraph,
    config: SimulationConfig,
    registry: TrainRegistry,
    reservations: ReservationSystem,
    timetable: TimetableSystem,
    now: SimTime,
}

impl Simulation {
    #[must_use]
    pub fn new(mut graph: TrackGraph, config: SimulationConfig) -> Self {
        graph.set_primary_mode(config.primary_mode);
        Self {
            graph,
            config,
            registry: TrainRegistry::new(),
            reservations: ReservationSystem::new(),
            timetable: TimetableSystem::new(),
            now: 0.0,
        }
    }

    /// # Errors
    ///
    /// Fails when the template is invalid or names an unknown train type
    pub fn register_line(&mut self, line: LineTemplate) -> Result<()> {
        if self.config.train_type(&line.train_type).is_none() {
            return Err(anyhow!("Line {} uses unknown train type {}", line.id, line.train_type));
        }
        self.timetable
            .register_line(&self.graph, line)
            .map_err(|e| anyhow!(e))
    }

    /// # Errors
    ///
    /// Fails for duplicate ids and services with fewer than two stops
    pub fn add_entry(&mut self, entry: TimetableEntry) -> Result<()> {
        self.timetable.add_entry(entry).map_err(|e| anyhow!(e))
    }

    pub fn cancel_entry(&mut self, id: &str) -> bool {
        self.timetable.cancel_entry(id)
    }

    /// Expand the registered lines into the services of one day
    pub fn generate_day(&mut self, weekday: Weekday) -> usize {
        self.timetable.generate_day(weekday)
    }

    /// Move the clock, e.g. to the start of the service day. Trains already
    /// running are not touched.
    pub fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Advance the simulation by `dt` seconds: spawn due services, move every
    /// train, then drop terminated trains.
    pub fn tick(&mut self, dt: f64) {
        self.now += dt;
        let spawned = self.timetable.update(
            self.now,
            &self.graph,
            &mut self.registry,
            &mut self.reservations,
            &self.config,
        );
        if !spawned.is_empty() {
            debug!("Spawned {spawned:?}");
        }

        MovementSystem::update(&mut self.registry, &mut self.reservations, &self.config, self.now, dt);

        for id in self.registry.ids_in_state(TrainState::Terminated) {
            self.reservations.clear_train(&id);
            if let Some(train) = self.registry.remove(&id) {
                info!(
                    "Train {id} ({}) leaves the simulation, final delay {:.0}s",
                    train.service.train_number, train.movement.delay_s
                );
            }
        }
    }

    /// Tick in steps of `step` seconds until the clock reaches `until`
    pub fn run_until(&mut self, until: SimTime, step: f64) {
        if step <= 0.0 {
            return;
        }
        while self.now + step <= until + 1e-9 {
            self.tick(step);
        }
    }

    #[must_use]
    pub fn graph(&self) -> &TrackGraph {
        &self.graph
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &TrainRegistry {
        &self.registry
    }

    #[must_use]
    pub fn reservations(&self) -> &ReservationSystem {
        &self.reservations
    }

    #[must_use]
    pub fn timetable(&self) -> &TimetableSystem {
        &self.timetable
    }

    /// Brake a train at its emergency rate. Returns whether it exists.
    pub fn request_emergency_stop(&mut self, train_id: &str) -> bool {
        let Some(train) = self.registry.get_mut(train_id) else {
            return false;
        };
        train.movement.request_emergency_stop();
        true
    }

    #[must_use]
    pub fn snapshot(&self, train_id: &str) -> Option<TrainSnapshot> {
        self.registry.get(train_id).map(|t| self.snapshot_of(t))
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<TrainSnapshot> {
        self.registry.iter().map(|t| self.snapshot_of(t)).collect()
    }

    fn snapshot_of(&self, train: &Train) -> TrainSnapshot {
        let m = &train.movement;
        let located = self.graph.get_position_on_path(&m.path, m.offset);
        TrainSnapshot {
            id: train.id.clone(),
            train_number: train.service.train_number.clone(),
            line_id: train.service.line_id.clone(),
            state: m.state,
            speed_kmh: ms_to_kmh(m.speed),
            position: located.map(|p| p.position),
            heading_deg: located.map(|p| p.heading_deg),
            delay_s: m.delay_s,
            passengers: m.passengers,
            capacity: train.capacity(),
            next_station: train
                .service
                .stops
                .get(m.next_stop_index)
                .map(|s| s.station_id.clone()),
        }
    }

    /// Stop when any track at the signal is held by a train other than
    /// `viewer`. `None` for unknown nodes.
    #[must_use]
    pub fn signal_aspect(&self, node_id: &str, viewer: Option<&str>) -> Option<SignalAspect> {
        let index = self.graph.node_index(node_id)?;
        let occupied = self
            .graph
            .tracks_at_node(index)
            .iter()
            .any(|track| self.reservations.is_block_reserved_by_other(track, viewer));
        Some(if occupied { SignalAspect::Stop } else { SignalAspect::Proceed })
    }

    #[must_use]
    pub fn reservation_listing(&self) -> Vec<ReservationListing> {
        self.reservations.listing()
    }

    #[must_use]
    pub fn path_of(&self, train_id: &str) -> Option<&Path> {
        self.registry.get(train_id).map(|t| &t.movement.path)
    }

    /// Departure board with the live delay of services already running
    #[must_use]
    pub fn departure_board(&self, station_id: &str, from_min: u32, to_min: u32) -> Vec<DepartureBoardRow> {
        let mut rows = self
            .timetable
            .departure_board(&self.graph, station_id, from_min, to_min);
        for row in &mut rows {
            row.delay_s = self
                .registry
                .find_by_entry(&row.entry_id)
                .map(|t| t.movement.delay_s);
        }
        rows
    }

    /// Display name of a station, falling back to its id
    #[must_use]
    pub fn station_name<'a>(&'a self, station_id: &'a str) -> &'a str {
        self.graph.station_name(station_id)
    }
}
