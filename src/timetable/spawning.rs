use log::{debug, info, warn};

use super::TimetableSystem;
use crate::config::SimulationConfig;
use crate::models::{Path, PlannedStop, Routes, TimetableEntry, TrackGraph};
use crate::movement::TrainMovement;
use crate::registry::{Train, TrainRegistry};
use crate::reservation::ReservationSystem;
use crate::time::{minutes_to_seconds, SimTime};

impl TimetableSystem {
    /// Spawn every service departing within the lookahead window. Entries
    /// that are cancelled, already running, or more than the grace period
    /// overdue are skipped. Returns the ids of trains put into service.
    pub fn update(
        &mut self,
        now: SimTime,
        graph: &TrackGraph,
        registry: &mut TrainRegistry,
        reservations: &mut ReservationSystem,
        config: &SimulationConfig,
    ) -> Vec<String> {
        let horizon = now + minutes_to_seconds(config.spawn_lookahead_min);
        let grace = minutes_to_seconds(config.spawn_grace_min);
        let mut started = Vec::new();

        while let Some(entry) = self.entries.get(self.cursor) {
            let departure = minutes_to_seconds(entry.departure_min());
            if departure > horizon {
                break;
            }
            self.cursor += 1;

            if entry.cancelled || self.spawned.contains(&entry.id) {
                continue;
            }
            if departure + grace < now {
                debug!("Skipping {}: departure already passed", entry.label());
                continue;
            }

            let entry = entry.clone();
            self.spawned.insert(entry.id.clone());
            if let Some(id) = self.start_service(&entry, graph, registry, reservations, config) {
                started.push(id);
            }
        }
        started
    }

    /// Put a service on the rails, preferring an idle train at its origin
    fn start_service(
        &self,
        entry: &TimetableEntry,
        graph: &TrackGraph,
        registry: &mut TrainRegistry,
        reservations: &mut ReservationSystem,
        config: &SimulationConfig,
    ) -> Option<String> {
        let Some(train_type) = config.train_type(&entry.train_type) else {
            warn!("Cannot start {}: unknown train type {}", entry.label(), entry.train_type);
            return None;
        };

        if config.service_chaining {
            if let Some(id) = self.reuse_turnaround(entry, graph, registry, reservations) {
                return Some(id);
            }
        }

        let Some((path, service)) = self.route_for(graph, entry, None) else {
            warn!("Cannot start {}: no path between its stops", entry.label());
            return None;
        };

        let id = registry.next_id();
        let capacity = train_type.capacity(entry.unit_count);
        let movement = TrainMovement::new(path, service.stops.len(), &id, config.passenger_seed, capacity);
        info!("Train {id} enters service as {}", service.label());
        registry.insert(Train {
            id: id.clone(),
            train_type: train_type.clone(),
            unit_count: entry.unit_count,
            service,
            movement,
        });
        reservations.begin_train(&id);
        Some(id)
    }

    /// Reassign a train waiting in turnaround at the origin. The new path
    /// must start from the node the train stands on.
    fn reuse_turnaround(
        &self,
        entry: &TimetableEntry,
        graph: &TrackGraph,
        registry: &mut TrainRegistry,
        reservations: &mut ReservationSystem,
    ) -> Option<String> {
        let origin = entry.origin()?;
        let id = registry
            .find_turnaround(origin, &entry.train_type, entry.unit_count)?
            .id
            .clone();
        let train = registry.get_mut(&id)?;
        let standing_at = train.movement.last_node.clone();

        let Some((path, service)) = self.route_for(graph, entry, standing_at.as_deref()) else {
            debug!("Train {id} cannot run {} from where it stands", entry.label());
            return None;
        };

        let keep = train
            .movement
            .current_block()
            .filter(|block| path.segments.iter().any(|s| s.track_id == *block))
            .map(str::to_string);
        reservations.restart_train(&id, keep.as_deref());

        let capacity = train.capacity();
        train.movement.reassign(path, service.stops.len(), capacity);
        info!("Train {id} reassigned from {} to {}", train.service.label(), service.label());
        train.service = service;
        Some(id)
    }

    /// Path for a service, trying in order: the line's platform plan, the
    /// entry's platform hints, no hints, and finally only the two endpoints
    /// (the returned service is reduced accordingly). With `start_node` the
    /// path is pinned to depart from that node.
    pub(crate) fn route_for(
        &self,
        graph: &TrackGraph,
        entry: &TimetableEntry,
        start_node: Option<&str>,
    ) -> Option<(Path, TimetableEntry)> {
        let pin = |mut stops: Vec<PlannedStop>| {
            if let (Some(node), Some(first)) = (start_node, stops.first_mut()) {
                first.fixed_node = Some(node.to_string());
            }
            stops
        };
        let destination = entry.destination();

        let planned = self
            .plan(&entry.line_id, entry.direction)
            .filter(|plan| {
                plan.stops.len() == entry.stops.len()
                    && plan.stops.iter().zip(&entry.stops).all(|(p, s)| p.station_id == s.station_id)
            })
            .map(|plan| plan.stops.clone());
        let hinted: Vec<PlannedStop> = entry
            .stops
            .iter()
            .map(|s| PlannedStop::with_platform(&s.station_id, s.platform.as_deref()))
            .collect();
        let bare: Vec<PlannedStop> = entry.stops.iter().map(|s| PlannedStop::new(&s.station_id)).collect();

        for stops in planned.into_iter().chain([hinted, bare]) {
            let path = graph.find_multi_stop_path(&pin(stops), destination);
            if path.found {
                return Some((path, entry.clone()));
            }
        }

        let reduced = entry.reduced_to_endpoints();
        let (origin, target) = (reduced.origin()?, reduced.destination()?);
        let path = match start_node {
            None => graph.find_path(origin, target),
            Some(_) => {
                let endpoints = pin(vec![PlannedStop::new(origin), PlannedStop::new(target)]);
                graph.find_multi_stop_path(&endpoints, Some(target))
            }
        };
        if !path.found {
            return None;
        }
        warn!("{} runs without intermediate stops: stopping pattern not routable", entry.label());
        Some((path, reduced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RouteDirection, TrainState};
    use crate::test_support::two_platform_network;
    use crate::timetable::tests::line;
    use chrono::Weekday;

    fn setup() -> (TrackGraph, TimetableSystem) {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let mut timetable = TimetableSystem::new();
        timetable
            .register_line(&graph, line("S1", &[("WEST", None), ("MID", Some("2")), ("EAST", None)]))
            .expect("valid line");
        timetable.generate_day(Weekday::Mon);
        (graph, timetable)
    }

    #[test]
    fn test_spawns_within_lookahead_only() {
        let (graph, mut timetable) = setup();
        let mut registry = TrainRegistry::new();
        let mut reservations = ReservationSystem::new();
        let config = SimulationConfig::default();

        // 06:03: the 06:05 departure is two minutes out, lookahead is one
        let started = timetable.update(363.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert!(started.is_empty());

        let started = timetable.update(364.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert_eq!(started, vec!["T1"]);
        let train = registry.get("T1").expect("spawned");
        assert_eq!(train.service.id, "S1-forward-0605");
        assert_eq!(train.state(), TrainState::Preparing);
        assert_eq!(train.movement.path.stops[1].node_id, "MID_2");
        assert!(reservations.is_tracking("T1"));
        assert!(timetable.is_spawned("S1-forward-0605"));

        // Not spawned twice
        let again = timetable.update(364.5 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert!(again.is_empty());
    }

    #[test]
    fn test_overdue_and_cancelled_entries_are_skipped() {
        let (graph, mut timetable) = setup();
        let mut registry = TrainRegistry::new();
        let mut reservations = ReservationSystem::new();
        let config = SimulationConfig::default();
        assert!(timetable.cancel_entry("S1-reverse-0620"));

        // 06:25: 06:05 is 20 minutes overdue, 06:20 is cancelled
        let started = timetable.update(385.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert!(started.is_empty());
        assert!(registry.is_empty());

        let started = timetable.update(394.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert_eq!(started.len(), 1);
        assert_eq!(registry.get(&started[0]).expect("train").service.id, "S1-forward-0635");
    }

    #[test]
    fn test_unknown_train_type_is_skipped() {
        let (graph, mut timetable) = setup();
        let mut registry = TrainRegistry::new();
        let mut reservations = ReservationSystem::new();
        let config = SimulationConfig {
            train_types: vec![],
            ..SimulationConfig::default()
        };
        let started = timetable.update(364.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert!(started.is_empty());
        assert!(timetable.is_spawned("S1-forward-0605"));
    }

    #[test]
    fn test_turnaround_train_is_reassigned() {
        let (graph, mut timetable) = setup();
        let mut registry = TrainRegistry::new();
        let mut reservations = ReservationSystem::new();
        let config = SimulationConfig::default();

        timetable.update(364.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        // Park T1 at EAST as if it had finished its run
        {
            let train = registry.get_mut("T1").expect("spawned");
            let m = &mut train.movement;
            m.offset = m.path.total_length;
            m.current_segment = m.path.segments.len() - 1;
            m.state = TrainState::Turnaround;
            m.last_node = m.path.last_node().map(str::to_string);
        }
        reservations.clear_train("T1");

        // The 06:20 reverse service departs from EAST
        let started = timetable.update(379.0 * 60.0, &graph, &mut registry, &mut reservations, &config);
        assert_eq!(started, vec!["T1"]);
        assert_eq!(registry.len(), 1);
        let train = registry.get("T1").expect("reused");
        assert_eq!(train.service.direction, RouteDirection::Reverse);
        assert_eq!(train.state(), TrainState::Preparing);
        assert_eq!(train.movement.offset, 0.0);
        assert_eq!(train.movement.path.first_node(), Some("E"));
    }

    #[test]
    fn test_route_falls_back_to_endpoints() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let timetable = TimetableSystem::new();
        let mut entry = crate::models::TimetableEntry {
            id: "x".to_string(),
            line_id: "X".to_string(),
            train_number: "X 1".to_string(),
            direction: RouteDirection::Forward,
            train_type: "emu".to_string(),
            unit_count: 1,
            stops: vec![],
            cancelled: false,
        };
        for station in ["WEST", "NORTH", "EAST"] {
            entry.stops.push(crate::models::ScheduledStop {
                station_id: station.to_string(),
                arrival_min: 360,
                departure_min: 360,
                platform: None,
            });
        }

        let (path, service) = timetable.route_for(&graph, &entry, None).expect("endpoint path");
        assert!(path.found);
        assert_eq!(service.stops.len(), 2);
        assert_eq!(service.destination(), Some("EAST"));
        assert_eq!(path.stops.len(), 2);
    }
}
