//! Timetable generation and train spawning.
//!
//! Line templates are registered once; each gets a platform plan per
//! direction so every service of a line uses the same geometry-consistent
//! stop nodes. A simulated day is then expanded into timetable entries,
//! which the spawner turns into trains shortly before they are due.

mod board;
mod generation;
mod spawning;

pub use board::DepartureBoardRow;

use indexmap::IndexMap;
use log::{info, warn};
use std::collections::{HashMap, HashSet};

use crate::models::{LineTemplate, Path, PlannedStop, RouteDirection, Routes, TimetableEntry, TrackGraph};

/// Stop nodes chosen for one line direction
#[derive(Debug, Clone)]
pub struct PlatformPlan {
    pub direction: RouteDirection,
    /// Planned stops pinned to the chosen nodes
    pub stops: Vec<PlannedStop>,
    /// Platform reference of each chosen node, if it has one
    pub platforms: Vec<Option<String>>,
    pub path: Path,
}

impl PlatformPlan {
    /// Plan a direction of `line` through the multi-stop router. `None` when
    /// the stopping pattern cannot be routed.
    fn compute(graph: &TrackGraph, line: &LineTemplate, direction: RouteDirection) -> Option<Self> {
        let template = line.stops_for(direction);
        let requested: Vec<PlannedStop> = template
            .iter()
            .map(|s| PlannedStop::with_platform(&s.station_id, s.platform.as_deref()))
            .collect();
        let path = graph.find_multi_stop_path(&requested, line.terminus(direction));
        if !path.found || path.stops.len() != template.len() {
            return None;
        }

        let stops = path
            .stops
            .iter()
            .map(|s| PlannedStop {
                station_id: s.station_id.clone(),
                platform: s.platform_ref.clone(),
                fixed_node: Some(s.node_id.clone()),
            })
            .collect();
        let platforms = path
            .stops
            .iter()
            .zip(&template)
            .map(|(chosen, planned)| chosen.platform_ref.clone().or_else(|| planned.platform.clone()))
            .collect();
        Some(Self {
            direction,
            stops,
            platforms,
            path,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimetableSystem {
    lines: IndexMap<String, LineTemplate>,
    plans: HashMap<(String, RouteDirection), PlatformPlan>,
    /// Sorted by first departure up to `cursor`
    entries: Vec<TimetableEntry>,
    /// Next entry the spawner looks at
    cursor: usize,
    spawned: HashSet<String>,
}

impl TimetableSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a line, then plan its platforms in every direction
    /// it runs. A direction that cannot be routed has no plan; its services
    /// fall back to routing per entry at spawn time.
    ///
    /// # Errors
    ///
    /// Returns the validation message for an invalid template
    pub fn register_line(&mut self, graph: &TrackGraph, line: LineTemplate) -> Result<(), String> {
        line.validate()?;

        for direction in line.directions() {
            let key = (line.id.clone(), direction);
            match PlatformPlan::compute(graph, &line, direction) {
                Some(plan) => {
                    self.plans.insert(key, plan);
                }
                None => {
                    warn!("Line {}: no platform plan for the {} direction", line.id, direction.as_str());
                    self.plans.remove(&key);
                }
            }
        }

        info!("Registered line {} ({} stops)", line.id, line.stops.len());
        self.lines.insert(line.id.clone(), line);
        Ok(())
    }

    #[must_use]
    pub fn line(&self, id: &str) -> Option<&LineTemplate> {
        self.lines.get(id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineTemplate> {
        self.lines.values()
    }

    #[must_use]
    pub fn plan(&self, line_id: &str, direction: RouteDirection) -> Option<&PlatformPlan> {
        self.plans.get(&(line_id.to_string(), direction))
    }

    #[must_use]
    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&TimetableEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Add a manually defined service.
    ///
    /// # Errors
    ///
    /// Fails for duplicate ids and services with fewer than two stops
    pub fn add_entry(&mut self, entry: TimetableEntry) -> Result<(), String> {
        if entry.stops.len() < 2 {
            return Err(format!("Entry {} needs at least two stops", entry.id));
        }
        if self.entry(&entry.id).is_some() {
            return Err(format!("Duplicate timetable entry {}", entry.id));
        }
        let departure = entry.departure_min();
        let position = self
            .entries
            .partition_point(|e| e.departure_min() <= departure)
            .max(self.cursor);
        self.entries.insert(position, entry);
        Ok(())
    }

    /// Mark a service cancelled. Returns whether the entry exists.
    pub fn cancel_entry(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if !entry.cancelled {
            info!("Cancelled {}", entry.label());
        }
        entry.cancelled = true;
        true
    }

    #[must_use]
    pub fn is_spawned(&self, id: &str) -> bool {
        self.spawned.contains(id)
    }
}
