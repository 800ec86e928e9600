//! Insertion-ordered store of live trains.

use indexmap::IndexMap;

use crate::models::{TimetableEntry, TrainState, TrainType};
use crate::movement::TrainMovement;

#[derive(Debug, Clone)]
pub struct Train {
    pub id: String,
    pub train_type: TrainType,
    pub unit_count: u32,
    pub service: TimetableEntry,
    pub movement: TrainMovement,
}

impl Train {
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.train_type.capacity(self.unit_count)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn length_m(&self) -> f64 {
        self.train_type.unit_length_m * f64::from(self.unit_count)
    }

    /// Ordering used for conflict resolution: earlier first departure wins,
    /// then the smaller id
    #[must_use]
    pub fn priority_key(&self) -> (u32, String) {
        (self.service.departure_min(), self.id.clone())
    }

    #[must_use]
    pub fn state(&self) -> TrainState {
        self.movement.state
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainRegistry {
    trains: IndexMap<String, Train>,
    next_seq: u64,
}

impl TrainRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh train id (`T1`, `T2`, ...)
    pub fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("T{}", self.next_seq)
    }

    pub fn insert(&mut self, train: Train) {
        self.trains.insert(train.id.clone(), train);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Train> {
        self.trains.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Train> {
        self.trains.get_mut(id)
    }

    /// Remove a train, keeping the order of the rest
    pub fn remove(&mut self, id: &str) -> Option<Train> {
        self.trains.shift_remove(id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.trains.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    /// Train currently serving a timetable entry
    #[must_use]
    pub fn find_by_entry(&self, entry_id: &str) -> Option<&Train> {
        self.trains.values().find(|t| t.service.id == entry_id)
    }

    /// First idle train at `station_id` matching the rolling stock request
    #[must_use]
    pub fn find_turnaround(&self, station_id: &str, train_type: &str, unit_count: u32) -> Option<&Train> {
        self.trains.values().find(|t| {
            t.movement.state == TrainState::Turnaround
                && t.train_type.id == train_type
                && t.unit_count == unit_count
                && t.service.destination() == Some(station_id)
        })
    }

    /// Ids of trains in the given state
    #[must_use]
    pub fn ids_in_state(&self, state: TrainState) -> Vec<String> {
        self.trains
            .values()
            .filter(|t| t.movement.state == state)
            .map(|t| t.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Path, RouteDirection, ScheduledStop};

    fn service(id: &str, from: &str, to: &str, departure: u32) -> TimetableEntry {
        TimetableEntry {
            id: id.to_string(),
            line_id: "L".to_string(),
            train_number: format!("L {id}"),
            direction: RouteDirection::Forward,
            train_type: "emu".to_string(),
            unit_count: 1,
            stops: vec![
                ScheduledStop {
                    station_id: from.to_string(),
                    arrival_min: departure,
                    departure_min: departure,
                    platform: None,
                },
                ScheduledStop {
                    station_id: to.to_string(),
                    arrival_min: departure + 5,
                    departure_min: departure + 5,
                    platform: None,
                },
            ],
            cancelled: false,
        }
    }

    fn train(registry: &mut TrainRegistry, entry: TimetableEntry) -> Train {
        let id = registry.next_id();
        Train {
            movement: TrainMovement::new(Path::not_found(), entry.stops.len(), &id, 0, 0),
            id,
            train_type: TrainType::regional_emu(),
            unit_count: 1,
            service: entry,
        }
    }

    #[test]
    fn test_ids_are_sequential_and_order_is_kept() {
        let mut registry = TrainRegistry::new();
        let a = train(&mut registry, service("x", "A", "B", 360));
        let b = train(&mut registry, service("y", "A", "B", 370));
        let c = train(&mut registry, service("z", "A", "B", 380));
        registry.insert(a);
        registry.insert(b);
        registry.insert(c);
        assert_eq!(registry.ids(), vec!["T1", "T2", "T3"]);

        registry.remove("T2");
        assert_eq!(registry.ids(), vec!["T1", "T3"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_by_entry("z").map(|t| t.id.as_str()), Some("T3"));
    }

    #[test]
    fn test_priority_prefers_earlier_departure_then_id() {
        let mut registry = TrainRegistry::new();
        let early = train(&mut registry, service("x", "A", "B", 360));
        let late = train(&mut registry, service("y", "A", "B", 370));
        assert!(early.priority_key() < late.priority_key());

        let mut registry = TrainRegistry::new();
        let first = train(&mut registry, service("x", "A", "B", 360));
        let second = train(&mut registry, service("y", "A", "B", 360));
        assert!(first.priority_key() < second.priority_key());
    }

    #[test]
    fn test_find_turnaround_matches_stock_and_station() {
        let mut registry = TrainRegistry::new();
        let mut idle = train(&mut registry, service("x", "A", "B", 360));
        idle.movement.state = TrainState::Turnaround;
        registry.insert(idle);

        assert!(registry.find_turnaround("B", "emu", 1).is_some());
        assert!(registry.find_turnaround("A", "emu", 1).is_none());
        assert!(registry.find_turnaround("B", "emu", 2).is_none());
        assert!(registry.find_turnaround("B", "dmu", 1).is_none());
        assert_eq!(registry.ids_in_state(TrainState::Turnaround), vec!["T1"]);
    }
}
