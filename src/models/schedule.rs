use serde::{Deserialize, Serialize};

use super::RouteDirection;
use crate::time::format_minutes;

/// Per-stop times of one scheduled service, minutes since midnight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledStop {
    pub station_id: String,
    pub arrival_min: u32,
    pub departure_min: u32,
    /// Platform assigned by the line's platform plan or the template hint
    #[serde(default)]
    pub platform: Option<String>,
}

/// One generated or manually added service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: String,
    pub line_id: String,
    pub train_number: String,
    pub direction: RouteDirection,
    pub train_type: String,
    pub unit_count: u32,
    pub stops: Vec<ScheduledStop>,
    #[serde(default)]
    pub cancelled: bool,
}

impl TimetableEntry {
    #[must_use]
    pub fn departure_min(&self) -> u32 {
        self.stops.first().map_or(0, |s| s.departure_min)
    }

    #[must_use]
    pub fn arrival_min(&self) -> u32 {
        self.stops.last().map_or(0, |s| s.arrival_min)
    }

    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.stops.first().map(|s| s.station_id.as_str())
    }

    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.stops.last().map(|s| s.station_id.as_str())
    }

    /// Index of the stop at `station_id`, if served
    #[must_use]
    pub fn stop_index(&self, station_id: &str) -> Option<usize> {
        self.stops.iter().position(|s| s.station_id == station_id)
    }

    /// Keep only the first and last stop, used when the full stopping
    /// pattern cannot be routed
    #[must_use]
    pub fn reduced_to_endpoints(&self) -> Self {
        let mut reduced = self.clone();
        if reduced.stops.len() > 2 {
            let last = reduced.stops.len() - 1;
            reduced.stops = vec![reduced.stops[0].clone(), reduced.stops[last].clone()];
        }
        reduced
    }

    /// Short label for logs: train number and departure time
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.train_number, format_minutes(self.departure_min()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> TimetableEntry {
        let stop = |id: &str, arr: u32, dep: u32| ScheduledStop {
            station_id: id.to_string(),
            arrival_min: arr,
            departure_min: dep,
            platform: None,
        };
        TimetableEntry {
            id: "S1-forward-0".to_string(),
            line_id: "S1".to_string(),
            train_number: "S1 0001".to_string(),
            direction: RouteDirection::Forward,
            train_type: "emu".to_string(),
            unit_count: 1,
            stops: vec![stop("A", 360, 360), stop("B", 364, 365), stop("C", 371, 371)],
            cancelled: false,
        }
    }

    #[test]
    fn test_entry_accessors() {
        let e = entry();
        assert_eq!(e.departure_min(), 360);
        assert_eq!(e.arrival_min(), 371);
        assert_eq!(e.origin(), Some("A"));
        assert_eq!(e.destination(), Some("C"));
        assert_eq!(e.stop_index("B"), Some(1));
        assert_eq!(e.label(), "S1 0001 (06:00)");
    }

    #[test]
    fn test_reduced_to_endpoints() {
        let reduced = entry().reduced_to_endpoints();
        let ids: Vec<&str> = reduced.stops.iter().map(|s| s.station_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }
}
