use serde::{Deserialize, Serialize};

use super::TimetableSystem;
use crate::models::{Stations, TrackGraph};
use crate::time::format_minutes;

/// One departure shown at a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureBoardRow {
    pub entry_id: String,
    pub train_number: String,
    pub line_id: String,
    pub destination: String,
    pub destination_name: String,
    pub scheduled_departure_min: u32,
    pub platform: Option<String>,
    pub cancelled: bool,
    /// Current delay of the running train, filled in by the simulation
    pub delay_s: Option<f64>,
}

impl DepartureBoardRow {
    /// Board line such as `06:05  S1 0001  East  Pl. 2`
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = format!(
            "{}  {}  {}",
            format_minutes(self.scheduled_departure_min),
            self.train_number,
            self.destination_name
        );
        if let Some(platform) = &self.platform {
            line.push_str(&format!("  Pl. {platform}"));
        }
        if self.cancelled {
            line.push_str("  cancelled");
        } else if let Some(delay) = self.delay_s.filter(|d| *d >= 60.0) {
            line.push_str(&format!("  +{:.0}", (delay / 60.0).floor()));
        }
        line
    }
}

impl TimetableSystem {
    /// Departures from `station_id` between `from_min` and `to_min`
    /// (inclusive), sorted by time. Services ending at the station are not
    /// departures and are left out.
    #[must_use]
    pub fn departure_board(
        &self,
        graph: &TrackGraph,
        station_id: &str,
        from_min: u32,
        to_min: u32,
    ) -> Vec<DepartureBoardRow> {
        let mut rows: Vec<DepartureBoardRow> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let index = entry.stop_index(station_id)?;
                if index + 1 >= entry.stops.len() {
                    return None;
                }
                let stop = &entry.stops[index];
                if stop.departure_min < from_min || stop.departure_min > to_min {
                    return None;
                }
                let destination = entry.destination()?;
                Some(DepartureBoardRow {
                    entry_id: entry.id.clone(),
                    train_number: entry.train_number.clone(),
                    line_id: entry.line_id.clone(),
                    destination: destination.to_string(),
                    destination_name: graph.station_name(destination).to_string(),
                    scheduled_departure_min: stop.departure_min,
                    platform: stop.platform.clone(),
                    cancelled: entry.cancelled,
                    delay_s: None,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (a.scheduled_departure_min, &a.train_number).cmp(&(b.scheduled_departure_min, &b.train_number))
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::two_platform_network;
    use crate::timetable::tests::line;
    use chrono::Weekday;

    #[test]
    fn test_board_lists_departures_in_window() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let mut timetable = TimetableSystem::new();
        timetable
            .register_line(&graph, line("S1", &[("WEST", None), ("MID", Some("2")), ("EAST", None)]))
            .expect("valid line");
        timetable.generate_day(Weekday::Mon);
        timetable.cancel_entry("S1-reverse-0620");

        let board = timetable.departure_board(&graph, "MID", 360, 400);
        let summary: Vec<(u32, &str)> = board
            .iter()
            .map(|r| (r.scheduled_departure_min, r.destination.as_str()))
            .collect();
        // 06:05 forward leaves MID at 06:10, 06:20 reverse at 06:25, 06:35 at 06:40
        assert_eq!(summary, vec![(370, "EAST"), (385, "WEST"), (400, "EAST")]);
        assert_eq!(board[0].destination_name, "East");
        assert_eq!(board[0].platform.as_deref(), Some("2"));
        assert!(board[1].cancelled);
        assert_eq!(board[1].display(), "06:25  S1 0002  West  Pl. 2  cancelled");
    }

    #[test]
    fn test_terminus_has_no_departures_of_arriving_trains() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let mut timetable = TimetableSystem::new();
        let mut one_way = line("S1", &[("WEST", None), ("EAST", None)]);
        one_way.reverse = false;
        timetable.register_line(&graph, one_way).expect("valid line");
        timetable.generate_day(Weekday::Mon);

        assert!(timetable.departure_board(&graph, "EAST", 0, 1439).is_empty());
        assert_eq!(timetable.departure_board(&graph, "WEST", 0, 1439).len(), 4);
    }
}
