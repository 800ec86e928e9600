use chrono::Weekday;
use log::{debug, info};

use super::TimetableSystem;
use crate::models::{LineStop, LineTemplate, RouteDirection, ScheduledStop, TimetableEntry};
use crate::time::format_minutes;

impl TimetableSystem {
    /// Replace the timetable with the services of every registered line
    /// operating on `weekday`. Manual entries are dropped as well. Returns the
    /// number of generated entries.
    pub fn generate_day(&mut self, weekday: Weekday) -> usize {
        let mut entries = Vec::new();
        for line in self.lines.values() {
            if !line.takt.days.runs_on(weekday) {
                debug!("Line {} does not run on {weekday}", line.id);
                continue;
            }
            for direction in line.directions() {
                let platforms = self
                    .plans
                    .get(&(line.id.clone(), direction))
                    .map(|p| p.platforms.clone());
                entries.extend(generate_direction(line, direction, platforms.as_deref()));
            }
        }
        entries.sort_by(|a, b| (a.departure_min(), &a.id).cmp(&(b.departure_min(), &b.id)));

        info!("Generated {} services for {weekday}", entries.len());
        self.entries = entries;
        self.cursor = 0;
        self.spawned.clear();
        self.entries.len()
    }
}

/// Services of one line direction. Forward trains get odd sequence numbers,
/// reverse trains even ones.
fn generate_direction(
    line: &LineTemplate,
    direction: RouteDirection,
    platforms: Option<&[Option<String>]>,
) -> Vec<TimetableEntry> {
    let stops = line.stops_for(direction);
    let parity = match direction {
        RouteDirection::Forward => 1,
        RouteDirection::Reverse => 2,
    };

    line.departures(direction)
        .into_iter()
        .zip(0u32..)
        .map(|(departure, i)| TimetableEntry {
            id: format!("{}-{}-{}", line.id, direction.as_str(), format_minutes(departure).replace(':', "")),
            line_id: line.id.clone(),
            train_number: line.train_number(2 * i + parity),
            direction,
            train_type: line.train_type.clone(),
            unit_count: line.unit_count,
            stops: schedule_stops(&stops, departure, platforms),
            cancelled: false,
        })
        .collect()
}

/// Absolute stop times for a departure. The origin dwell is not part of the
/// run, and the terminus has no departure of its own.
pub(crate) fn schedule_stops(
    stops: &[LineStop],
    departure: u32,
    platforms: Option<&[Option<String>]>,
) -> Vec<ScheduledStop> {
    let last = stops.len().saturating_sub(1);
    let mut clock = departure;
    stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let platform = platforms
                .and_then(|p| p.get(i).cloned().flatten())
                .or_else(|| stop.platform.clone());
            if i == 0 {
                return ScheduledStop {
                    station_id: stop.station_id.clone(),
                    arrival_min: departure,
                    departure_min: departure,
                    platform,
                };
            }
            clock += stop.journey_min;
            let arrival_min = clock;
            if i < last {
                clock += stop.dwell_min;
            }
            ScheduledStop {
                station_id: stop.station_id.clone(),
                arrival_min,
                departure_min: clock,
                platform,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DaysOfWeek, TrackGraph};
    use crate::test_support::two_platform_network;
    use crate::timetable::tests::line;

    #[test]
    fn test_schedule_accumulates_journeys_and_dwells() {
        let template = line("S1", &[("WEST", None), ("MID", Some("2")), ("EAST", None)]);
        let stops = schedule_stops(&template.stops, 365, None);
        let times: Vec<(u32, u32)> = stops.iter().map(|s| (s.arrival_min, s.departure_min)).collect();
        assert_eq!(times, vec![(365, 365), (369, 370), (374, 374)]);
        assert_eq!(stops[1].platform.as_deref(), Some("2"));
        assert_eq!(374 - 365, template.running_time_min());
    }

    #[test]
    fn test_generate_day_expands_both_directions() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let mut timetable = TimetableSystem::new();
        timetable
            .register_line(&graph, line("S1", &[("WEST", None), ("MID", Some("2")), ("EAST", None)]))
            .expect("valid line");

        // 06:05..07:35 forward, 06:20..07:50 reverse, every 30 minutes
        assert_eq!(timetable.generate_day(Weekday::Mon), 8);
        let entries = timetable.entries();
        let departures: Vec<u32> = entries.iter().map(TimetableEntry::departure_min).collect();
        assert!(departures.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(departures[0], 365);

        let first = &entries[0];
        assert_eq!(first.id, "S1-forward-0605");
        assert_eq!(first.train_number, "S1 0001");
        assert_eq!(first.destination(), Some("EAST"));
        assert_eq!(first.stops[1].platform.as_deref(), Some("2"));

        let reverse = entries
            .iter()
            .find(|e| e.direction == RouteDirection::Reverse)
            .expect("reverse service");
        assert_eq!(reverse.train_number, "S1 0002");
        assert_eq!(reverse.origin(), Some("EAST"));
        assert_eq!(reverse.departure_min(), 380);
        assert_eq!(reverse.arrival_min() - reverse.departure_min(), 9);
    }

    #[test]
    fn test_generate_day_skips_lines_not_running() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let mut weekend = line("S2", &[("WEST", None), ("EAST", None)]);
        weekend.takt.days = DaysOfWeek::SATURDAY | DaysOfWeek::SUNDAY;
        weekend.reverse = false;
        let mut timetable = TimetableSystem::new();
        timetable.register_line(&graph, weekend).expect("valid line");

        assert_eq!(timetable.generate_day(Weekday::Wed), 0);
        assert_eq!(timetable.generate_day(Weekday::Sun), 4);
    }
}
