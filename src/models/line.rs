use serde::{Deserialize, Serialize};

use super::DaysOfWeek;
use crate::constants::MINUTES_PER_DAY;

/// Travel direction of a service along its line template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDirection {
    Forward,
    Reverse,
}

impl RouteDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RouteDirection::Forward => "forward",
            RouteDirection::Reverse => "reverse",
        }
    }
}

/// One stop of a line template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStop {
    pub station_id: String,
    #[serde(default)]
    pub platform: Option<String>,
    /// Minutes from the previous stop's departure to arrival here (0 at the origin)
    #[serde(default)]
    pub journey_min: u32,
    /// Minutes spent at this stop
    #[serde(default)]
    pub dwell_min: u32,
}

/// Clockface interval pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaktPattern {
    pub first_hour: u32,
    /// Last hour in which a departure may start (inclusive)
    pub last_hour: u32,
    pub interval_min: u32,
    /// Minute of the first hour at which the first forward departure leaves
    #[serde(default)]
    pub departure_minute: u32,
    #[serde(default)]
    pub days: DaysOfWeek,
}

impl TaktPattern {
    /// Departure minutes (since midnight) of the pattern starting at `minute`
    #[must_use]
    pub fn departures_from(&self, minute: u32) -> Vec<u32> {
        if self.interval_min == 0 {
            return Vec::new();
        }
        let first = self.first_hour * 60 + minute;
        let last = (self.last_hour * 60 + 59).min(MINUTES_PER_DAY - 1);
        (first..=last).step_by(self.interval_min as usize).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTemplate {
    pub id: String,
    pub name: String,
    /// Id into the configured train type catalogue
    pub train_type: String,
    #[serde(default = "default_unit_count")]
    pub unit_count: u32,
    pub stops: Vec<LineStop>,
    pub takt: TaktPattern,
    /// Also run the stops in reverse order
    #[serde(default = "default_reverse")]
    pub reverse: bool,
    /// Minute of the first hour for the reverse pattern, defaults to the forward one
    #[serde(default)]
    pub reverse_departure_minute: Option<u32>,
    #[serde(default = "default_train_number_format")]
    pub train_number_format: String,
}

fn default_unit_count() -> u32 {
    1
}

fn default_reverse() -> bool {
    true
}

fn default_train_number_format() -> String {
    "{line} {seq:04}".to_string()
}

impl LineTemplate {
    /// Check that the template can generate a timetable
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first problem found
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Line id must not be empty".to_string());
        }
        if self.stops.len() < 2 {
            return Err(format!("Line {} needs at least two stops", self.id));
        }
        if self.unit_count == 0 {
            return Err(format!("Line {} must run at least one unit", self.id));
        }
        if self.takt.interval_min == 0 {
            return Err(format!("Line {} has a zero interval", self.id));
        }
        if self.takt.first_hour > self.takt.last_hour || self.takt.last_hour > 23 {
            return Err(format!(
                "Line {} has an invalid operating window {}..{}",
                self.id, self.takt.first_hour, self.takt.last_hour
            ));
        }
        if self.takt.departure_minute > 59 || self.reverse_departure_minute.is_some_and(|m| m > 59) {
            return Err(format!("Line {} has a departure minute outside 0..59", self.id));
        }
        if let Some(pos) = self
            .stops
            .windows(2)
            .position(|w| w[0].station_id == w[1].station_id)
        {
            return Err(format!(
                "Line {} stops twice in a row at {}",
                self.id,
                self.stops[pos].station_id
            ));
        }
        Ok(())
    }

    /// Stops in travel order for a direction. Reverse journeys mirror the
    /// forward journey times so each leg takes as long in both directions.
    #[must_use]
    pub fn stops_for(&self, direction: RouteDirection) -> Vec<LineStop> {
        match direction {
            RouteDirection::Forward => self.stops.clone(),
            RouteDirection::Reverse => {
                let mut reversed: Vec<LineStop> = self.stops.iter().rev().cloned().collect();
                // Leg i of the reverse run is leg (n - i) of the forward run
                let forward_legs: Vec<u32> = self.stops.iter().map(|s| s.journey_min).collect();
                let n = reversed.len();
                for (i, stop) in reversed.iter_mut().enumerate() {
                    stop.journey_min = if i == 0 { 0 } else { forward_legs[n - i] };
                }
                reversed
            }
        }
    }

    /// Minutes from origin departure to final arrival
    #[must_use]
    pub fn running_time_min(&self) -> u32 {
        let legs: u32 = self.stops.iter().skip(1).map(|s| s.journey_min).sum();
        let dwells: u32 = self
            .stops
            .iter()
            .skip(1)
            .take(self.stops.len().saturating_sub(2))
            .map(|s| s.dwell_min)
            .sum();
        legs + dwells
    }

    /// Directions this line runs in
    #[must_use]
    pub fn directions(&self) -> Vec<RouteDirection> {
        if self.reverse {
            vec![RouteDirection::Forward, RouteDirection::Reverse]
        } else {
            vec![RouteDirection::Forward]
        }
    }

    /// Departure minutes of the pattern in one direction
    #[must_use]
    pub fn departures(&self, direction: RouteDirection) -> Vec<u32> {
        let minute = match direction {
            RouteDirection::Forward => self.takt.departure_minute,
            RouteDirection::Reverse => self
                .reverse_departure_minute
                .unwrap_or(self.takt.departure_minute),
        };
        self.takt.departures_from(minute)
    }

    /// Final station in a direction
    #[must_use]
    pub fn terminus(&self, direction: RouteDirection) -> Option<&str> {
        match direction {
            RouteDirection::Forward => self.stops.last(),
            RouteDirection::Reverse => self.stops.first(),
        }
        .map(|s| s.station_id.as_str())
    }

    #[must_use]
    pub fn train_number(&self, seq: u32) -> String {
        format_train_number(&self.train_number_format, &self.name, seq)
    }
}

/// Expand `{line}`, `{seq}` and zero-padded `{seq:0N}` placeholders
#[must_use]
pub fn format_train_number(format: &str, line: &str, seq: u32) -> String {
    let mut out = String::with_capacity(format.len() + line.len());
    let mut rest = format;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let placeholder = &rest[open + 1..open + close];
        match placeholder {
            "line" => out.push_str(line),
            "seq" => out.push_str(&seq.to_string()),
            p if p.starts_with("seq:0") => {
                let width = p["seq:0".len()..].parse::<usize>().unwrap_or(0);
                out.push_str(&format!("{seq:0width$}"));
            }
            other => {
                out.push('{');
                out.push_str(other);
                out.push('}');
            }
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}
