use chrono::{NaiveTime, Timelike, Weekday};
use crate::constants::MINUTES_PER_DAY;

/// Simulation clock value: seconds since midnight of the simulated day
pub type SimTime = f64;

/// Convert minutes since midnight to simulation seconds
#[must_use]
pub fn minutes_to_seconds(minutes: u32) -> SimTime {
    f64::from(minutes) * 60.0
}

/// Convert simulation seconds to whole minutes since midnight, rounding down
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn seconds_to_minutes(seconds: SimTime) -> u32 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds / 60.0).floor() as u32
}

/// Convert minutes since midnight to a wall-clock time, wrapping past midnight
#[must_use]
pub fn minutes_to_naive_time(minutes: u32) -> NaiveTime {
    let wrapped = minutes % MINUTES_PER_DAY;
    NaiveTime::from_hms_opt(wrapped / 60, wrapped % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// Format minutes since midnight as `HH:MM`
#[must_use]
pub fn format_minutes(minutes: u32) -> String {
    minutes_to_naive_time(minutes).format("%H:%M").to_string()
}

/// Format simulation seconds as `HH:MM:SS`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_sim_time(seconds: SimTime) -> String {
    let total = seconds.max(0.0).floor() as u32;
    let time = NaiveTime::from_hms_opt((total / 3600) % 24, (total / 60) % 60, total % 60)
        .unwrap_or(NaiveTime::MIN);
    time.format("%H:%M:%S").to_string()
}

/// Parse a time string in HH:MM format into minutes since midnight
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a valid time in HH:MM format.
pub fn parse_hhmm(s: &str) -> Result<u32, chrono::ParseError> {
    let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")?;
    Ok(time.hour() * 60 + time.minute())
}

/// Parse a three letter weekday abbreviation (`mon`, `Tue`, ...)
#[must_use]
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    s.trim().parse::<Weekday>().ok()
}
