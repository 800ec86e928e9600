use chrono::Weekday;
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DaysOfWeek: u8 {
        const MONDAY    = 0b0000_0001;
        const TUESDAY   = 0b0000_0010;
        const WEDNESDAY = 0b0000_0100;
        const THURSDAY  = 0b0000_1000;
        const FRIDAY    = 0b0001_0000;
        const SATURDAY  = 0b0010_0000;
        const SUNDAY    = 0b0100_0000;
        const ALL_DAYS  = Self::MONDAY.bits() | Self::TUESDAY.bits() | Self::WEDNESDAY.bits()
                        | Self::THURSDAY.bits() | Self::FRIDAY.bits() | Self::SATURDAY.bits()
                        | Self::SUNDAY.bits();
        const WEEKDAYS  = Self::MONDAY.bits() | Self::TUESDAY.bits() | Self::WEDNESDAY.bits()
                        | Self::THURSDAY.bits() | Self::FRIDAY.bits();
        const WEEKENDS  = Self::SATURDAY.bits() | Self::SUNDAY.bits();
    }
}

impl Default for DaysOfWeek {
    fn default() -> Self {
        Self::ALL_DAYS
    }
}

impl DaysOfWeek {
    /// Mask bit for a calendar weekday
    #[must_use]
    pub const fn from_weekday(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::MONDAY,
            Weekday::Tue => Self::TUESDAY,
            Weekday::Wed => Self::WEDNESDAY,
            Weekday::Thu => Self::THURSDAY,
            Weekday::Fri => Self::FRIDAY,
            Weekday::Sat => Self::SATURDAY,
            Weekday::Sun => Self::SUNDAY,
        }
    }

    /// Whether a service with this mask operates on `day`
    #[must_use]
    pub fn runs_on(self, day: Weekday) -> bool {
        self.contains(Self::from_weekday(day))
    }
}

// Custom serialization to store as u8
impl Serialize for DaysOfWeek {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for DaysOfWeek {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Self::from_bits(bits).ok_or_else(|| serde::de::Error::custom("Invalid DaysOfWeek bits"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_every_day() {
        let days = DaysOfWeek::default();
        assert_eq!(days, DaysOfWeek::ALL_DAYS);
        assert!(days.runs_on(Weekday::Mon) && days.runs_on(Weekday::Sun));
    }

    #[test]
    fn test_runs_on_weekday() {
        let days = DaysOfWeek::WEEKDAYS;
        assert!(days.runs_on(Weekday::Mon));
        assert!(days.runs_on(Weekday::Fri));
        assert!(!days.runs_on(Weekday::Sat));
        assert!(DaysOfWeek::WEEKENDS.runs_on(Weekday::Sun));
        assert!(!DaysOfWeek::WEEKENDS.runs_on(Weekday::Wed));
        assert_eq!(DaysOfWeek::from_weekday(Weekday::Wed), DaysOfWeek::WEDNESDAY);
    }

    #[test]
    fn test_serialized_as_bitmask() {
        let days = DaysOfWeek::MONDAY | DaysOfWeek::FRIDAY;
        assert_eq!(serde_json::to_string(&days).expect("serialize"), "17");
        let parsed: DaysOfWeek = serde_json::from_str("96").expect("deserialize");
        assert_eq!(parsed, DaysOfWeek::WEEKENDS);
        assert!(serde_json::from_str::<DaysOfWeek>("128").is_err());
    }
}
