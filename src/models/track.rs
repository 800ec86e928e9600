use serde::{Deserialize, Serialize};
use crate::geometry::GeoPoint;
use super::network::{RailwayMode, TrackService, TrackUsage};

/// Direction of travel relative to a reference orientation (a physical track's
/// `from → to`, or a section's canonical chain order)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TravelDirection {
    Forward,
    Backward,
}

impl TravelDirection {
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            TravelDirection::Forward => TravelDirection::Backward,
            TravelDirection::Backward => TravelDirection::Forward,
        }
    }

    /// Compose two relative directions: travelling `self` along a track whose
    /// orientation is `other` relative to some reference
    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        if self == other {
            TravelDirection::Forward
        } else {
            TravelDirection::Backward
        }
    }
}

/// One directed link of the track graph. A physical track yields two of
/// these sharing `track_id` and geometry (reversed for the backward one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEdge {
    pub track_id: String,
    pub way_id: Option<i64>,
    pub length: f64,
    /// Line speed for this direction in m/s
    pub max_speed: f64,
    pub electrified: bool,
    pub railway: RailwayMode,
    pub usage: Option<TrackUsage>,
    pub service: Option<TrackService>,
    /// Polyline oriented in this edge's direction of travel
    pub geometry: Vec<GeoPoint>,
    pub is_connector: bool,
    /// Direction relative to the physical track's `from → to`
    pub direction: TravelDirection,
    pub section_id: String,
    /// Direction relative to the section's canonical orientation
    pub section_direction: TravelDirection,
    /// Travel direction relative to the track implied by signal tagging
    pub signalled_direction: Option<TravelDirection>,
}

impl TrackEdge {
    /// Usage/service tags mark this as something other than a running line
    #[must_use]
    pub fn is_non_main(&self) -> bool {
        self.service.is_some()
            || matches!(
                self.usage,
                Some(TrackUsage::Industrial | TrackUsage::Military | TrackUsage::Tourism)
            )
    }

    /// Travelling this edge opposes the direction signals are set up for
    #[must_use]
    pub fn opposes_signalling(&self) -> bool {
        self.signalled_direction
            .is_some_and(|signalled| signalled != self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> TrackEdge {
        TrackEdge {
            track_id: "t1".to_string(),
            way_id: Some(1),
            length: 100.0,
            max_speed: 20.0,
            electrified: false,
            railway: RailwayMode::Rail,
            usage: Some(TrackUsage::Main),
            service: None,
            geometry: Vec::new(),
            is_connector: false,
            direction: TravelDirection::Forward,
            section_id: "t1".to_string(),
            section_direction: TravelDirection::Forward,
            signalled_direction: None,
        }
    }

    #[test]
    fn test_direction_reversed() {
        assert_eq!(TravelDirection::Forward.reversed(), TravelDirection::Backward);
        assert_eq!(TravelDirection::Backward.reversed(), TravelDirection::Forward);
    }

    #[test]
    fn test_direction_compose() {
        use TravelDirection::{Backward, Forward};
        assert_eq!(Forward.compose(Forward), Forward);
        assert_eq!(Backward.compose(Backward), Forward);
        assert_eq!(Forward.compose(Backward), Backward);
        assert_eq!(Backward.compose(Forward), Backward);
    }

    #[test]
    fn test_non_main_classification() {
        let mut e = edge();
        assert!(!e.is_non_main());
        e.service = Some(TrackService::Yard);
        assert!(e.is_non_main());
        e.service = None;
        e.usage = Some(TrackUsage::Industrial);
        assert!(e.is_non_main());
        e.usage = None;
        assert!(!e.is_non_main());
    }

    #[test]
    fn test_opposes_signalling() {
        let mut e = edge();
        assert!(!e.opposes_signalling());
        e.signalled_direction = Some(TravelDirection::Forward);
        assert!(!e.opposes_signalling());
        e.direction = TravelDirection::Backward;
        assert!(e.opposes_signalling());
    }
}
