use serde::{Deserialize, Serialize};
use crate::geometry::GeoPoint;
use super::network::NodeKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackNode {
    pub id: String,
    pub position: GeoPoint,
    pub kind: NodeKind,
    /// Number of incident physical tracks, filled in during graph build
    pub degree: usize,
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub platform_ref: Option<String>,
}

impl TrackNode {
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.station_name, &self.platform_ref) {
            (Some(name), Some(platform)) => format!("{name} ({platform})"),
            (Some(name), None) => name.clone(),
            _ => self.id.clone(),
        }
    }

    /// Switches and any node where three or more tracks meet need exclusive transit
    #[must_use]
    pub fn is_interlocking(&self) -> bool {
        self.kind == NodeKind::Switch || self.degree >= 3
    }

    #[must_use]
    pub fn is_signal(&self) -> bool {
        self.kind == NodeKind::Signal
    }
}
