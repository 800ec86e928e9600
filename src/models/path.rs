use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use crate::geometry::GeoPoint;
use super::track::TravelDirection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub from_node: String,
    pub to_node: String,
    #[serde(skip)]
    pub from_index: NodeIndex,
    #[serde(skip)]
    pub to_index: NodeIndex,
    #[serde(skip)]
    pub edge: EdgeIndex,
    /// Block id (shared by both directions of a physical track)
    pub track_id: String,
    pub section_id: String,
    pub section_direction: TravelDirection,
    /// The node this segment leaves from needs exclusive transit
    pub from_interlocking: bool,
    pub length: f64,
    /// Cumulative distance from path start to `from_node`
    pub start_distance: f64,
    /// Cumulative distance from path start to `to_node`
    pub end_distance: f64,
    /// m/s
    pub max_speed: f64,
}

/// A served stop along a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStop {
    pub station_id: String,
    pub node_id: String,
    pub platform_ref: Option<String>,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Path {
    pub found: bool,
    pub segments: Vec<PathSegment>,
    pub total_length: f64,
    /// Stations whose stop nodes the path touches, in order
    pub station_ids: Vec<String>,
    /// Planned stops and where they lie along the path
    pub stops: Vec<PathStop>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPosition {
    pub position: GeoPoint,
    /// Degrees, 0 = north, clockwise
    pub heading_deg: f64,
    pub segment_index: usize,
}

impl Path {
    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the segment containing `offset`. An offset exactly on a
    /// boundary belongs to the segment that starts there; offsets outside the
    /// path clamp to the first/last segment.
    #[must_use]
    pub fn segment_index_at(&self, offset: f64) -> Option<usize> {
        if self.segments.is_empty() {
            return None;
        }
        let idx = self
            .segments
            .partition_point(|s| s.end_distance <= offset)
            .min(self.segments.len() - 1);
        Some(idx)
    }

    /// Node ids along the path, starting with the first segment's origin
    #[must_use]
    pub fn node_ids(&self) -> Vec<&str> {
        let mut nodes = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            nodes.push(first.from_node.as_str());
        }
        nodes.extend(self.segments.iter().map(|s| s.to_node.as_str()));
        nodes
    }

    #[must_use]
    pub fn first_node(&self) -> Option<&str> {
        self.segments.first().map(|s| s.from_node.as_str())
    }

    #[must_use]
    pub fn last_node(&self) -> Option<&str> {
        self.segments.last().map(|s| s.to_node.as_str())
    }

    /// Offset of the planned stop at `index`, if the path serves it
    #[must_use]
    pub fn stop_offset(&self, index: usize) -> Option<f64> {
        self.stops.get(index).map(|s| s.offset)
    }
}
