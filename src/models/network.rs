//! Network model as produced by the offline OSM data build.
//!
//! This is the immutable input to [`super::TrackGraph::build`]. Fields mirror
//! the tags the build pipeline keeps; anything optional falls back to a
//! sensible default during graph construction.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::geometry::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Track,
    Station,
    Stop,
    Signal,
    Switch,
    BufferStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RailwayMode {
    #[default]
    Rail,
    LightRail,
    Tram,
    Subway,
    NarrowGauge,
}

/// OSM `usage=*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackUsage {
    Main,
    Branch,
    Industrial,
    Military,
    Tourism,
}

/// OSM `service=*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackService {
    Siding,
    Yard,
    Spur,
    Crossover,
}

/// Direction relative to an edge's `from → to` orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub platform_ref: Option<String>,
}

impl NetworkNode {
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEdge {
    /// Track id; the reservation granule for both directions of travel
    pub id: String,
    /// Backing OSM way, `None` for synthetic connectors
    #[serde(default)]
    pub way_id: Option<i64>,
    pub from: String,
    pub to: String,
    pub length_m: f64,
    #[serde(default)]
    pub max_speed_forward_kmh: Option<f64>,
    #[serde(default)]
    pub max_speed_backward_kmh: Option<f64>,
    #[serde(default)]
    pub electrified: bool,
    #[serde(default)]
    pub railway: RailwayMode,
    #[serde(default)]
    pub usage: Option<TrackUsage>,
    #[serde(default)]
    pub service: Option<TrackService>,
    #[serde(default)]
    pub geometry: Vec<GeoPoint>,
    #[serde(default)]
    pub is_connector: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopCandidateInput {
    pub node_id: String,
    #[serde(default)]
    pub platform_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStation {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub stop_candidates: Vec<StopCandidateInput>,
}

/// A signal on `track_id` governing trains running in `direction`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalHint {
    pub node_id: String,
    pub track_id: String,
    pub direction: HintDirection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkModel {
    #[serde(default)]
    pub nodes: Vec<NetworkNode>,
    #[serde(default)]
    pub edges: Vec<NetworkEdge>,
    #[serde(default)]
    pub stations: Vec<NetworkStation>,
    #[serde(default)]
    pub signal_hints: Vec<SignalHint>,
}

impl NetworkModel {
    /// Parse a network model from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid network model document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse network model")
    }

    /// Load a network model from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network model {}", path.display()))?;
        Self::from_json_str(&contents)
    }
}
