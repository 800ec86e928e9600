//! Directed track multigraph built from a [`NetworkModel`].
//!
//! Every physical track becomes two [`TrackEdge`]s (forward and backward)
//! sharing the track id and geometry. Node and track ids from the input are
//! interned to petgraph indices; the string ids stay the public currency of
//! paths and reservations.

mod costs;
mod positions;
mod routes;
mod sections;
mod stations;

pub use positions::Positions;
pub use routes::{PlannedStop, Routes};
pub use stations::Stations;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use log::info;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::constants::{kmh_to_ms, DEFAULT_LINE_SPEED_KMH};
use crate::geometry::{centroid, GeoPoint};
use super::network::{HintDirection, NetworkModel, NodeKind, RailwayMode};
use super::node::TrackNode;
use super::station::{PlatformSide, Station, StopCandidate};
use super::track::{TrackEdge, TravelDirection};

#[derive(Debug, Clone)]
pub struct TrackGraph {
    pub graph: DiGraph<TrackNode, TrackEdge>,
    node_index: HashMap<String, NodeIndex>,
    stations: IndexMap<String, Station>,
    node_station: HashMap<NodeIndex, String>,
    /// Physical track id → (forward edge, backward edge)
    tracks: HashMap<String, (EdgeIndex, EdgeIndex)>,
    primary_mode: RailwayMode,
}

impl TrackGraph {
    /// Build the graph, rejecting dangling references and malformed tracks
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate ids, references to unknown nodes, tracks,
    /// or stations, and non-positive or non-finite track lengths.
    pub fn build(model: &NetworkModel) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(model.nodes.len(), model.edges.len() * 2);
        let mut node_index = HashMap::with_capacity(model.nodes.len());

        for node in &model.nodes {
            if node_index.contains_key(&node.id) {
                bail!("Duplicate node id {}", node.id);
            }
            let idx = graph.add_node(TrackNode {
                id: node.id.clone(),
                position: node.position(),
                kind: node.kind,
                degree: 0,
                station_id: node.station_id.clone(),
                station_name: node.station_name.clone(),
                platform_ref: node.platform_ref.clone(),
            });
            node_index.insert(node.id.clone(), idx);
        }

        let mut tracks = HashMap::with_capacity(model.edges.len());
        for edge in &model.edges {
            if tracks.contains_key(&edge.id) {
                bail!("Duplicate track id {}", edge.id);
            }
            let Some(&from) = node_index.get(&edge.from) else {
                bail!("Track {} references unknown node {}", edge.id, edge.from);
            };
            let Some(&to) = node_index.get(&edge.to) else {
                bail!("Track {} references unknown node {}", edge.id, edge.to);
            };
            if from == to {
                bail!("Track {} is a loop on node {}", edge.id, edge.from);
            }
            if !edge.length_m.is_finite() || edge.length_m <= 0.0 {
                bail!("Track {} has invalid length {}", edge.id, edge.length_m);
            }

            let geometry = if edge.geometry.len() >= 2 {
                edge.geometry.clone()
            } else {
                vec![graph[from].position, graph[to].position]
            };
            let forward_speed = edge.max_speed_forward_kmh.unwrap_or(DEFAULT_LINE_SPEED_KMH);
            let backward_speed = edge.max_speed_backward_kmh.unwrap_or(forward_speed);

            let forward = TrackEdge {
                track_id: edge.id.clone(),
                way_id: if edge.is_connector { None } else { edge.way_id },
                length: edge.length_m,
                max_speed: kmh_to_ms(forward_speed),
                electrified: edge.electrified,
                railway: edge.railway,
                usage: edge.usage,
                service: edge.service,
                geometry: geometry.clone(),
                is_connector: edge.is_connector,
                direction: TravelDirection::Forward,
                section_id: edge.id.clone(),
                section_direction: TravelDirection::Forward,
                signalled_direction: None,
            };
            let mut backward = forward.clone();
            backward.max_speed = kmh_to_ms(backward_speed);
            backward.geometry = geometry.into_iter().rev().collect();
            backward.direction = TravelDirection::Backward;
            backward.section_direction = TravelDirection::Backward;

            let f = graph.add_edge(from, to, forward);
            let b = graph.add_edge(to, from, backward);
            graph[from].degree += 1;
            graph[to].degree += 1;
            tracks.insert(edge.id.clone(), (f, b));
        }

        let mut graph = Self {
            graph,
            node_index,
            stations: IndexMap::new(),
            node_station: HashMap::new(),
            tracks,
            primary_mode: RailwayMode::Rail,
        };

        graph.apply_signal_hints(model)?;
        graph.assign_sections();
        graph.build_stations(model)?;

        info!(
            "Built track graph: {} nodes, {} tracks, {} stations",
            graph.graph.node_count(),
            graph.tracks.len(),
            graph.stations.len()
        );

        Ok(graph)
    }

    fn apply_signal_hints(&mut self, model: &NetworkModel) -> Result<()> {
        let mut hinted: HashMap<&str, HashSet<TravelDirection>> = HashMap::new();
        for hint in &model.signal_hints {
            if !self.node_index.contains_key(&hint.node_id) {
                bail!("Signal hint references unknown node {}", hint.node_id);
            }
            if !self.tracks.contains_key(&hint.track_id) {
                bail!("Signal hint references unknown track {}", hint.track_id);
            }
            let direction = match hint.direction {
                HintDirection::Forward => TravelDirection::Forward,
                HintDirection::Backward => TravelDirection::Backward,
            };
            hinted.entry(hint.track_id.as_str()).or_default().insert(direction);
        }

        for (track_id, directions) in hinted {
            // Signals facing both ways say nothing about a preferred direction
            if directions.len() != 1 {
                continue;
            }
            let Some(&direction) = directions.iter().next() else {
                continue;
            };
            if let Some(&(f, b)) = self.tracks.get(track_id) {
                self.graph[f].signalled_direction = Some(direction);
                self.graph[b].signalled_direction = Some(direction);
            }
        }
        Ok(())
    }

    fn build_stations(&mut self, model: &NetworkModel) -> Result<()> {
        for input in &model.stations {
            if self.stations.contains_key(&input.id) {
                bail!("Duplicate station id {}", input.id);
            }

            let mut candidates = Vec::with_capacity(input.stop_candidates.len());
            for candidate in &input.stop_candidates {
                let Some(&node) = self.node_index.get(&candidate.node_id) else {
                    bail!("Station {} references unknown stop node {}", input.id, candidate.node_id);
                };
                if candidates.iter().any(|c: &StopCandidate| c.node == node) {
                    continue;
                }
                let platform_ref = candidate
                    .platform_ref
                    .clone()
                    .or_else(|| self.graph[node].platform_ref.clone());
                candidates.push(StopCandidate {
                    node,
                    node_id: candidate.node_id.clone(),
                    platform_ref,
                    side: None,
                });
            }

            self.stations.insert(
                input.id.clone(),
                Station {
                    id: input.id.clone(),
                    name: input.name.clone(),
                    position: GeoPoint::new(input.lat, input.lon),
                    centroid: GeoPoint::new(input.lat, input.lon),
                    candidates,
                    primary_stop: None,
                    axis: None,
                },
            );
        }

        // Stop nodes tagged with a station they are not yet listed under
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let Some(station_id) = node.station_id.clone() else {
                continue;
            };
            let Some(station) = self.stations.get_mut(&station_id) else {
                bail!("Node {} references unknown station {}", node.id, station_id);
            };
            if node.kind == NodeKind::Stop && station.candidate_for_node(idx).is_none() {
                station.candidates.push(StopCandidate {
                    node: idx,
                    node_id: node.id.clone(),
                    platform_ref: node.platform_ref.clone(),
                    side: None,
                });
            }
        }

        let station_ids: Vec<String> = self.stations.keys().cloned().collect();
        for station_id in station_ids {
            self.finish_station(&station_id);
        }
        Ok(())
    }

    /// Fill in primary stop, axis, candidate sides and node associations
    fn finish_station(&mut self, station_id: &str) {
        let Some(station) = self.stations.get(station_id) else {
            return;
        };
        let nodes: Vec<NodeIndex> = station.candidates.iter().map(|c| c.node).collect();
        let primary_stop = nodes.iter().copied().find(|&n| self.graph[n].degree > 0);
        let axis = self.compute_station_axis(&nodes);
        let name = station.name.clone();

        for &node in &nodes {
            self.node_station.entry(node).or_insert_with(|| station_id.to_string());
            let track_node = &mut self.graph[node];
            if track_node.station_id.is_none() {
                track_node.station_id = Some(station_id.to_string());
            }
            if track_node.station_name.is_none() {
                track_node.station_name = Some(name.clone());
            }
        }

        let positions: Vec<GeoPoint> = nodes.iter().map(|&n| self.graph[n].position).collect();
        let usable: Vec<GeoPoint> = nodes
            .iter()
            .filter(|&&n| self.graph[n].degree > 0)
            .map(|&n| self.graph[n].position)
            .collect();
        if let Some(station) = self.stations.get_mut(station_id) {
            let origin = centroid(&usable).unwrap_or(station.position);
            station.centroid = origin;
            station.primary_stop = primary_stop;
            station.axis = axis;
            for (candidate, position) in station.candidates.iter_mut().zip(positions) {
                candidate.side = axis.and_then(|a| PlatformSide::classify(a, position.to_local(&origin)));
            }
        }
    }

    pub fn set_primary_mode(&mut self, mode: RailwayMode) {
        self.primary_mode = mode;
    }

    #[must_use]
    pub fn primary_mode(&self) -> RailwayMode {
        self.primary_mode
    }

    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&TrackNode> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    #[must_use]
    pub fn node_at(&self, idx: NodeIndex) -> Option<&TrackNode> {
        self.graph.node_weight(idx)
    }

    #[must_use]
    pub fn edge_at(&self, idx: EdgeIndex) -> Option<&TrackEdge> {
        self.graph.edge_weight(idx)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges (twice the number of physical tracks)
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Forward and backward directed edges of a physical track
    #[must_use]
    pub fn track_edges(&self, track_id: &str) -> Option<(EdgeIndex, EdgeIndex)> {
        self.tracks.get(track_id).copied()
    }

    #[must_use]
    pub fn is_interlocking(&self, idx: NodeIndex) -> bool {
        self.graph.node_weight(idx).is_some_and(TrackNode::is_interlocking)
    }

    /// Station served by a stop node, if any
    #[must_use]
    pub fn station_of_node(&self, idx: NodeIndex) -> Option<&str> {
        self.node_station.get(&idx).map(String::as_str)
    }

    /// Ids of all physical tracks touching a node
    #[must_use]
    pub fn tracks_at_node(&self, idx: NodeIndex) -> Vec<String> {
        let mut ids: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().track_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// All nodes tagged as signals
    pub fn signals(&self) -> impl Iterator<Item = &TrackNode> {
        self.graph.node_weights().filter(|n| n.is_signal())
    }

    /// Graph neighbours of a node (each distinct node once)
    #[must_use]
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
