use log::debug;
use petgraph::algo::astar;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stations::Stations;
use super::TrackGraph;
use crate::models::path::{Path, PathSegment, PathStop};

/// One stop of a multi-stop route request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStop {
    pub station_id: String,
    /// Platform hint, e.g. the timetable's platform column
    #[serde(default)]
    pub platform: Option<String>,
    /// Pin the stop to this node id (a train already standing at a platform)
    #[serde(default)]
    pub fixed_node: Option<String>,
}

impl PlannedStop {
    #[must_use]
    pub fn new(station_id: &str) -> Self {
        Self {
            station_id: station_id.to_string(),
            platform: None,
            fixed_node: None,
        }
    }

    #[must_use]
    pub fn with_platform(station_id: &str, platform: Option<&str>) -> Self {
        Self {
            station_id: station_id.to_string(),
            platform: platform.map(str::to_string),
            fixed_node: None,
        }
    }
}

/// Shortest route between two nodes
#[derive(Debug, Clone)]
struct Leg {
    cost: f64,
    length: f64,
    edges: Vec<EdgeIndex>,
}

/// Filter strictness levels tried in order: platform hint and side, platform
/// hint only, side only, unfiltered
const RELAXATIONS: [(bool, bool); 4] = [(true, true), (true, false), (false, true), (false, false)];

/// Extension trait for route-finding operations on `TrackGraph`
pub trait Routes {
    /// Shortest path between two stations over every pair of their stop
    /// candidates, keeping the shortest successful result. Returns a
    /// not-found path when either station is unknown or no pair connects.
    fn find_path(&self, from_station: &str, to_station: &str) -> Path;

    /// Shortest path between two node ids
    fn find_node_path(&self, from_node: &str, to_node: &str) -> Path;

    /// Path serving `stops` in order, choosing platforms jointly so the train
    /// does not zig-zag between parallel tracks. `destination` drives the
    /// same-side platform filter. Filters are relaxed step by step when the
    /// strict request cannot be routed.
    fn find_multi_stop_path(&self, stops: &[PlannedStop], destination: Option<&str>) -> Path;
}

impl Routes for TrackGraph {
    fn find_path(&self, from_station: &str, to_station: &str) -> Path {
        let (Some(from), Some(to)) = (self.station(from_station), self.station(to_station)) else {
            debug!("find_path: unknown station {from_station} or {to_station}");
            return Path::not_found();
        };

        let mut best: Option<(NodeIndex, NodeIndex, Leg)> = None;
        for origin in from.candidates.iter().filter(|c| self.graph[c.node].degree > 0) {
            for target in to.candidates.iter().filter(|c| self.graph[c.node].degree > 0) {
                let Some(leg) = self.shortest_leg(origin.node, target.node) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(_, _, b)| leg.length < b.length) {
                    best = Some((origin.node, target.node, leg));
                }
            }
        }

        let Some((origin, target, leg)) = best else {
            return Path::not_found();
        };
        let stops = [
            (from_station.to_string(), origin, 0.0),
            (to_station.to_string(), target, leg.length),
        ];
        self.assemble_path(&leg.edges, &stops)
    }

    fn find_node_path(&self, from_node: &str, to_node: &str) -> Path {
        let (Some(from), Some(to)) = (self.node_index(from_node), self.node_index(to_node)) else {
            return Path::not_found();
        };
        match self.shortest_leg(from, to) {
            Some(leg) if !leg.edges.is_empty() => self.assemble_path(&leg.edges, &[]),
            _ => Path::not_found(),
        }
    }

    fn find_multi_stop_path(&self, stops: &[PlannedStop], destination: Option<&str>) -> Path {
        if stops.len() < 2 {
            return Path::not_found();
        }

        #[cfg(feature = "perf_timing")]
        let start = std::time::Instant::now();

        let mut cache: HashMap<(NodeIndex, NodeIndex), Option<Leg>> = HashMap::new();
        let mut tried: Vec<Vec<Vec<NodeIndex>>> = Vec::new();
        let mut result = Path::not_found();

        for (use_platform, use_side) in RELAXATIONS {
            let candidates: Vec<Vec<NodeIndex>> = stops
                .iter()
                .map(|stop| self.stop_candidates(stop, destination, use_platform, use_side))
                .collect();
            if candidates.iter().any(Vec::is_empty) {
                return Path::not_found();
            }
            // Relaxing a filter that never applied yields the same problem
            if tried.contains(&candidates) {
                continue;
            }

            if let Some(path) = self.solve_candidates(stops, &candidates, &mut cache) {
                result = path;
                break;
            }
            debug!(
                "Multi-stop path failed (platform filter: {use_platform}, side filter: {use_side}), relaxing"
            );
            tried.push(candidates);
        }

        #[cfg(feature = "perf_timing")]
        debug!(
            "find_multi_stop_path: {} stops in {:.2}ms",
            stops.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        result
    }
}

impl TrackGraph {
    /// A* over node indices with the routing cost model and a great-circle
    /// distance estimate
    fn shortest_leg(&self, from: NodeIndex, to: NodeIndex) -> Option<Leg> {
        if from == to {
            return Some(Leg { cost: 0.0, length: 0.0, edges: Vec::new() });
        }
        let goal = self.graph[to].position;
        let (cost, nodes) = astar(
            &self.graph,
            from,
            |n| n == to,
            |e| self.edge_cost(e.id()),
            |n| self.graph[n].position.distance_to(&goal) * 0.5,
        )?;

        let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            // Parallel tracks between the same nodes: take the cheapest
            let edge = self
                .graph
                .edges_connecting(pair[0], pair[1])
                .map(|e| e.id())
                .min_by(|a, b| self.edge_cost(*a).total_cmp(&self.edge_cost(*b)))?;
            edges.push(edge);
        }
        let length = edges.iter().map(|&e| self.graph[e].length).sum();
        Some(Leg { cost, length, edges })
    }

    /// Dynamic program over (stop, candidate) choosing the cheapest chain of
    /// legs, then backtracking to the chosen platforms
    fn solve_candidates(
        &self,
        stops: &[PlannedStop],
        candidates: &[Vec<NodeIndex>],
        cache: &mut HashMap<(NodeIndex, NodeIndex), Option<Leg>>,
    ) -> Option<Path> {
        let mut cost: Vec<Vec<f64>> = vec![vec![0.0; candidates[0].len()]];
        let mut parent: Vec<Vec<usize>> = vec![vec![0; candidates[0].len()]];

        for i in 1..candidates.len() {
            let mut row_cost = vec![f64::INFINITY; candidates[i].len()];
            let mut row_parent = vec![0; candidates[i].len()];
            for (k, &to) in candidates[i].iter().enumerate() {
                for (j, &from) in candidates[i - 1].iter().enumerate() {
                    let base = cost[i - 1][j];
                    if !base.is_finite() {
                        continue;
                    }
                    let leg = cache
                        .entry((from, to))
                        .or_insert_with(|| self.shortest_leg(from, to));
                    let Some(leg) = leg else {
                        continue;
                    };
                    let total = base + leg.cost;
                    if total < row_cost[k] {
                        row_cost[k] = total;
                        row_parent[k] = j;
                    }
                }
            }
            if row_cost.iter().all(|c| !c.is_finite()) {
                return None;
            }
            cost.push(row_cost);
            parent.push(row_parent);
        }

        let last = cost.len() - 1;
        let (mut choice, _) = cost[last]
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_finite())
            .min_by(|a, b| a.1.total_cmp(b.1))?;

        let mut chosen = vec![0; candidates.len()];
        for i in (0..candidates.len()).rev() {
            chosen[i] = choice;
            choice = parent[i][choice];
        }

        let mut edges = Vec::new();
        let mut stop_nodes = Vec::with_capacity(stops.len());
        let mut offset = 0.0;
        for (i, stop) in stops.iter().enumerate() {
            let node = candidates[i][chosen[i]];
            if i > 0 {
                let prev = candidates[i - 1][chosen[i - 1]];
                let leg = cache.get(&(prev, node)).cloned().flatten()?;
                offset += leg.length;
                edges.extend(leg.edges);
            }
            stop_nodes.push((stop.station_id.clone(), node, offset));
        }

        Some(self.assemble_path(&edges, &stop_nodes))
    }

    /// Turn an edge sequence into a path with cumulative distances, touched
    /// stations and stop offsets
    fn assemble_path(&self, edges: &[EdgeIndex], stops: &[(String, NodeIndex, f64)]) -> Path {
        let mut segments = Vec::with_capacity(edges.len());
        let mut distance = 0.0;
        for &edge in edges {
            let Some((from, to)) = self.graph.edge_endpoints(edge) else {
                return Path::not_found();
            };
            let weight = &self.graph[edge];
            segments.push(PathSegment {
                from_node: self.graph[from].id.clone(),
                to_node: self.graph[to].id.clone(),
                from_index: from,
                to_index: to,
                edge,
                track_id: weight.track_id.clone(),
                section_id: weight.section_id.clone(),
                section_direction: weight.section_direction,
                from_interlocking: self.graph[from].is_interlocking(),
                length: weight.length,
                start_distance: distance,
                end_distance: distance + weight.length,
                max_speed: weight.max_speed,
            });
            distance += weight.length;
        }

        let mut station_ids: Vec<String> = Vec::new();
        let mut touch = |node: NodeIndex| {
            if let Some(station) = self.station_of_node(node) {
                if station_ids.last().is_none_or(|last| last != station) {
                    station_ids.push(station.to_string());
                }
            }
        };
        match (segments.first(), stops.first()) {
            (Some(first), _) => touch(first.from_index),
            (None, Some((_, node, _))) => touch(*node),
            (None, None) => {}
        }
        for segment in &segments {
            touch(segment.to_index);
        }

        let stops = stops
            .iter()
            .map(|(station_id, node, offset)| PathStop {
                station_id: station_id.clone(),
                node_id: self.graph[*node].id.clone(),
                platform_ref: self
                    .station(station_id)
                    .and_then(|s| s.candidate_for_node(*node))
                    .and_then(|c| c.platform_ref.clone())
                    .or_else(|| self.graph[*node].platform_ref.clone()),
                offset: *offset,
            })
            .collect();

        Path {
            found: true,
            segments,
            total_length: distance,
            station_ids,
            stops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::NodeKind;
    use crate::test_support::{line_network, two_platform_network};

    fn assert_continuous(path: &Path) {
        let sum: f64 = path.segments.iter().map(|s| s.length).sum();
        assert!((sum - path.total_length).abs() < 1e-9);
        for pair in path.segments.windows(2) {
            assert_eq!(pair[0].to_node, pair[1].from_node);
            assert!((pair[0].end_distance - pair[1].start_distance).abs() < 1e-9);
        }
    }

    #[test]
    fn test_find_path_between_stations() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let path = graph.find_path("STA_A", "STA_B");
        assert!(path.found);
        assert_eq!(path.node_ids(), vec!["A", "M", "B"]);
        assert_eq!(path.total_length, 200.0);
        assert_eq!(path.station_ids, vec!["STA_A", "STA_B"]);
        assert_continuous(&path);
    }

    #[test]
    fn test_find_path_unknown_station_is_not_found() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let path = graph.find_path("STA_A", "NOWHERE");
        assert!(!path.found);
        assert!(path.segments.is_empty());
    }

    #[test]
    fn test_find_path_disconnected_is_not_found() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        // NORTH's only stop has no track
        assert!(!graph.find_path("WEST", "NORTH").found);
    }

    #[test]
    fn test_find_node_path() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let path = graph.find_node_path("B", "A");
        assert!(path.found);
        assert_eq!(path.node_ids(), vec!["B", "M", "A"]);
        assert!(!graph.find_node_path("A", "A").found);
    }

    #[test]
    fn test_multi_stop_respects_platform_hint() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let stops = vec![
            PlannedStop::new("WEST"),
            PlannedStop::with_platform("MID", Some("2")),
            PlannedStop::new("EAST"),
        ];
        let path = graph.find_multi_stop_path(&stops, Some("EAST"));
        assert!(path.found);
        assert_eq!(path.stops[1].node_id, "MID_2");
        assert_eq!(path.stops[1].platform_ref.as_deref(), Some("2"));
        assert!(path.node_ids().contains(&"MID_2"));
        assert_continuous(&path);
    }

    #[test]
    fn test_multi_stop_stop_offsets_are_monotonic() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let stops = vec![PlannedStop::new("WEST"), PlannedStop::new("MID"), PlannedStop::new("EAST")];
        let path = graph.find_multi_stop_path(&stops, Some("EAST"));
        assert!(path.found);
        assert_eq!(path.stops.len(), 3);
        assert_eq!(path.stops[0].offset, 0.0);
        assert!(path.stops[1].offset > 0.0);
        assert!((path.stops[2].offset - path.total_length).abs() < 1e-9);
        assert_eq!(path.station_ids, vec!["WEST", "MID", "EAST"]);
    }

    #[test]
    fn test_multi_stop_relaxes_unroutable_platform_hint() {
        let mut model = two_platform_network();
        // Platform 2 becomes a stub cut off from the running lines
        model.edges.retain(|e| e.id != "s1" && e.id != "s2");
        model.nodes.push(crate::test_support::node("STUB", -0.0004, 0.004, NodeKind::Track));
        model.edges.push(crate::test_support::edge("stub", "MID_2", "STUB", 50.0));
        let graph = TrackGraph::build(&model).expect("valid network");
        let stops = vec![
            PlannedStop::new("WEST"),
            PlannedStop::with_platform("MID", Some("2")),
            PlannedStop::new("EAST"),
        ];
        let path = graph.find_multi_stop_path(&stops, Some("EAST"));
        assert!(path.found);
        assert_eq!(path.stops[1].node_id, "MID_1");
        assert_continuous(&path);
    }

    #[test]
    fn test_multi_stop_requires_two_stops() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        assert!(!graph.find_multi_stop_path(&[PlannedStop::new("STA_A")], None).found);
    }

    #[test]
    fn test_multi_stop_unknown_station_is_not_found() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let stops = vec![PlannedStop::new("STA_A"), PlannedStop::new("NOWHERE")];
        assert!(!graph.find_multi_stop_path(&stops, None).found);
    }

    #[test]
    fn test_multi_stop_paths_always_continuous() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let requests = [
            vec!["WEST", "EAST"],
            vec!["EAST", "MID", "WEST"],
            vec!["WEST", "MID", "EAST"],
            vec!["MID", "EAST"],
        ];
        for request in requests {
            let stops: Vec<PlannedStop> = request.iter().map(|s| PlannedStop::new(s)).collect();
            let path = graph.find_multi_stop_path(&stops, request.last().copied());
            assert!(path.found, "{request:?}");
            assert_continuous(&path);
        }
    }
}
