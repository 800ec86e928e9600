use petgraph::graph::NodeIndex;

use super::routes::PlannedStop;
use super::TrackGraph;
use crate::constants::MAX_STOP_CANDIDATES;
use crate::geometry::{dot, normalize};
use crate::models::station::{Station, StopCandidate};

/// Extension trait for station-related operations on `TrackGraph`
pub trait Stations {
    /// Get station by id
    fn station(&self, id: &str) -> Option<&Station>;

    /// All stations in input order
    fn stations(&self) -> Vec<&Station>;

    /// Display name of a station, falling back to its id
    fn station_name<'a>(&'a self, id: &'a str) -> &'a str;

    /// Candidate stop nodes for a planned stop.
    ///
    /// Candidates are filtered by platform hint (when `use_platform`) and then
    /// by lying on the same side of the station axis as `destination` (when
    /// `use_side`). A filter that would leave nothing is skipped. Returns an
    /// empty list for unknown stations or stations without usable stops.
    fn stop_candidates(
        &self,
        stop: &PlannedStop,
        destination: Option<&str>,
        use_platform: bool,
        use_side: bool,
    ) -> Vec<NodeIndex>;
}

impl Stations for TrackGraph {
    fn station(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    fn stations(&self) -> Vec<&Station> {
        self.stations.values().collect()
    }

    fn station_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.stations.get(id).map_or(id, |s| s.name.as_str())
    }

    fn stop_candidates(
        &self,
        stop: &PlannedStop,
        destination: Option<&str>,
        use_platform: bool,
        use_side: bool,
    ) -> Vec<NodeIndex> {
        if let Some(node_id) = &stop.fixed_node {
            return self.node_index(node_id).into_iter().collect();
        }

        let Some(station) = self.station(&stop.station_id) else {
            return Vec::new();
        };

        let usable: Vec<&StopCandidate> = station
            .candidates
            .iter()
            .filter(|c| self.graph[c.node].degree > 0)
            .collect();

        let mut selected = usable;

        if use_platform {
            if let Some(hint) = stop.platform.as_deref() {
                let matching: Vec<&StopCandidate> =
                    selected.iter().copied().filter(|c| c.matches_platform(hint)).collect();
                if !matching.is_empty() {
                    selected = matching;
                }
            }
        }

        if use_side {
            let target_side = destination
                .filter(|&d| d != station.id)
                .and_then(|d| self.station(d))
                .and_then(|d| station.side_of(&d.position));
            if let Some(side) = target_side {
                let same_side: Vec<&StopCandidate> =
                    selected.iter().copied().filter(|c| c.side == Some(side)).collect();
                if !same_side.is_empty() {
                    selected = same_side;
                }
            }
        }

        selected.into_iter().take(MAX_STOP_CANDIDATES).map(|c| c.node).collect()
    }
}

impl TrackGraph {
    /// Average direction of the tracks at a station's stop nodes, as a unit
    /// vector in the station's local plane. Vectors pointing against the
    /// first one found are flipped so opposite neighbours reinforce instead
    /// of cancelling.
    pub(super) fn compute_station_axis(&self, stops: &[NodeIndex]) -> Option<(f64, f64)> {
        let mut reference: Option<(f64, f64)> = None;
        let mut sum = (0.0, 0.0);

        for &stop in stops {
            let origin = self.graph[stop].position;
            for neighbour in self.neighbors(stop) {
                let local = self.graph[neighbour].position.to_local(&origin);
                let Some(mut unit) = normalize(local) else {
                    continue;
                };
                match reference {
                    None => reference = Some(unit),
                    Some(r) if dot(r, unit) < 0.0 => unit = (-unit.0, -unit.1),
                    Some(_) => {}
                }
                sum.0 += unit.0;
                sum.1 += unit.1;
            }
        }

        normalize(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::NodeKind;
    use crate::models::station::PlatformSide;
    use crate::test_support::{edge, node, station, two_platform_network};

    fn planned(station: &str, platform: Option<&str>) -> PlannedStop {
        PlannedStop {
            station_id: station.to_string(),
            platform: platform.map(str::to_string),
            fixed_node: None,
        }
    }

    #[test]
    fn test_station_axis_runs_along_track() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let axis = graph.station("MID").expect("station").axis.expect("axis");
        // Tracks run east-west in the fixture
        assert!(axis.0.abs() > 0.99, "axis {axis:?}");
        assert!(axis.1.abs() < 0.05, "axis {axis:?}");
    }

    #[test]
    fn test_candidate_sides_differ() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let station = graph.station("MID").expect("station");
        let sides: Vec<_> = station.candidates.iter().map(|c| c.side).collect();
        assert!(sides.contains(&Some(PlatformSide::Left)));
        assert!(sides.contains(&Some(PlatformSide::Right)));
    }

    #[test]
    fn test_sides_measured_from_stop_centroid() {
        let mut model = two_platform_network();
        let mid = model.stations.iter_mut().find(|s| s.id == "MID").expect("MID");
        // Station point sits on platform 1
        mid.lat = 0.0002;
        let graph = TrackGraph::build(&model).expect("valid network");
        let station = graph.station("MID").expect("station");
        assert!(station.centroid.lat.abs() < 1e-9);
        assert!((station.centroid.lon - 0.004).abs() < 1e-9);

        let side = |id: &str| {
            station.candidates.iter().find(|c| c.node_id == id).and_then(|c| c.side)
        };
        let (one, two) = (side("MID_1"), side("MID_2"));
        assert!(one.is_some() && two.is_some());
        assert_ne!(one, two);
    }

    #[test]
    fn test_platform_filter() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let nodes = graph.stop_candidates(&planned("MID", Some("Gleis 2")), None, true, false);
        assert_eq!(nodes, vec![graph.node_index("MID_2").expect("node")]);
    }

    #[test]
    fn test_unmatched_platform_falls_back_to_all() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let nodes = graph.stop_candidates(&planned("MID", Some("9")), None, true, false);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_side_filter_keeps_destination_side() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        // NORTH lies north of the station, where platform 1 is
        let nodes = graph.stop_candidates(&planned("MID", None), Some("NORTH"), false, true);
        assert_eq!(nodes, vec![graph.node_index("MID_1").expect("node")]);
    }

    #[test]
    fn test_platform_hint_reaches_past_candidate_bound() {
        let mut model = two_platform_network();
        let mut candidates = Vec::new();
        for i in 1..=10 {
            let id = format!("BAY_{i}");
            let mut bay = node(&id, 0.0009, 0.0009 * f64::from(i), NodeKind::Stop);
            bay.platform_ref = Some(i.to_string());
            model.nodes.push(bay);
            model.edges.push(edge(&format!("bay{i}"), "W", &id, 100.0));
            candidates.push((id, Some(i.to_string())));
        }
        let refs: Vec<(&str, Option<&str>)> = candidates
            .iter()
            .map(|(id, platform)| (id.as_str(), platform.as_deref()))
            .collect();
        model.stations.push(station("BAY", "Bay", 0.0009, 0.005, &refs));
        let graph = TrackGraph::build(&model).expect("valid network");

        let nodes = graph.stop_candidates(&planned("BAY", Some("10")), None, true, false);
        assert_eq!(nodes, vec![graph.node_index("BAY_10").expect("node")]);
        let unhinted = graph.stop_candidates(&planned("BAY", None), None, true, false);
        assert_eq!(unhinted.len(), MAX_STOP_CANDIDATES);
    }

    #[test]
    fn test_unknown_station_has_no_candidates() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        assert!(graph.stop_candidates(&planned("NOPE", None), None, true, true).is_empty());
    }

    #[test]
    fn test_fixed_node_pins_candidates() {
        let graph = TrackGraph::build(&two_platform_network()).expect("valid network");
        let stop = PlannedStop {
            station_id: "MID".to_string(),
            platform: Some("1".to_string()),
            fixed_node: Some("MID_2".to_string()),
        };
        assert_eq!(
            graph.stop_candidates(&stop, None, true, true),
            vec![graph.node_index("MID_2").expect("node")]
        );
    }
}
