//! Small hand-built networks shared by unit tests.
//!
//! Coordinates sit on the equator so 0.0009° of longitude is roughly 100 m.

use crate::models::network::{
    NetworkEdge, NetworkModel, NetworkNode, NetworkStation, NodeKind, RailwayMode,
    StopCandidateInput,
};

pub(crate) fn node(id: &str, lat: f64, lon: f64, kind: NodeKind) -> NetworkNode {
    NetworkNode {
        id: id.to_string(),
        lat,
        lon,
        kind,
        station_id: None,
        station_name: None,
        platform_ref: None,
    }
}

pub(crate) fn stop(id: &str, lat: f64, lon: f64, station: &str) -> NetworkNode {
    NetworkNode {
        station_id: Some(station.to_string()),
        ..node(id, lat, lon, NodeKind::Stop)
    }
}

pub(crate) fn edge(id: &str, from: &str, to: &str, length_m: f64) -> NetworkEdge {
    NetworkEdge {
        id: id.to_string(),
        way_id: None,
        from: from.to_string(),
        to: to.to_string(),
        length_m,
        max_speed_forward_kmh: None,
        max_speed_backward_kmh: None,
        electrified: true,
        railway: RailwayMode::Rail,
        usage: None,
        service: None,
        geometry: vec![],
        is_connector: false,
    }
}

pub(crate) fn station(id: &str, name: &str, lat: f64, lon: f64, candidates: &[(&str, Option<&str>)]) -> NetworkStation {
    NetworkStation {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lon,
        stop_candidates: candidates
            .iter()
            .map(|(node_id, platform)| StopCandidateInput {
                node_id: (*node_id).to_string(),
                platform_ref: platform.map(str::to_string),
            })
            .collect(),
    }
}

/// A ── M ── B, 100 m per track, stations at both ends
pub(crate) fn line_network() -> NetworkModel {
    NetworkModel {
        nodes: vec![
            stop("A", 0.0, 0.0, "STA_A"),
            node("M", 0.0, 0.0009, NodeKind::Track),
            stop("B", 0.0, 0.0018, "STA_B"),
        ],
        edges: vec![edge("e1", "A", "M", 100.0), edge("e2", "M", "B", 100.0)],
        stations: vec![
            station("STA_A", "Alpha", 0.0, 0.0, &[]),
            station("STA_B", "Bravo", 0.0, 0.0018, &[]),
        ],
        signal_hints: vec![],
    }
}

/// Junction J with arms to A (west), B (east) and C (north), 100 m each
pub(crate) fn star_network() -> NetworkModel {
    NetworkModel {
        nodes: vec![
            node("J", 0.0, 0.0, NodeKind::Track),
            stop("A", 0.0, -0.0009, "STA_A"),
            stop("B", 0.0, 0.0009, "STA_B"),
            stop("C", 0.0009, 0.0, "STA_C"),
        ],
        edges: vec![
            edge("ja", "A", "J", 100.0),
            edge("jb", "J", "B", 100.0),
            edge("jc", "C", "J", 100.0),
        ],
        stations: vec![
            station("STA_A", "Alpha", 0.0, -0.0009, &[]),
            station("STA_B", "Bravo", 0.0, 0.0009, &[]),
            station("STA_C", "Charlie", 0.0009, 0.0, &[]),
        ],
        signal_hints: vec![],
    }
}

/// WEST ── SW ═╦═ MID (platforms 1 north, 2 south) ═╦═ SE ── EAST, plus an
/// isolated NORTH station whose stop has no track
pub(crate) fn two_platform_network() -> NetworkModel {
    let mut mid_1 = node("MID_1", 0.0002, 0.004, NodeKind::Stop);
    mid_1.platform_ref = Some("1".to_string());
    let mut mid_2 = node("MID_2", -0.0002, 0.004, NodeKind::Stop);
    mid_2.platform_ref = Some("Gleis 2".to_string());

    NetworkModel {
        nodes: vec![
            stop("W", 0.0, 0.0, "WEST"),
            node("SW", 0.0, 0.002, NodeKind::Switch),
            mid_1,
            mid_2,
            node("SE", 0.0, 0.006, NodeKind::Switch),
            stop("E", 0.0, 0.008, "EAST"),
            stop("N", 0.01, 0.004, "NORTH"),
        ],
        edges: vec![
            edge("w1", "W", "SW", 222.0),
            edge("n1", "SW", "MID_1", 224.0),
            edge("n2", "MID_1", "SE", 224.0),
            edge("s1", "SW", "MID_2", 224.0),
            edge("s2", "MID_2", "SE", 224.0),
            edge("e1", "SE", "E", 222.0),
        ],
        stations: vec![
            station("WEST", "West", 0.0, 0.0, &[]),
            station("MID", "Middle", 0.0, 0.004, &[("MID_1", None), ("MID_2", Some("2"))]),
            station("EAST", "East", 0.0, 0.008, &[]),
            station("NORTH", "North", 0.01, 0.004, &[]),
        ],
        signal_hints: vec![],
    }
}

/// Three stations on a straight double-ended line, 1 km apart:
/// A ── B ── C
pub(crate) fn corridor_network() -> NetworkModel {
    NetworkModel {
        nodes: vec![
            stop("A", 0.0, 0.0, "STA_A"),
            stop("B", 0.0, 0.009, "STA_B"),
            stop("C", 0.0, 0.018, "STA_C"),
        ],
        edges: vec![edge("ab", "A", "B", 1000.0), edge("bc", "B", "C", 1000.0)],
        stations: vec![
            station("STA_A", "Alpha", 0.0, 0.0, &[]),
            station("STA_B", "Bravo", 0.0, 0.009, &[]),
            station("STA_C", "Charlie", 0.0, 0.018, &[]),
        ],
        signal_hints: vec![],
    }
}

/// Junction J fed by a west arm from A and a north arm from C, continuing
/// east to B. Arm lengths are given in metres.
pub(crate) fn junction_network(west_m: f64, north_m: f64, east_m: f64) -> NetworkModel {
    let degrees = |m: f64| m / 111_000.0;
    NetworkModel {
        nodes: vec![
            node("J", 0.0, 0.0, NodeKind::Track),
            stop("A", 0.0, -degrees(west_m), "STA_A"),
            stop("B", 0.0, degrees(east_m), "STA_B"),
            stop("C", degrees(north_m), 0.0, "STA_C"),
        ],
        edges: vec![
            edge("aj", "A", "J", west_m),
            edge("jb", "J", "B", east_m),
            edge("cj", "C", "J", north_m),
        ],
        stations: vec![
            station("STA_A", "Alpha", 0.0, -degrees(west_m), &[]),
            station("STA_B", "Bravo", 0.0, degrees(east_m), &[]),
            station("STA_C", "Charlie", degrees(north_m), 0.0, &[]),
        ],
        signal_hints: vec![],
    }
}
