use super::TrackGraph;
use crate::geometry::{point_along_polyline, polyline_length};
use crate::models::path::{Path, PathPosition};

/// Extension trait mapping path offsets to map positions
pub trait Positions {
    /// Geographic position and heading at `offset` metres along `path`.
    ///
    /// The offset is clamped to the path. Within a segment the fraction of
    /// its nominal length travelled is applied to the drawn geometry, so
    /// tracks whose stated length differs from their polyline still animate
    /// end to end. Returns `None` for an empty path.
    fn get_position_on_path(&self, path: &Path, offset: f64) -> Option<PathPosition>;
}

impl Positions for TrackGraph {
    fn get_position_on_path(&self, path: &Path, offset: f64) -> Option<PathPosition> {
        let offset = offset.clamp(0.0, path.total_length);
        let segment_index = path.segment_index_at(offset)?;
        let segment = &path.segments[segment_index];

        let fraction = if segment.length > 0.0 {
            ((offset - segment.start_distance) / segment.length).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let geometry = match self.edge_at(segment.edge) {
            Some(edge) if edge.geometry.len() >= 2 => edge.geometry.clone(),
            _ => {
                let from = self.node(&segment.from_node)?.position;
                let to = self.node(&segment.to_node)?.position;
                vec![from, to]
            }
        };

        let drawn = polyline_length(&geometry);
        let (position, heading_deg) = point_along_polyline(&geometry, fraction * drawn)?;

        Some(PathPosition {
            position,
            heading_deg,
            segment_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::track_graph::Routes;
    use crate::test_support::line_network;

    #[test]
    fn test_position_at_start_and_end() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let path = graph.find_node_path("A", "B");

        let start = graph.get_position_on_path(&path, 0.0).expect("position");
        assert!(start.position.distance_to(&graph.node("A").expect("A").position) < 0.01);
        assert_eq!(start.segment_index, 0);

        let end = graph.get_position_on_path(&path, path.total_length).expect("position");
        assert!(end.position.distance_to(&graph.node("B").expect("B").position) < 0.01);
        assert_eq!(end.segment_index, 1);
    }

    #[test]
    fn test_position_scales_fraction_onto_geometry() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let path = graph.find_node_path("A", "B");
        // Halfway along the first 100 m segment lands halfway between A and M
        let mid = graph.get_position_on_path(&path, 50.0).expect("position");
        let a = graph.node("A").expect("A").position;
        let m = graph.node("M").expect("M").position;
        let da = mid.position.distance_to(&a);
        let dm = mid.position.distance_to(&m);
        assert!((da - dm).abs() < 0.5, "{da} vs {dm}");
        // Eastbound
        assert!((mid.heading_deg - 90.0).abs() < 1.0, "{}", mid.heading_deg);
    }

    #[test]
    fn test_position_clamps_and_is_stable() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let path = graph.find_node_path("A", "B");
        let before = graph.get_position_on_path(&path, -50.0).expect("position");
        let start = graph.get_position_on_path(&path, 0.0).expect("position");
        assert_eq!(before, start);
        let after = graph.get_position_on_path(&path, 1e6).expect("position");
        let end = graph.get_position_on_path(&path, path.total_length).expect("position");
        assert_eq!(after, end);
        assert_eq!(graph.get_position_on_path(&path, 73.0), graph.get_position_on_path(&path, 73.0));
    }

    #[test]
    fn test_position_on_empty_path() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        assert!(graph.get_position_on_path(&Path::not_found(), 0.0).is_none());
    }
}
