use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

use super::TrackGraph;
use crate::models::track::TravelDirection;

/// Physical track as seen by section derivation
struct PhysicalTrack {
    id: String,
    from: NodeIndex,
    to: NodeIndex,
}

impl TrackGraph {
    /// Group tracks into direction-locked sections.
    ///
    /// Tracks chain together through plain degree-2 nodes; switches and
    /// junctions end a section. Each chain gets a canonical orientation
    /// (that of its smallest track id) and every directed edge records its
    /// direction relative to it.
    pub(super) fn assign_sections(&mut self) {
        let mut physical: Vec<PhysicalTrack> = self
            .tracks
            .iter()
            .filter_map(|(id, &(forward, _))| {
                let (from, to) = self.graph.edge_endpoints(forward)?;
                Some(PhysicalTrack { id: id.clone(), from, to })
            })
            .collect();
        physical.sort_by(|a, b| a.id.cmp(&b.id));

        // Tracks incident to each node
        let mut incident: HashMap<NodeIndex, Vec<usize>> = HashMap::new();
        for (i, track) in physical.iter().enumerate() {
            incident.entry(track.from).or_default().push(i);
            incident.entry(track.to).or_default().push(i);
        }

        let mut assignment: Vec<Option<(usize, TravelDirection)>> = vec![None; physical.len()];
        for seed in 0..physical.len() {
            if assignment[seed].is_some() {
                continue;
            }
            // Seeds are visited in id order so the section id is the smallest member
            assignment[seed] = Some((seed, TravelDirection::Forward));
            let mut queue = VecDeque::from([seed]);

            while let Some(current) = queue.pop_front() {
                let Some((section, alignment)) = assignment[current] else {
                    continue;
                };
                let track = &physical[current];
                let (entry, exit) = match alignment {
                    TravelDirection::Forward => (track.from, track.to),
                    TravelDirection::Backward => (track.to, track.from),
                };

                for (node, is_exit) in [(exit, true), (entry, false)] {
                    if !self.chains_through(node) {
                        continue;
                    }
                    let Some(neighbours) = incident.get(&node) else {
                        continue;
                    };
                    for &next in neighbours {
                        if next == current || assignment[next].is_some() {
                            continue;
                        }
                        let other = &physical[next];
                        // Canonical travel continues out of the exit node and comes
                        // into the entry node
                        let aligned = if is_exit { other.from == node } else { other.to == node };
                        let direction = if aligned {
                            TravelDirection::Forward
                        } else {
                            TravelDirection::Backward
                        };
                        assignment[next] = Some((section, direction));
                        queue.push_back(next);
                    }
                }
            }
        }

        for (i, track) in physical.iter().enumerate() {
            let Some((section, alignment)) = assignment[i] else {
                continue;
            };
            let section_id = physical[section].id.clone();
            let Some(&(forward, backward)) = self.tracks.get(&track.id) else {
                continue;
            };
            for edge in [forward, backward] {
                let weight = &mut self.graph[edge];
                weight.section_id.clone_from(&section_id);
                weight.section_direction = weight.direction.compose(alignment);
            }
        }
    }

    /// A section continues through plain track nodes joining exactly two tracks
    fn chains_through(&self, node: NodeIndex) -> bool {
        let Some(weight) = self.graph.node_weight(node) else {
            return false;
        };
        !weight.is_interlocking()
            && self.graph.edges_directed(node, Direction::Outgoing).count() == 2
            && self
                .graph
                .edges_directed(node, Direction::Outgoing)
                .all(|e| e.target() != node)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::track::TravelDirection;
    use crate::models::TrackGraph;
    use crate::test_support::{line_network, star_network};

    #[test]
    fn test_line_through_plain_node_is_one_section() {
        let graph = TrackGraph::build(&line_network()).expect("valid network");
        let (f1, _) = graph.track_edges("e1").expect("e1");
        let (f2, b2) = graph.track_edges("e2").expect("e2");
        let e1 = graph.edge_at(f1).expect("edge");
        let e2 = graph.edge_at(f2).expect("edge");
        assert_eq!(e1.section_id, "e1");
        assert_eq!(e2.section_id, "e1");
        // A→M and M→B run the same way through the section
        assert_eq!(e1.section_direction, TravelDirection::Forward);
        assert_eq!(e2.section_direction, TravelDirection::Forward);
        assert_eq!(graph.edge_at(b2).expect("edge").section_direction, TravelDirection::Backward);
    }

    #[test]
    fn test_junction_splits_sections() {
        let graph = TrackGraph::build(&star_network()).expect("valid network");
        let ids: Vec<String> = ["ja", "jb", "jc"]
            .iter()
            .map(|t| {
                let (f, _) = graph.track_edges(t).expect("track");
                graph.edge_at(f).expect("edge").section_id.clone()
            })
            .collect();
        assert_eq!(ids, vec!["ja", "jb", "jc"]);
    }

    #[test]
    fn test_opposed_track_orientation_is_aligned_through_chain() {
        // A→M forward, B→M forward: the chain runs A-M-B, so e2 is backward in it
        let mut model = line_network();
        let edge = &mut model.edges[1];
        std::mem::swap(&mut edge.from, &mut edge.to);
        edge.geometry.reverse();
        let graph = TrackGraph::build(&model).expect("valid network");
        let (f2, b2) = graph.track_edges("e2").expect("e2");
        assert_eq!(graph.edge_at(f2).expect("edge").section_id, "e1");
        assert_eq!(graph.edge_at(f2).expect("edge").section_direction, TravelDirection::Backward);
        assert_eq!(graph.edge_at(b2).expect("edge").section_direction, TravelDirection::Forward);
    }
}
