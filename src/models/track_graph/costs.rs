use petgraph::graph::EdgeIndex;

use super::TrackGraph;
use crate::constants::{
    CONNECTOR_PENALTY, CROSSOVER_MEDIUM_M, CROSSOVER_MIN_DEGREE, CROSSOVER_PENALTY_LARGE,
    CROSSOVER_PENALTY_MEDIUM, CROSSOVER_PENALTY_SMALL, CROSSOVER_SHORT_M, NON_MAIN_USAGE_PENALTY,
    NON_PRIMARY_MODE_PENALTY, SIGNAL_DIRECTION_PENALTY,
};

impl TrackGraph {
    /// Routing cost of traversing a directed edge: physical length plus
    /// penalties steering routes onto running lines of the primary mode, in
    /// the signalled direction, without hopping across crossovers.
    #[must_use]
    pub fn edge_cost(&self, edge: EdgeIndex) -> f64 {
        let Some(weight) = self.graph.edge_weight(edge) else {
            return f64::INFINITY;
        };
        let mut cost = weight.length;

        if weight.is_connector {
            cost += CONNECTOR_PENALTY;
        }
        if weight.railway != self.primary_mode {
            cost += NON_PRIMARY_MODE_PENALTY;
        }
        if weight.is_non_main() {
            cost += NON_MAIN_USAGE_PENALTY;
        }
        if weight.opposes_signalling() {
            cost += SIGNAL_DIRECTION_PENALTY;
        }
        cost += self.crossover_penalty(edge);

        cost
    }

    /// Graduated penalty for short tracks joining two switches
    fn crossover_penalty(&self, edge: EdgeIndex) -> f64 {
        let Some((from, to)) = self.graph.edge_endpoints(edge) else {
            return 0.0;
        };
        let both_switches = self.graph[from].degree >= CROSSOVER_MIN_DEGREE
            && self.graph[to].degree >= CROSSOVER_MIN_DEGREE;
        if !both_switches {
            return 0.0;
        }
        let length = self.graph[edge].length;
        if length < CROSSOVER_SHORT_M {
            CROSSOVER_PENALTY_LARGE
        } else if length < CROSSOVER_MEDIUM_M {
            CROSSOVER_PENALTY_MEDIUM
        } else {
            CROSSOVER_PENALTY_SMALL
        }
    }
}
