//! Topological ordering of nodes from upstream to downstream.
//!
//! Routing visits nodes so that every node is processed after all nodes
//! feeding it, letting each sub-step be solved in a single pass. Links
//! with zero flow are ignored because they create spurious cycles. Real
//! cycles (loops with circulating flow) are broken by forcing a node
//! into the order and recording it.

use log::{debug, warn};

use plume_core::{Network, NodeId, QualityError};

use crate::direction::{FlowDirection, FlowDirections};

/// The most recent node ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortOutcome {
    /// Every node, upstream first.
    pub order: Vec<NodeId>,
    /// Nodes placed while they still had unprocessed inflow, to break a
    /// cycle.
    pub forced: Vec<NodeId>,
}

/// Reusable topological sorter.
#[derive(Debug, Default)]
pub struct Sequencer {
    indegree: Vec<u32>,
    stack: Vec<NodeId>,
    outcome: SortOutcome,
}

impl Sequencer {
    /// Create a sorter for a network with `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            indegree: vec![0; node_count],
            stack: Vec::with_capacity(node_count),
            outcome: SortOutcome {
                order: Vec::with_capacity(node_count),
                forced: Vec::new(),
            },
        }
    }

    /// The last successful ordering.
    pub fn outcome(&self) -> &SortOutcome {
        &self.outcome
    }

    /// Order all nodes for the given flow directions.
    pub fn sort(
        &mut self,
        network: &Network,
        directions: &FlowDirections,
    ) -> Result<&SortOutcome, QualityError> {
        let total = network.node_count();
        self.indegree.clear();
        self.indegree.resize(total, 0);
        self.stack.clear();
        self.outcome.order.clear();
        self.outcome.forced.clear();

        for (k, _) in network.links() {
            if directions.get(k) != FlowDirection::Zero {
                self.indegree[directions.downstream(network, k).index()] += 1;
            }
        }
        self.stack.extend(
            (0..total as u32)
                .map(NodeId)
                .filter(|n| self.indegree[n.index()] == 0),
        );

        while self.outcome.order.len() < total {
            if self.stack.is_empty() {
                let Some(forced) = self.select_cycle_breaker(network) else {
                    return Err(QualityError::TopologyIncomplete {
                        sorted: self.outcome.order.len(),
                        total,
                    });
                };
                self.indegree[forced.index()] = 0;
                self.stack.push(forced);
                self.outcome.forced.push(forced);
            }

            let Some(node) = self.stack.pop() else {
                break;
            };
            self.outcome.order.push(node);

            for &k in network.incident_links(node) {
                if directions.get(k) == FlowDirection::Zero {
                    continue;
                }
                let down = directions.downstream(network, k);
                if down != node && self.indegree[down.index()] > 0 {
                    self.indegree[down.index()] -= 1;
                    if self.indegree[down.index()] == 0 {
                        self.stack.push(down);
                    }
                }
            }
        }

        if !self.outcome.forced.is_empty() {
            warn!(
                "flow cycle broken by forcing {} node(s) into the order",
                self.outcome.forced.len()
            );
        }
        debug!("sorted {total} nodes");
        Ok(&self.outcome)
    }

    /// Pick an unsorted node adjacent to the most recently sorted nodes,
    /// else the lowest-index node still waiting on inflow.
    fn select_cycle_breaker(&self, network: &Network) -> Option<NodeId> {
        for &m in self.outcome.order.iter().rev() {
            for &k in network.incident_links(m) {
                let n = network.link(k).other_end(m);
                if self.indegree[n.index()] > 0 {
                    return Some(n);
                }
            }
        }
        self.indegree
            .iter()
            .position(|&d| d > 0)
            .map(|i| NodeId(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::{HydraulicState, NetworkBuilder, PipeSpec};
    use plume_test_utils::{diamond_network, random_flows};
    use proptest::prelude::*;

    fn position(order: &[NodeId], n: NodeId) -> usize {
        order.iter().position(|&m| m == n).unwrap()
    }

    fn directions_for(network: &Network, flows: Vec<f64>) -> FlowDirections {
        let mut dirs = FlowDirections::new(network.link_count());
        let state = HydraulicState::open(0, 60, flows, vec![0.0; network.node_count()]);
        dirs.update(&state, 1e-6);
        dirs
    }

    #[test]
    fn diamond_sorts_source_first_sink_last() {
        let net = diamond_network();
        let dirs = directions_for(&net, vec![0.1, 0.1, 0.1, 0.1]);
        let mut seq = Sequencer::new(net.node_count());
        let outcome = seq.sort(&net, &dirs).unwrap();
        assert_eq!(outcome.order.len(), 4);
        assert!(outcome.forced.is_empty());
        let r = net.node_id("R").unwrap();
        let d = net.node_id("D").unwrap();
        assert_eq!(outcome.order[0], r);
        assert_eq!(*outcome.order.last().unwrap(), d);
    }

    #[test]
    fn reversed_flow_reverses_order() {
        let net = diamond_network();
        let dirs = directions_for(&net, vec![-0.1, -0.1, -0.1, -0.1]);
        let mut seq = Sequencer::new(net.node_count());
        let order = seq.sort(&net, &dirs).unwrap().order.clone();
        let r = net.node_id("R").unwrap();
        let d = net.node_id("D").unwrap();
        assert!(position(&order, d) < position(&order, r));
    }

    #[test]
    fn cycle_is_broken_and_recorded() {
        let mut b = NetworkBuilder::new();
        for n in ["A", "B", "C"] {
            b.add_junction(n, 0.0).unwrap();
        }
        b.add_pipe("AB", "A", "B", PipeSpec::default()).unwrap();
        b.add_pipe("BC", "B", "C", PipeSpec::default()).unwrap();
        b.add_pipe("CA", "C", "A", PipeSpec::default()).unwrap();
        let net = b.build().unwrap();
        let dirs = directions_for(&net, vec![0.1, 0.1, 0.1]);
        let mut seq = Sequencer::new(net.node_count());
        let outcome = seq.sort(&net, &dirs).unwrap();
        assert_eq!(outcome.order.len(), 3);
        assert_eq!(outcome.forced, vec![NodeId(0)]);
        assert_eq!(outcome.order, vec![NodeId(0), NodeId(1), NodeId(2)]);
    }

    #[test]
    fn stagnant_links_impose_no_order() {
        let net = diamond_network();
        let dirs = directions_for(&net, vec![0.0; 4]);
        let mut seq = Sequencer::new(net.node_count());
        let outcome = seq.sort(&net, &dirs).unwrap();
        assert_eq!(outcome.order.len(), 4);
        assert!(outcome.forced.is_empty());
    }

    proptest! {
        #[test]
        fn order_respects_every_unforced_link(seed in 0u64..500) {
            let net = plume_test_utils::grid_network(4, 4);
            let flows = random_flows(&net, seed);
            let dirs = directions_for(&net, flows);
            let mut seq = Sequencer::new(net.node_count());
            let outcome = seq.sort(&net, &dirs).unwrap().clone();
            prop_assert_eq!(outcome.order.len(), net.node_count());
            for (k, _) in net.links() {
                if dirs.get(k) == FlowDirection::Zero {
                    continue;
                }
                let up = dirs.upstream(&net, k);
                let down = dirs.downstream(&net, k);
                if outcome.forced.contains(&down) {
                    continue;
                }
                prop_assert!(position(&outcome.order, up) < position(&outcome.order, down));
            }
        }
    }
}
