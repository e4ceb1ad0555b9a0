//! One quality sub-step: reactions, then routing through nodes.
//!
//! Nodes are visited in topological order. At each node the water
//! arriving from upstream chains is withdrawn and mixed, any source is
//! applied, and the result is released into the node's downstream chains
//! as new tail segments.

use plume_core::{ChainId, HydraulicState, LinkKind, Network, NodeId, NodeKind};

use crate::kinetics::{self, PipeKinetics};
use crate::params::{QualityMode, SECONDS_PER_DAY, TRACE_QUALITY};
use crate::source::{self, SourceContext};
use crate::state::QualityState;

/// Timing of one sub-step, in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubStep {
    /// Sub-step length. Must be positive.
    pub dt: u64,
    /// Quality time at the start of the sub-step.
    pub qtime: u64,
    /// End of the current hydraulic interval.
    pub htime: u64,
}

impl SubStep {
    fn seconds(&self) -> f64 {
        self.dt as f64
    }
}

/// Volumes and mass meeting at a node during one sub-step.
#[derive(Clone, Copy, Debug, Default)]
struct NodeExchange {
    volume_in: f64,
    mass_in: f64,
    volume_out: f64,
}

/// A node's source contribution over one sub-step.
#[derive(Clone, Copy, Debug, Default)]
struct Injection {
    /// Concentration added to the outflow, as booked in the mass balance.
    added: f64,
    /// Quality the outflow is held at regardless of mixing (trace node).
    pinned: Option<f64>,
}

impl QualityState {
    fn in_report_window(&self, step: SubStep) -> bool {
        step.htime >= self.params.report_start
    }

    /// React every pipe and tank segment over the sub-step.
    pub fn react(&mut self, network: &Network, step: SubStep) {
        self.react_pipes(network, step);
        self.react_tanks(network, step);
    }

    fn react_pipes(&mut self, network: &Network, step: SubStep) {
        let dt = step.seconds();
        let window = self.in_report_window(step);
        let mode = self.params.mode;
        let reactions = &self.params.reactions;
        let mut bulk = 0.0;
        let mut wall = 0.0;
        let mut reacted = 0.0;

        for (k, link) in network.links() {
            if link.kind != LinkKind::Pipe {
                continue;
            }
            let pipe = PipeKinetics {
                kb: link.bulk_coeff,
                kw: link.wall_coeff,
                kf: self.wall_coeff[k.index()],
                diameter: link.diameter,
            };
            let mut rsum = 0.0;
            let mut vsum = 0.0;
            self.chains.for_each_mut(ChainId::for_link(k), |seg| {
                let (c, dbulk, dwall) = kinetics::pipe_react(mode, reactions, &pipe, seg.quality, dt);
                reacted += (seg.quality - c) * seg.volume;
                if window {
                    bulk += dbulk.abs() * seg.volume;
                    wall += dwall.abs() * seg.volume;
                }
                if mode == QualityMode::Chemical {
                    rsum += (c - seg.quality).abs() * seg.volume;
                    vsum += seg.volume;
                }
                seg.quality = c;
            });
            self.pipe_rate[k.index()] = if vsum > 0.0 {
                rsum / vsum / dt * SECONDS_PER_DAY
            } else {
                0.0
            };
        }

        self.mass_balance.reacted += reacted;
        self.totals.bulk += bulk;
        self.totals.wall += wall;
    }

    fn react_tanks(&mut self, network: &Network, step: SubStep) {
        let dt = step.seconds();
        let window = self.in_report_window(step);
        let mode = self.params.mode;
        let reactions = &self.params.reactions;
        let mut reacted = 0.0;
        let mut tank_total = 0.0;

        for (t, tank) in network.tanks() {
            let chain = self.tanks[t.index()].chain();
            self.chains.for_each_mut(chain, |seg| {
                let (c, dc) = kinetics::tank_react(mode, reactions, seg.quality, tank.bulk_coeff, dt);
                reacted += (seg.quality - c) * seg.volume;
                if window {
                    tank_total += dc.abs() * seg.volume;
                }
                seg.quality = c;
            });
        }

        self.mass_balance.reacted += reacted;
        self.totals.tank += tank_total;
    }

    /// Route water through every node in the current order.
    ///
    /// The order must be current for the loaded flow directions.
    pub fn route(&mut self, network: &Network, hydraulics: &HydraulicState, step: SubStep) {
        let order = std::mem::take(&mut self.order);
        for &node in &order {
            self.route_node(network, hydraulics, node, step);
        }
        self.order = order;
    }

    /// React (when reactive) and route one sub-step.
    pub fn transport(&mut self, network: &Network, hydraulics: &HydraulicState, step: SubStep) {
        if self.reactive {
            self.react(network, step);
        }
        self.route(network, hydraulics, step);
    }

    fn route_node(
        &mut self,
        network: &Network,
        hydraulics: &HydraulicState,
        node: NodeId,
        step: SubStep,
    ) {
        let dt = step.seconds();
        let mut ex = NodeExchange::default();

        for &k in network.incident_links(node) {
            let flow = hydraulics.flow(k).abs();
            if self.directions.downstream(network, k) == node {
                let w = self.chains.consume_from_head(ChainId::for_link(k), flow * dt);
                ex.volume_in += w.volume;
                ex.mass_in += w.mass;
            } else {
                ex.volume_out += flow;
            }
        }
        let kind = network.node(node).kind;
        let demand = hydraulics.demand(node);
        if kind == NodeKind::Junction {
            ex.volume_out += demand.max(0.0);
        }
        ex.volume_out *= dt;

        let out_quality = self.mix_node(network, node, kind, demand, ex, dt);
        let injection = self.apply_source(network, node, kind, demand, ex.volume_out, step);
        let injected = injection.added;
        let released = match (injection.pinned, kind) {
            (Some(q), _) => q,
            (None, _) if injected == 0.0 => out_quality,
            (None, NodeKind::Junction) => {
                self.node_quality[node.index()] += injected;
                self.node_quality[node.index()]
            }
            (None, NodeKind::Tank(_)) => out_quality + injected,
            (None, NodeKind::Reservoir) => {
                self.node_quality[node.index()] = injected;
                injected
            }
        };

        for &k in network.incident_links(node) {
            if self.directions.upstream(network, k) == node {
                let v = hydraulics.flow(k).abs() * dt;
                self.chains.append_or_merge_at_tail(
                    ChainId::for_link(k),
                    v,
                    released,
                    self.params.quality_tolerance,
                );
            }
        }

        let q = self.node_quality[node.index()];
        let mb = &mut self.mass_balance;
        match kind {
            NodeKind::Junction => {
                mb.outflow += demand.max(0.0) * dt * q;
                mb.inflow += injected * ex.volume_out;
            }
            NodeKind::Reservoir => {
                mb.outflow += ex.mass_in;
                let c = if injected > 0.0 { injected } else { q };
                mb.inflow += c * ex.volume_out;
            }
            NodeKind::Tank(_) => {
                mb.inflow += injected * ex.volume_out;
            }
        }
    }

    /// Update the node's quality from the water arriving this sub-step and
    /// return the quality of the water it releases, before sources.
    fn mix_node(
        &mut self,
        network: &Network,
        node: NodeId,
        kind: NodeKind,
        demand: f64,
        ex: NodeExchange,
        dt: f64,
    ) -> f64 {
        let n = node.index();
        match kind {
            NodeKind::Junction => {
                // External inflow dilutes the arriving water at zero quality.
                let volume_in = ex.volume_in - demand.min(0.0) * dt;
                if volume_in > 0.0 {
                    self.node_quality[n] = ex.mass_in / volume_in;
                } else if self.reactive {
                    self.node_quality[n] = self.no_flow_quality(network, node);
                }
            }
            NodeKind::Tank(t) => {
                self.node_quality[n] = self.tanks[t.index()].mix(
                    &mut self.chains,
                    ex.volume_in,
                    ex.mass_in,
                    ex.volume_in - ex.volume_out,
                    self.params.quality_tolerance,
                    self.node_quality[n],
                );
            }
            NodeKind::Reservoir => {}
        }
        self.node_quality[n]
    }

    /// Quality at a node with no inflow: the average of the water in its
    /// adjacent links nearest to the node.
    fn no_flow_quality(&self, network: &Network, node: NodeId) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &k in network.incident_links(node) {
            let chain = ChainId::for_link(k);
            let nearest = if self.directions.downstream(network, k) == node {
                self.chains.first(chain)
            } else {
                self.chains.last(chain)
            };
            if let Some(seg) = nearest {
                sum += seg.quality;
                count += 1;
            }
        }
        if count > 0 {
            sum / count as f64
        } else {
            self.node_quality[node.index()]
        }
    }

    /// The node's source contribution this sub-step.
    ///
    /// In trace mode this pins the trace node at full strength; the
    /// difference to its mixed quality is only booked, never added. For a
    /// chemical it evaluates the node's source, if any, and books the
    /// injected mass.
    fn apply_source(
        &mut self,
        network: &Network,
        node: NodeId,
        kind: NodeKind,
        demand: f64,
        volume_out: f64,
        step: SubStep,
    ) -> Injection {
        let n = node.index();
        match self.params.mode {
            QualityMode::Trace { node: trace } => {
                if node != trace {
                    return Injection::default();
                }
                let added = if kind == NodeKind::Reservoir {
                    TRACE_QUALITY
                } else {
                    (TRACE_QUALITY - self.node_quality[n]).max(0.0)
                };
                self.node_quality[n] = TRACE_QUALITY;
                Injection {
                    added,
                    pinned: Some(TRACE_QUALITY),
                }
            }
            QualityMode::Age => Injection::default(),
            QualityMode::Chemical => {
                let Some(src) = network.node(node).source else {
                    return Injection::default();
                };
                let dt = step.seconds();
                if src.base_strength == 0.0 || volume_out / dt <= self.params.stagnant_flow {
                    return Injection::default();
                }
                let strength = source::strength(
                    network,
                    &src,
                    step.qtime,
                    self.params.pattern_step,
                    self.params.pattern_start,
                );
                let ctx = SourceContext {
                    node_kind: kind,
                    demand,
                    quality: self.node_quality[n],
                    volume_out,
                    dt,
                };
                let c = source::increment(src.kind, strength, &ctx);
                let added = c * volume_out;
                self.source_mass[n] += added;
                if self.in_report_window(step) {
                    self.totals.source += added;
                }
                Injection {
                    added: c,
                    pinned: None,
                }
            }
        }
    }
}
