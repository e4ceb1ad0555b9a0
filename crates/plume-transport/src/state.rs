//! Water-quality state of a network.
//!
//! [`QualityState`] owns everything that evolves during a run: node
//! qualities, the segment chains of every link and tank, flow directions,
//! the node ordering, reaction coefficients and the mass balance. The
//! network itself is borrowed per call and never mutated.

use log::debug;

use plume_arena::{ArenaConfig, ArenaError, ChainStore};
use plume_core::{
    ChainId, HydraulicState, LinkId, LinkKind, Network, NodeId, QualityError, TankId,
};

use crate::direction::{DirectionChange, FlowDirections};
use crate::kinetics::{self, ReactionTotals};
use crate::mass_balance::MassBalance;
use crate::params::{QualityMode, TransportParams, TRACE_QUALITY};
use crate::sequencer::{Sequencer, SortOutcome};
use crate::tank::TankMixer;

/// Evolving water-quality state of one network.
pub struct QualityState {
    pub(crate) params: TransportParams,
    pub(crate) reactive: bool,
    pub(crate) chains: ChainStore,
    pub(crate) directions: FlowDirections,
    sequencer: Sequencer,
    /// Copy of the current node ordering, taken while routing.
    pub(crate) order: Vec<NodeId>,
    needs_sort: bool,
    pub(crate) tanks: Vec<TankMixer>,
    pub(crate) node_quality: Vec<f64>,
    pub(crate) source_mass: Vec<f64>,
    /// Wall mass-transfer coefficient per link for the current interval.
    pub(crate) wall_coeff: Vec<f64>,
    pub(crate) pipe_rate: Vec<f64>,
    pub(crate) mass_balance: MassBalance,
    pub(crate) totals: ReactionTotals,
}

impl QualityState {
    /// Allocate state for `network`. Nothing is seeded until
    /// [`initialize`](Self::initialize).
    pub fn new(
        network: &Network,
        params: TransportParams,
        arena: ArenaConfig,
    ) -> Result<Self, ArenaError> {
        let links = network.link_count();
        let nodes = network.node_count();
        let tanks = network
            .tanks()
            .map(|(t, tank)| TankMixer::new(tank, ChainId::for_tank(t, links)))
            .collect();
        Ok(Self {
            params,
            reactive: false,
            chains: ChainStore::new(network.chain_count(), arena)?,
            directions: FlowDirections::new(links),
            sequencer: Sequencer::new(nodes),
            order: Vec::with_capacity(nodes),
            needs_sort: true,
            tanks,
            node_quality: vec![0.0; nodes],
            source_mass: vec![0.0; nodes],
            wall_coeff: vec![0.0; links],
            pipe_rate: vec![0.0; links],
            mass_balance: MassBalance::default(),
            totals: ReactionTotals::default(),
        })
    }

    /// Seed initial qualities and segments and zero every accumulator.
    ///
    /// Each pipe starts as one segment at the quality of its `to` node;
    /// each tank as one segment (two for the two-compartment model) at the
    /// tank's quality.
    pub fn initialize(&mut self, network: &Network) -> Result<(), QualityError> {
        let trace = match self.params.mode {
            QualityMode::Trace { node } => Some(node),
            _ => None,
        };
        for (n, node) in network.nodes() {
            self.node_quality[n.index()] = if trace.is_some() {
                0.0
            } else {
                node.initial_quality
            };
        }
        if let Some(node) = trace {
            self.node_quality[node.index()] = TRACE_QUALITY;
        }
        self.source_mass.fill(0.0);
        self.reactive = kinetics::is_reactive(self.params.mode, network);

        self.chains
            .reset()
            .map_err(|e| QualityError::AllocationFailed {
                reason: e.to_string(),
            })?;
        for (k, link) in network.links() {
            if link.kind == LinkKind::Pipe {
                let c = self.node_quality[link.to.index()];
                let _ = self
                    .chains
                    .add_segment(ChainId::for_link(k), link.volume(), c);
            }
        }
        for (t, tank) in network.tanks() {
            let c = self.node_quality[tank.node.index()];
            self.tanks[t.index()].fill(&mut self.chains, tank.initial_volume, c);
        }
        if self.chains.is_out_of_memory() {
            return Err(QualityError::AllocationFailed {
                reason: "segment arena exhausted while seeding initial segments".into(),
            });
        }

        self.directions.reset();
        self.needs_sort = true;
        self.wall_coeff.fill(0.0);
        self.pipe_rate.fill(0.0);
        self.totals = ReactionTotals::default();
        self.mass_balance = MassBalance::new(self.stored_mass());
        debug!(
            "seeded {} segments, {:.3} mass units stored",
            self.chains.live_segments(),
            self.mass_balance.initial
        );
        Ok(())
    }

    /// Recompute wall mass-transfer coefficients for the interval's flows.
    ///
    /// Only needed for reactive chemicals.
    pub fn update_rate_coefficients(&mut self, network: &Network, hydraulics: &HydraulicState) {
        for (k, link) in network.links() {
            self.wall_coeff[k.index()] = if link.kind == LinkKind::Pipe && link.wall_coeff != 0.0 {
                kinetics::mass_transfer_coeff(
                    &self.params.reactions,
                    hydraulics.flow(k),
                    link.diameter,
                    link.length,
                    link.wall_coeff,
                )
            } else {
                0.0
            };
        }
    }

    /// Classify the interval's flows and reverse the chains of links whose
    /// flow changed sign.
    pub fn update_directions(&mut self, hydraulics: &HydraulicState) -> DirectionChange {
        let change = self.directions.update(hydraulics, self.params.stagnant_flow);
        for &link in &change.reversed {
            self.chains.reverse(ChainId::for_link(link));
        }
        if change.changed {
            self.needs_sort = true;
        }
        change
    }

    /// Whether the node order is out of date.
    pub fn needs_sort(&self) -> bool {
        self.needs_sort
    }

    /// Re-sort nodes for the current flow directions.
    pub fn sort(&mut self, network: &Network) -> Result<&SortOutcome, QualityError> {
        let outcome = self.sequencer.sort(network, &self.directions)?;
        self.order.clear();
        self.order.extend_from_slice(&outcome.order);
        self.needs_sort = false;
        Ok(outcome)
    }

    /// Mass stored in every pipe and tank.
    pub fn stored_mass(&self) -> f64 {
        (0..self.chains.chain_count() as u32)
            .map(|c| self.chains.mass(ChainId(c)))
            .sum()
    }

    /// Refresh the stored mass and the mass balance ratio.
    pub fn evaluate_mass_balance(&mut self) {
        let stored = self.stored_mass();
        self.mass_balance.evaluate(stored);
    }

    /// Current quality at `node`.
    pub fn node_quality(&self, node: NodeId) -> f64 {
        self.node_quality[node.index()]
    }

    /// Current quality at every node, indexed by [`NodeId`].
    pub fn node_qualities(&self) -> &[f64] {
        &self.node_quality
    }

    /// Volume-weighted average quality in `link`, or the mean of its end
    /// nodes when it holds no water.
    pub fn link_quality(&self, network: &Network, link: LinkId) -> f64 {
        let chain = ChainId::for_link(link);
        let (v, m) = self
            .chains
            .iter(chain)
            .fold((0.0, 0.0), |(v, m), s| (v + s.volume, m + s.mass()));
        if v > 0.0 {
            m / v
        } else {
            let l = network.link(link);
            (self.node_quality[l.from.index()] + self.node_quality[l.to.index()]) / 2.0
        }
    }

    /// Volume stored in `tank`.
    pub fn tank_volume(&self, tank: TankId) -> f64 {
        self.tanks[tank.index()].volume(&self.chains)
    }

    /// Average reaction rate in `link` over the last sub-step, in mass per
    /// m³ per day. Chemical mode only; zero otherwise.
    pub fn pipe_reaction_rate(&self, link: LinkId) -> f64 {
        self.pipe_rate[link.index()]
    }

    /// Mass injected at `node` since initialization.
    pub fn source_mass(&self, node: NodeId) -> f64 {
        self.source_mass[node.index()]
    }

    /// Mass balance as of the last evaluation.
    pub fn mass_balance(&self) -> &MassBalance {
        &self.mass_balance
    }

    /// Reaction and source totals inside the reporting window.
    pub fn reaction_totals(&self) -> &ReactionTotals {
        &self.totals
    }

    /// Whether the constituent reacts in storage.
    pub fn is_reactive(&self) -> bool {
        self.reactive
    }

    /// Flow directions as of the last hydraulic load.
    pub fn directions(&self) -> &FlowDirections {
        &self.directions
    }

    /// The last node ordering.
    pub fn sort_outcome(&self) -> &SortOutcome {
        self.sequencer.outcome()
    }

    /// Segment storage, for inspection and metrics.
    pub fn chains(&self) -> &ChainStore {
        &self.chains
    }

    /// Whether segment allocation has failed since initialization.
    pub fn is_out_of_memory(&self) -> bool {
        self.chains.is_out_of_memory()
    }

    /// Transport parameters.
    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    /// Release all segment memory. Idempotent.
    pub fn destroy(&mut self) {
        self.chains.destroy();
    }
}
