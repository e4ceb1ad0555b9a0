//! Reporting accessors on [`QualitySolver`].
//!
//! All values reflect the state after the most recent `step()`/`next()`
//! (or `initialize()` before any step). They stay readable after
//! `close()`, except that link and tank values read from released
//! segment memory report empty chains.

use plume_core::{LinkId, NodeId, TankId};
use plume_transport::{MassBalance, ReactionTotals};

use crate::metrics::StepMetrics;
use crate::solver::QualitySolver;

/// A copy of every reported value at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityReport {
    /// Quality time of the report, seconds.
    pub time: u64,
    /// Quality at every node, indexed by [`NodeId`].
    pub node_quality: Vec<f64>,
    /// Average quality in every link, indexed by [`LinkId`].
    pub link_quality: Vec<f64>,
    /// Stored volume in every tank, indexed by [`TankId`].
    pub tank_volume: Vec<f64>,
    /// System mass balance.
    pub mass_balance: MassBalance,
    /// Reaction and source totals inside the reporting window.
    pub reaction_totals: ReactionTotals,
}

impl QualitySolver {
    /// Current quality time, seconds.
    pub fn time(&self) -> u64 {
        self.qtime
    }

    /// Quality at `node`: mass/m³, hours of age, or percent traced.
    pub fn node_quality(&self, node: NodeId) -> f64 {
        self.state.node_quality(node)
    }

    /// Volume-weighted average quality in `link`.
    pub fn link_quality(&self, link: LinkId) -> f64 {
        self.state.link_quality(&self.network, link)
    }

    /// Volume stored in `tank`, m³.
    pub fn tank_volume(&self, tank: TankId) -> f64 {
        self.state.tank_volume(tank)
    }

    /// Average reaction rate in `link` over the last sub-step, mass/m³/day.
    pub fn pipe_reaction_rate(&self, link: LinkId) -> f64 {
        self.state.pipe_reaction_rate(link)
    }

    /// Average rate at which the source at `node` has injected mass since
    /// initialization, mass/s. Zero before the first step.
    pub fn source_mass_rate(&self, node: NodeId) -> f64 {
        if self.qtime == 0 {
            0.0
        } else {
            self.state.source_mass(node) / self.qtime as f64
        }
    }

    /// System mass balance as of the last step.
    pub fn mass_balance(&self) -> &MassBalance {
        self.state.mass_balance()
    }

    /// Reaction and source totals inside the reporting window.
    pub fn reaction_totals(&self) -> &ReactionTotals {
        self.state.reaction_totals()
    }

    /// Metrics for the last `step()`/`next()`.
    pub fn metrics(&self) -> &StepMetrics {
        &self.metrics
    }

    /// Snapshot every reported value.
    pub fn report(&self) -> QualityReport {
        QualityReport {
            time: self.qtime,
            node_quality: self.state.node_qualities().to_vec(),
            link_quality: self
                .network
                .links()
                .map(|(k, _)| self.link_quality(k))
                .collect(),
            tank_volume: self
                .network
                .tanks()
                .map(|(t, _)| self.tank_volume(t))
                .collect(),
            mass_balance: *self.mass_balance(),
            reaction_totals: *self.reaction_totals(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityConfig;
    use plume_core::{HydraulicState, MixModel, Source, SourceKind};
    use plume_test_utils::tank_network;

    #[test]
    fn report_covers_every_element() {
        let net = tank_network(MixModel::CompleteMix, 1.0);
        let mut s = QualitySolver::open(net, QualityConfig::default()).unwrap();
        s.initialize().unwrap();
        let r = s.report();
        assert_eq!(r.time, 0);
        assert_eq!(r.node_quality.len(), 3);
        assert_eq!(r.link_quality.len(), 2);
        assert_eq!(r.tank_volume, vec![1000.0]);
        assert_eq!(r.mass_balance.ratio, 1.0);
    }

    #[test]
    fn source_rate_averages_over_elapsed_time() {
        let mut b = plume_core::NetworkBuilder::new();
        b.add_reservoir("R", 0.0).unwrap();
        b.add_junction("J", 0.0).unwrap();
        b.add_pipe("P", "R", "J", plume_test_utils::FIXTURE_PIPE).unwrap();
        let r = b
            .set_source(
                "R",
                Source {
                    kind: SourceKind::Concentration,
                    base_strength: 2.0,
                    pattern: None,
                },
            )
            .unwrap();
        let net = b.build().unwrap();
        let mut s = QualitySolver::open(
            net,
            QualityConfig {
                duration: 3600,
                ..QualityConfig::default()
            },
        )
        .unwrap();
        s.initialize().unwrap();
        assert_eq!(s.source_mass_rate(r), 0.0);
        s.load_hydraulics(HydraulicState::open(0, 3600, vec![0.01], vec![-0.01, 0.01]))
            .unwrap();
        s.next().unwrap();
        // 2 mass/m³ on 0.01 m³/s.
        assert!((s.source_mass_rate(r) - 0.02).abs() < 1e-12);
        assert!((s.reaction_totals().source - 0.02 * 3600.0).abs() < 1e-9);
    }
}
