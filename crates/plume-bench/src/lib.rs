//! Benchmark profiles and utilities for the Plume water-quality engine.
//!
//! Provides pre-built solver profiles for benchmarking:
//!
//! - [`reference_profile`]: 30x30 grid (900 nodes, 1740 pipes), one day
//!   of five-minute sub-steps with a flow reversal every six hours
//! - [`stress_profile`]: 100x100 grid (10K nodes) under seeded random
//!   flows that force the sorter to break cycles
//! - [`reversing_hydraulics`]: the alternating flow schedule used by both

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::error::Error;

use plume_core::Network;
use plume_engine::{QualityConfig, QualitySolver};
use plume_test_utils::{grid_flows, grid_network, random_flows, ScriptedHydraulics};

/// Hydraulic interval length used by the profiles, seconds.
pub const INTERVAL: u64 = 6 * 3600;

/// Duration of one profile run, seconds.
pub const DAY: u64 = 24 * 3600;

/// Uniform grid flows for [`INTERVAL`], then the same field reversed, for
/// a whole [`DAY`].
pub fn reversing_hydraulics(network: &Network, flow: f64) -> ScriptedHydraulics {
    let (flows, demands) = grid_flows(network, flow);
    let reversed: Vec<f64> = flows.iter().map(|q| -q).collect();
    let reversed_demands: Vec<f64> = demands.iter().map(|d| -d).collect();
    let mut hydraulics = ScriptedHydraulics::new(DAY);
    let mut start = 0;
    let mut forward = true;
    while start < DAY {
        hydraulics = if forward {
            hydraulics.then(start, flows.clone(), demands.clone())
        } else {
            hydraulics.then(start, reversed.clone(), reversed_demands.clone())
        };
        forward = !forward;
        start += INTERVAL;
    }
    hydraulics
}

/// Build the reference profile: an initialized solver over a 30x30 grid
/// and its hydraulic schedule.
pub fn reference_profile() -> Result<(QualitySolver, ScriptedHydraulics), Box<dyn Error>> {
    let network = grid_network(30, 30);
    let hydraulics = reversing_hydraulics(&network, 0.002);
    let mut solver = QualitySolver::open(
        network,
        QualityConfig {
            duration: DAY,
            ..QualityConfig::default()
        },
    )?;
    solver.initialize()?;
    Ok((solver, hydraulics))
}

/// Build the stress profile: a 100x100 grid whose flow field is seeded
/// noise, so nearly every sort has to break loops.
pub fn stress_profile(seed: u64) -> Result<(QualitySolver, ScriptedHydraulics), Box<dyn Error>> {
    let network = grid_network(100, 100);
    let flows: Vec<f64> = random_flows(&network, seed).iter().map(|q| q * 0.1).collect();
    let mut demands = vec![0.0; network.node_count()];
    for (k, link) in network.links() {
        demands[link.from.index()] -= flows[k.index()];
        demands[link.to.index()] += flows[k.index()];
    }
    let hydraulics = ScriptedHydraulics::steady(INTERVAL, flows, demands);
    let mut solver = QualitySolver::open(
        network,
        QualityConfig {
            duration: INTERVAL,
            ..QualityConfig::default()
        },
    )?;
    solver.initialize()?;
    Ok((solver, hydraulics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::HydraulicSource;

    #[test]
    fn reversing_schedule_alternates() {
        let net = grid_network(3, 3);
        let mut h = reversing_hydraulics(&net, 0.01);
        let first = h.state_at(0).unwrap();
        let second = h.state_at(INTERVAL).unwrap();
        assert_eq!(first.duration, INTERVAL);
        assert!(first.link_flows.iter().all(|&q| q > 0.0));
        assert!(second.link_flows.iter().all(|&q| q < 0.0));
        assert_eq!(h.state_at(DAY - 1).unwrap().end(), DAY);
    }

    #[test]
    fn reference_profile_runs_a_day() {
        let (mut solver, mut hydraulics) = reference_profile().unwrap();
        solver.run(&mut hydraulics).unwrap();
        assert_eq!(solver.time(), DAY);
        assert!((solver.mass_balance().ratio - 1.0).abs() < 1e-6);
    }
}
