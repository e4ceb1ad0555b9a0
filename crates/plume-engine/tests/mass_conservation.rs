//! Integration test: system mass balance.
//!
//! With no reactions and no sources, every unit of mass must be stored,
//! delivered to a demand or absorbed by a reservoir. The mass balance
//! ratio stays at 1 through flow reversals, tank filling and draining,
//! and cyclic flow fields that force the sorter to break loops.

use plume_core::{HydraulicState, MixModel, Network};
use plume_engine::{QualityConfig, QualitySolver};
use plume_test_utils::{grid_flows, grid_network, random_flows, tank_network, ScriptedHydraulics};
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-6;

fn config(duration: u64) -> QualityConfig {
    QualityConfig {
        quality_step: 60,
        duration,
        ..QualityConfig::default()
    }
}

/// Demands that close the flow balance at every node.
fn closing_demands(network: &Network, flows: &[f64]) -> Vec<f64> {
    let mut demands = vec![0.0; network.node_count()];
    for (k, link) in network.links() {
        demands[link.from.index()] -= flows[k.index()];
        demands[link.to.index()] += flows[k.index()];
    }
    demands
}

#[test]
fn grid_balances_through_a_reversal() {
    let net = grid_network(4, 4);
    let (flows, demands) = grid_flows(&net, 0.01);
    let reversed: Vec<f64> = flows.iter().map(|q| -q).collect();
    let reversed_demands: Vec<f64> = demands.iter().map(|d| -d).collect();
    let mut hydraulics = ScriptedHydraulics::new(7200)
        .then(0, flows, demands)
        .then(3600, reversed, reversed_demands);

    let mut solver = QualitySolver::open(net, config(7200)).unwrap();
    solver.initialize().unwrap();
    solver.run(&mut hydraulics).unwrap();

    let mb = solver.mass_balance();
    assert!(mb.inflow > 0.0);
    assert!(mb.outflow > 0.0);
    assert!((mb.ratio - 1.0).abs() < TOLERANCE, "ratio {}", mb.ratio);
}

#[test]
fn every_tank_model_balances_fill_and_drain() {
    for model in [
        MixModel::CompleteMix,
        MixModel::TwoCompartment,
        MixModel::Fifo,
        MixModel::Lifo,
    ] {
        let net = tank_network(model, 1.0);
        // Node order R, T, J; link order IN, OUT.
        let mut hydraulics = ScriptedHydraulics::new(7200)
            .then(0, vec![0.02, 0.01], vec![-0.02, 0.01, 0.01])
            .then(3600, vec![0.005, 0.015], vec![-0.005, -0.01, 0.015]);
        let mut solver = QualitySolver::open(net, config(7200)).unwrap();
        solver.initialize().unwrap();
        solver.run(&mut hydraulics).unwrap();

        let ratio = solver.mass_balance().ratio;
        assert!((ratio - 1.0).abs() < TOLERANCE, "{model:?}: ratio {ratio}");
        let volume = solver.tank_volume(plume_core::TankId(0));
        assert!((volume - 1000.0).abs() < 1e-6, "{model:?}: volume {volume}");
    }
}

#[test]
fn initial_mass_is_counted_as_stored() {
    let mut b = plume_core::NetworkBuilder::new();
    b.add_reservoir("R", 0.0).unwrap();
    b.add_junction("J", 2.0).unwrap();
    b.add_pipe("P", "R", "J", plume_test_utils::FIXTURE_PIPE).unwrap();
    let pipe_net = b.build().unwrap();
    let volume = pipe_net.link(plume_core::LinkId(0)).volume();

    let mut solver = QualitySolver::open(pipe_net, config(3600)).unwrap();
    solver.initialize().unwrap();
    assert!((solver.mass_balance().initial - 2.0 * volume).abs() < 1e-9);

    // Flushing the pipe delivers all of it to the demand.
    solver
        .load_hydraulics(HydraulicState::open(0, 3600, vec![0.01], vec![-0.01, 0.01]))
        .unwrap();
    solver.next().unwrap();
    let mb = solver.mass_balance();
    assert!(mb.stored.abs() < 1e-9);
    assert!((mb.outflow - 2.0 * volume).abs() < 1e-9);
    assert!((mb.ratio - 1.0).abs() < TOLERANCE);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_flow_fields_conserve_mass(seed in 0u64..10_000) {
        let net = grid_network(4, 4);
        // Scaled so one sub-step never moves more than a pipe holds.
        // Sub-threshold flows are zeroed so every moving link has a
        // definite direction.
        let flows: Vec<f64> = random_flows(&net, seed)
            .iter()
            .map(|q| if q.abs() < 1e-5 { 0.0 } else { q * 0.1 })
            .collect();
        let demands = closing_demands(&net, &flows);
        let mut hydraulics = ScriptedHydraulics::steady(1800, flows, demands);

        let mut solver = QualitySolver::open(net, config(1800)).unwrap();
        solver.initialize().unwrap();
        solver.run(&mut hydraulics).unwrap();
        let ratio = solver.mass_balance().ratio;
        prop_assert!((ratio - 1.0).abs() < TOLERANCE, "ratio {}", ratio);
    }
}
