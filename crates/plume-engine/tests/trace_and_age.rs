//! Integration test: source tracing, water age and first-order decay.

use plume_core::{HydraulicState, MixModel, NetworkBuilder, PipeSpec, TankId};
use plume_engine::{QualityConfig, QualitySolver};
use plume_test_utils::{diamond_network, single_pipe_network, tank_network};
use plume_transport::{QualityMode, ReactionParams};

#[test]
fn diamond_trace_reports_traced_fraction() {
    // 3/4 of the flow reaching D passes through A.
    let net = diamond_network();
    let a = net.node_id("A").unwrap();
    let d = net.node_id("D").unwrap();
    let mut demands = vec![0.0; net.node_count()];
    demands[net.node_id("R").unwrap().index()] = -0.04;
    demands[d.index()] = 0.04;

    let mut solver = QualitySolver::open(
        net,
        QualityConfig {
            mode: QualityMode::Trace { node: a },
            quality_step: 60,
            duration: 7200,
            ..QualityConfig::default()
        },
    )
    .unwrap();
    solver.initialize().unwrap();
    solver
        .load_hydraulics(HydraulicState::open(
            0,
            7200,
            vec![0.03, 0.01, 0.03, 0.01],
            demands,
        ))
        .unwrap();
    solver.next().unwrap();

    assert_eq!(solver.node_quality(a), 100.0);
    assert!((solver.node_quality(d) - 75.0).abs() < 1e-9);
    assert!(solver.node_quality(solver.network().node_id("B").unwrap()).abs() < 1e-12);
}

#[test]
fn stagnant_water_ages_one_hour_per_hour() {
    let net = single_pipe_network(0.0, 0.0);
    let p = net.link_id("P").unwrap();
    let j = net.node_id("J").unwrap();
    let mut solver = QualitySolver::open(
        net,
        QualityConfig {
            mode: QualityMode::Age,
            quality_step: 300,
            duration: 3 * 3600,
            ..QualityConfig::default()
        },
    )
    .unwrap();
    solver.initialize().unwrap();
    solver
        .load_hydraulics(HydraulicState::open(0, 3 * 3600, vec![0.0], vec![0.0, 0.0]))
        .unwrap();
    solver.next().unwrap();

    assert!((solver.link_quality(p) - 3.0).abs() < 1e-9);
    // No inflow: the junction takes the age of the water next to it.
    assert!((solver.node_quality(j) - 3.0).abs() < 1e-9);
}

#[test]
fn stagnant_tank_ages() {
    let net = tank_network(MixModel::CompleteMix, 0.0);
    let mut solver = QualitySolver::open(
        net,
        QualityConfig {
            mode: QualityMode::Age,
            duration: 7200,
            ..QualityConfig::default()
        },
    )
    .unwrap();
    solver.initialize().unwrap();
    solver
        .load_hydraulics(HydraulicState::open(0, 7200, vec![0.0, 0.0], vec![0.0; 3]))
        .unwrap();
    solver.next().unwrap();
    let t = solver.network().node_id("T").unwrap();
    assert!((solver.node_quality(t) - 2.0).abs() < 1e-9);
    assert!((solver.tank_volume(TankId(0)) - 1000.0).abs() < 1e-9);
}

#[test]
fn first_order_decay_matches_travel_time() {
    let kb = -1e-4;
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", 1.0).unwrap();
    b.add_junction("J", 1.0).unwrap();
    b.add_pipe(
        "P",
        "R",
        "J",
        PipeSpec {
            length: 100.0,
            diameter: 0.2,
            bulk_coeff: kb,
            wall_coeff: 0.0,
        },
    )
    .unwrap();
    let net = b.build().unwrap();
    let j = net.node_id("J").unwrap();
    let p = net.link_id("P").unwrap();
    let travel = net.link(p).volume() / 0.01;

    let mut solver = QualitySolver::open(
        net,
        QualityConfig {
            quality_step: 60,
            duration: 7200,
            quality_tolerance: 1e-4,
            reactions: ReactionParams::default(),
            ..QualityConfig::default()
        },
    )
    .unwrap();
    solver.initialize().unwrap();
    solver
        .load_hydraulics(HydraulicState::open(0, 7200, vec![0.01], vec![-0.01, 0.01]))
        .unwrap();
    solver.next().unwrap();

    let expected = (kb * travel).exp();
    let got = solver.node_quality(j);
    assert!((got - expected).abs() < 0.01, "got {got}, expected {expected}");
    assert!(solver.reaction_totals().bulk > 0.0);
    assert!(solver.pipe_reaction_rate(p) > 0.0);
    assert!((solver.mass_balance().ratio - 1.0).abs() < 1e-6);
}
