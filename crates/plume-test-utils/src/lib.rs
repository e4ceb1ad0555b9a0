//! Test networks and scripted hydraulics for Plume development.
//!
//! Provides small hand-checkable networks ([`single_pipe_network`],
//! [`diamond_network`], [`tank_network`]), a scalable [`grid_network`]
//! for property tests and benchmarks, and [`ScriptedHydraulics`], a
//! [`HydraulicSource`](plume_core::HydraulicSource) that replays fixed
//! intervals.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::ScriptedHydraulics;

use plume_core::{MixModel, Network, NetworkBuilder, PipeSpec, TankSpec};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Pipe used by the small fixtures: 100 m of 0.2 m pipe, volume ~3.1416 m³.
pub const FIXTURE_PIPE: PipeSpec = PipeSpec {
    length: 100.0,
    diameter: 0.2,
    bulk_coeff: 0.0,
    wall_coeff: 0.0,
};

/// Reservoir `R` feeding junction `J` through pipe `P`.
pub fn single_pipe_network(reservoir_quality: f64, junction_quality: f64) -> Network {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", reservoir_quality).unwrap();
    b.add_junction("J", junction_quality).unwrap();
    b.add_pipe("P", "R", "J", FIXTURE_PIPE).unwrap();
    b.build().unwrap()
}

/// Reservoir `R` (quality 1) splitting to `A` and `B`, which rejoin at `D`.
///
/// Links are `RA`, `RB`, `AD`, `BD` in that order, all oriented away from
/// the reservoir.
pub fn diamond_network() -> Network {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", 1.0).unwrap();
    for n in ["A", "B", "D"] {
        b.add_junction(n, 0.0).unwrap();
    }
    for (name, from, to) in [("RA", "R", "A"), ("RB", "R", "B"), ("AD", "A", "D"), ("BD", "B", "D")] {
        b.add_pipe(name, from, to, FIXTURE_PIPE).unwrap();
    }
    b.build().unwrap()
}

/// Reservoir `R` -> pipe `IN` -> tank `T` -> pipe `OUT` -> junction `J`.
///
/// The tank holds 1000 m³ at quality 0 with a 200 m³ mixing zone.
pub fn tank_network(model: MixModel, reservoir_quality: f64) -> Network {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", reservoir_quality).unwrap();
    b.add_tank(
        "T",
        TankSpec {
            initial_volume: 1000.0,
            mix_model: model,
            mixing_zone_volume: 200.0,
            bulk_coeff: 0.0,
        },
        0.0,
    )
    .unwrap();
    b.add_junction("J", 0.0).unwrap();
    b.add_pipe("IN", "R", "T", FIXTURE_PIPE).unwrap();
    b.add_pipe("OUT", "T", "J", FIXTURE_PIPE).unwrap();
    b.build().unwrap()
}

/// A `rows` x `cols` grid with a reservoir `R` in one corner.
///
/// Nodes are named `N{r}_{c}` (the corner is `R`). Horizontal pipes are
/// `H{r}_{c}`, vertical pipes `V{r}_{c}`, each 50 m of 0.15 m pipe.
pub fn grid_network(rows: usize, cols: usize) -> Network {
    let name = |r: usize, c: usize| {
        if r == 0 && c == 0 {
            "R".to_string()
        } else {
            format!("N{r}_{c}")
        }
    };
    let spec = PipeSpec {
        length: 50.0,
        diameter: 0.15,
        bulk_coeff: 0.0,
        wall_coeff: 0.0,
    };
    let mut b = NetworkBuilder::new();
    for r in 0..rows {
        for c in 0..cols {
            if r == 0 && c == 0 {
                b.add_reservoir("R", 1.0).unwrap();
            } else {
                b.add_junction(&name(r, c), 0.0).unwrap();
            }
        }
    }
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                b.add_pipe(&format!("H{r}_{c}"), &name(r, c), &name(r, c + 1), spec)
                    .unwrap();
            }
            if r + 1 < rows {
                b.add_pipe(&format!("V{r}_{c}"), &name(r, c), &name(r + 1, c), spec)
                    .unwrap();
            }
        }
    }
    b.build().unwrap()
}

/// Seeded pseudo-random link flows in (-0.05, 0.05) m³/s, with about one
/// link in ten stagnant.
pub fn random_flows(network: &Network, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..network.link_count())
        .map(|_| {
            let u = unit(&mut rng);
            if u < 0.1 {
                0.0
            } else {
                (unit(&mut rng) - 0.5) * 0.1
            }
        })
        .collect()
}

fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Uniform `flow` along every link of a [`grid_network`], away from `R`,
/// with demands that close the balance at each node. Junctions on the
/// first row and column draw external inflow.
pub fn grid_flows(network: &Network, flow: f64) -> (Vec<f64>, Vec<f64>) {
    let flows = vec![flow; network.link_count()];
    let mut demands = vec![0.0; network.node_count()];
    for (_, link) in network.links() {
        demands[link.from.index()] -= flow;
        demands[link.to.index()] += flow;
    }
    (flows, demands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_dimensions() {
        let net = grid_network(3, 4);
        assert_eq!(net.node_count(), 12);
        assert_eq!(net.link_count(), 3 * 3 + 2 * 4);
        assert!(net.node_id("R").is_some());
    }

    #[test]
    fn grid_flows_balance_every_node() {
        let net = grid_network(3, 3);
        let (flows, demands) = grid_flows(&net, 0.01);
        assert_eq!(flows.len(), net.link_count());
        let total: f64 = demands.iter().sum();
        assert!(total.abs() < 1e-12);
        assert!(demands[net.node_id("R").unwrap().index()] < 0.0);
    }

    #[test]
    fn random_flows_are_reproducible() {
        let net = grid_network(4, 4);
        assert_eq!(random_flows(&net, 7), random_flows(&net, 7));
        assert_ne!(random_flows(&net, 7), random_flows(&net, 8));
        assert!(random_flows(&net, 7).iter().all(|q| q.abs() < 0.05));
    }
}
