//! Bulk and wall reaction kinetics.
//!
//! Rates are in concentration units per second. Bulk reactions follow
//! n-th order kinetics (optionally with a limiting concentration) or
//! Michaelis-Menten kinetics for negative orders. Wall reactions are
//! limited by mass transfer from the bulk flow to the pipe wall.

use plume_core::{LinkKind, Network};

use crate::params::{QualityMode, ReactionParams};

/// Guard for near-zero denominators.
const TINY: f64 = 1e-6;

/// Stand-in for an unbounded mass transfer coefficient.
const BIG: f64 = 1e10;

/// Mass reacted or injected inside the reporting window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReactionTotals {
    /// Mass changed by bulk reactions in pipes.
    pub bulk: f64,
    /// Mass changed by wall reactions.
    pub wall: f64,
    /// Mass changed by bulk reactions in tanks.
    pub tank: f64,
    /// Mass added by sources.
    pub source: f64,
}

fn sgn(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Bulk reaction rate at concentration `c`.
pub fn bulk_rate(c: f64, kb: f64, order: f64, c_limit: f64) -> f64 {
    if order == 0.0 {
        return kb;
    }

    if order < 0.0 {
        let mut denom = c_limit + sgn(kb) * c;
        if denom.abs() < TINY {
            denom = sgn(denom) * TINY;
        }
        return kb * c / denom;
    }

    let c1 = if c_limit == 0.0 {
        c
    } else {
        (sgn(kb) * (c_limit - c)).max(0.0)
    };
    let potential = if order == 1.0 {
        c1
    } else if order == 2.0 {
        c1 * c
    } else {
        c1 * c.max(0.0).powf(order - 1.0)
    };
    kb * potential.max(0.0)
}

/// Reynolds number of `flow` (m³/s) through a pipe of `diameter` (m).
pub fn reynolds(flow: f64, diameter: f64, viscosity: f64) -> f64 {
    let area = std::f64::consts::FRAC_PI_4 * diameter * diameter;
    flow.abs() / area * diameter / viscosity
}

/// Wall reaction rate coefficient, including bulk-to-wall mass transfer.
///
/// For a zero-order wall reaction this is the mass transfer coefficient
/// itself (m/s); for first order it is the overall rate constant (1/s).
pub fn mass_transfer_coeff(
    params: &ReactionParams,
    flow: f64,
    diameter: f64,
    length: f64,
    kw: f64,
) -> f64 {
    if diameter == 0.0 {
        return 0.0;
    }
    let sc = params.schmidt();
    if sc == 0.0 {
        if params.wall_order == 0.0 {
            return BIG;
        }
        return 4.0 * kw / diameter;
    }

    let re = reynolds(flow, diameter, params.viscosity);
    let sh = if re < 1.0 {
        2.0
    } else if re >= 2300.0 {
        0.0149 * re.powf(0.88) * sc.powf(0.333)
    } else {
        let y = if length > 0.0 {
            diameter / length * re * sc
        } else {
            0.0
        };
        3.65 + 0.0668 * y / (1.0 + 0.04 * y.powf(0.667))
    };
    let kf = sh * params.diffusivity / diameter;

    if params.wall_order == 0.0 {
        return kf;
    }
    (4.0 / diameter) * kw * kf / (kf + kw.abs())
}

/// Wall reaction rate at concentration `c`, given the coefficient from
/// [`mass_transfer_coeff`].
pub fn wall_rate(c: f64, diameter: f64, kw: f64, kf: f64, wall_order: f64) -> f64 {
    if kw == 0.0 || diameter == 0.0 {
        return 0.0;
    }
    if wall_order == 0.0 {
        let limited = sgn(kw) * c * kf;
        let rate = if limited.abs() < kw.abs() { limited } else { kw };
        return rate * 4.0 / diameter;
    }
    c * kf
}

/// Per-pipe reaction coefficients for one hydraulic interval.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipeKinetics {
    /// Bulk coefficient.
    pub kb: f64,
    /// Wall coefficient.
    pub kw: f64,
    /// Coefficient from [`mass_transfer_coeff`] at the current flow.
    pub kf: f64,
    /// Pipe diameter, m.
    pub diameter: f64,
}

/// New concentration in a pipe segment after reacting for `dt` seconds.
///
/// Returns `(c_new, bulk_change, wall_change)`; the changes are the
/// signed concentration deltas of each mechanism. Water age adds `dt` in
/// hours with no bulk or wall components.
pub fn pipe_react(
    mode: QualityMode,
    params: &ReactionParams,
    pipe: &PipeKinetics,
    c: f64,
    dt: f64,
) -> (f64, f64, f64) {
    if mode == QualityMode::Age {
        return ((c + dt / 3600.0).max(0.0), 0.0, 0.0);
    }
    let dbulk = bulk_rate(c, pipe.kb, params.bulk_order, params.limiting_concentration) * dt;
    let dwall = wall_rate(c, pipe.diameter, pipe.kw, pipe.kf, params.wall_order) * dt;
    ((c + dbulk + dwall).max(0.0), dbulk, dwall)
}

/// New concentration in a tank segment after reacting for `dt` seconds.
///
/// Returns `(c_new, bulk_change)`.
pub fn tank_react(
    mode: QualityMode,
    params: &ReactionParams,
    c: f64,
    kb: f64,
    dt: f64,
) -> (f64, f64) {
    if mode == QualityMode::Age {
        return ((c + dt / 3600.0).max(0.0), 0.0);
    }
    let dc = bulk_rate(c, kb, params.tank_order, params.limiting_concentration) * dt;
    ((c + dc).max(0.0), dc)
}

/// Whether the constituent changes in storage: always for water age,
/// never for a trace, and for a chemical only if some pipe or tank has a
/// non-zero coefficient.
pub fn is_reactive(mode: QualityMode, network: &Network) -> bool {
    match mode {
        QualityMode::Age => true,
        QualityMode::Trace { .. } => false,
        QualityMode::Chemical => {
            network
                .links()
                .any(|(_, l)| l.kind == LinkKind::Pipe && (l.bulk_coeff != 0.0 || l.wall_coeff != 0.0))
                || network.tanks().any(|(_, t)| t.bulk_coeff != 0.0)
        }
    }
}
