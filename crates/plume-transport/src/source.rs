//! External water-quality sources.
//!
//! A source raises the quality of the water leaving its node. Each kind
//! converts the source strength into a concentration increment applied
//! to the node's outflow over one sub-step.

use plume_core::{Network, NodeKind, Source, SourceKind};

/// Source strength at quality time `time`: the base strength times the
/// pattern multiplier for the current pattern period.
pub fn strength(
    network: &Network,
    source: &Source,
    time: u64,
    pattern_step: u64,
    pattern_start: u64,
) -> f64 {
    let Some(pattern) = source.pattern.and_then(|p| network.pattern(p)) else {
        return source.base_strength;
    };
    let period = (time + pattern_start) / pattern_step.max(1);
    source.base_strength * pattern.factor(period)
}

/// Conditions at the node during one sub-step.
#[derive(Clone, Copy, Debug)]
pub struct SourceContext {
    /// What kind of node carries the source.
    pub node_kind: NodeKind,
    /// Node demand, m³/s (negative for external inflow).
    pub demand: f64,
    /// Node quality after mixing, before the source is applied.
    pub quality: f64,
    /// Volume leaving the node this sub-step, m³.
    pub volume_out: f64,
    /// Sub-step length, s.
    pub dt: f64,
}

/// Concentration added to the node's outflow by a source of the given
/// `kind` and current `strength`.
pub fn increment(kind: SourceKind, strength: f64, ctx: &SourceContext) -> f64 {
    match kind {
        SourceKind::Concentration => match ctx.node_kind {
            NodeKind::Junction if ctx.demand < 0.0 => {
                -strength * ctx.demand * ctx.dt / ctx.volume_out
            }
            NodeKind::Junction => 0.0,
            NodeKind::Reservoir | NodeKind::Tank(_) => strength,
        },
        SourceKind::MassFlow => strength * ctx.dt / ctx.volume_out,
        SourceKind::Setpoint => (strength - ctx.quality).max(0.0),
        SourceKind::FlowPaced => strength,
    }
}
