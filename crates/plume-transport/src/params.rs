//! Parameters shared by the transport and reaction routines.

use plume_core::NodeId;

/// Stagnant-flow threshold in m³/s (0.005 gpm).
pub const DEFAULT_STAGNANT_FLOW: f64 = 3.154e-7;

/// Default quality tolerance for merging adjacent segments.
pub const DEFAULT_QUALITY_TOLERANCE: f64 = 0.01;

/// Quality assigned to the trace node in source-trace mode (percent).
pub const TRACE_QUALITY: f64 = 100.0;

/// Seconds per day, for reporting reaction rates per day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// What the constituent represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QualityMode {
    /// A reacting (or conservative) chemical, in mass/m³.
    #[default]
    Chemical,
    /// Water age in hours.
    Age,
    /// Percentage of water originating at `node`.
    Trace {
        /// The traced node.
        node: NodeId,
    },
}

/// Reaction kinetics parameters, fixed for a run.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionParams {
    /// Bulk reaction order for pipes. Negative values select
    /// Michaelis-Menten kinetics.
    pub bulk_order: f64,
    /// Wall reaction order; only 0 and 1 are meaningful.
    pub wall_order: f64,
    /// Bulk reaction order for tanks.
    pub tank_order: f64,
    /// Limiting concentration for bulk reactions; 0 means no limit.
    pub limiting_concentration: f64,
    /// Molecular diffusivity of the constituent, m²/s.
    pub diffusivity: f64,
    /// Kinematic viscosity of water, m²/s.
    pub viscosity: f64,
}

impl ReactionParams {
    /// Default molecular diffusivity (chlorine in water), m²/s.
    pub const DEFAULT_DIFFUSIVITY: f64 = 1.208e-9;

    /// Default kinematic viscosity (water at 20 °C), m²/s.
    pub const DEFAULT_VISCOSITY: f64 = 1.0e-6;

    /// Schmidt number, or 0 when diffusivity is zero.
    pub fn schmidt(&self) -> f64 {
        if self.diffusivity > 0.0 {
            self.viscosity / self.diffusivity
        } else {
            0.0
        }
    }
}

impl Default for ReactionParams {
    fn default() -> Self {
        Self {
            bulk_order: 1.0,
            wall_order: 1.0,
            tank_order: 1.0,
            limiting_concentration: 0.0,
            diffusivity: Self::DEFAULT_DIFFUSIVITY,
            viscosity: Self::DEFAULT_VISCOSITY,
        }
    }
}

/// Everything routing needs besides the network and hydraulics.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportParams {
    /// Constituent type.
    pub mode: QualityMode,
    /// Qualities closer than this are merged into one segment.
    pub quality_tolerance: f64,
    /// Flows below this magnitude (m³/s) count as zero.
    pub stagnant_flow: f64,
    /// Source pattern period, seconds.
    pub pattern_step: u64,
    /// Time offset into source patterns, seconds.
    pub pattern_start: u64,
    /// Reaction and source totals accumulate from this hydraulic time on.
    pub report_start: u64,
    /// Reaction kinetics.
    pub reactions: ReactionParams,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            mode: QualityMode::Chemical,
            quality_tolerance: DEFAULT_QUALITY_TOLERANCE,
            stagnant_flow: DEFAULT_STAGNANT_FLOW,
            pattern_step: 3600,
            pattern_start: 0,
            report_start: 0,
            reactions: ReactionParams::default(),
        }
    }
}
