//! Solver configuration, validation, and error types.
//!
//! [`QualityConfig`] is the input for opening a
//! [`QualitySolver`](crate::solver::QualitySolver).
//! [`validate()`](QualityConfig::validate) checks it against the network
//! before any memory is allocated.

use std::error::Error;
use std::fmt;

use plume_arena::{ArenaConfig, ArenaError};
use plume_core::{Network, NodeId};
use plume_transport::{
    QualityMode, ReactionParams, TransportParams, DEFAULT_QUALITY_TOLERANCE,
    DEFAULT_STAGNANT_FLOW,
};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`QualityConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The quality time step is zero.
    InvalidQualityStep,
    /// The reporting window starts after the end of the run.
    InvalidDuration {
        /// Report start, seconds.
        report_start: u64,
        /// Run duration, seconds.
        duration: u64,
    },
    /// A tolerance or threshold is negative or not finite.
    InvalidTolerance {
        /// Which setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A reaction parameter is out of range.
    InvalidReaction {
        /// Description of the bad value.
        reason: String,
    },
    /// The source pattern period is zero.
    InvalidPattern,
    /// Trace mode names a node that is not in the network.
    UnknownTraceNode {
        /// The missing node.
        node: NodeId,
    },
    /// Arena configuration is invalid or its first allocation failed.
    Arena(ArenaError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQualityStep => write!(f, "quality_step must be at least 1 s"),
            Self::InvalidDuration {
                report_start,
                duration,
            } => write!(
                f,
                "report_start {report_start} s is after the end of the run at {duration} s"
            ),
            Self::InvalidTolerance { name, value } => {
                write!(f, "{name} must be finite and >= 0, got {value}")
            }
            Self::InvalidReaction { reason } => write!(f, "invalid reaction parameters: {reason}"),
            Self::InvalidPattern => write!(f, "pattern_step must be at least 1 s"),
            Self::UnknownTraceNode { node } => write!(f, "trace node {node} is not in the network"),
            Self::Arena(e) => write!(f, "arena: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for ConfigError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

// ── QualityConfig ──────────────────────────────────────────────────

/// Complete configuration for a water-quality run.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityConfig {
    /// What the constituent represents.
    pub mode: QualityMode,
    /// Quality sub-step, seconds. Default: 300.
    pub quality_step: u64,
    /// Length of the run, seconds. Default: 86 400.
    pub duration: u64,
    /// Reaction and source totals accumulate from this time on. Default: 0.
    pub report_start: u64,
    /// Source pattern period, seconds. Default: 3600.
    pub pattern_step: u64,
    /// Time offset into source patterns, seconds. Default: 0.
    pub pattern_start: u64,
    /// Adjacent segments closer than this in quality are merged.
    pub quality_tolerance: f64,
    /// Flows below this magnitude (m³/s) count as stagnant.
    pub stagnant_flow: f64,
    /// Reaction kinetics.
    pub reactions: ReactionParams,
    /// Segment arena sizing.
    pub arena: ArenaConfig,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            mode: QualityMode::Chemical,
            quality_step: 300,
            duration: 86_400,
            report_start: 0,
            pattern_step: 3600,
            pattern_start: 0,
            quality_tolerance: DEFAULT_QUALITY_TOLERANCE,
            stagnant_flow: DEFAULT_STAGNANT_FLOW,
            reactions: ReactionParams::default(),
            arena: ArenaConfig::default(),
        }
    }
}

impl QualityConfig {
    /// Check every setting against `network`.
    pub fn validate(&self, network: &Network) -> Result<(), ConfigError> {
        if self.quality_step == 0 {
            return Err(ConfigError::InvalidQualityStep);
        }
        if self.report_start > self.duration {
            return Err(ConfigError::InvalidDuration {
                report_start: self.report_start,
                duration: self.duration,
            });
        }
        if self.pattern_step == 0 {
            return Err(ConfigError::InvalidPattern);
        }
        for (name, value) in [
            ("quality_tolerance", self.quality_tolerance),
            ("stagnant_flow", self.stagnant_flow),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        validate_reactions(&self.reactions)?;
        if let QualityMode::Trace { node } = self.mode {
            if node.index() >= network.node_count() {
                return Err(ConfigError::UnknownTraceNode { node });
            }
        }
        self.arena.validate()?;
        Ok(())
    }

    /// The subset of settings the transport layer needs.
    pub fn transport_params(&self) -> TransportParams {
        TransportParams {
            mode: self.mode,
            quality_tolerance: self.quality_tolerance,
            stagnant_flow: self.stagnant_flow,
            pattern_step: self.pattern_step,
            pattern_start: self.pattern_start,
            report_start: self.report_start,
            reactions: self.reactions.clone(),
        }
    }
}

fn validate_reactions(r: &ReactionParams) -> Result<(), ConfigError> {
    let invalid = |reason: String| Err(ConfigError::InvalidReaction { reason });
    for (name, value) in [
        ("bulk_order", r.bulk_order),
        ("tank_order", r.tank_order),
        ("limiting_concentration", r.limiting_concentration),
        ("diffusivity", r.diffusivity),
        ("viscosity", r.viscosity),
    ] {
        if !value.is_finite() {
            return invalid(format!("{name} must be finite, got {value}"));
        }
    }
    if r.wall_order != 0.0 && r.wall_order != 1.0 {
        return invalid(format!("wall_order must be 0 or 1, got {}", r.wall_order));
    }
    if r.limiting_concentration < 0.0 {
        return invalid(format!(
            "limiting_concentration must be >= 0, got {}",
            r.limiting_concentration
        ));
    }
    if r.diffusivity < 0.0 {
        return invalid(format!("diffusivity must be >= 0, got {}", r.diffusivity));
    }
    if r.viscosity <= 0.0 {
        return invalid(format!("viscosity must be > 0, got {}", r.viscosity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_test_utils::single_pipe_network;

    #[test]
    fn default_config_is_valid() {
        let net = single_pipe_network(1.0, 0.0);
        assert!(QualityConfig::default().validate(&net).is_ok());
    }

    #[test]
    fn zero_steps_rejected() {
        let net = single_pipe_network(1.0, 0.0);
        let cfg = QualityConfig {
            quality_step: 0,
            ..QualityConfig::default()
        };
        assert_eq!(cfg.validate(&net), Err(ConfigError::InvalidQualityStep));
        let cfg = QualityConfig {
            pattern_step: 0,
            ..QualityConfig::default()
        };
        assert_eq!(cfg.validate(&net), Err(ConfigError::InvalidPattern));
    }

    #[test]
    fn report_start_after_end_rejected() {
        let net = single_pipe_network(1.0, 0.0);
        let cfg = QualityConfig {
            duration: 3600,
            report_start: 7200,
            ..QualityConfig::default()
        };
        assert!(matches!(
            cfg.validate(&net),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn nan_tolerance_rejected() {
        let net = single_pipe_network(1.0, 0.0);
        let cfg = QualityConfig {
            quality_tolerance: f64::NAN,
            ..QualityConfig::default()
        };
        let err = cfg.validate(&net).unwrap_err();
        assert!(err.to_string().starts_with("quality_tolerance"));
        let cfg = QualityConfig {
            stagnant_flow: -1.0,
            ..QualityConfig::default()
        };
        assert!(matches!(
            cfg.validate(&net),
            Err(ConfigError::InvalidTolerance {
                name: "stagnant_flow",
                ..
            })
        ));
    }

    #[test]
    fn bad_reactions_rejected() {
        let net = single_pipe_network(1.0, 0.0);
        for reactions in [
            ReactionParams {
                wall_order: 2.0,
                ..ReactionParams::default()
            },
            ReactionParams {
                viscosity: 0.0,
                ..ReactionParams::default()
            },
            ReactionParams {
                bulk_order: f64::INFINITY,
                ..ReactionParams::default()
            },
        ] {
            let cfg = QualityConfig {
                reactions,
                ..QualityConfig::default()
            };
            assert!(matches!(
                cfg.validate(&net),
                Err(ConfigError::InvalidReaction { .. })
            ));
        }
    }

    #[test]
    fn trace_node_must_exist() {
        let net = single_pipe_network(1.0, 0.0);
        let cfg = QualityConfig {
            mode: QualityMode::Trace { node: NodeId(9) },
            ..QualityConfig::default()
        };
        assert_eq!(
            cfg.validate(&net),
            Err(ConfigError::UnknownTraceNode { node: NodeId(9) })
        );
    }

    #[test]
    fn arena_errors_are_wrapped() {
        let net = single_pipe_network(1.0, 0.0);
        let cfg = QualityConfig {
            arena: ArenaConfig {
                block_bytes: 1,
                ..ArenaConfig::default()
            },
            ..QualityConfig::default()
        };
        let err = cfg.validate(&net).unwrap_err();
        assert!(matches!(err, ConfigError::Arena(ArenaError::InvalidConfig { .. })));
        assert!(err.source().is_some());
    }
}
