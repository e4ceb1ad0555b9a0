//! Scripted hydraulic sources.
//!
//! [`ScriptedHydraulics`] replays a fixed list of intervals, so engine
//! tests can drive flow reversals and closures without a hydraulic
//! solver.

use plume_core::{HydraulicSource, HydraulicState, LinkStatus, QualityError};

/// One scripted interval.
#[derive(Clone, Debug, PartialEq)]
pub struct Interval {
    pub start: u64,
    pub flows: Vec<f64>,
    pub demands: Vec<f64>,
    pub status: Option<Vec<LinkStatus>>,
}

/// Replays intervals in order until `duration`.
///
/// Each interval runs until the next one starts; the last runs to
/// `duration`. Requests outside the script fail with
/// [`QualityError::HydraulicsUnavailable`].
#[derive(Clone, Debug, Default)]
pub struct ScriptedHydraulics {
    pub duration: u64,
    pub intervals: Vec<Interval>,
    /// Every time requested, in order.
    pub requests: Vec<u64>,
}

impl ScriptedHydraulics {
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Constant flows and demands for the whole run.
    pub fn steady(duration: u64, flows: Vec<f64>, demands: Vec<f64>) -> Self {
        Self::new(duration).then(0, flows, demands)
    }

    /// Append an interval starting at `start`.
    pub fn then(mut self, start: u64, flows: Vec<f64>, demands: Vec<f64>) -> Self {
        self.intervals.push(Interval {
            start,
            flows,
            demands,
            status: None,
        });
        self
    }

    /// Append an interval with explicit link status.
    pub fn then_with_status(
        mut self,
        start: u64,
        flows: Vec<f64>,
        demands: Vec<f64>,
        status: Vec<LinkStatus>,
    ) -> Self {
        self.intervals.push(Interval {
            start,
            flows,
            demands,
            status: Some(status),
        });
        self
    }
}

impl HydraulicSource for ScriptedHydraulics {
    fn state_at(&mut self, time: u64) -> Result<HydraulicState, QualityError> {
        self.requests.push(time);
        let idx = self
            .intervals
            .iter()
            .rposition(|i| i.start <= time)
            .ok_or_else(|| QualityError::HydraulicsUnavailable {
                reason: format!("no scripted interval covers t={time}"),
            })?;
        let end = self
            .intervals
            .get(idx + 1)
            .map_or(self.duration, |next| next.start);
        let interval = &self.intervals[idx];
        let mut state = HydraulicState::open(
            time,
            end.saturating_sub(time),
            interval.flows.clone(),
            interval.demands.clone(),
        );
        if let Some(status) = &interval.status {
            state.link_status = status.clone();
        }
        Ok(state)
    }
}
