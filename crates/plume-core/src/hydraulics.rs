//! Hydraulic state consumed by the quality engine.
//!
//! The engine never solves hydraulics. A caller (or a
//! [`HydraulicSource`]) hands it one [`HydraulicState`] per hydraulic
//! interval: link flows, link status and node demands that stay constant
//! until the next hydraulic event.

use crate::error::QualityError;
use crate::id::{LinkId, NodeId};
use crate::network::Network;

/// Operating status of a link during a hydraulic interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LinkStatus {
    /// Open and carrying its reported flow.
    #[default]
    Open,
    /// Closed by a control or check valve; carries no flow.
    Closed,
    /// Temporarily closed by the hydraulic solver; carries no flow.
    TempClosed,
}

impl LinkStatus {
    /// Whether the link carries no flow regardless of the reported value.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed | Self::TempClosed)
    }
}

/// Constant hydraulic conditions over one hydraulic interval.
#[derive(Clone, Debug, PartialEq)]
pub struct HydraulicState {
    /// Start of the interval, seconds since simulation start.
    pub time: u64,
    /// Length of the interval in seconds.
    pub duration: u64,
    /// Signed flow per link in m³/s; positive runs from `from` to `to`.
    pub link_flows: Vec<f64>,
    /// Status per link.
    pub link_status: Vec<LinkStatus>,
    /// Demand per node in m³/s; negative values are external inflows.
    pub node_demands: Vec<f64>,
}

impl HydraulicState {
    /// A state with every link open.
    pub fn open(time: u64, duration: u64, link_flows: Vec<f64>, node_demands: Vec<f64>) -> Self {
        let link_status = vec![LinkStatus::Open; link_flows.len()];
        Self {
            time,
            duration,
            link_flows,
            link_status,
            node_demands,
        }
    }

    /// Effective flow through `link`: zero when the link is closed.
    pub fn flow(&self, link: LinkId) -> f64 {
        if self.link_status[link.index()].is_closed() {
            0.0
        } else {
            self.link_flows[link.index()]
        }
    }

    /// Demand at `node`.
    pub fn demand(&self, node: NodeId) -> f64 {
        self.node_demands[node.index()]
    }

    /// Time of the next hydraulic event.
    pub fn end(&self) -> u64 {
        self.time.saturating_add(self.duration)
    }

    /// Check that every array matches the network dimensions.
    pub fn check_dimensions(&self, network: &Network) -> Result<(), QualityError> {
        let checks = [
            ("link flows", network.link_count(), self.link_flows.len()),
            ("link status", network.link_count(), self.link_status.len()),
            ("node demands", network.node_count(), self.node_demands.len()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(QualityError::HydraulicsMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Supplier of hydraulic states, one interval at a time.
///
/// Implemented by a hydraulic solver, a results-file reader or a scripted
/// test fixture. The quality solver asks for the interval starting at
/// its current quality time whenever it runs out of hydraulics.
pub trait HydraulicSource {
    /// The hydraulic state for the interval starting at `time`.
    fn state_at(&mut self, time: u64) -> Result<HydraulicState, QualityError>;
}
