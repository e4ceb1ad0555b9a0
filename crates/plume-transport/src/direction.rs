//! Per-link flow direction bookkeeping.

use log::debug;

use plume_core::{HydraulicState, LinkId, Network, NodeId};

/// Sign of a link's flow, with negligible flow treated as its own state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlowDirection {
    /// Flow runs from the link's `from` node to its `to` node.
    Positive,
    /// Flow is below the stagnant threshold (or the link is closed).
    #[default]
    Zero,
    /// Flow runs from `to` to `from`.
    Negative,
}

impl FlowDirection {
    /// Classify a flow rate against the stagnant threshold.
    pub fn of(flow: f64, stagnant_flow: f64) -> Self {
        if flow.abs() < stagnant_flow {
            Self::Zero
        } else if flow > 0.0 {
            Self::Positive
        } else if flow < 0.0 {
            Self::Negative
        } else {
            Self::Zero
        }
    }

    fn sign(self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Zero => 0,
            Self::Negative => -1,
        }
    }

    /// Whether going from `self` to `other` flips the sign of the flow.
    /// Transitions through zero do not count.
    pub fn reverses_to(self, other: Self) -> bool {
        self.sign() * other.sign() < 0
    }
}

/// Result of [`FlowDirections::update`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectionChange {
    /// Whether any link changed direction, including to or from zero.
    pub changed: bool,
    /// Links whose flow sign flipped; their segment chains must be reversed.
    pub reversed: Vec<LinkId>,
}

/// Current flow direction of every link.
#[derive(Clone, Debug)]
pub struct FlowDirections {
    dirs: Vec<FlowDirection>,
}

impl FlowDirections {
    /// All links start at [`FlowDirection::Zero`].
    pub fn new(link_count: usize) -> Self {
        Self {
            dirs: vec![FlowDirection::Zero; link_count],
        }
    }

    /// Reset every link to zero flow.
    pub fn reset(&mut self) {
        self.dirs.fill(FlowDirection::Zero);
    }

    /// Classify the flows of a new hydraulic state.
    ///
    /// Closed links count as zero flow.
    pub fn update(
        &mut self,
        hydraulics: &HydraulicState,
        stagnant_flow: f64,
    ) -> DirectionChange {
        let mut change = DirectionChange::default();
        for (k, dir) in self.dirs.iter_mut().enumerate() {
            let link = LinkId(k as u32);
            let new = FlowDirection::of(hydraulics.flow(link), stagnant_flow);
            if dir.reverses_to(new) {
                change.reversed.push(link);
            }
            if new != *dir {
                change.changed = true;
            }
            *dir = new;
        }
        if !change.reversed.is_empty() {
            debug!("{} links reversed flow direction", change.reversed.len());
        }
        change
    }

    /// Direction of `link`.
    pub fn get(&self, link: LinkId) -> FlowDirection {
        self.dirs[link.index()]
    }

    /// Upstream end of `link` under its current direction. Zero flow
    /// counts as positive.
    pub fn upstream(&self, network: &Network, link: LinkId) -> NodeId {
        let l = network.link(link);
        match self.get(link) {
            FlowDirection::Negative => l.to,
            _ => l.from,
        }
    }

    /// Downstream end of `link` under its current direction. Zero flow
    /// counts as positive.
    pub fn downstream(&self, network: &Network, link: LinkId) -> NodeId {
        let l = network.link(link);
        match self.get(link) {
            FlowDirection::Negative => l.from,
            _ => l.to,
        }
    }
}
