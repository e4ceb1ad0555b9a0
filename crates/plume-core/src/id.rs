//! Strongly-typed identifiers for network elements and segment chains.
//!
//! Every per-node and per-link array in the engine is indexed through one
//! of these newtypes, so a link index can never be used to read a node
//! quality by accident. All identifiers are dense and zero-based.

use std::fmt;

/// Identifies a node (junction, reservoir or tank) within a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The identifier as a `usize` array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a link (pipe, pump or valve) within a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u32);

impl LinkId {
    /// The identifier as a `usize` array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LinkId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a storage tank. Reservoirs are nodes, not tanks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TankId(pub u32);

impl TankId {
    /// The identifier as a `usize` array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TankId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a time pattern used to modulate source strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub u32);

impl PatternId {
    /// The identifier as a `usize` array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a segment chain.
///
/// Chains `0..link_count` belong to links; chains
/// `link_count..link_count + tank_count` belong to tanks. Use
/// [`ChainId::for_link`] and [`ChainId::for_tank`] rather than building
/// the offset by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u32);

impl ChainId {
    /// The chain holding the segments of `link`.
    pub fn for_link(link: LinkId) -> Self {
        Self(link.0)
    }

    /// The chain holding the segments of `tank` in a network with
    /// `link_count` links.
    pub fn for_tank(tank: TankId, link_count: usize) -> Self {
        Self(link_count as u32 + tank.0)
    }

    /// The identifier as a `usize` array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LinkId> for ChainId {
    fn from(link: LinkId) -> Self {
        Self::for_link(link)
    }
}

/// Identifies a memory pool within a segment arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u32);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tank_chains_follow_link_chains() {
        assert_eq!(ChainId::for_link(LinkId(3)), ChainId(3));
        assert_eq!(ChainId::for_tank(TankId(0), 5), ChainId(5));
        assert_eq!(ChainId::for_tank(TankId(2), 5).index(), 7);
    }

    #[test]
    fn ids_display_their_index() {
        assert_eq!(NodeId(4).to_string(), "4");
        assert_eq!(LinkId::from(9).index(), 9);
    }
}
