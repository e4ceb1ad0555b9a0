//! Static network model consumed by the quality engine.
//!
//! The [`Network`] is immutable once built. It carries topology (link
//! endpoints and per-node incidence lists), pipe geometry and reaction
//! coefficients, tank parameters, time patterns and optional quality
//! sources. Construction goes through [`NetworkBuilder`], which maps
//! string ids to dense indices and validates everything the engine later
//! relies on.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::NetworkError;
use crate::id::{LinkId, NodeId, PatternId, TankId};

/// What a node is, hydraulically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A junction with (possibly negative) demand.
    Junction,
    /// A fixed-head boundary whose quality is a fixed boundary value.
    Reservoir,
    /// A storage tank; its state lives in the tank table.
    Tank(TankId),
}

/// How a [`Source`] contributes mass at its node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Fixed concentration of any external inflow (negative demand).
    Concentration,
    /// Fixed mass injection rate (mass/s), independent of flow.
    MassFlow,
    /// Raises outflow quality to at least the source strength.
    Setpoint,
    /// Adds a fixed concentration to all outflow.
    FlowPaced,
}

/// An external water-quality source attached to a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Source {
    /// How the source adds mass.
    pub kind: SourceKind,
    /// Base concentration (mass/m³) or mass rate (mass/s).
    pub base_strength: f64,
    /// Optional time pattern multiplying the base strength.
    pub pattern: Option<PatternId>,
}

/// A network node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// User-facing identifier.
    pub name: String,
    /// Junction, reservoir or tank.
    pub kind: NodeKind,
    /// Quality at the start of the run.
    pub initial_quality: f64,
    /// Optional external quality source.
    pub source: Option<Source>,
}

/// What a link is, hydraulically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// A pipe with physical volume and wall reactions.
    Pipe,
    /// A pump; carries no stored volume.
    Pump,
    /// A valve; carries no stored volume.
    Valve,
}

/// A network link.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    /// User-facing identifier.
    pub name: String,
    /// Pipe, pump or valve.
    pub kind: LinkKind,
    /// Start node; positive flow runs from `from` to `to`.
    pub from: NodeId,
    /// End node.
    pub to: NodeId,
    /// Length in m.
    pub length: f64,
    /// Diameter in m.
    pub diameter: f64,
    /// Bulk reaction coefficient (units depend on the bulk order, per s).
    pub bulk_coeff: f64,
    /// Wall reaction coefficient (m/s for first order, mass/m²/s for zero order).
    pub wall_coeff: f64,
}

impl Link {
    /// Physical volume in m³. Only pipes store water.
    pub fn volume(&self) -> f64 {
        match self.kind {
            LinkKind::Pipe => std::f64::consts::FRAC_PI_4 * self.length * self.diameter.powi(2),
            LinkKind::Pump | LinkKind::Valve => 0.0,
        }
    }

    /// The endpoint opposite to `node`.
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.to == node {
            self.from
        } else {
            self.to
        }
    }
}

/// Tank mixing model, fixed for the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MixModel {
    /// Single well-mixed compartment.
    #[default]
    CompleteMix,
    /// Fixed-size mixed zone plus a variable stagnant zone.
    TwoCompartment,
    /// Plug flow, first in first out.
    Fifo,
    /// Stacked plug flow, last in first out.
    Lifo,
}

/// A storage tank.
#[derive(Clone, Debug, PartialEq)]
pub struct Tank {
    /// The node this tank sits at.
    pub node: NodeId,
    /// Stored volume at the start of the run, m³.
    pub initial_volume: f64,
    /// Mixing model.
    pub mix_model: MixModel,
    /// Full mixed-zone volume for the two-compartment model, m³.
    pub mixing_zone_volume: f64,
    /// Bulk reaction coefficient for tank contents.
    pub bulk_coeff: f64,
}

/// Parameters for adding a tank through [`NetworkBuilder::add_tank`].
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TankSpec {
    /// Stored volume at the start of the run, m³.
    pub initial_volume: f64,
    /// Mixing model.
    pub mix_model: MixModel,
    /// Full mixed-zone volume (two-compartment only), m³.
    pub mixing_zone_volume: f64,
    /// Bulk reaction coefficient.
    pub bulk_coeff: f64,
}

/// Parameters for adding a pipe through [`NetworkBuilder::add_pipe`].
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PipeSpec {
    /// Length in m.
    pub length: f64,
    /// Diameter in m.
    pub diameter: f64,
    /// Bulk reaction coefficient.
    pub bulk_coeff: f64,
    /// Wall reaction coefficient.
    pub wall_coeff: f64,
}

/// A repeating sequence of multipliers.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    /// User-facing identifier.
    pub name: String,
    /// One multiplier per pattern period.
    pub multipliers: Vec<f64>,
}

impl Pattern {
    /// Multiplier in effect for pattern period `period` (wraps around).
    pub fn factor(&self, period: u64) -> f64 {
        if self.multipliers.is_empty() {
            return 1.0;
        }
        self.multipliers[(period % self.multipliers.len() as u64) as usize]
    }
}

/// Incident links of one node. Most nodes have four or fewer.
pub type Incidence = SmallVec<[LinkId; 4]>;

/// An immutable, validated pipe network.
#[derive(Clone, Debug)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    tanks: Vec<Tank>,
    patterns: Vec<Pattern>,
    incidence: Vec<Incidence>,
    node_index: IndexMap<String, NodeId>,
    link_index: IndexMap<String, LinkId>,
}

impl Network {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of tanks (reservoirs excluded).
    pub fn tank_count(&self) -> usize {
        self.tanks.len()
    }

    /// Total number of segment chains: one per link plus one per tank.
    pub fn chain_count(&self) -> usize {
        self.links.len() + self.tanks.len()
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Link by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.index()]
    }

    /// Tank by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn tank(&self, id: TankId) -> &Tank {
        &self.tanks[id.index()]
    }

    /// Pattern by id, if it exists.
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.index())
    }

    /// Links incident on `node`, in the order they were added.
    pub fn incident_links(&self, node: NodeId) -> &[LinkId] {
        &self.incidence[node.index()]
    }

    /// Look up a node by its user-facing id.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_index.get(name).copied()
    }

    /// Look up a link by its user-facing id.
    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_index.get(name).copied()
    }

    /// Iterate over `(id, node)` pairs.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Iterate over `(id, link)` pairs.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, l)| (LinkId(i as u32), l))
    }

    /// Iterate over `(id, tank)` pairs.
    pub fn tanks(&self) -> impl Iterator<Item = (TankId, &Tank)> {
        self.tanks
            .iter()
            .enumerate()
            .map(|(i, t)| (TankId(i as u32), t))
    }
}

/// Incremental builder for a [`Network`].
///
/// Node names must be unique among nodes and link names among links.
/// Links refer to their endpoints by name, so nodes are added first.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    tanks: Vec<Tank>,
    patterns: Vec<Pattern>,
    node_index: IndexMap<String, NodeId>,
    link_index: IndexMap<String, LinkId>,
}

impl NetworkBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a junction with the given initial quality.
    pub fn add_junction(&mut self, name: &str, initial_quality: f64) -> Result<NodeId, NetworkError> {
        self.push_node(name, NodeKind::Junction, initial_quality)
    }

    /// Add a reservoir whose quality is a fixed boundary value.
    pub fn add_reservoir(&mut self, name: &str, quality: f64) -> Result<NodeId, NetworkError> {
        self.push_node(name, NodeKind::Reservoir, quality)
    }

    /// Add a storage tank.
    pub fn add_tank(
        &mut self,
        name: &str,
        spec: TankSpec,
        initial_quality: f64,
    ) -> Result<NodeId, NetworkError> {
        let tank = TankId(self.tanks.len() as u32);
        for (label, value) in [
            ("initial volume", spec.initial_volume),
            ("mixing zone volume", spec.mixing_zone_volume),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NetworkError::InvalidTank {
                    node: NodeId(self.nodes.len() as u32),
                    reason: format!("{label} must be finite and >= 0, got {value}"),
                });
            }
        }
        let node = self.push_node(name, NodeKind::Tank(tank), initial_quality)?;
        self.tanks.push(Tank {
            node,
            initial_volume: spec.initial_volume,
            mix_model: spec.mix_model,
            mixing_zone_volume: spec.mixing_zone_volume,
            bulk_coeff: spec.bulk_coeff,
        });
        Ok(node)
    }

    /// Add a pipe from `from` to `to`.
    pub fn add_pipe(
        &mut self,
        name: &str,
        from: &str,
        to: &str,
        spec: PipeSpec,
    ) -> Result<LinkId, NetworkError> {
        for (label, value) in [("length", spec.length), ("diameter", spec.diameter)] {
            if !value.is_finite() || value < 0.0 {
                return Err(NetworkError::InvalidGeometry {
                    link: LinkId(self.links.len() as u32),
                    reason: format!("{label} must be finite and >= 0, got {value}"),
                });
            }
        }
        let id = self.push_link(name, LinkKind::Pipe, from, to)?;
        let link = &mut self.links[id.index()];
        link.length = spec.length;
        link.diameter = spec.diameter;
        link.bulk_coeff = spec.bulk_coeff;
        link.wall_coeff = spec.wall_coeff;
        Ok(id)
    }

    /// Add a pump from `from` to `to`.
    pub fn add_pump(&mut self, name: &str, from: &str, to: &str) -> Result<LinkId, NetworkError> {
        self.push_link(name, LinkKind::Pump, from, to)
    }

    /// Add a valve from `from` to `to`.
    pub fn add_valve(&mut self, name: &str, from: &str, to: &str) -> Result<LinkId, NetworkError> {
        self.push_link(name, LinkKind::Valve, from, to)
    }

    /// Add a time pattern.
    pub fn add_pattern(&mut self, name: &str, multipliers: Vec<f64>) -> PatternId {
        let id = PatternId(self.patterns.len() as u32);
        self.patterns.push(Pattern {
            name: name.to_string(),
            multipliers,
        });
        id
    }

    /// Attach a quality source to an existing node, replacing any previous one.
    pub fn set_source(&mut self, node: &str, source: Source) -> Result<NodeId, NetworkError> {
        let id = self.lookup(node)?;
        self.nodes[id.index()].source = Some(source);
        Ok(id)
    }

    /// Validate and freeze the network.
    pub fn build(self) -> Result<Network, NetworkError> {
        if self.nodes.is_empty() {
            return Err(NetworkError::Empty);
        }
        for (i, pattern) in self.patterns.iter().enumerate() {
            if pattern.multipliers.is_empty() {
                return Err(NetworkError::EmptyPattern {
                    pattern: PatternId(i as u32),
                });
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(pattern) = node.source.and_then(|s| s.pattern) {
                if pattern.index() >= self.patterns.len() {
                    return Err(NetworkError::UnknownPattern {
                        node: NodeId(i as u32),
                        pattern,
                    });
                }
            }
        }

        let mut incidence = vec![Incidence::new(); self.nodes.len()];
        for (i, link) in self.links.iter().enumerate() {
            let id = LinkId(i as u32);
            incidence[link.from.index()].push(id);
            incidence[link.to.index()].push(id);
        }

        Ok(Network {
            nodes: self.nodes,
            links: self.links,
            tanks: self.tanks,
            patterns: self.patterns,
            incidence,
            node_index: self.node_index,
            link_index: self.link_index,
        })
    }

    fn push_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        initial_quality: f64,
    ) -> Result<NodeId, NetworkError> {
        if self.node_index.contains_key(name) {
            return Err(NetworkError::DuplicateId {
                id: name.to_string(),
            });
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            initial_quality,
            source: None,
        });
        self.node_index.insert(name.to_string(), id);
        Ok(id)
    }

    fn push_link(
        &mut self,
        name: &str,
        kind: LinkKind,
        from: &str,
        to: &str,
    ) -> Result<LinkId, NetworkError> {
        if self.link_index.contains_key(name) {
            return Err(NetworkError::DuplicateId {
                id: name.to_string(),
            });
        }
        let from = self.lookup(from)?;
        let to = self.lookup(to)?;
        let id = LinkId(self.links.len() as u32);
        if from == to {
            return Err(NetworkError::SelfLoop { link: id });
        }
        self.links.push(Link {
            name: name.to_string(),
            kind,
            from,
            to,
            length: 0.0,
            diameter: 0.0,
            bulk_coeff: 0.0,
            wall_coeff: 0.0,
        });
        self.link_index.insert(name.to_string(), id);
        Ok(id)
    }

    fn lookup(&self, name: &str) -> Result<NodeId, NetworkError> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode {
                id: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pipe(length: f64, diameter: f64) -> PipeSpec {
        PipeSpec {
            length,
            diameter,
            ..PipeSpec::default()
        }
    }

    #[test]
    fn builder_assigns_dense_ids_and_incidence() {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", 1.0).unwrap();
        let j = b.add_junction("J", 0.0).unwrap();
        let p = b.add_pipe("P", "R", "J", pipe(100.0, 0.2)).unwrap();
        let net = b.build().unwrap();

        assert_eq!(net.node_count(), 2);
        assert_eq!(net.node_id("J"), Some(j));
        assert_eq!(net.link_id("P"), Some(p));
        assert_eq!(net.incident_links(r), &[p]);
        assert_eq!(net.incident_links(j), &[p]);
        assert_eq!(net.link(p).other_end(r), j);
    }

    #[test]
    fn pipe_volume_is_cylinder() {
        let mut b = NetworkBuilder::new();
        b.add_reservoir("R", 0.0).unwrap();
        b.add_junction("J", 0.0).unwrap();
        let p = b.add_pipe("P", "R", "J", pipe(10.0, 2.0)).unwrap();
        let pump = b.add_pump("U", "J", "R").unwrap();
        let net = b.build().unwrap();
        assert!((net.link(p).volume() - std::f64::consts::PI * 10.0).abs() < 1e-12);
        assert_eq!(net.link(pump).volume(), 0.0);
    }

    #[test]
    fn duplicate_and_unknown_ids_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_junction("J", 0.0).unwrap();
        assert!(matches!(
            b.add_junction("J", 0.0),
            Err(NetworkError::DuplicateId { .. })
        ));
        assert!(matches!(
            b.add_pipe("P", "J", "X", pipe(1.0, 1.0)),
            Err(NetworkError::UnknownNode { .. })
        ));
        assert!(matches!(
            b.add_pipe("P", "J", "J", pipe(1.0, 1.0)),
            Err(NetworkError::SelfLoop { .. })
        ));
    }

    #[test]
    fn negative_geometry_rejected() {
        let mut b = NetworkBuilder::new();
        b.add_junction("A", 0.0).unwrap();
        b.add_junction("B", 0.0).unwrap();
        assert!(matches!(
            b.add_pipe("P", "A", "B", pipe(-1.0, 1.0)),
            Err(NetworkError::InvalidGeometry { .. })
        ));
        // The rejected pipe left nothing behind.
        assert!(b.add_pipe("P", "A", "B", pipe(1.0, 1.0)).is_ok());
        assert_eq!(b.build().unwrap().link_count(), 1);
    }

    #[test]
    fn source_pattern_must_exist() {
        let mut b = NetworkBuilder::new();
        b.add_junction("J", 0.0).unwrap();
        b.set_source(
            "J",
            Source {
                kind: SourceKind::MassFlow,
                base_strength: 1.0,
                pattern: Some(PatternId(3)),
            },
        )
        .unwrap();
        assert!(matches!(
            b.build(),
            Err(NetworkError::UnknownPattern { .. })
        ));
    }

    #[test]
    fn pattern_factor_wraps() {
        let p = Pattern {
            name: "p".into(),
            multipliers: vec![1.0, 2.0, 3.0],
        };
        assert_eq!(p.factor(0), 1.0);
        assert_eq!(p.factor(4), 2.0);
    }

    proptest! {
        #[test]
        fn chain_of_junctions_has_degree_two_interior(n in 2usize..40) {
            let mut b = NetworkBuilder::new();
            for i in 0..n {
                b.add_junction(&format!("J{i}"), 0.0).unwrap();
            }
            for i in 1..n {
                b.add_pipe(&format!("P{i}"), &format!("J{}", i - 1), &format!("J{i}"), pipe(1.0, 0.1))
                    .unwrap();
            }
            let net = b.build().unwrap();
            prop_assert_eq!(net.incident_links(NodeId(0)).len(), 1);
            prop_assert_eq!(net.incident_links(NodeId(n as u32 - 1)).len(), 1);
            for i in 1..n - 1 {
                prop_assert_eq!(net.incident_links(NodeId(i as u32)).len(), 2);
            }
        }
    }
}
