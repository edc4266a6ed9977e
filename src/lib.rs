//! ibtopotool builds a graph of an InfiniBand fabric from the output of
//! `ibnetdiscover` and transforms it for Graphviz or Slurm `topology.conf`
//! generation.
use std::{collections::HashMap, fmt};

mod error;
pub mod filter;
pub mod hostlist;
pub mod parser;
pub mod pipeline;
pub mod relabel;
pub mod render;
pub mod roots;
pub mod speed;
pub mod tree;

pub use error::TopologyError;
pub use parser::LabelStyle;
pub use pipeline::{OutputFormat, Pipeline};
pub use roots::RootSet;
pub use speed::{speed_to_weight, SpeedError};

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum NodeKind {
    Switch,
    Host,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Switch => f.write_str("Switch"),
            NodeKind::Host => f.write_str("Host"),
        }
    }
}

/// A switch or channel adapter of the fabric, keyed by its GUID.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    guid: String,
    kind: NodeKind,
    description: String,
    label: String,
    rank: Option<u32>,
    root: bool,
}

impl Node {
    pub fn new(
        guid: impl Into<String>,
        kind: NodeKind,
        description: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Node {
            guid: guid.into(),
            kind,
            description: description.into(),
            label: label.into(),
            rank: None,
            root: false,
        }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_switch(&self) -> bool {
        self.kind == NodeKind::Switch
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Hop distance to the nearest root, known once the fabric was treeified.
    pub fn rank(&self) -> Option<u32> {
        self.rank
    }

    pub fn is_root(&self) -> bool {
        self.root
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// All physical links from one node to another, merged into a single edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    source: String,
    target: String,
    weight: f64,
    count: u32,
}

impl Link {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Sum of the bandwidth of the merged links.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Number of merged physical links.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.weight)
    }
}

/// Directed graph of a fabric.
///
/// Nodes and links keep the order in which they were first inserted, which
/// is the order of the ibnetdiscover dump for a parsed fabric. Every
/// traversal and every renderer follows that order.
#[derive(Debug, Clone, Default)]
pub struct Fabric {
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    links: Vec<Link>,
    link_index: HashMap<(String, String), usize>,
    rooted: bool,
}

impl Fabric {
    pub fn new() -> Self {
        Fabric::default()
    }

    /// Add a node, rejecting a GUID that is already present.
    ///
    /// On rejection the node is handed back unchanged.
    pub fn add_node(&mut self, node: Node) -> Result<(), Node> {
        if self.node_index.contains_key(&node.guid) {
            return Err(node);
        }
        self.node_index.insert(node.guid.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Record one physical link of the given weight from `source` to `target`.
    ///
    /// A second link between the same ordered pair is merged into the
    /// existing one: weights add up and the link count is incremented. Both
    /// endpoints must already be nodes of the fabric.
    pub fn add_link(
        &mut self,
        source: &str,
        target: &str,
        weight: f64,
    ) -> Result<(), TopologyError> {
        if let Some(missing) = [source, target].into_iter().find(|guid| !self.contains(guid)) {
            return Err(TopologyError::UnknownNode(missing.to_string()));
        }

        let key = (source.to_string(), target.to_string());
        match self.link_index.get(&key) {
            Some(&idx) => {
                let link = &mut self.links[idx];
                link.weight += weight;
                link.count += 1;
            }
            None => {
                self.link_index.insert(key, self.links.len());
                self.links.push(Link {
                    source: source.to_string(),
                    target: target.to_string(),
                    weight,
                    count: 1,
                });
            }
        }
        Ok(())
    }

    /// Copy a node of a fabric whose GUIDs are already unique, used when
    /// deriving a new fabric.
    pub(crate) fn push_node(&mut self, node: Node) {
        self.node_index.insert(node.guid.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    /// Copy an already merged link, used when deriving a new fabric.
    pub(crate) fn push_link(&mut self, link: Link) {
        let key = (link.source.clone(), link.target.clone());
        self.link_index.insert(key, self.links.len());
        self.links.push(link);
    }

    pub fn node(&self, guid: &str) -> Option<&Node> {
        self.node_index.get(guid).map(|&idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, guid: &str) -> Option<&mut Node> {
        match self.node_index.get(guid) {
            Some(&idx) => Some(&mut self.nodes[idx]),
            None => None,
        }
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.node_index.contains_key(guid)
    }

    pub fn link(&self, source: &str, target: &str) -> Option<&Link> {
        self.link_index
            .get(&(source.to_string(), target.to_string()))
            .map(|&idx| &self.links[idx])
    }

    pub fn has_link(&self, source: &str, target: &str) -> bool {
        self.link(source, target).is_some()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Targets of the links leaving `guid`, in insertion order.
    pub fn successors<'a>(&'a self, guid: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.links
            .iter()
            .filter(move |link| link.source == guid)
            .filter_map(move |link| self.node(&link.target))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Whether this fabric was produced by [`Fabric::treeify`].
    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    /// Empty fabric carrying the same rooted flag, used by transforms that
    /// derive a new fabric from this one.
    pub(crate) fn derived(&self) -> Fabric {
        Fabric {
            rooted: self.rooted,
            ..Fabric::default()
        }
    }
}
