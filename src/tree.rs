//! Rooted tree derivation.
//!
//! Every node is ranked by its hop distance to the nearest root, ignoring
//! link direction. Links pointing back towards the roots are then dropped,
//! so what remains fans out from the roots:
//!
//! ```text
//!        spine01 (0)     spine02 (0)
//!            |    \       /    |
//!            |     \     /     |
//!        leaf01 (1)     leaf02 (1)
//!          /   \          /   \
//!     node01   node02  node03  node04   (2)
//! ```
//!
//! Links between nodes of equal rank are kept in both directions.
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{info, warn};

use crate::{Fabric, RootSet, TopologyError};

impl Fabric {
    /// Rank every node against `roots` and return the pruned tree.
    ///
    /// Ranks and root markers are written to this fabric; the returned
    /// fabric is a new value holding the same nodes and only the links that
    /// do not point towards a root.
    pub fn treeify(&mut self, roots: &RootSet) -> Result<Fabric, TopologyError> {
        if let Some(missing) = roots.guids().find(|guid| !self.contains(guid)) {
            return Err(TopologyError::RootNotFound(missing.to_string()));
        }

        let ranks: Vec<Option<u32>> = {
            let distances = self.hop_distances(roots.guids());
            self.nodes()
                .map(|node| distances.get(node.guid()).copied())
                .collect()
        };
        let mut unreachable = Vec::new();
        for (node, rank) in self.nodes_mut().zip(ranks) {
            node.rank = rank;
            if rank.is_none() {
                unreachable.push(node.guid().to_string());
            }
        }
        for guid in roots.guids() {
            if let Some(node) = self.node_mut(guid) {
                node.root = true;
            }
        }
        if !unreachable.is_empty() {
            warn!(
                count = unreachable.len(),
                nodes = %unreachable.join(", "),
                "nodes not connected to any root are left unranked"
            );
        }

        let towards_root: HashSet<(String, String)> = self
            .links()
            .filter(|link| {
                let source = self.node(link.source()).and_then(|node| node.rank());
                let target = self.node(link.target()).and_then(|node| node.rank());
                matches!((source, target), (Some(s), Some(t)) if s > t)
            })
            .map(|link| (link.source().to_string(), link.target().to_string()))
            .collect();

        let tree = self.without_links(&towards_root);
        info!(
            roots = roots.len(),
            pruned = towards_root.len(),
            links = tree.link_count(),
            "treeified fabric"
        );
        Ok(tree)
    }

    /// Hop distance from every node reachable from `sources` to the nearest
    /// source, treating links as undirected. Sources themselves are at 0.
    pub fn hop_distances<'a>(
        &'a self,
        sources: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<&'a str, u32> {
        let mut neighbors: HashMap<&str, Vec<&str>> = HashMap::new();
        for link in self.links() {
            neighbors.entry(link.source()).or_default().push(link.target());
            neighbors.entry(link.target()).or_default().push(link.source());
        }

        let mut distance = HashMap::new();
        let mut queue = VecDeque::new();
        for source in sources {
            if distance.insert(source, 0).is_none() {
                queue.push_back(source);
            }
        }

        while let Some(guid) = queue.pop_front() {
            let next = distance[guid] + 1;
            for &neighbor in neighbors.get(guid).into_iter().flatten() {
                if !distance.contains_key(neighbor) {
                    distance.insert(neighbor, next);
                    queue.push_back(neighbor);
                }
            }
        }

        distance
    }

    /// Copy of this fabric with the given `(source, target)` links removed.
    fn without_links(&self, removed: &HashSet<(String, String)>) -> Fabric {
        let mut tree = self.derived();
        tree.rooted = true;
        for node in self.nodes() {
            tree.push_node(node.clone());
        }
        for link in self.links() {
            let key = (link.source().to_string(), link.target().to_string());
            if !removed.contains(&key) {
                tree.push_link(link.clone());
            }
        }
        tree
    }
}
