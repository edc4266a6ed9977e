use std::collections::HashMap;

use tracing::debug;

use crate::Fabric;

impl Fabric {
    /// Give switches short labels of the form `s<rank>-<n>`, numbering the
    /// switches of each rank in insertion order.
    ///
    /// Only useful on a treeified fabric; switches without a rank keep their
    /// current label.
    pub fn relabel_switch_tree(&mut self) {
        let mut next_index: HashMap<u32, usize> = HashMap::new();

        for node in self.nodes_mut().filter(|node| node.is_switch()) {
            let rank = match node.rank() {
                Some(rank) => rank,
                None => continue,
            };
            let index = next_index.entry(rank).or_insert(0);
            let label = format!("s{}-{}", rank, index);
            debug!(guid = node.guid(), label = %label, "relabel switch");
            node.set_label(label);
            *index += 1;
        }
    }
}
