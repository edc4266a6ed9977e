use crate::Fabric;

impl Fabric {
    /// The subgraph induced by the switches: hosts and every link touching a
    /// host are left out.
    pub fn only_switches(&self) -> Fabric {
        let mut switches = self.derived();
        for node in self.nodes().filter(|node| node.is_switch()) {
            switches.push_node(node.clone());
        }
        for link in self.links() {
            if switches.contains(link.source()) && switches.contains(link.target()) {
                switches.push_link(link.clone());
            }
        }
        switches
    }
}
