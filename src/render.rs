//! Output formats: Graphviz DOT and Slurm `topology.conf`.
use std::{
    collections::HashMap,
    io::{self, Write},
};

use petgraph::{
    dot::{Config, Dot},
    graph::{DiGraph, NodeIndex, UnGraph},
    EdgeType, Graph,
};

use crate::{hostlist, Fabric, Link, Node};

/// Borrowing petgraph view of a fabric.
///
/// On an undirected view the two directions of a link share one edge,
/// carrying the attributes of the direction seen first.
fn to_graph<Ty: EdgeType>(fabric: &Fabric) -> Graph<&Node, &Link, Ty> {
    let mut graph = Graph::with_capacity(fabric.node_count(), fabric.link_count());
    let index: HashMap<&str, NodeIndex> = fabric
        .nodes()
        .map(|node| (node.guid(), graph.add_node(node)))
        .collect();

    for link in fabric.links() {
        let (source, target) = (index[link.source()], index[link.target()]);
        if !Ty::is_directed() && graph.find_edge(source, target).is_some() {
            continue;
        }
        graph.add_edge(source, target, link);
    }
    graph
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn node_attributes(node: &Node) -> String {
    let mut attributes = vec![
        format!("label = \"{}\"", escape(node.label())),
        format!("type = {}", node.kind()),
    ];
    if let Some(rank) = node.rank() {
        attributes.push(format!("rank = {}", rank));
    }
    if node.is_root() {
        attributes.push("root = true, style = filled, fillcolor = red".to_string());
    }
    attributes.join(", ")
}

fn link_attributes(link: &Link) -> String {
    format!("weight = {}, penwidth = {}", link.weight(), link.count())
}

const DOT_CONFIG: &[Config] = &[Config::NodeNoLabel, Config::EdgeNoLabel];

/// Write the fabric as a Graphviz graph.
///
/// A treeified fabric is written as an undirected `graph`, anything else as a
/// `digraph`.
pub fn write_dot(fabric: &Fabric, mut out: impl Write) -> io::Result<()> {
    if fabric.is_rooted() {
        let graph: UnGraph<&Node, &Link> = to_graph(fabric);
        let dot = Dot::with_attr_getters(
            &graph,
            DOT_CONFIG,
            &|_, edge| link_attributes(edge.weight()),
            &|_, (_, node)| node_attributes(node),
        );
        write!(out, "{}", dot)
    } else {
        let graph: DiGraph<&Node, &Link> = to_graph(fabric);
        let dot = Dot::with_attr_getters(
            &graph,
            DOT_CONFIG,
            &|_, edge| link_attributes(edge.weight()),
            &|_, (_, node)| node_attributes(node),
        );
        write!(out, "{}", dot)
    }
}

/// Write one `SwitchName=` line per switch, listing the switches and hosts
/// its links lead to.
pub fn write_slurm(fabric: &Fabric, mut out: impl Write) -> io::Result<()> {
    writeln!(out, "# topology.conf generated by ibtopotool")?;

    for switch in fabric.nodes().filter(|node| node.is_switch()) {
        let (switches, hosts): (Vec<&Node>, Vec<&Node>) = fabric
            .successors(switch.guid())
            .partition(|node| node.is_switch());

        let mut line = format!("SwitchName={}", switch.label());
        if !switches.is_empty() {
            let labels: Vec<&str> = switches.iter().map(|node| node.label()).collect();
            line.push_str(" Switches=");
            line.push_str(&hostlist::collect(&labels));
        }
        if !hosts.is_empty() {
            let labels: Vec<&str> = hosts.iter().map(|node| node.label()).collect();
            line.push_str(" Nodes=");
            line.push_str(&hostlist::collect(&labels));
        }
        writeln!(out, "{}", line)?;
    }

    Ok(())
}
