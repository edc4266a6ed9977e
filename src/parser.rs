//! Parser for the text output of `ibnetdiscover`.
//!
//! The dump is a sequence of blocks separated by blank lines. A block starts
//! with a `Switch` or `Ca` header naming the node, followed by one line per
//! connected port:
//!
//! ```text
//! Switch	36 "S-7cfe900300a0b000"		# "MF0;spine01:MSB7800/U1" enhanced port 0 lid 1 lmc 0
//! [1]	"S-7cfe900300a0c000"[35]		# "MF0;leaf01:MSB7800/U1" lid 3 4xEDR
//!
//! Ca	1 "H-0002c903000a0001"		# "node01 HCA-1"
//! [1](2c903000a0002) 	"S-7cfe900300a0c000"[1]		# lid 10 lmc 0 "MF0;leaf01:MSB7800/U1" lid 3 4xEDR
//! ```
//!
//! Anything outside a block (comments, `vendid=` and friends) is skipped.
//!
//! A link may point at a node whose block is missing from the dump. Such a
//! node is added after the declared ones, labeled with its GUID.
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::{speed::speed_to_weight, Fabric, Node, NodeKind, TopologyError};

/// How switch labels are built while parsing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// GUID and node description on two lines.
    #[default]
    Full,
    /// `s0`, `s1`, ... in order of appearance.
    Short,
}

#[derive(Debug)]
enum State {
    Idle,
    InSwitchBlock(String),
    InHostBlock(String),
}

impl State {
    fn current(&self) -> Option<&str> {
        match self {
            State::Idle => None,
            State::InSwitchBlock(guid) | State::InHostBlock(guid) => Some(guid.as_str()),
        }
    }
}

/// Line-by-line builder of a [`Fabric`].
pub struct TopologyParser {
    style: LabelStyle,
    fabric: Fabric,
    state: State,
    switch_index: usize,
    // (source, target, weight) in dump order, added once every block is known
    records: Vec<(String, String, f64)>,
}

impl TopologyParser {
    pub fn new(style: LabelStyle) -> Self {
        TopologyParser {
            style,
            fabric: Fabric::new(),
            state: State::Idle,
            switch_index: 0,
            records: Vec::new(),
        }
    }

    /// Consume one line of the dump. `number` is the 1-based line number
    /// used in error reports.
    pub fn feed_line(&mut self, number: usize, line: &str) -> Result<(), TopologyError> {
        if line.starts_with("Switch") {
            let guid = header_guid(number, line)?;
            let description = header_description(number, line)?;
            let label = match self.style {
                LabelStyle::Short => format!("s{}", self.switch_index),
                LabelStyle::Full => format!("{}\n{}", guid, description),
            };
            self.switch_index += 1;

            debug!(guid, description, "switch block");
            self.insert(number, Node::new(guid, NodeKind::Switch, description, label))?;
            self.state = State::InSwitchBlock(guid.to_string());
        } else if line.starts_with("Ca") {
            let guid = header_guid(number, line)?;
            let description = header_description(number, line)?;
            let label = description
                .split_whitespace()
                .next()
                .ok_or_else(|| parse_error(number, line, "empty host description"))?;

            debug!(guid, label, "host block");
            self.insert(number, Node::new(guid, NodeKind::Host, description, label))?;
            self.state = State::InHostBlock(guid.to_string());
        } else if line.trim().is_empty() {
            self.state = State::Idle;
        } else if let Some(current) = self.state.current() {
            let (target, weight) = link_record(number, line)?;
            self.records.push((current.to_string(), target.to_string(), weight));
        }

        Ok(())
    }

    /// Finish the parse and add the recorded links.
    ///
    /// Link targets that never got a block of their own become nodes with
    /// their GUID as label and an empty description.
    pub fn finish(self) -> Result<Fabric, TopologyError> {
        let mut fabric = self.fabric;

        for (_, target, _) in &self.records {
            if !fabric.contains(target) {
                warn!(guid = %target, "link target has no block in the dump");
                let kind = undeclared_kind(target);
                fabric.push_node(Node::new(target.as_str(), kind, "", target.as_str()));
            }
        }
        for (source, target, weight) in &self.records {
            fabric.add_link(source, target, *weight)?;
        }

        let switches = fabric.nodes().filter(|node| node.is_switch()).count();
        info!(
            switches,
            hosts = fabric.node_count() - switches,
            links = fabric.link_count(),
            "parsed fabric"
        );

        Ok(fabric)
    }

    fn insert(&mut self, number: usize, node: Node) -> Result<(), TopologyError> {
        self.fabric
            .add_node(node)
            .map_err(|node| TopologyError::DuplicateNode {
                line: number,
                guid: node.guid().to_string(),
            })
    }
}

/// Parse a whole ibnetdiscover dump.
pub fn parse(reader: impl Read, style: LabelStyle) -> Result<Fabric, TopologyError> {
    let mut parser = TopologyParser::new(style);
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        parser.feed_line(idx + 1, &line?)?;
    }
    parser.finish()
}

impl Fabric {
    pub fn from_ibnetdiscover(reader: impl Read, style: LabelStyle) -> Result<Self, TopologyError> {
        parse(reader, style)
    }

    pub fn from_path(path: impl AsRef<Path>, style: LabelStyle) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TopologyError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        parse(file, style)
    }
}

fn parse_error(number: usize, line: &str, reason: &'static str) -> TopologyError {
    TopologyError::Parse {
        line: number,
        content: line.to_string(),
        reason,
    }
}

/// ibnetdiscover prefixes switch GUIDs with `S-` and adapter GUIDs with `H-`.
/// A node known only from the links pointing at it is a host unless its
/// GUID says otherwise.
fn undeclared_kind(guid: &str) -> NodeKind {
    if guid.starts_with("S-") {
        NodeKind::Switch
    } else {
        NodeKind::Host
    }
}

/// Strip the quotes or brackets around a GUID token.
fn strip_guid(token: &str) -> Option<&str> {
    let opens = token.starts_with(&['"', '[', '('][..]);
    let closes = token.ends_with(&['"', ']', ')'][..]);
    if !opens || !closes || token.len() < 3 {
        return None;
    }
    Some(&token[1..token.len() - 1])
}

/// The header GUID is the token after the keyword and the port count.
fn header_guid(number: usize, line: &str) -> Result<&str, TopologyError> {
    line.split_whitespace()
        .nth(2)
        .and_then(strip_guid)
        .ok_or_else(|| parse_error(number, line, "malformed GUID in block header"))
}

/// The quoted text following the first `#` of a header.
fn header_description(number: usize, line: &str) -> Result<&str, TopologyError> {
    line.find('#')
        .and_then(|hash| line[hash..].split('"').nth(1))
        .ok_or_else(|| parse_error(number, line, "missing node description"))
}

/// Destination GUID and weight of a link record.
fn link_record(number: usize, line: &str) -> Result<(&str, f64), TopologyError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(parse_error(number, line, "truncated link record"));
    }

    let target = fields[1]
        .split('"')
        .nth(1)
        .filter(|guid| !guid.is_empty())
        .ok_or_else(|| parse_error(number, line, "missing destination GUID"))?;

    let weight = speed_to_weight(fields[fields.len() - 1]).map_err(|source| TopologyError::Speed {
        line: number,
        content: line.to_string(),
        source,
    })?;

    Ok((target, weight))
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;
    use crate::{test_util::FABRIC, SpeedError};

    const SPINE01: &str = "S-7cfe900300a0b000";
    const SPINE02: &str = "S-7cfe900300a0e000";
    const LEAF01: &str = "S-7cfe900300a0c000";
    const NODE01: &str = "H-0002c903000a0001";
    const NODE04: &str = "H-0002c903000a0031";

    fn parse_str(dump: &str, style: LabelStyle) -> Result<Fabric, TopologyError> {
        Fabric::from_ibnetdiscover(dump.as_bytes(), style)
    }

    #[test]
    fn test_parse_fixture() {
        let fabric = parse_str(FABRIC, LabelStyle::Full).unwrap();

        assert_eq!(fabric.node_count(), 8);
        assert_eq!(fabric.nodes().filter(|node| node.is_switch()).count(), 4);
        // 2 + 2 + 4 + 4 merged links listed by switches, 4 by hosts
        assert_eq!(fabric.link_count(), 16);

        let spine = fabric.node(SPINE01).unwrap();
        assert_eq!(spine.kind(), NodeKind::Switch);
        assert_eq!(spine.description(), "MF0;spine01:MSB7800/U1");
        assert_eq!(spine.label(), "S-7cfe900300a0b000\nMF0;spine01:MSB7800/U1");
        assert_eq!(spine.rank(), None);

        let host = fabric.node(NODE01).unwrap();
        assert_eq!(host.kind(), NodeKind::Host);
        assert_eq!(host.label(), "node01");
        assert_eq!(host.description(), "node01 HCA-1");
    }

    #[test]
    fn test_parallel_links_are_aggregated() {
        let fabric = parse_str(FABRIC, LabelStyle::Full).unwrap();

        let double = fabric.link(SPINE01, LEAF01).unwrap();
        assert_eq!(double.weight(), 200.0);
        assert_eq!(double.count(), 2);

        let back = fabric.link(LEAF01, SPINE01).unwrap();
        assert_eq!(back.weight(), 200.0);
        assert_eq!(back.count(), 2);

        let single = fabric.link(SPINE02, LEAF01).unwrap();
        assert_eq!(single.weight(), 100.0);
        assert_eq!(single.count(), 1);

        let fdr = fabric.link(NODE04, "S-7cfe900300a0d000").unwrap();
        assert!((fdr.weight() - 54.56).abs() < 1e-9);
    }

    #[test]
    fn test_short_labels_follow_switch_order() {
        let fabric = parse_str(FABRIC, LabelStyle::Short).unwrap();

        let labels: Vec<_> = fabric
            .nodes()
            .filter(|node| node.is_switch())
            .map(|node| node.label().to_string())
            .collect();
        assert_eq!(labels, ["s0", "s1", "s2", "s3"]);

        // host labels are unaffected
        assert_eq!(fabric.node(NODE01).unwrap().label(), "node01");
    }

    #[test]
    fn test_two_edr_links_between_one_pair() {
        let dump = "Switch\t8 \"0x1\"\t# \"S1\" enhanced port 0 lid 1 lmc 0\n\
                    [1]\t\"0x2\"[1]\t# \"S2\" lid 2 4xEDR\n\
                    [2]\t\"0x2\"[2]\t# \"S2\" lid 2 4xEDR\n\
                    \n\
                    Switch\t8 \"0x2\"\t# \"S2\" enhanced port 0 lid 2 lmc 0\n";
        let fabric = parse_str(dump, LabelStyle::Full).unwrap();

        assert_eq!(fabric.link_count(), 1);
        let link = fabric.link("0x1", "0x2").unwrap();
        assert_eq!(link.weight(), 200.0);
        assert_eq!(link.count(), 2);
        // the reverse direction is only known from the block of 0x2
        assert!(!fabric.has_link("0x2", "0x1"));
    }

    #[test]
    fn test_lines_outside_blocks_are_ignored() {
        let dump = "# Topology file\nvendid=0x2c9\n[1]\t\"0x9\"[1]\t# lid 1 4xEDR\n\
                    Switch\t8 \"0x1\"\t# \"S1\"\n";
        let fabric = parse_str(dump, LabelStyle::Full).unwrap();
        assert_eq!(fabric.node_count(), 1);
        assert_eq!(fabric.link_count(), 0);
    }

    #[test]
    fn test_unsupported_speed_fails_the_parse() {
        let dump = "Switch\t8 \"0x1\"\t# \"S1\"\n[1]\t\"0x2\"[1]\t# lid 2 4xFOO\n";
        match parse_str(dump, LabelStyle::Full) {
            Err(TopologyError::Speed { line, source, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(source, SpeedError::UnsupportedEncoding("FOO".to_string()));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_malformed_lines_fail_the_parse() {
        let cases = [
            ("Switch\t8\n", "malformed GUID in block header"),
            ("Switch\t8 S1\t# \"S1\"\n", "malformed GUID in block header"),
            ("Switch\t8 \"0x1\"\n", "missing node description"),
            ("Ca\t1 \"0x1\"\t# \"  \"\n", "empty host description"),
            ("Switch\t8 \"0x1\"\t# \"S1\"\n[1]\t4xEDR\n", "truncated link record"),
            (
                "Switch\t8 \"0x1\"\t# \"S1\"\n[1]\t0x2[1]\t# lid 2 4xEDR\n",
                "missing destination GUID",
            ),
        ];

        for (dump, expected) in cases {
            match parse_str(dump, LabelStyle::Full) {
                Err(TopologyError::Parse { reason, .. }) => {
                    assert_eq!(reason, expected, "{dump:?}")
                }
                other => panic!("{:?}: unexpected result {:?}", dump, other),
            }
        }
    }

    #[test]
    fn test_duplicate_guid_fails_the_parse() {
        let dump = "Switch\t8 \"0x1\"\t# \"S1\"\n\nSwitch\t8 \"0x1\"\t# \"S1 again\"\n";
        assert!(matches!(
            parse_str(dump, LabelStyle::Full),
            Err(TopologyError::DuplicateNode { line: 3, .. })
        ));
    }

    #[test]
    fn test_link_targets_without_a_block_become_nodes() {
        let dump = "Switch\t8 \"0x1\"\t# \"S1\"\n\
                    [1]\t\"0x2\"[1]\t# \"H1\" lid 2 4xQDR\n\
                    [2]\t\"0x3\"[1]\t# \"S2\" lid 3 4xEDR\n\
                    [3]\t\"S-0x4\"[1]\t# \"S3\" lid 4 4xEDR\n\
                    [4]\t\"0x2\"[2]\t# \"H1\" lid 2 4xQDR\n";
        let fabric = parse_str(dump, LabelStyle::Short).unwrap();

        let guids: Vec<_> = fabric.nodes().map(Node::guid).collect();
        assert_eq!(guids, ["0x1", "0x2", "0x3", "S-0x4"]);

        let undeclared = fabric.node("0x2").unwrap();
        assert_eq!(undeclared.label(), "0x2");
        assert_eq!(undeclared.description(), "");
        assert_eq!(undeclared.kind(), NodeKind::Host);
        assert_eq!(fabric.node("S-0x4").unwrap().kind(), NodeKind::Switch);

        assert_eq!(fabric.link_count(), 3);
        assert_eq!(fabric.link("0x1", "0x2").unwrap().weight(), 64.0);
        assert_eq!(fabric.link("0x1", "0x3").unwrap().weight(), 100.0);
        assert!(!fabric.has_link("0x3", "0x1"));
    }

    #[test]
    fn test_block_after_its_first_reference_keeps_dump_order() {
        let dump = "Switch\t8 \"0x1\"\t# \"S1\"\n\
                    [1]\t\"0x2\"[1]\t# \"S2\" lid 2 4xEDR\n\
                    \n\
                    Switch\t8 \"0x2\"\t# \"S2\"\n\
                    [1]\t\"0x1\"[1]\t# \"S1\" lid 1 4xEDR\n";
        let fabric = parse_str(dump, LabelStyle::Short).unwrap();

        let labels: Vec<_> = fabric.nodes().map(Node::label).collect();
        assert_eq!(labels, ["s0", "s1"]);
        assert_eq!(fabric.node("0x2").unwrap().kind(), NodeKind::Switch);
        assert_eq!(fabric.link_count(), 2);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FABRIC.as_bytes()).unwrap();

        let fabric = Fabric::from_path(file.path(), LabelStyle::Short).unwrap();
        assert_eq!(fabric.node_count(), 8);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            Fabric::from_path(&missing, LabelStyle::Short),
            Err(TopologyError::Open { .. })
        ));
    }
}
