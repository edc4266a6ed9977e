use std::{
    fs,
    io::{self, Read},
    path::Path,
    str::FromStr,
};

use crate::TopologyError;

/// GUIDs of the nodes at the top of the tree, usually the spine switches.
///
/// Read from a file with one GUID per line; blank lines are skipped and `#`
/// starts a comment, either on its own line or after a GUID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    guids: Vec<String>,
}

impl RootSet {
    pub fn new<I, S>(guids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RootSet {
            guids: guids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Ok(parse_roots(&content))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| TopologyError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parse_roots(&content))
    }

    /// Root GUIDs in file order.
    pub fn guids(&self) -> impl Iterator<Item = &str> {
        self.guids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.guids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guids.is_empty()
    }
}

impl FromStr for RootSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_roots(s))
    }
}

fn parse_roots(content: &str) -> RootSet {
    let guids = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.find('#') {
            Some(comment) => line[..comment].trim_end(),
            None => line,
        })
        .map(str::to_string)
        .collect();

    RootSet { guids }
}
