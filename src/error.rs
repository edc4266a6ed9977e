use std::{io, path::PathBuf};

use crate::speed::SpeedError;

/// Errors raised while reading a fabric dump or transforming the fabric.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read error: {0}")]
    Io(#[from] io::Error),

    /// Malformed header or link record. `line` is 1-based.
    #[error("line {line}: {reason}: {content:?}")]
    Parse {
        line: usize,
        content: String,
        reason: &'static str,
    },

    #[error("line {line}: {source}: {content:?}")]
    Speed {
        line: usize,
        content: String,
        #[source]
        source: SpeedError,
    },

    #[error("line {line}: GUID {guid} is already declared")]
    DuplicateNode { line: usize, guid: String },

    /// A link endpoint that is not a node of the fabric.
    #[error("link endpoint {0} is not a node of the fabric")]
    UnknownNode(String),

    #[error("root {0} is not a node of the fabric")]
    RootNotFound(String),
}
