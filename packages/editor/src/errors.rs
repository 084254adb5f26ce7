//! Error types for the editor

use scribe_dom::{DomError, NodeId};
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Offset must be a child index or node when splitting text node {0}")]
    InvalidSplitOffset(NodeId),

    #[error("Cannot split node {0} with no parent")]
    Detached(NodeId),

    #[error("Node {0} is not inside the editable root")]
    OutsideRoot(NodeId),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invariant violated: {0}")]
    Invariant(&'static str),

    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

impl EditorError {
    pub fn invariant(message: &'static str) -> Self {
        Self::Invariant(message)
    }
}
