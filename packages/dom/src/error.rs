use thiserror::Error;

use crate::node::NodeId;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Cannot insert {child} into {parent}: {reason}")]
    HierarchyRequest {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Offset {offset} is out of bounds for node {node} of length {length}")]
    IndexSize {
        node: NodeId,
        offset: usize,
        length: usize,
    },
}

impl DomError {
    pub fn not_a_child(parent: NodeId, child: NodeId) -> Self {
        Self::NotAChild { parent, child }
    }

    pub fn hierarchy(parent: NodeId, child: NodeId, reason: &'static str) -> Self {
        Self::HierarchyRequest {
            parent,
            child,
            reason,
        }
    }

    pub fn index_size(node: NodeId, offset: usize, length: usize) -> Self {
        Self::IndexSize {
            node,
            offset,
            length,
        }
    }
}
