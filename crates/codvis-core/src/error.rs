//! Error types for tree and layout operations

use thiserror::Error;

use crate::model::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} is not part of this tree")]
    UnknownNode(NodeId),

    #[error("node {child} already belongs to parent {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    #[error("attaching {child} under {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },

    #[error("node {target} is not in the scope of {node}")]
    NotInScope { node: NodeId, target: NodeId },

    #[error("no class encloses node {0}")]
    NoEncapsulatingClass(NodeId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("invalid layout parameters: {0}")]
    InvalidParams(String),
}
