use cairn_canonical::{CanonicalizationError, NodeId};
use thiserror::Error;

/// Core error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Validation or canonicalization of the document failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    /// A node was requested that the given hash output does not cover.
    #[error("node {0} was not hashed in this output")]
    NotHashed(NodeId),
}
