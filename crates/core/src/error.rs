//! Errors reported by collaborators.

use notary_types::{Hash, NodeId};
use thiserror::Error;

/// Rejection of a candidate block by the leader selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaderError {
    /// The block hash is reserved or otherwise unusable.
    #[error("Invalid block {hash:?} from {proposer}")]
    InvalidBlock {
        /// Proposer of the rejected block.
        proposer: NodeId,
        /// Hash of the rejected block.
        hash: Hash,
    },
}

/// Failure to sign a vote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Signing backend failed.
    #[error("Signing failed: {0}")]
    Signing(String),
}
