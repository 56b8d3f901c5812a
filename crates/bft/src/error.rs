//! Agreement errors.

use notary_core::{AuthError, LeaderError};
use notary_types::{CryptoError, Hash, NodeId, Vote};
use thiserror::Error;

/// Errors returned by an agreement instance.
///
/// `Fork` and `ForkVote` are evidence of Byzantine behaviour by a single
/// notary; they do not affect the instance, which keeps processing
/// unrelated blocks and votes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgreementError {
    /// Vote proposer is not a member of the current notary set.
    #[error("{0} is not in the notary set")]
    NotInNotarySet(NodeId),

    /// Vote signature does not verify.
    #[error("Incorrect vote signature from {0}")]
    IncorrectVoteSignature(NodeId),

    /// Vote signature could not be checked.
    #[error("Vote signature verification failed: {0}")]
    SignatureVerification(#[from] CryptoError),

    /// Two different blocks from one proposer at the same position.
    #[error("Fork found for {proposer}, old {old:?}, new {new:?}")]
    Fork {
        /// Offending proposer.
        proposer: NodeId,
        /// Hash of the block recorded first.
        old: Hash,
        /// Hash of the conflicting block.
        new: Hash,
    },

    /// Two different votes from one proposer for the same period and type.
    #[error("Fork vote found for {proposer}, old {old}, new {new}")]
    ForkVote {
        /// Offending proposer.
        proposer: NodeId,
        /// Vote recorded first.
        old: Box<Vote>,
        /// Conflicting vote.
        new: Box<Vote>,
    },

    /// Leader selector rejected a block.
    #[error(transparent)]
    Leader(#[from] LeaderError),

    /// Authenticator failed to sign a vote.
    #[error(transparent)]
    Signing(#[from] AuthError),

    /// The instance is stopped and has no state to advance.
    #[error("Agreement is stopped")]
    Stopped,
}
