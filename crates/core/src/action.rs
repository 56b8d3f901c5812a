//! Receiver callbacks expressed as data.

use notary_types::{Hash, NodeId, Position, Vote};
use std::collections::{HashMap, HashSet};

/// Output of an agreement instance.
///
/// Mirrors the callbacks of [`crate::AgreementReceiver`] except
/// `propose_block`, which needs an answer and cannot be queued. The runner
/// handles the actual signing, gossip and block fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgreementAction {
    /// A vote the local notary should sign, gossip and process.
    ProposeVote(Vote),

    /// The slot finalized `hash`, certified by the commit votes.
    ConfirmBlock {
        /// Finalized block hash.
        hash: Hash,
        /// Commit votes for the finalizing period, keyed by proposer.
        votes: HashMap<NodeId, Vote>,
    },

    /// Blocks referenced by votes that have not been seen locally.
    PullBlocks(HashSet<Hash>),

    /// The instance is waiting for votes and peers should be asked for them.
    PullVotes {
        /// Slot the votes are needed for.
        position: Position,
        /// Current period of the instance.
        period: u64,
    },
}

impl AgreementAction {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            AgreementAction::ProposeVote(_) => "ProposeVote",
            AgreementAction::ConfirmBlock { .. } => "ConfirmBlock",
            AgreementAction::PullBlocks(_) => "PullBlocks",
            AgreementAction::PullVotes { .. } => "PullVotes",
        }
    }
}
