//! Collaborator traits consumed by the agreement instance.

use crate::{AuthError, LeaderError};
use notary_types::{Block, Hash, NodeId, Vote};
use std::collections::{HashMap, HashSet};

/// Sink for agreement events.
///
/// # Re-entrancy
///
/// The agreement instance never holds any of its locks while calling into
/// the receiver, so implementations may call back into the instance (for
/// example `prepare_vote` followed by `process_vote` from `propose_vote`).
pub trait AgreementReceiver: Send + Sync {
    /// The local notary should cast `vote`.
    ///
    /// The vote is unsigned and stamped with the instance's current
    /// position and period.
    fn propose_vote(&self, vote: Vote);

    /// Produce (or pick) the local notary's block for the current slot.
    ///
    /// Returns the hash of the proposed block.
    fn propose_block(&self) -> Hash;

    /// The slot has been finalized.
    ///
    /// Called at most once per round with the finalized hash and every
    /// commit vote recorded for the finalizing period.
    fn confirm_block(&self, hash: Hash, votes: HashMap<NodeId, Vote>);

    /// Fetch blocks that votes refer to but that have not arrived.
    ///
    /// The set is unordered.
    fn pull_blocks(&self, hashes: HashSet<Hash>);
}

/// Leader selection and candidate block validation.
///
/// Implementations guard their own state; every method takes `&self`.
pub trait LeaderSelector: Send + Sync {
    /// Validate and remember a candidate block.
    ///
    /// An error rejects the block before the agreement records it.
    fn process_block(&self, block: &Block) -> Result<(), LeaderError>;

    /// Forget all candidate blocks.
    fn restart(&self);

    /// Hash of the leader's block, or [`Hash::NULL`] if none is known.
    fn leader_block_hash(&self) -> Hash;
}

/// Signs votes on behalf of the local notary.
pub trait Authenticator: Send + Sync {
    /// Stamp `vote` with the local identity and attach a signature.
    fn sign_vote(&self, vote: &mut Vote) -> Result<(), AuthError>;
}
