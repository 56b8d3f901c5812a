//! Agreement votes.

use crate::{vote_message, CryptoError, Hash, NodeId, Position, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of vote cast within one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoteType {
    /// Initial vote for the block a notary proposed.
    Init,
    /// Vote for the block a notary is willing to lock on.
    PreCommit,
    /// Vote to finalize a block, or to skip the period.
    Commit,
}

impl VoteType {
    /// All vote types, in protocol order.
    pub const ALL: [VoteType; 3] = [VoteType::Init, VoteType::PreCommit, VoteType::Commit];

    /// Stable single-byte encoding used in signing messages.
    pub fn as_byte(self) -> u8 {
        match self {
            VoteType::Init => 0,
            VoteType::PreCommit => 1,
            VoteType::Commit => 2,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteType::Init => write!(f, "init"),
            VoteType::PreCommit => write!(f, "pre-commit"),
            VoteType::Commit => write!(f, "commit"),
        }
    }
}

/// Signature over a vote, together with the key that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSignature {
    /// Signing key; must hash to the vote's proposer id.
    pub public_key: PublicKey,
    /// Signature over [`vote_message`].
    pub signature: Signature,
}

/// A vote cast by a notary for one period of one agreement slot.
///
/// One vote per (proposer, period, type) is allowed. A second vote for the
/// same key with a different `block_hash` is a provable fork-vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Notary casting the vote.
    pub proposer_id: NodeId,

    /// Slot being voted on.
    pub position: Position,

    /// Sub-round within the slot.
    pub period: u64,

    /// Kind of vote.
    pub vote_type: VoteType,

    /// Voted block hash, or one of the sentinel hashes.
    pub block_hash: Hash,

    /// Signature, absent until the vote has been signed.
    pub signature: Option<VoteSignature>,
}

impl Vote {
    /// Create an unsigned vote.
    pub fn new(
        proposer_id: NodeId,
        position: Position,
        period: u64,
        vote_type: VoteType,
        block_hash: Hash,
    ) -> Self {
        Self {
            proposer_id,
            position,
            period,
            vote_type,
            block_hash,
            signature: None,
        }
    }

    /// Message covered by the vote signature.
    pub fn signing_message(&self) -> Vec<u8> {
        vote_message(&self.position, self.period, self.vote_type, &self.block_hash)
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vote({} {} period={} {} {:?})",
            self.proposer_id, self.position, self.period, self.vote_type, self.block_hash
        )
    }
}

/// Verify that a vote is signed by the notary it names.
///
/// Returns `Ok(false)` for an unsigned vote, for a signing key that does not
/// belong to `proposer_id`, or for a signature that does not match. Returns
/// `Err` only when the key or signature bytes are malformed.
pub fn verify_vote_signature(vote: &Vote) -> Result<bool, CryptoError> {
    let Some(signed) = &vote.signature else {
        return Ok(false);
    };
    if NodeId::from_public_key(&signed.public_key) != vote.proposer_id {
        return Ok(false);
    }
    signed
        .public_key
        .try_verify(&vote.signing_message(), &signed.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    fn signed_vote(key: &KeyPair, block_hash: Hash) -> Vote {
        let public_key = key.public_key();
        let mut vote = Vote::new(
            NodeId::from_public_key(&public_key),
            Position::new(0, 1),
            1,
            VoteType::PreCommit,
            block_hash,
        );
        vote.signature = Some(VoteSignature {
            signature: key.sign(&vote.signing_message()),
            public_key,
        });
        vote
    }

    #[test]
    fn test_verify_signed_vote() {
        let key = KeyPair::generate_ed25519();
        let vote = signed_vote(&key, Hash::from_bytes(b"block"));
        assert_eq!(verify_vote_signature(&vote), Ok(true));
    }

    #[test]
    fn test_unsigned_vote_does_not_verify() {
        let vote = Vote::new(
            NodeId(Hash::from_bytes(b"node")),
            Position::new(0, 1),
            1,
            VoteType::Init,
            Hash::NULL,
        );
        assert_eq!(verify_vote_signature(&vote), Ok(false));
    }

    #[test]
    fn test_tampered_vote_does_not_verify() {
        let key = KeyPair::generate_ed25519();
        let mut vote = signed_vote(&key, Hash::from_bytes(b"block"));
        vote.block_hash = Hash::from_bytes(b"other");
        assert_eq!(verify_vote_signature(&vote), Ok(false));
    }

    #[test]
    fn test_impersonation_does_not_verify() {
        let key = KeyPair::generate_ed25519();
        let mut vote = signed_vote(&key, Hash::from_bytes(b"block"));
        vote.proposer_id = NodeId(Hash::from_bytes(b"someone else"));
        assert_eq!(verify_vote_signature(&vote), Ok(false));
    }

    #[test]
    fn test_malformed_signature_is_an_error() {
        let key = KeyPair::generate_ed25519();
        let mut vote = signed_vote(&key, Hash::from_bytes(b"block"));
        if let Some(signed) = vote.signature.as_mut() {
            signed.signature = Signature::Ed25519(vec![0u8; 3]);
        }
        assert_eq!(
            verify_vote_signature(&vote),
            Err(CryptoError::MalformedSignature)
        );
    }
}
