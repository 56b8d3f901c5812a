//! Test helpers for notary agreement.
//!
//! Provides a deterministic committee of signing notaries and a receiver
//! that records every callback an agreement instance makes.

use notary_core::AgreementReceiver;
use notary_types::{
    Block, Hash, KeyPair, KeyType, NodeId, Position, Vote, VoteSignature, VoteType,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Hash of a human-readable tag, for naming test blocks.
pub fn block_hash(tag: &str) -> Hash {
    Hash::from_bytes(tag.as_bytes())
}

/// A notary set with deterministic Ed25519 keys.
pub struct TestCommittee {
    keys: Vec<KeyPair>,
    node_ids: Vec<NodeId>,
}

impl TestCommittee {
    /// Create `size` notaries. Member `i` is keyed from seed `[i + 1; 32]`.
    pub fn new(size: usize) -> Self {
        let keys: Vec<KeyPair> = (0..size)
            .map(|i| {
                let seed = [(i as u8).wrapping_add(1); 32];
                KeyPair::from_seed(KeyType::Ed25519, &seed).expect("ed25519 seed is always valid")
            })
            .collect();
        let node_ids = keys
            .iter()
            .map(|key| NodeId::from_public_key(&key.public_key()))
            .collect();
        Self { keys, node_ids }
    }

    /// Number of notaries.
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Id of member `i`.
    pub fn node_id(&self, i: usize) -> NodeId {
        self.node_ids[i]
    }

    /// Signing key of member `i`.
    pub fn key(&self, i: usize) -> &KeyPair {
        &self.keys[i]
    }

    /// The whole committee as a notary set.
    pub fn notary_set(&self) -> HashSet<NodeId> {
        self.node_ids.iter().copied().collect()
    }

    /// A vote from member `i`, signed with its key.
    pub fn vote(
        &self,
        i: usize,
        position: Position,
        period: u64,
        vote_type: VoteType,
        hash: Hash,
    ) -> Vote {
        let mut vote = Vote::new(self.node_id(i), position, period, vote_type, hash);
        self.sign(i, &mut vote);
        vote
    }

    /// Sign `vote` with member `i`'s key, leaving its proposer untouched.
    pub fn sign(&self, i: usize, vote: &mut Vote) {
        let key = self.key(i);
        vote.signature = Some(VoteSignature {
            public_key: key.public_key(),
            signature: key.sign(&vote.signing_message()),
        });
    }

    /// Signed votes of `vote_type` for `hash` from members `members`.
    pub fn votes(
        &self,
        members: impl IntoIterator<Item = usize>,
        position: Position,
        period: u64,
        vote_type: VoteType,
        hash: Hash,
    ) -> Vec<Vote> {
        members
            .into_iter()
            .map(|i| self.vote(i, position, period, vote_type, hash))
            .collect()
    }

    /// A block proposed by member `i`.
    pub fn block(&self, i: usize, position: Position, hash: Hash) -> Block {
        Block::new(self.node_id(i), position, hash)
    }
}

/// Receiver that records every callback.
///
/// `propose_block` answers with the configured hash, or with a hash derived
/// from the call count when none is set.
#[derive(Default)]
pub struct RecordingReceiver {
    proposed_votes: Mutex<Vec<Vote>>,
    confirmed: Mutex<Vec<(Hash, HashMap<NodeId, Vote>)>>,
    pulled: Mutex<Vec<HashSet<Hash>>>,
    proposals: Mutex<u64>,
    next_block: Mutex<Option<Hash>>,
}

impl RecordingReceiver {
    /// Create an empty receiver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer future `propose_block` calls with `hash`.
    pub fn set_next_block(&self, hash: Hash) {
        *self.next_block.lock() = Some(hash);
    }

    /// Votes handed to `propose_vote`, in call order.
    pub fn proposed_votes(&self) -> Vec<Vote> {
        self.proposed_votes.lock().clone()
    }

    /// Arguments of every `confirm_block` call.
    pub fn confirmed(&self) -> Vec<(Hash, HashMap<NodeId, Vote>)> {
        self.confirmed.lock().clone()
    }

    /// Arguments of every `pull_blocks` call.
    pub fn pulled(&self) -> Vec<HashSet<Hash>> {
        self.pulled.lock().clone()
    }

    /// Number of `propose_block` calls.
    pub fn proposals(&self) -> u64 {
        *self.proposals.lock()
    }
}

impl AgreementReceiver for RecordingReceiver {
    fn propose_vote(&self, vote: Vote) {
        self.proposed_votes.lock().push(vote);
    }

    fn propose_block(&self) -> Hash {
        let mut proposals = self.proposals.lock();
        *proposals += 1;
        self.next_block
            .lock()
            .unwrap_or_else(|| Hash::from_parts(&[b"proposal".as_slice(), &proposals.to_le_bytes()]))
    }

    fn confirm_block(&self, hash: Hash, votes: HashMap<NodeId, Vote>) {
        self.confirmed.lock().push((hash, votes));
    }

    fn pull_blocks(&self, hashes: HashSet<Hash>) {
        self.pulled.lock().push(hashes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_types::verify_vote_signature;

    #[test]
    fn test_committee_is_deterministic() {
        let a = TestCommittee::new(4);
        let b = TestCommittee::new(4);
        assert_eq!(a.notary_set(), b.notary_set());
        assert_eq!(a.notary_set().len(), 4);
    }

    #[test]
    fn test_committee_votes_verify() {
        let committee = TestCommittee::new(4);
        let vote = committee.vote(
            2,
            Position::new(0, 1),
            1,
            VoteType::Commit,
            block_hash("block"),
        );
        assert_eq!(verify_vote_signature(&vote), Ok(true));
    }

    #[test]
    fn test_recording_receiver() {
        let receiver = RecordingReceiver::new();
        let first = receiver.propose_block();
        let second = receiver.propose_block();
        assert_ne!(first, second);

        receiver.set_next_block(block_hash("fixed"));
        assert_eq!(receiver.propose_block(), block_hash("fixed"));
        assert_eq!(receiver.proposals(), 3);
    }
}
