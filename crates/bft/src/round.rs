//! Per-round agreement state and quorum tally.

use crate::config::required_votes;
use crate::error::AgreementError;
use crate::state::AgreementState;
use indexmap::IndexMap;
use notary_types::{Hash, NodeId, Position, Vote, VoteType};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Votes of one type within one period, keyed by proposer in arrival order.
type VoteBucket = IndexMap<NodeId, Vote>;

/// All votes recorded for one period.
#[derive(Debug, Default)]
struct PeriodVotes {
    init: VoteBucket,
    pre_commit: VoteBucket,
    commit: VoteBucket,
}

impl PeriodVotes {
    fn bucket(&self, vote_type: VoteType) -> &VoteBucket {
        match vote_type {
            VoteType::Init => &self.init,
            VoteType::PreCommit => &self.pre_commit,
            VoteType::Commit => &self.commit,
        }
    }

    fn bucket_mut(&mut self, vote_type: VoteType) -> &mut VoteBucket {
        match vote_type {
            VoteType::Init => &mut self.init,
            VoteType::PreCommit => &mut self.pre_commit,
            VoteType::Commit => &mut self.commit,
        }
    }
}

/// Result of recording a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VoteInsert {
    /// First vote for its (period, type, proposer) key.
    Inserted,
    /// Identical to the vote already recorded.
    Duplicate,
}

/// Mutable consensus state for one position.
///
/// Owned by the agreement instance behind its round lock and replaced
/// wholesale on every restart. Invariants: `period` never decreases,
/// `lock_round <= period`, and at most one vote is kept per
/// (period, type, proposer).
#[derive(Debug)]
pub(crate) struct RoundState {
    position: Position,
    period: u64,
    lock_value: Hash,
    lock_round: u64,
    required_votes: usize,
    votes: BTreeMap<u64, PeriodVotes>,
    state: AgreementState,
    finalized: bool,
}

impl RoundState {
    /// Fresh state for `position` with a notary set of `notary_count`.
    pub(crate) fn new(position: Position, notary_count: usize) -> Self {
        let mut votes = BTreeMap::new();
        votes.insert(1, PeriodVotes::default());
        Self {
            position,
            period: 1,
            lock_value: Hash::NULL,
            lock_round: 1,
            required_votes: required_votes(notary_count),
            votes,
            state: AgreementState::Initial,
            finalized: false,
        }
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn period(&self) -> u64 {
        self.period
    }

    pub(crate) fn lock_value(&self) -> Hash {
        self.lock_value
    }

    pub(crate) fn lock_round(&self) -> u64 {
        self.lock_round
    }

    pub(crate) fn required_votes(&self) -> usize {
        self.required_votes
    }

    pub(crate) fn state(&self) -> AgreementState {
        self.state
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Hash that reached quorum among `vote_type` votes of `period`.
    ///
    /// With fewer than a third of faulty notaries at most one hash can
    /// qualify. If several do (only possible with Byzantine input beyond
    /// that bound) the lowest hash wins, so the result is deterministic.
    pub(crate) fn count_vote(&self, period: u64, vote_type: VoteType) -> Option<Hash> {
        let bucket = self.votes.get(&period)?.bucket(vote_type);
        let mut candidates: BTreeMap<Hash, usize> = BTreeMap::new();
        for vote in bucket.values() {
            *candidates.entry(vote.block_hash).or_insert(0) += 1;
        }
        candidates
            .into_iter()
            .find(|(_, count)| *count >= self.required_votes)
            .map(|(hash, _)| hash)
    }

    /// Number of distinct proposers with a `vote_type` vote in `period`.
    pub(crate) fn vote_count(&self, period: u64, vote_type: VoteType) -> usize {
        self.votes
            .get(&period)
            .map_or(0, |votes| votes.bucket(vote_type).len())
    }

    /// Copy of the `vote_type` votes of `period`, keyed by proposer.
    pub(crate) fn votes(&self, period: u64, vote_type: VoteType) -> HashMap<NodeId, Vote> {
        self.votes
            .get(&period)
            .map(|votes| {
                votes
                    .bucket(vote_type)
                    .iter()
                    .map(|(id, vote)| (*id, vote.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Real block hashes referenced by any vote of `period`.
    pub(crate) fn referenced_hashes(&self, period: u64) -> HashSet<Hash> {
        let Some(votes) = self.votes.get(&period) else {
            return HashSet::new();
        };
        VoteType::ALL
            .iter()
            .flat_map(|vote_type| votes.bucket(*vote_type).values())
            .map(|vote| vote.block_hash)
            .filter(|hash| !hash.is_sentinel())
            .collect()
    }

    /// Record a vote, creating its period lazily.
    ///
    /// A different vote already recorded for the same key is a fork-vote and
    /// leaves the state untouched.
    pub(crate) fn insert_vote(&mut self, vote: Vote) -> Result<VoteInsert, AgreementError> {
        let bucket = self
            .votes
            .entry(vote.period)
            .or_default()
            .bucket_mut(vote.vote_type);

        if let Some(existing) = bucket.get(&vote.proposer_id) {
            if existing.block_hash != vote.block_hash {
                return Err(AgreementError::ForkVote {
                    proposer: vote.proposer_id,
                    old: Box::new(existing.clone()),
                    new: Box::new(vote),
                });
            }
            return Ok(VoteInsert::Duplicate);
        }

        bucket.insert(vote.proposer_id, vote);
        Ok(VoteInsert::Inserted)
    }

    pub(crate) fn set_lock(&mut self, value: Hash, round: u64) {
        self.lock_value = value;
        self.lock_round = round;
    }

    /// Jump forward to `period`.
    ///
    /// Buckets of skipped periods stay absent and read as empty until a vote
    /// for them arrives.
    pub(crate) fn set_period(&mut self, period: u64) {
        self.period = self.period.max(period);
    }

    pub(crate) fn set_state(&mut self, state: AgreementState) {
        self.state = state;
    }

    pub(crate) fn finalize(&mut self) {
        self.finalized = true;
    }

    #[cfg(test)]
    pub(crate) fn has_period(&self, period: u64) -> bool {
        self.votes.contains_key(&period)
    }
}
