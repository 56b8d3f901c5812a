//! Agreement instance for one (chain, height) slot.
//!
//! # Locking
//!
//! Three disjoint lock scopes, always taken in this order:
//!
//! 1. `instance` → position, notary set, pending buffer, candidate pool
//! 2. `round` → period, lock value/round, vote tally, sub-state, finalized flag
//! 3. `blocks` → accepted block per proposer
//!
//! Only `restart` holds all three at once. Nothing takes `instance` while
//! holding `round` or `blocks`. The leader selector and the fast-forward
//! mailbox are leaf locks. Receiver callbacks run with no lock held.

use crate::config::AgreementConfig;
use crate::error::AgreementError;
use crate::fast_forward::FastForward;
use crate::pending::PendingBuffer;
use crate::round::{RoundState, VoteInsert};
use crate::state::AgreementState;
use notary_core::{AgreementReceiver, Authenticator, LeaderSelector};
use notary_types::{verify_vote_signature, Block, Hash, NodeId, Position, Vote, VoteType};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Result of polling an agreement with [`Agreement::done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The slot has been finalized.
    Finalized,
    /// The instance jumped to this period and restarted at pre-commit.
    FastForwarded(u64),
    /// Nothing to act on.
    Pending,
}

/// Instance-level fields guarded by the outermost lock.
#[derive(Debug)]
struct InstanceState {
    position: Position,
    notary_set: HashSet<NodeId>,
    pending: PendingBuffer,
    /// Every block accepted for `position`, by hash.
    candidates: HashMap<Hash, Block>,
}

/// Accepted blocks of the current position, one per proposer.
#[derive(Debug)]
struct BlockBook {
    position: Position,
    blocks: HashMap<NodeId, Block>,
}

impl BlockBook {
    fn new(position: Position) -> Self {
        Self {
            position,
            blocks: HashMap::new(),
        }
    }
}

/// Where an incoming message belongs relative to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Current,
    Stale,
    Future,
}

impl Admission {
    fn classify(current: Position, incoming: Position) -> Self {
        if incoming == current {
            Admission::Current
        } else if !current.is_stop() && current.newer(&incoming) {
            Admission::Stale
        } else {
            Admission::Future
        }
    }
}

/// Receiver work produced while recording a vote, run after locks drop.
#[derive(Debug)]
enum VoteEffect {
    None,
    Confirm {
        hash: Hash,
        votes: HashMap<NodeId, Vote>,
    },
    Pull(HashSet<Hash>),
}

/// Byzantine agreement for a single slot among a known notary set.
///
/// Blocks and votes arrive through [`process_block`](Self::process_block)
/// and [`process_vote`](Self::process_vote) from any thread. A driver calls
/// [`next_state`](Self::next_state) on clock ticks and polls
/// [`done`](Self::done) to learn about finalization or fast-forwards.
/// [`restart`](Self::restart) moves the instance to a new slot.
pub struct Agreement {
    node_id: NodeId,
    config: AgreementConfig,
    receiver: Arc<dyn AgreementReceiver>,
    leader: Arc<dyn LeaderSelector>,
    authenticator: Arc<dyn Authenticator>,
    instance: RwLock<InstanceState>,
    round: RwLock<RoundState>,
    blocks: Mutex<BlockBook>,
    fast_forward: FastForward,
}

impl Agreement {
    /// Create a stopped agreement instance.
    pub fn new(
        node_id: NodeId,
        config: AgreementConfig,
        receiver: Arc<dyn AgreementReceiver>,
        leader: Arc<dyn LeaderSelector>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let stopped = Position::stopped();
        let agreement = Self {
            node_id,
            config,
            receiver,
            leader,
            authenticator,
            instance: RwLock::new(InstanceState {
                position: stopped,
                notary_set: HashSet::new(),
                pending: PendingBuffer::new(),
                candidates: HashMap::new(),
            }),
            round: RwLock::new(RoundState::new(stopped, 0)),
            blocks: Mutex::new(BlockBook::new(stopped)),
            fast_forward: FastForward::new(),
        };
        agreement.stop();
        agreement
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start a new round for `position` with `notary_set`.
    ///
    /// Replaces all round state, then replays buffered blocks and votes that
    /// target `position`. Buffered entries for older positions are dropped,
    /// as are entries for newer positions that have waited longer than the
    /// configured expiry.
    pub fn restart(&self, notary_set: HashSet<NodeId>, position: Position) {
        let replay = {
            let mut instance = self.instance.write();
            let mut round = self.round.write();
            let mut book = self.blocks.lock();

            *round = RoundState::new(position, notary_set.len());
            *book = BlockBook::new(position);
            self.leader.restart();
            self.fast_forward.reset();
            instance.position = position;
            instance.notary_set = notary_set;
            instance.candidates.clear();

            if position.is_stop() {
                debug!(node = %self.node_id, "Agreement stopped");
                return;
            }

            info!(
                node = %self.node_id,
                %position,
                notaries = instance.notary_set.len(),
                required_votes = round.required_votes(),
                "Agreement restarted"
            );

            instance
                .pending
                .sweep(position, Instant::now(), self.config.pending_expiry)
        };

        if !replay.is_empty() {
            debug!(
                %position,
                blocks = replay.blocks.len(),
                votes = replay.votes.len(),
                "Replaying buffered messages"
            );
        }
        for block in replay.blocks {
            if let Err(error) = self.process_block(block) {
                warn!(%position, %error, "Replayed block rejected");
            }
        }
        for vote in replay.votes {
            if let Err(error) = self.process_vote(vote) {
                warn!(%position, %error, "Replayed vote rejected");
            }
        }
    }

    /// Stop the instance until the next restart.
    pub fn stop(&self) {
        self.restart(HashSet::new(), Position::stopped());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// The local notary.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The position this instance is deciding.
    pub fn agreement_id(&self) -> Position {
        self.instance.read().position
    }

    /// Whether `node_id` belongs to the current notary set.
    pub fn is_notary(&self, node_id: &NodeId) -> bool {
        self.instance.read().notary_set.contains(node_id)
    }

    /// Current sub-state.
    pub fn state(&self) -> AgreementState {
        self.round.read().state()
    }

    /// Clock ticks the current sub-state requires.
    pub fn clocks(&self) -> u32 {
        self.state().clocks()
    }

    /// Whether the instance needs more votes from peers to continue.
    pub fn pull_votes(&self) -> bool {
        self.state() == AgreementState::PullVote
    }

    /// Current period.
    pub fn period(&self) -> u64 {
        self.round.read().period()
    }

    /// Current lock value and lock round.
    pub fn lock(&self) -> (Hash, u64) {
        let round = self.round.read();
        (round.lock_value(), round.lock_round())
    }

    /// Matching votes required for quorum.
    pub fn required_votes(&self) -> usize {
        self.round.read().required_votes()
    }

    /// Whether this round has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.round.read().is_finalized()
    }

    /// Hash that reached quorum among `vote_type` votes of `period`.
    pub fn count_vote(&self, period: u64, vote_type: VoteType) -> Option<Hash> {
        self.round.read().count_vote(period, vote_type)
    }

    /// Copy of the recorded `vote_type` votes of `period`.
    pub fn votes(&self, period: u64, vote_type: VoteType) -> HashMap<NodeId, Vote> {
        self.round.read().votes(period, vote_type)
    }

    /// Block accepted from `proposer` in this round.
    pub fn block_from(&self, proposer: &NodeId) -> Option<Block> {
        self.blocks.lock().blocks.get(proposer).cloned()
    }

    /// Buffered (blocks, votes) waiting for a future position.
    pub fn pending_len(&self) -> (usize, usize) {
        let instance = self.instance.read();
        (instance.pending.block_count(), instance.pending.vote_count())
    }

    /// Pending fast-forward target, if one was posted and not yet consumed.
    pub fn pending_fast_forward(&self) -> Option<u64> {
        self.fast_forward.pending()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Driver
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fire the current sub-state's transition.
    ///
    /// Proposes the resulting vote, if any, through the receiver.
    pub fn next_state(&self) -> Result<(), AgreementError> {
        let (position, state) = {
            let round = self.round.read();
            (round.position(), round.state())
        };
        if position.is_stop() {
            return Err(AgreementError::Stopped);
        }

        let proposed = (state == AgreementState::Initial).then(|| self.receiver.propose_block());

        let proposal = {
            let mut round = self.round.write();
            if round.position() != position {
                debug!(%position, "Round moved on before state transition");
                return Ok(());
            }
            let current = round.state();
            let (next, vote) =
                current.advance(self.node_id, &mut round, proposed, self.leader.as_ref());
            round.set_state(next);
            debug!(
                %position,
                period = round.period(),
                from = %current,
                to = %next,
                "Agreement state advanced"
            );
            vote
        };

        if let Some(vote) = proposal {
            self.receiver.propose_vote(vote);
        }
        Ok(())
    }

    /// Poll for finalization or a pending fast-forward without blocking.
    ///
    /// A fast-forward target beyond the current period is adopted here: the
    /// period jumps to the target (skipped periods read as empty) and the
    /// sub-state resets to pre-commit. Targets at or below the current period are discarded.
    pub fn done(&self) -> Progress {
        let mut round = self.round.write();
        if round.is_finalized() {
            return Progress::Finalized;
        }
        match self.fast_forward.take() {
            Some(period) if period > round.period() => {
                info!(
                    position = %round.position(),
                    from = round.period(),
                    to = period,
                    "Fast-forwarding agreement"
                );
                round.set_period(period);
                round.set_state(AgreementState::PreCommit);
                Progress::FastForwarded(period)
            }
            _ => Progress::Pending,
        }
    }

    /// Stamp `vote` with the current position and sign it.
    pub fn prepare_vote(&self, vote: &mut Vote) -> Result<(), AgreementError> {
        vote.position = self.agreement_id();
        self.authenticator.sign_vote(vote)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Votes
    // ═══════════════════════════════════════════════════════════════════════════

    /// Entry point for an inbound vote.
    ///
    /// Votes for older positions are dropped and votes for later positions
    /// are buffered; neither is an error.
    pub fn process_vote(&self, vote: Vote) -> Result<(), AgreementError> {
        self.sanity_check(&vote)?;
        loop {
            if !self.admit_vote(&vote) {
                return Ok(());
            }
            // `None` means a restart slipped in between admission and
            // recording, so admission has to be decided again.
            if let Some(effect) = self.record_vote(&vote)? {
                self.dispatch(effect);
                return Ok(());
            }
        }
    }

    fn sanity_check(&self, vote: &Vote) -> Result<(), AgreementError> {
        if !self.is_notary(&vote.proposer_id) {
            return Err(AgreementError::NotInNotarySet(vote.proposer_id));
        }
        if !verify_vote_signature(vote)? {
            return Err(AgreementError::IncorrectVoteSignature(vote.proposer_id));
        }
        Ok(())
    }

    /// Returns true if the vote targets the current position.
    fn admit_vote(&self, vote: &Vote) -> bool {
        if self.instance.read().position == vote.position {
            return true;
        }
        let mut instance = self.instance.write();
        match Admission::classify(instance.position, vote.position) {
            Admission::Current => true,
            Admission::Stale => {
                trace!(vote = %vote, "Dropping stale vote");
                false
            }
            Admission::Future => {
                debug!(vote = %vote, current = %instance.position, "Buffering vote");
                instance.pending.push_vote(vote.clone(), Instant::now());
                false
            }
        }
    }

    fn record_vote(&self, vote: &Vote) -> Result<Option<VoteEffect>, AgreementError> {
        let mut round = self.round.write();
        if round.position() != vote.position {
            return Ok(None);
        }

        match round.insert_vote(vote.clone()) {
            Ok(VoteInsert::Inserted) => {}
            Ok(VoteInsert::Duplicate) => {
                trace!(vote = %vote, "Duplicate vote");
                return Ok(Some(VoteEffect::None));
            }
            Err(error) => {
                warn!(
                    proposer = %vote.proposer_id,
                    period = vote.period,
                    vote_type = %vote.vote_type,
                    "Fork vote detected"
                );
                return Err(error);
            }
        }

        if round.is_finalized() {
            return Ok(Some(VoteEffect::None));
        }

        let period = vote.period;
        match vote.vote_type {
            VoteType::Commit => {
                if let Some(hash) = round
                    .count_vote(period, VoteType::Commit)
                    .filter(|hash| !hash.is_skip())
                {
                    round.finalize();
                    info!(position = %vote.position, period, block = ?hash, "Agreement finalized");
                    return Ok(Some(VoteEffect::Confirm {
                        hash,
                        votes: round.votes(period, VoteType::Commit),
                    }));
                }

                // Quorum of commit votes without agreement: nobody can finish
                // this period, so move past it and fetch what was voted for.
                if period >= round.period()
                    && round.vote_count(period, VoteType::Commit) >= round.required_votes()
                {
                    let target = period.saturating_add(1);
                    debug!(position = %vote.position, period, target, "Commit quorum without agreement");
                    self.fast_forward.post(target);
                    return Ok(Some(VoteEffect::Pull(round.referenced_hashes(period))));
                }
            }
            VoteType::PreCommit => {
                if let Some(hash) = round
                    .count_vote(period, VoteType::PreCommit)
                    .filter(|hash| !hash.is_skip())
                {
                    let current = round.period();
                    if current >= period && period > round.lock_round() && hash != round.lock_value()
                    {
                        round.set_lock(hash, period);
                        debug!(position = %vote.position, period, block = ?hash, "Relocking on pre-commit quorum");
                        self.fast_forward.post(current.saturating_add(1));
                    } else if period > current {
                        round.set_lock(hash, period);
                        debug!(position = %vote.position, period, block = ?hash, "Pre-commit quorum in a later period");
                        self.fast_forward.post(period);
                    }
                }
            }
            VoteType::Init => {}
        }

        Ok(Some(VoteEffect::None))
    }

    fn dispatch(&self, effect: VoteEffect) {
        match effect {
            VoteEffect::None => {}
            VoteEffect::Confirm { hash, votes } => self.receiver.confirm_block(hash, votes),
            VoteEffect::Pull(hashes) => {
                let missing: HashSet<Hash> = {
                    let instance = self.instance.read();
                    hashes
                        .into_iter()
                        .filter(|hash| !instance.candidates.contains_key(hash))
                        .collect()
                };
                if !missing.is_empty() {
                    debug!(count = missing.len(), "Pulling missing blocks");
                    self.receiver.pull_blocks(missing);
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ═══════════════════════════════════════════════════════════════════════════

    /// Entry point for an inbound block.
    ///
    /// Serialized on the block lock only, so it does not contend with vote
    /// processing.
    pub fn process_block(&self, block: Block) -> Result<(), AgreementError> {
        loop {
            let mut book = self.blocks.lock();
            if book.position != block.position {
                drop(book);
                if self.admit_block(&block) {
                    continue;
                }
                return Ok(());
            }

            if let Some(existing) = book.blocks.get(&block.proposer_id) {
                if existing.hash != block.hash {
                    warn!(
                        proposer = %block.proposer_id,
                        position = %block.position,
                        old = ?existing.hash,
                        new = ?block.hash,
                        "Fork detected"
                    );
                    return Err(AgreementError::Fork {
                        proposer: block.proposer_id,
                        old: existing.hash,
                        new: block.hash,
                    });
                }
                return Ok(());
            }

            self.leader.process_block(&block)?;
            book.blocks.insert(block.proposer_id, block.clone());
            drop(book);

            trace!(proposer = %block.proposer_id, block = ?block.hash, "Block accepted");
            self.record_candidate(block);
            return Ok(());
        }
    }

    /// Returns true if the block targets the current position.
    fn admit_block(&self, block: &Block) -> bool {
        let mut instance = self.instance.write();
        match Admission::classify(instance.position, block.position) {
            Admission::Current => true,
            Admission::Stale => {
                trace!(block = ?block.hash, position = %block.position, "Dropping stale block");
                false
            }
            Admission::Future => {
                debug!(
                    block = ?block.hash,
                    position = %block.position,
                    current = %instance.position,
                    "Buffering block"
                );
                instance.pending.push_block(block.clone(), Instant::now());
                false
            }
        }
    }

    /// Add an accepted block to the pool unless the round has moved on.
    fn record_candidate(&self, block: Block) {
        let mut instance = self.instance.write();
        if instance.position == block.position {
            instance.candidates.insert(block.hash, block);
        }
    }

    /// Add a block to the candidate pool.
    pub fn add_candidate_block(&self, block: Block) {
        self.instance.write().candidates.insert(block.hash, block);
    }

    /// Look up a block in the candidate pool.
    pub fn find_candidate_block(&self, hash: &Hash) -> Option<Block> {
        self.instance.read().candidates.get(hash).cloned()
    }
}

impl std::fmt::Debug for Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let round = self.round.read();
        f.debug_struct("Agreement")
            .field("node_id", &self.node_id)
            .field("position", &round.position())
            .field("period", &round.period())
            .field("state", &round.state())
            .field("finalized", &round.is_finalized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KeyAuthenticator;
    use crate::leader::HashLeaderSelector;
    use notary_core::{AuthError, LeaderError};
    use notary_types::{CryptoError, Signature};
    use notary_test_helpers::{block_hash, RecordingReceiver, TestCommittee};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn at(height: u64) -> Position {
        Position::new(0, height)
    }

    fn make_agreement_with(
        size: usize,
        config: AgreementConfig,
    ) -> (Agreement, Arc<RecordingReceiver>, TestCommittee) {
        let committee = TestCommittee::new(size);
        let receiver = Arc::new(RecordingReceiver::new());
        let agreement = Agreement::new(
            committee.node_id(0),
            config,
            receiver.clone(),
            Arc::new(HashLeaderSelector::new(block_hash("seed"))),
            Arc::new(KeyAuthenticator::new(committee.key(0).clone())),
        );
        agreement.restart(committee.notary_set(), at(1));
        (agreement, receiver, committee)
    }

    fn make_agreement(size: usize) -> (Agreement, Arc<RecordingReceiver>, TestCommittee) {
        make_agreement_with(size, AgreementConfig::default())
    }

    #[traced_test]
    #[test]
    fn test_new_instance_is_stopped() {
        let committee = TestCommittee::new(4);
        let agreement = Agreement::new(
            committee.node_id(0),
            AgreementConfig::default(),
            Arc::new(RecordingReceiver::new()),
            Arc::new(HashLeaderSelector::new(Hash::NULL)),
            Arc::new(KeyAuthenticator::new(committee.key(0).clone())),
        );

        assert!(agreement.agreement_id().is_stop());
        assert_eq!(agreement.next_state(), Err(AgreementError::Stopped));
    }

    #[traced_test]
    #[test]
    fn test_restart_initializes_round() {
        let (agreement, _, _) = make_agreement(4);

        assert_eq!(agreement.agreement_id(), at(1));
        assert_eq!(agreement.period(), 1);
        assert_eq!(agreement.lock(), (Hash::NULL, 1));
        assert_eq!(agreement.required_votes(), 3);
        assert_eq!(agreement.state(), AgreementState::Initial);
        assert_eq!(agreement.clocks(), 0);
        assert!(!agreement.pull_votes());
        assert_eq!(agreement.done(), Progress::Pending);
        assert!(logs_contain("Agreement restarted"));
    }

    #[traced_test]
    #[test]
    fn test_next_state_walks_state_table() {
        let (agreement, receiver, committee) = make_agreement(4);
        let mine = block_hash("mine");
        receiver.set_next_block(mine);

        agreement.next_state().unwrap();
        assert_eq!(receiver.proposals(), 1);
        assert_eq!(agreement.state(), AgreementState::PreCommit);
        assert_eq!(agreement.clocks(), 2);

        // No candidate blocks yet, so the pre-commit falls back to the
        // leader's (unknown) block.
        agreement.next_state().unwrap();
        assert_eq!(agreement.state(), AgreementState::Commit);

        agreement.next_state().unwrap();
        assert_eq!(agreement.state(), AgreementState::Forward);
        assert_eq!(agreement.clocks(), 4);

        agreement.next_state().unwrap();
        assert!(agreement.pull_votes());
        agreement.next_state().unwrap();
        assert!(agreement.pull_votes());

        let votes = receiver.proposed_votes();
        let kinds: Vec<(VoteType, Hash)> =
            votes.iter().map(|v| (v.vote_type, v.block_hash)).collect();
        assert_eq!(
            kinds,
            vec![
                (VoteType::Init, mine),
                (VoteType::PreCommit, Hash::NULL),
                (VoteType::Commit, Hash::SKIP),
            ]
        );
        for vote in &votes {
            assert_eq!(vote.proposer_id, committee.node_id(0));
            assert_eq!(vote.position, at(1));
            assert!(vote.signature.is_none());
        }
    }

    #[traced_test]
    #[test]
    fn test_pre_commit_votes_for_leader_block() {
        let (agreement, receiver, committee) = make_agreement(4);
        let leader = block_hash("leader");
        agreement
            .process_block(committee.block(1, at(1), leader))
            .unwrap();

        agreement.next_state().unwrap();
        agreement.next_state().unwrap();

        let pre_commit = &receiver.proposed_votes()[1];
        assert_eq!(pre_commit.vote_type, VoteType::PreCommit);
        assert_eq!(pre_commit.block_hash, leader);
    }

    #[traced_test]
    #[test]
    fn test_prepare_vote_stamps_and_signs() {
        let (agreement, _, committee) = make_agreement(4);
        let mut vote = Vote::new(
            committee.node_id(0),
            Position::new(7, 7),
            1,
            VoteType::Init,
            block_hash("b"),
        );

        agreement.prepare_vote(&mut vote).unwrap();

        assert_eq!(vote.position, at(1));
        assert_eq!(verify_vote_signature(&vote), Ok(true));
        agreement.process_vote(vote).unwrap();
        assert_eq!(agreement.votes(1, VoteType::Init).len(), 1);
    }

    #[traced_test]
    #[test]
    fn test_commit_quorum_finalizes_once() {
        let (agreement, receiver, committee) = make_agreement(4);
        let hash = block_hash("final");

        for vote in committee.votes(0..2, at(1), 1, VoteType::Commit, hash) {
            agreement.process_vote(vote).unwrap();
        }
        assert!(receiver.confirmed().is_empty());
        assert_eq!(agreement.done(), Progress::Pending);

        agreement
            .process_vote(committee.vote(2, at(1), 1, VoteType::Commit, hash))
            .unwrap();
        agreement
            .process_vote(committee.vote(3, at(1), 1, VoteType::Commit, hash))
            .unwrap();

        let confirmed = receiver.confirmed();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].0, hash);
        assert_eq!(confirmed[0].1.len(), 3);
        assert!(agreement.is_finalized());
        assert_eq!(agreement.done(), Progress::Finalized);
        assert!(logs_contain("Agreement finalized"));
    }

    #[traced_test]
    #[test]
    fn test_skip_quorum_fast_forwards() {
        let (agreement, receiver, committee) = make_agreement(4);

        for vote in committee.votes(0..3, at(1), 1, VoteType::Commit, Hash::SKIP) {
            agreement.process_vote(vote).unwrap();
        }

        assert!(!agreement.is_finalized());
        assert!(receiver.confirmed().is_empty());
        assert!(receiver.pulled().is_empty());
        assert_eq!(agreement.pending_fast_forward(), Some(2));

        assert_eq!(agreement.done(), Progress::FastForwarded(2));
        assert_eq!(agreement.period(), 2);
        assert_eq!(agreement.state(), AgreementState::PreCommit);
        assert_eq!(agreement.done(), Progress::Pending);
    }

    #[traced_test]
    #[test]
    fn test_split_commit_pulls_missing_blocks() {
        let (agreement, receiver, committee) = make_agreement(4);
        let (a, b, c) = (block_hash("a"), block_hash("b"), block_hash("c"));
        agreement.process_block(committee.block(1, at(1), a)).unwrap();

        agreement
            .process_vote(committee.vote(3, at(1), 1, VoteType::Init, c))
            .unwrap();
        agreement
            .process_vote(committee.vote(0, at(1), 1, VoteType::Commit, a))
            .unwrap();
        agreement
            .process_vote(committee.vote(1, at(1), 1, VoteType::Commit, b))
            .unwrap();
        agreement
            .process_vote(committee.vote(2, at(1), 1, VoteType::Commit, Hash::SKIP))
            .unwrap();

        assert_eq!(receiver.pulled(), vec![HashSet::from([b, c])]);
        assert_eq!(agreement.done(), Progress::FastForwarded(2));
    }

    #[traced_test]
    #[test]
    fn test_pre_commit_quorum_in_later_period_locks_and_jumps() {
        let (agreement, _, committee) = make_agreement(4);
        let hash = block_hash("later");

        for vote in committee.votes(1..4, at(1), 3, VoteType::PreCommit, hash) {
            agreement.process_vote(vote).unwrap();
        }

        assert_eq!(agreement.lock(), (hash, 3));
        assert_eq!(agreement.done(), Progress::FastForwarded(3));
        assert_eq!(agreement.period(), 3);
        assert_eq!(agreement.state(), AgreementState::PreCommit);
    }

    #[traced_test]
    #[test]
    fn test_pre_commit_quorum_relocks_current_period() {
        let (agreement, _, committee) = make_agreement(4);
        for vote in committee.votes(0..3, at(1), 1, VoteType::Commit, Hash::SKIP) {
            agreement.process_vote(vote).unwrap();
        }
        assert_eq!(agreement.done(), Progress::FastForwarded(2));

        let hash = block_hash("relock");
        for vote in committee.votes(0..3, at(1), 2, VoteType::PreCommit, hash) {
            agreement.process_vote(vote).unwrap();
        }

        assert_eq!(agreement.lock(), (hash, 2));
        assert_eq!(agreement.done(), Progress::FastForwarded(3));
    }

    #[traced_test]
    #[test]
    fn test_pre_commit_quorum_at_lock_round_is_ignored() {
        let (agreement, _, committee) = make_agreement(4);
        let hash = block_hash("same");
        for vote in committee.votes(0..3, at(1), 1, VoteType::PreCommit, hash) {
            agreement.process_vote(vote).unwrap();
        }

        // Period 1 is not past the initial lock round.
        assert_eq!(agreement.lock(), (Hash::NULL, 1));
        assert_eq!(agreement.pending_fast_forward(), None);
    }

    #[traced_test]
    #[test]
    fn test_stale_and_future_input() {
        let committee = TestCommittee::new(4);
        let (agreement, _, _) = make_agreement(4);
        let hash = block_hash("future");

        agreement.restart(committee.notary_set(), at(2));

        agreement
            .process_vote(committee.vote(1, at(1), 1, VoteType::Init, hash))
            .unwrap();
        agreement
            .process_block(committee.block(1, at(1), hash))
            .unwrap();
        assert_eq!(agreement.pending_len(), (0, 0));
        assert!(agreement.votes(1, VoteType::Init).is_empty());

        agreement
            .process_vote(committee.vote(1, at(3), 1, VoteType::Init, hash))
            .unwrap();
        agreement
            .process_block(committee.block(1, at(3), hash))
            .unwrap();
        assert_eq!(agreement.pending_len(), (1, 1));
        assert!(logs_contain("Buffering vote"));

        agreement.restart(committee.notary_set(), at(3));

        assert_eq!(agreement.pending_len(), (0, 0));
        assert_eq!(agreement.votes(1, VoteType::Init).len(), 1);
        assert_eq!(
            agreement.block_from(&committee.node_id(1)).map(|b| b.hash),
            Some(hash)
        );
        assert!(agreement.find_candidate_block(&hash).is_some());
    }

    #[traced_test]
    #[test]
    fn test_expired_future_input_is_dropped() {
        let (agreement, _, committee) =
            make_agreement_with(4, AgreementConfig::new().with_pending_expiry(Duration::ZERO));

        agreement
            .process_vote(committee.vote(1, at(5), 1, VoteType::Init, block_hash("x")))
            .unwrap();
        assert_eq!(agreement.pending_len(), (0, 1));

        agreement.restart(committee.notary_set(), at(2));
        assert_eq!(agreement.pending_len(), (0, 0));
    }

    #[traced_test]
    #[test]
    fn test_stop_keeps_buffer() {
        let (agreement, _, committee) = make_agreement(4);
        agreement
            .process_vote(committee.vote(1, at(4), 1, VoteType::Init, block_hash("x")))
            .unwrap();

        agreement.stop();

        assert!(agreement.agreement_id().is_stop());
        assert_eq!(agreement.pending_len(), (0, 1));
    }

    #[traced_test]
    #[test]
    fn test_sanity_checks() {
        let (agreement, _, committee) = make_agreement(4);
        let outsider = TestCommittee::new(5);
        let hash = block_hash("b");

        let vote = outsider.vote(4, at(1), 1, VoteType::Init, hash);
        assert_eq!(
            agreement.process_vote(vote),
            Err(AgreementError::NotInNotarySet(outsider.node_id(4)))
        );

        let mut forged = committee.vote(1, at(1), 1, VoteType::Init, hash);
        committee.sign(2, &mut forged);
        assert_eq!(
            agreement.process_vote(forged),
            Err(AgreementError::IncorrectVoteSignature(committee.node_id(1)))
        );

        let unsigned = Vote::new(committee.node_id(1), at(1), 1, VoteType::Init, hash);
        assert_eq!(
            agreement.process_vote(unsigned),
            Err(AgreementError::IncorrectVoteSignature(committee.node_id(1)))
        );
        assert!(agreement.votes(1, VoteType::Init).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_duplicate_and_fork_votes() {
        let (agreement, _, committee) = make_agreement(4);
        let vote = committee.vote(1, at(1), 1, VoteType::PreCommit, block_hash("a"));

        agreement.process_vote(vote.clone()).unwrap();
        agreement.process_vote(vote.clone()).unwrap();
        assert_eq!(agreement.votes(1, VoteType::PreCommit).len(), 1);

        let fork = committee.vote(1, at(1), 1, VoteType::PreCommit, block_hash("b"));
        let err = agreement.process_vote(fork).unwrap_err();
        assert!(matches!(err, AgreementError::ForkVote { proposer, .. } if proposer == committee.node_id(1)));
        assert_eq!(agreement.votes(1, VoteType::PreCommit)[&committee.node_id(1)], vote);
        assert!(logs_contain("Fork vote detected"));
    }

    #[traced_test]
    #[test]
    fn test_fork_blocks() {
        let (agreement, _, committee) = make_agreement(4);
        let (a, b) = (block_hash("a"), block_hash("b"));

        agreement.process_block(committee.block(2, at(1), a)).unwrap();
        agreement.process_block(committee.block(2, at(1), a)).unwrap();

        assert_eq!(
            agreement.process_block(committee.block(2, at(1), b)),
            Err(AgreementError::Fork {
                proposer: committee.node_id(2),
                old: a,
                new: b,
            })
        );
        assert_eq!(agreement.block_from(&committee.node_id(2)).map(|b| b.hash), Some(a));
        assert!(agreement.find_candidate_block(&b).is_none());
    }

    #[traced_test]
    #[test]
    fn test_leader_rejection_is_not_recorded() {
        let (agreement, _, committee) = make_agreement(4);

        let err = agreement
            .process_block(committee.block(1, at(1), Hash::SKIP))
            .unwrap_err();

        assert!(matches!(
            err,
            AgreementError::Leader(LeaderError::InvalidBlock { .. })
        ));
        assert!(agreement.block_from(&committee.node_id(1)).is_none());
    }

    #[traced_test]
    #[test]
    fn test_candidate_pool() {
        let (agreement, _, committee) = make_agreement(4);
        let hash = block_hash("cand");
        assert!(agreement.find_candidate_block(&hash).is_none());

        agreement.add_candidate_block(committee.block(3, at(1), hash));
        assert_eq!(
            agreement.find_candidate_block(&hash).map(|b| b.proposer_id),
            Some(committee.node_id(3))
        );

        agreement.restart(committee.notary_set(), at(2));
        assert!(agreement.find_candidate_block(&hash).is_none());
    }

    #[traced_test]
    #[test]
    fn test_commit_quorum_at_last_period_does_not_overflow() {
        let (agreement, _, committee) = make_agreement(1);

        agreement
            .process_vote(committee.vote(0, at(1), u64::MAX, VoteType::Commit, Hash::SKIP))
            .unwrap();
        assert_eq!(agreement.pending_fast_forward(), Some(u64::MAX));
        assert_eq!(agreement.done(), Progress::FastForwarded(u64::MAX));

        // Relocking in the last period has nowhere further to jump.
        let hash = block_hash("last");
        agreement
            .process_vote(committee.vote(0, at(1), u64::MAX, VoteType::PreCommit, hash))
            .unwrap();
        assert_eq!(agreement.lock(), (hash, u64::MAX));
        assert_eq!(agreement.done(), Progress::Pending);
        assert_eq!(agreement.period(), u64::MAX);
    }

    #[traced_test]
    #[test]
    fn test_fast_forward_to_distant_period() {
        let (agreement, receiver, committee) = make_agreement(1);
        let hash = block_hash("distant");

        agreement
            .process_vote(committee.vote(0, at(1), u64::MAX, VoteType::PreCommit, hash))
            .unwrap();

        assert_eq!(agreement.done(), Progress::FastForwarded(u64::MAX));
        assert_eq!(agreement.period(), u64::MAX);
        assert_eq!(agreement.state(), AgreementState::PreCommit);
        assert!(agreement.votes(2, VoteType::Commit).is_empty());

        agreement.next_state().unwrap();
        let vote = receiver.proposed_votes().pop().unwrap();
        assert_eq!((vote.period, vote.block_hash), (u64::MAX, hash));
    }

    #[traced_test]
    #[test]
    fn test_malformed_signature_is_reported() {
        let (agreement, _, committee) = make_agreement(4);
        let mut vote = committee.vote(1, at(1), 1, VoteType::Init, block_hash("b"));
        if let Some(signed) = vote.signature.as_mut() {
            signed.signature = Signature::Ed25519(vec![0u8; 10]);
        }

        assert_eq!(
            agreement.process_vote(vote),
            Err(AgreementError::SignatureVerification(
                CryptoError::MalformedSignature
            ))
        );
        assert!(agreement.votes(1, VoteType::Init).is_empty());
    }

    struct FailingAuthenticator;

    impl Authenticator for FailingAuthenticator {
        fn sign_vote(&self, _vote: &mut Vote) -> Result<(), AuthError> {
            Err(AuthError::Signing("key unavailable".to_string()))
        }
    }

    #[traced_test]
    #[test]
    fn test_signing_failure_is_reported() {
        let committee = TestCommittee::new(4);
        let agreement = Agreement::new(
            committee.node_id(0),
            AgreementConfig::default(),
            Arc::new(RecordingReceiver::new()),
            Arc::new(HashLeaderSelector::new(Hash::NULL)),
            Arc::new(FailingAuthenticator),
        );
        agreement.restart(committee.notary_set(), at(1));
        let mut vote = Vote::new(committee.node_id(0), at(1), 1, VoteType::Init, block_hash("b"));

        assert_eq!(
            agreement.prepare_vote(&mut vote),
            Err(AgreementError::Signing(AuthError::Signing(
                "key unavailable".to_string()
            )))
        );
        assert!(vote.signature.is_none());
    }
}
