//! Clock-driven sub-states of one agreement round.
//!
//! A closed set of named states with an explicit transition table. The
//! instance only relies on [`AgreementState::clocks`], the transition, and
//! the state name; the per-state behaviour lives here.
//!
//! | State | Clocks | Transition | Next |
//! |-------|--------|------------|------|
//! | `Initial` | 0 | Init vote for the locally proposed block | `PreCommit` |
//! | `PreCommit` | 2 | PreCommit vote for the lock value, or the leader's block | `Commit` |
//! | `Commit` | 2 | Commit vote for the PreCommit winner (locking it), or skip | `Forward` |
//! | `Forward` | 4 | - | `PullVote` |
//! | `PullVote` | 4 | - | `PullVote` |

use crate::round::RoundState;
use notary_core::LeaderSelector;
use notary_types::{Hash, NodeId, Vote, VoteType};
use std::fmt;

/// Named sub-state of an agreement round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgreementState {
    /// Propose a block and cast the Init vote.
    Initial,
    /// Cast the PreCommit vote.
    PreCommit,
    /// Cast the Commit vote.
    Commit,
    /// Wait for the period to settle.
    Forward,
    /// Keep asking peers for votes until the round moves on.
    PullVote,
}

impl AgreementState {
    /// Clock ticks the state waits before its transition fires.
    pub fn clocks(self) -> u32 {
        match self {
            AgreementState::Initial => 0,
            AgreementState::PreCommit | AgreementState::Commit => 2,
            AgreementState::Forward | AgreementState::PullVote => 4,
        }
    }

    /// Fire the transition out of this state.
    ///
    /// `proposed` is the hash returned by the receiver's `propose_block`;
    /// only `Initial` consumes it and stays put without one. Returns the next
    /// state and the unsigned vote to propose, if any.
    pub(crate) fn advance(
        self,
        node_id: NodeId,
        round: &mut RoundState,
        proposed: Option<Hash>,
        leader: &dyn LeaderSelector,
    ) -> (AgreementState, Option<Vote>) {
        let cast = |round: &RoundState, vote_type, hash| {
            Vote::new(node_id, round.position(), round.period(), vote_type, hash)
        };

        match self {
            AgreementState::Initial => match proposed {
                Some(hash) => (
                    AgreementState::PreCommit,
                    Some(cast(round, VoteType::Init, hash)),
                ),
                None => (AgreementState::Initial, None),
            },
            AgreementState::PreCommit => {
                let mut hash = round.lock_value();
                if hash.is_null() {
                    hash = leader.leader_block_hash();
                }
                (
                    AgreementState::Commit,
                    Some(cast(round, VoteType::PreCommit, hash)),
                )
            }
            AgreementState::Commit => {
                let period = round.period();
                let hash = match round.count_vote(period, VoteType::PreCommit) {
                    Some(hash) if !hash.is_skip() => {
                        round.set_lock(hash, period);
                        hash
                    }
                    _ => Hash::SKIP,
                };
                (
                    AgreementState::Forward,
                    Some(cast(round, VoteType::Commit, hash)),
                )
            }
            AgreementState::Forward | AgreementState::PullVote => {
                (AgreementState::PullVote, None)
            }
        }
    }
}

impl fmt::Display for AgreementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgreementState::Initial => "initial",
            AgreementState::PreCommit => "pre-commit",
            AgreementState::Commit => "commit",
            AgreementState::Forward => "forward",
            AgreementState::PullVote => "pull-vote",
        };
        write!(f, "{}", name)
    }
}
