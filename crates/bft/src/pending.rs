//! Buffer for blocks and votes that arrive ahead of their position.

use notary_types::{Block, Position, Vote};
use std::time::{Duration, Instant};

/// A buffered payload with its arrival time.
#[derive(Debug, Clone)]
pub(crate) struct Pending<T> {
    /// Buffered block or vote.
    pub payload: T,
    /// When the payload was buffered.
    pub received_at: Instant,
}

/// Entries due for replay after a restart, in arrival order.
#[derive(Debug, Default)]
pub(crate) struct Replay {
    /// Blocks for the new position.
    pub blocks: Vec<Block>,
    /// Votes for the new position.
    pub votes: Vec<Vote>,
}

impl Replay {
    /// Whether nothing is due for replay.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.votes.is_empty()
    }
}

/// Append-only holding area for out-of-order blocks and votes.
///
/// Grows without bound between restarts; [`PendingBuffer::sweep`], run at
/// the start of each round, is the only cleanup point.
#[derive(Debug, Default)]
pub(crate) struct PendingBuffer {
    blocks: Vec<Pending<Block>>,
    votes: Vec<Pending<Vote>>,
}

impl PendingBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a block received at `now`.
    pub fn push_block(&mut self, block: Block, now: Instant) {
        self.blocks.push(Pending {
            payload: block,
            received_at: now,
        });
    }

    /// Buffer a vote received at `now`.
    pub fn push_vote(&mut self, vote: Vote, now: Instant) {
        self.votes.push(Pending {
            payload: vote,
            received_at: now,
        });
    }

    /// Number of buffered blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of buffered votes.
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Partition the buffer for a round starting at `position`.
    ///
    /// Entries older than `position` are discarded, entries exactly at
    /// `position` are returned for replay, and entries for later positions
    /// are kept only if they were received less than `expiry` before `now`.
    pub fn sweep(&mut self, position: Position, now: Instant, expiry: Duration) -> Replay {
        Replay {
            blocks: sweep_entries(&mut self.blocks, position, now, expiry, |b| b.position),
            votes: sweep_entries(&mut self.votes, position, now, expiry, |v| v.position),
        }
    }
}

fn sweep_entries<T>(
    entries: &mut Vec<Pending<T>>,
    position: Position,
    now: Instant,
    expiry: Duration,
    position_of: impl Fn(&T) -> Position,
) -> Vec<T> {
    let mut replay = Vec::new();
    let mut retained = Vec::new();
    for entry in entries.drain(..) {
        let entry_position = position_of(&entry.payload);
        if position.newer(&entry_position) {
            continue;
        }
        if entry_position == position {
            replay.push(entry.payload);
        } else if now.saturating_duration_since(entry.received_at) < expiry {
            retained.push(entry);
        }
    }
    *entries = retained;
    replay
}
