//! Candidate blocks as seen by the agreement protocol.

use crate::{Hash, NodeId, Position};
use serde::{Deserialize, Serialize};

/// A candidate block for one agreement slot.
///
/// Agreement only needs identity and placement; the payload is opaque and
/// referenced by `hash`. A notary may propose at most one block per
/// position: a second block from the same proposer at the same position
/// with a different hash is a provable fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Notary that proposed this block.
    pub proposer_id: NodeId,

    /// Slot the block is proposed for.
    pub position: Position,

    /// Content hash of the block.
    pub hash: Hash,
}

impl Block {
    /// Create a new block reference.
    pub fn new(proposer_id: NodeId, position: Position, hash: Hash) -> Self {
        Self {
            proposer_id,
            position,
            hash,
        }
    }
}
