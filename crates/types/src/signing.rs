//! Domain-separated signing messages.
//!
//! Every signed message is prefixed with a domain tag so that a signature
//! from one context can never be replayed in another.
//!
//! | Tag | Purpose |
//! |-----|---------|
//! | `agreement_vote:` | Per-period agreement votes |

use crate::{Hash, Position, VoteType};

/// Domain tag for agreement votes.
///
/// Format: `agreement_vote:` || chain_id || height || period || vote_type || block_hash
pub const DOMAIN_AGREEMENT_VOTE: &[u8] = b"agreement_vote:";

/// Build the signing message for an agreement vote.
pub fn vote_message(
    position: &Position,
    period: u64,
    vote_type: VoteType,
    block_hash: &Hash,
) -> Vec<u8> {
    // 15 (tag) + 4 (chain) + 8 (height) + 8 (period) + 1 (type) + 32 (hash)
    let mut message = Vec::with_capacity(68);
    message.extend_from_slice(DOMAIN_AGREEMENT_VOTE);
    message.extend_from_slice(&position.chain_id.0.to_le_bytes());
    message.extend_from_slice(&position.height.to_le_bytes());
    message.extend_from_slice(&period.to_le_bytes());
    message.push(vote_type.as_byte());
    message.extend_from_slice(block_hash.as_bytes());
    message
}
