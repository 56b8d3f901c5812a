//! Domain-specific identifier types.

use crate::{Hash, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain tag for deriving node identities from public keys.
const DOMAIN_NODE_ID: &[u8] = b"node_id:";

/// Notary (validator) identity.
///
/// Derived from the notary's public key, so a vote signature can be tied
/// back to its claimed proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Hash);

impl NodeId {
    /// Derive the identity owned by a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        NodeId(Hash::from_parts(&[DOMAIN_NODE_ID, public_key.as_bytes()]))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}..)", &self.0.to_hex()[..8])
    }
}

/// Chain identifier within a sharded lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u32);

impl ChainId {
    /// Reserved chain id marking an agreement instance that is not running.
    pub const STOPPED: Self = ChainId(u32::MAX);
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chain({})", self.0)
    }
}

/// Slot an agreement instance decides: one block per (chain, height).
///
/// Ordered lexicographically by chain then height. `Copy`, so cloning a
/// position is a plain value copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Chain the slot belongs to.
    pub chain_id: ChainId,
    /// Height on that chain.
    pub height: u64,
}

impl Position {
    /// Create a new position.
    pub fn new(chain_id: u32, height: u64) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            height,
        }
    }

    /// The sentinel position of a stopped instance.
    pub fn stopped() -> Self {
        Self {
            chain_id: ChainId::STOPPED,
            height: 0,
        }
    }

    /// Whether this is the stopped sentinel.
    pub fn is_stop(&self) -> bool {
        self.chain_id == ChainId::STOPPED
    }

    /// Whether `self` comes strictly after `other`.
    pub fn newer(&self, other: &Position) -> bool {
        self > other
    }

    /// The next height on the same chain.
    pub fn next(&self) -> Self {
        Self {
            chain_id: self.chain_id,
            height: self.height.saturating_add(1),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_stop() {
            return write!(f, "Position(stopped)");
        }
        write!(f, "Position({}, {})", self.chain_id.0, self.height)
    }
}
