//! Core types for notary agreement.
//!
//! Pure data shared by the agreement engine and its collaborators:
//! hashes and their sentinels, notary identities, slot positions,
//! candidate blocks, votes and the keys that sign them.

mod block;
mod crypto;
mod hash;
mod identifiers;
mod signing;
mod vote;

pub use block::Block;
pub use crypto::{CryptoError, KeyPair, KeyType, PublicKey, Signature};
pub use hash::{Hash, HexError};
pub use identifiers::{ChainId, NodeId, Position};
pub use signing::{vote_message, DOMAIN_AGREEMENT_VOTE};
pub use vote::{verify_vote_signature, Vote, VoteSignature, VoteType};
