//! Key-backed vote authenticator.

use notary_core::{AuthError, Authenticator};
use notary_types::{KeyPair, NodeId, Vote, VoteSignature};

/// Signs votes with the local notary's key pair.
#[derive(Debug, Clone)]
pub struct KeyAuthenticator {
    key: KeyPair,
    node_id: NodeId,
}

impl KeyAuthenticator {
    /// Create an authenticator for `key`.
    pub fn new(key: KeyPair) -> Self {
        let node_id = NodeId::from_public_key(&key.public_key());
        Self { key, node_id }
    }

    /// Identity the authenticator signs as.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
}

impl Authenticator for KeyAuthenticator {
    fn sign_vote(&self, vote: &mut Vote) -> Result<(), AuthError> {
        vote.proposer_id = self.node_id;
        let signature = self.key.sign(&vote.signing_message());
        vote.signature = Some(VoteSignature {
            public_key: self.key.public_key(),
            signature,
        });
        Ok(())
    }
}
