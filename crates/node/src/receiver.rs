//! Channel-backed agreement receiver.

use notary_core::{AgreementAction, AgreementReceiver};
use notary_types::{Hash, NodeId, Vote};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Produces the local notary's block when an agreement asks for one.
pub type BlockSource = Arc<dyn Fn() -> Hash + Send + Sync>;

/// Forwards agreement callbacks as [`AgreementAction`]s over a channel.
///
/// Sending never blocks, so the receiver is safe to call from inside the
/// agreement's synchronous entry points.
pub struct ActionReceiver {
    actions: mpsc::UnboundedSender<AgreementAction>,
    block_source: BlockSource,
}

impl ActionReceiver {
    /// Create a receiver and the channel its actions arrive on.
    pub fn new(block_source: BlockSource) -> (Self, mpsc::UnboundedReceiver<AgreementAction>) {
        let (actions, rx) = mpsc::unbounded_channel();
        (
            Self {
                actions,
                block_source,
            },
            rx,
        )
    }

    /// Another handle to the action channel.
    pub fn action_sender(&self) -> mpsc::UnboundedSender<AgreementAction> {
        self.actions.clone()
    }

    fn send(&self, action: AgreementAction) {
        let action_type = action.type_name();
        if self.actions.send(action).is_err() {
            debug!(action = action_type, "Action channel closed, dropping action");
        }
    }
}

impl AgreementReceiver for ActionReceiver {
    fn propose_vote(&self, vote: Vote) {
        self.send(AgreementAction::ProposeVote(vote));
    }

    fn propose_block(&self) -> Hash {
        (self.block_source)()
    }

    fn confirm_block(&self, hash: Hash, votes: HashMap<NodeId, Vote>) {
        self.send(AgreementAction::ConfirmBlock { hash, votes });
    }

    fn pull_blocks(&self, hashes: HashSet<Hash>) {
        self.send(AgreementAction::PullBlocks(hashes));
    }
}
