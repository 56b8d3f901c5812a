//! Reference leader selector.

use notary_core::{LeaderError, LeaderSelector};
use notary_types::{Block, Hash};
use parking_lot::Mutex;
use tracing::trace;

/// Leader selection by seeded hash distance.
///
/// Every accepted block gets a distance `Blake3(seed || block_hash)`; the
/// block with the smallest distance is the leader's. All notaries sharing
/// the seed agree on the leader once they have seen the same blocks.
#[derive(Debug)]
pub struct HashLeaderSelector {
    seed: Hash,
    /// (distance, block hash) of the best block so far.
    best: Mutex<Option<(Hash, Hash)>>,
}

impl HashLeaderSelector {
    /// Create a selector for a shared seed.
    pub fn new(seed: Hash) -> Self {
        Self {
            seed,
            best: Mutex::new(None),
        }
    }

    fn distance(&self, block_hash: &Hash) -> Hash {
        Hash::from_parts(&[self.seed.as_bytes().as_slice(), block_hash.as_bytes().as_slice()])
    }
}

impl LeaderSelector for HashLeaderSelector {
    fn process_block(&self, block: &Block) -> Result<(), LeaderError> {
        if block.hash.is_sentinel() {
            return Err(LeaderError::InvalidBlock {
                proposer: block.proposer_id,
                hash: block.hash,
            });
        }

        let distance = self.distance(&block.hash);
        let mut best = self.best.lock();
        if best.map_or(true, |(current, _)| distance < current) {
            trace!(block = ?block.hash, proposer = %block.proposer_id, "New leader block");
            *best = Some((distance, block.hash));
        }
        Ok(())
    }

    fn restart(&self) {
        *self.best.lock() = None;
    }

    fn leader_block_hash(&self) -> Hash {
        self.best.lock().map_or(Hash::NULL, |(_, hash)| hash)
    }
}
