// Canonical block store held by the relay for its process lifetime.
//
// `BlockStore` is the authoritative copy of the board. It trusts clients:
// `insert` accepts whatever id and geometry a client sent, and
// `merge` applies any partial update to the first block with a matching id.
// Admission checks (minimum size, no overlap) happen in the client before a
// deploy is ever sent. Any server-side validation belongs in front of these
// two methods, not inside the session's fan-out logic.
//
// Blocks live in an insertion-ordered `Vec`, not a map keyed by id. Ids are
// proposed by clients from their own mirrored counters, so two clients that
// deploy before seeing each other's deploy both send the same id and the
// store ends up holding both. A map would silently drop one of them; the
// `Vec` keeps the duplicate visible. Lookups by id return the earliest match.
//
// Not thread-safe by itself. The relay's main loop owns the `Session` (and
// therefore the store) and processes one event at a time, which is what makes
// each insert/merge atomic with respect to other clients' events.

use sound_blocks_protocol::types::{Block, BlockId, BlockUpdate, SyncPayload};
use tracing::warn;

#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: Vec<Block>,
    cur_id: BlockId,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of the counter and every block, in insertion order.
    pub fn snapshot(&self) -> SyncPayload {
        SyncPayload {
            cur_id: self.cur_id,
            blocks: self.blocks.clone(),
        }
    }

    /// Append a block as sent. No uniqueness or geometry checks. Advances the
    /// counter past the block's id if it is not already past it.
    pub fn insert(&mut self, block: Block) {
        self.cur_id = self.cur_id.max(block.id.next());
        self.blocks.push(block);
    }

    /// Shallow-merge `update` into the first block with its id. Returns
    /// whether a block was found; a miss is logged and otherwise ignored.
    pub fn merge(&mut self, update: &BlockUpdate) -> bool {
        match self.blocks.iter_mut().find(|b| b.id == update.id) {
            Some(block) => {
                update.apply_to(block);
                true
            }
            None => {
                warn!(id = %update.id, "update for unknown block dropped");
                false
            }
        }
    }

    /// Next id a fresh client should propose.
    pub fn cur_id(&self) -> BlockId {
        self.cur_id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
