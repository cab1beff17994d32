// Client-local mirror of the relay's block store.
//
// A `Replica` is updated from two directions: by the user's own optimistic
// actions (applied here before the outbound event is queued) and by events
// relayed from other clients. Both go through the same `on_deploy` /
// `on_update` paths.
//
// The replica also carries the client's copy of the id counter. A client
// proposes `cur_id` for its next deploy; every deploy it observes, local or
// remote, sets `cur_id = id + 1`. That assignment is unconditional: a late
// deploy carrying a small id pulls the counter back down, and two clients at
// the same counter will propose the same id. Both hazards are kept as-is and
// logged rather than corrected here; see DESIGN.md.
//
// Blocks are an append-only `Vec` (there is no delete), so an index into it
// stays valid until the next `on_sync`. The interaction state machine holds
// indices, not ids, because ids may collide.

use sound_blocks_protocol::types::{Block, BlockId, BlockUpdate, Point, SyncPayload};
use tracing::warn;

use crate::geometry::Rect;

#[derive(Clone, Debug, Default)]
pub struct Replica {
    blocks: Vec<Block>,
    cur_id: BlockId,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a relay snapshot.
    pub fn on_sync(&mut self, sync: SyncPayload) {
        self.blocks = sync.blocks;
        self.cur_id = sync.cur_id;
    }

    /// Append a deployed block and move the counter to just past its id.
    pub fn on_deploy(&mut self, block: Block) {
        let next = block.id.next();
        if next < self.cur_id {
            warn!(
                id = %block.id,
                cur_id = %self.cur_id,
                "deploy moves id counter backwards"
            );
        }
        self.cur_id = next;
        self.blocks.push(block);
    }

    /// Shallow-merge into the first block with the update's id. Returns
    /// false (and logs) when no such block exists.
    pub fn on_update(&mut self, update: &BlockUpdate) -> bool {
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

    /// Id this client will propose for its next deploy.
    pub fn cur_id(&self) -> BlockId {
        self.cur_id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    /// First block with `id`, if any.
    pub fn find(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Earliest-deployed block whose interior contains `point`.
    pub fn block_at(&self, point: Point) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| Rect::of(b).contains(point))
    }

    /// Whether `rect` overlaps any block other than the one at `skip`.
    pub fn overlaps_any(&self, rect: &Rect, skip: Option<usize>) -> bool {
        self.blocks
            .iter()
            .enumerate()
            .any(|(i, b)| Some(i) != skip && rect.overlaps(&Rect::of(b)))
    }
}

#[cfg(test)]
mod tests {
    use sound_blocks_protocol::types::{Color, Size, Waveform};

    use super::*;

    fn block(id: u64, x: f64, y: f64) -> Block {
        Block {
            id: BlockId(id),
            pos: Point::new(x, y),
            size: Size::new(50.0, 50.0),
            kind: Waveform::Sine,
            color: Color::rgb(9, 9, 9),
        }
    }

    #[test]
    fn sync_replaces_everything() {
        let mut replica = Replica::new();
        replica.on_deploy(block(0, 0.0, 0.0));
        replica.on_sync(SyncPayload {
            cur_id: BlockId(4),
            blocks: vec![block(3, 100.0, 100.0)],
        });
        assert_eq!(replica.len(), 1);
        assert_eq!(replica.blocks()[0].id, BlockId(3));
        assert_eq!(replica.cur_id(), BlockId(4));
    }

    #[test]
    fn deploy_advances_counter() {
        let mut replica = Replica::new();
        replica.on_deploy(block(0, 0.0, 0.0));
        replica.on_deploy(block(1, 60.0, 0.0));
        assert_eq!(replica.cur_id(), BlockId(2));
    }

    #[test]
    fn late_low_id_deploy_regresses_counter() {
        let mut replica = Replica::new();
        replica.on_deploy(block(5, 0.0, 0.0));
        replica.on_deploy(block(1, 60.0, 0.0));
        assert_eq!(replica.cur_id(), BlockId(2));
    }

    #[test]
    fn max_id_deploy_pins_counter() {
        let mut replica = Replica::new();
        replica.on_deploy(block(u64::MAX, 0.0, 0.0));
        assert_eq!(replica.cur_id(), BlockId(u64::MAX));
        assert_eq!(replica.len(), 1);
    }

    #[test]
    fn update_merges_present_fields() {
        let mut replica = Replica::new();
        replica.on_deploy(block(0, 0.0, 0.0));
        assert!(replica.on_update(&BlockUpdate::retyped(BlockId(0), Waveform::Square)));
        let b = replica.find(BlockId(0)).unwrap();
        assert_eq!(b.kind, Waveform::Square);
        assert_eq!(b.pos, Point::new(0.0, 0.0));
    }

    #[test]
    fn update_for_missing_block_is_dropped() {
        let mut replica = Replica::new();
        replica.on_deploy(block(0, 0.0, 0.0));
        assert!(!replica.on_update(&BlockUpdate::moved(BlockId(8), Point::new(1.0, 1.0))));
        assert_eq!(replica.blocks()[0].pos, Point::new(0.0, 0.0));
    }

    #[test]
    fn block_at_prefers_earliest_and_excludes_border() {
        let mut replica = Replica::new();
        replica.on_deploy(block(0, 0.0, 0.0));
        replica.on_deploy(block(1, 20.0, 20.0));
        assert_eq!(replica.block_at(Point::new(30.0, 30.0)), Some(0));
        assert_eq!(replica.block_at(Point::new(60.0, 60.0)), Some(1));
        assert_eq!(replica.block_at(Point::new(0.0, 10.0)), None);
    }

    #[test]
    fn overlaps_any_can_skip_self() {
        let mut replica = Replica::new();
        replica.on_deploy(block(0, 0.0, 0.0));
        let own = Rect::of(&replica.blocks()[0]);
        assert!(replica.overlaps_any(&own, None));
        assert!(!replica.overlaps_any(&own, Some(0)));
    }
}
