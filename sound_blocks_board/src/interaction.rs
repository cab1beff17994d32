// Per-client pointer/keyboard state machine.
//
// Decides which local mutations are attempted and applies them to the
// `Replica` immediately; the network side effects come back as `BoardEvent`s
// for `BoardSession` to dispatch. Nothing in here sends anything itself.
//
// States:
// - `Idle`: nothing held.
// - `Holding`: drawing a new block from an anchor to the cursor. The preview
//   color says whether releasing now would commit (big enough on both axes,
//   overlapping nothing).
// - `Dragging`: moving an existing block by the cumulative pointer delta. The
//   block itself is recolored with the invalid color while it overlaps
//   another block.
//
// Drag release is gated on validity but never forced: releasing the pointer
// over an invalid spot leaves the block attached to the pointer, and the drag
// only resolves on a later pointer-down (or pointer-up) at a valid spot. A new
// hold or drag cannot start until then. This mirrors the browser client and
// is pinned by tests; see DESIGN.md for the open product question.
//
// Other inputs:
// - Pointer-down on a block with drag mode off selects it and plucks it.
// - Space toggles drag mode while held.
// - A/S/D/F retype the selected block (sine/square/sawtooth/triangle).
//
// See also: `replica.rs` for the state being mutated, `geometry.rs` for the
// overlap rules, `session.rs` for event dispatch.

use rand::Rng;
use sound_blocks_protocol::message::ClientMessage;
use sound_blocks_protocol::types::{Block, BlockId, BlockUpdate, Color, Point, Waveform};
use tracing::debug;

use crate::config::BoardConfig;
use crate::geometry::Rect;
use crate::replica::Replica;

/// Keyboard input, already decoded from the platform's key events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// The drag-mode modifier.
    Space,
    Char(char),
}

impl Key {
    /// Waveform bound to this key, if any.
    pub fn waveform(self) -> Option<Waveform> {
        match self {
            Key::Char(c) => match c.to_ascii_lowercase() {
                'a' => Some(Waveform::Sine),
                's' => Some(Waveform::Square),
                'd' => Some(Waveform::Sawtooth),
                'f' => Some(Waveform::Triangle),
                _ => None,
            },
            Key::Space => None,
        }
    }
}

/// Side effects produced by an input, in the order they should happen.
#[derive(Clone, Debug, PartialEq)]
pub enum BoardEvent {
    /// Queue this message for the relay.
    Emit(ClientMessage),
    /// A block now exists locally and needs a voice.
    AddVoice { id: BlockId, waveform: Waveform },
    /// A block's waveform changed.
    SetWaveform { id: BlockId, waveform: Waveform },
    /// Play a block's note once.
    Pluck(BlockId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    Holding {
        anchor: Point,
        rect: Rect,
        color: Color,
    },
    Dragging {
        /// Index into the replica, not a block id.
        index: usize,
        anchor: Point,
        original_pos: Point,
        original_color: Color,
    },
}

#[derive(Clone, Debug)]
pub struct Interaction {
    state: InteractionState,
    drag_mode: bool,
    pointer_held: bool,
    selected: Option<usize>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle,
            drag_mode: false,
            pointer_held: false,
            selected: None,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn drag_mode(&self) -> bool {
        self.drag_mode
    }

    /// Replica index of the block keyboard commands apply to.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The hold rectangle and its preview color, while drawing.
    pub fn hold_preview(&self) -> Option<(&Rect, &Color)> {
        match &self.state {
            InteractionState::Holding { rect, color, .. } => Some((rect, color)),
            _ => None,
        }
    }

    /// Drop all transient state. Indices are meaningless after a resync.
    pub fn reset(&mut self) {
        *self = Self {
            drag_mode: self.drag_mode,
            ..Self::new()
        };
    }

    pub fn pointer_down(
        &mut self,
        cursor: Point,
        replica: &mut Replica,
        config: &BoardConfig,
    ) -> Vec<BoardEvent> {
        self.pointer_held = true;

        // A drag left attached by an invalid release resolves here, and this
        // pointer-down does nothing else.
        if let InteractionState::Dragging { .. } = self.state {
            return self.try_release_drag(replica, config);
        }

        let hovered = replica.block_at(cursor);
        match (self.drag_mode, hovered) {
            (false, None) => {
                self.state = InteractionState::Holding {
                    anchor: cursor,
                    rect: Rect::new(cursor, Default::default()),
                    color: config.invalid_color.clone(),
                };
                Vec::new()
            }
            (false, Some(index)) => {
                self.selected = Some(index);
                replica
                    .get(index)
                    .map(|b| vec![BoardEvent::Pluck(b.id)])
                    .unwrap_or_default()
            }
            (true, Some(index)) => {
                if let Some(block) = replica.get(index) {
                    self.state = InteractionState::Dragging {
                        index,
                        anchor: cursor,
                        original_pos: block.pos,
                        original_color: block.color.clone(),
                    };
                    self.selected = Some(index);
                }
                Vec::new()
            }
            (true, None) => Vec::new(),
        }
    }

    pub fn pointer_move(&mut self, cursor: Point, replica: &mut Replica, config: &BoardConfig) {
        match &mut self.state {
            InteractionState::Holding {
                anchor,
                rect,
                color,
            } => {
                if !self.pointer_held {
                    return;
                }
                *rect = Rect::from_corners(*anchor, cursor);
                let admissible =
                    rect.exceeds(config.min_block_length) && !replica.overlaps_any(rect, None);
                *color = if admissible {
                    config.valid_color.clone()
                } else {
                    config.invalid_color.clone()
                };
            }
            // Follows the pointer whether or not it is held.
            InteractionState::Dragging {
                index,
                anchor,
                original_pos,
                original_color,
            } => {
                let index = *index;
                let pos = Point::new(
                    original_pos.x + (cursor.x - anchor.x),
                    original_pos.y + (cursor.y - anchor.y),
                );
                let Some(block) = replica.get_mut(index) else {
                    return;
                };
                block.pos = pos;
                let rect = Rect::of(block);
                let blocked = replica.overlaps_any(&rect, Some(index));
                if let Some(block) = replica.get_mut(index) {
                    block.color = if blocked {
                        config.invalid_color.clone()
                    } else {
                        original_color.clone()
                    };
                }
            }
            InteractionState::Idle => {}
        }
    }

    pub fn pointer_up<R: Rng>(
        &mut self,
        replica: &mut Replica,
        config: &BoardConfig,
        rng: &mut R,
    ) -> Vec<BoardEvent> {
        if !self.pointer_held {
            return Vec::new();
        }
        self.pointer_held = false;

        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Holding { rect, color, .. } => {
                if color == config.valid_color {
                    self.commit(rect, replica, config, rng)
                } else {
                    debug!("hold released while invalid, discarded");
                    Vec::new()
                }
            }
            dragging @ InteractionState::Dragging { .. } => {
                self.state = dragging;
                self.try_release_drag(replica, config)
            }
            InteractionState::Idle => Vec::new(),
        }
    }

    pub fn key_down(&mut self, key: Key, replica: &mut Replica) -> Vec<BoardEvent> {
        if key == Key::Space {
            self.drag_mode = true;
            return Vec::new();
        }
        let (Some(waveform), Some(index)) = (key.waveform(), self.selected) else {
            return Vec::new();
        };
        let Some(block) = replica.get_mut(index) else {
            return Vec::new();
        };
        let update = BlockUpdate::retyped(block.id, waveform);
        update.apply_to(block);
        vec![
            BoardEvent::SetWaveform {
                id: block.id,
                waveform,
            },
            BoardEvent::Emit(ClientMessage::Update(update)),
        ]
    }

    pub fn key_up(&mut self, key: Key) {
        if key == Key::Space {
            self.drag_mode = false;
        }
    }

    /// Deploy the held rectangle: take the next id, pick a random color,
    /// apply locally, then hand back the deploy for the relay.
    fn commit<R: Rng>(
        &mut self,
        rect: Rect,
        replica: &mut Replica,
        config: &BoardConfig,
        rng: &mut R,
    ) -> Vec<BoardEvent> {
        let block = Block {
            id: replica.cur_id(),
            pos: rect.pos,
            size: rect.size,
            kind: config.default_waveform,
            color: random_color(rng, config),
        };
        debug!(id = %block.id, "deploying block");
        let events = vec![
            BoardEvent::AddVoice {
                id: block.id,
                waveform: block.kind,
            },
            BoardEvent::Emit(ClientMessage::Deploy(block.clone())),
        ];
        replica.on_deploy(block);
        self.selected = Some(replica.len() - 1);
        events
    }

    /// Release the dragged block if it is not currently marked invalid.
    fn try_release_drag(&mut self, replica: &mut Replica, config: &BoardConfig) -> Vec<BoardEvent> {
        let InteractionState::Dragging { index, .. } = self.state else {
            return Vec::new();
        };
        let Some(block) = replica.get_mut(index) else {
            self.state = InteractionState::Idle;
            return Vec::new();
        };
        if block.color == config.invalid_color {
            debug!(id = %block.id, "drag held over an occupied spot");
            return Vec::new();
        }
        let update = BlockUpdate::moved(block.id, block.pos);
        update.apply_to(block);
        self.state = InteractionState::Idle;
        vec![BoardEvent::Emit(ClientMessage::Update(update))]
    }
}

/// A random block color. Never the invalid sentinel, since a block wearing
/// it could not be released from a drag.
fn random_color<R: Rng>(rng: &mut R, config: &BoardConfig) -> Color {
    loop {
        let color = Color::rgb(
            rng.gen_range(0..255),
            rng.gen_range(0..255),
            rng.gen_range(0..255),
        );
        if color != config.invalid_color {
            return color;
        }
    }
}
