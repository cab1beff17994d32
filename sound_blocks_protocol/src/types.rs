// Shared board data model: block identity, geometry, waveform, and color.
//
// These are the types that travel in every protocol message (see
// `message.rs`) and that both the relay's `BlockStore` and each client's
// `Replica` hold. They are plain data with serde derives; no behavior beyond
// the shallow merge in `BlockUpdate::apply_to`, which is the one place a
// partial update touches a block. Both sides call it so the relay and the
// clients cannot disagree about which fields an update may change.
//
// Field names on the wire follow the browser client's JSON: a block's
// waveform is `"type"` and the snapshot counter is `"curID"`.
//
// See also: `message.rs` for the envelopes, `sound_blocks_relay::store` and
// `sound_blocks_board::replica` for the two holders of block state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Writer-proposed block identifier.
///
/// Allocated by clients from their mirrored counter, not by the relay, so two
/// clients that have not yet seen each other's deploys can pick the same
/// value. Stores must tolerate duplicates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl BlockId {
    /// The id immediately after this one. Saturates at `u64::MAX`, since
    /// ids arrive unchecked from the network.
    pub fn next(self) -> BlockId {
        BlockId(self.0.saturating_add(1))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in canvas space. For blocks, the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a block. Committed blocks have both components
/// strictly above the client's minimum block length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Oscillator waveform a block plays. Mutable after creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A CSS color string, e.g. `rgb(145, 242, 138)`.
///
/// Kept as an opaque string on the wire because clients compare colors by
/// value (the drag code tells "invalid" apart from a block's own color by
/// equality) and never need the channels back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(format!("rgb({r}, {g}, {b})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit of shared board state. Also the `deploy` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub pos: Point,
    pub size: Size,
    #[serde(rename = "type")]
    pub kind: Waveform,
    pub color: Color,
}

/// Partial mutation of an existing block. Also the `update` payload.
///
/// Only `pos` and `kind` can change after creation; `id`, `size` and the
/// base `color` are fixed by the deploy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockUpdate {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Point>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Waveform>,
}

impl BlockUpdate {
    pub fn moved(id: BlockId, pos: Point) -> Self {
        Self {
            id,
            pos: Some(pos),
            kind: None,
        }
    }

    pub fn retyped(id: BlockId, kind: Waveform) -> Self {
        Self {
            id,
            pos: None,
            kind: Some(kind),
        }
    }

    /// Shallow-merge the present fields into `block`. Absent fields are left
    /// untouched. Does not check that `block.id == self.id`; callers look the
    /// block up first.
    pub fn apply_to(&self, block: &mut Block) {
        if let Some(pos) = self.pos {
            block.pos = pos;
        }
        if let Some(kind) = self.kind {
            block.kind = kind;
        }
    }
}

/// Full board snapshot, sent once to each newly connected client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(rename = "curID")]
    pub cur_id: BlockId,
    pub blocks: Vec<Block>,
}
