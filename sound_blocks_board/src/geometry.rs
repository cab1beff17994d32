// Axis-aligned rectangle math for admission checks and hit testing.
//
// All comparisons are strict: rectangles that only share an edge or a corner
// do not overlap, and a point on a block's border is not "over" the block.

use sound_blocks_protocol::types::{Block, Point, Size};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub pos: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(pos: Point, size: Size) -> Self {
        Self { pos, size }
    }

    pub fn of(block: &Block) -> Self {
        Self::new(block.pos, block.size)
    }

    /// Normalized rectangle spanned by two opposite corners, in any order.
    /// The result has its top-left in `pos` and a non-negative size.
    pub fn from_corners(anchor: Point, cursor: Point) -> Self {
        Self {
            pos: Point::new(anchor.x.min(cursor.x), anchor.y.min(cursor.y)),
            size: Size::new((cursor.x - anchor.x).abs(), (cursor.y - anchor.y).abs()),
        }
    }

    pub fn right(&self) -> f64 {
        self.pos.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.pos.y + self.size.height
    }

    /// Positive-area intersection on both axes.
    pub fn overlaps(&self, other: &Rect) -> bool {
        if self.pos.x >= other.right() || other.pos.x >= self.right() {
            return false;
        }
        if self.pos.y >= other.bottom() || other.pos.y >= self.bottom() {
            return false;
        }
        true
    }

    /// Strictly inside, borders excluded.
    pub fn contains(&self, p: Point) -> bool {
        let dx = p.x - self.pos.x;
        let dy = p.y - self.pos.y;
        0.0 < dx && dx < self.size.width && 0.0 < dy && dy < self.size.height
    }

    /// Both sides strictly longer than `min_length`.
    pub fn exceeds(&self, min_length: f64) -> bool {
        self.size.width > min_length && self.size.height > min_length
    }
}
