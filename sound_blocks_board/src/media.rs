// Rendering and audio collaborators.
//
// The board does not rasterize or synthesize anything itself. A frontend
// supplies a `Surface` (something that can clear and fill rectangles) and a
// `Synth` (one oscillator voice per block id). `draw_board` is the whole
// redraw routine; it only reads the replica and interaction state.
//
// A frontend's `pluck` is expected to play a short percussive envelope: a
// linear rise to `PLUCK_PEAK_GAIN` over `PLUCK_ATTACK_SECS`, then a fall to
// silence by `PLUCK_LENGTH_SECS`.

use sound_blocks_protocol::types::{BlockId, Color, Waveform};

use crate::config::BoardConfig;
use crate::geometry::Rect;
use crate::interaction::Interaction;
use crate::replica::Replica;

pub const PLUCK_PEAK_GAIN: f64 = 0.2;
pub const PLUCK_ATTACK_SECS: f64 = 0.005;
pub const PLUCK_LENGTH_SECS: f64 = 0.5;

/// A 2D drawing target in canvas coordinates.
pub trait Surface {
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: &Rect, color: &Color, alpha: f64);
}

/// Per-block oscillator voices, keyed by block id.
pub trait Synth {
    /// Create (and start, silent) a voice for a block.
    fn add_voice(&mut self, id: BlockId, waveform: Waveform);
    fn set_waveform(&mut self, id: BlockId, waveform: Waveform);
    /// Play the block's voice once.
    fn pluck(&mut self, id: BlockId);
}

/// A `Synth` that does nothing, for headless clients.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSynth;

impl Synth for NullSynth {
    fn add_voice(&mut self, _id: BlockId, _waveform: Waveform) {}
    fn set_waveform(&mut self, _id: BlockId, _waveform: Waveform) {}
    fn pluck(&mut self, _id: BlockId) {}
}

/// Draw one frame: every block in deploy order, then the hold preview on top.
pub fn draw_board<S: Surface + ?Sized>(
    surface: &mut S,
    replica: &Replica,
    interaction: &Interaction,
    config: &BoardConfig,
) {
    surface.clear();
    for block in replica.blocks() {
        surface.fill_rect(&Rect::of(block), &block.color, config.block_alpha);
    }
    if let Some((rect, color)) = interaction.hold_preview() {
        surface.fill_rect(rect, color, config.block_alpha);
    }
}

#[cfg(test)]
mod tests {
    use sound_blocks_protocol::types::{Block, Point, Size, SyncPayload};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        ops: Vec<String>,
    }

    impl Surface for Recorder {
        fn clear(&mut self) {
            self.ops.push("clear".into());
        }

        fn fill_rect(&mut self, rect: &Rect, color: &Color, alpha: f64) {
            self.ops.push(format!(
                "fill {},{} {}x{} {color} {alpha}",
                rect.pos.x, rect.pos.y, rect.size.width, rect.size.height
            ));
        }
    }

    #[test]
    fn frame_draws_blocks_then_preview() {
        let config = BoardConfig::default();
        let mut replica = Replica::new();
        replica.on_sync(SyncPayload {
            cur_id: BlockId(1),
            blocks: vec![Block {
                id: BlockId(0),
                pos: Point::new(0.0, 0.0),
                size: Size::new(30.0, 40.0),
                kind: Waveform::Sine,
                color: Color::rgb(1, 2, 3),
            }],
        });
        let mut interaction = Interaction::new();
        interaction.pointer_down(Point::new(100.0, 100.0), &mut replica, &config);

        let mut surface = Recorder::default();
        draw_board(&mut surface, &replica, &interaction, &config);

        assert_eq!(
            surface.ops,
            vec![
                "clear".to_string(),
                "fill 0,0 30x40 rgb(1, 2, 3) 0.7".to_string(),
                "fill 100,100 0x0 rgb(242, 138, 145) 0.7".to_string(),
            ]
        );
    }
}
