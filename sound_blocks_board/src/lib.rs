// sound_blocks_board: the client side of the shared Sound Blocks board.
//
// Everything a board client does between "bytes arrived from the relay" and
// "bytes go back to the relay" lives here: the local replica of the block
// list, the pointer/keyboard state machine that creates and moves blocks,
// the geometry those decisions rest on, and the rendering/audio hooks a
// frontend plugs into. There is no networking in this crate; outbound
// events leave through an `mpsc` channel and inbound ones are handed to
// `BoardSession::handle_server_message`.
//
// Module overview:
// - `geometry.rs`:    `Rect` with strict-overlap and strict-interior tests.
// - `config.rs`:      `BoardConfig` (admission threshold, preview colors,
//                     default waveform, alpha), loadable from JSON.
// - `replica.rs`:     `Replica`, the local block list plus id counter.
// - `interaction.rs`: `Interaction` state machine (idle, holding, dragging)
//                     and the `BoardEvent`s it produces.
// - `media.rs`:       `Surface` and `Synth` traits, `draw_board`.
// - `session.rs`:     `BoardSession`, one per connection, tying the above
//                     together.
//
// Dependencies: `sound_blocks_protocol` for the data model and messages,
// `rand` for block colors, `tracing` for diagnostics. No dependency on the
// relay crate.

pub mod config;
pub mod geometry;
pub mod interaction;
pub mod media;
pub mod replica;
pub mod session;

pub use config::{BoardConfig, ConfigError};
pub use geometry::Rect;
pub use interaction::{BoardEvent, Interaction, InteractionState, Key};
pub use media::{NullSynth, Surface, Synth, draw_board};
pub use replica::Replica;
pub use session::BoardSession;
