// sound_blocks_relay: the relay process for the shared Sound Blocks board.
//
// The relay is the always-on hub every board client connects to. It keeps
// the canonical `BlockStore`, hands each new connection a full `sync`
// snapshot, and re-emits every accepted deploy or update to all *other*
// connections. It never originates a change of its own.
//
// Module overview:
// - `store.rs`:   `BlockStore`: ordered blocks plus the store-side id
//                 counter. Trusts client ids and geometry.
// - `session.rs`: `Session`: live connections plus the store; applies
//                 incoming events and fans them out.
// - `server.rs`:  TCP listener, reader threads (one per client), and the
//                 main event loop. Uses `std::net` with a thread-per-reader
//                 architecture and an `mpsc` channel to funnel events into
//                 the single-threaded `Session`.
// - `client.rs`:  `NetClient`: the board side of the TCP connection.
// - `error.rs`:   `RelayError`.
//
// Dependencies: `sound_blocks_protocol` (shared message types and framing).
// No dependency on the board crate.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in
// another process or test via `start_relay`.

pub mod client;
pub mod error;
pub mod server;
pub mod session;
pub mod store;

pub use error::RelayError;
pub use server::{RelayConfig, RelayHandle, start_relay};
