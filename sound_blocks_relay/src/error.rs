// Errors returned by the relay's public entry points and by `NetClient`.
//
// Nothing inside the running relay surfaces as an error: per-connection
// failures are logged and turn into a disconnect. These variants cover
// startup and the client side of the connection.

use std::io;

use sound_blocks_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("expected sync as first message, got {0}")]
    MissingSync(String),
}
