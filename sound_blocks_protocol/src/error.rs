// Errors surfaced by framing and message encoding.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected message: {0}")]
    Unexpected(String),
}

impl ProtocolError {
    /// True when the peer closed the stream, as opposed to sending garbage.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}
