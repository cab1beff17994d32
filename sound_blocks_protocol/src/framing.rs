// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by the payload.
// `write_message` / `read_message` move raw bytes and know nothing about
// JSON. `send` / `recv` layer serde_json on top so callers on both sides of
// the connection encode `ClientMessage` / `ServerMessage` the same way.
//
// `MAX_MESSAGE_SIZE` bounds the allocation a length prefix can request. The
// `sync` snapshot is the largest message; even tens of thousands of blocks
// fit well inside it.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProtocolError;

/// Maximum allowed frame payload (16 MB).
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Write a length-delimited message: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = msg.len();
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes before or during a message,
/// `InvalidData` if the length exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` as JSON and write it as one frame.
pub fn send<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

/// Read one frame and decode it as JSON.
pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_message(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}
