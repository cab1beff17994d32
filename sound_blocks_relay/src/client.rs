// TCP client for connecting to the relay.
//
// Provides a non-blocking interface for a board client's main thread:
// - `connect()` performs the TCP connect on the calling thread and reads the
//   relay's `sync` snapshot, which is always the first message. It then spawns
//   a background reader thread.
// - The reader thread decodes `ServerMessage`s in a loop and pushes them into
//   an `mpsc` channel.
// - The main thread holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox without blocking.
// - `forward()` drains a `BoardSession`'s outbound queue onto the socket, so
//   the board never touches the network directly.
//
// Nothing here waits for acknowledgements: deploys and updates are
// fire-and-forget.
//
// This module lives in the relay crate because it needs nothing but std TCP,
// the protocol crate, and an `mpsc` channel. Integration tests use it
// directly.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sound_blocks_protocol::framing::{recv, send};
use sound_blocks_protocol::message::{ClientMessage, ServerMessage};
use sound_blocks_protocol::types::SyncPayload;
use tracing::{debug, warn};

use crate::error::RelayError;

/// How long `connect` waits for the initial sync.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP client for relay communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect to a relay and read its snapshot. Returns the client and the
    /// sync payload, which the caller should hand to its replica before
    /// accepting any user input.
    pub fn connect(addr: &str) -> Result<(Self, SyncPayload), RelayError> {
        let connect_err = |source| RelayError::Connect {
            addr: addr.to_string(),
            source,
        };
        let stream = TcpStream::connect(addr).map_err(connect_err)?;
        stream
            .set_read_timeout(Some(SYNC_TIMEOUT))
            .map_err(connect_err)?;

        let reader_stream = stream.try_clone().map_err(connect_err)?;
        let writer = BufWriter::new(stream);
        let mut reader = BufReader::new(reader_stream);

        let sync = match recv::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Sync(sync) => sync,
            other => return Err(RelayError::MissingSync(format!("{other:?}"))),
        };
        debug!(blocks = sync.blocks.len(), cur_id = %sync.cur_id, "synced");

        // Clear read timeout for the long-lived reader loop.
        reader.get_ref().set_read_timeout(None).ok();

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: Some(reader_thread),
            },
            sync,
        ))
    }

    /// Send one message to the relay.
    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), RelayError> {
        send(&mut self.writer, msg)?;
        Ok(())
    }

    /// Write every message queued on `outbox` to the relay, in order.
    /// Returns how many were sent.
    pub fn forward(&mut self, outbox: &Receiver<ClientMessage>) -> Result<usize, RelayError> {
        let mut sent = 0;
        while let Ok(msg) = outbox.try_recv() {
            self.send(&msg)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Send Goodbye. The relay drops the connection; blocks stay.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.send(&ClientMessage::Goodbye) {
            debug!(error = %e, "goodbye not delivered");
        }
    }

    /// Drain all queued relay messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Block up to `timeout` for the next relay message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Reader thread: decode framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    loop {
        match recv::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Main thread dropped the receiver
                }
            }
            Err(e) if e.is_disconnect() => break,
            Err(e) => {
                warn!(error = %e, "malformed relay message, closing");
                break;
            }
        }
    }
}
