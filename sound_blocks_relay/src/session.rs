// Session state for the relay.
//
// `Session` is the central data structure that `server.rs` drives. It owns
// the `BlockStore` and the set of live connections. All mutation happens
// through methods called from the server's single-threaded main loop, so
// there is no internal locking.
//
// Responsibilities:
// - Connection management: assign `ConnectionId`s, send each new connection
//   its one-time `sync` snapshot, drop connections on disconnect. Dropping a
//   connection never touches the store; blocks outlive their authors.
// - Deploy/update handling: apply to the store, then re-emit the identical
//   payload to every connection except the sender. The sender gets no ack;
//   it already applied the change locally.
//
// Writing to client streams: `Session` holds cloned `TcpStream` write halves
// wrapped in `BufWriter`. The server gives every stream a write timeout, so a
// client that stops reading costs the main loop at most one timeout. A
// connection whose write fails (timeout, reset, anything) is dropped on the
// spot and the fan-out carries on with the others.
//
// Dropping a connection shuts the socket down in both directions. That
// unblocks its reader thread (which then exits) and tells the client it has
// been cut off; a partially written frame is never followed by more data.

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};

use sound_blocks_protocol::framing::send;
use sound_blocks_protocol::message::{ClientMessage, ServerMessage};
use sound_blocks_protocol::types::{Block, BlockUpdate};
use tracing::{debug, info, warn};

use crate::store::BlockStore;

/// Relay-assigned connection handle. Never sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The relay's whole shared state: one board, many connections.
pub struct Session {
    store: BlockStore,
    connections: BTreeMap<ConnectionId, BufWriter<TcpStream>>,
    next_connection_id: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            store: BlockStore::new(),
            connections: BTreeMap::new(),
            next_connection_id: 0,
        }
    }

    /// Register a new connection and send it the current snapshot. The sync
    /// is written before the connection joins the fan-out set, so it is
    /// always the first message the client reads. If the sync cannot be
    /// written the connection is closed and never joins.
    pub fn add_connection(&mut self, stream: TcpStream) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;

        let mut writer = BufWriter::new(stream);
        let snapshot = self.store.snapshot();
        info!(
            connection = %id,
            blocks = snapshot.blocks.len(),
            cur_id = %snapshot.cur_id,
            "client connected"
        );
        match send(&mut writer, &ServerMessage::Sync(snapshot)) {
            Ok(()) => {
                self.connections.insert(id, writer);
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "failed to send sync, closing");
                close(writer);
            }
        }
        id
    }

    /// Remove a connection from the fan-out set and close its socket. The
    /// store is untouched.
    pub fn remove_connection(&mut self, id: ConnectionId) {
        if let Some(writer) = self.connections.remove(&id) {
            info!(connection = %id, "client disconnected");
            close(writer);
        }
    }

    /// Close every connection. Used when the relay stops.
    pub fn close_all(&mut self) {
        for (id, writer) in std::mem::take(&mut self.connections) {
            debug!(connection = %id, "closing");
            close(writer);
        }
    }

    /// Dispatch one message from a connection.
    pub fn handle_message(&mut self, from: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Deploy(block) => self.deploy(from, block),
            ClientMessage::Update(update) => self.update(from, update),
            ClientMessage::Goodbye => self.remove_connection(from),
        }
    }

    /// Store a new block and relay it to everyone else.
    pub fn deploy(&mut self, from: ConnectionId, block: Block) {
        debug!(connection = %from, id = %block.id, "deploy");
        self.store.insert(block.clone());
        self.broadcast_except(from, &ServerMessage::Deploy(block));
    }

    /// Merge a partial update and relay it to everyone else. Relayed even
    /// when the store has no such block; other replicas log their own miss.
    pub fn update(&mut self, from: ConnectionId, update: BlockUpdate) {
        debug!(connection = %from, id = %update.id, "update");
        self.store.merge(&update);
        self.broadcast_except(from, &ServerMessage::Update(update));
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Send to every connection except `skip`. Connections that fail the
    /// write are dropped.
    fn broadcast_except(&mut self, skip: ConnectionId, msg: &ServerMessage) {
        let mut failed = Vec::new();
        for (id, writer) in self.connections.iter_mut() {
            if *id == skip {
                continue;
            }
            if let Err(e) = send(writer, msg) {
                warn!(connection = %id, error = %e, "fan-out write failed, dropping connection");
                failed.push(*id);
            }
        }
        for id in failed {
            self.remove_connection(id);
        }
    }
}

/// Shut the socket down without flushing whatever is still buffered. The
/// reader thread shares the socket and sees EOF.
fn close(writer: BufWriter<TcpStream>) {
    let (stream, _unflushed) = writer.into_parts();
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!(error = %e, "shutdown on closed socket");
    }
}
