// Protocol messages for client-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by board clients to the relay.
// - `ServerMessage`: sent by the relay to board clients.
//
// `deploy` and `update` appear in both directions with identical payloads:
// the relay stores what a client sent and re-emits the same value to every
// other connection. `sync` is relay-only and sent exactly once per
// connection, before anything else.
//
// Each message serializes as an adjacently tagged object,
// `{"event": "deploy", "data": {...}}`, so the event names match the
// browser client's socket events.

use serde::{Deserialize, Serialize};

use crate::types::{Block, BlockUpdate, SyncPayload};

/// Messages sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    /// A block this client just created and already applied locally.
    Deploy(Block),
    /// A partial change to an existing block.
    Update(BlockUpdate),
    /// Client is leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full board snapshot; the first message on every connection.
    Sync(SyncPayload),
    /// Another client created a block.
    Deploy(Block),
    /// Another client changed a block.
    Update(BlockUpdate),
}

impl ClientMessage {
    /// The server message the relay fans out after accepting this one.
    /// `None` for messages that are not relayed.
    pub fn to_relayed(&self) -> Option<ServerMessage> {
        match self {
            ClientMessage::Deploy(block) => Some(ServerMessage::Deploy(block.clone())),
            ClientMessage::Update(update) => Some(ServerMessage::Update(update.clone())),
            ClientMessage::Goodbye => None,
        }
    }
}
