// sound_blocks_protocol: wire protocol between board clients and the relay.
//
// This crate defines the shared board data model, the message envelopes, and
// the framing used by the relay (`sound_blocks_relay`) and by clients. It has
// no threads and no networking policy of its own.
//
// Module overview:
// - `types.rs`:    Block data model: `BlockId`, `Point`, `Size`, `Waveform`,
//                  `Color`, `Block`, `BlockUpdate`, `SyncPayload`.
// - `message.rs`:  `ClientMessage` and `ServerMessage` enums (`sync`,
//                  `deploy`, `update`, `goodbye`).
// - `framing.rs`:  4-byte big-endian length prefix, then JSON payload, over
//                  any `Read`/`Write` stream.
// - `error.rs`:    `ProtocolError`.
//
// Design decisions:
// - **JSON payloads** shaped like the browser client's socket events, so the
//   field names (`type`, `curID`) survive unchanged.
// - **No validation.** Ids and geometry are carried as sent; admission checks
//   live in the client (`sound_blocks_board`), not on the wire.
// - **No async runtime.** `std::io::Read`/`Write` only.

pub mod error;
pub mod framing;
pub mod message;
pub mod types;

pub use error::ProtocolError;
pub use framing::{MAX_MESSAGE_SIZE, read_message, recv, send, write_message};
pub use message::{ClientMessage, ServerMessage};
pub use types::{Block, BlockId, BlockUpdate, Color, Point, Size, SyncPayload, Waveform};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn block(id: u64) -> Block {
        Block {
            id: BlockId(id),
            pos: Point::new(10.0, 10.0),
            size: Size::new(50.0, 50.0),
            kind: Waveform::Sine,
            color: Color::rgb(40, 80, 120),
        }
    }

    fn through_wire<T>(msg: &T) -> T
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut wire = Vec::new();
        send(&mut wire, msg).unwrap();
        recv(&mut Cursor::new(wire)).unwrap()
    }

    #[test]
    fn deploy_envelope_shape() {
        let json = serde_json::to_value(ClientMessage::Deploy(block(0))).unwrap();
        assert_eq!(json["event"], "deploy");
        assert_eq!(json["data"]["id"], 0);
        assert_eq!(json["data"]["type"], "sine");
    }

    #[test]
    fn goodbye_has_no_data() {
        let json = serde_json::to_string(&ClientMessage::Goodbye).unwrap();
        assert_eq!(json, r#"{"event":"goodbye"}"#);
    }

    #[test]
    fn sync_survives_framing() {
        let msg = ServerMessage::Sync(SyncPayload {
            cur_id: BlockId(2),
            blocks: vec![block(0), block(1)],
        });
        assert_eq!(through_wire(&msg), msg);
    }

    #[test]
    fn partial_update_survives_framing() {
        let msg = ClientMessage::Update(BlockUpdate::moved(BlockId(5), Point::new(1.5, -2.0)));
        assert_eq!(through_wire(&msg), msg);
    }

    #[test]
    fn relayed_form_keeps_payload() {
        let update = BlockUpdate::retyped(BlockId(9), Waveform::Square);
        assert_eq!(
            ClientMessage::Update(update.clone()).to_relayed(),
            Some(ServerMessage::Update(update))
        );
        assert_eq!(
            ClientMessage::Deploy(block(3)).to_relayed(),
            Some(ServerMessage::Deploy(block(3)))
        );
        assert_eq!(ClientMessage::Goodbye.to_relayed(), None);
    }

    #[test]
    fn browser_style_update_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"update","data":{"id":3,"pos":{"x":1,"y":2}}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Update(BlockUpdate::moved(BlockId(3), Point::new(1.0, 2.0)))
        );
    }
}
