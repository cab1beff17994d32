// Integration smoke test for the relay server.
//
// Starts a relay on localhost and connects mock TCP clients that speak the
// protocol crate's framing directly: no board code involved. Covers the
// connection lifecycle: sync on connect, deploy/update fan-out to others but
// not the sender, late-joiner snapshots, disconnect leaving blocks in
// place, clients that stop reading, and shutdown.

use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use sound_blocks_protocol::ProtocolError;
use sound_blocks_protocol::framing::{read_message, recv, send, write_message};
use sound_blocks_protocol::message::{ClientMessage, ServerMessage};
use sound_blocks_protocol::types::{
    Block, BlockId, BlockUpdate, Color, Point, Size, SyncPayload, Waveform,
};
use sound_blocks_relay::server::{RelayConfig, RelayHandle, start_relay};

struct RawClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RawClient {
    /// Connect and consume the initial sync.
    fn connect(addr: SocketAddr) -> (Self, SyncPayload) {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        let writer = BufWriter::new(stream);
        let mut client = Self { reader, writer };
        let sync = match client.recv() {
            ServerMessage::Sync(sync) => sync,
            other => panic!("expected Sync, got {other:?}"),
        };
        (client, sync)
    }

    fn send(&mut self, msg: &ClientMessage) {
        send(&mut self.writer, msg).unwrap();
    }

    fn recv(&mut self) -> ServerMessage {
        recv(&mut self.reader).unwrap()
    }

    /// Read until the relay closes the connection and return the error that
    /// ended it.
    fn read_until_closed(&mut self) -> ProtocolError {
        loop {
            if let Err(e) = recv::<_, ServerMessage>(&mut self.reader) {
                return e;
            }
        }
    }

    /// Drain currently buffered messages using a short read timeout.
    fn drain(&mut self) -> Vec<ServerMessage> {
        let stream = self.reader.get_ref();
        stream
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let mut messages = Vec::new();
        while let Ok(bytes) = read_message(&mut self.reader) {
            messages.push(serde_json::from_slice(&bytes).unwrap());
        }
        self.reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        messages
    }
}

fn start() -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        port: 0, // OS picks a free port
        ..RelayConfig::default()
    };
    let (handle, addr) = start_relay(config).unwrap();
    thread::sleep(Duration::from_millis(50));
    (handle, addr)
}

fn block(id: u64, x: f64) -> Block {
    Block {
        id: BlockId(id),
        pos: Point::new(x, 10.0),
        size: Size::new(50.0, 50.0),
        kind: Waveform::Sine,
        color: Color::rgb(12, 34, 56),
    }
}

/// Give the relay's main loop time to apply what was just sent.
fn settle() {
    thread::sleep(Duration::from_millis(150));
}

#[test]
fn full_session_lifecycle() {
    let (handle, addr) = start();

    // 1. First client sees an empty board.
    let (mut alice, sync) = RawClient::connect(addr);
    assert_eq!(sync, SyncPayload::default());

    let (mut bob, _) = RawClient::connect(addr);
    settle();

    // 2. Alice deploys; Bob receives it verbatim, Alice gets no echo.
    alice.send(&ClientMessage::Deploy(block(0, 10.0)));
    assert_eq!(bob.recv(), ServerMessage::Deploy(block(0, 10.0)));

    // 3. Bob moves it; Alice receives the partial update.
    let moved = BlockUpdate::moved(BlockId(0), Point::new(120.0, 80.0));
    bob.send(&ClientMessage::Update(moved.clone()));
    assert_eq!(alice.recv(), ServerMessage::Update(moved));
    assert!(bob.drain().is_empty(), "sender must not get its own update");

    // 4. Carol joins late and gets the merged state.
    let (_carol, sync) = RawClient::connect(addr);
    assert_eq!(sync.cur_id, BlockId(1));
    assert_eq!(sync.blocks.len(), 1);
    assert_eq!(sync.blocks[0].pos, Point::new(120.0, 80.0));
    assert_eq!(sync.blocks[0].kind, Waveform::Sine);

    // 5. Alice leaves; her block stays.
    alice.send(&ClientMessage::Goodbye);
    settle();
    let (_dave, sync) = RawClient::connect(addr);
    assert_eq!(sync.blocks.len(), 1);

    handle.stop();
}

#[test]
fn in_flight_events_survive_disconnect() {
    let (handle, addr) = start();

    let (mut alice, _) = RawClient::connect(addr);
    alice.send(&ClientMessage::Deploy(block(0, 0.0)));
    alice.send(&ClientMessage::Deploy(block(1, 100.0)));
    drop(alice);
    settle();

    let (_bob, sync) = RawClient::connect(addr);
    assert_eq!(sync.cur_id, BlockId(2));
    assert_eq!(sync.blocks, vec![block(0, 0.0), block(1, 100.0)]);

    handle.stop();
}

#[test]
fn concurrent_same_id_deploys_are_both_stored() {
    let (handle, addr) = start();

    // Both clients connect to an empty board, so both propose id 0.
    let (mut alice, sync_a) = RawClient::connect(addr);
    let (mut bob, sync_b) = RawClient::connect(addr);
    assert_eq!(sync_a.cur_id, BlockId(0));
    assert_eq!(sync_b.cur_id, BlockId(0));

    alice.send(&ClientMessage::Deploy(block(0, 0.0)));
    bob.send(&ClientMessage::Deploy(block(0, 300.0)));
    settle();

    let (_carol, sync) = RawClient::connect(addr);
    assert_eq!(sync.blocks.len(), 2);
    assert!(sync.blocks.iter().all(|b| b.id == BlockId(0)));
    assert_eq!(sync.cur_id, BlockId(1));

    handle.stop();
}

#[test]
fn malformed_frame_drops_only_that_connection() {
    let (handle, addr) = start();

    let (mut alice, _) = RawClient::connect(addr);
    let (mut bob, _) = RawClient::connect(addr);
    settle();

    write_message(&mut bob.writer, b"{\"event\":\"explode\"}").unwrap();
    bob.writer.flush().unwrap();
    settle();

    // Bob's further deploys are ignored because his connection is gone.
    let _ = send(&mut bob.writer, &ClientMessage::Deploy(block(5, 0.0)));
    settle();

    alice.send(&ClientMessage::Deploy(block(0, 0.0)));
    settle();

    let (_carol, sync) = RawClient::connect(addr);
    assert_eq!(sync.blocks, vec![block(0, 0.0)]);

    handle.stop();
}

#[test]
fn max_id_deploy_does_not_take_relay_down() {
    let (handle, addr) = start();

    let (mut alice, _) = RawClient::connect(addr);
    alice.send(&ClientMessage::Deploy(block(u64::MAX, 0.0)));
    settle();

    let (_bob, sync) = RawClient::connect(addr);
    assert_eq!(sync.cur_id, BlockId(u64::MAX));
    assert_eq!(sync.blocks, vec![block(u64::MAX, 0.0)]);

    handle.stop();
}

#[test]
fn client_that_stops_reading_is_dropped() {
    let config = RelayConfig {
        port: 0,
        write_timeout: Duration::from_millis(200),
        ..RelayConfig::default()
    };
    let (handle, addr) = start_relay(config).unwrap();

    let (mut stalled, _) = RawClient::connect(addr);
    let (mut watcher, _) = RawClient::connect(addr);
    let (mut sender, _) = RawClient::connect(addr);
    settle();

    const DEPLOYS: u64 = 64;
    let watcher_thread = thread::spawn(move || {
        (0..DEPLOYS)
            .map(|_| watcher.recv())
            .filter(|msg| matches!(msg, ServerMessage::Deploy(_)))
            .count()
    });

    let big_color = Color("x".repeat(1024 * 1024));
    for id in 0..DEPLOYS {
        let mut b = block(id, 0.0);
        b.color = big_color.clone();
        sender.send(&ClientMessage::Deploy(b));
    }

    // Everyone still reading gets every deploy.
    assert_eq!(watcher_thread.join().unwrap(), DEPLOYS as usize);

    // The stalled client finds its connection closed once it reads again.
    let err = stalled.read_until_closed();
    assert!(err.is_disconnect(), "got {err:?}");

    handle.stop();
}

#[test]
fn stop_closes_client_connections() {
    let (handle, addr) = start();
    let (mut alice, _) = RawClient::connect(addr);
    settle();

    handle.stop();

    let err = alice.read_until_closed();
    assert!(err.is_disconnect(), "got {err:?}");
}
