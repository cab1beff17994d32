// Test-only board client for multiplayer integration tests.
//
// Wraps the real `NetClient` (from `sound_blocks_relay::client`) and a real
// `BoardSession` (from `sound_blocks_board::session`) to provide a
// synchronous, test-friendly API for exercising the full pipeline:
// connect → sync → pointer input → optimistic apply → relay → other replicas.
//
// The only test-specific code here is the gesture helpers and the blocking
// polling wrappers (loops around `NetClient::poll()`). All networking and
// board logic uses the same code paths as a real client.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use sound_blocks_board::{BoardConfig, BoardSession, Key, NullSynth};
use sound_blocks_protocol::message::{ClientMessage, ServerMessage};
use sound_blocks_protocol::types::{Block, Point};
use sound_blocks_relay::client::NetClient;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test board client wrapping a real NetClient and BoardSession.
pub struct TestBoardClient {
    client: NetClient,
    outbox: Receiver<ClientMessage>,
    pub session: BoardSession<NullSynth>,
}

impl TestBoardClient {
    /// Connect to a relay and apply its sync snapshot. `seed` fixes the
    /// colors this client picks for new blocks.
    pub fn connect(addr: SocketAddr, seed: u64) -> Self {
        let (client, sync) =
            NetClient::connect(&addr.to_string()).expect("TestBoardClient::connect failed");
        let (tx, outbox) = mpsc::channel();
        let mut session = BoardSession::with_rng(
            BoardConfig::default(),
            tx,
            NullSynth,
            StdRng::seed_from_u64(seed),
        );
        session.handle_server_message(ServerMessage::Sync(sync));
        Self {
            client,
            outbox,
            session,
        }
    }

    /// Press at `from`, move to `to`, release. Does not send anything.
    pub fn hold(&mut self, from: (f64, f64), to: (f64, f64)) {
        self.session.pointer_down(Point::new(from.0, from.1));
        self.session.pointer_move(Point::new(to.0, to.1));
        self.session.pointer_up();
    }

    /// Same gesture with drag mode held, which moves the block under `from`.
    pub fn drag(&mut self, from: (f64, f64), to: (f64, f64)) {
        self.session.key_down(Key::Space);
        self.hold(from, to);
        self.session.key_up(Key::Space);
    }

    /// Click inside a block (selecting it), then press a waveform key.
    pub fn retype(&mut self, at: (f64, f64), key: char) {
        self.session.pointer_down(Point::new(at.0, at.1));
        self.session.pointer_up();
        self.session.key_down(Key::Char(key));
        self.session.key_up(Key::Char(key));
    }

    /// Write everything the session has queued to the relay. Returns how
    /// many messages went out.
    pub fn flush(&mut self) -> usize {
        self.client.forward(&self.outbox).expect("forward failed")
    }

    /// Non-blocking: apply every relay message that has arrived. Returns how
    /// many were applied.
    pub fn pump(&mut self) -> usize {
        let messages = self.client.poll();
        let count = messages.len();
        for msg in messages {
            self.session.handle_server_message(msg);
        }
        count
    }

    /// Blocking pump until `done` holds for this client's session.
    pub fn pump_until(&mut self, what: &str, done: impl Fn(&BoardSession<NullSynth>) -> bool) {
        let start = Instant::now();
        loop {
            self.pump();
            if done(&self.session) {
                return;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {what}"
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocking pump until the replica holds `count` blocks.
    pub fn pump_until_blocks(&mut self, count: usize) {
        self.pump_until(&format!("{count} blocks"), |s| s.replica().len() == count);
    }

    pub fn blocks(&self) -> &[Block] {
        self.session.replica().blocks()
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }
}
