// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per client): decode `ClientMessage`s in a loop and
//   send `InternalEvent::MessageFrom` to the main thread. On EOF, read error,
//   malformed frame, or `goodbye`, send `InternalEvent::Disconnected` and exit.
// - **Main thread**: owns the `Session`, receives events from the channel,
//   and dispatches them one at a time. This is what serializes access to the
//   block store: a deploy or update is fully applied and fanned out before
//   the next event is looked at.
//
// The main thread is the only writer to client TCP streams. Reader threads
// only read. A connection's reader thread is spawned after its sync has been
// written, so nothing the client sends can be handled before it has a
// snapshot.
//
// Every accepted stream gets `RelayConfig::write_timeout`. The main thread is
// the only writer, so a client that stops reading could otherwise stall the
// fan-out for everyone; with the timeout it is dropped instead (see
// `Session::broadcast_except`).
//
// Shutdown: the main thread polls a `keep_running` flag (cleared by
// `RelayHandle::stop`) between events. On exit it closes every connection,
// which unblocks and ends the reader threads.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use sound_blocks_protocol::framing::recv;
use sound_blocks_protocol::message::ClientMessage;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::session::{ConnectionId, Session};

/// How long the main loop waits for an event before re-checking
/// `keep_running`.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub port: u16,
    /// How long a single write to a client may block before that client is
    /// dropped.
    pub write_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    let addr = format!("{}:{}", config.bind_addr, config.port);
    let bind_err = |source| RelayError::Bind {
        addr: addr.clone(),
        source,
    };
    let listener = TcpListener::bind(&addr).map_err(bind_err)?;
    let local_addr = listener.local_addr().map_err(bind_err)?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let write_timeout = config.write_timeout;
    let thread = thread::spawn(move || {
        run_relay(listener, keep_running_clone, write_timeout);
    });

    info!(addr = %local_addr, "relay listening");
    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        local_addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, keep_running: Arc<AtomicBool>, write_timeout: Duration) {
    let mut session = Session::new();

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Non-blocking so the accept thread can check keep_running periodically.
    listener.set_nonblocking(true).ok();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted");
                    stream.set_nonblocking(false).ok();
                    if let Err(e) = stream.set_write_timeout(Some(write_timeout)) {
                        warn!(%peer, error = %e, "could not set write timeout, rejecting");
                        continue;
                    }
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed, listener exiting");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(SHUTDOWN_POLL) {
            Ok(event) => handle_event(&mut session, event, &tx, &keep_running),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    info!(
        blocks = session.store().len(),
        connections = session.connection_count(),
        "relay stopped"
    );
    session.close_all();
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom {
            connection_id,
            message,
        } => {
            // A reader may still deliver a message queued before its
            // connection was dropped; it is applied like any other.
            session.handle_message(connection_id, message);
        }
        InternalEvent::Disconnected { connection_id } => {
            session.remove_connection(connection_id);
        }
    }
}

/// Register a new connection (which sends its sync) and spawn its reader.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let reader = match stream.try_clone() {
        Ok(s) => BufReader::new(s),
        Err(e) => {
            warn!(error = %e, "could not clone stream, dropping connection");
            return;
        }
    };

    let connection_id = session.add_connection(stream);

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(reader, connection_id, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection_id: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match recv::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => break,
            Ok(message) => {
                if tx
                    .send(InternalEvent::MessageFrom {
                        connection_id,
                        message,
                    })
                    .is_err()
                {
                    return;
                }
            }
            Err(e) if e.is_disconnect() => break,
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "bad frame, disconnecting");
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { connection_id });
}
