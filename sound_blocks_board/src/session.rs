// Per-connection board context.
//
// `BoardSession` bundles everything one connected client needs: its replica,
// its interaction state, its config and RNG, the outbound message queue, and
// the audio voices. One is created per connection and passed explicitly to
// whatever drives input and network events; there is no global instance.
//
// Inbound relay events and local input are both handled on the caller's
// thread, one at a time, so the replica never sees interleaved writes.
// Local actions are applied to the replica first; the resulting
// `ClientMessage` is then pushed onto an `mpsc` channel and forgotten. The
// owner drains that channel onto the network (see
// `sound_blocks_relay::client::NetClient::forward`). There are no acks and no
// retries.
//
// User input is ignored until the first `sync` has been applied, so the very
// first id this client proposes comes from the relay's counter.

use std::sync::mpsc::{self, Receiver, Sender};

use rand::SeedableRng;
use rand::rngs::StdRng;
use sound_blocks_protocol::message::{ClientMessage, ServerMessage};
use sound_blocks_protocol::types::Point;
use tracing::{debug, warn};

use crate::config::BoardConfig;
use crate::interaction::{BoardEvent, Interaction, Key};
use crate::media::{NullSynth, Surface, Synth, draw_board};
use crate::replica::Replica;

pub struct BoardSession<S: Synth = NullSynth> {
    replica: Replica,
    interaction: Interaction,
    config: BoardConfig,
    rng: StdRng,
    outbox: Sender<ClientMessage>,
    synth: S,
    synced: bool,
}

impl BoardSession<NullSynth> {
    /// A silent session plus the receiving end of its outbound queue.
    pub fn headless(config: BoardConfig) -> (Self, Receiver<ClientMessage>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(config, tx, NullSynth), rx)
    }
}

impl<S: Synth> BoardSession<S> {
    pub fn new(config: BoardConfig, outbox: Sender<ClientMessage>, synth: S) -> Self {
        Self::with_rng(config, outbox, synth, StdRng::from_entropy())
    }

    /// Like `new`, with a caller-supplied RNG for block colors.
    pub fn with_rng(
        config: BoardConfig,
        outbox: Sender<ClientMessage>,
        synth: S,
        rng: StdRng,
    ) -> Self {
        Self {
            replica: Replica::new(),
            interaction: Interaction::new(),
            config,
            rng,
            outbox,
            synth,
            synced: false,
        }
    }

    /// Apply one event received from the relay.
    pub fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Sync(sync) => {
                if self.synced {
                    warn!("received a second sync, replacing local board");
                }
                self.replica.on_sync(sync);
                self.interaction.reset();
                for block in self.replica.blocks() {
                    self.synth.add_voice(block.id, block.kind);
                }
                self.synced = true;
            }
            ServerMessage::Deploy(block) => {
                self.synth.add_voice(block.id, block.kind);
                self.replica.on_deploy(block);
            }
            ServerMessage::Update(update) => {
                if !self.replica.on_update(&update) {
                    return;
                }
                if let Some(waveform) = update.kind {
                    self.synth.set_waveform(update.id, waveform);
                }
            }
        }
    }

    pub fn pointer_down(&mut self, cursor: Point) {
        if !self.accepting_input() {
            return;
        }
        let events = self
            .interaction
            .pointer_down(cursor, &mut self.replica, &self.config);
        self.dispatch(events);
    }

    pub fn pointer_move(&mut self, cursor: Point) {
        if !self.accepting_input() {
            return;
        }
        self.interaction
            .pointer_move(cursor, &mut self.replica, &self.config);
    }

    pub fn pointer_up(&mut self) {
        if !self.accepting_input() {
            return;
        }
        let events = self
            .interaction
            .pointer_up(&mut self.replica, &self.config, &mut self.rng);
        self.dispatch(events);
    }

    pub fn key_down(&mut self, key: Key) {
        if !self.accepting_input() {
            return;
        }
        let events = self.interaction.key_down(key, &mut self.replica);
        self.dispatch(events);
    }

    pub fn key_up(&mut self, key: Key) {
        if !self.accepting_input() {
            return;
        }
        self.interaction.key_up(key);
    }

    /// Render the current frame.
    pub fn draw<T: Surface + ?Sized>(&self, surface: &mut T) {
        draw_board(surface, &self.replica, &self.interaction, &self.config);
    }

    /// Short description of the selected block for an info panel.
    pub fn info_text(&self) -> Option<String> {
        let block = self.replica.get(self.interaction.selected()?)?;
        Some(format!(
            "id: {}\npos: ({}, {})\ntype: {}",
            block.id, block.pos.x, block.pos.y, block.kind
        ))
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn synth(&self) -> &S {
        &self.synth
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    fn accepting_input(&self) -> bool {
        if !self.synced {
            debug!("input before sync ignored");
        }
        self.synced
    }

    fn dispatch(&mut self, events: Vec<BoardEvent>) {
        for event in events {
            match event {
                BoardEvent::Emit(msg) => {
                    if self.outbox.send(msg).is_err() {
                        warn!("outbound queue closed, event dropped");
                    }
                }
                BoardEvent::AddVoice { id, waveform } => self.synth.add_voice(id, waveform),
                BoardEvent::SetWaveform { id, waveform } => self.synth.set_waveform(id, waveform),
                BoardEvent::Pluck(id) => self.synth.pluck(id),
            }
        }
    }
}
