//! Subscription controller.
//!
//! # Purpose
//!
//! Keeps exactly one transport open for the current [`SubscriptionKey`] and
//! none when no game is selected. Every key change closes the previous
//! transport, retires its generation, resets reconciler state and opens a
//! fresh transport under a new generation.
//!
//! # Invariants
//!
//! - **Single mutator**: state changes only inside [`SubscriptionController::handle`]
//!   and the key setters, all on the controller's own task.
//! - **Epoch isolation**: a signal whose generation is not the active one is
//!   dropped before it reaches the reconciler.
//! - **Replay gated**: the applied mode is always what the runtime feature
//!   flags permit; a refused replay falls back to live.
//! - **Never raises**: setup failures (bad URL, connect failure) surface as
//!   reconciler state, not as `Err`.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use sdl_config::{stream_endpoint, PublicEnv};
use sdl_reconcile::{
    apply, apply_lifecycle, check_mode_gate, GameDeltaState, GenerationCheck, GenerationCounter,
    Lifecycle, Projector,
};
use sdl_schemas::{decode_or_log, GameId, ReplaySpeed, RuntimeConfig, StreamMessage, StreamMode};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::transport::{SignalSink, TaggedSignal, TransportFactory, TransportHandle, TransportSignal};

/// Capacity of the command queue behind a [`ControllerHandle`].
const COMMAND_QUEUE: usize = 64;

// ---------------------------------------------------------------------------
// SubscriptionKey
// ---------------------------------------------------------------------------

/// What the consumer wants to watch. Compared as a whole: any field change
/// replaces the transport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub game_id: Option<GameId>,
    #[serde(default)]
    pub mode: StreamMode,
    #[serde(default)]
    pub speed: ReplaySpeed,
}

impl SubscriptionKey {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn live(game_id: GameId) -> Self {
        Self {
            game_id: Some(game_id),
            ..Self::default()
        }
    }

    pub fn replay(game_id: GameId, speed: ReplaySpeed) -> Self {
        Self {
            game_id: Some(game_id),
            mode: StreamMode::Replay,
            speed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.game_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// SubscriptionController
// ---------------------------------------------------------------------------

pub struct SubscriptionController<F: TransportFactory> {
    factory: F,
    env: PublicEnv,
    runtime: RuntimeConfig,
    key: SubscriptionKey,
    generations: GenerationCounter,
    transport: Option<TransportHandle>,
    projector: Projector,
    snapshots: watch::Sender<Arc<GameDeltaState>>,
    keys: watch::Sender<SubscriptionKey>,
    signals_tx: SignalSink,
    signals_rx: mpsc::UnboundedReceiver<TaggedSignal>,
}

impl<F: TransportFactory> SubscriptionController<F> {
    pub fn new(factory: F, env: PublicEnv, runtime: RuntimeConfig) -> Self {
        let projector = Projector::default();
        let (snapshots, _) = watch::channel(projector.current());
        let (keys, _) = watch::channel(SubscriptionKey::none());
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            factory,
            env,
            runtime,
            key: SubscriptionKey::none(),
            generations: GenerationCounter::new(),
            transport: None,
            projector,
            snapshots,
            keys,
            signals_tx,
            signals_rx,
        }
    }

    // -- key setters -------------------------------------------------------

    /// Apply a new subscription key and return the key actually in effect
    /// (replay may have been demoted to live).
    pub fn set_subscription(&mut self, requested: SubscriptionKey) -> SubscriptionKey {
        let key = self.gate(requested);
        if key == self.key {
            return key;
        }
        info!(
            game_id = key.game_id.as_ref().map(GameId::as_str),
            mode = %key.mode,
            speed = %key.speed,
            "subscription changed"
        );
        self.key = key.clone();
        self.keys.send_replace(key.clone());
        self.restart();
        key
    }

    pub fn select_game(&mut self, game_id: Option<GameId>) -> SubscriptionKey {
        self.set_subscription(SubscriptionKey {
            game_id,
            ..self.key.clone()
        })
    }

    /// Request a mode; returns the mode actually applied.
    pub fn set_mode(&mut self, mode: StreamMode) -> StreamMode {
        self.set_subscription(SubscriptionKey {
            mode,
            ..self.key.clone()
        })
        .mode
    }

    pub fn set_speed(&mut self, speed: ReplaySpeed) -> SubscriptionKey {
        self.set_subscription(SubscriptionKey {
            speed,
            ..self.key.clone()
        })
    }

    /// Drop the subscription entirely. Equivalent to selecting no game.
    pub fn detach(&mut self) {
        self.select_game(None);
    }

    /// Swap in a new runtime config and return the key in effect afterwards.
    /// The current key is re-gated, so a replay subscription is demoted if the
    /// new config turns replay off. A changed game-update path template
    /// reopens the transport even when the key stays the same.
    pub fn set_runtime_config(&mut self, runtime: RuntimeConfig) -> SubscriptionKey {
        debug!(
            replay = runtime.feature_flags.replay,
            game_updates = %runtime.websocket_paths.game_updates,
            "runtime config updated"
        );
        let path_changed = runtime.game_updates_path() != self.runtime.game_updates_path();
        self.runtime = runtime;

        let requested = self.key.clone();
        let key = self.gate(requested);
        if key == self.key {
            if path_changed && key.is_active() {
                info!("stream path template changed, reopening");
                self.restart();
            }
            return key;
        }
        self.set_subscription(key)
    }

    fn gate(&self, mut key: SubscriptionKey) -> SubscriptionKey {
        if key.game_id.as_ref().is_some_and(GameId::is_blank) {
            debug!("blank game id, treating as no game");
            key.game_id = None;
        }
        let gate = check_mode_gate(key.mode, &self.runtime.feature_flags);
        if gate.is_demoted() {
            info!(requested = %key.mode, "replay disabled by feature flags, using live");
        }
        key.mode = gate.applied();
        key
    }

    // -- transport lifecycle ----------------------------------------------

    fn teardown(&mut self) {
        if let Some(handle) = self.transport.take() {
            info!(generation = %handle.generation(), "closing transport");
            handle.close();
        }
        self.generations.retire();
    }

    fn restart(&mut self) {
        self.teardown();

        let Some(game_id) = self.key.game_id.clone() else {
            self.publish(GameDeltaState::idle());
            return;
        };

        let url = match stream_endpoint(
            &self.env.ws_url,
            self.runtime.game_updates_path(),
            &game_id,
            self.key.mode,
            Some(self.key.speed),
        ) {
            Ok(url) => url,
            Err(err) => {
                warn!(game_id = %game_id, error = %err, "cannot build stream endpoint");
                let failed = apply_lifecycle(
                    &GameDeltaState::connecting(),
                    &Lifecycle::TransportError(err.to_string()),
                );
                self.publish(failed);
                return;
            }
        };

        let generation = self.generations.advance();
        info!(%generation, %url, "opening transport");
        let handle = self.factory.open(&url, generation, self.signals_tx.clone());
        self.transport = Some(handle);
        self.publish(GameDeltaState::connecting());
    }

    // -- signals -----------------------------------------------------------

    /// Fold one transport signal into state. Stale signals are dropped.
    pub fn handle(&mut self, tagged: TaggedSignal) {
        if let GenerationCheck::Stale { current, got } = self.generations.check(tagged.generation) {
            trace!(%got, current = ?current, "dropping stale transport signal");
            return;
        }

        let state = self.projector.state();
        let next = match tagged.signal {
            TransportSignal::Opened => apply_lifecycle(state, &Lifecycle::Opened),
            TransportSignal::Closed => apply_lifecycle(state, &Lifecycle::Closed),
            TransportSignal::TransportError(reason) => {
                apply_lifecycle(state, &Lifecycle::TransportError(reason))
            }
            TransportSignal::Frame(text) => {
                let Some(msg) = decode_or_log(&text) else {
                    return;
                };
                if !self.belongs_to_subscription(&msg) {
                    warn!(
                        event_id = msg.event_id(),
                        kind = msg.kind(),
                        "dropping frame for another game"
                    );
                    return;
                }
                apply(state, &msg)
            }
        };
        self.publish(next);
    }

    /// Handle every signal already queued, without waiting.
    /// Returns how many were processed (stale ones included).
    pub fn drain_pending(&mut self) -> usize {
        let mut n = 0;
        while let Ok(tagged) = self.signals_rx.try_recv() {
            self.handle(tagged);
            n += 1;
        }
        n
    }

    fn belongs_to_subscription(&self, msg: &StreamMessage) -> bool {
        self.key
            .game_id
            .as_ref()
            .is_some_and(|id| id.as_str() == msg.event_id())
    }

    fn publish(&mut self, next: GameDeltaState) {
        if let Some(snapshot) = self.projector.publish(next) {
            self.snapshots.send_replace(snapshot);
        }
    }

    // -- read side ---------------------------------------------------------

    pub fn snapshot(&self) -> Arc<GameDeltaState> {
        self.projector.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<GameDeltaState>> {
        self.snapshots.subscribe()
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// Whether a transport is currently held open.
    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    // -- task --------------------------------------------------------------

    /// Drive signals and commands on the current task until a `Shutdown`
    /// command arrives or every command sender is gone.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                Some(tagged) = self.signals_rx.recv() => self.handle(tagged),
                cmd = commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.execute(cmd),
                },
            }
        }
        self.teardown();
        info!("subscription controller stopped");
    }

    fn execute(&mut self, cmd: Command) {
        match cmd {
            Command::Subscribe { key, reply } => {
                let applied = self.set_subscription(key);
                let _ = reply.send(applied);
            }
            Command::Detach { reply } => {
                self.detach();
                let _ = reply.send(());
            }
            Command::SetRuntimeConfig { runtime, reply } => {
                let applied = self.set_runtime_config(*runtime);
                let _ = reply.send(applied);
            }
            Command::Shutdown => {}
        }
    }
}

impl<F: TransportFactory + 'static> SubscriptionController<F> {
    /// Move the controller onto its own tokio task.
    pub fn spawn(mut self) -> (ControllerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let handle = ControllerHandle {
            commands: tx,
            snapshots: self.snapshots.subscribe(),
            keys: self.keys.subscribe(),
        };
        let task = tokio::spawn(async move { self.run(rx).await });
        (handle, task)
    }
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Command {
    Subscribe {
        key: SubscriptionKey,
        reply: oneshot::Sender<SubscriptionKey>,
    },
    Detach {
        reply: oneshot::Sender<()>,
    },
    SetRuntimeConfig {
        runtime: Box<RuntimeConfig>,
        reply: oneshot::Sender<SubscriptionKey>,
    },
    Shutdown,
}

/// Cloneable front for a spawned controller.
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<GameDeltaState>>,
    keys: watch::Receiver<SubscriptionKey>,
}

impl ControllerHandle {
    /// Apply a key and wait for the key actually in effect.
    pub async fn subscribe(&self, key: SubscriptionKey) -> anyhow::Result<SubscriptionKey> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { key, reply }).await?;
        rx.await.context("controller dropped subscribe reply")
    }

    /// Drop the subscription and wait until the controller has done so.
    pub async fn detach(&self) -> anyhow::Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Detach { reply }).await?;
        rx.await.context("controller dropped detach reply")
    }

    /// Swap the runtime config and wait for the key in effect afterwards.
    pub async fn set_runtime_config(
        &self,
        runtime: RuntimeConfig,
    ) -> anyhow::Result<SubscriptionKey> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetRuntimeConfig {
            runtime: Box::new(runtime),
            reply,
        })
        .await?;
        rx.await.context("controller dropped runtime config reply")
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send(Command::Shutdown).await
    }

    pub fn snapshot(&self) -> Arc<GameDeltaState> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn key(&self) -> SubscriptionKey {
        self.keys.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<GameDeltaState>> {
        self.snapshots.clone()
    }

    async fn send(&self, cmd: Command) -> anyhow::Result<()> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| anyhow!("subscription controller is not running"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
