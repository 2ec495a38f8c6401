//! Scenario: signals from a torn-down transport never reach current state.
//!
//! # Invariants under test
//!
//! 1. A frame sent through the sink of a superseded transport (captured
//!    before a game switch) is dropped.
//! 2. Lifecycle signals from a superseded transport are dropped too.
//! 3. After detach, nothing from any earlier transport applies.
//! 4. Live game `401547439`: handshake 30 s, delta 2 then 1 → deltas `[1, 2]`.
//!
//! The transport factory is an in-process fake; no network required.

use std::sync::{Arc, Mutex};

use sdl_config::PublicEnv;
use sdl_reconcile::{Generation, StreamPhase, StreamStatus};
use sdl_schemas::{FeatureFlags, GameId, RuntimeConfig, WebSocketPaths};
use sdl_stream::{
    SignalSink, SubscriptionController, TaggedSignal, TransportFactory, TransportHandle,
    TransportSignal,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Opened {
    url: String,
    generation: Generation,
    sink: SignalSink,
}

#[derive(Clone, Default)]
struct FakeFactory {
    opened: Arc<Mutex<Vec<Opened>>>,
}

impl FakeFactory {
    fn count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Sink and generation of the n-th transport ever opened.
    fn transport(&self, n: usize) -> (SignalSink, Generation) {
        let opened = self.opened.lock().unwrap();
        (opened[n].sink.clone(), opened[n].generation)
    }
}

impl TransportFactory for FakeFactory {
    fn open(&mut self, url: &str, generation: Generation, sink: SignalSink) -> TransportHandle {
        self.opened.lock().unwrap().push(Opened {
            url: url.to_string(),
            generation,
            sink,
        });
        let (handle, _shutdown) = TransportHandle::new(generation, url);
        handle
    }
}

fn runtime() -> RuntimeConfig {
    RuntimeConfig {
        api_base_url: "http://localhost:8000/api".to_string(),
        websocket_paths: WebSocketPaths::default(),
        feature_flags: FeatureFlags::with_replay(true),
        version: None,
        generated_at: None,
    }
}

fn controller() -> (SubscriptionController<FakeFactory>, FakeFactory) {
    let factory = FakeFactory::default();
    let c = SubscriptionController::new(factory.clone(), PublicEnv::default(), runtime());
    (c, factory)
}

fn send(sink: &SignalSink, generation: Generation, signal: TransportSignal) {
    sink.send(TaggedSignal::new(generation, signal)).unwrap();
}

fn delta_frame(event_id: &str, sequence: i64) -> TransportSignal {
    TransportSignal::Frame(format!(
        r#"{{"type":"delta","event_id":"{event_id}","data":{{"sequence":{sequence},"type":"pass","flags":[]}}}}"#
    ))
}

// ---------------------------------------------------------------------------
// 1-2. Game switch isolates the old transport
// ---------------------------------------------------------------------------

#[test]
fn stale_frame_after_game_switch_is_ignored() {
    let (mut c, factory) = controller();

    c.select_game(Some(GameId::new("A")));
    let (sink_a, gen_a) = factory.transport(0);
    send(&sink_a, gen_a, TransportSignal::Opened);
    send(&sink_a, gen_a, delta_frame("A", 1));
    c.drain_pending();
    assert_eq!(c.snapshot().deltas.len(), 1);

    c.select_game(Some(GameId::new("B")));
    assert_eq!(factory.count(), 2);
    let (_, gen_b) = factory.transport(1);
    assert!(gen_b > gen_a);

    // Old socket delivers late; its sink is still a valid sender.
    send(&sink_a, gen_a, delta_frame("A", 7));
    send(&sink_a, gen_a, TransportSignal::Opened);
    assert_eq!(c.drain_pending(), 2);

    let snap = c.snapshot();
    assert!(snap.deltas.is_empty());
    assert_eq!(snap.phase, StreamPhase::Connecting);
    assert!(!snap.is_connected);
}

#[test]
fn stale_close_does_not_disconnect_new_transport() {
    let (mut c, factory) = controller();

    c.select_game(Some(GameId::new("A")));
    let (sink_a, gen_a) = factory.transport(0);

    c.select_game(Some(GameId::new("B")));
    let (sink_b, gen_b) = factory.transport(1);
    send(&sink_b, gen_b, TransportSignal::Opened);
    send(&sink_a, gen_a, TransportSignal::TransportError("reset".into()));
    send(&sink_a, gen_a, TransportSignal::Closed);
    c.drain_pending();

    let snap = c.snapshot();
    assert!(snap.is_connected);
    assert_eq!(snap.status(), StreamStatus::Connected);
}

// ---------------------------------------------------------------------------
// 3. Detach
// ---------------------------------------------------------------------------

#[test]
fn nothing_applies_after_detach() {
    let (mut c, factory) = controller();

    c.select_game(Some(GameId::new("A")));
    let (sink_a, gen_a) = factory.transport(0);
    send(&sink_a, gen_a, TransportSignal::Opened);
    c.drain_pending();

    c.detach();
    assert!(!c.has_transport());
    send(&sink_a, gen_a, delta_frame("A", 3));
    c.drain_pending();

    let snap = c.snapshot();
    assert_eq!(snap.phase, StreamPhase::Idle);
    assert_eq!(snap.status(), StreamStatus::NoSubscription);
    assert!(snap.deltas.is_empty());
}

// ---------------------------------------------------------------------------
// 4. Live game ordering
// ---------------------------------------------------------------------------

#[test]
fn live_game_orders_out_of_order_deltas() {
    let (mut c, factory) = controller();

    c.select_game(Some(GameId::new("401547439")));
    assert_eq!(
        factory.opened.lock().unwrap()[0].url,
        "ws://localhost:8000/ws/games/401547439?mode=live"
    );

    let (sink, generation) = factory.transport(0);
    send(&sink, generation, TransportSignal::Opened);
    send(
        &sink,
        generation,
        TransportSignal::Frame(
            r#"{"type":"handshake","event_id":"401547439","heartbeat_sec":30}"#.to_string(),
        ),
    );
    send(&sink, generation, delta_frame("401547439", 2));
    send(&sink, generation, delta_frame("401547439", 1));
    c.drain_pending();

    let snap = c.snapshot();
    let seqs: Vec<i64> = snap.deltas.iter().map(|d| d.sequence).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(snap.handshake.as_ref().map(|h| h.heartbeat_sec), Some(30));
    assert!(snap.is_connected);
}
