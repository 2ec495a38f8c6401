//! sdl-stream
//!
//! Owns the network side of a game subscription: one WebSocket transport per
//! subscription key, and the controller task that folds its signals into
//! reconciler state.
//!
//! The controller is the only mutator. Transports never touch state; they
//! push generation-tagged signals into a shared channel and the controller
//! drops whatever no longer belongs to the active generation.

pub mod controller;
pub mod transport;

pub use controller::{Command, ControllerHandle, SubscriptionController, SubscriptionKey};
pub use transport::{
    SignalSink, TaggedSignal, TransportFactory, TransportHandle, TransportSignal,
    WsTransportFactory,
};
