//! Stream transport adapter.
//!
//! A transport owns one duplex connection for one endpoint URL and reports
//! what happens to it as [`TransportSignal`]s, each stamped with the
//! [`Generation`] it was opened under.
//!
//! Per instance:
//! - `Opened` at most once.
//! - `Closed` exactly once, also after `TransportError`, unless the handle
//!   was dropped before the socket ever opened.
//! - Nothing at all after the handle is closed or dropped.

use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use sdl_reconcile::Generation;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Connection attempts that take longer than this surface as a
/// `TransportError`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the owner-initiated close frame may take to go out.
const CLOSE_SEND_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportSignal {
    Opened,
    /// Raw text frame, undecoded.
    Frame(String),
    TransportError(String),
    Closed,
}

/// A signal plus the generation of the transport that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedSignal {
    pub generation: Generation,
    pub signal: TransportSignal,
}

impl TaggedSignal {
    pub fn new(generation: Generation, signal: TransportSignal) -> Self {
        Self { generation, signal }
    }
}

/// Channel every transport reports into. Shared by all generations.
pub type SignalSink = mpsc::UnboundedSender<TaggedSignal>;

// ---------------------------------------------------------------------------
// TransportHandle
// ---------------------------------------------------------------------------

/// Owning handle for a running transport.
///
/// Closing or dropping the handle tears the connection down; the transport
/// emits nothing after that.
#[derive(Debug)]
pub struct TransportHandle {
    generation: Generation,
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TransportHandle {
    /// Create a handle and the shutdown receiver the transport task listens on.
    ///
    /// The receiver resolves when the handle is closed or dropped.
    pub fn new(generation: Generation, url: impl Into<String>) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                generation,
                url: url.into(),
                shutdown: Some(tx),
            },
            rx,
        )
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn close(mut self) {
        self.signal_shutdown();
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

// ---------------------------------------------------------------------------
// TransportFactory
// ---------------------------------------------------------------------------

/// Opens transports on behalf of the subscription controller.
///
/// Implementations must not block; connection work happens in the
/// background and is reported through `sink`.
pub trait TransportFactory: Send {
    fn open(&mut self, url: &str, generation: Generation, sink: SignalSink) -> TransportHandle;
}

/// Production factory: one tokio task per transport, tokio-tungstenite
/// underneath. Must be called from within a tokio runtime.
#[derive(Clone, Debug)]
pub struct WsTransportFactory {
    connect_timeout: Duration,
}

impl Default for WsTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WsTransportFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl TransportFactory for WsTransportFactory {
    fn open(&mut self, url: &str, generation: Generation, sink: SignalSink) -> TransportHandle {
        let (handle, shutdown) = TransportHandle::new(generation, url);
        tokio::spawn(run_socket(
            url.to_string(),
            generation,
            sink,
            shutdown,
            self.connect_timeout,
        ));
        handle
    }
}

// ---------------------------------------------------------------------------
// Socket task
// ---------------------------------------------------------------------------

/// Send a close frame, giving up after `limit`. Returns whether it went out.
async fn send_close<S>(write: &mut S, limit: Duration) -> bool
where
    S: Sink<Message> + Unpin,
{
    matches!(
        tokio::time::timeout(limit, write.send(Message::Close(None))).await,
        Ok(Ok(()))
    )
}

async fn run_socket(
    url: String,
    generation: Generation,
    sink: SignalSink,
    mut shutdown: oneshot::Receiver<()>,
    connect_timeout: Duration,
) {
    let emit = |signal: TransportSignal| {
        // The controller may already be gone; nothing to report to then.
        let _ = sink.send(TaggedSignal::new(generation, signal));
    };

    let connected = tokio::select! {
        _ = &mut shutdown => {
            debug!(%generation, "transport discarded before open");
            return;
        }
        res = tokio::time::timeout(connect_timeout, connect_async(url.as_str())) => res,
    };

    let ws = match connected {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(err)) => {
            warn!(%generation, %url, error = %err, "websocket connect failed");
            emit(TransportSignal::TransportError(err.to_string()));
            emit(TransportSignal::Closed);
            return;
        }
        Err(_) => {
            warn!(%generation, %url, timeout_ms = connect_timeout.as_millis() as u64, "websocket connect timed out");
            emit(TransportSignal::TransportError(format!(
                "connect timed out after {}ms",
                connect_timeout.as_millis()
            )));
            emit(TransportSignal::Closed);
            return;
        }
    };

    info!(%generation, %url, "websocket connected");
    emit(TransportSignal::Opened);

    let (mut write, mut read) = ws.split();
    loop {
        let next = tokio::select! {
            _ = &mut shutdown => {
                debug!(%generation, "transport closed by owner");
                if !send_close(&mut write, CLOSE_SEND_TIMEOUT).await {
                    debug!(%generation, "peer did not take close frame, dropping socket");
                }
                return;
            }
            next = read.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => emit(TransportSignal::Frame(text)),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => emit(TransportSignal::Frame(text)),
                Err(err) => warn!(%generation, error = %err, "dropping non-utf8 binary frame"),
            },
            Some(Ok(Message::Close(frame))) => {
                info!(%generation, close = ?frame, "websocket closed by peer");
                emit(TransportSignal::Closed);
                return;
            }
            // ping/pong are answered by tungstenite itself
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!(%generation, error = %err, "websocket error");
                emit(TransportSignal::TransportError(err.to_string()));
                emit(TransportSignal::Closed);
                return;
            }
            None => {
                info!(%generation, "websocket stream ended");
                emit(TransportSignal::Closed);
                return;
            }
        }
    }
}
