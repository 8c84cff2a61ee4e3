//! WebSocket transport session using tokio-tungstenite.
//!
//! Owns one client connection to the gateway: a writer task draining an
//! outbound queue, a reader task forwarding inbound frames to a
//! [`FrameHandler`], and an optional liveness probe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::TransportError;

/// Header carrying the access token on the upgrade request.
pub const TOKEN_HEADER: &str = "X-NLS-Token";

/// Default public gateway endpoint.
pub const DEFAULT_URL: &str = "wss://nls-gateway.cn-shanghai.aliyuncs.com/ws/v1";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A single frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON control message
    Text(String),
    /// Raw audio
    Binary(Bytes),
}

/// Receives everything the transport reads off the socket.
///
/// Called from the transport's reader task; implementations must not block.
pub trait FrameHandler: Send + Sync + 'static {
    /// Called for every inbound text or binary frame.
    fn on_frame(&self, frame: Frame);

    /// Called at most once, when the peer closes the connection or it drops.
    /// Never called after a local [`TransportSession::terminate`].
    fn on_close(&self);

    /// Called when a liveness probe is acknowledged.
    fn on_pong(&self) {}
}

/// Transport session configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Gateway WebSocket URL
    pub url: String,
    /// Access token sent in the [`TOKEN_HEADER`] header
    pub token: SecretString,
    /// Upper bound on TCP connect + WebSocket handshake
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            token: SecretString::from(String::new()),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// An open connection to the gateway.
///
/// Dropping the session terminates it.
pub struct TransportSession {
    outbound: mpsc::UnboundedSender<Message>,
    /// Set once the connection is gone, by either side
    closed: Arc<AtomicBool>,
    terminated: bool,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    liveness: Option<Liveness>,
}

impl TransportSession {
    /// Open a connection and start forwarding inbound frames to `handler`.
    ///
    /// Resolves once the WebSocket handshake completes.
    pub async fn connect(
        config: &TransportConfig,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Self, TransportError> {
        let mut request = config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let token = HeaderValue::from_str(config.token.expose_secret())
            .map_err(|_| TransportError::InvalidRequest("token is not a valid header value".into()))?;
        request.headers_mut().insert(TOKEN_HEADER, token);

        if config.url.starts_with("wss") {
            // Already installed is fine
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        debug!("Connecting to {}", config.url);
        let (ws, _response) = tokio::time::timeout(config.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout(config.connect_timeout))??;
        info!("Transport connected: {}", config.url);

        let (sink, stream) = ws.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let writer = tokio::spawn(write_loop(sink, outbound_rx));
        let reader = tokio::spawn(read_loop(stream, handler, closed.clone()));

        Ok(Self {
            outbound,
            closed,
            terminated: false,
            reader,
            writer,
            liveness: None,
        })
    }

    /// Queue a frame for sending. Returns `false` (and drops the frame) if the
    /// connection is no longer open. Delivery is not confirmed.
    pub fn send(&self, frame: Frame) -> bool {
        if !self.is_open() {
            debug!("Dropping outbound frame: transport closed");
            return false;
        }
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data),
        };
        self.outbound.send(message).is_ok()
    }

    /// Start sending a ping every `interval`. Replaces any running probe.
    ///
    /// The first ping goes out one full interval after this call.
    pub fn start_liveness(&mut self, interval: Duration) {
        self.stop_liveness();
        if !self.is_open() {
            return;
        }
        if interval.is_zero() {
            warn!("Ignoring zero liveness interval");
            return;
        }
        let Some(first) = tokio::time::Instant::now().checked_add(interval) else {
            warn!("Ignoring liveness interval out of range: {interval:?}");
            return;
        };
        self.liveness = Some(Liveness::spawn(first, interval, self.outbound.clone()));
        debug!("Liveness probe started ({}ms)", interval.as_millis());
    }

    /// Cancel the liveness probe, if any.
    pub fn stop_liveness(&mut self) {
        if self.liveness.take().is_some() {
            debug!("Liveness probe stopped");
        }
    }

    /// Forcibly close the connection and cancel the liveness probe.
    ///
    /// Idempotent. The handler's `on_close` is not invoked for a closure
    /// started here.
    pub fn terminate(&mut self) {
        self.stop_liveness();
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.closed.store(true, Ordering::SeqCst);
        self.reader.abort();
        self.writer.abort();
        info!("Transport terminated");
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    pub fn has_liveness(&self) -> bool {
        self.liveness.is_some()
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Periodic ping task; aborted when dropped.
struct Liveness {
    task: JoinHandle<()>,
}

impl Liveness {
    fn spawn(
        first: tokio::time::Instant,
        interval: Duration,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, interval);
            loop {
                ticker.tick().await;
                if outbound.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                trace!("Liveness probe sent");
            }
        });
        Self { task }
    }
}

impl Drop for Liveness {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Socket tasks
// ─────────────────────────────────────────────────────────────────────────────

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = sink.send(message).await {
            warn!("Transport write failed: {e}");
            break;
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    handler: Arc<dyn FrameHandler>,
    closed: Arc<AtomicBool>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => handler.on_frame(Frame::Text(text.as_str().to_owned())),
            Ok(Message::Binary(data)) => handler.on_frame(Frame::Binary(data)),
            Ok(Message::Pong(_)) => {
                trace!("Liveness probe acknowledged");
                handler.on_pong();
            }
            Ok(Message::Close(frame)) => {
                debug!("Peer sent close: {frame:?}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Transport read failed: {e}");
                break;
            }
        }
    }

    if !closed.swap(true, Ordering::SeqCst) {
        info!("Transport closed by peer");
        handler.on_close();
    }
}
