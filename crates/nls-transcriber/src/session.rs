//! Transcription session: the lifecycle state machine.
//!
//! One [`Transcriber`] drives at most one gateway connection at a time:
//!
//! ```text
//! Idle → Connecting → Started → Transcribing → Closing → Closed
//!            │           │           │            │
//!            └───────────┴───────────┴────────────┴──→ Failed
//! ```
//!
//! `start` and `close` park a reply slot in the session state; the slot is
//! filled by the inbound message that answers it (`TranscriptionStarted`,
//! `TranscriptionCompleted`, `TaskFailed`) or rejected by shutdown or an
//! unexpected disconnect. All state lives behind one mutex that is never held
//! across an `.await`.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use nls_protocol::{ControlRequest, ControlResponse, RequestName, ResponseName, generate_id};
use nls_transport::{Connector, Frame, FrameHandler, Link, WsConnector};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, trace, warn};

use crate::config::{StartOptions, TranscriberConfig};
use crate::error::TranscriberError;
use crate::events::{EventBus, TranscriptionEvent};

/// Lifecycle state of a [`Transcriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    /// `TranscriptionStarted` received
    Started,
    /// At least one audio frame sent
    Transcribing,
    /// `StopTranscription` sent, waiting for the gateway
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    /// Whether a connection is being opened or is open.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Started | Self::Transcribing | Self::Closing
        )
    }
}

/// The session's hold on its transport link.
enum Connection<L> {
    Absent,
    Open(L),
}

type ReplySlot = oneshot::Sender<Result<ControlResponse, TranscriberError>>;

struct Inner<L> {
    state: SessionState,
    /// Bumped by every `start`; callbacks from older connections are ignored
    epoch: u64,
    /// Task id of the current (or most recent) session, empty before the first start
    task_id: String,
    connection: Connection<L>,
    pending_start: Option<ReplySlot>,
    pending_close: Option<ReplySlot>,
}

impl<L: Link> Inner<L> {
    /// Cancel the probe and terminate the link. Returns whether a link was open.
    fn teardown(&mut self) -> bool {
        match std::mem::replace(&mut self.connection, Connection::Absent) {
            Connection::Open(mut link) => {
                link.stop_liveness();
                link.terminate();
                true
            }
            Connection::Absent => false,
        }
    }

    /// Fail every operation still waiting on the gateway.
    fn reject_pending(&mut self, error: impl Fn() -> TranscriberError) {
        if let Some(slot) = self.pending_start.take() {
            let _ = slot.send(Err(error()));
        }
        if let Some(slot) = self.pending_close.take() {
            let _ = slot.send(Err(error()));
        }
    }
}

struct Shared<L> {
    app_key: String,
    inner: Mutex<Inner<L>>,
    events: EventBus,
}

impl<L: Link> Shared<L> {
    fn request(
        &self,
        task_id: &str,
        name: RequestName,
        payload: Value,
    ) -> Result<String, TranscriberError> {
        Ok(ControlRequest::new(name, task_id, &self.app_key, payload).to_json()?)
    }

    /// Route one inbound control message through the dispatch table.
    fn dispatch(&self, epoch: u64, text: &str) {
        let response = match ControlResponse::parse(text) {
            Ok(response) => response,
            Err(e) => {
                warn!("Ignoring malformed control message: {e}");
                return;
            }
        };
        let Some(name) = response.response_name() else {
            debug!("Ignoring unknown control message: {}", response.header.name);
            return;
        };

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!("Ignoring {name} from a superseded connection");
            return;
        }
        // Closed and Failed are terminal; a frame racing a teardown is dropped
        if !inner.state.is_active() {
            debug!("Ignoring {name} after teardown ({:?})", inner.state);
            return;
        }
        debug!("Received {name} for task {}", inner.task_id);

        match name {
            ResponseName::TranscriptionStarted => {
                if inner.state != SessionState::Connecting {
                    debug!("Ignoring duplicate TranscriptionStarted ({:?})", inner.state);
                    return;
                }
                inner.state = SessionState::Started;
                info!("Transcription task {} started", inner.task_id);
                self.events.emit(TranscriptionEvent::Started(response.clone()));
                if let Some(slot) = inner.pending_start.take() {
                    let _ = slot.send(Ok(response));
                }
            }
            ResponseName::SentenceBegin => {
                self.events.emit(TranscriptionEvent::Begin(response));
            }
            ResponseName::TranscriptionResultChanged => {
                self.events.emit(TranscriptionEvent::Changed(response));
            }
            ResponseName::SentenceEnd => {
                self.events.emit(TranscriptionEvent::End(response));
            }
            ResponseName::TranscriptionCompleted => {
                inner.teardown();
                inner.state = SessionState::Closed;
                info!("Transcription task {} completed", inner.task_id);
                self.events.emit(TranscriptionEvent::Completed(response.clone()));
                if let Some(slot) = inner.pending_close.take() {
                    let _ = slot.send(Ok(response));
                }
                inner.reject_pending(|| TranscriberError::Cancelled);
            }
            ResponseName::TaskFailed => {
                inner.teardown();
                inner.state = SessionState::Failed;
                warn!("Transcription task {} failed: {response}", inner.task_id);
                self.events.emit(TranscriptionEvent::Failed(response.clone()));
                inner.reject_pending(|| TranscriberError::TaskFailed(Box::new(response.clone())));
            }
        }
    }

    /// The transport dropped without a local shutdown.
    fn handle_closed(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || !inner.state.is_active() {
            return;
        }
        warn!("Connection closed unexpectedly (task {})", inner.task_id);
        inner.teardown();
        inner.state = if inner.state == SessionState::Connecting {
            SessionState::Failed
        } else {
            SessionState::Closed
        };
        inner.reject_pending(|| TranscriberError::Disconnected);
        self.events.emit(TranscriptionEvent::Closed);
    }
}

/// Bridges transport callbacks into the session that opened the connection.
struct SessionHandler<L> {
    shared: Weak<Shared<L>>,
    epoch: u64,
}

impl<L: Link> FrameHandler for SessionHandler<L> {
    fn on_frame(&self, frame: Frame) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        match frame {
            Frame::Text(text) => shared.dispatch(self.epoch, &text),
            Frame::Binary(data) => debug!("Ignoring {} byte binary frame", data.len()),
        }
    }

    fn on_close(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_closed(self.epoch);
        }
    }

    fn on_pong(&self) {
        trace!("Liveness acknowledged");
    }
}

/// Client handle for one streaming transcription session at a time.
///
/// Cheap to clone; clones share the same session. Dropping the last clone
/// terminates any open connection.
pub struct Transcriber<C: Connector = WsConnector> {
    connector: Arc<C>,
    shared: Arc<Shared<C::Link>>,
}

impl<C: Connector> Clone for Transcriber<C> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl Transcriber<WsConnector> {
    /// Create a transcriber for the WebSocket gateway described by `config`.
    pub fn new(config: TranscriberConfig) -> Result<Self, TranscriberError> {
        config.validate()?;
        let connector = WsConnector::new(config.transport());
        Ok(Self::with_connector(
            config.app_key,
            connector,
            config.event_capacity,
        ))
    }
}

impl<C: Connector> Transcriber<C> {
    pub fn with_connector(app_key: impl Into<String>, connector: C, event_capacity: usize) -> Self {
        Self {
            connector: Arc::new(connector),
            shared: Arc::new(Shared {
                app_key: app_key.into(),
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    epoch: 0,
                    task_id: String::new(),
                    connection: Connection::Absent,
                    pending_start: None,
                    pending_close: None,
                }),
                events: EventBus::new(event_capacity),
            }),
        }
    }

    /// Open a connection, send `StartTranscription`, and wait for
    /// `TranscriptionStarted`.
    ///
    /// The liveness probe, if enabled, starts right after the start request
    /// is queued. Fails with [`TranscriberError::SessionActive`] if a session
    /// is already connecting or open.
    pub async fn start(&self, options: StartOptions) -> Result<ControlResponse, TranscriberError> {
        let payload = serde_json::to_value(&options.params).map_err(nls_protocol::ProtocolError::from)?;

        let (epoch, task_id, reply) = {
            let mut inner = self.shared.inner.lock();
            if inner.state.is_active() {
                return Err(TranscriberError::SessionActive);
            }
            inner.epoch += 1;
            inner.task_id = generate_id();
            inner.state = SessionState::Connecting;
            let (slot, reply) = oneshot::channel();
            inner.pending_start = Some(slot);
            (inner.epoch, inner.task_id.clone(), reply)
        };
        info!("Starting transcription task {task_id}");

        let handler: Arc<dyn FrameHandler> = Arc::new(SessionHandler {
            shared: Arc::downgrade(&self.shared),
            epoch,
        });

        let mut link = match self.connector.connect(handler).await {
            Ok(link) => link,
            Err(e) => {
                warn!("Failed to connect task {task_id}: {e}");
                let mut inner = self.shared.inner.lock();
                if inner.epoch == epoch && inner.state == SessionState::Connecting {
                    inner.state = SessionState::Failed;
                    inner.pending_start = None;
                }
                return Err(e.into());
            }
        };

        {
            let mut inner = self.shared.inner.lock();
            if inner.epoch != epoch || inner.state != SessionState::Connecting {
                // Shut down or dropped while the connection was opening; the
                // reply slot has already been resolved.
                link.terminate();
            } else {
                match self.shared.request(&task_id, RequestName::Start, payload) {
                    Ok(text) => {
                        link.send(Frame::Text(text));
                        if let Some(interval) = options.liveness {
                            link.start_liveness(interval);
                        }
                        inner.connection = Connection::Open(link);
                    }
                    Err(e) => {
                        link.terminate();
                        inner.state = SessionState::Failed;
                        inner.pending_start = None;
                        return Err(e);
                    }
                }
            }
        }

        reply.await.unwrap_or(Err(TranscriberError::Cancelled))
    }

    /// Send one chunk of encoded audio.
    ///
    /// Returns `false` without sending anything if no session is open; the
    /// caller should stop streaming.
    pub fn send_audio(&self, audio: impl Into<Bytes>) -> bool {
        let mut inner = self.shared.inner.lock();
        let sent = match &inner.connection {
            Connection::Open(link) => link.send(Frame::Binary(audio.into())),
            Connection::Absent => false,
        };
        if sent && inner.state == SessionState::Started {
            inner.state = SessionState::Transcribing;
        }
        sent
    }

    /// Send a `ControlTranscription` request. Fire-and-forget.
    pub fn ctrl(&self, payload: Value) -> Result<(), TranscriberError> {
        let inner = self.shared.inner.lock();
        let Connection::Open(link) = &inner.connection else {
            return Err(TranscriberError::NoActiveSession);
        };
        let text = self
            .shared
            .request(&inner.task_id, RequestName::Control, payload)?;
        link.send(Frame::Text(text));
        debug!("Sent ControlTranscription for task {}", inner.task_id);
        Ok(())
    }

    /// Send `StopTranscription` and wait for `TranscriptionCompleted`.
    ///
    /// Resolves with the completion message; the connection is torn down
    /// either way. A `TaskFailed` reply rejects with
    /// [`TranscriberError::TaskFailed`].
    pub async fn close(&self, payload: Value) -> Result<ControlResponse, TranscriberError> {
        let reply = {
            let mut inner = self.shared.inner.lock();
            let Connection::Open(link) = &inner.connection else {
                return Err(TranscriberError::NoActiveSession);
            };
            if inner.pending_close.is_some() {
                return Err(TranscriberError::CloseInProgress);
            }
            let text = self
                .shared
                .request(&inner.task_id, RequestName::Stop, payload)?;
            link.send(Frame::Text(text));

            let (slot, reply) = oneshot::channel();
            inner.pending_close = Some(slot);
            inner.state = SessionState::Closing;
            info!("Stopping transcription task {}", inner.task_id);
            reply
        };

        reply.await.unwrap_or(Err(TranscriberError::Cancelled))
    }

    /// Tear the session down immediately, without a server round-trip.
    ///
    /// Idempotent. Pending `start`/`close` calls fail with
    /// [`TranscriberError::Cancelled`]; no event is emitted.
    pub fn shutdown(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.teardown() {
            info!("Transcription task {} shut down", inner.task_id);
        }
        inner.reject_pending(|| TranscriberError::Cancelled);
        if inner.state.is_active() {
            inner.state = SessionState::Closed;
        }
    }

    /// Persistent subscription to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptionEvent> {
        self.shared.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Task id of the current or most recent session.
    pub fn task_id(&self) -> Option<String> {
        let inner = self.shared.inner.lock();
        (!inner.task_id.is_empty()).then(|| inner.task_id.clone())
    }

    /// Whether a transport connection is currently held.
    pub fn is_connected(&self) -> bool {
        matches!(self.shared.inner.lock().connection, Connection::Open(_))
    }
}
