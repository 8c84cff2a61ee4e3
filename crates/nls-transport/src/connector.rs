//! Connector and link traits: the seam between the transcription session
//! and the socket.
//!
//! The session only ever talks to a [`Link`] obtained from a [`Connector`].
//! Production code uses [`WsConnector`], which opens a real
//! [`TransportSession`]; tests can substitute an in-memory pair.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::session::{Frame, FrameHandler, TransportConfig, TransportSession};

/// Opens connections.
pub trait Connector: Send + Sync + 'static {
    type Link: Link;

    /// Open a connection that reports inbound traffic to `handler`.
    fn connect(
        &self,
        handler: Arc<dyn FrameHandler>,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;
}

/// An open connection, as seen by its owner.
pub trait Link: Send + 'static {
    /// Queue a frame; `false` if the connection is gone.
    fn send(&self, frame: Frame) -> bool;
    fn start_liveness(&mut self, interval: Duration);
    fn stop_liveness(&mut self);
    /// Forcibly close. Must be idempotent.
    fn terminate(&mut self);
}

/// Connector for the real WebSocket gateway.
#[derive(Debug, Clone)]
pub struct WsConnector {
    config: TransportConfig,
}

impl WsConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Connector for WsConnector {
    type Link = TransportSession;

    async fn connect(
        &self,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<TransportSession, TransportError> {
        TransportSession::connect(&self.config, handler).await
    }
}

impl Link for TransportSession {
    fn send(&self, frame: Frame) -> bool {
        TransportSession::send(self, frame)
    }

    fn start_liveness(&mut self, interval: Duration) {
        TransportSession::start_liveness(self, interval)
    }

    fn stop_liveness(&mut self) {
        TransportSession::stop_liveness(self)
    }

    fn terminate(&mut self) {
        TransportSession::terminate(self)
    }
}
