//! Transport error type.

use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Errors raised while opening a connection.
///
/// Failures after the connection is open are reported through
/// [`FrameHandler::on_close`](crate::FrameHandler::on_close), not as errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The URL or token could not be turned into an upgrade request.
    #[error("invalid connection request: {0}")]
    InvalidRequest(String),

    /// TCP, TLS, or WebSocket handshake failure.
    #[error("connection failed: {0}")]
    Connect(#[from] tungstenite::Error),

    #[error("connection timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}
