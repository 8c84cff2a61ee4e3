//! Transcription session error taxonomy.
//!
//! Connect failures and protocol failures surface through the future of the
//! operation that awaited them; usage errors are returned at the call site.

use nls_protocol::{ControlResponse, ProtocolError};
use nls_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum TranscriberError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The connection could not be opened.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `ctrl`/`close` called with no open connection.
    #[error("no active session")]
    NoActiveSession,

    /// `start` called while a session is already connecting or open.
    #[error("a session is already active")]
    SessionActive,

    #[error("a close is already in progress")]
    CloseInProgress,

    /// The gateway reported `TaskFailed`.
    #[error("task failed: {0}")]
    TaskFailed(Box<ControlResponse>),

    /// The connection dropped while an operation was waiting on the gateway.
    #[error("connection closed unexpectedly")]
    Disconnected,

    /// The session was shut down locally while an operation was pending.
    #[error("session shut down")]
    Cancelled,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TranscriberError {
    /// The failure response, if this error came from the gateway.
    pub fn response(&self) -> Option<&ControlResponse> {
        match self {
            Self::TaskFailed(response) => Some(response),
            _ => None,
        }
    }
}
