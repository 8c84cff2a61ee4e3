//! Protocol error type and gateway status codes.

/// Status code the gateway reports for a successful response.
pub const STATUS_SUCCESS: u32 = 20_000_000;

/// Errors raised while encoding or decoding control messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON or did not match the control message shape.
    #[error("malformed control message: {0}")]
    Json(#[from] serde_json::Error),
}
