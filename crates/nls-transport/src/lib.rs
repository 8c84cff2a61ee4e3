//! NLS Transport Layer
//!
//! Provides the WebSocket transport session for the transcription client.
//! The transport layer handles:
//! - Connection lifecycle (open, message, close)
//! - Token authorization on the upgrade request
//! - Liveness pings
//! - Forced termination
//!
//! The transport is agnostic to message semantics and is decoupled from the
//! session logic via the `FrameHandler`, `Connector`, and `Link` traits.

pub mod connector;
pub mod error;
pub mod session;

pub use connector::{Connector, Link, WsConnector};
pub use error::TransportError;
pub use session::{
    DEFAULT_URL, Frame, FrameHandler, TOKEN_HEADER, TransportConfig, TransportSession,
};
