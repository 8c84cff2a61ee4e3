//! NLS speech transcription protocol types.
//!
//! JSON control messages exchanged with the transcription gateway over a
//! WebSocket. This crate is the single source of truth for message shapes,
//! header names, start parameters, and status codes. Audio itself travels as
//! raw binary frames and has no representation here.

pub mod context;
pub mod error;
pub mod message;
pub mod names;
pub mod params;

pub use context::{SdkContext, SdkInfo};
pub use error::{ProtocolError, STATUS_SUCCESS};
pub use message::{
    ControlRequest, ControlResponse, RequestHeader, ResponseHeader, generate_id,
};
pub use names::{Names, RequestName, ResponseName};
pub use params::{
    ResultChangedPayload, SentenceBeginPayload, SentenceEndPayload, StartParams, StashResult,
};
