//! NLS streaming transcription session.
//!
//! Drives one speech transcription task over the gateway's WebSocket:
//! sends `StartTranscription`, streams binary audio, dispatches the
//! gateway's control messages into typed events, and tears the connection
//! down on completion, failure, disconnect, or local shutdown.
//!
//! ```no_run
//! # async fn run() -> Result<(), nls_transcriber::TranscriberError> {
//! use nls_transcriber::{StartOptions, Transcriber, TranscriberConfig};
//!
//! let transcriber = Transcriber::new(TranscriberConfig::new("app-key", "token"))?;
//! let mut events = transcriber.subscribe();
//! transcriber.start(StartOptions::default()).await?;
//! transcriber.send_audio(vec![0u8; 3200]);
//! let completed = transcriber.close(serde_json::json!({})).await?;
//! # let _ = (events.try_recv(), completed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod session;

pub use config::{DEFAULT_LIVENESS_INTERVAL, StartOptions, TranscriberConfig};
pub use error::TranscriberError;
pub use events::{EventBus, EventKind, TranscriptionEvent};
pub use session::{SessionState, Transcriber};

pub use nls_protocol::{ControlResponse, StartParams};
