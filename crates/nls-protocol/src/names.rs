//! Control message name constants.
//!
//! Every control frame carries a `namespace`/`name` pair in its header.
//! Requests are client-to-server, responses are server-to-client events
//! with no reply expected.

/// All control message names used by the speech transcriber namespace.
pub struct Names;

impl Names {
    // ── Namespace ───────────────────────────────────────────────────────
    pub const NAMESPACE: &str = "SpeechTranscriber";

    // ── Client → Server ─────────────────────────────────────────────────
    pub const START_TRANSCRIPTION: &str = "StartTranscription";
    pub const CONTROL_TRANSCRIPTION: &str = "ControlTranscription";
    pub const STOP_TRANSCRIPTION: &str = "StopTranscription";

    // ── Server → Client ─────────────────────────────────────────────────
    pub const TRANSCRIPTION_STARTED: &str = "TranscriptionStarted";
    pub const SENTENCE_BEGIN: &str = "SentenceBegin";
    pub const TRANSCRIPTION_RESULT_CHANGED: &str = "TranscriptionResultChanged";
    pub const SENTENCE_END: &str = "SentenceEnd";
    pub const TRANSCRIPTION_COMPLETED: &str = "TranscriptionCompleted";
    pub const TASK_FAILED: &str = "TaskFailed";
}

/// Outbound request names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestName {
    Start,
    Control,
    Stop,
}

impl RequestName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => Names::START_TRANSCRIPTION,
            Self::Control => Names::CONTROL_TRANSCRIPTION,
            Self::Stop => Names::STOP_TRANSCRIPTION,
        }
    }
}

/// Inbound response names the session knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseName {
    TranscriptionStarted,
    SentenceBegin,
    TranscriptionResultChanged,
    SentenceEnd,
    TranscriptionCompleted,
    TaskFailed,
}

impl ResponseName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranscriptionStarted => Names::TRANSCRIPTION_STARTED,
            Self::SentenceBegin => Names::SENTENCE_BEGIN,
            Self::TranscriptionResultChanged => Names::TRANSCRIPTION_RESULT_CHANGED,
            Self::SentenceEnd => Names::SENTENCE_END,
            Self::TranscriptionCompleted => Names::TRANSCRIPTION_COMPLETED,
            Self::TaskFailed => Names::TASK_FAILED,
        }
    }

    /// Map a header `name` to a known response. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            Names::TRANSCRIPTION_STARTED => Some(Self::TranscriptionStarted),
            Names::SENTENCE_BEGIN => Some(Self::SentenceBegin),
            Names::TRANSCRIPTION_RESULT_CHANGED => Some(Self::TranscriptionResultChanged),
            Names::SENTENCE_END => Some(Self::SentenceEnd),
            Names::TRANSCRIPTION_COMPLETED => Some(Self::TranscriptionCompleted),
            Names::TASK_FAILED => Some(Self::TaskFailed),
            _ => None,
        }
    }

    /// Whether this response ends the task (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TranscriptionCompleted | Self::TaskFailed)
    }
}

impl std::fmt::Display for ResponseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
