//! Start parameters and typed response payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Client → Server
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of the `StartTranscription` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartParams {
    /// Audio codec (e.g., "pcm", "opus")
    pub format: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Emit `TranscriptionResultChanged` while a sentence is in progress
    pub enable_intermediate_result: bool,
    pub enable_punctuation_prediction: bool,
    /// Convert spoken numbers, dates, etc. to written form
    pub enable_inverse_text_normalization: bool,
    /// Additional gateway options passed through untouched
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for StartParams {
    fn default() -> Self {
        Self {
            format: "pcm".into(),
            sample_rate: 16_000,
            enable_intermediate_result: true,
            enable_punctuation_prediction: true,
            enable_inverse_text_normalization: true,
            extra: HashMap::new(),
        }
    }
}

impl StartParams {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server → Client
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of `SentenceBegin`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceBeginPayload {
    /// Sentence number, starting at 1
    pub index: u32,
    /// Milliseconds of audio processed so far
    pub time: u64,
}

/// Payload of `TranscriptionResultChanged`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultChangedPayload {
    pub index: u32,
    pub time: u64,
    pub result: String,
    pub confidence: f64,
    pub words: Vec<Value>,
    pub status: i64,
    pub fixed_result: String,
    pub unfixed_result: String,
}

/// Payload of `SentenceEnd`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceEndPayload {
    pub index: u32,
    pub time: u64,
    pub result: String,
    pub confidence: f64,
    pub words: Vec<Value>,
    pub status: i64,
    pub gender: String,
    /// Start of the sentence, in milliseconds of audio
    pub begin_time: u64,
    pub fixed_result: String,
    pub unfixed_result: String,
    pub stash_result: Option<StashResult>,
    pub audio_extra_info: String,
    pub sentence_id: String,
    pub gender_score: f64,
}

/// Partial result of the sentence that follows a `SentenceEnd`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StashResult {
    pub sentence_id: u32,
    pub begin_time: u64,
    pub text: String,
    pub fixed_text: String,
    pub unfixed_text: String,
    pub current_time: u64,
    pub words: Vec<Value>,
}
