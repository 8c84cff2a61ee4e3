//! SDK context: client identification attached to every control request.
//!
//! The gateway uses the `sdk` block for diagnostics only. It is sent verbatim
//! in the `context` field of [`ControlRequest`](crate::ControlRequest).

use serde::{Deserialize, Serialize};

/// The `context` object of a control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkContext {
    pub sdk: SdkInfo,
}

/// Client SDK identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
    pub name: String,
    pub version: String,
    pub language: String,
}

impl Default for SdkContext {
    fn default() -> Self {
        Self {
            sdk: SdkInfo {
                name: "nls-rust-sdk".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                language: "rust".into(),
            },
        }
    }
}
