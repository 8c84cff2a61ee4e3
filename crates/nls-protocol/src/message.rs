//! Control request / response envelopes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::SdkContext;
use crate::error::{ProtocolError, STATUS_SUCCESS};
use crate::names::{Names, RequestName, ResponseName};

/// Generate a fresh identifier: a v4 UUID rendered as 32 lowercase hex digits.
///
/// Used both for the per-session task id and the per-request message id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Header of a client → server control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub message_id: String,
    pub task_id: String,
    pub namespace: String,
    pub name: String,
    pub appkey: String,
}

/// Client → server control request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub header: RequestHeader,
    pub payload: Value,
    pub context: SdkContext,
}

impl ControlRequest {
    /// Build a request for `task_id` with a freshly generated message id.
    pub fn new(name: RequestName, task_id: &str, app_key: &str, payload: Value) -> Self {
        Self {
            header: RequestHeader {
                message_id: generate_id(),
                task_id: task_id.to_string(),
                namespace: Names::NAMESPACE.into(),
                name: name.as_str().into(),
                appkey: app_key.to_string(),
            },
            payload,
            context: SdkContext::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Header of a server → client control response.
///
/// The gateway omits fields it has nothing to say about, so every field
/// falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: u32,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub status_text: String,
}

/// Server → client control response. A read-only view of server state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub header: ResponseHeader,
    #[serde(default)]
    pub payload: Value,
}

impl ControlResponse {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The dispatchable name, if the header carries one the session knows.
    pub fn response_name(&self) -> Option<ResponseName> {
        ResponseName::parse(&self.header.name)
    }

    pub fn is_success(&self) -> bool {
        self.header.status == STATUS_SUCCESS
    }

    /// Decode the payload into one of the typed payload structs.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

impl std::fmt::Display for ControlResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.header.name, self.header.status, self.header.status_text
        )
    }
}
