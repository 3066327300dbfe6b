//! Shared wire envelope for API responses.

use serde::{Deserialize, Serialize};

/// The flat status/message envelope every endpoint answers with. `data`
/// carries endpoint-specific payloads (tokens, greetings) and is omitted when
/// empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl GenericResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            data: None,
        }
    }
}
