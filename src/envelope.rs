//! In-band result shape returned across the caller boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text carried by every call made while the remote index is not ready.
pub const NOT_AVAILABLE: &str = "remote vocabulary index is not available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }

    pub fn unavailable() -> Self {
        Self::failed(NOT_AVAILABLE)
    }

    pub fn is_unavailable(&self) -> bool {
        !self.success && self.error.as_deref() == Some(NOT_AVAILABLE)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope { success: self.success, data: self.data.map(f), error: self.error }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Erase the payload type for transport.
    pub fn into_json(self) -> Envelope<Value> {
        match self.data.map(serde_json::to_value).transpose() {
            Ok(data) => Envelope { success: self.success, data, error: self.error },
            Err(e) => Envelope::failed(format!("cannot encode result: {e}")),
        }
    }
}
