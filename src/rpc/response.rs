//! Response representation and wire encoding
//!
//! Maps [`RpcError`]s to error payloads and serializes responses with a fixed
//! field order: `jsonrpc`, then `result` or `error`, then `id`.

use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::Value;
use tracing::error;

use crate::errors::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Emitted when a response cannot be serialized.
pub const FALLBACK_INTERNAL_ERROR: &[u8] =
    br#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub outcome: Outcome,
    pub id: Option<Value>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            outcome: Outcome::Result(result),
            id,
        }
    }

    /// Builds an error response, dropping `id` unless the error kind allows echoing it.
    pub fn failure(id: Option<Value>, err: &RpcError) -> Self {
        Self {
            outcome: Outcome::Error(ErrorObject {
                code: err.code(),
                message: err.wire_message().to_string(),
            }),
            id: id.filter(|_| err.echoes_id()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|err| {
            error!(error = %err, "response serialization failed");
            FALLBACK_INTERNAL_ERROR.to_vec()
        })
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        match &self.outcome {
            Outcome::Result(result) => map.serialize_entry("result", result)?,
            Outcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}
