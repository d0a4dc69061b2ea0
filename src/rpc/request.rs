//! Request decoding
//!
//! Turns a framed payload into a [`Request`]. Decoding is all-or-nothing.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::RpcError;

/// Method arguments, either by name or by position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Params {
    Named(Map<String, Value>),
    Positional(Vec<Value>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Named(Map::new())
    }
}

impl Params {
    /// Looks up an argument by name, or by index for positional params.
    pub fn get(&self, name: &str, position: usize) -> Option<&Value> {
        match self {
            Self::Named(map) => map.get(name),
            Self::Positional(items) => items.get(position),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Named(map) => map.len(),
            Self::Positional(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Named(map) => Value::Object(map.clone()),
            Self::Positional(items) => Value::Array(items.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub method: String,
    pub params: Params,
    /// Echoed verbatim; never inspected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Request {
    pub fn decode(payload: &[u8]) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|err| RpcError::parse(format!("payload is not valid JSON: {err}")))?;

        let Value::Object(mut object) = value else {
            return Err(RpcError::parse("payload is not a JSON object"));
        };

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            Some(Value::String(_)) => {
                return Err(RpcError::invalid_request("method must not be empty"))
            }
            Some(_) => return Err(RpcError::invalid_request("method must be a string")),
            None => return Err(RpcError::invalid_request("method is required")),
        };

        let params = match object.remove("params") {
            None => Params::default(),
            Some(Value::Object(map)) => Params::Named(map),
            Some(Value::Array(items)) => Params::Positional(items),
            Some(_) => {
                return Err(RpcError::invalid_request(
                    "params must be an object or an array",
                ))
            }
        };

        Ok(Self {
            method,
            params,
            id: object.remove("id"),
        })
    }
}
