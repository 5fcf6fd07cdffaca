//! Inbound capture events
//!
//! Producers send messages shaped `{ "type": "...", "payload": ... }`. Only
//! `COLLECT_DATA` is acted upon; everything else is dropped without a trace
//! beyond debug diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::CaptureLimits;

/// The only event tag the store records
pub const COLLECT_DATA: &str = "COLLECT_DATA";

/// A message delivered by a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    /// Event kind tag
    #[serde(rename = "type")]
    pub kind: String,

    /// Producer-defined payload, opaque to the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Why an otherwise recognized event was refused at the boundary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("payload is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// What the store should do with an event
#[derive(Debug, PartialEq)]
pub enum Disposition {
    /// Append this payload to the collection
    Accepted(Value),
    /// Unrecognized tag; not an error
    Ignored(String),
    /// Recognized tag but the payload failed validation
    Rejected(EventError),
}

impl CapturedEvent {
    /// Build a `COLLECT_DATA` event carrying `payload`
    pub fn collect(payload: Value) -> Self {
        Self {
            kind: COLLECT_DATA.to_string(),
            payload: Some(payload),
        }
    }

    /// Build an event with an arbitrary tag and no payload
    pub fn tagged(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    /// Parse one JSON-encoded event
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Decide whether this event is recorded, ignored or refused
    pub fn classify(self, limits: &CaptureLimits) -> Disposition {
        if self.kind != COLLECT_DATA {
            return Disposition::Ignored(self.kind);
        }

        // An omitted payload is recorded as null, same as an explicit one
        let payload = self.payload.unwrap_or(Value::Null);

        let size = payload_size(&payload);
        if size > limits.max_payload_bytes {
            return Disposition::Rejected(EventError::PayloadTooLarge {
                size,
                limit: limits.max_payload_bytes,
            });
        }

        Disposition::Accepted(payload)
    }
}

/// Size of a payload as compact JSON
pub fn payload_size(payload: &Value) -> usize {
    serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0)
}
