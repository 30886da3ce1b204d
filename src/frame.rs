//! Frame: the universal message type crossing the host boundary.
//!
//! ARCHITECTURE
//! ============
//! Every method call from the host is a request Frame on one per-view
//! channel. The session dispatches by `method` and answers with exactly one
//! terminal frame (`done`, `error`, `cancel` or `not_implemented`) carrying
//! the request id as `parent_id`. Engine-driven notifications flow the other
//! way as `event` frames with no parent.
//!
//! DESIGN
//! ======
//! - Flat data: arguments are a `Map<String, Value>`; a missing argument
//!   bag is the same as an empty one.
//! - Results live under the `result` key so `null`, `bool`, numbers and
//!   maps all travel the same way. Binary results use `bytes`, which is a
//!   standard base64 string on the wire.
//! - Method names are namespaced with `#` ("annotations#update").

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for call results.
pub const FRAME_RESULT: &str = "result";

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Lifecycle position of a frame.
///
/// Every call is `request → done | error | cancel | not_implemented`.
/// Events are standalone and never answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Request,
    Done,
    Error,
    Cancel,
    NotImplemented,
    Event,
}

impl Status {
    /// Terminal statuses answer a request.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error | Status::Cancel | Status::NotImplemented)
    }
}

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    #[serde(default)]
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<i64>,
    pub method: String,
    pub status: Status,
    #[serde(default)]
    pub data: Data,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64",
        deserialize_with = "deserialize_base64"
    )]
    pub bytes: Option<Vec<u8>>,
}

#[allow(clippy::ref_option)]
fn serialize_base64<S>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match bytes {
        Some(bytes) => s.serialize_str(&BASE64.encode(bytes)),
        None => s.serialize_none(),
    }
}

fn deserialize_base64<'de, D>(d: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let encoded: Option<String> = Deserialize::deserialize(d)?;
    encoded.map(|e| BASE64.decode(e).map_err(serde::de::Error::custom)).transpose()
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Entry point for every method call.
    pub fn request(method: impl Into<String>, data: Data) -> Self {
        Self::new(method, Status::Request, data)
    }

    /// Create an outbound event frame. Never answered.
    pub fn event(method: impl Into<String>, data: Data) -> Self {
        Self::new(method, Status::Event, data)
    }

    fn new(method: impl Into<String>, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            view_id: None,
            method: method.into(),
            status,
            data,
            bytes: None,
        }
    }

    /// Create a done response with a `null` result.
    #[must_use]
    pub fn done(&self) -> Self {
        self.done_with(serde_json::Value::Null)
    }

    /// Create a done response carrying one result value.
    #[must_use]
    pub fn done_with(&self, result: impl Into<serde_json::Value>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_RESULT.into(), result.into());
        self.reply(Status::Done, data)
    }

    /// Create a done response carrying a binary payload.
    #[must_use]
    pub fn done_bytes(&self, bytes: Vec<u8>) -> Self {
        let mut frame = self.reply(Status::Done, Data::new());
        frame.bytes = Some(bytes);
        frame
    }

    /// Create an error response from a plain string.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Create a structured error response from a typed error.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), serde_json::Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    /// Answer a request whose work was superseded before it completed.
    #[must_use]
    pub fn cancelled(&self) -> Self {
        self.reply(Status::Cancel, Data::new())
    }

    /// The "not implemented" sentinel for unknown methods.
    #[must_use]
    pub fn not_implemented(&self) -> Self {
        self.reply(Status::NotImplemented, Data::new())
    }

    /// Build a reply frame. Inherits `view_id` and `method`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            view_id: self.view_id,
            method: self.method.clone(),
            status,
            data,
            bytes: None,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_view_id(mut self, view_id: i64) -> Self {
        self.view_id = Some(view_id);
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// The `result` value of a done frame, if any.
    #[must_use]
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.data.get(FRAME_RESULT)
    }
}

// =============================================================================
// ROUTING
// =============================================================================

impl Frame {
    /// Extract the method namespace (everything before the first '#').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.method.split_once('#') else {
            return &self.method;
        };
        prefix
    }

    /// Extract the operation (everything after the first '#').
    #[must_use]
    pub fn op(&self) -> &str {
        self.method.split_once('#').map_or("", |(_, op)| op)
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
