//! Frame parsing for the live feed.
//!
//! Each inbound text frame is either one JSON-encoded `FeedMessage` or a
//! system notice (`{"type": "system", "message": "..."}`) sent by the relay
//! when a client connects.

use crate::error::{FeedError, FeedResult};
use desk_core::FeedMessage;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Parsed content of one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Message(FeedMessage),
    /// Relay notice; carries no feed content.
    System(String),
}

/// Frame counters.
#[derive(Debug, Default)]
pub struct ParseStats {
    pub messages: AtomicU64,
    pub system: AtomicU64,
    pub rejected: AtomicU64,
}

impl ParseStats {
    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn system(&self) -> u64 {
        self.system.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Frame parser.
#[derive(Debug, Default)]
pub struct FrameParser {
    stats: ParseStats,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Parse one text frame.
    pub fn parse(&self, text: &str) -> FeedResult<FeedEvent> {
        let result = parse_frame(text);
        let counter = match &result {
            Ok(FeedEvent::Message(_)) => &self.stats.messages,
            Ok(FeedEvent::System(_)) => &self.stats.system,
            Err(_) => &self.stats.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }
}

fn parse_frame(text: &str) -> FeedResult<FeedEvent> {
    let value: Value = serde_json::from_str(text)?;

    let Some(object) = value.as_object() else {
        return Err(FeedError::ParseError(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    };

    if object.get("type").and_then(Value::as_str) == Some("system") {
        let notice = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(FeedEvent::System(notice));
    }

    let message: FeedMessage = serde_json::from_value(value)?;
    Ok(FeedEvent::Message(message))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
