//! Security telemetry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest string kept in an event's value preview.
const PREVIEW_CHARS: usize = 200;

/// Kind of rejected input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    /// Tree nested deeper than allowed.
    MaxDepthExceeded,
    /// Group with too many children.
    TooManyConditions,
    /// Raw passthrough text matched a dangerous pattern.
    DangerousSql,
    /// List operand longer than allowed.
    TooManyInValues,
    /// String operand longer than allowed.
    StringTooLong,
}

impl SecurityEventType {
    /// Stable tag of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            SecurityEventType::TooManyConditions => "TOO_MANY_CONDITIONS",
            SecurityEventType::DangerousSql => "DANGEROUS_SQL",
            SecurityEventType::TooManyInValues => "TOO_MANY_IN_VALUES",
            SecurityEventType::StringTooLong => "STRING_TOO_LONG",
        }
    }
}

impl std::fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected, adversarial-looking input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    /// Condition the event was raised for.
    pub condition_id: String,
    /// Human-readable description.
    pub details: String,
    /// Wall-clock time of the rejection.
    pub timestamp: DateTime<Utc>,
    /// Truncated preview of the offending value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl SecurityEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        event_type: SecurityEventType,
        condition_id: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            condition_id: condition_id.into(),
            details: details.into(),
            timestamp: Utc::now(),
            value: None,
        }
    }

    /// Attach a preview of the offending value.
    pub fn with_value(mut self, value: &Value) -> Self {
        self.value = Some(preview(value));
        self
    }
}

fn preview(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > PREVIEW_CHARS => {
            let mut truncated: String = s.chars().take(PREVIEW_CHARS).collect();
            truncated.push_str("...");
            Value::String(truncated)
        }
        Value::Array(items) => Value::String(format!("[{} values]", items.len())),
        other => other.clone(),
    }
}
