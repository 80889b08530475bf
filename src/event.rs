use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    Text(String),
    Postback(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: Option<String>,
    pub kind: EventKind,
    pub timestamp_ms: i64,
}

impl Event {
    pub fn text(user_id: Option<&str>, text: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            kind: EventKind::Text(text.into()),
            timestamp_ms,
        }
    }

    pub fn postback(user_id: Option<&str>, data: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            kind: EventKind::Postback(data.into()),
            timestamp_ms,
        }
    }

    pub fn payload(&self) -> &str {
        match &self.kind {
            EventKind::Text(text) | EventKind::Postback(text) => text,
        }
    }

    pub fn is_postback(&self) -> bool {
        matches!(self.kind, EventKind::Postback(_))
    }

    /// Classifies one webhook event object. Events that are neither text
    /// messages nor postbacks yield `None`.
    pub fn from_webhook(value: &Value) -> Option<Self> {
        let user_id = value
            .pointer("/source/userId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let timestamp_ms = value.get("timestamp").and_then(Value::as_i64).unwrap_or_default();

        let kind = match value.get("type").and_then(Value::as_str)? {
            "message" => {
                let message = value.get("message")?;
                if message.get("type").and_then(Value::as_str) != Some("text") {
                    return None;
                }
                EventKind::Text(message.get("text")?.as_str()?.to_string())
            }
            "postback" => EventKind::Postback(value.pointer("/postback/data")?.as_str()?.to_string()),
            _ => return None,
        };

        Some(Self {
            user_id,
            kind,
            timestamp_ms,
        })
    }

    /// Classifies every event in a webhook body (`{"events": [...]}`), or a
    /// single bare event object.
    pub fn all_from_webhook(body: &Value) -> Vec<Self> {
        match body.get("events").and_then(Value::as_array) {
            Some(events) => events.iter().filter_map(Self::from_webhook).collect(),
            None => Self::from_webhook(body).into_iter().collect(),
        }
    }
}
