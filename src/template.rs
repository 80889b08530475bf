use std::collections::BTreeMap;

use serde_json::Value;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::config::StatusLabels;
use crate::error::{EngineError, EngineResult};
use crate::model::SpaceStatus;

#[derive(Debug, Clone, Default)]
pub struct Placeholders(BTreeMap<String, String>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Replaces every `${name}` token in `template` and re-parses the result.
///
/// Replacement text is JSON-escaped before insertion, so quotes or
/// backslashes in live data cannot break the document. Tokens without a
/// supplied value are left in place.
pub fn substitute(template: &Value, placeholders: &Placeholders) -> EngineResult<Value> {
    if placeholders.is_empty() {
        return Ok(template.clone());
    }

    let mut serialized = serde_json::to_string(template)
        .map_err(|err| EngineError::MalformedPayload(format!("template serialization: {err}")))?;
    for (name, value) in &placeholders.0 {
        let token = format!("${{{name}}}");
        if serialized.contains(&token) {
            serialized = serialized.replace(&token, &escape_fragment(value));
        }
    }

    serde_json::from_str(&serialized)
        .map_err(|err| EngineError::MalformedPayload(format!("substituted template: {err}")))
}

fn escape_fragment(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Placeholder names still present anywhere in `value`, sorted and unique.
pub fn placeholders_in(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_placeholders(value, &mut found);
    found.sort();
    found.dedup();
    found
}

fn collect_placeholders(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(text) => scan_tokens(text, found),
        Value::Array(items) => items.iter().for_each(|item| collect_placeholders(item, found)),
        Value::Object(map) => {
            for (key, item) in map {
                scan_tokens(key, found);
                collect_placeholders(item, found);
            }
        }
        _ => {}
    }
}

fn scan_tokens(text: &str, found: &mut Vec<String>) {
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return;
        };
        let name = &after[..end];
        if !name.is_empty() {
            found.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
}

/// Label and color for a space status. Codes 0 to 3 are fixed; an override
/// object needs both a name and a color; anything else is "unknown" in black.
pub fn status_label(status: Option<&SpaceStatus>, labels: &StatusLabels) -> (String, String) {
    let fixed = |label: &str, color: &str| (label.to_string(), color.to_string());
    match status {
        Some(SpaceStatus::Code(0)) => fixed(&labels.off_hours, "#9E9E9E"),
        Some(SpaceStatus::Code(1)) => fixed(&labels.open, "#07B53B"),
        Some(SpaceStatus::Code(2)) => fixed(&labels.moderate, "#FF9800"),
        Some(SpaceStatus::Code(3)) => fixed(&labels.congested, "#F44336"),
        Some(SpaceStatus::Named {
            name: Some(name),
            color: Some(color),
        }) if !name.is_empty() && !color.is_empty() => (name.clone(), color.clone()),
        _ => fixed(&labels.unknown, "#000000"),
    }
}

/// Formats epoch seconds in UTC+9 as `YYYY-MM-DD HH:MM`; seconds are dropped.
pub fn format_update_time(epoch_seconds: f64) -> EngineResult<String> {
    let offset = UtcOffset::from_hms(9, 0, 0)
        .map_err(|err| EngineError::Configuration(format!("utc offset: {err}")))?;
    let timestamp = OffsetDateTime::from_unix_timestamp(epoch_seconds.trunc() as i64)
        .map_err(|err| EngineError::MalformedPayload(format!("lastUpdateTime {epoch_seconds}: {err}")))?;
    timestamp
        .to_offset(offset)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .map_err(|err| EngineError::MalformedPayload(format!("lastUpdateTime {epoch_seconds}: {err}")))
}
