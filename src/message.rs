use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{EngineError, EngineResult};
use crate::model::ContentRecord;

pub const MAX_CAROUSEL_BUBBLES: usize = 10;
pub const MAX_TEMPLATE_COLUMNS: usize = 10;
pub const MAX_BUTTON_ACTIONS: usize = 4;
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;

/// A finished outbound message, ready to hand to the transmission client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Value);

impl Message {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self(json!({"type": "text", "text": text.into()}))
    }

    pub fn flex(alt_text: &str, contents: Value) -> Self {
        Self(json!({"type": "flex", "altText": alt_text, "contents": contents}))
    }

    /// A flex carousel; bubbles beyond the platform limit are dropped.
    pub fn flex_carousel(alt_text: &str, bubbles: Vec<Value>) -> Self {
        let bubbles: Vec<Value> = bubbles.into_iter().take(MAX_CAROUSEL_BUBBLES).collect();
        Self::flex(alt_text, json!({"type": "carousel", "contents": bubbles}))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn message_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn attach_quick_reply(&mut self, quick_reply: Value) {
        if let Some(object) = self.0.as_object_mut() {
            object.insert("quickReply".to_string(), quick_reply);
        }
    }
}

fn alt_text<'a>(record: &'a ContentRecord, fallback: &'a str) -> &'a str {
    record
        .name_lbd
        .as_deref()
        .filter(|label| record.data_type.takes_alt_text() && !label.is_empty())
        .unwrap_or(fallback)
}

fn required_str<'a>(record: &ContentRecord, value: &'a Value, key: &str) -> EngineResult<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::malformed_content(&record.data_id, format!("missing `{key}`")))
}

/// Actions from either an `actions` array or the flattened
/// `actionCount` + `actions.N` form the authoring tool saves.
fn actions(params: &Value) -> Vec<Value> {
    if let Some(array) = params.get("actions").and_then(Value::as_array) {
        return array.clone();
    }
    let count = params.get("actionCount").and_then(Value::as_u64).unwrap_or(0);
    (0..count)
        .filter_map(|index| params.get(format!("actions.{index}")).cloned())
        .collect()
}

fn copy_optional(source: &Value, target: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if let Some(value) = source.get(*key).filter(|value| !value.is_null()) {
            target.insert((*key).to_string(), value.clone());
        }
    }
}

pub fn text(record: &ContentRecord) -> EngineResult<Message> {
    let text = required_str(record, &record.params, "text")?;
    Ok(Message::text(text))
}

pub fn buttons(record: &ContentRecord) -> EngineResult<Message> {
    let params = &record.params;
    let text = required_str(record, params, "text")?;
    let actions: Vec<Value> = actions(params).into_iter().take(MAX_BUTTON_ACTIONS).collect();
    if actions.is_empty() {
        return Err(EngineError::malformed_content(&record.data_id, "buttons without actions"));
    }

    let mut template = Map::new();
    template.insert("type".into(), json!("buttons"));
    copy_optional(params, &mut template, &["thumbnailImageUrl", "imageAspectRatio", "imageSize", "title", "defaultAction"]);
    template.insert("text".into(), json!(text));
    template.insert("actions".into(), Value::Array(actions));

    Ok(Message(json!({
        "type": "template",
        "altText": alt_text(record, text),
        "template": template,
    })))
}

pub fn confirm(record: &ContentRecord) -> EngineResult<Message> {
    let params = &record.params;
    let text = required_str(record, params, "text")?;
    let actions = actions(params);
    if actions.len() != 2 {
        return Err(EngineError::malformed_content(
            &record.data_id,
            format!("confirm needs exactly 2 actions, found {}", actions.len()),
        ));
    }
    Ok(Message(json!({
        "type": "template",
        "altText": alt_text(record, text),
        "template": {"type": "confirm", "text": text, "actions": actions},
    })))
}

pub fn carousel(record: &ContentRecord) -> EngineResult<Message> {
    let columns = record
        .params
        .get("columns")
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::malformed_content(&record.data_id, "missing `columns`"))?;

    let mut rendered = Vec::new();
    for column in columns.iter().take(MAX_TEMPLATE_COLUMNS) {
        let text = required_str(record, column, "text")?;
        let mut out = Map::new();
        copy_optional(column, &mut out, &["thumbnailImageUrl", "imageBackgroundColor", "title", "defaultAction"]);
        out.insert("text".into(), json!(text));
        out.insert(
            "actions".into(),
            Value::Array(actions(column).into_iter().take(3).collect()),
        );
        rendered.push(Value::Object(out));
    }
    if rendered.is_empty() {
        return Err(EngineError::malformed_content(&record.data_id, "carousel without columns"));
    }

    Ok(Message(json!({
        "type": "template",
        "altText": alt_text(record, "Carousel"),
        "template": {"type": "carousel", "columns": rendered},
    })))
}

pub fn imagemap(record: &ContentRecord) -> EngineResult<Message> {
    let params = &record.params;
    let base_url = required_str(record, params, "baseUrl")?;
    let base_size = params
        .get("baseSize")
        .filter(|size| size.is_object())
        .ok_or_else(|| EngineError::malformed_content(&record.data_id, "missing `baseSize`"))?;

    let mut out = Map::new();
    out.insert("type".into(), json!("imagemap"));
    out.insert("baseUrl".into(), json!(base_url));
    out.insert("altText".into(), json!(alt_text(record, "Imagemap")));
    out.insert("baseSize".into(), base_size.clone());
    out.insert("actions".into(), Value::Array(actions(params)));
    copy_optional(params, &mut out, &["video"]);
    Ok(Message(Value::Object(out)))
}

pub fn bubble_flex(record: &ContentRecord) -> EngineResult<Message> {
    let contents = bubble_contents(record)?;
    Ok(Message::flex(alt_text(record, "Flex message"), contents))
}

pub fn bubble_contents(record: &ContentRecord) -> EngineResult<Value> {
    let mut contents = record.params.clone();
    let object = contents
        .as_object_mut()
        .ok_or_else(|| EngineError::malformed_content(&record.data_id, "bubble params must be an object"))?;
    object.entry("type").or_insert_with(|| json!("bubble"));
    Ok(contents)
}

pub fn carousel_bubble_ids(record: &ContentRecord) -> EngineResult<Vec<String>> {
    let ids = record
        .params
        .get("bubbleParam")
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::malformed_content(&record.data_id, "missing `bubbleParam`"))?;
    Ok(ids
        .iter()
        .filter_map(Value::as_str)
        .take(MAX_CAROUSEL_BUBBLES)
        .map(str::to_string)
        .collect())
}

pub fn carousel_alt_text(record: &ContentRecord) -> &str {
    alt_text(record, "Carousel")
}

/// Normalizes an authored quick-reply block into `{"items": [...]}`.
///
/// Accepts `{"items": [...]}` or a bare array; bare actions are wrapped as
/// `{"type": "action", "action": ...}`.
pub fn quick_reply(block: &Value) -> Option<Value> {
    let items = block
        .get("items")
        .and_then(Value::as_array)
        .or_else(|| block.as_array())?;
    let items: Vec<Value> = items
        .iter()
        .filter(|item| item.is_object())
        .take(MAX_QUICK_REPLY_ITEMS)
        .map(|item| {
            if item.get("type").and_then(Value::as_str) == Some("action") {
                item.clone()
            } else {
                json!({"type": "action", "action": item})
            }
        })
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(json!({"items": items}))
    }
}
