use serde_json::Value;
use uuid::Uuid;

use crate::diagnostics::{Diagnostics, record};
use crate::engine::{Engine, Reply};
use crate::error::{EngineError, EngineResult};
use crate::message::Message;
use crate::model::HandoffRecord;
use crate::pipeline::EventContext;

const STAGE: &str = "chat_mode_start";

/// Opens a hand-off for the user unless one is already open. Any failure
/// means no reply.
pub fn start(engine: &Engine, ctx: &EventContext, payload: &str, diagnostics: &mut Diagnostics) -> Option<Reply> {
    match try_start(engine, ctx, payload) {
        Ok(text) => Some(Reply::Messages(vec![Message::text(text)])),
        Err(err) => {
            record(diagnostics, STAGE, &err);
            None
        }
    }
}

fn try_start(engine: &Engine, ctx: &EventContext, payload: &str) -> EngineResult<String> {
    let request: Value = serde_json::from_str(payload)
        .map_err(|err| EngineError::MalformedPayload(format!("chat mode postback: {err}")))?;
    let request = request
        .as_object()
        .filter(|object| !object.is_empty())
        .ok_or_else(|| EngineError::MalformedPayload("chat mode postback is not a JSON object".into()))?;
    let user_id = ctx
        .user_id
        .as_deref()
        .ok_or_else(|| EngineError::MalformedPayload("chat mode start without a user".into()))?;

    let texts = &engine.config().chat_mode;
    let handoffs = &engine.collaborators().handoffs;
    if !handoffs.open_handoffs(user_id)?.is_empty() {
        return Ok(texts.already_started.clone());
    }

    let handoff = HandoffRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: request.get("name").and_then(Value::as_str).map(str::to_string),
        from_date: ctx.timestamp_ms / 1000,
        to_date: None,
    };
    tracing::info!(user = user_id, handoff = %handoff.id, "opening operator hand-off");
    handoffs.upsert(handoff)?;
    Ok(texts.started.clone())
}
