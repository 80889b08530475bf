use serde_json::Value;

use crate::config::ENVIRONMENT_VAR;
use crate::diagnostics::{Diagnostics, record};
use crate::engine::{ApiDelegation, Engine, Reply};
use crate::error::{EngineError, EngineResult};
use crate::locale::ScenarioPartition;
use crate::message::{self, Message};
use crate::model::{ContentRecord, DataType, Environment};
use crate::pipeline::EventContext;

const STAGE: &str = "assemble";
pub const MAX_COMPOSITE_CHILDREN: usize = 5;

pub fn assemble(
    engine: &Engine,
    ctx: &EventContext,
    content: &ContentRecord,
    diagnostics: &mut Diagnostics,
) -> EngineResult<Reply> {
    let mut messages = match &content.data_type {
        DataType::ApiCall => return api_delegation(content, ctx.environment).map(Reply::Delegate),
        DataType::CompositeMessage => composite(engine, &ctx.partition, content, diagnostics),
        DataType::TextMapping | DataType::Other(_) => {
            return Err(EngineError::Configuration(format!(
                "no generator for `{}` ({})",
                content.data_type, content.data_id
            )));
        }
        _ => match render(engine, &ctx.partition, content, diagnostics)? {
            Some(rendered) => vec![rendered],
            None => Vec::new(),
        },
    };

    if messages.is_empty() {
        return Err(EngineError::malformed_content(&content.data_id, "produced no messages"));
    }
    if let Some(block) = &content.quick_reply
        && let Some(quick_reply) = message::quick_reply(block)
        && let Some(last) = messages.last_mut()
    {
        last.attach_quick_reply(quick_reply);
    }
    Ok(Reply::Messages(messages))
}

/// Renders a single record; `None` for types that have no message generator.
pub fn render(
    engine: &Engine,
    partition: &ScenarioPartition,
    content: &ContentRecord,
    diagnostics: &mut Diagnostics,
) -> EngineResult<Option<Message>> {
    let rendered = match &content.data_type {
        DataType::Text => message::text(content)?,
        DataType::Buttons => message::buttons(content)?,
        DataType::Confirm => message::confirm(content)?,
        DataType::Carousel => message::carousel(content)?,
        DataType::Imagemap => message::imagemap(content)?,
        DataType::BubbleFlex => message::bubble_flex(content)?,
        DataType::CarouselFlex => flex_carousel(engine, partition, content, diagnostics)?,
        DataType::CompositeMessage | DataType::ApiCall | DataType::TextMapping | DataType::Other(_) => {
            return Ok(None);
        }
    };
    Ok(Some(rendered))
}

fn composite(
    engine: &Engine,
    partition: &ScenarioPartition,
    content: &ContentRecord,
    diagnostics: &mut Diagnostics,
) -> Vec<Message> {
    let mut messages = Vec::new();
    for child_id in content.messages.iter().take(MAX_COMPOSITE_CHILDREN) {
        let Some(child) = engine.lookup_in(partition, child_id, STAGE, diagnostics) else {
            continue;
        };
        match render(engine, partition, &child, diagnostics) {
            Ok(Some(rendered)) => messages.push(rendered),
            Ok(None) => {}
            Err(err) => record(diagnostics, STAGE, &err),
        }
    }
    messages
}

/// A flex carousel from the bubble records listed in `params.bubbleParam`.
/// Missing or broken bubbles are skipped.
pub fn flex_carousel(
    engine: &Engine,
    partition: &ScenarioPartition,
    content: &ContentRecord,
    diagnostics: &mut Diagnostics,
) -> EngineResult<Message> {
    let mut bubbles = Vec::new();
    for bubble_id in message::carousel_bubble_ids(content)? {
        let Some(bubble) = engine.lookup_in(partition, &bubble_id, STAGE, diagnostics) else {
            continue;
        };
        match message::bubble_contents(&bubble) {
            Ok(contents) => bubbles.push(contents),
            Err(err) => record(diagnostics, STAGE, &err),
        }
    }
    if bubbles.is_empty() {
        return Err(EngineError::malformed_content(&content.data_id, "carousel has no bubbles"));
    }
    Ok(Message::flex_carousel(message::carousel_alt_text(content), bubbles))
}

fn api_delegation(content: &ContentRecord, environment: Environment) -> EngineResult<ApiDelegation> {
    let function = content
        .function
        .clone()
        .filter(|function| !function.is_empty())
        .ok_or_else(|| EngineError::malformed_content(&content.data_id, "apiCall without `function`"))?;
    let mut params = content.parameters.clone();
    params.insert(ENVIRONMENT_VAR.to_string(), Value::String(environment.as_str().to_string()));
    Ok(ApiDelegation { function, params })
}
