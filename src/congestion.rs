use serde::Deserialize;
use serde_json::{Value, json};

use crate::diagnostics::{Diagnostics, record};
use crate::engine::{Engine, Reply};
use crate::error::{EngineError, EngineResult};
use crate::message::Message;
use crate::model::{Environment, Facility, FacilitySpace};
use crate::pipeline::EventContext;
use crate::template::{Placeholders, format_update_time, status_label, substitute};

const SELECT_STAGE: &str = "congestion_select";
const DETAIL_STAGE: &str = "congestion_detail";
/// Postback id carried by the generated selector buttons.
pub const SELECT_POSTBACK_ID: &str = "CONGESTION_SITUATION_SELECT";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailRequest {
    #[serde(default)]
    facility_name: Option<String>,
    #[serde(default)]
    space_name: Option<String>,
    #[serde(default)]
    space_names: Option<Vec<String>>,
}

pub fn facility_name_from_text<'a>(text: &'a str, suffixes: &[String]) -> Option<&'a str> {
    suffixes
        .iter()
        .filter(|suffix| !suffix.is_empty())
        .find_map(|suffix| text.strip_suffix(suffix.as_str()))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// A facility with at least one space. Missing or empty facilities are
/// recorded and yield `Ok(None)`; store failures are left to the caller.
fn find_facility(
    engine: &Engine,
    name: &str,
    stage: &'static str,
    diagnostics: &mut Diagnostics,
) -> EngineResult<Option<Facility>> {
    match engine.collaborators().facilities.facility_by_name(name)? {
        Some(facility) if !facility.space.is_empty() => Ok(Some(facility)),
        _ => {
            record(diagnostics, stage, &EngineError::NotFound(format!("facility {name} with spaces")));
            Ok(None)
        }
    }
}

pub fn select(engine: &Engine, ctx: &EventContext, text: &str, diagnostics: &mut Diagnostics) -> Option<Reply> {
    let config = engine.config();
    let facility_name = facility_name_from_text(text, &config.congestion.suffixes)?;
    let facility = match find_facility(engine, facility_name, SELECT_STAGE, diagnostics) {
        Ok(facility) => facility?,
        Err(err) => {
            record(diagnostics, SELECT_STAGE, &err);
            return None;
        }
    };

    let disabled = facility.select_message.as_ref().is_some_and(|select| select.disabled);
    if ctx.environment == Environment::Production && disabled {
        return None;
    }

    let template = engine.lookup_in(
        &ctx.partition,
        &config.ids.congestion_select_template,
        SELECT_STAGE,
        diagnostics,
    )?;

    match selector_message(engine, &template.params, &facility, facility_name) {
        Ok(message) => Some(Reply::Messages(vec![message])),
        Err(err) => {
            record(diagnostics, SELECT_STAGE, &err);
            None
        }
    }
}

fn selector_message(engine: &Engine, template: &Value, facility: &Facility, facility_name: &str) -> EngineResult<Message> {
    let select_message = facility.select_message.clone().unwrap_or_default();
    let mut bubble = if select_message.custom {
        select_message.param.clone().ok_or_else(|| {
            EngineError::Configuration(format!("{facility_name}: custom selector without `param`"))
        })?
    } else {
        template.clone()
    };
    if !select_message.keeps_authored_buttons() {
        add_space_buttons(&mut bubble, facility);
    }
    let bubble = substitute(&bubble, &Placeholders::new().set("facilityName", facility_name))?;
    Ok(Message::flex(&engine.config().congestion.alt_text, bubble))
}

/// Appends one copy of the first body button per enabled space. The template
/// button stays in place.
fn add_space_buttons(bubble: &mut Value, facility: &Facility) {
    let Some(contents) = bubble.pointer_mut("/body/contents").and_then(Value::as_array_mut) else {
        return;
    };
    let Some(template) = contents
        .first()
        .filter(|first| first.get("type").and_then(Value::as_str) == Some("button"))
        .cloned()
    else {
        return;
    };

    for space in facility.enabled_spaces() {
        let mut button = template.clone();
        if !space.space_name.is_empty()
            && let Some(action) = button.get_mut("action").and_then(Value::as_object_mut)
        {
            let data = json!({
                "facilityName": facility.facility_name,
                "spaceName": space.space_name,
                "id": SELECT_POSTBACK_ID,
            });
            action.insert("label".into(), json!(space.space_name));
            action.insert("displayText".into(), json!(space.space_name));
            action.insert("data".into(), json!(data.to_string()));
        }
        contents.push(button);
    }
}

/// Status bubbles for a congestion postback.
///
/// Decoded payloads without a facility name, and unknown or empty facilities,
/// get no reply. Undecodable payloads and every failure past the facility
/// lookup answer with the "none" content.
pub fn detail(engine: &Engine, ctx: &EventContext, payload: &str, diagnostics: &mut Diagnostics) -> Option<Reply> {
    let request: DetailRequest = match serde_json::from_str(payload) {
        Ok(request) => request,
        Err(err) => {
            record(
                diagnostics,
                DETAIL_STAGE,
                &EngineError::MalformedPayload(format!("congestion postback: {err}")),
            );
            return none_text(engine, ctx, diagnostics);
        }
    };
    let facility_name = request.facility_name.as_deref().filter(|name| !name.is_empty())?;
    let facility = match find_facility(engine, facility_name, DETAIL_STAGE, diagnostics) {
        Ok(facility) => facility?,
        Err(err) => {
            record(diagnostics, DETAIL_STAGE, &err);
            return none_text(engine, ctx, diagnostics);
        }
    };

    let config = engine.config();
    let template = engine.lookup_in(
        &ctx.partition,
        &config.ids.congestion_bubble_template,
        DETAIL_STAGE,
        diagnostics,
    )?;

    let alt_text = &config.congestion.alt_text;
    if let Some(name) = request.space_name.as_deref().filter(|name| !name.is_empty()) {
        let Some(space) = facility.enabled_spaces().find(|space| space.space_name == name) else {
            record(
                diagnostics,
                DETAIL_STAGE,
                &EngineError::NotFound(format!("space {name} in {facility_name}")),
            );
            return none_text(engine, ctx, diagnostics);
        };
        return match space_bubble(&template.params, &facility, space, engine) {
            Ok(bubble) => Some(Reply::Messages(vec![Message::flex(alt_text, bubble)])),
            Err(err) => {
                record(diagnostics, DETAIL_STAGE, &err);
                none_text(engine, ctx, diagnostics)
            }
        };
    }

    let spaces: Vec<&FacilitySpace> = match request.space_names.as_deref() {
        Some(names) if !names.is_empty() => facility
            .enabled_spaces()
            .filter(|space| names.contains(&space.space_name))
            .collect(),
        _ => facility.enabled_spaces().collect(),
    };

    let bubbles: EngineResult<Vec<Value>> = spaces
        .into_iter()
        .map(|space| space_bubble(&template.params, &facility, space, engine))
        .collect();
    match bubbles {
        Ok(bubbles) if !bubbles.is_empty() => Some(Reply::Messages(vec![Message::flex_carousel(alt_text, bubbles)])),
        Ok(_) => {
            record(
                diagnostics,
                DETAIL_STAGE,
                &EngineError::NotFound(format!("enabled spaces in {facility_name}")),
            );
            none_text(engine, ctx, diagnostics)
        }
        Err(err) => {
            record(diagnostics, DETAIL_STAGE, &err);
            none_text(engine, ctx, diagnostics)
        }
    }
}

pub fn space_bubble(template: &Value, facility: &Facility, space: &FacilitySpace, engine: &Engine) -> EngineResult<Value> {
    let (status, color) = status_label(space.status.as_ref(), &engine.config().congestion.labels);
    let last_update = match space.last_update_time {
        Some(seconds) => format_update_time(seconds)?,
        None => String::new(),
    };
    let memo = space.memo.as_deref().filter(|memo| !memo.is_empty()).unwrap_or(" ");

    let placeholders = Placeholders::new()
        .set("facilityName", &facility.facility_name)
        .set("spaceName", &space.space_name)
        .set("status", status)
        .set("color", color)
        .set("lastUpdateTime", last_update)
        .set("memo", memo);
    let mut bubble = substitute(template, &placeholders)?;

    if let Some(image) = space.image.as_deref().filter(|image| !image.is_empty()) {
        let object = bubble
            .as_object_mut()
            .ok_or_else(|| EngineError::MalformedPayload("congestion bubble template is not an object".into()))?;
        object.insert(
            "hero".into(),
            json!({
                "type": "image",
                "url": image,
                "size": "full",
                "aspectRatio": "16:9",
                "aspectMode": "cover",
            }),
        );
    }
    Ok(bubble)
}

fn none_text(engine: &Engine, ctx: &EventContext, diagnostics: &mut Diagnostics) -> Option<Reply> {
    let content = engine.lookup_in(
        &ctx.partition,
        &engine.config().ids.congestion_none_text,
        DETAIL_STAGE,
        diagnostics,
    )?;
    engine.assemble_or_record(ctx, &content, DETAIL_STAGE, diagnostics)
}
