use std::collections::BTreeMap;

use crate::chat_mode;
use crate::congestion;
use crate::diagnostics::{Diagnostics, record};
use crate::engine::{Engine, Reply};
use crate::event::{Event, EventKind};
use crate::fallback;
use crate::locale::{ScenarioPartition, resolve_partition, resolve_text_mapping};
use crate::model::Environment;
use crate::publicity;

const CONGESTION_MARKER: &str = "CONGESTION_SITUATION";
const CHAT_MODE_MARKER: &str = "CHAT_MODE_START";

/// Everything resolved once per event and threaded through the stages.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub user_id: Option<String>,
    pub partition: ScenarioPartition,
    pub text_mapping: BTreeMap<String, String>,
    pub locale: Option<String>,
    pub environment: Environment,
    pub timestamp_ms: i64,
}

impl EventContext {
    pub fn establish(engine: &Engine, event: &Event, diagnostics: &mut Diagnostics) -> Self {
        Self::build(engine, event.user_id.as_deref(), event.timestamp_ms, diagnostics)
    }

    /// Context for operations not driven by a user event.
    pub fn without_user(engine: &Engine, diagnostics: &mut Diagnostics) -> Self {
        Self::build(engine, None, 0, diagnostics)
    }

    fn build(engine: &Engine, user_id: Option<&str>, timestamp_ms: i64, diagnostics: &mut Diagnostics) -> Self {
        let collaborators = engine.collaborators();
        let config = engine.config();

        let settings = collaborators.settings.settings().unwrap_or_else(|err| {
            record(diagnostics, "context", &err);
            None
        });
        let user_locale = match user_id {
            Some(user_id) => collaborators.sessions.get_locale(user_id).unwrap_or_else(|err| {
                record(diagnostics, "context", &err);
                None
            }),
            None => None,
        };

        let partition = resolve_partition(
            settings.as_ref(),
            config.environment,
            user_locale.as_deref(),
            config.default_locale.as_deref(),
            diagnostics,
        );
        let text_mapping = resolve_text_mapping(collaborators.content.as_ref(), &partition, diagnostics);

        Self {
            user_id: user_id.map(str::to_string),
            locale: partition.locale.clone(),
            partition,
            text_mapping,
            environment: config.environment,
            timestamp_ms,
        }
    }
}

/// One step of the default resolution chain.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_resolve(
        &self,
        engine: &Engine,
        ctx: &EventContext,
        event: &Event,
        diagnostics: &mut Diagnostics,
    ) -> Option<Reply>;
}

pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(PostbackContent),
        Box::new(CongestionDetail),
        Box::new(ChatModeStart),
        Box::new(TextMapping),
        Box::new(PublicityPaper),
        Box::new(CongestionSelect),
        Box::new(FuzzyFallback),
    ]
}

fn postback(event: &Event) -> Option<&str> {
    match &event.kind {
        EventKind::Postback(data) => Some(data),
        EventKind::Text(_) => None,
    }
}

fn text(event: &Event) -> Option<&str> {
    match &event.kind {
        EventKind::Text(text) => Some(text),
        EventKind::Postback(_) => None,
    }
}

pub struct PostbackContent;

impl Stage for PostbackContent {
    fn name(&self) -> &'static str {
        "postback_content"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        let data = postback(event)?;
        engine.reply_for_id(ctx, data, self.name(), diagnostics)
    }
}

pub struct CongestionDetail;

impl Stage for CongestionDetail {
    fn name(&self) -> &'static str {
        "congestion_detail"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        let data = postback(event).filter(|data| data.contains(CONGESTION_MARKER))?;
        congestion::detail(engine, ctx, data, diagnostics)
    }
}

pub struct ChatModeStart;

impl Stage for ChatModeStart {
    fn name(&self) -> &'static str {
        "chat_mode_start"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        let data = postback(event).filter(|data| data.contains(CHAT_MODE_MARKER))?;
        chat_mode::start(engine, ctx, data, diagnostics)
    }
}

pub struct TextMapping;

impl Stage for TextMapping {
    fn name(&self) -> &'static str {
        "text_mapping"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        let target = ctx.text_mapping.get(text(event)?)?;
        engine.reply_for_id(ctx, target, self.name(), diagnostics)
    }
}

pub struct PublicityPaper;

impl Stage for PublicityPaper {
    fn name(&self) -> &'static str {
        "publicity_paper"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        publicity::reply(engine, ctx, text(event)?, diagnostics)
    }
}

pub struct CongestionSelect;

impl Stage for CongestionSelect {
    fn name(&self) -> &'static str {
        "congestion_select"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        congestion::select(engine, ctx, text(event)?, diagnostics)
    }
}

pub struct FuzzyFallback;

impl Stage for FuzzyFallback {
    fn name(&self) -> &'static str {
        "fuzzy_fallback"
    }

    fn try_resolve(&self, engine: &Engine, ctx: &EventContext, event: &Event, diagnostics: &mut Diagnostics) -> Option<Reply> {
        fallback::reply(engine, ctx, text(event)?, diagnostics)
    }
}
