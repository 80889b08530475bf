use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info_span};

use crate::assemble::assemble;
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostics, record};
use crate::error::{EngineError, EngineResult};
use crate::event::Event;
use crate::locale::ScenarioPartition;
use crate::message::Message;
use crate::model::ContentRecord;
use crate::pipeline::{EventContext, Stage, default_stages};
use crate::store::{
    ContentStore, FacilityStore, HandoffLog, MemoryStore, NoSpecialFlow, SessionStore, SettingsStore,
    SpecialFlowHandler,
};

const SPECIAL_FLOW_STAGE: &str = "special_flow";

#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub facilities: Arc<dyn FacilityStore>,
    pub handoffs: Arc<dyn HandoffLog>,
    pub special_flow: Arc<dyn SpecialFlowHandler>,
}

impl Collaborators {
    /// Every storage role served by one in-memory store, no special flows.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            content: store.clone(),
            settings: store.clone(),
            sessions: store.clone(),
            facilities: store.clone(),
            handoffs: store,
            special_flow: Arc::new(NoSpecialFlow),
        }
    }

    pub fn with_special_flow(mut self, handler: Arc<dyn SpecialFlowHandler>) -> Self {
        self.special_flow = handler;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiDelegation {
    pub function: String,
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Messages(Vec<Message>),
    Delegate(ApiDelegation),
}

impl Reply {
    pub fn messages(&self) -> &[Message] {
        match self {
            Reply::Messages(messages) => messages,
            Reply::Delegate(_) => &[],
        }
    }
}

/// Outcome of one event: the reply (if any) plus everything swallowed on the way.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub partition: String,
    pub handled_by: Option<&'static str>,
    pub reply: Option<Reply>,
    pub diagnostics: Diagnostics,
}

impl Resolution {
    pub fn messages(&self) -> &[Message] {
        self.reply.as_ref().map(Reply::messages).unwrap_or_default()
    }
}

pub struct Engine {
    config: EngineConfig,
    collaborators: Collaborators,
    stages: Vec<Box<dyn Stage>>,
}

impl Engine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self::with_stages(config, collaborators, default_stages())
    }

    pub fn with_stages(config: EngineConfig, collaborators: Collaborators, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            config,
            collaborators,
            stages,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn handle_event(&self, event: &Event) -> Resolution {
        let span = info_span!(
            "resolve",
            user = event.user_id.as_deref().unwrap_or("-"),
            postback = event.is_postback()
        );
        let _guard = span.enter();

        let mut diagnostics = Vec::new();
        let ctx = EventContext::establish(self, event, &mut diagnostics);
        let partition = ctx.partition.key();

        match self.collaborators.special_flow.handle(event, &ctx) {
            Ok(Some(messages)) if !messages.is_empty() => {
                debug!(count = messages.len(), "special flow handled event");
                return Resolution {
                    partition,
                    handled_by: Some(SPECIAL_FLOW_STAGE),
                    reply: Some(Reply::Messages(messages)),
                    diagnostics,
                };
            }
            Ok(_) => {}
            Err(err) => record(&mut diagnostics, SPECIAL_FLOW_STAGE, &err),
        }

        for stage in &self.stages {
            let Some(reply) = stage.try_resolve(self, &ctx, event, &mut diagnostics) else {
                continue;
            };
            debug!(stage = stage.name(), "stage produced a reply");
            if let Some(user_id) = &ctx.user_id
                && let Err(err) = self.collaborators.sessions.set_active_special_flow(user_id, None)
            {
                record(&mut diagnostics, stage.name(), &err);
            }
            return Resolution {
                partition,
                handled_by: Some(stage.name()),
                reply: Some(reply),
                diagnostics,
            };
        }

        Resolution {
            partition,
            handled_by: None,
            reply: None,
            diagnostics,
        }
    }

    /// Looks `data_id` up in `partition`, retrying once against the base
    /// partition when the partition is localized. A localized store failure is
    /// recorded and counts as a miss; base partition failures are returned.
    pub fn find_record(
        &self,
        partition: &ScenarioPartition,
        data_id: &str,
        stage: &'static str,
        diagnostics: &mut Diagnostics,
    ) -> EngineResult<Option<ContentRecord>> {
        let content = &self.collaborators.content;
        if !partition.is_localized() {
            return content.get_by_id(&partition.key(), data_id);
        }
        match content.get_by_id(&partition.key(), data_id) {
            Ok(Some(found)) => return Ok(Some(found)),
            Ok(None) => {}
            Err(err) => record(diagnostics, stage, &err),
        }
        content.get_by_id(&partition.base().key(), data_id)
    }

    /// [`Engine::find_record`] with misses and store failures recorded.
    pub fn lookup_in(
        &self,
        partition: &ScenarioPartition,
        data_id: &str,
        stage: &'static str,
        diagnostics: &mut Diagnostics,
    ) -> Option<ContentRecord> {
        match self.find_record(partition, data_id, stage, diagnostics) {
            Ok(Some(found)) => Some(found),
            Ok(None) => {
                record(
                    diagnostics,
                    stage,
                    &EngineError::NotFound(format!("{data_id} in {partition}")),
                );
                None
            }
            Err(err) => {
                record(diagnostics, stage, &err);
                None
            }
        }
    }

    /// Resolves an id (or an `apiCall=...&k=v` payload) to a reply and
    /// remembers it as the user's last content.
    pub fn reply_for_id(
        &self,
        ctx: &EventContext,
        data_id: &str,
        stage: &'static str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Reply> {
        let reply = if data_id.contains("apiCall") {
            self.api_call_reply(ctx, data_id, stage, diagnostics)
        } else {
            let found = self.lookup_in(&ctx.partition, data_id, stage, diagnostics)?;
            self.assemble_or_record(ctx, &found, stage, diagnostics)
        }?;

        if let Some(user_id) = &ctx.user_id
            && let Err(err) = self.collaborators.sessions.set_last_content_id(user_id, data_id)
        {
            record(diagnostics, stage, &err);
        }
        Some(reply)
    }

    pub fn assemble_or_record(
        &self,
        ctx: &EventContext,
        content: &ContentRecord,
        stage: &'static str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Reply> {
        match assemble(self, ctx, content, diagnostics) {
            Ok(reply) => Some(reply),
            Err(err) => {
                record(diagnostics, stage, &err);
                None
            }
        }
    }

    fn api_call_reply(
        &self,
        ctx: &EventContext,
        payload: &str,
        stage: &'static str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Reply> {
        let mut params = parse_query(payload);
        if let Some(user_id) = &ctx.user_id {
            params.insert("user_id".into(), Value::String(user_id.clone()));
        }
        params.insert("scenario".into(), Value::String(ctx.partition.key()));

        let Some(target) = params.get("apiCall").and_then(Value::as_str).map(str::to_string) else {
            record(
                diagnostics,
                stage,
                &EngineError::MalformedPayload(format!("no apiCall id in `{payload}`")),
            );
            return None;
        };

        let mut content = self.lookup_in(&ctx.partition, &target, stage, diagnostics)?;
        content.parameters = params;
        self.assemble_or_record(ctx, &content, stage, diagnostics)
    }
}

/// Splits `k=v&k=v`; a pair without `=` maps to an empty string.
pub fn parse_query(payload: &str) -> Map<String, Value> {
    payload
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), Value::String(value.to_string())),
            None => (pair.to_string(), Value::String(String::new())),
        })
        .collect()
}
