use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::engine::{Engine, Reply};
use crate::error::{EngineError, EngineResult};
use crate::message::Message;
use crate::pipeline::EventContext;
use crate::store::Transmitter;

const STAGE: &str = "disaster_mode";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminOutcome {
    Success,
    Error { message: String },
}

impl AdminOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AdminOutcome::Success)
    }
}

pub fn set_disaster_mode(engine: &Engine, transmitter: &dyn Transmitter, activate: bool) -> AdminOutcome {
    let environment = engine.config().environment;
    match toggle(engine, transmitter, activate) {
        Ok(()) => {
            tracing::info!(%environment, activate, "disaster mode updated");
            AdminOutcome::Success
        }
        Err(err) => {
            tracing::error!(%environment, activate, error = %err, "disaster mode toggle failed");
            AdminOutcome::Error {
                message: err.to_string(),
            }
        }
    }
}

fn toggle(engine: &Engine, transmitter: &dyn Transmitter, activate: bool) -> EngineResult<()> {
    let collaborators = engine.collaborators();
    let config = engine.config();
    let environment = config.environment;

    let mut settings = collaborators
        .settings
        .settings()?
        .ok_or_else(|| EngineError::Configuration("no scenario settings".into()))?;
    let menus = settings.rich_menus.clone().ok_or_else(|| {
        EngineError::Configuration(
            "rich menus for normal and disaster mode are not configured; set them in the rich menu settings".into(),
        )
    })?;
    let (normal_menu, disaster_menu) = menus.for_environment(environment);

    let mut diagnostics = Vec::new();
    let ctx = EventContext::without_user(engine, &mut diagnostics);

    if activate {
        let opening = messages_for(engine, &ctx, &config.ids.disaster_start, &mut diagnostics);
        let (Some(opening), Some(menu)) = (opening, disaster_menu) else {
            return Err(EngineError::Configuration(format!(
                "disaster mode cannot be activated: the {environment} disaster menu or the `{}` content is missing",
                config.ids.disaster_start
            )));
        };
        transmitter.broadcast(&opening)?;
        transmitter.set_default_menu(menu)?;
    } else {
        if let Some(closing) = messages_for(engine, &ctx, &config.ids.disaster_end, &mut diagnostics) {
            transmitter.broadcast(&closing)?;
        }
        match normal_menu {
            Some(menu) => transmitter.set_default_menu(menu)?,
            None => transmitter.cancel_default_menu()?,
        }
    }

    settings
        .bosai_mode
        .insert(environment.as_str().to_string(), activate);
    collaborators.settings.save_settings(&settings)
}

fn messages_for(engine: &Engine, ctx: &EventContext, data_id: &str, diagnostics: &mut Diagnostics) -> Option<Vec<Message>> {
    match engine.reply_for_id(ctx, data_id, STAGE, diagnostics)? {
        Reply::Messages(messages) if !messages.is_empty() => Some(messages),
        _ => None,
    }
}
