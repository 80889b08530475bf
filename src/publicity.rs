use crate::assemble::flex_carousel;
use crate::diagnostics::{Diagnostics, record};
use crate::engine::{Engine, Reply};
use crate::locale::ScenarioPartition;
use crate::message::Message;
use crate::model::{ContentRecord, Environment};
use crate::pipeline::EventContext;
use crate::template::{Placeholders, substitute};

const STAGE: &str = "publicity_paper";

fn default_flag(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "isDefaultForProduction",
        Environment::Sandbox => "isDefaultForSandbox",
    }
}

pub fn find_issue(records: Vec<ContentRecord>, environment: Environment, keyword: &str) -> Option<ContentRecord> {
    let flag = default_flag(environment);
    records
        .into_iter()
        .filter(|issue| !issue.data_id.is_empty())
        .find(|issue| issue.extra_flag(flag) && issue.extra_str("publicityPaperKeyword") == Some(keyword))
}

pub fn reply(engine: &Engine, ctx: &EventContext, text: &str, diagnostics: &mut Diagnostics) -> Option<Reply> {
    let partition = ScenarioPartition::parse(&engine.config().publicity_partition);
    let records = match engine.collaborators().content.get_partition(&partition.key()) {
        Ok(records) => records,
        Err(err) => {
            record(diagnostics, STAGE, &err);
            return None;
        }
    };
    let issue = find_issue(records, ctx.environment, text)?;

    let result = flex_carousel(engine, &partition, &issue, diagnostics).and_then(|message| {
        match issue.extra_str("facilityName") {
            Some(facility_name) => {
                let placeholders = Placeholders::new().set("facilityName", facility_name);
                substitute(&message.into_value(), &placeholders).map(Message::from_value)
            }
            None => Ok(message),
        }
    });

    match result {
        Ok(message) => {
            if let Some(user_id) = &ctx.user_id
                && let Err(err) = engine
                    .collaborators()
                    .sessions
                    .set_last_content_id(user_id, &issue.data_id)
            {
                record(diagnostics, STAGE, &err);
            }
            Some(Reply::Messages(vec![message]))
        }
        Err(err) => {
            record(diagnostics, STAGE, &err);
            None
        }
    }
}
