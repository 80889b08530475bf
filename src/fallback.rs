use scenario_fuzzy::fuzzy_search;
use serde_json::{Value, json};

use crate::diagnostics::{Diagnostics, record};
use crate::engine::{Engine, Reply};
use crate::message::{MAX_BUTTON_ACTIONS, MAX_CAROUSEL_BUBBLES, Message};
use crate::pipeline::EventContext;

const STAGE: &str = "fuzzy_fallback";

pub fn reply(engine: &Engine, ctx: &EventContext, text: &str, diagnostics: &mut Diagnostics) -> Option<Reply> {
    let config = engine.config();
    if let Some(gate) = &config.ids.fuzzy_gate {
        match engine.find_record(&ctx.partition, gate, STAGE, diagnostics) {
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(err) => {
                record(diagnostics, STAGE, &err);
                return None;
            }
        }
    }

    let not_found_key = config.ids.fuzzy_not_found_key.as_str();
    let labels: Vec<&str> = ctx
        .text_mapping
        .keys()
        .map(String::as_str)
        .filter(|label| *label != not_found_key)
        .collect();

    match fuzzy_search(text, &labels, &config.fuzzy.options) {
        Some(candidates) => {
            tracing::debug!(input = text, count = candidates.len(), "fuzzy candidates");
            Some(Reply::Messages(vec![candidate_carousel(&candidates, &config.fuzzy.prompt)]))
        }
        None => {
            let target = ctx.text_mapping.get(not_found_key)?;
            engine.reply_for_id(ctx, target, STAGE, diagnostics)
        }
    }
}

pub fn candidate_carousel(candidates: &[String], prompt: &str) -> Message {
    let bubbles = candidates
        .chunks(MAX_BUTTON_ACTIONS)
        .take(MAX_CAROUSEL_BUBBLES)
        .map(|chunk| candidate_bubble(chunk, prompt))
        .collect();
    Message::flex_carousel(prompt, bubbles)
}

fn candidate_bubble(candidates: &[String], prompt: &str) -> Value {
    let buttons: Vec<Value> = candidates
        .iter()
        .map(|candidate| {
            json!({
                "type": "button",
                "action": {"type": "message", "label": candidate, "text": candidate}
            })
        })
        .collect();

    json!({
        "type": "bubble",
        "header": {
            "type": "box",
            "layout": "vertical",
            "contents": [{"type": "text", "text": prompt, "align": "start"}]
        },
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": buttons,
            "paddingTop": "none"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_fill_bubbles_four_at_a_time() {
        let candidates: Vec<String> = ["burnable trash", "non-burnable trash", "recyclable trash", "large trash", "hazardous trash"]
            .iter()
            .map(|label| label.to_string())
            .collect();
        let message = candidate_carousel(&candidates, "What are you looking for?");
        let bubbles = message.as_value()["contents"]["contents"].as_array().unwrap().clone();
        assert_eq!(bubbles.len(), 2);
        assert_eq!(bubbles[0]["body"]["contents"].as_array().unwrap().len(), 4);
        assert_eq!(bubbles[1]["body"]["contents"].as_array().unwrap().len(), 1);
        assert_eq!(bubbles[1]["body"]["contents"][0]["action"]["text"], "hazardous trash");
        assert_eq!(bubbles[0]["header"]["contents"][0]["text"], "What are you looking for?");
    }

    #[test]
    fn bubble_count_is_capped() {
        let candidates: Vec<String> = (0..60).map(|i| format!("label {i}")).collect();
        let message = candidate_carousel(&candidates, "?");
        assert_eq!(message.as_value()["contents"]["contents"].as_array().unwrap().len(), 10);
    }
}
