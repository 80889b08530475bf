mod support;

use scenario_engine::assemble::assemble;
use scenario_engine::diagnostics::DiagnosticKind;
use scenario_engine::pipeline::EventContext;
use scenario_engine::{EngineError, Event, Reply};
use serde_json::json;
use support::{BASE, USER, city_store, engine, record};

#[test]
fn composite_keeps_first_five_children_and_skips_failures() {
    let store = city_store();
    let resolution = engine(store).handle_event(&Event::text(Some(USER), "menu", 0));

    let messages = resolution.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_type(), Some("text"));
    assert_eq!(messages[1].as_value()["altText"], "Main menu");
    assert_eq!(messages[1].as_value()["template"]["actions"].as_array().unwrap().len(), 2);

    // quick reply only on the last message
    assert!(messages[0].as_value().get("quickReply").is_none());
    assert_eq!(messages[1].as_value()["quickReply"]["items"][0]["action"]["text"], "menu");

    let kinds: Vec<_> = resolution.diagnostics.iter().map(|d| (d.kind, d.message.clone())).collect();
    assert!(kinds.iter().any(|(kind, message)| *kind == DiagnosticKind::NotFound && message.contains("MISSING")));
    assert!(kinds.iter().any(|(kind, message)| *kind == DiagnosticKind::MalformedContent && message.contains("BROKEN_CONFIRM")));
    // the sixth child is never looked up
    assert!(!kinds.iter().any(|(_, message)| message.contains("NEWS")));
}

#[test]
fn single_record_gets_quick_reply_from_bare_array() {
    let store = city_store();
    let engine = engine(store);
    let mut diagnostics = Vec::new();
    let ctx = EventContext::without_user(&engine, &mut diagnostics);

    let content = record(
        BASE,
        "OPENING_HOURS",
        json!({
            "dataType": "text",
            "params": {"text": "9:00-17:00"},
            "quickReply": [{"type": "message", "label": "Holidays", "text": "holidays"}]
        }),
    );
    let reply = assemble(&engine, &ctx, &content, &mut diagnostics).unwrap();
    let Reply::Messages(messages) = reply else {
        panic!("expected messages");
    };
    assert_eq!(messages[0].as_value()["quickReply"]["items"][0]["type"], "action");
    assert_eq!(messages[0].as_value()["quickReply"]["items"][0]["action"]["label"], "Holidays");
}

#[test]
fn types_without_generator_are_configuration_errors() {
    let store = city_store();
    let engine = engine(store);
    let mut diagnostics = Vec::new();
    let ctx = EventContext::without_user(&engine, &mut diagnostics);

    let sticker = record(BASE, "STICKER", json!({"dataType": "sticker"}));
    assert!(matches!(
        assemble(&engine, &ctx, &sticker, &mut diagnostics),
        Err(EngineError::Configuration(_))
    ));

    let mapping = record(BASE, "TEXT_MAPPING", json!({"dataType": "textMapping"}));
    assert!(matches!(
        assemble(&engine, &ctx, &mapping, &mut diagnostics),
        Err(EngineError::Configuration(_))
    ));
}

#[test]
fn composite_without_renderable_children_fails() {
    let store = city_store();
    let engine = engine(store);
    let mut diagnostics = Vec::new();
    let ctx = EventContext::without_user(&engine, &mut diagnostics);

    let content = record(
        BASE,
        "EMPTY_MENU",
        json!({"dataType": "compositeMessage", "messages": ["STICKER", "MISSING"]}),
    );
    assert!(matches!(
        assemble(&engine, &ctx, &content, &mut diagnostics),
        Err(EngineError::MalformedContent { .. })
    ));
}

#[test]
fn api_call_requires_a_function() {
    let store = city_store();
    let engine = engine(store);
    let mut diagnostics = Vec::new();
    let ctx = EventContext::without_user(&engine, &mut diagnostics);

    let content = record(BASE, "BROKEN_API", json!({"dataType": "apiCall"}));
    assert!(assemble(&engine, &ctx, &content, &mut diagnostics).is_err());
}

#[test]
fn carousel_without_any_bubble_fails() {
    let store = city_store();
    let engine = engine(store);
    let mut diagnostics = Vec::new();
    let ctx = EventContext::without_user(&engine, &mut diagnostics);

    let content = record(
        BASE,
        "GHOST_NEWS",
        json!({"dataType": "carouselFlex", "params": {"bubbleParam": ["NOPE_1", "NOPE_2"]}}),
    );
    assert!(assemble(&engine, &ctx, &content, &mut diagnostics).is_err());
    assert_eq!(
        diagnostics.iter().filter(|d| d.kind == DiagnosticKind::NotFound).count(),
        2
    );
}
