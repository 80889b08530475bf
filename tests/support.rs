#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scenario_engine::config::EngineConfig;
use scenario_engine::model::{ContentRecord, Environment, Facility, Settings};
use scenario_engine::store::MemoryStore;
use scenario_engine::{Collaborators, Engine};
use serde_json::{Value, json};
use walkdir::WalkDir;

pub const BASE: &str = "city#v3";
pub const ENGLISH: &str = "city#v3#en";
pub const USER: &str = "U-resident";

pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn copy_fixture_dir(src: &Path, dest: &Path) {
    for entry in WalkDir::new(src).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(src).unwrap();
        let dest_path = dest.join(rel);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::copy(entry.path(), dest_path).unwrap();
    }
}

pub fn record(partition: &str, data_id: &str, mut value: Value) -> ContentRecord {
    value["scenario"] = json!(partition);
    value["dataId"] = json!(data_id);
    serde_json::from_value(value).unwrap()
}

pub fn text(partition: &str, data_id: &str, body: &str) -> ContentRecord {
    record(partition, data_id, json!({"dataType": "text", "params": {"text": body}}))
}

pub fn text_mapping(partition: &str, pairs: &[(&str, &str)]) -> ContentRecord {
    let mapping: serde_json::Map<String, Value> = pairs
        .iter()
        .map(|(key, target)| (key.to_string(), json!(target)))
        .collect();
    record(
        partition,
        "TEXT_MAPPING",
        json!({"dataType": "textMapping", "textMapping": mapping}),
    )
}

pub fn settings() -> Settings {
    serde_json::from_value(json!({
        "activeScenarioId": "city",
        "envMapping": {"production": "v3", "sandbox": "v3"},
        "richMenus": {
            "defaultProduction": "menu-normal",
            "bosaiProduction": "menu-bosai",
            "defaultSandbox": "menu-normal-sandbox"
        }
    }))
    .unwrap()
}

pub const TRASH_LABELS: [&str; 5] = [
    "burnable trash",
    "non-burnable trash",
    "recyclable trash",
    "large trash",
    "hazardous trash",
];

/// A small city scenario with English overrides, congestion data and a
/// newsletter.
pub fn city_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.set_settings(settings());

    let mut mapping = vec![
        ("hello", "HELLO"),
        ("menu", "MAIN_MENU"),
        ("news", "NEWS"),
        ("weather", "apiCall=WEATHER&city=Sapporo"),
        ("TRASH_NOT_FOUND_DEFAULT_MESSAGE", "TRASH_NOT_FOUND"),
    ];
    let trash_ids = ["TRASH_1", "TRASH_2", "TRASH_3", "TRASH_4", "TRASH_5"];
    mapping.extend(TRASH_LABELS.iter().copied().zip(trash_ids));
    store.insert_record(text_mapping(BASE, &mapping));
    store.insert_record(text_mapping(ENGLISH, &[("hello", "HELLO"), ("menu", "MAIN_MENU")]));

    store.insert_record(text(BASE, "HELLO", "こんにちは"));
    store.insert_record(text(ENGLISH, "HELLO", "Hello"));
    for (id, label) in trash_ids.iter().zip(TRASH_LABELS) {
        store.insert_record(text(BASE, id, &format!("How to put out {label}")));
    }
    store.insert_record(text(BASE, "TRASH_SEPARATION_TALK", "Ask me about trash"));
    store.insert_record(text(BASE, "TRASH_NOT_FOUND", "Sorry, no matching trash category."));

    store.insert_record(record(
        BASE,
        "MAIN_MENU",
        json!({
            "dataType": "compositeMessage",
            "messages": ["HELLO", "MENU_BUTTONS", "STICKER", "MISSING", "BROKEN_CONFIRM", "NEWS"],
            "quickReply": {"items": [{"type": "action", "action": {"type": "message", "label": "Menu", "text": "menu"}}]}
        }),
    ));
    store.insert_record(record(
        BASE,
        "MENU_BUTTONS",
        json!({
            "dataType": "buttons",
            "nameLBD": "Main menu",
            "params": {
                "text": "What would you like to do?",
                "actionCount": 2,
                "actions.0": {"type": "message", "label": "Trash", "text": "burnable trash"},
                "actions.1": {"type": "postback", "label": "News", "data": "NEWS"}
            }
        }),
    ));
    store.insert_record(record(BASE, "STICKER", json!({"dataType": "sticker", "params": {"packageId": "1"}})));
    store.insert_record(record(
        BASE,
        "BROKEN_CONFIRM",
        json!({"dataType": "confirm", "params": {"text": "Sure?", "actions": []}}),
    ));

    store.insert_record(record(
        BASE,
        "NEWS",
        json!({
            "dataType": "carouselFlex",
            "nameLBD": "City news",
            "params": {"bubbleParam": ["NEWS_1", "NEWS_MISSING", "NEWS_2"]}
        }),
    ));
    for id in ["NEWS_1", "NEWS_2"] {
        store.insert_record(record(
            BASE,
            id,
            json!({"dataType": "bubbleFlex", "params": {"body": {"type": "box", "layout": "vertical", "contents": [{"type": "text", "text": id}]}}}),
        ));
    }

    store.insert_record(record(
        BASE,
        "WEATHER",
        json!({"dataType": "apiCall", "function": "getWeather"}),
    ));

    store.insert_record(record(
        BASE,
        "CONGESTION_SITUATION_SELECT_BUBBLE_TEMPLATE",
        json!({
            "dataType": "bubbleFlex",
            "params": {
                "type": "bubble",
                "header": {"type": "box", "layout": "vertical", "contents": [{"type": "text", "text": "${facilityName}"}]},
                "body": {"type": "box", "layout": "vertical", "contents": [
                    {"type": "button", "action": {"type": "postback", "label": "All spaces", "data": "{\"facilityName\":\"${facilityName}\",\"id\":\"CONGESTION_SITUATION_ALL\"}"}}
                ]}
            }
        }),
    ));
    store.insert_record(record(
        BASE,
        "CONGESTION_SITUATION_BUBBLE_TEMPLATE",
        json!({
            "dataType": "bubbleFlex",
            "params": {
                "type": "bubble",
                "body": {"type": "box", "layout": "vertical", "contents": [
                    {"type": "text", "text": "${facilityName} / ${spaceName}"},
                    {"type": "text", "text": "${status}", "color": "${color}"},
                    {"type": "text", "text": "${lastUpdateTime}"},
                    {"type": "text", "text": "${memo}"}
                ]}
            }
        }),
    ));
    store.insert_record(text(BASE, "CONGESTION_SITUATION_NONE_TEXT", "No congestion information is available."));

    for facility in facilities() {
        store.insert_facility(facility);
    }

    store.insert_record(record(
        "PublicityPaper",
        "PAPER_APRIL",
        json!({
            "dataType": "carouselFlex",
            "nameLBD": "April newsletter",
            "isDefaultForProduction": true,
            "publicityPaperKeyword": "newsletter",
            "facilityName": "City Hall",
            "params": {"bubbleParam": ["PAPER_APRIL_COVER"]}
        }),
    ));
    store.insert_record(record(
        "PublicityPaper",
        "PAPER_APRIL_COVER",
        json!({"dataType": "bubbleFlex", "params": {"type": "bubble", "body": {"type": "box", "layout": "vertical", "contents": [{"type": "text", "text": "${facilityName} news"}]}}}),
    ));

    Arc::new(store)
}

pub fn facilities() -> Vec<Facility> {
    serde_json::from_value(json!([
        {
            "facilityName": "Central Library",
            "space": [
                {"spaceName": "Study Room A", "status": 1},
                {"spaceName": "Study Room B", "status": 2, "memo": "Quiet please",
                 "image": "https://example.com/b.png", "lastUpdateTime": 1709262299},
                {"spaceName": "Study Room C", "status": 3, "disabled": true}
            ]
        },
        {
            "facilityName": "City Pool",
            "selectMessage": {"disabled": true},
            "space": [{"spaceName": "Lane 1", "status": 3}]
        },
        {
            "facilityName": "Community Hall",
            "selectMessage": {
                "custom": true,
                "type": "json",
                "param": {"type": "bubble", "body": {"type": "box", "layout": "vertical", "contents": [
                    {"type": "button", "action": {"type": "message", "label": "${facilityName} rooms", "text": "rooms"}}
                ]}}
            },
            "space": [{"spaceName": "Hall 1", "status": 0}]
        },
        {
            "facilityName": "Closed Gym",
            "space": [{"spaceName": "Court", "status": 1, "disabled": true}]
        }
    ]))
    .unwrap()
}

pub fn engine(store: Arc<MemoryStore>) -> Engine {
    engine_with(store, EngineConfig::default())
}

pub fn sandbox_engine(store: Arc<MemoryStore>) -> Engine {
    engine_with(
        store,
        EngineConfig {
            environment: Environment::Sandbox,
            ..EngineConfig::default()
        },
    )
}

pub fn engine_with(store: Arc<MemoryStore>, config: EngineConfig) -> Engine {
    Engine::new(config, Collaborators::from_memory(store))
}
