mod support;

use std::cell::RefCell;

use scenario_engine::disaster::{AdminOutcome, set_disaster_mode};
use scenario_engine::message::Message;
use scenario_engine::model::Environment;
use scenario_engine::store::Transmitter;
use scenario_engine::{EngineError, EngineResult};
use support::{BASE, city_store, engine, sandbox_engine, text};

#[derive(Default)]
struct Recorder {
    calls: RefCell<Vec<String>>,
    fail_broadcast: bool,
}

impl Transmitter for Recorder {
    fn broadcast(&self, messages: &[Message]) -> EngineResult<()> {
        if self.fail_broadcast {
            return Err(EngineError::Transmission("429 too many requests".into()));
        }
        let texts: Vec<String> = messages
            .iter()
            .map(|message| message.as_value()["text"].as_str().unwrap_or_default().to_string())
            .collect();
        self.calls.borrow_mut().push(format!("broadcast:{}", texts.join("|")));
        Ok(())
    }

    fn set_default_menu(&self, menu_id: &str) -> EngineResult<()> {
        self.calls.borrow_mut().push(format!("menu:{menu_id}"));
        Ok(())
    }

    fn cancel_default_menu(&self) -> EngineResult<()> {
        self.calls.borrow_mut().push("cancel_menu".to_string());
        Ok(())
    }
}

#[test]
fn activation_broadcasts_and_switches_menu() {
    let store = city_store();
    store.insert_record(text(BASE, "BOSAI_FLOW_START", "Disaster mode is active"));
    let recorder = Recorder::default();

    let outcome = set_disaster_mode(&engine(store.clone()), &recorder, true);

    assert_eq!(outcome, AdminOutcome::Success);
    assert_eq!(
        *recorder.calls.borrow(),
        ["broadcast:Disaster mode is active", "menu:menu-bosai"]
    );
    assert!(store.current_settings().unwrap().disaster_mode(Environment::Production));
}

#[test]
fn activation_needs_the_opening_content() {
    let store = city_store();
    let recorder = Recorder::default();

    let outcome = set_disaster_mode(&engine(store.clone()), &recorder, true);

    let AdminOutcome::Error { message } = outcome else {
        panic!("expected an error");
    };
    assert!(message.contains("BOSAI_FLOW_START"));
    assert!(recorder.calls.borrow().is_empty());
    assert!(!store.current_settings().unwrap().disaster_mode(Environment::Production));
}

#[test]
fn activation_needs_the_environment_menu() {
    let store = city_store();
    store.insert_record(text(BASE, "BOSAI_FLOW_START", "Disaster mode is active"));
    let outcome = set_disaster_mode(&sandbox_engine(store), &Recorder::default(), true);
    assert!(!outcome.is_success());
}

#[test]
fn deactivation_restores_normal_menu() {
    let store = city_store();
    store.insert_record(text(BASE, "BACK_TO_NORMAL_MODE", "Back to normal"));
    let recorder = Recorder::default();

    let outcome = set_disaster_mode(&engine(store.clone()), &recorder, false);

    assert!(outcome.is_success());
    assert_eq!(*recorder.calls.borrow(), ["broadcast:Back to normal", "menu:menu-normal"]);
    let settings = store.current_settings().unwrap();
    assert_eq!(settings.bosai_mode.get("production"), Some(&false));
}

#[test]
fn deactivation_without_normal_menu_cancels_default() {
    let store = city_store();
    let mut settings = store.current_settings().unwrap();
    settings.rich_menus.as_mut().unwrap().default_sandbox = None;
    store.set_settings(settings);
    let recorder = Recorder::default();

    let outcome = set_disaster_mode(&sandbox_engine(store.clone()), &recorder, false);

    assert!(outcome.is_success());
    assert_eq!(*recorder.calls.borrow(), ["cancel_menu"]);
    assert_eq!(store.current_settings().unwrap().bosai_mode.get("sandbox"), Some(&false));
}

#[test]
fn missing_rich_menus_is_reported() {
    let store = city_store();
    let mut settings = store.current_settings().unwrap();
    settings.rich_menus = None;
    store.set_settings(settings);

    let outcome = set_disaster_mode(&engine(store), &Recorder::default(), false);
    let AdminOutcome::Error { message } = outcome else {
        panic!("expected an error");
    };
    assert!(message.contains("rich menus"));
}

#[test]
fn transmission_failure_leaves_the_flag_alone() {
    let store = city_store();
    store.insert_record(text(BASE, "BOSAI_FLOW_START", "Disaster mode is active"));
    let recorder = Recorder {
        fail_broadcast: true,
        ..Recorder::default()
    };

    let outcome = set_disaster_mode(&engine(store.clone()), &recorder, true);

    assert!(matches!(outcome, AdminOutcome::Error { message } if message.contains("429")));
    assert!(store.current_settings().unwrap().bosai_mode.is_empty());
}

#[test]
fn outcome_serializes_like_an_admin_result() {
    let success = serde_json::to_value(AdminOutcome::Success).unwrap();
    assert_eq!(success, serde_json::json!({"result": "SUCCESS"}));
    let error = serde_json::to_value(AdminOutcome::Error { message: "no".into() }).unwrap();
    assert_eq!(error, serde_json::json!({"result": "ERROR", "message": "no"}));
}
