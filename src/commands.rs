use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::cli::{DisasterModeArgs, ResolveArgs, StoreArgs};
use crate::config::EngineConfig;
use crate::diagnostics::summarize;
use crate::disaster::{AdminOutcome, set_disaster_mode};
use crate::engine::{Collaborators, Engine};
use crate::error::{EngineError, EngineResult};
use crate::event::Event;
use crate::message::Message;
use crate::scan::{ScanConfig, ScanReport, persist_settings, scan_store};
use crate::store::{MemoryStore, Transmitter};

struct Loaded {
    engine: Engine,
    store: Arc<MemoryStore>,
    report: ScanReport,
}

fn load(args: &StoreArgs) -> Result<Loaded> {
    let mut config = EngineConfig::load_or_default(args.config.as_deref())?.with_env_overrides();
    if let Some(environment) = args.env {
        config.environment = environment;
    }

    let mut report = scan_store(&ScanConfig {
        root: args.store.clone(),
        strict: args.strict,
    })?;
    for warning in &report.warnings {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
    }

    let store = Arc::new(std::mem::take(&mut report.store));
    let engine = Engine::new(config, Collaborators::from_memory(store.clone()));
    Ok(Loaded { engine, store, report })
}

pub fn resolve(args: &ResolveArgs) -> Result<()> {
    let loaded = load(&args.store)?;
    let timestamp_ms = args.timestamp.unwrap_or_else(now_ms);
    let user = args.user.as_deref();

    let output = if let Some(text) = &args.text {
        single(&loaded.engine, &Event::text(user, text, timestamp_ms))?
    } else if let Some(data) = &args.postback {
        single(&loaded.engine, &Event::postback(user, data, timestamp_ms))?
    } else if let Some(path) = &args.event {
        let data = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let body: Value =
            serde_json::from_str(&data).with_context(|| format!("invalid JSON in {}", path.display()))?;
        let events = Event::all_from_webhook(&body);
        if events.is_empty() {
            bail!("no text or postback events in {}", path.display());
        }
        let mut resolutions = Vec::new();
        for event in &events {
            resolutions.push(single(&loaded.engine, event)?);
        }
        Value::Array(resolutions)
    } else {
        bail!("one of --text, --postback or --event is required");
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

fn single(engine: &Engine, event: &Event) -> Result<Value> {
    let resolution = engine.handle_event(event);
    eprintln!(
        "{}",
        summarize(&resolution.partition, resolution.handled_by, &resolution.diagnostics)
    );
    serde_json::to_value(&resolution).context("failed to encode resolution")
}

pub fn disaster_mode(args: &DisasterModeArgs) -> Result<()> {
    let loaded = load(&args.store)?;
    let outcome = set_disaster_mode(&loaded.engine, &StdoutTransmitter, args.activate);
    println!("{}", serde_json::to_string(&outcome)?);

    match outcome {
        AdminOutcome::Success => {
            if let (Some(path), Some(settings)) = (&loaded.report.settings_path, loaded.store.current_settings()) {
                persist_settings(path, &settings)?;
            }
            Ok(())
        }
        AdminOutcome::Error { message } => bail!(message),
    }
}

/// Prints each platform call as one JSON line instead of sending it.
struct StdoutTransmitter;

impl StdoutTransmitter {
    fn emit(&self, call: Value) -> EngineResult<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{call}").map_err(|err| EngineError::Transmission(err.to_string()))
    }
}

impl Transmitter for StdoutTransmitter {
    fn broadcast(&self, messages: &[Message]) -> EngineResult<()> {
        self.emit(json!({"call": "broadcast", "messages": messages}))
    }

    fn set_default_menu(&self, menu_id: &str) -> EngineResult<()> {
        self.emit(json!({"call": "set_default_menu", "menu_id": menu_id}))
    }

    fn cancel_default_menu(&self) -> EngineResult<()> {
        self.emit(json!({"call": "cancel_default_menu"}))
    }
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
