//! Loads a store directory into a [`MemoryStore`].
//!
//! Layout:
//! - `settings.{json,yaml,yml}`: the scenario settings record
//! - `scenario/**`: content records
//! - `congestion/**`: facilities
//! - `sessions.{json,yaml,yml}`: user id to session (optional)
//! - `handoffs.{json,yaml,yml}`: hand-off log (optional)
//!
//! Every document may hold a single object or an array of them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use walkdir::WalkDir;

use crate::config::is_yaml;
use crate::diagnostics::{Diagnostic, DiagnosticKind, diagnostic};
use crate::model::{ContentRecord, Facility, HandoffRecord, Settings, UserSession};
use crate::store::{HandoffLog, MemoryStore};

const STAGE: &str = "scan";
const DOCUMENT_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub strict: bool,
}

#[derive(Debug)]
pub struct ScanReport {
    pub store: MemoryStore,
    pub warnings: Vec<Diagnostic>,
    /// Where the settings were read from; disaster-mode writes back here.
    pub settings_path: Option<PathBuf>,
}

pub fn scan_store(config: &ScanConfig) -> Result<ScanReport> {
    if !config.root.is_dir() {
        bail!("store directory {} does not exist", config.root.display());
    }

    let store = MemoryStore::new();
    let mut warnings = Vec::new();

    let settings_path = find_document(&config.root, "settings");
    if let Some(path) = &settings_path {
        let settings: Settings = read_typed(path)?;
        store.set_settings(settings);
    } else {
        warnings.push(diagnostic(
            DiagnosticKind::Configuration,
            STAGE,
            format!("no settings file in {}", config.root.display()),
        ));
    }

    let mut seen: BTreeMap<(String, String), String> = BTreeMap::new();
    for (path, value) in documents(&config.root.join("scenario"), config, &mut warnings)? {
        let rel = relative(&config.root, &path);
        for item in items(value) {
            let record: ContentRecord = match serde_json::from_value(item) {
                Ok(record) => record,
                Err(err) => {
                    ignore(config, &mut warnings, format!("invalid content record in {rel}: {err}"))?;
                    continue;
                }
            };
            let key = (record.scenario.clone(), record.data_id.clone());
            if let Some(existing) = seen.get(&key) {
                ignore(
                    config,
                    &mut warnings,
                    format!("duplicate dataId {} in {}: {existing} and {rel}", key.1, key.0),
                )?;
                continue;
            }
            seen.insert(key, rel.clone());
            store.insert_record(record);
        }
    }

    for (path, value) in documents(&config.root.join("congestion"), config, &mut warnings)? {
        let rel = relative(&config.root, &path);
        for item in items(value) {
            match serde_json::from_value::<Facility>(item) {
                Ok(facility) => store.insert_facility(facility),
                Err(err) => ignore(config, &mut warnings, format!("invalid facility in {rel}: {err}"))?,
            }
        }
    }

    if let Some(path) = find_document(&config.root, "sessions") {
        let sessions: BTreeMap<String, UserSession> = read_typed(&path)?;
        for (user_id, session) in sessions {
            store.set_session(user_id, session);
        }
    }

    if let Some(path) = find_document(&config.root, "handoffs") {
        for item in items(read_document(&path)?) {
            let handoff: HandoffRecord = serde_json::from_value(item)
                .with_context(|| format!("invalid hand-off in {}", path.display()))?;
            store
                .upsert(handoff)
                .with_context(|| format!("invalid hand-off in {}", path.display()))?;
        }
    }

    if store.record_count() == 0 {
        if config.strict {
            bail!("no content records found in {}", config.root.display());
        }
        warnings.push(diagnostic(DiagnosticKind::IgnoredFile, STAGE, "no content records found"));
    }

    tracing::debug!(
        records = store.record_count(),
        facilities = store.facility_count(),
        warnings = warnings.len(),
        "store loaded"
    );

    Ok(ScanReport {
        store,
        warnings,
        settings_path,
    })
}

/// Writes settings back in the format of the file they came from.
pub fn persist_settings(path: &Path, settings: &Settings) -> Result<()> {
    let data = if is_yaml(path) {
        serde_yaml_bw::to_string(settings).context("failed to encode settings as YAML")?
    } else {
        to_pretty_json(settings)?
    };
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut data = serde_json::to_string_pretty(value).context("failed to encode JSON")?;
    data.push('\n');
    Ok(data)
}

fn find_document(root: &Path, stem: &str) -> Option<PathBuf> {
    DOCUMENT_EXTENSIONS
        .iter()
        .map(|ext| root.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn read_document(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if is_yaml(path) {
        serde_yaml_bw::from_str(&data).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&data).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

fn read_typed<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_value(read_document(path)?).with_context(|| format!("unexpected shape in {}", path.display()))
}

/// Parsed documents under `dir`, sorted by path. A missing directory yields
/// nothing.
fn documents(dir: &Path, config: &ScanConfig, warnings: &mut Vec<Diagnostic>) -> Result<Vec<(PathBuf, Value)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    let mut parsed = Vec::new();
    for path in paths {
        if !is_document(&path) {
            warnings.push(diagnostic(
                DiagnosticKind::IgnoredFile,
                STAGE,
                format!("ignored {}", relative(&config.root, &path)),
            ));
            continue;
        }
        match read_document(&path) {
            Ok(value) => parsed.push((path, value)),
            Err(err) => ignore(config, warnings, format!("{err:#}"))?,
        }
    }
    Ok(parsed)
}

fn items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn ignore(config: &ScanConfig, warnings: &mut Vec<Diagnostic>, message: String) -> Result<()> {
    if config.strict {
        bail!(message);
    }
    warnings.push(diagnostic(DiagnosticKind::IgnoredFile, STAGE, message));
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
