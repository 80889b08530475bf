use std::collections::BTreeMap;
use std::fmt;

use crate::diagnostics::{Diagnostics, record};
use crate::error::EngineError;
use crate::model::{DataType, Environment, Settings};
use crate::store::ContentStore;

pub const DEGRADED_PARTITION: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioPartition {
    pub scenario_id: String,
    /// `None` only for the degraded partition.
    pub version: Option<String>,
    pub locale: Option<String>,
}

impl ScenarioPartition {
    pub fn new(scenario_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            version: Some(version.into()),
            locale: None,
        }
    }

    pub fn degraded() -> Self {
        Self {
            scenario_id: DEGRADED_PARTITION.to_string(),
            version: None,
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        if self.version.is_some() {
            self.locale = Some(locale.into());
        }
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.version.is_none()
    }

    pub fn is_localized(&self) -> bool {
        self.locale.is_some()
    }

    pub fn base(&self) -> Self {
        Self {
            locale: None,
            ..self.clone()
        }
    }

    pub fn key(&self) -> String {
        match (&self.version, &self.locale) {
            (None, _) => self.scenario_id.clone(),
            (Some(version), None) => format!("{}#{}", self.scenario_id, version),
            (Some(version), Some(locale)) => format!("{}#{}#{}", self.scenario_id, version, locale),
        }
    }

    /// Parses a stored key; anything without a version is treated as an opaque
    /// partition name.
    pub fn parse(key: &str) -> Self {
        let mut parts = key.splitn(3, '#');
        let scenario_id = parts.next().unwrap_or_default().to_string();
        let version = parts.next().map(str::to_string);
        let locale = parts.next().map(str::to_string);
        Self {
            scenario_id,
            locale: version.as_ref().and(locale),
            version,
        }
    }
}

impl fmt::Display for ScenarioPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

pub fn resolve_partition(
    settings: Option<&Settings>,
    environment: Environment,
    user_locale: Option<&str>,
    default_locale: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> ScenarioPartition {
    let Some(settings) = settings.filter(|settings| !settings.active_scenario_id.is_empty()) else {
        record(
            diagnostics,
            "locale",
            &EngineError::Configuration("no active scenario settings; using default partition".into()),
        );
        return ScenarioPartition::degraded();
    };

    let Some(version) = settings.version_for(environment) else {
        record(
            diagnostics,
            "locale",
            &EngineError::Configuration(format!(
                "scenario {} has no version mapped for {environment}; using default partition",
                settings.active_scenario_id
            )),
        );
        return ScenarioPartition::degraded();
    };

    let partition = ScenarioPartition::new(&settings.active_scenario_id, version);
    match user_locale.map(str::trim).filter(|locale| !locale.is_empty()) {
        Some(locale) if Some(locale) != default_locale => partition.with_locale(locale),
        _ => partition,
    }
}

/// Loads the partition's text mapping, falling back to the base partition's
/// mapping when a localized partition has none.
pub fn resolve_text_mapping(
    store: &dyn ContentStore,
    partition: &ScenarioPartition,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, String> {
    if let Some(mapping) = first_mapping(store, partition, diagnostics) {
        return mapping;
    }
    if partition.is_localized()
        && let Some(mapping) = first_mapping(store, &partition.base(), diagnostics)
    {
        return mapping;
    }
    BTreeMap::new()
}

fn first_mapping(
    store: &dyn ContentStore,
    partition: &ScenarioPartition,
    diagnostics: &mut Diagnostics,
) -> Option<BTreeMap<String, String>> {
    match store.get_by_type(&partition.key(), &DataType::TextMapping) {
        Ok(records) => records.into_iter().next().map(|record| record.text_mapping),
        Err(err) => {
            record(diagnostics, "locale", &err);
            None
        }
    }
}
