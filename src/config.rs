use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scenario_fuzzy::MatchOptions;
use serde::{Deserialize, Serialize};

use crate::model::Environment;

pub const ENVIRONMENT_VAR: &str = "SCENARIO_ENVIRONMENT";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_environment")]
    pub environment: Environment,
    /// Locale that maps to the base partition.
    #[serde(default = "default_locale")]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub ids: ContentIds,
    #[serde(default)]
    pub congestion: CongestionConfig,
    #[serde(default)]
    pub fuzzy: FuzzyConfig,
    #[serde(default)]
    pub chat_mode: ChatModeTexts,
    #[serde(default = "default_publicity_partition")]
    pub publicity_partition: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            default_locale: default_locale(),
            ids: ContentIds::default(),
            congestion: CongestionConfig::default(),
            fuzzy: FuzzyConfig::default(),
            chat_mode: ChatModeTexts::default(),
            publicity_partition: default_publicity_partition(),
        }
    }
}

impl EngineConfig {
    /// Reads YAML (`.yaml`/`.yml`) or JSON, picked by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = if is_yaml(path) {
            serde_yaml_bw::from_str(&data)
                .with_context(|| format!("invalid YAML config {}", path.display()))?
        } else {
            serde_json::from_str(&data)
                .with_context(|| format!("invalid JSON config {}", path.display()))?
        };
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies `SCENARIO_ENVIRONMENT` when it names a known environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env::var_os(ENVIRONMENT_VAR) {
            match value.to_str().and_then(Environment::parse) {
                Some(environment) => self.environment = environment,
                None => tracing::warn!(
                    value = %value.to_string_lossy(),
                    "ignoring unknown {ENVIRONMENT_VAR}"
                ),
            }
        }
        self
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn default_environment() -> Environment {
    Environment::Production
}

fn default_locale() -> Option<String> {
    Some("ja".to_string())
}

fn default_publicity_partition() -> String {
    "PublicityPaper".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ContentIds {
    /// The fuzzy fallback only runs in partitions containing this record.
    pub fuzzy_gate: Option<String>,
    /// Text-mapping key whose target is sent when fuzzy matching finds nothing.
    pub fuzzy_not_found_key: String,
    pub congestion_select_template: String,
    pub congestion_bubble_template: String,
    pub congestion_none_text: String,
    pub disaster_start: String,
    pub disaster_end: String,
}

impl Default for ContentIds {
    fn default() -> Self {
        Self {
            fuzzy_gate: Some("TRASH_SEPARATION_TALK".to_string()),
            fuzzy_not_found_key: "TRASH_NOT_FOUND_DEFAULT_MESSAGE".to_string(),
            congestion_select_template: "CONGESTION_SITUATION_SELECT_BUBBLE_TEMPLATE".to_string(),
            congestion_bubble_template: "CONGESTION_SITUATION_BUBBLE_TEMPLATE".to_string(),
            congestion_none_text: "CONGESTION_SITUATION_NONE_TEXT".to_string(),
            disaster_start: "BOSAI_FLOW_START".to_string(),
            disaster_end: "BACK_TO_NORMAL_MODE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CongestionConfig {
    /// Trailing phrases meaning "congestion status of <facility>".
    pub suffixes: Vec<String>,
    pub alt_text: String,
    pub labels: StatusLabels,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            suffixes: vec!["の混雑状況".to_string(), " congestion status".to_string()],
            alt_text: "Congestion status".to_string(),
            labels: StatusLabels::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StatusLabels {
    pub off_hours: String,
    pub open: String,
    pub moderate: String,
    pub congested: String,
    pub unknown: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            off_hours: "off-hours".to_string(),
            open: "open".to_string(),
            moderate: "moderate".to_string(),
            congested: "congested".to_string(),
            unknown: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Header shown on every candidate bubble; also the carousel alt text.
    pub prompt: String,
    #[serde(flatten)]
    pub options: MatchOptions,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            prompt: "What are you looking for?".to_string(),
            options: MatchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChatModeTexts {
    pub already_started: String,
    pub started: String,
}

impl Default for ChatModeTexts {
    fn default() -> Self {
        Self {
            already_started: "A consultation is already in progress.".to_string(),
            started: "Starting a consultation. An operator will be with you shortly.".to_string(),
        }
    }
}
