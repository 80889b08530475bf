use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content discriminator. Every variant the engine can render has a generator;
/// `Other` keeps the stored name of types it cannot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Text,
    Buttons,
    Imagemap,
    Carousel,
    BubbleFlex,
    CarouselFlex,
    Confirm,
    CompositeMessage,
    ApiCall,
    TextMapping,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Text => "text",
            DataType::Buttons => "buttons",
            DataType::Imagemap => "imagemap",
            DataType::Carousel => "carousel",
            DataType::BubbleFlex => "bubbleFlex",
            DataType::CarouselFlex => "carouselFlex",
            DataType::Confirm => "confirm",
            DataType::CompositeMessage => "compositeMessage",
            DataType::ApiCall => "apiCall",
            DataType::TextMapping => "textMapping",
            DataType::Other(name) => name,
        }
    }

    /// Types rendered as visual templates; the platform requires an alt text for them.
    pub fn takes_alt_text(&self) -> bool {
        matches!(
            self,
            DataType::Buttons
                | DataType::Imagemap
                | DataType::Carousel
                | DataType::BubbleFlex
                | DataType::CarouselFlex
                | DataType::Confirm
        )
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => DataType::Text,
            "buttons" => DataType::Buttons,
            "imagemap" => DataType::Imagemap,
            "carousel" => DataType::Carousel,
            "bubbleFlex" => DataType::BubbleFlex,
            "carouselFlex" => DataType::CarouselFlex,
            "confirm" => DataType::Confirm,
            "compositeMessage" => DataType::CompositeMessage,
            "apiCall" => DataType::ApiCall,
            "textMapping" => DataType::TextMapping,
            _ => DataType::Other(value),
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    /// Partition key (`scenarioId#version[#locale]`).
    pub scenario: String,
    pub data_id: String,
    pub data_type: DataType,
    #[serde(default)]
    pub params: Value,
    #[serde(default, rename = "nameLBD", skip_serializing_if = "Option::is_none")]
    pub name_lbd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<Value>,
    /// Child data ids of a composite message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub text_mapping: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentRecord {
    pub fn new(scenario: impl Into<String>, data_id: impl Into<String>, data_type: DataType, params: Value) -> Self {
        Self {
            scenario: scenario.into(),
            data_id: data_id.into(),
            data_type,
            params,
            name_lbd: None,
            quick_reply: None,
            messages: Vec::new(),
            function: None,
            parameters: Map::new(),
            text_mapping: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn extra_flag(&self, key: &str) -> bool {
        self.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Some(Environment::Production),
            "sandbox" => Some(Environment::Sandbox),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub active_scenario_id: String,
    /// Environment name to scenario version.
    #[serde(default)]
    pub env_mapping: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_menus: Option<RichMenus>,
    #[serde(default)]
    pub bosai_mode: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn version_for(&self, environment: Environment) -> Option<&str> {
        self.env_mapping
            .get(environment.as_str())
            .map(String::as_str)
            .filter(|version| !version.is_empty())
    }

    pub fn disaster_mode(&self, environment: Environment) -> bool {
        self.bosai_mode
            .get(environment.as_str())
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RichMenus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_production: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bosai_production: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sandbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bosai_sandbox: Option<String>,
}

impl RichMenus {
    /// `(normal, disaster)` menu ids for the environment.
    pub fn for_environment(&self, environment: Environment) -> (Option<&str>, Option<&str>) {
        let (normal, disaster) = match environment {
            Environment::Production => (&self.default_production, &self.bosai_production),
            Environment::Sandbox => (&self.default_sandbox, &self.bosai_sandbox),
        };
        (
            normal.as_deref().filter(|id| !id.is_empty()),
            disaster.as_deref().filter(|id| !id.is_empty()),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub facility_name: String,
    #[serde(default)]
    pub space: Vec<FacilitySpace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_message: Option<SelectMessage>,
}

impl Facility {
    pub fn enabled_spaces(&self) -> impl Iterator<Item = &FacilitySpace> {
        self.space.iter().filter(|space| !space.disabled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacilitySpace {
    pub space_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpaceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<f64>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpaceStatus {
    Code(i64),
    Named {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
}

/// Per-facility overrides of the selector bubble.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectMessage {
    #[serde(default)]
    pub disabled: bool,
    /// Use `param` instead of the stored selector template.
    #[serde(default)]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_custom_button: bool,
}

impl SelectMessage {
    /// Custom JSON selectors and custom-button selectors are used as authored.
    pub fn keeps_authored_buttons(&self) -> bool {
        self.kind.as_deref() == Some("json") || self.is_custom_button
    }
}

/// A human operator hand-off. Open while `to_date` is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub from_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<i64>,
}

impl HandoffRecord {
    pub fn is_open(&self) -> bool {
        self.to_date.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_content_id: Option<String>,
}
