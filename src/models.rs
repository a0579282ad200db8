//! Core data models for the assistant

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

//
// ================= Entities =================
//

/// A single extracted entity field.
///
/// The language model returns untyped JSON; each field is coerced at the
/// extraction boundary so downstream code never sees malformed shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityValue {
    #[default]
    Absent,
    One(String),
    Many(Vec<String>),
}

impl EntityValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, EntityValue::Absent)
    }

    /// First value, if any. Used where the provider accepts a single key.
    pub fn primary(&self) -> Option<&str> {
        match self {
            EntityValue::Absent => None,
            EntityValue::One(s) => Some(s),
            EntityValue::Many(items) => items.first().map(String::as_str),
        }
    }

    /// All values as a flat list. Absent yields an empty list.
    pub fn terms(&self) -> Vec<&str> {
        match self {
            EntityValue::Absent => vec![],
            EntityValue::One(s) => vec![s.as_str()],
            EntityValue::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Coerce an arbitrary JSON value.
    ///
    /// null / missing / empty → Absent; string → One; array → Many with
    /// non-string elements dropped; anything else → Absent.
    pub fn coerce(value: &Value) -> Self {
        match value {
            Value::String(s) if !s.trim().is_empty() => EntityValue::One(s.clone()),
            Value::Array(items) => {
                let strings: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .collect();
                if strings.is_empty() {
                    EntityValue::Absent
                } else {
                    EntityValue::Many(strings)
                }
            }
            _ => EntityValue::Absent,
        }
    }
}

impl Serialize for EntityValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            EntityValue::Absent => serializer.serialize_none(),
            EntityValue::One(s) => serializer.serialize_str(s),
            EntityValue::Many(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EntityValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(EntityValue::coerce(&value))
    }
}

/// Structured extraction of financial identifiers from a free-text query.
///
/// Unknown keys in the model's output are ignored; known keys with
/// malformed values coerce to Absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub ticker: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub index_name: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub sector: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub industry: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub region: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub asset_type: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub market: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub from_currency: EntityValue,
    #[serde(default, skip_serializing_if = "EntityValue::is_absent")]
    pub to_currency: EntityValue,
}

impl EntitySet {
    /// Build from an arbitrary JSON value; anything that is not an object
    /// yields the empty set.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.ticker.is_absent()
            && self.index_name.is_absent()
            && self.sector.is_absent()
            && self.industry.is_absent()
            && self.region.is_absent()
            && self.asset_type.is_absent()
            && self.market.is_absent()
            && self.from_currency.is_absent()
            && self.to_currency.is_absent()
    }
}

//
// ================= Request Context =================
//

/// Per-request context carrying the ordered log sequence returned to the
/// caller. Freshly allocated per orchestration call; no shared state.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub logs: Vec<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            logs: Vec::new(),
        }
    }

    /// Append a log entry, mirroring it to tracing.
    pub fn log(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        info!(request_id = %self.request_id, "{}", entry);
        self.logs.push(entry);
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Synthesis =================
//

/// Parsed output of the answer synthesizer.
///
/// `response` is `None` only when the model returned a JSON object that
/// lacked a response field; the orchestrator substitutes the fixed
/// fallback narrative in that case.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutcome {
    pub plan: Vec<Value>,
    pub response: Option<String>,
    pub logs: Vec<String>,
}

//
// ================= Request / Result =================
//

/// One orchestration request. Credentials arrive with the request, not
/// from process configuration.
#[derive(Debug, Clone)]
pub struct AssistantRequest {
    pub query: String,
    pub gemini_api_key: String,
    pub elevenlabs_api_key: String,
    pub voice_id: String,
}

/// Final payload of one orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub text: String,
    pub audio_bytes: Option<Vec<u8>>,
    pub logs: Vec<String>,
    pub plan: Vec<Value>,
    pub data: Map<String, Value>,
}
