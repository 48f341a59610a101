//! Profile-shaped records read from the persisted store
//!
//! A record stored under the resolver's key maps profile names to
//! `{ "Settings": ..., "Caches": ... }`. Some writers store those two fields
//! as JSON strings rather than objects; [`JsonField`] resolves them once,
//! when the record is read.

use crate::value::ConfigValue;
use std::collections::BTreeMap;
use tracing::warn;

/// Persisted field that may still be serialized JSON text
#[derive(Debug, Clone, PartialEq)]
pub enum JsonField {
    /// Text that did not parse as JSON
    Raw(String),
    /// Structured value
    Parsed(ConfigValue),
}

impl JsonField {
    /// Resolve a stored field: strings are parsed, an empty string becomes `{}`,
    /// and malformed text stays [`JsonField::Raw`]
    pub fn resolve(value: ConfigValue) -> Self {
        match value {
            ConfigValue::String(text) if text.is_empty() => JsonField::Parsed(ConfigValue::object()),
            ConfigValue::String(text) => match ConfigValue::parse_json(&text) {
                Ok(parsed) => JsonField::Parsed(parsed),
                Err(e) => {
                    warn!(error = %e, "persisted field is not valid JSON, keeping raw text");
                    JsonField::Raw(text)
                }
            },
            other => JsonField::Parsed(other),
        }
    }

    /// Value to merge. Raw text is a string scalar.
    pub fn value(&self) -> ConfigValue {
        match self {
            JsonField::Raw(text) => ConfigValue::String(text.clone()),
            JsonField::Parsed(value) => value.clone(),
        }
    }

    /// Whether the field failed to parse
    pub fn is_raw(&self) -> bool {
        matches!(self, JsonField::Raw(_))
    }
}

/// Persisted `Settings` and `Caches` for one profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedProfile {
    /// User overrides for the profile's settings
    pub settings: Option<JsonField>,
    /// Runtime caches for the profile
    pub caches: Option<JsonField>,
}

/// Persisted record restricted to the profiles being resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedRecord {
    profiles: BTreeMap<String, PersistedProfile>,
    log_level: Option<String>,
}

impl PersistedRecord {
    /// Extract the named profiles from a stored record
    ///
    /// Anything that is not an object (including a missing record) yields an
    /// empty record.
    pub fn from_value<N: AsRef<str>>(record: Option<&ConfigValue>, names: &[N]) -> Self {
        let Some(tree) = record.and_then(ConfigValue::entries) else {
            return Self::default();
        };

        let profiles = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let fields = tree.get(name)?.entries()?;
                let profile = PersistedProfile {
                    settings: fields.get("Settings").cloned().map(JsonField::resolve),
                    caches: fields.get("Caches").cloned().map(JsonField::resolve),
                };
                Some((name.to_string(), profile))
            })
            .collect();
        let log_level = tree
            .get("LogLevel")
            .and_then(ConfigValue::as_str)
            .map(str::to_string);

        Self {
            profiles,
            log_level,
        }
    }

    /// Persisted data for `name`
    pub fn profile(&self, name: &str) -> Option<&PersistedProfile> {
        self.profiles.get(name)
    }

    /// Record-wide `LogLevel` stored beside the profiles
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    /// Whether no requested profile was found
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
