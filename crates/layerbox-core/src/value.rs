//! Configuration value tree
//!
//! Every configuration layer (database profiles, persisted records, the host
//! argument) is expressed as a [`ConfigValue`]. Merging and path addressing
//! decide what to do from [`ConfigValue::kind`] and only then borrow the
//! variant's contents through accessors such as [`ConfigValue::entries`].
//!
//! At JSON boundaries `Map` serializes as an object, `Set` as an array, and
//! `Unset` entries are dropped from objects (or written as `null` elsewhere).

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Plain nested mapping of configuration keys to values
pub type ConfigTree = BTreeMap<String, ConfigValue>;

/// A node in a configuration tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ConfigValue {
    /// Key declared without a value. Never overwrites during a merge.
    #[default]
    Unset,
    /// Explicit null
    Null,
    /// Boolean leaf
    Bool(bool),
    /// Numeric leaf
    Number(Number),
    /// String leaf
    String(String),
    /// Ordered sequence
    Array(Vec<ConfigValue>),
    /// Plain nested mapping
    Object(ConfigTree),
    /// Keyed collection with its own identity (merged by entry union, not recursion)
    Map(ConfigTree),
    /// Collection of unique elements
    Set(Vec<ConfigValue>),
}

/// Runtime shape of a [`ConfigValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`ConfigValue::Unset`]
    Unset,
    /// [`ConfigValue::Null`]
    Null,
    /// Booleans, numbers and strings
    Scalar,
    /// [`ConfigValue::Array`]
    Sequence,
    /// [`ConfigValue::Set`]
    SetLike,
    /// [`ConfigValue::Map`]
    MapLike,
    /// [`ConfigValue::Object`]
    Plain,
}

impl ValueKind {
    /// Whether values of this kind can hold children
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ValueKind::Sequence | ValueKind::SetLike | ValueKind::MapLike | ValueKind::Plain
        )
    }

    /// Whether values of this kind address their children by string key
    pub fn is_keyed(self) -> bool {
        matches!(self, ValueKind::MapLike | ValueKind::Plain)
    }
}

impl ConfigValue {
    /// Create an empty plain object
    pub fn object() -> Self {
        ConfigValue::Object(ConfigTree::new())
    }

    /// Create an empty array
    pub fn array() -> Self {
        ConfigValue::Array(Vec::new())
    }

    /// Classify this value's shape
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::Unset => ValueKind::Unset,
            ConfigValue::Null => ValueKind::Null,
            ConfigValue::Bool(_) | ConfigValue::Number(_) | ConfigValue::String(_) => {
                ValueKind::Scalar
            }
            ConfigValue::Array(_) => ValueKind::Sequence,
            ConfigValue::Set(_) => ValueKind::SetLike,
            ConfigValue::Map(_) => ValueKind::MapLike,
            ConfigValue::Object(_) => ValueKind::Plain,
        }
    }

    /// Anything other than [`ConfigValue::Unset`]
    pub fn is_defined(&self) -> bool {
        !matches!(self, ConfigValue::Unset)
    }

    /// Neither unset nor null
    pub fn is_present(&self) -> bool {
        !matches!(self, ConfigValue::Unset | ConfigValue::Null)
    }

    /// Empty array, map or set
    pub fn is_empty_collection(&self) -> bool {
        match self {
            ConfigValue::Array(items) | ConfigValue::Set(items) => items.is_empty(),
            ConfigValue::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Entries of an object or map
    pub fn entries(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Object(tree) | ConfigValue::Map(tree) => Some(tree),
            _ => None,
        }
    }

    /// Mutable entries of an object or map
    pub fn entries_mut(&mut self) -> Option<&mut ConfigTree> {
        match self {
            ConfigValue::Object(tree) | ConfigValue::Map(tree) => Some(tree),
            _ => None,
        }
    }

    /// Borrow as a plain object
    pub fn as_object(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Object(tree) => Some(tree),
            _ => None,
        }
    }

    /// Borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Borrow as a sequence
    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Mutable elements of a sequence
    pub fn items_mut(&mut self) -> Option<&mut Vec<ConfigValue>> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Parse JSON text into a value
    pub fn parse_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Value>(text).map(ConfigValue::from)
    }

    /// Parse JSON text, keeping the original string when it is not valid JSON
    pub fn parse_lenient(text: impl Into<String>) -> Self {
        let text = text.into();
        match Self::parse_json(&text) {
            Ok(value) => value,
            Err(_) => ConfigValue::String(text),
        }
    }

    /// Convert into a `serde_json::Value`
    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

/// Add `value` to a set unless an equal element is already there
pub(crate) fn insert_unique(set: &mut Vec<ConfigValue>, value: ConfigValue) {
    if !set.contains(&value) {
        set.push(value);
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => ConfigValue::Number(n),
            Value::String(s) => ConfigValue::String(s),
            Value::Array(items) => {
                ConfigValue::Array(items.into_iter().map(ConfigValue::from).collect())
            }
            Value::Object(map) => ConfigValue::Object(
                map.into_iter()
                    .map(|(key, value)| (key, ConfigValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<ConfigValue> for Value {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::Unset | ConfigValue::Null => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(b),
            ConfigValue::Number(n) => Value::Number(n),
            ConfigValue::String(s) => Value::String(s),
            ConfigValue::Array(items) | ConfigValue::Set(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            ConfigValue::Object(tree) | ConfigValue::Map(tree) => {
                let map: JsonMap<String, Value> = tree
                    .into_iter()
                    .filter(|(_, value)| value.is_defined())
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect();
                Value::Object(map)
            }
        }
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(tree: ConfigTree) -> Self {
        ConfigValue::Object(tree)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> Self {
        ConfigValue::Array(items)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i32> for ConfigValue {
    fn from(n: i32) -> Self {
        ConfigValue::Number(Number::from(n))
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Number(Number::from(n))
    }
}

impl From<u64> for ConfigValue {
    fn from(n: u64) -> Self {
        ConfigValue::Number(Number::from(n))
    }
}

impl From<f64> for ConfigValue {
    /// Non-finite floats have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        Number::from_f64(n)
            .map(ConfigValue::Number)
            .unwrap_or(ConfigValue::Null)
    }
}
