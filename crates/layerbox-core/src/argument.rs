//! Host argument normalization
//!
//! Hosts hand scripts a single invocation argument: either a query string
//! (`Mode=on&Count=1`) or a shallow object whose keys may be dotted paths.
//! Both forms normalize to a nested [`ConfigValue`] object; values stay raw
//! strings until the resolver's coercion pass.

use crate::error::{ResolveError, ResolveResult};
use crate::path::set;
use crate::value::{ConfigTree, ConfigValue};
use serde_json::Value;
use tracing::debug;

/// Invocation argument supplied by the host
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Argument {
    /// No argument was supplied
    #[default]
    Absent,
    /// `key=value&key2=value2` query string
    Query(String),
    /// Shallow mapping whose keys are path expressions
    Fields(ConfigTree),
}

impl Argument {
    /// Expand the argument into a nested tree
    ///
    /// Absent input yields an empty object. The argument itself is not modified.
    pub fn normalize(&self) -> ConfigValue {
        let mut normalized = ConfigValue::object();
        match self {
            Argument::Absent => {}
            Argument::Query(query) => {
                for (key, value) in parse_query(query) {
                    set(&mut normalized, key.as_str(), value);
                }
            }
            Argument::Fields(fields) => {
                for (key, value) in fields {
                    set(&mut normalized, key.as_str(), value.clone());
                }
            }
        }
        debug!(argument = %normalized, "normalized host argument");
        normalized
    }

    /// Whether no argument was supplied
    pub fn is_absent(&self) -> bool {
        matches!(self, Argument::Absent)
    }
}

/// Split a query string into flat `(key, value)` pairs
///
/// Pairs split on the first `=` only, and every `"` is stripped from both
/// sides. A pair without `=` is declared with an [`ConfigValue::Unset`] value.
/// Empty keys are skipped and later duplicates replace earlier ones.
pub fn parse_query(query: &str) -> ConfigTree {
    let mut pairs = ConfigTree::new();
    for item in query.split('&') {
        let (key, value) = match item.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (item, None),
        };
        let key = key.replace('"', "");
        if key.is_empty() {
            continue;
        }
        let value = value
            .map(|v| ConfigValue::String(v.replace('"', "")))
            .unwrap_or(ConfigValue::Unset);
        pairs.insert(key, value);
    }
    pairs
}

impl From<&str> for Argument {
    fn from(query: &str) -> Self {
        Argument::Query(query.to_string())
    }
}

impl From<String> for Argument {
    fn from(query: String) -> Self {
        Argument::Query(query)
    }
}

impl From<ConfigTree> for Argument {
    fn from(fields: ConfigTree) -> Self {
        Argument::Fields(fields)
    }
}

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(argument: Option<T>) -> Self {
        argument.map(Into::into).unwrap_or_default()
    }
}

impl TryFrom<Value> for Argument {
    type Error = ResolveError;

    /// Accept null, a string or an object; anything else violates the host contract
    fn try_from(value: Value) -> ResolveResult<Self> {
        match value {
            Value::Null => Ok(Argument::Absent),
            Value::String(query) => Ok(Argument::Query(query)),
            Value::Object(map) => Ok(Argument::Fields(
                map.into_iter()
                    .map(|(key, value)| (key, ConfigValue::from(value)))
                    .collect(),
            )),
            other => Err(ResolveError::InvalidArgument(other.to_string())),
        }
    }
}

impl TryFrom<ConfigValue> for Argument {
    type Error = ResolveError;

    fn try_from(value: ConfigValue) -> ResolveResult<Self> {
        match value {
            ConfigValue::Unset | ConfigValue::Null => Ok(Argument::Absent),
            ConfigValue::String(query) => Ok(Argument::Query(query)),
            ConfigValue::Object(fields) | ConfigValue::Map(fields) => Ok(Argument::Fields(fields)),
            other => Err(ResolveError::InvalidArgument(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_query_string() {
        let normalized = Argument::from("foo=bar&count=1").normalize();
        assert_eq!(normalized, ConfigValue::from(json!({ "foo": "bar", "count": "1" })));
    }

    #[test]
    fn strips_quotes_and_keeps_extra_equals_in_value() {
        let normalized = Argument::from(r#""Title"="a=b"&Token=x==y"#).normalize();
        assert_eq!(
            normalized,
            ConfigValue::from(json!({ "Title": "a=b", "Token": "x==y" }))
        );
    }

    #[test]
    fn expands_dotted_keys() {
        let argument = Argument::try_from(json!({ "nested.value": "ok" })).unwrap();
        assert_eq!(
            argument.normalize(),
            ConfigValue::from(json!({ "nested": { "value": "ok" } }))
        );

        let from_query = Argument::from("Settings.Switch=true&List[1]=b").normalize();
        assert_eq!(
            from_query.to_json(),
            json!({ "Settings": { "Switch": "true" }, "List": [null, "b"] })
        );
    }

    #[test]
    fn does_not_mutate_object_input() {
        let argument = Argument::try_from(json!({ "nested.value": "ok" })).unwrap();
        let before = argument.clone();
        let _ = argument.normalize();
        assert_eq!(argument, before);
    }

    #[test]
    fn absent_yields_empty_tree() {
        assert_eq!(Argument::Absent.normalize(), ConfigValue::object());
        assert_eq!(Argument::try_from(json!(null)).unwrap(), Argument::Absent);
        assert_eq!(Argument::from(None::<&str>), Argument::Absent);
    }

    #[test]
    fn key_without_value_is_declared_unset() {
        let pairs = parse_query("flag&mode=on&&=orphan");
        assert_eq!(pairs.get("flag"), Some(&ConfigValue::Unset));
        assert_eq!(pairs.get("mode"), Some(&ConfigValue::from("on")));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn rejects_non_string_non_object_values() {
        for bad in [json!(42), json!(true), json!([1, 2])] {
            let result = Argument::try_from(bad);
            assert!(matches!(result, Err(ResolveError::InvalidArgument(_))));
        }
    }
}
