//! Leaf coercion for resolved settings
//!
//! Query-string arguments and hand-edited stores deliver every setting as a
//! string. After merging, leaves are normalized:
//!
//! - `"true"` / `"false"` become booleans
//! - strings containing `,` become sequences, each segment coerced on its own
//! - all-digit strings become integers
//! - everything else is left alone

use crate::value::ConfigValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Number;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("digit pattern is valid"));

/// Coerce every string leaf under `value`, depth first
///
/// Objects, maps and arrays are descended into; sets are left as they are so
/// coercion cannot collapse distinct elements.
pub fn coerce_leaves(value: &mut ConfigValue) {
    match value {
        ConfigValue::Object(tree) | ConfigValue::Map(tree) => {
            tree.values_mut().for_each(coerce_leaves);
        }
        ConfigValue::Array(items) => items.iter_mut().for_each(coerce_leaves),
        ConfigValue::String(text) => {
            let coerced = coerce_str(text);
            *value = coerced;
        }
        _ => {}
    }
}

/// Coerce a single string leaf
pub fn coerce_str(text: &str) -> ConfigValue {
    match text {
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        _ if text.contains(',') => {
            ConfigValue::Array(text.split(',').map(string_to_number).collect())
        }
        _ => string_to_number(text),
    }
}

/// All-digit strings become integers; anything else stays a string
pub fn string_to_number(text: &str) -> ConfigValue {
    if !DIGITS.is_match(text) {
        return ConfigValue::String(text.to_string());
    }
    match text.parse::<u64>() {
        Ok(n) => ConfigValue::Number(Number::from(n)),
        // Too large for u64: keep the magnitude as a float
        Err(_) => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(ConfigValue::Number)
            .unwrap_or_else(|| ConfigValue::String(text.to_string())),
    }
}
