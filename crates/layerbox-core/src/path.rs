//! Dotted/bracket path addressing
//!
//! Paths such as `a.b[0].c` address nested values inside a [`ConfigValue`]
//! tree. Lookups never fail: walking through a scalar, null or missing node
//! simply yields nothing. Writes create intermediate containers on demand.
//!
//! ```rust
//! use layerbox_core::{get, set, to_path, ConfigValue};
//!
//! let mut root = ConfigValue::object();
//! set(&mut root, "a.b[0].c", ConfigValue::from(5));
//!
//! assert_eq!(get(&root, "a.b[0].c"), Some(&ConfigValue::from(5)));
//! assert_eq!(to_path("a[0].b").segments(), ["a", "0", "b"]);
//! ```

use crate::value::{ConfigTree, ConfigValue, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::{trace, warn};

static BRACKET_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([0-9]+)\]").expect("bracket index pattern is valid"));

/// Highest array index `set` will pad up to
const MAX_ARRAY_INDEX: usize = u16::MAX as usize;

/// Ordered path segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a path expression: `[N]` becomes `.N`, split on `.`, drop empty segments
    pub fn parse(expr: &str) -> Self {
        let dotted = BRACKET_INDEX.replace_all(expr, ".$1");
        let segments = dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// The parsed segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the path has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(expr: &str) -> Self {
        Path::parse(expr)
    }
}

impl From<&String> for Path {
    fn from(expr: &String) -> Self {
        Path::parse(expr)
    }
}

impl From<String> for Path {
    fn from(expr: String) -> Self {
        Path::parse(&expr)
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Self {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Parse a path expression into segments
pub fn to_path(expr: &str) -> Path {
    Path::parse(expr)
}

/// A segment made only of ASCII digits
pub(crate) fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Canonical array index (`"0"`, `"12"`, never `"01"`)
fn index_of(segment: &str) -> Option<usize> {
    let index: usize = segment.parse().ok()?;
    (index.to_string() == segment).then_some(index)
}

fn child<'a>(node: &'a ConfigValue, segment: &str) -> Option<&'a ConfigValue> {
    match node.kind() {
        kind if kind.is_keyed() => node.entries()?.get(segment),
        ValueKind::Sequence => node.as_array()?.get(index_of(segment)?),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut ConfigValue, segment: &str) -> Option<&'a mut ConfigValue> {
    match node.kind() {
        kind if kind.is_keyed() => node.entries_mut()?.get_mut(segment),
        ValueKind::Sequence => node.items_mut()?.get_mut(index_of(segment)?),
        _ => None,
    }
}

/// Slot for `segment`, created as `Unset` in mappings and padded with `Null` in arrays
fn slot_mut<'a>(node: &'a mut ConfigValue, segment: &str) -> Option<&'a mut ConfigValue> {
    match node.kind() {
        kind if kind.is_keyed() => {
            Some(node.entries_mut()?.entry(segment.to_string()).or_default())
        }
        ValueKind::Sequence => {
            let Some(index) = index_of(segment) else {
                trace!(segment, "array cannot be addressed by a non-index segment");
                return None;
            };
            if index > MAX_ARRAY_INDEX {
                warn!(index, "refusing to pad array beyond maximum index");
                return None;
            }
            let items = node.items_mut()?;
            if index >= items.len() {
                items.resize(index + 1, ConfigValue::Null);
            }
            items.get_mut(index)
        }
        kind => {
            trace!(segment, ?kind, "cannot address child of this value");
            None
        }
    }
}

/// Look up the value at `path`
///
/// Returns `None` when any step walks through a scalar, null or missing node,
/// or when the final value is [`ConfigValue::Unset`].
pub fn get<'a>(root: &'a ConfigValue, path: impl Into<Path>) -> Option<&'a ConfigValue> {
    let path = path.into();
    let mut current = root;
    for segment in path.segments() {
        current = child(current, segment)?;
    }
    current.is_defined().then_some(current)
}

/// Look up the value at `path`, falling back to `default` when absent
pub fn get_or(root: &ConfigValue, path: impl Into<Path>, default: ConfigValue) -> ConfigValue {
    get(root, path).cloned().unwrap_or(default)
}

/// Assign `value` at `path`, creating intermediate containers
///
/// An intermediate node that is not already a container is replaced by an
/// empty array when the following segment is all digits, otherwise by an
/// empty object. The leaf is overwritten, never merged. Writing past the end
/// of an array pads it with null. An empty path, a scalar root, a non-index
/// segment into an array or any segment into a set leaves the tree untouched.
pub fn set(root: &mut ConfigValue, path: impl Into<Path>, value: ConfigValue) -> &mut ConfigValue {
    let path = path.into();
    if let Some((leaf, parents)) = path.segments().split_last() {
        if root.kind().is_container() {
            assign(root, parents, leaf, value);
        } else {
            trace!(%path, kind = ?root.kind(), "set on non-container root ignored");
        }
    }
    root
}

fn assign(root: &mut ConfigValue, parents: &[String], leaf: &str, value: ConfigValue) {
    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        let next = parents.get(i + 1).map_or(leaf, String::as_str);
        let Some(slot) = slot_mut(current, segment) else {
            return;
        };
        if !slot.kind().is_container() {
            *slot = if is_index(next) {
                ConfigValue::array()
            } else {
                ConfigValue::object()
            };
        }
        current = slot;
    }
    if let Some(slot) = slot_mut(current, leaf) {
        *slot = value;
    }
}

/// Remove the value at `path`
///
/// Returns `true` when the leaf's parent is a container, whether or not the
/// leaf existed, and `false` when the walk stops at a scalar or missing node.
/// Array elements become [`ConfigValue::Unset`] holes so later indices keep
/// their position.
pub fn unset(root: &mut ConfigValue, path: impl Into<Path>) -> bool {
    let path = path.into();
    let Some((leaf, parents)) = path.segments().split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        match child_mut(current, segment) {
            Some(next) => current = next,
            None => return false,
        }
    }

    match current {
        ConfigValue::Object(tree) | ConfigValue::Map(tree) => {
            tree.remove(leaf.as_str());
            true
        }
        ConfigValue::Array(items) => {
            if let Some(item) = index_of(leaf).and_then(|i| items.get_mut(i)) {
                *item = ConfigValue::Unset;
            }
            true
        }
        ConfigValue::Set(_) => true,
        _ => false,
    }
}

/// New object holding only the listed top-level keys of `root`
pub fn pick<K: AsRef<str>>(root: &ConfigValue, keys: &[K]) -> ConfigValue {
    let picked: ConfigTree = root
        .entries()
        .map(|tree| {
            tree.iter()
                .filter(|(key, _)| keys.iter().any(|k| k.as_ref() == key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();
    ConfigValue::Object(picked)
}

/// Remove every listed path from `root`
pub fn omit<'r, P: AsRef<str>>(root: &'r mut ConfigValue, paths: &[P]) -> &'r mut ConfigValue {
    for path in paths {
        unset(root, path.as_ref());
    }
    root
}
