//! Deep merge of configuration layers
//!
//! Sources are applied left to right onto a target; later sources win at the
//! same key. Collision handling depends on the shapes involved:
//!
//! | source | target | result |
//! |---|---|---|
//! | object | object | recurse |
//! | map | map | union entries (empty source is a no-op) |
//! | set | set | union elements (empty source is a no-op) |
//! | empty array/map/set | anything defined | keep target |
//! | unset | anything | keep target |
//! | anything else | anything | replace |
//!
//! An empty collection therefore never erases data from a lower layer, while
//! a non-empty one always wins.

use crate::value::{insert_unique, ConfigTree, ConfigValue, ValueKind};
use tracing::trace;

/// Merge `sources` into `target` in order, returning `target`
///
/// A target that is not an object or map is returned unchanged, and sources
/// that are not objects or maps (including null and unset) are skipped.
///
/// ```rust
/// use layerbox_core::{merge, ConfigValue};
/// use serde_json::json;
///
/// let mut target = ConfigValue::from(json!({ "a": { "b": 1, "c": 2 } }));
/// let source = ConfigValue::from(json!({ "a": { "d": 3 } }));
///
/// merge(&mut target, [&source]);
/// assert_eq!(target, ConfigValue::from(json!({ "a": { "b": 1, "c": 2, "d": 3 } })));
/// ```
pub fn merge<'a, I>(target: &mut ConfigValue, sources: I) -> &mut ConfigValue
where
    I: IntoIterator<Item = &'a ConfigValue>,
{
    if !target.kind().is_keyed() {
        trace!(kind = ?target.kind(), "merge target is not keyed, leaving unchanged");
        return target;
    }

    for source in sources {
        match (target.entries_mut(), source.entries()) {
            (Some(target_tree), Some(source_tree)) => merge_tree(target_tree, source_tree),
            (_, None) => trace!(kind = ?source.kind(), "skipping non-keyed merge source"),
            (None, _) => {}
        }
    }

    target
}

/// Merge one source mapping into a target mapping
pub fn merge_tree(target: &mut ConfigTree, source: &ConfigTree) {
    for (key, incoming) in source {
        let existing = target.get(key).map_or(ValueKind::Unset, ConfigValue::kind);

        match (incoming.kind(), existing) {
            (ValueKind::Unset, _) => {}
            (ValueKind::Plain, ValueKind::Plain)
            | (ValueKind::MapLike, ValueKind::MapLike)
            | (ValueKind::SetLike, ValueKind::SetLike) => {
                if let Some(slot) = target.get_mut(key) {
                    fold_same_kind(slot, incoming);
                }
            }
            (_, existing) if incoming.is_empty_collection() && existing != ValueKind::Unset => {
                trace!(key, "empty collection does not overwrite existing value");
            }
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Combine two values already known to share a container kind
fn fold_same_kind(existing: &mut ConfigValue, incoming: &ConfigValue) {
    match (existing, incoming) {
        (ConfigValue::Object(existing), ConfigValue::Object(incoming)) => {
            merge_tree(existing, incoming);
        }
        (ConfigValue::Map(existing), ConfigValue::Map(incoming)) => {
            existing.extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        (ConfigValue::Set(existing), ConfigValue::Set(incoming)) => {
            for element in incoming {
                insert_unique(existing, element.clone());
            }
        }
        _ => {}
    }
}
