//! Persisted key-value store with nested addressing
//!
//! Host storage only offers whole-string reads and writes per flat key. The
//! [`PersistedStore`] layers two conventions on top of a [`HostStore`]:
//!
//! - Values cross the host boundary as JSON text. Reads that fail to parse
//!   come back as the raw string.
//! - Names of the form `@base.path` address a value nested inside the JSON
//!   record stored under `base`. Every nested write is a read-modify-write of
//!   the whole record.
//!
//! ```rust
//! use layerbox_core::{ConfigValue, MemoryStore, PersistedStore};
//!
//! let mut store = PersistedStore::new(MemoryStore::new());
//! store.set_item("@box.a.b", &ConfigValue::from(1))?;
//!
//! assert_eq!(store.get_item("@box.a.b")?, Some(ConfigValue::from(1)));
//! # Ok::<(), layerbox_core::StorageError>(())
//! ```

mod file;
mod memory;
mod record;

pub use file::{FileStore, DEFAULT_DATA_FILE};
pub use memory::MemoryStore;
pub use record::{JsonField, PersistedProfile, PersistedRecord};

use crate::error::{StorageError, StorageResult};
use crate::path::{get, set, unset};
use crate::value::ConfigValue;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

static NESTED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?P<base>[^.]+)(?:\.(?P<path>.*))?$").expect("nested name pattern is valid")
});

/// Flat string storage provided by the host
///
/// Each operation is atomic per key. Backends that cannot remove or clear
/// keep the default implementations, which report `false`.
pub trait HostStore {
    /// Read the raw string stored under `key`
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`. Returns true if the host accepted the write.
    fn write(&mut self, key: &str, value: &str) -> StorageResult<bool>;

    /// Remove `key`. Returns true if the host removed it.
    fn remove(&mut self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    /// Remove every key. Returns true if the host cleared its storage.
    fn clear(&mut self) -> StorageResult<bool> {
        Ok(false)
    }
}

impl<T: HostStore + ?Sized> HostStore for &mut T {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> StorageResult<bool> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> StorageResult<bool> {
        (**self).clear()
    }
}

impl<T: HostStore + ?Sized> HostStore for Box<T> {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> StorageResult<bool> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> StorageResult<bool> {
        (**self).clear()
    }
}

/// Parsed item name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemName<'a> {
    /// Plain host key
    Flat(&'a str),
    /// `@base` or `@base.path`
    Nested { base: &'a str, path: Option<&'a str> },
}

impl<'a> ItemName<'a> {
    fn parse(name: &'a str) -> StorageResult<Self> {
        if !name.starts_with('@') {
            return Ok(ItemName::Flat(name));
        }
        let captures = NESTED_NAME
            .captures(name)
            .ok_or_else(|| StorageError::InvalidName(name.to_string()))?;
        let base = captures
            .name("base")
            .map(|m| m.as_str())
            .ok_or_else(|| StorageError::InvalidName(name.to_string()))?;
        let path = captures
            .name("path")
            .map(|m| m.as_str())
            .filter(|path| !path.is_empty());
        Ok(ItemName::Nested { base, path })
    }
}

/// Text written to the host for `value`
///
/// Containers and null are JSON-encoded; strings are written as-is and other
/// scalars as their plain text.
fn encode_for_host(value: &ConfigValue) -> StorageResult<String> {
    Ok(match value {
        ConfigValue::String(s) => s.clone(),
        ConfigValue::Bool(b) => b.to_string(),
        ConfigValue::Number(n) => n.to_string(),
        other => serde_json::to_string(other)?,
    })
}

/// Store exposing `get_item` / `set_item` / `remove_item` / `clear` over a host backend
#[derive(Debug, Clone, Default)]
pub struct PersistedStore<S> {
    backend: S,
}

impl<S: HostStore> PersistedStore<S> {
    /// Wrap a host backend
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Borrow the backend
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Mutably borrow the backend
    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Unwrap the backend
    pub fn into_inner(self) -> S {
        self.backend
    }

    /// Read an item
    ///
    /// Returns `None` when the key is missing or holds JSON `null`.
    pub fn get_item(&self, name: &str) -> StorageResult<Option<ConfigValue>> {
        let value = match ItemName::parse(name)? {
            ItemName::Flat(key) => self
                .backend
                .read(key)?
                .map(ConfigValue::parse_lenient),
            ItemName::Nested { base, path } => {
                let record = self.read_record(base)?;
                match path {
                    None => Some(record),
                    Some(path) => get(&record, path).cloned().map(|value| match value {
                        ConfigValue::String(text) => ConfigValue::parse_lenient(text),
                        other => other,
                    }),
                }
            }
        };
        trace!(name, found = value.is_some(), "get_item");
        Ok(value.filter(ConfigValue::is_present))
    }

    /// Read an item, falling back to `default` when absent
    pub fn get_item_or(&self, name: &str, default: ConfigValue) -> StorageResult<ConfigValue> {
        Ok(self.get_item(name)?.unwrap_or(default))
    }

    /// Write an item. Returns the host's acknowledgement.
    pub fn set_item(&mut self, name: &str, value: &ConfigValue) -> StorageResult<bool> {
        match ItemName::parse(name)? {
            ItemName::Flat(key) => {
                let text = encode_for_host(value)?;
                debug!(key, bytes = text.len(), "writing store item");
                self.backend.write(key, &text)
            }
            ItemName::Nested { base, path: None } => self.set_item(base, value),
            ItemName::Nested {
                base,
                path: Some(path),
            } => {
                let mut record = self.read_record(base)?;
                set(&mut record, path, value.clone());
                self.set_item(base, &record)
            }
        }
    }

    /// Remove an item. Returns the host's acknowledgement.
    ///
    /// For `@base.path` names the whole record is written back even when the
    /// path did not exist.
    pub fn remove_item(&mut self, name: &str) -> StorageResult<bool> {
        match ItemName::parse(name)? {
            ItemName::Flat(key) | ItemName::Nested { base: key, path: None } => {
                debug!(key, "removing store item");
                self.backend.remove(key)
            }
            ItemName::Nested {
                base,
                path: Some(path),
            } => {
                let mut record = self.read_record(base)?;
                if !unset(&mut record, path) {
                    trace!(base, path, "nested path not reachable");
                }
                self.set_item(base, &record)
            }
        }
    }

    /// Clear the whole host store. Returns the host's acknowledgement.
    pub fn clear(&mut self) -> StorageResult<bool> {
        debug!("clearing store");
        self.backend.clear()
    }

    /// Whole record under `base`, coerced to an object
    fn read_record(&self, base: &str) -> StorageResult<ConfigValue> {
        Ok(match self.get_item(base)? {
            Some(record @ ConfigValue::Object(_)) => record,
            Some(other) => {
                trace!(base, kind = ?other.kind(), "record is not an object, treating as empty");
                ConfigValue::object()
            }
            None => ConfigValue::object(),
        })
    }
}
