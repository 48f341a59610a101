//! JSON data-file backend
//!
//! Persists every key of the host store in a single JSON object on disk,
//! `box.dat` by default. Values are kept as the text the store layer wrote.

use super::HostStore;
use crate::error::StorageResult;
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default data file name, resolved against the working directory
pub const DEFAULT_DATA_FILE: &str = "box.dat";

type Entries = BTreeMap<String, Value>;

/// JSON data-file backend
///
/// The file holds a single JSON object mapping each key to its stored text.
/// It is loaded on first access and cached; every write rewrites the whole
/// file. A missing or corrupt file reads as empty. On unix the file is
/// created with owner-only permissions since stores commonly hold tokens.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: OnceCell<Entries>,
}

impl FileStore {
    /// Create a store backed by `path`. Nothing is read until first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: OnceCell::new(),
        }
    }

    /// Default data file path: `./box.dat`
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_DATA_FILE)
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the cached copy so the next access re-reads the file
    pub fn reload(&mut self) {
        self.entries = OnceCell::new();
    }

    fn entries(&self) -> StorageResult<&Entries> {
        if let Some(entries) = self.entries.get() {
            return Ok(entries);
        }
        let loaded = Self::load(&self.path)?;
        Ok(self.entries.get_or_init(|| loaded))
    }

    fn load(path: &Path) -> StorageResult<Entries> {
        if !path.exists() {
            debug!(path = %path.display(), "data file not found, starting empty");
            return Ok(Entries::new());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "Failed to parse data file at {}: {}. Treating as empty.",
                    path.display(),
                    e
                );
                Ok(Entries::new())
            }
        }
    }

    fn persist(&self, entries: &Entries) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(entries)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        debug!(path = %self.path.display(), keys = entries.len(), "data file written");
        Ok(())
    }

    /// Apply `change` to a copy of the entries, persisting when it reports a change
    fn update(&mut self, change: impl FnOnce(&mut Entries) -> bool) -> StorageResult<bool> {
        let mut entries = self.entries()?.clone();
        let changed = change(&mut entries);
        if changed {
            self.persist(&entries)?;
            self.entries = OnceCell::from(entries);
        }
        Ok(changed)
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl HostStore for FileStore {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries()?.get(key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }

    fn write(&mut self, key: &str, value: &str) -> StorageResult<bool> {
        self.update(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
            true
        })
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn clear(&mut self) -> StorageResult<bool> {
        self.update(|entries| {
            entries.clear();
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("box.dat"));
        (store, dir)
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (store, _dir) = temp_store();
        assert_eq!(store.read("anything").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn write_persists_whole_file() {
        let (mut store, _dir) = temp_store();
        store.write("a", "1").unwrap();
        store.write("b", r#"{"x":true}"#).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let on_disk: Entries = serde_json::from_str(&content).unwrap();
        assert_eq!(on_disk.get("a"), Some(&Value::String("1".into())));
        assert_eq!(on_disk.get("b"), Some(&Value::String(r#"{"x":true}"#.into())));

        let reopened = FileStore::new(store.path());
        assert_eq!(reopened.read("b").unwrap(), Some(r#"{"x":true}"#.to_string()));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let (mut store, _dir) = temp_store();
        std::fs::write(store.path(), "this is not json {[}").unwrap();

        assert_eq!(store.read("a").unwrap(), None);
        store.write("a", "1").unwrap();
        assert_eq!(store.read("a").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn non_string_entries_read_as_json_text() {
        let (store, _dir) = temp_store();
        std::fs::write(store.path(), r#"{"n": 5, "o": {"k": "v"}}"#).unwrap();

        assert_eq!(store.read("n").unwrap(), Some("5".to_string()));
        assert_eq!(store.read("o").unwrap(), Some(r#"{"k":"v"}"#.to_string()));
    }

    #[test]
    fn cache_is_used_until_reload() {
        let (mut store, _dir) = temp_store();
        store.write("a", "1").unwrap();

        std::fs::write(store.path(), r#"{"a":"changed"}"#).unwrap();
        assert_eq!(store.read("a").unwrap(), Some("1".to_string()));

        store.reload();
        assert_eq!(store.read("a").unwrap(), Some("changed".to_string()));
    }

    #[test]
    fn remove_and_clear_persist() {
        let (mut store, _dir) = temp_store();
        store.write("a", "1").unwrap();
        store.write("b", "2").unwrap();

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(FileStore::new(store.path()).read("a").unwrap(), None);

        assert!(store.clear().unwrap());
        assert_eq!(FileStore::new(store.path()).read("b").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn data_file_has_restricted_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (mut store, _dir) = temp_store();
        store.write("token", "secret").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
