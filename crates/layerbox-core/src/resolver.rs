//! Configuration resolution and merging
//!
//! Implements the layered resolution of a script's runtime configuration:
//! 1. `Default` profile of the database (seed)
//! 2. Named database profiles, in the order requested
//! 3. Host invocation argument
//! 4. Persisted per-user overrides
//!
//! `Configs` only ever come from the database; `Caches` only from the
//! persisted store. After merging, string leaves of `Settings` are coerced
//! to booleans, integers and sequences.

use crate::argument::Argument;
use crate::coerce::coerce_leaves;
use crate::error::ResolveResult;
use crate::merge::merge;
use crate::path::{get, Path};
use crate::storage::{HostStore, PersistedRecord, PersistedStore};
use crate::value::ConfigValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};

/// Name of the profile that seeds every resolution
pub const DEFAULT_PROFILE: &str = "Default";

/// One named slice of the database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Mutable runtime settings
    #[serde(rename = "Settings", default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ConfigValue>,

    /// Static, read-only configuration
    #[serde(rename = "Configs", default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<ConfigValue>,

    /// Small persisted runtime data
    #[serde(rename = "Caches", default, skip_serializing_if = "Option::is_none")]
    pub caches: Option<ConfigValue>,
}

impl Profile {
    /// Create an empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile's settings
    pub fn with_settings(mut self, settings: impl Into<ConfigValue>) -> Self {
        self.settings = Some(settings.into());
        self
    }

    /// Set the profile's configs
    pub fn with_configs(mut self, configs: impl Into<ConfigValue>) -> Self {
        self.configs = Some(configs.into());
        self
    }

    /// Set the profile's caches
    pub fn with_caches(mut self, caches: impl Into<ConfigValue>) -> Self {
        self.caches = Some(caches.into());
        self
    }
}

/// Compiled-in defaults: profile name to [`Profile`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    profiles: BTreeMap<String, Profile>,
}

impl Database {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile
    pub fn with_profile(mut self, name: impl Into<String>, profile: Profile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// The `Default` profile, if present
    pub fn default_profile(&self) -> Option<&Profile> {
        self.profile(DEFAULT_PROFILE)
    }

    /// Names of all profiles
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// Ordered list of profile names to resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileNames(Vec<String>);

impl ProfileNames {
    /// Flatten a possibly nested list of names
    ///
    /// Strings are taken as names, arrays and sets are descended into, and
    /// anything else is ignored.
    pub fn flatten(value: &ConfigValue) -> Self {
        fn collect(value: &ConfigValue, names: &mut Vec<String>) {
            match value {
                ConfigValue::String(name) => names.push(name.clone()),
                ConfigValue::Array(items) | ConfigValue::Set(items) => {
                    items.iter().for_each(|item| collect(item, names));
                }
                _ => {}
            }
        }

        let mut names = Vec::new();
        collect(value, &mut names);
        Self(names)
    }

    /// The names in order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for ProfileNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for ProfileNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for ProfileNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<&[&str]> for ProfileNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ProfileNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&ConfigValue> for ProfileNames {
    fn from(value: &ConfigValue) -> Self {
        Self::flatten(value)
    }
}

/// Where the host argument sits in the precedence order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgumentPrecedence {
    /// Applied between database and persisted data for each profile, and
    /// again over the merged result, so it wins over every source
    #[default]
    Overall,
    /// Applied only inside the profile loop; persisted overrides beat it
    BeforePersisted,
    /// Applied only once, after all profiles are merged
    AfterProfiles,
}

impl ArgumentPrecedence {
    fn in_profile_loop(self) -> bool {
        matches!(self, Self::Overall | Self::BeforePersisted)
    }

    fn after_profiles(self) -> bool {
        matches!(self, Self::Overall | Self::AfterProfiles)
    }
}

/// Resolver options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Position of the host argument in the precedence order
    #[serde(default)]
    pub precedence: ArgumentPrecedence,
}

/// Result of a resolution: `{ Settings, Configs, Caches }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStore {
    /// Merged and coerced settings
    #[serde(rename = "Settings")]
    pub settings: ConfigValue,

    /// Merged static configuration
    #[serde(rename = "Configs")]
    pub configs: ConfigValue,

    /// Merged persisted caches
    #[serde(rename = "Caches")]
    pub caches: ConfigValue,

    /// `LogLevel` stored at the top of the persisted record. Not serialized.
    #[serde(skip)]
    persisted_log_level: Option<LevelFilter>,
}

impl ResolvedStore {
    /// Look up a setting by path
    pub fn setting(&self, path: impl Into<Path>) -> Option<&ConfigValue> {
        get(&self.settings, path)
    }

    /// Look up a config by path
    pub fn config(&self, path: impl Into<Path>) -> Option<&ConfigValue> {
        get(&self.configs, path)
    }

    /// Look up a cache entry by path
    pub fn cache(&self, path: impl Into<Path>) -> Option<&ConfigValue> {
        get(&self.caches, path)
    }

    /// Log level the resolved configuration asks the host to use
    ///
    /// `Settings.LogLevel` wins; the persisted record's own `LogLevel` is the
    /// fallback. Unknown level names are ignored.
    pub fn log_level(&self) -> Option<LevelFilter> {
        self.setting("LogLevel")
            .and_then(ConfigValue::as_str)
            .and_then(parse_log_level)
            .or(self.persisted_log_level)
    }
}

/// Parse `OFF`, `ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE` or `ALL` (any case)
pub fn parse_log_level(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_uppercase().as_str() {
        "OFF" => Some(LevelFilter::OFF),
        "ERROR" => Some(LevelFilter::ERROR),
        "WARN" => Some(LevelFilter::WARN),
        "INFO" => Some(LevelFilter::INFO),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "TRACE" | "ALL" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

/// Resolves configuration from database, argument and persisted store
///
/// The argument is snapshotted when the resolver is built, so one resolver
/// always sees the same argument no matter how often it resolves.
///
/// # Examples
///
/// ```rust
/// use layerbox_core::{ArgumentPrecedence, ConfigResolver, Database, MemoryStore, PersistedStore};
///
/// let database = Database::new();
/// let store = PersistedStore::new(MemoryStore::new());
///
/// let resolver = ConfigResolver::new(&database)
///     .with_argument("Mode=on")
///     .with_precedence(ArgumentPrecedence::BeforePersisted);
///
/// let resolved = resolver.resolve(&store, "BoxJs", "Weather")?;
/// assert_eq!(resolved.setting("Mode").and_then(|v| v.as_str()), Some("on"));
/// # Ok::<(), layerbox_core::ResolveError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver<'a> {
    database: &'a Database,
    argument: ConfigValue,
    options: ResolveOptions,
}

impl<'a> ConfigResolver<'a> {
    /// Create a resolver over `database` with no argument
    pub fn new(database: &'a Database) -> Self {
        Self {
            database,
            argument: ConfigValue::object(),
            options: ResolveOptions::default(),
        }
    }

    /// Snapshot the host argument
    pub fn with_argument(mut self, argument: impl Into<Argument>) -> Self {
        self.argument = argument.into().normalize();
        self
    }

    /// Set where the argument sits in the precedence order
    pub fn with_precedence(mut self, precedence: ArgumentPrecedence) -> Self {
        self.options.precedence = precedence;
        self
    }

    /// Replace all options
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Normalized argument this resolver applies
    pub fn argument(&self) -> &ConfigValue {
        &self.argument
    }

    /// Resolve the profiles in `names` against the record stored under `key`
    ///
    /// Missing profiles, a missing `Default` and a missing persisted record all
    /// degrade to empty trees. Only a failing store backend is an error.
    pub fn resolve<S: HostStore>(
        &self,
        store: &PersistedStore<S>,
        key: &str,
        names: impl Into<ProfileNames>,
    ) -> ResolveResult<ResolvedStore> {
        let names = names.into();
        let names = names.as_slice();
        debug!(key, ?names, precedence = ?self.options.precedence, "resolving configuration");

        let default = self.database.default_profile();
        let mut resolved = ResolvedStore {
            settings: seed(default.and_then(|p| p.settings.as_ref()), "Settings"),
            configs: seed(default.and_then(|p| p.configs.as_ref()), "Configs"),
            caches: ConfigValue::object(),
            persisted_log_level: None,
        };
        debug!(settings = %resolved.settings, "seeded from Default profile");

        let stored = store.get_item(key)?;
        let persisted = PersistedRecord::from_value(stored.as_ref(), names);
        resolved.persisted_log_level = persisted.log_level().and_then(parse_log_level);
        debug!(key, found = stored.is_some(), "read persisted record");

        let argument_in_loop = self
            .options
            .precedence
            .in_profile_loop()
            .then_some(&self.argument);

        for name in names {
            let profile = self.database.profile(name);
            let saved = persisted.profile(name);

            let saved_settings = saved.and_then(|p| p.settings.as_ref()).map(|f| f.value());
            let saved_caches = saved.and_then(|p| p.caches.as_ref()).map(|f| f.value());
            for raw in [&saved_settings, &saved_caches].into_iter().flatten() {
                if !raw.kind().is_keyed() {
                    warn!(profile = %name, kind = ?raw.kind(), "persisted data is not an object, ignoring");
                }
            }

            let database_settings = profile.and_then(|p| p.settings.as_ref());
            merge(
                &mut resolved.settings,
                database_settings
                    .into_iter()
                    .chain(argument_in_loop)
                    .chain(saved_settings.as_ref()),
            );
            merge(
                &mut resolved.configs,
                profile.and_then(|p| p.configs.as_ref()),
            );
            merge(&mut resolved.caches, saved_caches.as_ref());
            debug!(profile = %name, settings = %resolved.settings, "merged profile");
        }

        if self.options.precedence.after_profiles() {
            merge(&mut resolved.settings, [&self.argument]);
        }
        debug!(settings = %resolved.settings, "merged argument");

        coerce_leaves(&mut resolved.settings);
        debug!(settings = %resolved.settings, "coerced settings");

        Ok(resolved)
    }
}

/// Seed value for a top-level field, falling back to an empty object
fn seed(value: Option<&ConfigValue>, field: &str) -> ConfigValue {
    match value {
        Some(value) if value.kind().is_keyed() => value.clone(),
        Some(value) if value.is_present() => {
            warn!(field, kind = ?value.kind(), "Default profile field is not an object, using empty");
            ConfigValue::object()
        }
        _ => ConfigValue::object(),
    }
}

/// Resolve `names` against `database`, `argument` and the record stored under `key`
///
/// Uses the default [`ArgumentPrecedence::Overall`] policy: the argument wins
/// over every profile-scoped source.
pub fn get_storage<S: HostStore>(
    key: &str,
    names: impl Into<ProfileNames>,
    database: &Database,
    argument: &Argument,
    store: &PersistedStore<S>,
) -> ResolveResult<ResolvedStore> {
    ConfigResolver::new(database)
        .with_argument(argument.clone())
        .resolve(store, key, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn value(json: serde_json::Value) -> ConfigValue {
        ConfigValue::from(json)
    }

    fn store_with(key: &str, record: serde_json::Value) -> PersistedStore<MemoryStore> {
        PersistedStore::new(MemoryStore::with_entries([(key, record.to_string())]))
    }

    fn layered_database() -> Database {
        Database::new()
            .with_profile(DEFAULT_PROFILE, Profile::new().with_settings(value(json!({ "x": 1 }))))
            .with_profile("p1", Profile::new().with_settings(value(json!({ "x": 2 }))))
    }

    #[test]
    fn argument_wins_over_every_source() {
        let store = store_with("BoxJs", json!({ "p1": { "Settings": { "x": 3 } } }));
        let argument = Argument::try_from(json!({ "x": "4" })).unwrap();

        let resolved = get_storage("BoxJs", "p1", &layered_database(), &argument, &store).unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(4)));
    }

    #[test]
    fn persisted_wins_over_profile_wins_over_default() {
        let store = store_with("BoxJs", json!({ "p1": { "Settings": { "x": 3 } } }));
        let resolved =
            get_storage("BoxJs", "p1", &layered_database(), &Argument::Absent, &store).unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(3)));

        let empty = PersistedStore::new(MemoryStore::new());
        let resolved =
            get_storage("BoxJs", "p1", &layered_database(), &Argument::Absent, &empty).unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(2)));

        let resolved =
            get_storage("BoxJs", "other", &layered_database(), &Argument::Absent, &empty).unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(1)));
    }

    #[test]
    fn before_persisted_policy_lets_persisted_win() {
        let store = store_with("BoxJs", json!({ "p1": { "Settings": { "x": 3 } } }));
        let database = layered_database();
        let resolved = ConfigResolver::new(&database)
            .with_argument("x=4")
            .with_precedence(ArgumentPrecedence::BeforePersisted)
            .resolve(&store, "BoxJs", "p1")
            .unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(3)));
    }

    #[test]
    fn after_profiles_policy_applies_argument_once_at_the_end() {
        let store = store_with("BoxJs", json!({ "p1": { "Settings": { "x": 3 } } }));
        let database = layered_database();
        let resolved = ConfigResolver::new(&database)
            .with_argument("x=4")
            .with_precedence(ArgumentPrecedence::AfterProfiles)
            .resolve(&store, "BoxJs", "p1")
            .unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(4)));
    }

    #[test]
    fn missing_default_and_profiles_degrade_to_empty() {
        let store = PersistedStore::new(MemoryStore::new());
        let resolved =
            get_storage("BoxJs", "nope", &Database::new(), &Argument::Absent, &store).unwrap();

        assert_eq!(resolved.settings, ConfigValue::object());
        assert_eq!(resolved.configs, ConfigValue::object());
        assert_eq!(resolved.caches, ConfigValue::object());
    }

    #[test]
    fn configs_come_only_from_database_and_caches_only_from_store() {
        let database = Database::new()
            .with_profile(DEFAULT_PROFILE, Profile::new().with_configs(value(json!({ "Base": "https://a" }))))
            .with_profile(
                "p1",
                Profile::new()
                    .with_configs(value(json!({ "Path": "/v1" })))
                    .with_caches(value(json!({ "Ignored": true }))),
            );
        let store = store_with(
            "BoxJs",
            json!({ "p1": { "Configs": { "Base": "https://evil" }, "Caches": "{\"Token\":\"t\"}" } }),
        );

        let resolved = get_storage("BoxJs", "p1", &database, &Argument::Absent, &store).unwrap();

        assert_eq!(resolved.configs, value(json!({ "Base": "https://a", "Path": "/v1" })));
        assert_eq!(resolved.caches, value(json!({ "Token": "t" })));
    }

    #[test]
    fn profiles_merge_in_list_order() {
        let database = Database::new()
            .with_profile("a", Profile::new().with_settings(value(json!({ "x": "a", "only_a": "1" }))))
            .with_profile("b", Profile::new().with_settings(value(json!({ "x": "b" }))));
        let store = PersistedStore::new(MemoryStore::new());

        let nested = value(json!(["a", ["b"]]));
        let resolved = get_storage("BoxJs", &nested, &database, &Argument::Absent, &store).unwrap();

        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from("b")));
        assert_eq!(resolved.setting("only_a"), Some(&ConfigValue::from(1)));
    }

    #[test]
    fn string_persisted_settings_are_parsed() {
        let store = store_with(
            "BoxJs",
            json!({ "p1": { "Settings": "{\"Switch\":\"false\",\"Ids\":\"1,2\"}" } }),
        );
        let resolved =
            get_storage("BoxJs", "p1", &Database::new(), &Argument::Absent, &store).unwrap();

        assert_eq!(resolved.setting("Switch"), Some(&ConfigValue::Bool(false)));
        assert_eq!(
            resolved.setting("Ids"),
            Some(&value(json!([1, 2])))
        );
    }

    #[test]
    fn malformed_persisted_settings_are_ignored() {
        let store = store_with("BoxJs", json!({ "p1": { "Settings": "{not json" } }));
        let resolved =
            get_storage("BoxJs", "p1", &layered_database(), &Argument::Absent, &store).unwrap();
        assert_eq!(resolved.setting("x"), Some(&ConfigValue::from(2)));
    }

    #[test]
    fn coerces_settings_but_not_configs() {
        let database = Database::new().with_profile(
            DEFAULT_PROFILE,
            Profile::new()
                .with_settings(value(json!({ "Flag": "true", "Count": "42", "Ids": "1,2,3", "Name": "abc" })))
                .with_configs(value(json!({ "Count": "42" }))),
        );
        let store = PersistedStore::new(MemoryStore::new());
        let resolved = get_storage("BoxJs", "p1", &database, &Argument::Absent, &store).unwrap();

        assert_eq!(
            resolved.settings,
            value(json!({ "Flag": true, "Count": 42, "Ids": [1, 2, 3], "Name": "abc" }))
        );
        assert_eq!(resolved.config("Count"), Some(&ConfigValue::from("42")));
    }

    #[test]
    fn dotted_argument_reaches_nested_settings() {
        let database = Database::new().with_profile(
            DEFAULT_PROFILE,
            Profile::new().with_settings(value(json!({ "Nested": { "Keep": "1", "Mode": "a" } }))),
        );
        let store = PersistedStore::new(MemoryStore::new());
        let argument = Argument::from("Nested.Mode=b");

        let resolved = get_storage("BoxJs", "p1", &database, &argument, &store).unwrap();
        assert_eq!(
            resolved.settings,
            value(json!({ "Nested": { "Keep": 1, "Mode": "b" } }))
        );
    }

    #[test]
    fn log_level_hint() {
        let database = Database::new().with_profile(
            DEFAULT_PROFILE,
            Profile::new().with_settings(value(json!({ "LogLevel": "debug" }))),
        );
        let store = PersistedStore::new(MemoryStore::new());
        let resolved = get_storage("BoxJs", "p1", &database, &Argument::Absent, &store).unwrap();
        assert_eq!(resolved.log_level(), Some(LevelFilter::DEBUG));

        assert_eq!(parse_log_level("ALL"), Some(LevelFilter::TRACE));
        assert_eq!(parse_log_level("loud"), None);
    }

    #[test]
    fn record_log_level_is_the_fallback() {
        let store = store_with("BoxJs", json!({ "LogLevel": "trace", "p1": {} }));
        let resolved =
            get_storage("BoxJs", "p1", &Database::new(), &Argument::Absent, &store).unwrap();
        assert_eq!(resolved.log_level(), Some(LevelFilter::TRACE));

        let database = Database::new().with_profile(
            DEFAULT_PROFILE,
            Profile::new().with_settings(value(json!({ "LogLevel": "error" }))),
        );
        let resolved = get_storage("BoxJs", "p1", &database, &Argument::Absent, &store).unwrap();
        assert_eq!(resolved.log_level(), Some(LevelFilter::ERROR));

        let resolved =
            get_storage("BoxJs", "p1", &database, &Argument::from("LogLevel=warn"), &store).unwrap();
        assert_eq!(resolved.log_level(), Some(LevelFilter::WARN));
    }

    #[test]
    fn database_deserializes_from_json() {
        let database: Database = serde_json::from_value(json!({
            "Default": { "Settings": { "a": 1 }, "Configs": null },
            "p1": { "Caches": {} }
        }))
        .unwrap();

        assert_eq!(
            database.default_profile().and_then(|p| p.settings.clone()),
            Some(value(json!({ "a": 1 })))
        );
        assert!(database.default_profile().unwrap().configs.is_none());
        assert_eq!(database.profile_names().collect::<Vec<_>>(), ["Default", "p1"]);
    }

    #[test]
    fn resolution_does_not_mutate_database() {
        let database = layered_database();
        let before = database.clone();
        let store = PersistedStore::new(MemoryStore::new());
        let argument = Argument::from("x=9&y=1");

        get_storage("BoxJs", "p1", &database, &argument, &store).unwrap();
        assert_eq!(database, before);
    }
}
