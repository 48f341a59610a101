//! # Layerbox Core
//!
//! Layered configuration resolution for scripts that read their runtime
//! settings from several sources at once.
//!
//! ## Sources
//!
//! - A compiled-in [`Database`] with a `Default` profile and named profiles
//! - A persisted per-user key-value store ([`PersistedStore`] over a [`HostStore`])
//! - A host-supplied invocation [`Argument`] (query string or object)
//!
//! ## Quick Start
//!
//! ```rust
//! use layerbox_core::{
//!     get_storage, Argument, ConfigValue, Database, MemoryStore, PersistedStore, Profile,
//! };
//! use serde_json::json;
//!
//! let database = Database::new()
//!     .with_profile("Default", Profile::new().with_settings(json!({ "Switch": "true" })))
//!     .with_profile("Weather", Profile::new().with_settings(json!({ "Interval": "30" })));
//!
//! let store = PersistedStore::new(MemoryStore::new());
//! let argument = Argument::from("Interval=60");
//!
//! let resolved = get_storage("BoxJs", "Weather", &database, &argument, &store)?;
//! assert_eq!(resolved.setting("Interval"), Some(&ConfigValue::from(60)));
//! assert_eq!(resolved.setting("Switch"), Some(&ConfigValue::Bool(true)));
//! # Ok::<(), layerbox_core::ResolveError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod argument;
mod coerce;
mod error;
mod merge;
mod path;
mod resolver;
pub mod storage;
mod text;
mod value;

pub use argument::*;
pub use coerce::*;
pub use error::*;
pub use merge::*;
pub use path::*;
pub use resolver::*;
pub use storage::{FileStore, HostStore, JsonField, MemoryStore, PersistedStore};
pub use text::{escape, unescape};
pub use value::*;
