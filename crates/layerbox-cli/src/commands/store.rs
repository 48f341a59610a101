use anyhow::{Context, Result};
use colored::Colorize;
use layerbox_core::{ConfigValue, FileStore, PersistedStore};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::output::render;

fn open(data_file: &Path) -> PersistedStore<FileStore> {
    PersistedStore::new(FileStore::new(data_file))
}

/// Print the value stored under `name`, or `null` when absent
pub fn get(data_file: &Path, name: &str, format: OutputFormat) -> Result<()> {
    let value = open(data_file)
        .get_item(name)
        .with_context(|| format!("Failed to read '{}'", name))?
        .unwrap_or(ConfigValue::Null);

    println!("{}", render(&value, format)?);
    Ok(())
}

/// Store `value` under `name`; the text is parsed as JSON when it can be
pub fn set(data_file: &Path, name: &str, value: &str) -> Result<()> {
    let value = ConfigValue::parse_lenient(value);
    let stored = open(data_file)
        .set_item(name, &value)
        .with_context(|| format!("Failed to write '{}' to {}", name, data_file.display()))?;

    report(stored, &format!("Stored {}", name.cyan()));
    Ok(())
}

/// Remove `name` from the store
pub fn remove(data_file: &Path, name: &str) -> Result<()> {
    let removed = open(data_file)
        .remove_item(name)
        .with_context(|| format!("Failed to remove '{}' from {}", name, data_file.display()))?;

    report(removed, &format!("Removed {}", name.cyan()));
    Ok(())
}

/// Remove every entry from the store
pub fn clear(data_file: &Path) -> Result<()> {
    let cleared = open(data_file)
        .clear()
        .with_context(|| format!("Failed to clear {}", data_file.display()))?;

    report(cleared, &format!("Cleared {}", data_file.display()));
    Ok(())
}

fn report(acknowledged: bool, message: &str) {
    if acknowledged {
        println!("{} {}", "Success:".green().bold(), message);
    } else {
        println!("{} {}", "Unchanged:".yellow().bold(), message.dimmed());
    }
}
