use anyhow::{Context, Result};
use layerbox_core::{
    Argument, ArgumentPrecedence, ConfigResolver, Database, FileStore, PersistedStore,
};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::logging::LogHandle;
use crate::output::render;

/// Options for `lbx resolve`
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub database: PathBuf,
    pub key: String,
    pub names: Vec<String>,
    pub argument: Option<String>,
    pub precedence: ArgumentPrecedence,
}

/// Execute resolve subcommand
pub fn execute(
    data_file: &Path,
    args: ResolveArgs,
    format: OutputFormat,
    logging: &LogHandle,
) -> Result<()> {
    let database = load_database(&args.database)?;
    let argument = parse_argument(args.argument.as_deref())?;
    let store = PersistedStore::new(FileStore::new(data_file));

    let resolved = ConfigResolver::new(&database)
        .with_argument(argument)
        .with_precedence(args.precedence)
        .resolve(&store, &args.key, args.names)
        .with_context(|| format!("Failed to resolve configuration for key '{}'", args.key))?;

    if let Some(level) = resolved.log_level() {
        logging.apply_resolved(level);
    }

    println!("{}", render(&resolved, format)?);
    Ok(())
}

/// Read a database JSON file
pub fn load_database(path: &Path) -> Result<Database> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read database file: {}", path.display()))?;
    let database: Database = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse database file: {}", path.display()))?;
    debug!(path = %path.display(), profiles = database.profile_names().count(), "loaded database");
    Ok(database)
}

/// Parse the `--argument` flag: JSON objects are taken as fields, anything else as a query string
pub fn parse_argument(raw: Option<&str>) -> Result<Argument> {
    let Some(raw) = raw else {
        return Ok(Argument::Absent);
    };

    if raw.trim_start().starts_with('{') {
        let json: serde_json::Value =
            serde_json::from_str(raw).context("Failed to parse --argument as JSON")?;
        return Ok(Argument::try_from(json)?);
    }
    Ok(Argument::from(raw))
}
