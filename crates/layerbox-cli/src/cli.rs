use clap::{Parser, Subcommand, ValueEnum};
use layerbox_core::ArgumentPrecedence;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages, including each merge step of a resolution
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for values printed to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact single-line JSON
    Json,
    /// Indented JSON
    #[default]
    Pretty,
}

/// Where the invocation argument sits in the precedence order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Precedence {
    /// Argument wins over every source
    #[default]
    Overall,
    /// Persisted overrides win over the argument
    BeforePersisted,
    /// Argument applied once after all profiles
    AfterProfiles,
}

impl From<Precedence> for ArgumentPrecedence {
    fn from(precedence: Precedence) -> Self {
        match precedence {
            Precedence::Overall => ArgumentPrecedence::Overall,
            Precedence::BeforePersisted => ArgumentPrecedence::BeforePersisted,
            Precedence::AfterProfiles => ArgumentPrecedence::AfterProfiles,
        }
    }
}

#[derive(Parser)]
#[command(name = "lbx")]
#[command(about = "lbx - resolve layered script configuration and edit the persisted store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data file backing the persisted store
    #[arg(long, global = true, env = "LBX_DATA_FILE", default_value = "box.dat")]
    pub data_file: PathBuf,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, pretty)
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

impl Cli {
    /// Effective log level from `--log-level` and `--verbose`
    pub fn level_filter(&self) -> Option<LevelFilter> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.into()),
            (None, true) => Some(LevelFilter::DEBUG),
            (None, false) => None,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a script's configuration and print it as JSON
    ///
    /// Merges the database's Default profile, each named profile, the
    /// invocation argument and the persisted record stored under --key.
    Resolve {
        /// JSON file holding the database (profile name to Settings/Configs/Caches)
        #[arg(short, long)]
        database: PathBuf,

        /// Store key of the persisted record
        #[arg(short, long)]
        key: String,

        /// Profile names to resolve, in merge order (can be repeated)
        #[arg(short, long = "name", required = true, num_args = 1..)]
        names: Vec<String>,

        /// Invocation argument: a query string (a=1&b.c=2) or a JSON object
        #[arg(short, long)]
        argument: Option<String>,

        /// Where the argument sits in the precedence order
        #[arg(short, long, value_enum, default_value_t = Precedence::Overall)]
        precedence: Precedence,
    },

    /// Read a value from the persisted store (`@base.path` reads a nested value)
    Get {
        /// Item name
        name: String,
    },

    /// Write a value to the persisted store (`@base.path` writes a nested value)
    Set {
        /// Item name
        name: String,

        /// Value; parsed as JSON when possible, otherwise stored as a string
        value: String,
    },

    /// Remove a value from the persisted store
    Remove {
        /// Item name
        name: String,
    },

    /// Remove every value from the persisted store
    Clear,
}
