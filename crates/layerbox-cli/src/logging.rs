use tracing::{debug, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Handle on the installed filter, used to follow the level a resolution asks for
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    explicit: bool,
}

impl LogHandle {
    /// Switch to `level` unless the user chose one with `-l`, `-v` or `RUST_LOG`
    ///
    /// Returns whether the filter was replaced.
    pub fn apply_resolved(&self, level: LevelFilter) -> bool {
        if self.explicit {
            debug!(%level, "keeping log level given on the command line");
            return false;
        }

        match self.filter.reload(level_filter(level)) {
            Ok(()) => {
                debug!(%level, "applied log level from resolved settings");
                true
            }
            Err(e) => {
                warn!("Failed to apply resolved log level {}: {}", level, e);
                false
            }
        }
    }
}

fn level_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

/// Install the global subscriber, writing to stderr so stdout stays parseable
///
/// An explicit `level` wins; otherwise `RUST_LOG` is honoured, falling back to `warn`.
pub fn init(level: Option<LevelFilter>) -> LogHandle {
    let from_env = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let filter = match level {
        Some(level) => level_filter(level),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy(),
    };

    let (filter, handle) = reload::Layer::new(filter);

    // A subscriber may already be set when running under a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    LogHandle {
        filter: handle,
        explicit: level.is_some() || from_env,
    }
}
