//! Global subscriber setup for hosts embedding the engine and for the
//! `rolecraft` binary.
//!
//! Output always goes to stderr, leaving stdout to reports. `RUST_LOG`
//! overrides the default level when set.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Line format for emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Plain
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, in which case
/// the existing one stays in place.
pub fn install(format: LogFormat, level: Level) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Plain => registry.with(layer).try_init().is_ok(),
        LogFormat::Json => registry.with(layer.json()).try_init().is_ok(),
    }
}

/// Convenience wrapper matching the CLI's `--json` flag.
pub fn init_tracing(json: bool, level: Level) {
    if !install(LogFormat::from_json_flag(json), level) {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flag() {
        assert_eq!(LogFormat::from_json_flag(true), LogFormat::Json);
        assert_eq!(LogFormat::from_json_flag(false), LogFormat::default());
    }
}
