//! tracing-subscriber setup for the assistant.
//!
//! A bare level (`-vv`, `log_level = "debug"`) applies to this crate only;
//! dependencies stay at `warn`.  Full directive strings such as
//! `jarvis_assistant::subsystems::assistant::capture=trace` pass through
//! unchanged, which is how the voice debug log is switched on by itself.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

const CRATE_TARGET: &str = "jarvis_assistant";
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::WARN;

/// Install the global subscriber, writing to stderr.
///
/// With `explicit` set (a CLI flag chose the level) `level` wins over
/// `RUST_LOG`; otherwise `RUST_LOG` wins when it parses.
pub fn init(level: &str, explicit: bool) -> Result<(), AppError> {
    let filter = build_filter(level, explicit)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

fn build_filter(level: &str, explicit: bool) -> Result<EnvFilter, AppError> {
    if !explicit {
        if let Ok(from_env) = EnvFilter::try_from_default_env() {
            return Ok(from_env);
        }
    }
    EnvFilter::try_new(directives(level)?)
        .map_err(|e| AppError::Logger(format!("invalid log directives '{level}': {e}")))
}

/// Expand a configured level into filter directives.
fn directives(level: &str) -> Result<String, AppError> {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return Ok(level.to_string());
    }
    let crate_level = parse_level(level)?;
    Ok(format!("{DEPENDENCY_LEVEL},{CRATE_TARGET}={crate_level}").to_lowercase())
}

/// Parse one of `off`, `error`, `warn`, `info`, `debug`, `trace`.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
