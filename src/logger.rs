//! Diagnostics for vocabdeck.
//!
//! stdout carries `serve` replies and one-shot command output, so the
//! subscriber installed here only ever writes to stderr.
//!
//! Filter precedence: `--log-level`, then `RUST_LOG`, then `[app] log_level`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::AppError;

/// Where the effective filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrigin {
    CommandLine,
    Environment,
    Config,
}

/// Pick the filter for this run.
///
/// `cli_level` must be a bare level and is rejected if it isn't one.
/// An unparsable `rust_log` is skipped in favour of the configured level,
/// which may be a full directive (`"vocabdeck=debug,reqwest=warn"`).
pub fn resolve_filter(
    config_level: &str,
    cli_level: Option<&str>,
    rust_log: Option<&str>,
) -> Result<(EnvFilter, FilterOrigin), AppError> {
    if let Some(level) = cli_level {
        let level = parse_level(level)?;
        return Ok((EnvFilter::default().add_directive(level.into()), FilterOrigin::CommandLine));
    }
    if let Some(filter) = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return Ok((filter, FilterOrigin::Environment));
    }
    EnvFilter::try_new(config_level)
        .map(|filter| (filter, FilterOrigin::Config))
        .map_err(|e| AppError::Logger(format!("invalid [app] log_level '{config_level}': {e}")))
}

/// Install the global stderr subscriber for `config`, honouring a
/// command-line override. Fails if a subscriber is already set.
pub fn init_stderr(config: &Config, cli_level: Option<&str>) -> Result<FilterOrigin, AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, origin) = resolve_filter(&config.log_level, cli_level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("subscriber already installed: {e}")))?;
    Ok(origin)
}

/// Parse a bare level (`error` .. `trace`, or `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
