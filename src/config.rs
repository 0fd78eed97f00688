//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit path), then applies `VOCABDECK_DATA_DIR`,
//! `VOCABDECK_LOG_LEVEL` and `VOCABDECK_REMOTE_URL` overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::store::StoreKind;

const APP_NAME: &str = "vocabdeck";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Local store configuration (`[store]`).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Explicit store file; `None` means `<data_dir>/<kind default file>`.
    pub path: Option<PathBuf>,
    /// Seed starter categories, sample words and settings into empty tables.
    pub seed_defaults: bool,
}

/// Remote search-index configuration (`[remote]`).
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub enabled: bool,
    /// Server root, e.g. `http://localhost:8983/solr`.
    pub base_url: String,
    /// Index (core) name appended to `base_url`.
    pub core: String,
    /// Per-request timeout. `None` leaves it to the transport default.
    pub timeout_seconds: Option<u64>,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    /// Directory for all persistent data (already expanded, no `~`).
    pub data_dir: PathBuf,
    pub log_level: String,
    pub store: StoreConfig,
    pub remote: RemoteConfig,
}

impl Config {
    /// Built-in configuration used when no config file exists.
    pub fn builtin() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            store: StoreConfig { kind: StoreKind::Json, path: None, seed_defaults: true },
            remote: RemoteConfig {
                enabled: true,
                base_url: default_remote_base_url(),
                core: default_remote_core(),
                timeout_seconds: None,
            },
        }
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    app: RawApp,
    #[serde(default)]
    store: RawStore,
    #[serde(default)]
    remote: RawRemote,
}

#[derive(Deserialize)]
struct RawApp {
    #[serde(default = "default_app_name")]
    name: String,
    #[serde(default)]
    data_dir: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawApp {
    fn default() -> Self {
        Self { name: default_app_name(), data_dir: None, log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawStore {
    #[serde(default = "default_store_kind")]
    kind: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default = "default_true")]
    seed_defaults: bool,
}

impl Default for RawStore {
    fn default() -> Self {
        Self { kind: default_store_kind(), path: None, seed_defaults: true }
    }
}

#[derive(Deserialize)]
struct RawRemote {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_remote_base_url")]
    base_url: String,
    #[serde(default = "default_remote_core")]
    core: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl Default for RawRemote {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_remote_base_url(),
            core: default_remote_core(),
            timeout_seconds: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_app_name() -> String { APP_NAME.to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_store_kind() -> String { "json".to_string() }
fn default_remote_base_url() -> String { "http://localhost:8983/solr".to_string() }
fn default_remote_core() -> String { "vocabulary".to_string() }

/// Per-user application data directory, e.g. `~/.local/share/vocabdeck`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_NAME))
}

/// Load configuration from `path` with env overrides applied.
///
/// A missing file at the default location is not an error: the built-in
/// configuration is used instead. A missing explicit file is.
pub fn load(path: Option<&Path>) -> Result<Config, AppError> {
    let overrides = Overrides {
        data_dir: env::var("VOCABDECK_DATA_DIR").ok(),
        log_level: env::var("VOCABDECK_LOG_LEVEL").ok(),
        remote_url: env::var("VOCABDECK_REMOTE_URL").ok(),
    };
    match path {
        Some(p) => load_from(p, &overrides),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_from(default_path, &overrides)
            } else {
                resolve(RawConfig::default(), &overrides)
            }
        }
    }
}

/// Env-var overrides, passed explicitly so tests need not mutate the process env.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
    pub remote_url: Option<String>,
}

/// Loader that accepts an explicit path and overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: &Overrides) -> Result<Config, AppError> {
    let data_dir = match overrides.data_dir.as_deref().or(parsed.app.data_dir.as_deref()) {
        Some(dir) => expand_home(dir),
        None => default_data_dir(),
    };
    let log_level = overrides.log_level.clone().unwrap_or(parsed.app.log_level);

    let kind: StoreKind = parsed.store.kind.parse()?;
    let store_path = parsed.store.path.map(|p| {
        let path = expand_home(&p);
        if path.is_absolute() { path } else { data_dir.join(path) }
    });

    let base_url = overrides
        .remote_url
        .clone()
        .unwrap_or(parsed.remote.base_url)
        .trim_end_matches('/')
        .to_string();

    Ok(Config {
        app_name: parsed.app.name,
        data_dir,
        log_level,
        store: StoreConfig { kind, path: store_path, seed_defaults: parsed.store.seed_defaults },
        remote: RemoteConfig {
            enabled: parsed.remote.enabled,
            base_url,
            core: parsed.remote.core,
            timeout_seconds: parsed.remote.timeout_seconds,
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

#[cfg(test)]
impl Config {
    /// Config rooted at `data_dir` with the remote index pointed at a closed port.
    pub fn test_default(data_dir: &Path) -> Self {
        Self {
            app_name: "test".into(),
            data_dir: data_dir.to_path_buf(),
            log_level: "info".into(),
            store: StoreConfig { kind: StoreKind::Json, path: None, seed_defaults: true },
            remote: RemoteConfig {
                enabled: true,
                base_url: "http://127.0.0.1:1/solr".into(),
                core: "vocabulary".into(),
                timeout_seconds: Some(1),
            },
        }
    }
}
