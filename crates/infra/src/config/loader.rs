//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. An explicit `--config` path wins unconditionally
//! 2. Otherwise, attempts to load from environment variables
//! 3. If incomplete, falls back to probing for config files
//! 4. Supports TOML and JSON formats
//!
//! ## Environment Variables
//! - `MIRRORQ_QUEUE_DIR`: Queue directory
//! - `MIRRORQ_ENGINE_COMMAND`: Sync engine executable
//! - `MIRRORQ_LIBRARY_ROOT`: Filesystem root the engine mounts
//! - `MIRRORQ_DEFAULT_SOURCE` / `MIRRORQ_DEFAULT_TARGET`: Default root pair
//! - `MIRRORQ_LIBRARY_RULES`: Optional JSON array of routing rules
//! - `MIRRORQ_NOTIFY_URL` / `MIRRORQ_NOTIFY_TOKEN`: Media server endpoint
//! - `MIRRORQ_ENGINE_TIMEOUT`: Per-item deadline in seconds
//! - `MIRRORQ_ENGINE_DELETE` / `_CREATE` / `_UPDATE_NAMES` / `_VERBOSE`:
//!   Engine flags (true/false)
//! - `MIRRORQ_WATCH_INTERVAL`: Watch-mode interval in seconds
//! - `MIRRORQ_LOG_FILE` / `MIRRORQ_LOG_LEVEL`: Logging sink
//! - `MIRRORQ_OWNER_USER` / `_GROUP` / `_MODE`: Ownership fixup
//!
//! ## File Locations
//! The loader probes `mirrorq.{toml,json}` and `config.{toml,json}` in the
//! working directory, up to two parent directories, and next to the
//! executable.

use std::path::{Path, PathBuf};

use mirrorq_domain::{
    Config, LibraryRule, MirrorqError, OwnershipConfig, Result,
};

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `MirrorqError::Config` if no source yields a valid configuration.
pub fn load(explicit: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_from_file(Some(path));
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(err) => {
            tracing::debug!(error = ?err, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// The queue directory, engine command, library root and default root pair
/// are required; everything else falls back to its default.
///
/// # Errors
/// Returns `MirrorqError::Config` if required variables are missing or
/// malformed.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.queue.dir = PathBuf::from(env_var("MIRRORQ_QUEUE_DIR")?);
    config.engine.command = env_var("MIRRORQ_ENGINE_COMMAND")?;
    config.libraries.root = PathBuf::from(env_var("MIRRORQ_LIBRARY_ROOT")?);
    config.libraries.default.source = PathBuf::from(env_var("MIRRORQ_DEFAULT_SOURCE")?);
    config.libraries.default.target = PathBuf::from(env_var("MIRRORQ_DEFAULT_TARGET")?);

    if let Ok(rules) = std::env::var("MIRRORQ_LIBRARY_RULES") {
        config.libraries.rules = serde_json::from_str::<Vec<LibraryRule>>(&rules)
            .map_err(|err| MirrorqError::Config(format!("Invalid MIRRORQ_LIBRARY_RULES: {err}")))?;
    }

    if let Ok(url) = std::env::var("MIRRORQ_NOTIFY_URL") {
        config.notify.base_url = url;
    }
    config.notify.api_token = std::env::var("MIRRORQ_NOTIFY_TOKEN").ok();

    if let Some(timeout) = env_parse::<u64>("MIRRORQ_ENGINE_TIMEOUT")? {
        config.engine.timeout_seconds = timeout;
    }
    config.engine.delete_stale = env_bool("MIRRORQ_ENGINE_DELETE", config.engine.delete_stale);
    config.engine.create_missing = env_bool("MIRRORQ_ENGINE_CREATE", config.engine.create_missing);
    config.engine.update_names =
        env_bool("MIRRORQ_ENGINE_UPDATE_NAMES", config.engine.update_names);
    config.engine.verbose = env_bool("MIRRORQ_ENGINE_VERBOSE", config.engine.verbose);

    if let Some(interval) = env_parse::<u64>("MIRRORQ_WATCH_INTERVAL")? {
        config.watch.interval_seconds = interval;
    }

    config.log.file = std::env::var("MIRRORQ_LOG_FILE").ok().map(PathBuf::from);
    config.log.level = std::env::var("MIRRORQ_LOG_LEVEL").ok();

    if let Ok(user) = std::env::var("MIRRORQ_OWNER_USER") {
        config.ownership = Some(OwnershipConfig {
            user,
            group: std::env::var("MIRRORQ_OWNER_GROUP").ok(),
            mode: std::env::var("MIRRORQ_OWNER_MODE").ok(),
        });
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension.
///
/// # Errors
/// Returns `MirrorqError::Config` on missing files, unknown formats or
/// invalid content.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MirrorqError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MirrorqError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|err| MirrorqError::Config(format!("Failed to read config file: {err}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, format detected by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|err| MirrorqError::Config(format!("Invalid TOML format: {err}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|err| MirrorqError::Config(format!("Invalid JSON format: {err}"))),
        _ => Err(MirrorqError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file.
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let names = ["mirrorq.toml", "mirrorq.json", "config.toml", "config.json"];
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        for base in [cwd.clone(), cwd.join(".."), cwd.join("../..")] {
            for name in names {
                candidates.push(base.join(name));
            }
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            for name in names {
                candidates.push(exe_dir.join(name));
            }
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get a required environment variable.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| MirrorqError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional numeric environment variable.
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| MirrorqError::Config(format!("Invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}

/// Parse a boolean environment variable.
///
/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
/// (case-insensitive); unset falls back to `default`.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
