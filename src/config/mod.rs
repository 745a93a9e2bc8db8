//! Configuration layer: typed settings with layered precedence (files → environment).

use std::{num::NonZeroU32, path::Path, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "stockpoint";
const ENV_PREFIX: &str = "STOCKPOINT";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_shared_cache: bool,
    pub key_prefix: String,
    pub shared_group: String,
    pub ttl_long: Duration,
    pub ttl_medium: Duration,
    pub ttl_short: Duration,
    pub ttl_very_short: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub run_migrations: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings from `config/default`, `stockpoint`, an optional explicit
/// file and `STOCKPOINT__*` environment variables, later sources winning.
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            cache,
            logging,
            database,
        } = raw;

        Ok(Self {
            cache: build_cache_settings(cache)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
        })
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let defaults = CacheConfig::default();

    let key_prefix = cache
        .key_prefix
        .unwrap_or(defaults.key_prefix);
    if key_prefix.chars().any(char::is_whitespace) {
        return Err(LoadError::invalid(
            "cache.key_prefix",
            "must not contain whitespace",
        ));
    }

    let shared_group = cache
        .shared_group
        .map(|group| group.trim().to_string())
        .unwrap_or(defaults.shared_group);
    if shared_group.is_empty() {
        return Err(LoadError::invalid("cache.shared_group", "must not be empty"));
    }

    Ok(CacheSettings {
        enable_shared_cache: cache
            .enable_shared_cache
            .unwrap_or(defaults.enable_shared_cache),
        key_prefix,
        shared_group,
        ttl_long: ttl(
            cache.ttl_long_secs,
            defaults.ttl_long_secs,
            "cache.ttl_long_secs",
        )?,
        ttl_medium: ttl(
            cache.ttl_medium_secs,
            defaults.ttl_medium_secs,
            "cache.ttl_medium_secs",
        )?,
        ttl_short: ttl(
            cache.ttl_short_secs,
            defaults.ttl_short_secs,
            "cache.ttl_short_secs",
        )?,
        ttl_very_short: ttl(
            cache.ttl_very_short_secs,
            defaults.ttl_very_short_secs,
            "cache.ttl_very_short_secs",
        )?,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        run_migrations: database.run_migrations.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_shared_cache: Option<bool>,
    key_prefix: Option<String>,
    shared_group: Option<String>,
    ttl_long_secs: Option<u64>,
    ttl_medium_secs: Option<u64>,
    ttl_short_secs: Option<u64>,
    ttl_very_short_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    run_migrations: Option<bool>,
}

fn ttl(value: Option<u64>, default: u64, key: &'static str) -> Result<Duration, LoadError> {
    match value.unwrap_or(default) {
        0 => Err(LoadError::invalid(key, "must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
