//! Cache configuration.
//!
//! Controls key namespacing, the shared-tier partition and TTL bands via
//! `stockpoint.toml`.

use std::time::Duration;

use serde::Deserialize;

use super::keys::{KeyBuilder, TtlBand};

const DEFAULT_KEY_PREFIX: &str = "stockpoint_";
const DEFAULT_SHARED_GROUP: &str = "stockpoint";

/// Cache configuration from `stockpoint.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the shared tier when one is supplied.
    pub enable_shared_cache: bool,
    /// Prefix applied to every key.
    pub key_prefix: String,
    /// Shared-tier partition flushed on pattern fallback.
    pub shared_group: String,
    pub ttl_long_secs: u64,
    pub ttl_medium_secs: u64,
    pub ttl_short_secs: u64,
    pub ttl_very_short_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_shared_cache: true,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            shared_group: DEFAULT_SHARED_GROUP.to_string(),
            ttl_long_secs: TtlBand::Long.default_duration().as_secs(),
            ttl_medium_secs: TtlBand::Medium.default_duration().as_secs(),
            ttl_short_secs: TtlBand::Short.default_duration().as_secs(),
            ttl_very_short_secs: TtlBand::VeryShort.default_duration().as_secs(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_shared_cache: settings.enable_shared_cache,
            key_prefix: settings.key_prefix.clone(),
            shared_group: settings.shared_group.clone(),
            ttl_long_secs: settings.ttl_long.as_secs(),
            ttl_medium_secs: settings.ttl_medium.as_secs(),
            ttl_short_secs: settings.ttl_short.as_secs(),
            ttl_very_short_secs: settings.ttl_very_short.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn keys(&self) -> KeyBuilder {
        KeyBuilder::new(self.key_prefix.clone())
    }

    /// Shared-tier TTL for a band. A zero setting falls back to the band default.
    pub fn ttl(&self, band: TtlBand) -> Duration {
        let secs = match band {
            TtlBand::Long => self.ttl_long_secs,
            TtlBand::Medium => self.ttl_medium_secs,
            TtlBand::Short => self.ttl_short_secs,
            TtlBand::VeryShort => self.ttl_very_short_secs,
        };
        if secs == 0 {
            band.default_duration()
        } else {
            Duration::from_secs(secs)
        }
    }
}
