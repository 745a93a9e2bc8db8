//! Two-tier cache context.
//!
//! A [`CacheManager`] is owned by one processing unit (a request or a job).
//! Reads check the process-local tier first, then the optional shared tier,
//! promoting shared hits into the local tier. Shared-tier failures are logged
//! and treated as misses; no operation here returns an error.

use std::sync::Arc;

use bytes::Bytes;
use glob::Pattern;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{KeyBuilder, TtlBand};
use super::shared::{PatternDeletion, SharedCache, SharedCacheError};
use super::store::LocalStore;

pub(crate) const METRIC_LOCAL_HIT: &str = "stockpoint_cache_local_hit_total";
pub(crate) const METRIC_SHARED_HIT: &str = "stockpoint_cache_shared_hit_total";
pub(crate) const METRIC_MISS: &str = "stockpoint_cache_miss_total";
pub(crate) const METRIC_SHARED_ERROR: &str = "stockpoint_cache_shared_error_total";
pub(crate) const METRIC_GROUP_FLUSH: &str = "stockpoint_cache_group_flush_total";

/// How the shared tier handled a pattern invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedPatternOutcome {
    /// No shared tier configured.
    None,
    /// The backend deleted matching keys natively.
    Native { removed: usize },
    /// The backend could not delete by pattern, so the whole group was flushed.
    GroupFlush,
    /// The shared tier failed; local invalidation still happened.
    Failed,
}

/// Outcome of [`CacheManager::delete_pattern`].
///
/// Pattern invalidation is best-effort on the shared tier and may remove more
/// than the pattern matches. It never removes less.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternInvalidation {
    pub local_removed: usize,
    pub shared: SharedPatternOutcome,
}

pub struct CacheManager {
    config: Arc<CacheConfig>,
    keys: KeyBuilder,
    local: LocalStore,
    shared: Option<Arc<dyn SharedCache>>,
}

impl CacheManager {
    /// Create a cache context. The shared tier is ignored when disabled in config.
    pub fn new(config: Arc<CacheConfig>, shared: Option<Arc<dyn SharedCache>>) -> Self {
        let shared = shared.filter(|_| config.enable_shared_cache);
        Self {
            keys: config.keys(),
            config,
            local: LocalStore::new(),
            shared,
        }
    }

    /// Create a cache context with no shared tier.
    pub fn local_only(config: Arc<CacheConfig>) -> Self {
        Self::new(config, None)
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Fetch and decode a value, checking the local tier first.
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        if let Some(raw) = self.local.get(key) {
            match serde_json::from_slice(&raw) {
                Ok(value) => {
                    counter!(METRIC_LOCAL_HIT).increment(1);
                    debug!(key, tier = "local", "Cache hit");
                    return Some(value);
                }
                Err(err) => {
                    warn!(key, tier = "local", error = %err, "Dropping undecodable cache entry");
                    self.local.remove(key);
                }
            }
        }

        if let Some(shared) = self.shared.as_ref() {
            match shared.get(&self.config.shared_group, key).await {
                Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                    Ok(value) => {
                        counter!(METRIC_SHARED_HIT).increment(1);
                        debug!(key, tier = "shared", "Cache hit");
                        self.local.set(key, raw);
                        return Some(value);
                    }
                    Err(err) => {
                        warn!(key, tier = "shared", error = %err, "Ignoring undecodable cache entry");
                    }
                },
                Ok(None) => {}
                Err(err) => record_shared_failure("get", key, &err),
            }
        }

        counter!(METRIC_MISS).increment(1);
        debug!(key, "Cache miss");
        None
    }

    /// Fetch a value, returning `default` when neither tier has it.
    pub async fn get_or<T: DeserializeOwned>(&mut self, key: &str, default: T) -> T {
        self.get(key).await.unwrap_or(default)
    }

    /// Store a value in both tiers.
    ///
    /// The local write always succeeds. Returns whether the shared write
    /// succeeded, or `true` when there is no shared tier.
    pub async fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, ttl: TtlBand) -> bool {
        let raw = match serde_json::to_vec(value) {
            Ok(encoded) => Bytes::from(encoded),
            Err(err) => {
                warn!(key, error = %err, "Refusing to cache unencodable value");
                return false;
            }
        };

        self.local.set(key, raw.clone());

        let Some(shared) = self.shared.as_ref() else {
            return true;
        };

        match shared
            .set(&self.config.shared_group, key, raw, self.config.ttl(ttl))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                record_shared_failure("set", key, &err);
                false
            }
        }
    }

    /// Remove a key from both tiers. Deleting an absent key succeeds.
    pub async fn delete(&mut self, key: &str) -> bool {
        self.local.remove(key);

        let Some(shared) = self.shared.as_ref() else {
            return true;
        };

        match shared.delete(&self.config.shared_group, key).await {
            Ok(()) => true,
            Err(err) => {
                record_shared_failure("delete", key, &err);
                false
            }
        }
    }

    /// Remove every key matching a shell-style glob.
    ///
    /// Local keys are matched exactly. On the shared tier the backend deletes
    /// natively when it can; otherwise the whole shared group is flushed.
    /// A pattern that does not compile flushes both tiers.
    pub async fn delete_pattern(&mut self, pattern: &str) -> PatternInvalidation {
        let compiled = match Pattern::new(pattern) {
            Ok(compiled) => compiled,
            Err(err) => {
                warn!(pattern, error = %err, "Invalid invalidation pattern; flushing instead");
                let local_removed = self.local.len();
                let has_shared = self.shared.is_some();
                let flushed = self.flush().await;
                let shared = match (has_shared, flushed) {
                    (false, _) => SharedPatternOutcome::None,
                    (true, true) => SharedPatternOutcome::GroupFlush,
                    (true, false) => SharedPatternOutcome::Failed,
                };
                return PatternInvalidation {
                    local_removed,
                    shared,
                };
            }
        };
        let local_removed = self.local.remove_matching(&compiled);

        let Some(shared) = self.shared.as_ref() else {
            return PatternInvalidation {
                local_removed,
                shared: SharedPatternOutcome::None,
            };
        };

        let group = self.config.shared_group.as_str();
        let outcome = match shared.delete_matching(group, &compiled).await {
            Ok(PatternDeletion::Deleted { removed }) => SharedPatternOutcome::Native { removed },
            Ok(PatternDeletion::Unsupported) => match shared.flush_group(group).await {
                Ok(()) => {
                    counter!(METRIC_GROUP_FLUSH).increment(1);
                    debug!(pattern, group, "Pattern delete fell back to group flush");
                    SharedPatternOutcome::GroupFlush
                }
                Err(err) => {
                    record_shared_failure("flush_group", pattern, &err);
                    SharedPatternOutcome::Failed
                }
            },
            Err(err) => {
                record_shared_failure("delete_matching", pattern, &err);
                SharedPatternOutcome::Failed
            }
        };

        PatternInvalidation {
            local_removed,
            shared: outcome,
        }
    }

    /// Clear the local tier and flush the shared group.
    pub async fn flush(&mut self) -> bool {
        self.local.clear();

        let Some(shared) = self.shared.as_ref() else {
            return true;
        };

        match shared.flush_group(&self.config.shared_group).await {
            Ok(()) => {
                counter!(METRIC_GROUP_FLUSH).increment(1);
                true
            }
            Err(err) => {
                record_shared_failure("flush", &self.config.shared_group, &err);
                false
            }
        }
    }
}

fn record_shared_failure(op: &'static str, key: &str, err: &SharedCacheError) {
    counter!(METRIC_SHARED_ERROR, "op" => op).increment(1);
    warn!(
        op,
        key,
        error = %err,
        result = "degraded_to_local",
        "Shared cache operation failed"
    );
}
