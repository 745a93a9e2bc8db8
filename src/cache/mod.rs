//! Stockpoint cache tier
//!
//! Two cache levels behind one context object:
//!
//! - **Local**: a map owned by the current processing unit, no TTL
//! - **Shared**: an optional cross-process backend with TTLs, partitioned by group
//!
//! Reads go local first, then shared, promoting shared hits. Invalidation is
//! explicit: write paths report [`EventKind`]s through [`InvalidationObserver`].
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enable_shared_cache = true
//! key_prefix = "stockpoint_"
//! ttl_long_secs = 3600
//! # ... see config.rs for all options
//! ```

mod config;
mod events;
mod keys;
mod manager;
mod planner;
mod shared;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use events::{CacheEvent, EventKind};
pub use keys::{KeyBuilder, TtlBand};
pub use manager::{CacheManager, PatternInvalidation, SharedPatternOutcome};
pub use planner::InvalidationPlan;
pub use shared::{PatternDeletion, SharedCache, SharedCacheError};
pub use store::LocalStore;
pub use trigger::InvalidationObserver;

pub(crate) use manager::{
    METRIC_GROUP_FLUSH, METRIC_LOCAL_HIT, METRIC_MISS, METRIC_SHARED_ERROR, METRIC_SHARED_HIT,
};
