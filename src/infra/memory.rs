//! In-process adapters for embedding and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use glob::Pattern;
use time::OffsetDateTime;

use crate::application::repos::{LocationSource, RepoError, ShippingZoneRegistry, StockTable};
use crate::cache::{PatternDeletion, SharedCache, SharedCacheError};
use crate::domain::location::{LocationId, RawLocation};
use crate::domain::shipping::ShippingZone;
use crate::domain::stock::{ProductId, Quantity, StockLevels, StockRecord};

use super::lock::{mutex_lock, rw_read, rw_write};

struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Shared cache living in the current process, keyed by `(group, key)`.
///
/// A zero TTL stores the entry without expiry. Clones of the `Arc` holding it
/// stand in for separate processes talking to one backend.
pub struct MemorySharedCache {
    entries: DashMap<(String, String), Entry>,
    pattern_support: bool,
    available: AtomicBool,
    group_flushes: AtomicUsize,
}

impl Default for MemorySharedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySharedCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            pattern_support: true,
            available: AtomicBool::new(true),
            group_flushes: AtomicUsize::new(0),
        }
    }

    /// A backend that can only flush whole groups.
    pub fn without_pattern_support() -> Self {
        Self {
            pattern_support: false,
            ..Self::new()
        }
    }

    /// Make every operation fail with [`SharedCacheError::Unavailable`] until
    /// switched back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `flush_group` calls served.
    pub fn group_flushes(&self) -> usize {
        self.group_flushes.load(Ordering::SeqCst)
    }

    /// Whether a live entry exists, without going through the async contract.
    pub fn contains(&self, group: &str, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(&(group.to_owned(), key.to_owned()))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    fn ensure_available(&self) -> Result<(), SharedCacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SharedCacheError::Unavailable(
                "memory backend switched off".to_string(),
            ))
        }
    }
}

#[async_trait]
impl SharedCache for MemorySharedCache {
    async fn get(&self, group: &str, key: &str) -> Result<Option<Bytes>, SharedCacheError> {
        self.ensure_available()?;

        let lookup = (group.to_owned(), key.to_owned());
        let now = Instant::now();
        let hit = self
            .entries
            .get(&lookup)
            .map(|entry| (entry.value.clone(), entry.is_expired(now)));

        match hit {
            Some((_, true)) => {
                self.entries
                    .remove_if(&lookup, |_, entry| entry.is_expired(now));
                Ok(None)
            }
            Some((value, false)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        group: &str,
        key: &str,
        value: Bytes,
        ttl: Duration,
    ) -> Result<(), SharedCacheError> {
        self.ensure_available()?;

        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.entries
            .insert((group.to_owned(), key.to_owned()), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, group: &str, key: &str) -> Result<(), SharedCacheError> {
        self.ensure_available()?;
        self.entries.remove(&(group.to_owned(), key.to_owned()));
        Ok(())
    }

    async fn flush_group(&self, group: &str) -> Result<(), SharedCacheError> {
        self.ensure_available()?;
        self.entries.retain(|(entry_group, _), _| entry_group != group);
        self.group_flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_matching(
        &self,
        group: &str,
        pattern: &Pattern,
    ) -> Result<PatternDeletion, SharedCacheError> {
        self.ensure_available()?;
        if !self.pattern_support {
            return Ok(PatternDeletion::Unsupported);
        }

        let before = self.entries.len();
        self.entries
            .retain(|(entry_group, key), _| entry_group != group || !pattern.matches(key));
        Ok(PatternDeletion::Deleted {
            removed: before.saturating_sub(self.entries.len()),
        })
    }
}

/// Location entities held in memory, standing in for the content repository.
pub struct InMemoryLocationSource {
    entities: RwLock<BTreeMap<LocationId, RawLocation>>,
    available: AtomicBool,
    find_calls: AtomicUsize,
    find_many_calls: AtomicUsize,
    listing_calls: AtomicUsize,
}

impl Default for InMemoryLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLocationSource {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            find_calls: AtomicUsize::new(0),
            find_many_calls: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = RawLocation>) -> Self {
        let source = Self::new();
        for raw in entities {
            source.upsert(raw);
        }
        source
    }

    pub fn upsert(&self, raw: RawLocation) {
        rw_write(&self.entities, "infra::memory", "location_upsert").insert(raw.id, raw);
    }

    pub fn remove(&self, id: LocationId) -> Option<RawLocation> {
        rw_write(&self.entities, "infra::memory", "location_remove").remove(&id)
    }

    /// Change the publication status of an entity. Returns whether it exists.
    pub fn set_status(&self, id: LocationId, status: &str) -> bool {
        let mut entities = rw_write(&self.entities, "infra::memory", "location_status");
        match entities.get_mut(&id) {
            Some(raw) => {
                raw.status = status.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn find_many_calls(&self) -> usize {
        self.find_many_calls.load(Ordering::SeqCst)
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), RepoError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::from_persistence("location source unavailable"))
        }
    }
}

#[async_trait]
impl LocationSource for InMemoryLocationSource {
    async fn find(&self, id: LocationId) -> Result<Option<RawLocation>, RepoError> {
        self.ensure_available()?;
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(rw_read(&self.entities, "infra::memory", "location_find")
            .get(&id)
            .cloned())
    }

    async fn find_many(&self, ids: &[LocationId]) -> Result<Vec<RawLocation>, RepoError> {
        self.ensure_available()?;
        self.find_many_calls.fetch_add(1, Ordering::SeqCst);
        let entities = rw_read(&self.entities, "infra::memory", "location_find_many");
        Ok(ids
            .iter()
            .filter_map(|id| entities.get(id).cloned())
            .collect())
    }

    async fn published_ids(&self) -> Result<Vec<LocationId>, RepoError> {
        self.ensure_available()?;
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let entities = rw_read(&self.entities, "infra::memory", "location_listing");
        let mut visible: Vec<(String, LocationId)> = entities
            .values()
            .filter(|raw| raw.is_visible())
            .map(|raw| (raw.title.clone().unwrap_or_default(), raw.id))
            .collect();
        visible.sort();
        Ok(visible.into_iter().map(|(_, id)| id).collect())
    }
}

/// Stock rows held in memory, ordered by (product, location).
#[derive(Default)]
pub struct InMemoryStockTable {
    rows: Mutex<BTreeMap<(ProductId, LocationId), StockRecord>>,
}

impl InMemoryStockTable {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StockTable for InMemoryStockTable {
    async fn get(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<StockRecord>, RepoError> {
        Ok(mutex_lock(&self.rows, "infra::memory", "stock_get")
            .get(&(product_id, location_id))
            .cloned())
    }

    async fn upsert_levels(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        levels: StockLevels,
    ) -> Result<StockRecord, RepoError> {
        let record = StockRecord {
            product_id,
            location_id,
            stock: levels.stock,
            reserved: levels.reserved,
            minimum: levels.minimum,
            updated_at: OffsetDateTime::now_utc(),
        };
        mutex_lock(&self.rows, "infra::memory", "stock_upsert_levels")
            .insert((product_id, location_id), record.clone());
        Ok(record)
    }

    async fn upsert_quantity(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        quantity: Quantity,
    ) -> Result<StockRecord, RepoError> {
        let mut rows = mutex_lock(&self.rows, "infra::memory", "stock_upsert_quantity");
        let record = rows
            .entry((product_id, location_id))
            .or_insert_with(|| StockRecord {
                product_id,
                location_id,
                stock: 0,
                reserved: 0,
                minimum: 0,
                updated_at: OffsetDateTime::now_utc(),
            });
        record.stock = quantity;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn sum_by_product(&self, product_id: ProductId) -> Result<Quantity, RepoError> {
        let rows = mutex_lock(&self.rows, "infra::memory", "stock_sum");
        rows.range((product_id, LocationId::MIN)..=(product_id, LocationId::MAX))
            .try_fold(0, |total: Quantity, (_, record)| total.checked_add(record.stock))
            .ok_or_else(|| RepoError::Integrity {
                message: format!("stock total for product {product_id} is out of range"),
            })
    }

    async fn list_by_product(&self, product_id: ProductId) -> Result<Vec<StockRecord>, RepoError> {
        let rows = mutex_lock(&self.rows, "infra::memory", "stock_list");
        Ok(rows
            .range((product_id, LocationId::MIN)..=(product_id, LocationId::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// Fixed shipping zone layout.
#[derive(Debug, Clone)]
pub struct StaticZoneRegistry {
    zones: Vec<ShippingZone>,
    default_zone: ShippingZone,
}

impl StaticZoneRegistry {
    pub fn new(zones: Vec<ShippingZone>, default_zone: ShippingZone) -> Self {
        Self {
            zones,
            default_zone,
        }
    }
}

#[async_trait]
impl ShippingZoneRegistry for StaticZoneRegistry {
    async fn zones(&self) -> Result<Vec<ShippingZone>, RepoError> {
        Ok(self
            .zones
            .iter()
            .filter(|zone| !zone.is_default())
            .cloned()
            .collect())
    }

    async fn default_zone(&self) -> Result<ShippingZone, RepoError> {
        Ok(self.default_zone.clone())
    }
}
