//! Cached location catalog.
//!
//! The single place other subsystems read location data from. Individual
//! locations and the published aggregate are cached; every derived view is a
//! filter over the aggregate, so invalidating the aggregate key keeps all of
//! them correct.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::cache::{CacheManager, InvalidationObserver, TtlBand};
use crate::domain::location::{Location, LocationId, LocationType};
use crate::domain::shipping::{ShippingLink, ShippingZone};

use super::repos::{LocationSource, RepoError, ShippingZoneRegistry};

pub(crate) const METRIC_LOCATION_REBUILD_MS: &str = "stockpoint_location_rebuild_ms";

/// Published locations in title order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSet {
    locations: Vec<Location>,
}

impl LocationSet {
    /// Build a set, keeping the first occurrence of each id.
    pub fn new(locations: Vec<Location>) -> Self {
        let mut seen = HashSet::new();
        let locations = locations
            .into_iter()
            .filter(|location| seen.insert(location.id))
            .collect();
        Self { locations }
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<LocationId> {
        self.locations.iter().map(|location| location.id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// A subset preserving order.
    pub fn filter(&self, mut keep: impl FnMut(&Location) -> bool) -> Self {
        Self {
            locations: self
                .locations
                .iter()
                .filter(|location| keep(location))
                .cloned()
                .collect(),
        }
    }

    pub fn into_vec(self) -> Vec<Location> {
        self.locations
    }
}

impl IntoIterator for LocationSet {
    type Item = Location;
    type IntoIter = std::vec::IntoIter<Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.into_iter()
    }
}

impl<'a> IntoIterator for &'a LocationSet {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.iter()
    }
}

/// Entry of a location picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub id: LocationId,
    pub label: String,
}

impl SelectOption {
    fn for_location(location: &Location) -> Self {
        Self {
            id: location.id,
            label: format!(
                "{} (#{}) — {}",
                location.title,
                location.id,
                location.location_type.label()
            ),
        }
    }
}

pub struct LocationRepository {
    source: Arc<dyn LocationSource>,
    zones: Arc<dyn ShippingZoneRegistry>,
}

impl LocationRepository {
    pub fn new(source: Arc<dyn LocationSource>, zones: Arc<dyn ShippingZoneRegistry>) -> Self {
        Self { source, zones }
    }

    /// Every published location, cached as one aggregate.
    #[instrument(skip(self, cache))]
    pub async fn get_published_stores(
        &self,
        cache: &mut CacheManager,
    ) -> Result<LocationSet, RepoError> {
        let key = cache.keys().published_locations();
        if let Some(set) = cache.get::<LocationSet>(&key).await {
            return Ok(set);
        }

        let started_at = Instant::now();
        let ids = self.source.published_ids().await?;
        let listed = ids.len();

        let mut locations = Vec::with_capacity(listed);
        for id in ids {
            // Ids that no longer resolve (unpublished since listing) are skipped.
            if let Some(location) = self.get_store_by_id(cache, id).await? {
                locations.push(location);
            }
        }

        let set = LocationSet::new(locations);
        cache.set(&key, &set, TtlBand::Long).await;

        histogram!(METRIC_LOCATION_REBUILD_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(
            listed,
            resolved = set.len(),
            "Published location list rebuilt"
        );

        Ok(set)
    }

    /// One published location. Ids that are non-positive, missing, of another
    /// entity type or unpublished resolve to `None`.
    #[instrument(skip(self, cache))]
    pub async fn get_store_by_id(
        &self,
        cache: &mut CacheManager,
        id: LocationId,
    ) -> Result<Option<Location>, RepoError> {
        if id <= 0 {
            return Ok(None);
        }

        let key = cache.keys().location(id);
        if let Some(location) = cache.get::<Location>(&key).await {
            return Ok(Some(location));
        }

        let Some(raw) = self.source.find(id).await? else {
            debug!(location_id = id, "Location not found");
            return Ok(None);
        };
        if !raw.is_visible() {
            debug!(
                location_id = id,
                entity_type = %raw.entity_type,
                status = %raw.status,
                "Location not visible"
            );
            return Ok(None);
        }

        let location = Location::from(raw);
        cache.set(&key, &location, TtlBand::Long).await;
        Ok(Some(location))
    }

    pub async fn get_distribution_centers(
        &self,
        cache: &mut CacheManager,
    ) -> Result<LocationSet, RepoError> {
        self.get_stores_by_type(cache, LocationType::DistributionCenter)
            .await
    }

    pub async fn get_physical_stores(
        &self,
        cache: &mut CacheManager,
    ) -> Result<LocationSet, RepoError> {
        self.get_stores_by_type(cache, LocationType::Store).await
    }

    pub async fn get_stores_by_type(
        &self,
        cache: &mut CacheManager,
        location_type: LocationType,
    ) -> Result<LocationSet, RepoError> {
        let published = self.get_published_stores(cache).await?;
        Ok(published.filter(|location| location.location_type == location_type))
    }

    /// Published locations linked to a shipping method instance.
    pub async fn get_stores_by_shipping_instance(
        &self,
        cache: &mut CacheManager,
        instance_id: u64,
    ) -> Result<LocationSet, RepoError> {
        let published = self.get_published_stores(cache).await?;
        Ok(published.filter(|location| location.is_linked_to(instance_id)))
    }

    /// Resolve many ids with one backend round-trip for the cache misses.
    ///
    /// Returns exactly the ids [`Self::get_store_by_id`] would resolve.
    #[instrument(skip(self, cache, ids), fields(requested = ids.len()))]
    pub async fn bulk_load(
        &self,
        cache: &mut CacheManager,
        ids: &[LocationId],
    ) -> Result<HashMap<LocationId, Location>, RepoError> {
        let mut seen = HashSet::new();
        let wanted: Vec<LocationId> = ids
            .iter()
            .copied()
            .filter(|id| *id > 0 && seen.insert(*id))
            .collect();

        let mut loaded = HashMap::with_capacity(wanted.len());
        let mut misses = Vec::new();
        for id in wanted {
            let key = cache.keys().location(id);
            match cache.get::<Location>(&key).await {
                Some(location) => {
                    loaded.insert(id, location);
                }
                None => misses.push(id),
            }
        }

        if misses.is_empty() {
            return Ok(loaded);
        }

        let requested: HashSet<LocationId> = misses.iter().copied().collect();
        for raw in self.source.find_many(&misses).await? {
            if !requested.contains(&raw.id) || !raw.is_visible() {
                continue;
            }
            let location = Location::from(raw);
            let key = cache.keys().location(location.id);
            cache.set(&key, &location, TtlBand::Long).await;
            loaded.insert(location.id, location);
        }

        debug!(
            cache_misses = misses.len(),
            loaded = loaded.len(),
            "Bulk location load complete"
        );

        Ok(loaded)
    }

    /// First shipping method instance linked to the location, searching the
    /// configured zones in order and then the default zone.
    ///
    /// Reads the zone registry live on every call.
    #[instrument(skip(self, cache))]
    pub async fn get_shipping_method_for_store(
        &self,
        cache: &mut CacheManager,
        id: LocationId,
    ) -> Result<Option<ShippingLink>, RepoError> {
        let Some(location) = self.get_store_by_id(cache, id).await? else {
            return Ok(None);
        };
        if location.shipping_instances.is_empty() {
            return Ok(None);
        }

        let find_in = |zone: &ShippingZone| {
            zone.methods
                .iter()
                .find(|method| location.is_linked_to(method.instance_id))
                .map(|method| ShippingLink::new(zone, method))
        };

        for zone in self.zones.zones().await? {
            if let Some(link) = find_in(&zone) {
                return Ok(Some(link));
            }
        }

        let default_zone = self.zones.default_zone().await?;
        Ok(find_in(&default_zone))
    }

    /// Picker entries in title order.
    pub async fn format_for_select(
        &self,
        cache: &mut CacheManager,
    ) -> Result<Vec<SelectOption>, RepoError> {
        let published = self.get_published_stores(cache).await?;
        Ok(published.iter().map(SelectOption::for_location).collect())
    }

    pub async fn exists(&self, cache: &mut CacheManager, id: LocationId) -> Result<bool, RepoError> {
        Ok(self.get_store_by_id(cache, id).await?.is_some())
    }

    pub async fn is_distribution_center(
        &self,
        cache: &mut CacheManager,
        id: LocationId,
    ) -> Result<bool, RepoError> {
        Ok(self
            .get_store_by_id(cache, id)
            .await?
            .is_some_and(|location| location.is_distribution_center()))
    }

    /// Drop cached data for a location after any write to it.
    pub async fn location_changed(&self, cache: &mut CacheManager, id: LocationId) {
        cache.location_changed(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::{LOCATION_ENTITY_TYPE, RawLocation};

    fn location(id: LocationId, title: &str) -> Location {
        Location::from(RawLocation {
            id,
            entity_type: LOCATION_ENTITY_TYPE.to_string(),
            status: "publish".to_string(),
            title: Some(title.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn location_set_keeps_first_duplicate() {
        let set = LocationSet::new(vec![location(1, "A"), location(2, "B"), location(1, "C")]);
        assert_eq!(set.ids(), vec![1, 2]);
        assert_eq!(set.get(1).map(|l| l.title.as_str()), Some("A"));
    }

    #[test]
    fn filter_preserves_order() {
        let set = LocationSet::new(vec![location(3, "A"), location(1, "B"), location(2, "C")]);
        let odd = set.filter(|location| location.id % 2 == 1);
        assert_eq!(odd.ids(), vec![3, 1]);
    }

    #[test]
    fn select_label_format() {
        let option = SelectOption::for_location(&location(12, "Harbor"));
        assert_eq!(option.label, "Harbor (#12) — Physical Store");
    }
}
