//! Per-location stock access.
//!
//! [`StockAccessor`] talks to the stock table directly. [`StockService`]
//! layers the cache on top and raises invalidation after writes.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::cache::{CacheManager, InvalidationObserver, TtlBand};
use crate::domain::location::LocationId;
use crate::domain::stock::{ProductId, Quantity, StockLevels, StockRecord};

use super::repos::{RepoError, StockTable};

fn valid_pair(product_id: ProductId, location_id: LocationId) -> bool {
    product_id > 0 && location_id > 0
}

fn ensure_valid_pair(product_id: ProductId, location_id: LocationId) -> Result<(), RepoError> {
    if product_id <= 0 {
        return Err(RepoError::invalid_input(format!(
            "product id must be positive, got {product_id}"
        )));
    }
    if location_id <= 0 {
        return Err(RepoError::invalid_input(format!(
            "location id must be positive, got {location_id}"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct StockAccessor {
    table: Arc<dyn StockTable>,
}

impl StockAccessor {
    pub fn new(table: Arc<dyn StockTable>) -> Self {
        Self { table }
    }

    pub async fn get_stock(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<Quantity>, RepoError> {
        Ok(self
            .get_record(product_id, location_id)
            .await?
            .map(|record| record.stock))
    }

    pub async fn get_record(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<StockRecord>, RepoError> {
        if !valid_pair(product_id, location_id) {
            return Ok(None);
        }
        self.table.get(product_id, location_id).await
    }

    /// Set the stock quantity, keeping reservations and the minimum.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        quantity: Quantity,
    ) -> Result<StockRecord, RepoError> {
        ensure_valid_pair(product_id, location_id)?;
        let record = self
            .table
            .upsert_quantity(product_id, location_id, quantity)
            .await?;
        debug!(stock = record.stock, "Stock quantity written");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn set_levels(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        levels: StockLevels,
    ) -> Result<StockRecord, RepoError> {
        ensure_valid_pair(product_id, location_id)?;
        self.table
            .upsert_levels(product_id, location_id, levels)
            .await
    }

    pub async fn get_total_stock(&self, product_id: ProductId) -> Result<Quantity, RepoError> {
        if product_id <= 0 {
            return Ok(0);
        }
        self.table.sum_by_product(product_id).await
    }

    pub async fn records_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, RepoError> {
        if product_id <= 0 {
            return Ok(Vec::new());
        }
        self.table.list_by_product(product_id).await
    }
}

/// Cached stock reads with write-through invalidation.
#[derive(Clone)]
pub struct StockService {
    accessor: StockAccessor,
}

impl StockService {
    pub fn new(table: Arc<dyn StockTable>) -> Self {
        Self {
            accessor: StockAccessor::new(table),
        }
    }

    pub fn accessor(&self) -> &StockAccessor {
        &self.accessor
    }

    /// The pair's record; absent pairs are not cached.
    pub async fn stock_at(
        &self,
        cache: &mut CacheManager,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<StockRecord>, RepoError> {
        if !valid_pair(product_id, location_id) {
            return Ok(None);
        }

        let key = cache.keys().stock_by_product_location(product_id, location_id);
        if let Some(record) = cache.get::<StockRecord>(&key).await {
            return Ok(Some(record));
        }

        let record = self.accessor.get_record(product_id, location_id).await?;
        if let Some(record) = &record {
            cache.set(&key, record, TtlBand::Short).await;
        }
        Ok(record)
    }

    /// Stock summed over all locations.
    pub async fn product_stock(
        &self,
        cache: &mut CacheManager,
        product_id: ProductId,
    ) -> Result<Quantity, RepoError> {
        if product_id <= 0 {
            return Ok(0);
        }

        let key = cache.keys().stock_by_product(product_id);
        if let Some(total) = cache.get::<Quantity>(&key).await {
            return Ok(total);
        }

        let total = self.accessor.get_total_stock(product_id).await?;
        cache.set(&key, &total, TtlBand::Short).await;
        Ok(total)
    }

    pub async fn update_stock(
        &self,
        cache: &mut CacheManager,
        product_id: ProductId,
        location_id: LocationId,
        quantity: Quantity,
    ) -> Result<StockRecord, RepoError> {
        let record = self
            .accessor
            .update_stock(product_id, location_id, quantity)
            .await?;
        cache.stock_changed(product_id, Some(location_id)).await;
        Ok(record)
    }

    pub async fn set_levels(
        &self,
        cache: &mut CacheManager,
        product_id: ProductId,
        location_id: LocationId,
        levels: StockLevels,
    ) -> Result<StockRecord, RepoError> {
        let record = self
            .accessor
            .set_levels(product_id, location_id, levels)
            .await?;
        cache.stock_changed(product_id, Some(location_id)).await;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryStockTable;

    fn accessor() -> StockAccessor {
        StockAccessor::new(Arc::new(InMemoryStockTable::new()))
    }

    #[tokio::test]
    async fn update_keeps_reserved_and_minimum() {
        let accessor = accessor();
        accessor
            .set_levels(
                5,
                2,
                StockLevels {
                    stock: 10,
                    reserved: 3,
                    minimum: 4,
                },
            )
            .await
            .expect("set levels");

        let record = accessor.update_stock(5, 2, 20).await.expect("update");
        assert_eq!(record.stock, 20);
        assert_eq!(record.reserved, 3);
        assert_eq!(record.minimum, 4);
    }

    #[tokio::test]
    async fn new_pair_starts_without_reservations() {
        let accessor = accessor();
        let record = accessor.update_stock(5, 2, 7).await.expect("update");
        assert_eq!(record.levels(), StockLevels {
            stock: 7,
            reserved: 0,
            minimum: 0
        });
        assert_eq!(accessor.get_stock(5, 2).await.expect("read"), Some(7));
    }

    #[tokio::test]
    async fn invalid_ids_read_empty_and_reject_writes() {
        let accessor = accessor();
        assert_eq!(accessor.get_stock(0, 1).await.expect("read"), None);
        assert_eq!(accessor.get_total_stock(-1).await.expect("sum"), 0);
        assert!(accessor
            .records_for_product(0)
            .await
            .expect("list")
            .is_empty());

        let err = accessor.update_stock(1, 0, 5).await.unwrap_err();
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn total_sums_locations() {
        let accessor = accessor();
        assert_eq!(accessor.get_total_stock(9).await.expect("sum"), 0);
        accessor.update_stock(9, 1, 4).await.expect("write");
        accessor.update_stock(9, 3, 6).await.expect("write");
        accessor.update_stock(8, 1, 100).await.expect("write");
        assert_eq!(accessor.get_total_stock(9).await.expect("sum"), 10);

        let locations: Vec<_> = accessor
            .records_for_product(9)
            .await
            .expect("list")
            .into_iter()
            .map(|record| record.location_id)
            .collect();
        assert_eq!(locations, vec![1, 3]);
    }
}
