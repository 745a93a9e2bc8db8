//! Repository traits describing the authoritative backends.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::location::{LocationId, RawLocation};
use crate::domain::shipping::ShippingZone;
use crate::domain::stock::{ProductId, Quantity, StockLevels, StockRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Lookup of location entities in the content repository.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Fetch one entity regardless of type or status.
    async fn find(&self, id: LocationId) -> Result<Option<RawLocation>, RepoError>;

    /// Fetch several entities at once. Missing ids are left out.
    async fn find_many(&self, ids: &[LocationId]) -> Result<Vec<RawLocation>, RepoError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(raw) = self.find(*id).await? {
                found.push(raw);
            }
        }
        Ok(found)
    }

    /// Identifiers of published locations, ordered by title.
    async fn published_ids(&self) -> Result<Vec<LocationId>, RepoError>;
}

/// Row storage for stock keyed by (product, location).
#[async_trait]
pub trait StockTable: Send + Sync {
    async fn get(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Result<Option<StockRecord>, RepoError>;

    /// Insert or replace all quantities of the pair.
    async fn upsert_levels(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        levels: StockLevels,
    ) -> Result<StockRecord, RepoError>;

    /// Insert or update only the stock quantity of the pair. New rows start
    /// with no reservations and no minimum.
    async fn upsert_quantity(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        quantity: Quantity,
    ) -> Result<StockRecord, RepoError>;

    /// Stock summed across every location; zero when the product has no rows.
    async fn sum_by_product(&self, product_id: ProductId) -> Result<Quantity, RepoError>;

    /// Every row of a product, ordered by location id.
    async fn list_by_product(&self, product_id: ProductId) -> Result<Vec<StockRecord>, RepoError>;
}

/// Read access to the configured shipping zones.
#[async_trait]
pub trait ShippingZoneRegistry: Send + Sync {
    /// Configured zones in match order, excluding the default zone.
    async fn zones(&self) -> Result<Vec<ShippingZone>, RepoError>;

    /// The catch-all zone.
    async fn default_zone(&self) -> Result<ShippingZone, RepoError>;
}
