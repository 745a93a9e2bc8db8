//! Invalidation entry points for write paths.
//!
//! Code that changes authoritative data (admin saves, bulk imports, external
//! syncs) reports the change through [`InvalidationObserver`] before the next
//! read in any context.

use async_trait::async_trait;
use tracing::info;

use crate::domain::location::LocationId;
use crate::domain::stock::ProductId;

use super::events::{CacheEvent, EventKind};
use super::manager::CacheManager;
use super::planner::InvalidationPlan;

/// Receives write-side change notifications.
///
/// # Usage
///
/// ```ignore
/// // After unpublishing a location:
/// cache.location_changed(location.id).await;
/// ```
#[async_trait]
pub trait InvalidationObserver: Send {
    /// Handle a batch of events together.
    async fn notify_all(&mut self, events: Vec<CacheEvent>);

    async fn notify(&mut self, kind: EventKind) {
        self.notify_all(vec![CacheEvent::new(kind)]).await;
    }

    /// A location was published, unpublished, edited or removed.
    async fn location_changed(&mut self, location_id: LocationId) {
        self.notify(EventKind::LocationUpdated { location_id }).await;
    }

    /// Stock changed for a product, optionally at a single location.
    async fn stock_changed(&mut self, product_id: ProductId, location_id: Option<LocationId>) {
        self.notify(EventKind::StockUpdated {
            product_id,
            location_id,
        })
        .await;
    }
}

impl CacheManager {
    /// Execute a plan against both tiers.
    pub async fn apply_plan(&mut self, plan: &InvalidationPlan) {
        if plan.flush_all {
            self.flush().await;
            return;
        }

        for key in &plan.keys {
            self.delete(key).await;
        }
        for pattern in &plan.patterns {
            self.delete_pattern(pattern).await;
        }
    }
}

#[async_trait]
impl InvalidationObserver for CacheManager {
    async fn notify_all(&mut self, events: Vec<CacheEvent>) {
        if events.is_empty() {
            return;
        }

        let event_count = events.len();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind.clone()).collect();
        let plan = InvalidationPlan::from_events(events, self.keys());

        info!(
            event_count,
            event_kinds = ?kinds,
            plan = %plan,
            "Cache invalidation starting"
        );

        self.apply_plan(&plan).await;
    }
}
