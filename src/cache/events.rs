//! Cache invalidation events.
//!
//! Write paths describe what changed; the planner turns a batch of events into
//! the keys and patterns to drop.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::location::LocationId;
use crate::domain::stock::ProductId;

/// A write-side change that affects cached data.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier, used to drop duplicates within a batch.
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

impl From<EventKind> for CacheEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A location became published.
    LocationPublished { location_id: LocationId },
    /// A published location's fields or shipping links were edited.
    LocationUpdated { location_id: LocationId },
    /// A location left the published state.
    LocationUnpublished { location_id: LocationId },
    /// A location was trashed or permanently deleted.
    LocationTrashed { location_id: LocationId },
    /// Stock changed for a product, at one location or at all of them.
    StockUpdated {
        product_id: ProductId,
        location_id: Option<LocationId>,
    },
    /// Drop everything in this cache namespace.
    FlushAll,
}

impl EventKind {
    /// The location affected by this event, if any.
    pub fn location_id(&self) -> Option<LocationId> {
        match self {
            EventKind::LocationPublished { location_id }
            | EventKind::LocationUpdated { location_id }
            | EventKind::LocationUnpublished { location_id }
            | EventKind::LocationTrashed { location_id } => Some(*location_id),
            EventKind::StockUpdated { .. } | EventKind::FlushAll => None,
        }
    }
}
