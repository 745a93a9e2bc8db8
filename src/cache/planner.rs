//! Invalidation plan generation.
//!
//! Merges a batch of cache events into the minimal set of keys and patterns
//! to delete.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::domain::location::LocationId;
use crate::domain::stock::ProductId;

use super::events::{CacheEvent, EventKind};
use super::keys::KeyBuilder;

/// Stock scope collected for one product while planning.
#[derive(Debug, Default)]
struct StockScope {
    all_locations: bool,
    locations: BTreeSet<LocationId>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Exact keys to delete.
    pub keys: BTreeSet<String>,
    /// Glob patterns to delete.
    pub patterns: BTreeSet<String>,
    /// Flush the whole namespace instead of individual keys.
    pub flush_all: bool,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, patterns: {}, flush_all: {} }}",
            self.keys.len(),
            self.patterns.len(),
            self.flush_all,
        )
    }
}

impl InvalidationPlan {
    /// Merge events into a plan.
    ///
    /// - Deduplicates by event ID
    /// - Ignores non-positive identifiers
    /// - A product-wide stock event subsumes that product's per-location keys
    pub fn from_events(events: Vec<CacheEvent>, keys: &KeyBuilder) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();
        let mut stock: BTreeMap<ProductId, StockScope> = BTreeMap::new();
        let mut locations_changed = false;

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            match &event.kind {
                EventKind::FlushAll => plan.flush_all = true,
                EventKind::StockUpdated {
                    product_id,
                    location_id,
                } => {
                    if *product_id <= 0 {
                        continue;
                    }
                    let scope = stock.entry(*product_id).or_default();
                    match *location_id {
                        Some(location_id) if location_id > 0 => {
                            scope.locations.insert(location_id);
                        }
                        Some(_) => {}
                        None => scope.all_locations = true,
                    }
                }
                kind => {
                    if let Some(location_id) = kind.location_id().filter(|id| *id > 0) {
                        plan.keys.insert(keys.location(location_id));
                        locations_changed = true;
                    }
                }
            }
        }

        if plan.flush_all {
            plan.keys.clear();
            return plan;
        }

        if locations_changed {
            plan.keys.insert(keys.published_locations());
        }

        for (product_id, scope) in stock {
            plan.keys.insert(keys.stock_by_product(product_id));
            if scope.all_locations {
                plan.patterns.insert(keys.stock_product_pattern(product_id));
            } else {
                for location_id in scope.locations {
                    plan.keys
                        .insert(keys.stock_by_product_location(product_id, location_id));
                }
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.patterns.is_empty() && !self.flush_all
    }
}
