//! Cache key builders and TTL bands.
//!
//! Every key handed to the cache tier is produced here so callers never
//! assemble key strings by hand.

use std::time::Duration;

use glob::Pattern;

use crate::domain::location::LocationId;
use crate::domain::stock::ProductId;

const PUBLISHED_LOCATIONS: &str = "published_locations";
const LOCATION: &str = "location";
const STOCK: &str = "stock";

/// Volatility class used to pick a shared-tier TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TtlBand {
    /// Location lists and entities (default 1h).
    Long,
    /// Product-level data (default 30min).
    Medium,
    /// Stock quantities (default 5min).
    Short,
    /// Fallback band (default 1min).
    #[default]
    VeryShort,
}

impl TtlBand {
    pub fn default_duration(self) -> Duration {
        match self {
            TtlBand::Long => Duration::from_secs(60 * 60),
            TtlBand::Medium => Duration::from_secs(30 * 60),
            TtlBand::Short => Duration::from_secs(5 * 60),
            TtlBand::VeryShort => Duration::from_secs(60),
        }
    }
}

/// Builds namespaced cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Aggregate key holding every published location.
    pub fn published_locations(&self) -> String {
        format!("{}{PUBLISHED_LOCATIONS}", self.prefix)
    }

    pub fn location(&self, id: LocationId) -> String {
        format!("{}{LOCATION}_{id}", self.prefix)
    }

    /// All stock rows of one product.
    pub fn stock_by_product(&self, product_id: ProductId) -> String {
        format!("{}{STOCK}_{product_id}", self.prefix)
    }

    pub fn stock_by_product_location(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> String {
        format!("{}{STOCK}_{product_id}_{location_id}", self.prefix)
    }

    /// Glob matching every per-location stock key of one product.
    ///
    /// Does not match the product-level key itself.
    pub fn stock_product_pattern(&self, product_id: ProductId) -> String {
        format!("{}{STOCK}_{product_id}_*", Pattern::escape(&self.prefix))
    }

    /// Glob matching every key in this namespace.
    pub fn namespace_pattern(&self) -> String {
        format!("{}*", Pattern::escape(&self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_prefix() {
        let keys = KeyBuilder::new("sp_");
        assert_eq!(keys.published_locations(), "sp_published_locations");
        assert_eq!(keys.location(12), "sp_location_12");
        assert_eq!(keys.stock_by_product(7), "sp_stock_7");
        assert_eq!(keys.stock_by_product_location(7, 12), "sp_stock_7_12");
    }

    #[test]
    fn product_pattern_matches_only_that_product() {
        let keys = KeyBuilder::new("sp_");
        let pattern = Pattern::new(&keys.stock_product_pattern(7)).expect("valid pattern");

        assert!(pattern.matches(&keys.stock_by_product_location(7, 12)));
        assert!(pattern.matches(&keys.stock_by_product_location(7, 3)));
        assert!(!pattern.matches(&keys.stock_by_product_location(70, 3)));
        assert!(!pattern.matches(&keys.stock_by_product(7)));
        assert!(!pattern.matches(&keys.location(7)));
    }

    #[test]
    fn prefix_metacharacters_are_escaped() {
        let keys = KeyBuilder::new("odd*[x]_");
        let pattern = Pattern::new(&keys.namespace_pattern()).expect("valid pattern");
        assert!(pattern.matches(&keys.location(1)));
        assert!(!pattern.matches("oddly_location_1"));
    }

    #[test]
    fn ttl_bands_are_ordered_by_volatility() {
        assert!(TtlBand::Long.default_duration() > TtlBand::Medium.default_duration());
        assert!(TtlBand::Medium.default_duration() > TtlBand::Short.default_duration());
        assert!(TtlBand::Short.default_duration() > TtlBand::VeryShort.default_duration());
        assert_eq!(TtlBand::default(), TtlBand::VeryShort);
    }
}
