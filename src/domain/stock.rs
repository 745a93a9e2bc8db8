//! Per-location stock records and quantity arithmetic.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::location::LocationId;

pub type ProductId = i64;
pub type Quantity = i64;

/// Quantities written for a (product, location) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub stock: Quantity,
    pub reserved: Quantity,
    pub minimum: Quantity,
}

/// The single stock row of a (product, location) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub stock: Quantity,
    pub reserved: Quantity,
    pub minimum: Quantity,
    pub updated_at: OffsetDateTime,
}

impl StockRecord {
    /// Stock not held by reservations, never negative.
    pub fn available(&self) -> Quantity {
        self.stock.saturating_sub(self.reserved).max(0)
    }

    /// Whether stock dropped under the minimum threshold. Reservations do not count.
    pub fn below_minimum(&self) -> bool {
        self.stock < self.minimum
    }

    pub fn levels(&self) -> StockLevels {
        StockLevels {
            stock: self.stock,
            reserved: self.reserved,
            minimum: self.minimum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stock: Quantity, reserved: Quantity, minimum: Quantity) -> StockRecord {
        StockRecord {
            product_id: 1,
            location_id: 1,
            stock,
            reserved,
            minimum,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn available_subtracts_reserved() {
        assert_eq!(record(10, 3, 0).available(), 7);
        assert_eq!(record(10, 0, 0).available(), 10);
    }

    #[test]
    fn available_floors_at_zero() {
        assert_eq!(record(3, 10, 0).available(), 0);
        assert_eq!(record(0, 0, 0).available(), 0);
    }

    #[test]
    fn available_law_holds_over_a_grid() {
        for stock in 0..20 {
            for reserved in 0..20 {
                assert_eq!(
                    record(stock, reserved, 0).available(),
                    (stock - reserved).max(0)
                );
            }
        }
    }

    #[test]
    fn below_minimum_ignores_reserved() {
        assert!(record(4, 0, 5).below_minimum());
        assert!(!record(5, 0, 5).below_minimum());
        assert!(!record(6, 6, 5).below_minimum());
        assert!(record(4, 100, 5).below_minimum());
    }

    #[test]
    fn levels_mirror_fields() {
        let levels = record(9, 2, 3).levels();
        assert_eq!(
            levels,
            StockLevels {
                stock: 9,
                reserved: 2,
                minimum: 3
            }
        );
    }
}
