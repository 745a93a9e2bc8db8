//! Domain layer types and invariants.

pub mod location;
pub mod shipping;
pub mod stock;
