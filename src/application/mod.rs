//! Services reading through the cache to the authoritative backends.

pub mod locations;
pub mod repos;
pub mod stock;
