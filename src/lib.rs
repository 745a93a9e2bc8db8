//! Cached catalog of stores and distribution centers with per-location stock.
//!
//! - [`cache`]: the two-tier cache context and its invalidation entry points
//! - [`application`]: location and stock services reading through the cache
//! - [`infra`]: Postgres and in-memory adapters, telemetry bootstrap
//! - [`config`]: layered settings

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
