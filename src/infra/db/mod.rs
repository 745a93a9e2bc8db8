//! Postgres-backed repository implementations.

mod locations;
mod stock;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};
use tracing::info;

use crate::config::DatabaseSettings;

use super::error::InfraError;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    /// Connect using resolved settings, applying migrations when enabled.
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, InfraError> {
        let url = settings
            .url
            .as_deref()
            .ok_or(InfraError::MissingDatabaseUrl)?;

        let pool = Self::connect(url, settings.max_connections.get())
            .await
            .map_err(InfraError::Connect)?;

        if settings.run_migrations {
            Self::run_migrations(&pool).await?;
            info!("Database migrations applied");
        }

        Ok(Self::new(pool))
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), InfraError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}
