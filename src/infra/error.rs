use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database.url is not set")]
    MissingDatabaseUrl,
    #[error("failed to connect to the stock database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to apply location and stock migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
