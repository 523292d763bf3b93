//! Error types for the `PostgreSQL` settlement store.

use steading_core::StoreError;

/// Errors that can occur in the `PostgreSQL` layer.
#[derive(Debug, thiserror::Error)]
pub enum PgError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A configuration error (bad URL, bad pool settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored value could not be mapped to a domain type.
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl From<PgError> for StoreError {
    fn from(error: PgError) -> Self {
        Self::Backend {
            message: error.to_string(),
        }
    }
}
