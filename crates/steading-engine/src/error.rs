//! Error types for the engine binary.

use steading_core::ConfigError;

/// Errors that can occur during engine startup or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The `PostgreSQL` settlement store could not be reached.
    #[error("store error: {source}")]
    Store {
        /// The underlying data layer error.
        #[from]
        source: steading_store::PgError,
    },

    /// The NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the failure.
        message: String,
    },
}
