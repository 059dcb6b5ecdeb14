//! Error types for the database-facing half of the synchronizer.

/// Errors that can occur while talking to the target database.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Invalid connection configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Could not establish a connection.
    #[error("connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    /// A query against the information schema failed.
    #[error("introspection failed: {0}")]
    Introspection(#[source] sqlx::Error),

    /// A plan statement failed to execute. Earlier statements have already
    /// committed.
    #[error("failed to execute `{statement}`: {source}")]
    Execution {
        /// The statement that failed.
        statement: String,
        /// The underlying database error.
        source: sqlx::Error,
    },

    /// A model-level error from the core pipeline.
    #[error(transparent)]
    Core(#[from] schemasync_core::error::Error),

    /// Filesystem error while reading the target schema.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, SyncError>;
