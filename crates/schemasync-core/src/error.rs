//! Error types for the schema pipeline.

/// Errors produced while building or comparing schema models.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The target DDL document could not be parsed.
    #[error("{message} at byte offset {offset}")]
    Parse {
        /// Short explanation of what went wrong.
        message: String,
        /// Byte offset into the original document.
        offset: usize,
    },

    /// A schema model violates a structural invariant.
    #[error("schema invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Creates a parse error at the given byte offset.
    #[must_use]
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::Parse {
            message: message.into(),
            offset,
        }
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, Error>;
