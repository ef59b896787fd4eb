/// Storage-layer errors.
///
/// `Query` is the data-layer category: a batched write that fails with it
/// is retried row by row. Everything else propagates to the caller.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("query failed: {message}")]
    Query { message: String },

    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("storage corruption detected: {details}")]
    CorruptionDetected { details: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("invalid SQL identifier: {name:?}")]
    InvalidIdentifier { name: String },
}

impl StorageError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn corruption(details: impl Into<String>) -> Self {
        Self::CorruptionDetected {
            details: details.into(),
        }
    }

    /// True for failures the ultra-safe per-row fallback can recover from.
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}
