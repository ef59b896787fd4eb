//! Error handling for tally.
//! One error enum per concern, `thiserror` only.

pub mod config_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use storage_error::StorageError;

/// Top-level error aggregating subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type TallyResult<T> = Result<T, TallyError>;
