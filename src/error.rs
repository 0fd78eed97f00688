//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("store error: {0}")]
    Store(String),

    /// The data layer was used before a store was successfully initialised.
    #[error("store not initialized; call StoreManager::initialize first")]
    NotInitialized,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("remote index error: {0}")]
    Remote(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
