//! Cache error types

use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to connect to the backing store
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Generic backend error from the backing store
    #[error("Cache backend error: {0}")]
    BackendError(String),

    /// Failed to serialize a key part or cache entry
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// The subsystem is missing something it cannot proceed without
    /// (an id accessor, a store binding)
    #[error("Cache configuration error: {0}")]
    Configuration(String),

    /// A route type with no declared key template
    #[error("Undeclared route type: {0}")]
    InvalidRouteType(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
