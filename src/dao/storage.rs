use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by blob store backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not complete a read or write.
    #[error("storage unavailable: {context}")]
    Unavailable {
        /// What the backend was doing when it failed.
        context: String,
        /// The underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(context: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            context,
            source: Box::new(source),
        }
    }
}
