use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed while serving a request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness constraint rejected the write.
    #[error("duplicate {entity}")]
    DuplicateKey { entity: &'static str },
    /// A transaction could not commit; nothing it wrote is visible.
    #[error("transaction aborted: {message}")]
    Aborted {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct an aborted-transaction error from any backend failure.
    pub fn aborted(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Aborted {
            message,
            source: Box::new(source),
        }
    }
}
