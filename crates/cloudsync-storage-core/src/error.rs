use thiserror::Error;

/// Errors returned by blob stores and the user-record collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A content blob (never the root index) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The checksum tag names an algorithm this layer does not know.
    #[error("Unsupported checksum: {0}")]
    InvalidChecksum(String),

    /// The root hash cannot be recorded by this backend.
    #[error("Invalid root hash: {0}")]
    InvalidRootHash(String),

    /// The backend cannot perform the requested operation (e.g. presigned URLs).
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Optimistic root-index update lost the race.
    #[error("Generation conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// Local filesystem error, propagated unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Object storage or other remote backend failure.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
