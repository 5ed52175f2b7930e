use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::checksum::Checksum;
use crate::error::StorageError;
use crate::root_index::RootIndex;

/// Owned byte stream handed to and from blob stores.
///
/// Dropping the reader releases the file descriptor or connection behind it.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// A blob opened for reading.
pub struct LoadedBlob {
    pub reader: BlobReader,
    pub size: u64,
    pub checksum: Option<Checksum>,
}

impl std::fmt::Debug for LoadedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedBlob")
            .field("size", &self.size)
            .field("checksum", &self.checksum)
            .finish_non_exhaustive()
    }
}

/// A URL the client can use to transfer a blob directly with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Blob storage abstraction shared by the local and object-storage backends.
///
/// Operations for distinct `(owner, id)` pairs are independent. Nothing here
/// orders concurrent writes to the same id; the backend's last write wins.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend identifier used in logs.
    fn backend_name(&self) -> &'static str;

    /// Open a content blob.
    ///
    /// Returns `StorageError::NotFound` if the blob does not exist.
    async fn load_blob(&self, owner: &str, blob_id: &str) -> Result<LoadedBlob, StorageError>;

    /// Store a content blob.
    ///
    /// `checksum` is a tagged checksum (`"sha256=..."`). Only the algorithm is
    /// checked here; the value is handed to the backend untouched.
    async fn store_blob(
        &self,
        owner: &str,
        blob_id: &str,
        reader: BlobReader,
        checksum: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Read the user's root index. A user who never wrote one gets
    /// [`RootIndex::empty`], not an error.
    async fn get_root_index(&self, owner: &str) -> Result<RootIndex, StorageError>;

    /// Replace the user's root index and return the generation the backend assigned.
    async fn write_root_index(
        &self,
        owner: &str,
        generation: u64,
        root_hash: &str,
    ) -> Result<u64, StorageError>;

    /// Presign a direct transfer URL for a blob.
    async fn get_blob_url(
        &self,
        _owner: &str,
        blob_id: &str,
        _for_write: bool,
    ) -> Result<PresignedUrl, StorageError> {
        Err(StorageError::UnsupportedOperation(format!(
            "{} backend cannot presign URLs (blob {})",
            self.backend_name(),
            blob_id
        )))
    }
}
