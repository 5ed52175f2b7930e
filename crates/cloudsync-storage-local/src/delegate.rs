use async_trait::async_trait;
use cloudsync_storage_core::{BlobReader, Checksum, StorageError};

/// A blob as returned by the filesystem delegate.
pub struct DelegateBlob {
    pub reader: BlobReader,
    pub size: u64,
    /// Backend-assigned write counter for this id.
    pub generation: u64,
    pub checksum: Option<Checksum>,
}

/// Per-file persistence that [`crate::LocalBlobStore`] builds on.
///
/// Generations are owned by the delegate: the store reports whatever the
/// delegate returns and never computes one itself.
#[async_trait]
pub trait FileSystemDelegate: Send + Sync {
    /// Open a blob; `StorageError::NotFound` if it was never written.
    async fn load_blob(&self, owner: &str, blob_id: &str) -> Result<DelegateBlob, StorageError>;

    /// Write a blob and return its new generation.
    ///
    /// `last_generation` is the generation the caller last observed, if any.
    async fn store_blob(
        &self,
        owner: &str,
        blob_id: &str,
        reader: BlobReader,
        checksum: Option<&Checksum>,
        last_generation: Option<u64>,
    ) -> Result<u64, StorageError>;
}
