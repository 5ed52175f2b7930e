use std::io::Cursor;

use async_trait::async_trait;
use cloudsync_storage_core::{
    BlobReader, BlobStore, Checksum, LoadedBlob, RootIndex, StorageError, ROOT_BLOB_ID,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument};

use crate::delegate::FileSystemDelegate;

/// Blob store on top of a local filesystem delegate.
///
/// The root index is an ordinary blob at [`ROOT_BLOB_ID`] whose content is the
/// root hash. Its generation is whatever the delegate assigned on the last write.
pub struct LocalBlobStore<D> {
    delegate: D,
}

impl<D: FileSystemDelegate> LocalBlobStore<D> {
    pub fn new(delegate: D) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl<D: FileSystemDelegate> BlobStore for LocalBlobStore<D> {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self), level = "debug")]
    async fn load_blob(&self, owner: &str, blob_id: &str) -> Result<LoadedBlob, StorageError> {
        let blob = self.delegate.load_blob(owner, blob_id).await?;
        Ok(LoadedBlob {
            reader: blob.reader,
            size: blob.size,
            checksum: blob.checksum,
        })
    }

    #[instrument(skip(self, reader), level = "debug")]
    async fn store_blob(
        &self,
        owner: &str,
        blob_id: &str,
        reader: BlobReader,
        checksum: Option<&str>,
    ) -> Result<(), StorageError> {
        let checksum = Checksum::parse_optional(checksum)?;
        self.delegate
            .store_blob(owner, blob_id, reader, checksum.as_ref(), None)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_root_index(&self, owner: &str) -> Result<RootIndex, StorageError> {
        let mut blob = match self.delegate.load_blob(owner, ROOT_BLOB_ID).await {
            Ok(blob) => blob,
            Err(StorageError::NotFound(_)) => {
                info!("No root index for user {}", owner);
                return Ok(RootIndex::empty());
            }
            Err(e) => return Err(e),
        };

        let mut root_hash = String::new();
        blob.reader.read_to_string(&mut root_hash).await?;

        debug!("Root index for {} at generation {}", owner, blob.generation);
        Ok(RootIndex {
            root_hash,
            generation: blob.generation,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn write_root_index(
        &self,
        owner: &str,
        generation: u64,
        root_hash: &str,
    ) -> Result<u64, StorageError> {
        let reader: BlobReader = Box::new(Cursor::new(root_hash.as_bytes().to_vec()));
        let new_generation = self
            .delegate
            .store_blob(owner, ROOT_BLOB_ID, reader, None, Some(generation))
            .await?;
        debug!(
            "Wrote root index for {} (generation {} -> {})",
            owner, generation, new_generation
        );
        Ok(new_generation)
    }
}
