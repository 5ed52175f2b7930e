use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::put_object::builders::PutObjectFluentBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ChecksumMode;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, SecondsFormat, Utc};
use cloudsync_storage_core::{
    BlobReader, BlobStore, Checksum, ChecksumAlgorithm, LoadedBlob, PresignedUrl, RootIndex,
    StorageError, ROOT_BLOB_ID,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

/// Width of one root-index history line: RFC 3339 UTC timestamp (20), a
/// space, a 64-character hash and a newline.
pub const ROOT_ENTRY_SIZE: u64 = 86;

const ROOT_HASH_LEN: usize = 64;

/// The root index generation is the number of history lines in the object.
pub fn generation_from_size(size: u64) -> u64 {
    size / ROOT_ENTRY_SIZE
}

/// Append one fixed-width history line to the stored root-index object.
fn append_root_entry(
    history: &[u8],
    root_hash: &str,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, StorageError> {
    if root_hash.len() != ROOT_HASH_LEN || root_hash.contains([' ', '\n']) {
        return Err(StorageError::InvalidRootHash(format!(
            "root hash must be {} characters without separators, got {:?}",
            ROOT_HASH_LEN, root_hash
        )));
    }

    let mut data = Vec::with_capacity(history.len() + ROOT_ENTRY_SIZE as usize);
    data.extend_from_slice(history);
    if !data.is_empty() && !data.ends_with(b"\n") {
        // Keep existing lines aligned even if a previous writer left the
        // last entry unterminated.
        data.push(b'\n');
    }
    let line = format!(
        "{} {}\n",
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        root_hash
    );
    data.extend_from_slice(line.as_bytes());
    Ok(data)
}

/// Latest hash recorded in a root-index history object.
fn latest_root_hash(history: &[u8]) -> String {
    let text = String::from_utf8_lossy(history);
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| match line.split_once(' ') {
            Some((_, hash)) => hash.to_string(),
            None => line.to_string(),
        })
        .unwrap_or_default()
}

/// Attach a tagged checksum to the matching native S3 checksum field.
fn with_checksum(request: PutObjectFluentBuilder, checksum: &Checksum) -> PutObjectFluentBuilder {
    let value = checksum.value.clone();
    match checksum.algorithm {
        ChecksumAlgorithm::Crc32 => request.checksum_crc32(value),
        ChecksumAlgorithm::Crc32c => request.checksum_crc32_c(value),
        ChecksumAlgorithm::Sha1 => request.checksum_sha1(value),
        ChecksumAlgorithm::Sha256 => request.checksum_sha256(value),
    }
}

/// The checksum S3 reports for a downloaded object, by priority.
fn reported_checksum(output: &GetObjectOutput) -> Option<Checksum> {
    Checksum::first_reported(|algorithm| match algorithm {
        ChecksumAlgorithm::Crc32 => output.checksum_crc32(),
        ChecksumAlgorithm::Crc32c => output.checksum_crc32_c(),
        ChecksumAlgorithm::Sha1 => output.checksum_sha1(),
        ChecksumAlgorithm::Sha256 => output.checksum_sha256(),
    })
}

/// Blob store on an S3-compatible bucket.
///
/// Storage layout:
/// ```text
/// {bucket}/
///   {owner}/
///     root            # root-index history, one 86-byte line per write
///     {blob_id}       # content blobs
/// ```
#[derive(Clone)]
pub struct S3BlobStore {
    s3_client: S3Client,
    bucket_name: String,
    url_expiry: Duration,
}

impl S3BlobStore {
    pub fn new(s3_client: S3Client, bucket_name: String, url_expiry: Duration) -> Self {
        Self {
            s3_client,
            bucket_name,
            url_expiry,
        }
    }

    fn object_key(&self, owner: &str, blob_id: &str) -> String {
        format!("{}/{}", owner, blob_id)
    }

    /// GET an object with checksum mode enabled. `None` if the key does not exist.
    async fn get_object(&self, key: &str) -> Result<Option<GetObjectOutput>, StorageError> {
        let result = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .checksum_mode(ChecksumMode::Enabled)
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(output)),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                Err(StorageError::Backend(format!(
                    "S3 get_object error: {}",
                    service_error
                )))
            }
        }
    }

    async fn read_body(output: GetObjectOutput) -> Result<Vec<u8>, StorageError> {
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read S3 object body: {}", e)))?
            .into_bytes();
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), level = "debug")]
    async fn load_blob(&self, owner: &str, blob_id: &str) -> Result<LoadedBlob, StorageError> {
        let key = self.object_key(owner, blob_id);
        let output = self
            .get_object(&key)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("blob {} of user {}", blob_id, owner)))?;

        let size = output.content_length().unwrap_or(0).max(0) as u64;
        let checksum = reported_checksum(&output);
        debug!("Opened S3 object {} ({} bytes, checksum {:?})", key, size, checksum);

        Ok(LoadedBlob {
            reader: Box::new(Box::pin(output.body.into_async_read())),
            size,
            checksum,
        })
    }

    #[instrument(skip(self, reader), level = "debug")]
    async fn store_blob(
        &self,
        owner: &str,
        blob_id: &str,
        mut reader: BlobReader,
        checksum: Option<&str>,
    ) -> Result<(), StorageError> {
        let checksum = Checksum::parse_optional(checksum)?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let data_len = data.len();

        let key = self.object_key(owner, blob_id);
        let mut request = self
            .s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(data));
        if let Some(checksum) = &checksum {
            request = with_checksum(request, checksum);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 put_object error: {}", e)))?;

        debug!("Stored S3 object {} ({} bytes)", key, data_len);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_root_index(&self, owner: &str) -> Result<RootIndex, StorageError> {
        let key = self.object_key(owner, ROOT_BLOB_ID);
        let history = match self.get_object(&key).await? {
            Some(output) => Self::read_body(output).await?,
            None => {
                debug!("No root index for user {}", owner);
                return Ok(RootIndex::empty());
            }
        };

        Ok(RootIndex {
            root_hash: latest_root_hash(&history),
            generation: generation_from_size(history.len() as u64),
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn write_root_index(
        &self,
        owner: &str,
        generation: u64,
        root_hash: &str,
    ) -> Result<u64, StorageError> {
        let key = self.object_key(owner, ROOT_BLOB_ID);
        let history = match self.get_object(&key).await? {
            Some(output) => Self::read_body(output).await?,
            None => Vec::new(),
        };

        let current = generation_from_size(history.len() as u64);
        if current != generation {
            warn!(
                owner,
                current, generation, "Root index written over a different generation"
            );
        }

        let data = append_root_entry(&history, root_hash, Utc::now())?;
        let new_generation = generation_from_size(data.len() as u64);

        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 put_object error: {}", e)))?;

        debug!("Wrote root index for {} at generation {}", owner, new_generation);
        Ok(new_generation)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_blob_url(
        &self,
        owner: &str,
        blob_id: &str,
        for_write: bool,
    ) -> Result<PresignedUrl, StorageError> {
        let key = self.object_key(owner, blob_id);
        let config = PresigningConfig::expires_in(self.url_expiry)
            .map_err(|e| StorageError::Backend(format!("Invalid presign expiry: {}", e)))?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.url_expiry)
                .map_err(|e| StorageError::Backend(format!("Invalid presign expiry: {}", e)))?;

        let url = if for_write {
            self.s3_client
                .put_object()
                .bucket(&self.bucket_name)
                .key(&key)
                .presigned(config)
                .await
                .map_err(|e| StorageError::Backend(format!("S3 presign put error: {}", e)))?
                .uri()
                .to_string()
        } else {
            self.s3_client
                .get_object()
                .bucket(&self.bucket_name)
                .key(&key)
                .presigned(config)
                .await
                .map_err(|e| StorageError::Backend(format!("S3 presign get error: {}", e)))?
                .uri()
                .to_string()
        };

        debug!("Presigned {} URL for {}", if for_write { "PUT" } else { "GET" }, key);
        Ok(PresignedUrl { url, expires_at })
    }
}
