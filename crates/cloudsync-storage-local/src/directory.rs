use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cloudsync_storage_core::{BlobReader, Checksum, StorageError};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::delegate::{DelegateBlob, FileSystemDelegate};

/// Sidecar record kept next to every blob.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BlobMeta {
    generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
}

/// Filesystem delegate storing one file per blob.
///
/// Layout:
/// ```text
/// {base_dir}/
///   {owner}/
///     .lock                 # advisory lock held while writing
///     sync/{blob_id}        # blob content
///     meta/{blob_id}.json   # generation + checksum tag
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryDelegate {
    base_dir: PathBuf,
}

impl DirectoryDelegate {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn owner_dir(&self, owner: &str) -> Result<PathBuf, StorageError> {
        check_path_segment(owner)?;
        Ok(self.base_dir.join(owner))
    }

    fn blob_path(&self, owner: &str, blob_id: &str) -> Result<PathBuf, StorageError> {
        check_path_segment(blob_id)?;
        Ok(self.owner_dir(owner)?.join("sync").join(blob_id))
    }

    fn meta_path(&self, owner: &str, blob_id: &str) -> Result<PathBuf, StorageError> {
        check_path_segment(blob_id)?;
        Ok(self
            .owner_dir(owner)?
            .join("meta")
            .join(format!("{}.json", blob_id)))
    }

    async fn read_meta(&self, owner: &str, blob_id: &str) -> Result<BlobMeta, StorageError> {
        let path = self.meta_path(owner, blob_id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BlobMeta::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Take the owner's exclusive write lock. Released when the file is dropped.
    async fn lock_owner(&self, owner: &str) -> Result<std::fs::File, StorageError> {
        let dir = self.owner_dir(owner)?;
        fs::create_dir_all(&dir).await?;
        let path = dir.join(".lock");

        let file = tokio::task::spawn_blocking(move || -> io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            fs2::FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(|e| StorageError::Io(io::Error::other(e)))??;

        Ok(file)
    }
}

/// Sibling path a file is staged at before being renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn create_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Stream the reader into a staging file. Returns the number of bytes written.
async fn stage_content(path: &Path, reader: &mut BlobReader) -> Result<u64, StorageError> {
    create_parent(path).await?;
    let mut file = fs::File::create(path).await?;
    let size = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    Ok(size)
}

async fn stage_meta(path: &Path, meta: &BlobMeta) -> Result<(), StorageError> {
    create_parent(path).await?;
    fs::write(path, serde_json::to_vec(meta)?).await?;
    Ok(())
}

async fn discard_staged(paths: &[&Path]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove staging file {}: {}", path.display(), e);
            }
        }
    }
}

/// Reject ids that would escape the owner's directory.
fn check_path_segment(segment: &str) -> Result<(), StorageError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid path segment {:?}", segment),
        )));
    }
    Ok(())
}

#[async_trait]
impl FileSystemDelegate for DirectoryDelegate {
    #[instrument(skip(self), level = "debug")]
    async fn load_blob(&self, owner: &str, blob_id: &str) -> Result<DelegateBlob, StorageError> {
        let path = self.blob_path(owner, blob_id)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!(
                    "blob {} of user {}",
                    blob_id, owner
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        let meta = self.read_meta(owner, blob_id).await?;
        let checksum = match meta.checksum.as_deref() {
            Some(tag) => match Checksum::parse(tag) {
                Ok(checksum) => Some(checksum),
                Err(e) => {
                    warn!("Ignoring unreadable checksum for blob {}: {}", blob_id, e);
                    None
                }
            },
            None => None,
        };

        debug!("Opened blob {} ({} bytes, generation {})", blob_id, size, meta.generation);
        Ok(DelegateBlob {
            reader: Box::new(file),
            size,
            generation: meta.generation,
            checksum,
        })
    }

    #[instrument(skip(self, reader, checksum), level = "debug")]
    async fn store_blob(
        &self,
        owner: &str,
        blob_id: &str,
        mut reader: BlobReader,
        checksum: Option<&Checksum>,
        last_generation: Option<u64>,
    ) -> Result<u64, StorageError> {
        let blob_path = self.blob_path(owner, blob_id)?;
        let meta_path = self.meta_path(owner, blob_id)?;

        let _lock = self.lock_owner(owner).await?;

        let current = self.read_meta(owner, blob_id).await?.generation;
        if let Some(last) = last_generation {
            if last != current {
                warn!(
                    blob_id,
                    last, current, "Writer saw a stale generation, last write wins"
                );
            }
        }

        let meta = BlobMeta {
            generation: current + 1,
            checksum: checksum.map(ToString::to_string),
        };

        // Content and sidecar are both staged before either is renamed, so a
        // failed write leaves the previous blob untouched.
        let blob_tmp = staging_path(&blob_path);
        let meta_tmp = staging_path(&meta_path);
        let staged = async {
            let size = stage_content(&blob_tmp, &mut reader).await?;
            stage_meta(&meta_tmp, &meta).await?;
            Ok::<_, StorageError>(size)
        }
        .await;
        let size = match staged {
            Ok(size) => size,
            Err(e) => {
                discard_staged(&[blob_tmp.as_path(), meta_tmp.as_path()]).await;
                return Err(e);
            }
        };

        fs::rename(&blob_tmp, &blob_path).await?;
        fs::rename(&meta_tmp, &meta_path).await?;

        debug!(
            "Stored blob {} ({} bytes, generation {})",
            blob_id, size, meta.generation
        );
        Ok(meta.generation)
    }
}
