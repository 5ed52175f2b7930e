use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blob::BlobStore;
use crate::error::StorageError;

/// Reserved blob id holding the root index. Content blob ids are hashes and
/// never collide with it.
pub const ROOT_BLOB_ID: &str = "root";

/// Per-user sync root: the current root hash and its generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootIndex {
    #[serde(rename = "hash")]
    pub root_hash: String,
    pub generation: u64,
}

impl RootIndex {
    /// The index of a user who has never synced.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root_hash.is_empty()
    }
}

/// Write a new root hash only if the stored generation still equals
/// `expected_generation`.
///
/// Backends offer no compare-and-swap, so this is a check-then-write: it
/// narrows the race window but cannot close it. A `Conflict` error means the
/// caller should re-read and retry.
pub async fn replace_root_index(
    store: &dyn BlobStore,
    owner: &str,
    expected_generation: u64,
    root_hash: &str,
) -> Result<u64, StorageError> {
    let current = store.get_root_index(owner).await?;
    if current.generation != expected_generation {
        warn!(
            owner,
            expected = expected_generation,
            actual = current.generation,
            "root index generation mismatch"
        );
        return Err(StorageError::Conflict {
            expected: expected_generation,
            actual: current.generation,
        });
    }

    let generation = store
        .write_root_index(owner, expected_generation, root_hash)
        .await?;
    debug!(owner, generation, "root index replaced");
    Ok(generation)
}
