use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use cloudsync_storage_core::{StorageError, User, UserStore};
use tokio::fs;
use tracing::{debug, instrument};

/// User records as JSON files under `{base_dir}/users/{user_id}.json`.
#[derive(Debug, Clone)]
pub struct FileUserStore {
    users_dir: PathBuf,
}

impl FileUserStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            users_dir: base_dir.into().join("users"),
        }
    }

    fn user_path(&self, user_id: &str) -> Result<PathBuf, StorageError> {
        if user_id.is_empty() || user_id.contains(['/', '\\']) || user_id.starts_with('.') {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid user id {:?}", user_id),
            )));
        }
        Ok(self.users_dir.join(format!("{}.json", user_id)))
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    #[instrument(skip(self), level = "debug")]
    async fn get_user(&self, user_id: &str) -> Result<User, StorageError> {
        let path = self.user_path(user_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("user {}", user_id)));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[instrument(skip(self, user), level = "debug", fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let path = self.user_path(&user.id)?;
        fs::create_dir_all(&self.users_dir).await?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(user)?).await?;
        fs::rename(&tmp, &path).await?;

        debug!(
            "Saved user {} ({} integrations)",
            user.id,
            user.integrations.len()
        );
        Ok(())
    }
}
