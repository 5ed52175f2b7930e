use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::model::IntegrationConfig;

/// The slice of a user record this workspace reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub integrations: Vec<IntegrationConfig>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn integration(&self, integration_id: &str) -> Option<&IntegrationConfig> {
        self.integrations.iter().find(|i| i.id == integration_id)
    }
}

/// User-record persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `StorageError::NotFound` for an unknown user.
    async fn get_user(&self, user_id: &str) -> Result<User, StorageError>;

    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// Load the user, creating an empty record on first contact.
    async fn ensure_user(&self, user_id: &str) -> Result<User, StorageError> {
        match self.get_user(user_id).await {
            Err(StorageError::NotFound(_)) => {
                let user = User::new(user_id);
                self.update_user(&user).await?;
                Ok(user)
            }
            other => other,
        }
    }
}
