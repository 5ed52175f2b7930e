//! Integration authorization flow.
//!
//! `begin` registers a pending integration and returns the consent URL.
//! `complete` validates the callback state, exchanges the code and appends
//! the integration (with its serialized token) to the user record. Any
//! failure leaves the user's integration list untouched; only success drops
//! the pending state, so a failed save can be retried with the same state.

use std::sync::Arc;

use cloudsync_storage_core::{IntegrationConfig, UserStore};
use tracing::{error, info, instrument, warn};

use crate::error::IntegrationError;
use crate::oauth::OAuthClient;
use crate::state::OAuthStateRegistry;

pub struct IntegrationAuthorizer {
    oauth: Option<Arc<OAuthClient>>,
    states: Arc<OAuthStateRegistry>,
    users: Arc<dyn UserStore>,
}

impl IntegrationAuthorizer {
    /// `oauth` is `None` when no client credentials are configured; every
    /// call then fails with `NotConfigured`.
    pub fn new(
        oauth: Option<Arc<OAuthClient>>,
        states: Arc<OAuthStateRegistry>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            oauth,
            states,
            users,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.oauth.is_some()
    }

    fn client(&self) -> Result<&OAuthClient, IntegrationError> {
        self.oauth.as_deref().ok_or(IntegrationError::NotConfigured)
    }

    /// Start an authorization and return the provider consent URL.
    #[instrument(skip(self, integration), level = "debug")]
    pub fn begin(
        &self,
        user_id: &str,
        integration: IntegrationConfig,
    ) -> Result<String, IntegrationError> {
        let client = self.client()?;
        let state = self.states.create(user_id, integration);
        Ok(client.auth_code_url(&state))
    }

    /// Finish an authorization from the provider callback.
    #[instrument(skip(self, code, state), level = "debug")]
    pub async fn complete(
        &self,
        user_id: &str,
        code: &str,
        state: &str,
    ) -> Result<IntegrationConfig, IntegrationError> {
        let client = self.client()?;

        if !self.states.compare(user_id, state) {
            warn!("OAuth callback state mismatch for user {}", user_id);
            return Err(IntegrationError::StateMismatch);
        }

        let token = client.exchange(code).await.inspect_err(|e| {
            error!("Token exchange failed for user {}: {}", user_id, e);
        })?;

        // A new authorization may have replaced ours while exchanging.
        let mut integration = self
            .states
            .get(user_id)
            .filter(|pending| pending.id == state)
            .ok_or(IntegrationError::StateMismatch)?;

        let mut user = self
            .users
            .get_user(user_id)
            .await
            .map_err(|e| IntegrationError::PersistenceFailure(e.to_string()))?;

        integration.access_token = serde_json::to_string(&token)
            .map_err(|e| IntegrationError::PersistenceFailure(e.to_string()))?;
        user.integrations.push(integration.clone());

        self.users.update_user(&user).await.map_err(|e| {
            error!("Error updating user {}: {}", user_id, e);
            IntegrationError::PersistenceFailure(e.to_string())
        })?;

        self.states.drop_state(user_id);
        info!(
            "Registered {} integration {} for user {}",
            integration.provider, integration.id, user_id
        );
        Ok(integration)
    }
}
