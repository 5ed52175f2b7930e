//! Per-integration OAuth token manager with automatic refresh.
//!
//! Parses the credential stored on the integration record, caches it
//! in memory and refreshes it through the token endpoint when expired.

use std::sync::Arc;

use cloudsync_storage_core::IntegrationConfig;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::IntegrationError;
use crate::oauth::{OAuthClient, OAuthToken};

/// Resolves usable access tokens for integrations.
pub struct TokenManager {
    oauth: Arc<OAuthClient>,
    cache: DashMap<String, OAuthToken>,
}

impl TokenManager {
    pub fn new(oauth: Arc<OAuthClient>) -> Self {
        Self {
            oauth,
            cache: DashMap::new(),
        }
    }

    /// A valid access token for the integration, refreshing if necessary.
    ///
    /// Refreshed tokens live in the cache only; the stored record keeps its
    /// refresh token, which is all that is needed to refresh again.
    pub async fn access_token(
        &self,
        integration: &IntegrationConfig,
    ) -> Result<String, IntegrationError> {
        // 1. Check cache
        if let Some(cached) = self.cache.get(&integration.id) {
            if !cached.is_expired() {
                debug!("Token cache hit for integration {}", integration.id);
                return Ok(cached.access_token.clone());
            }
            debug!("Token expired for integration {}, refreshing", integration.id);
        }

        // 2. Parse the stored credential
        let stored: OAuthToken = serde_json::from_str(&integration.access_token).map_err(|e| {
            IntegrationError::InvalidCredential(format!(
                "unable to parse token of integration {}: {}",
                integration.id, e
            ))
        })?;

        if !stored.is_expired() {
            let access_token = stored.access_token.clone();
            self.cache.insert(integration.id.clone(), stored);
            return Ok(access_token);
        }

        // 3. Refresh
        info!(
            "Refreshing OAuth token for integration {} ({})",
            integration.id, integration.name
        );
        let refreshed = self.oauth.refresh(&stored).await?;
        let access_token = refreshed.access_token.clone();
        self.cache.insert(integration.id.clone(), refreshed);
        Ok(access_token)
    }
}
