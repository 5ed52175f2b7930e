//! Pending OAuth authorizations, one per user.
//!
//! Entries never expire: an abandoned authorization stays until the user
//! starts a new one (which overwrites it) or it is dropped explicitly.

use std::collections::HashMap;
use std::sync::Mutex;

use cloudsync_storage_core::IntegrationConfig;
use tracing::debug;

/// Lock-guarded map of user id to the integration awaiting its OAuth callback.
#[derive(Debug, Default)]
pub struct OAuthStateRegistry {
    inner: Mutex<HashMap<String, IntegrationConfig>>,
}

impl OAuthStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending authorization under a fresh random token and
    /// return that token. Any previous pending entry for the user is replaced.
    pub fn create(&self, user_id: &str, mut integration: IntegrationConfig) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        integration.id = token.clone();

        let mut map = self.inner.lock().expect("oauth state registry poisoned");
        if map.insert(user_id.to_string(), integration).is_some() {
            debug!("Replaced pending authorization for user {}", user_id);
        }
        token
    }

    /// True iff the user has a pending entry whose token equals `token`.
    pub fn compare(&self, user_id: &str, token: &str) -> bool {
        let map = self.inner.lock().expect("oauth state registry poisoned");
        map.get(user_id).is_some_and(|pending| pending.id == token)
    }

    /// Copy of the pending entry, if any.
    pub fn get(&self, user_id: &str) -> Option<IntegrationConfig> {
        let map = self.inner.lock().expect("oauth state registry poisoned");
        map.get(user_id).cloned()
    }

    /// Remove the user's pending entry. Idempotent.
    pub fn drop_state(&self, user_id: &str) {
        let mut map = self.inner.lock().expect("oauth state registry poisoned");
        map.remove(user_id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("oauth state registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
