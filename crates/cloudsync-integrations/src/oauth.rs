//! OAuth2 authorization-code client for drive integrations.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::IntegrationError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";
const GOOGLE_DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Path the provider redirects back to after consent.
pub const GOOGLE_CALLBACK_PATH: &str = "ui/api/integrations/google/complete";

/// Static OAuth client registration.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl OAuthClientConfig {
    /// Google Drive client redirecting to `{storage_url}/ui/api/integrations/google/complete`.
    pub fn google_drive(client_id: String, client_secret: String, storage_url: &str) -> Self {
        let mut redirect_url = storage_url.to_string();
        if !redirect_url.ends_with('/') {
            redirect_url.push('/');
        }
        redirect_url.push_str(GOOGLE_CALLBACK_PATH);

        Self {
            client_id,
            client_secret,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            redirect_url,
            scopes: vec![GOOGLE_DRIVE_SCOPE.to_string()],
        }
    }
}

/// Stored credential, serialized into `IntegrationConfig::access_token`.
///
/// Field names follow the common OAuth2 token JSON (`access_token`,
/// `token_type`, `refresh_token`, `expiry`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    /// Expired, or about to expire within five minutes. Tokens without an
    /// expiry never expire.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(exp) => Utc::now() >= exp - chrono::Duration::minutes(5),
            None => false,
        }
    }
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<&str>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(default_token_type),
            // Providers may or may not rotate the refresh token.
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }
}

/// OAuth2 client: builds consent URLs, exchanges codes, refreshes tokens.
pub struct OAuthClient {
    config: OAuthClientConfig,
    auth_url: Url,
    http: Client,
}

impl OAuthClient {
    pub fn new(config: OAuthClientConfig) -> Result<Self, IntegrationError> {
        let auth_url = Url::parse(&config.auth_url).map_err(|e| {
            warn!("Invalid OAuth authorization URL {}: {}", config.auth_url, e);
            IntegrationError::NotConfigured
        })?;
        Ok(Self {
            config,
            auth_url,
            http: Client::new(),
        })
    }

    /// Consent URL carrying `state`, requesting offline access so a refresh
    /// token is issued.
    pub fn auth_code_url(&self, state: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);
        url.into()
    }

    /// Exchange an authorization code for a token.
    #[instrument(skip(self, code), level = "debug")]
    pub async fn exchange(&self, code: &str) -> Result<OAuthToken, IntegrationError> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IntegrationError::ExchangeFailure(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::ExchangeFailure(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| IntegrationError::ExchangeFailure(e.to_string()))?;
        debug!("Exchanged authorization code for a token");
        Ok(token.into_token(None))
    }

    /// Refresh an expired token using its refresh token.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken, IntegrationError> {
        let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
            IntegrationError::InvalidCredential(
                "token expired and no refresh token is stored".to_string(),
            )
        })?;

        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::Upstream(format!(
                "OAuth token refresh failed: {} {}",
                status, body
            )));
        }

        let refreshed: TokenResponse = resp.json().await?;
        Ok(refreshed.into_token(Some(refresh_token)))
    }
}
