use thiserror::Error;

/// Errors raised by the integration authorization flow and drive access.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// No OAuth client is configured for the provider.
    #[error("Google Drive integration is not available, configure an OAuth client to enable it")]
    NotConfigured,

    /// The callback state does not match the pending authorization, or none exists.
    #[error("Authentication request expired")]
    StateMismatch,

    /// The provider rejected the authorization code.
    #[error("Failed to exchange token: {0}")]
    ExchangeFailure(String),

    /// The credential could not be saved on the user record.
    #[error("Failed to register integration: {0}")]
    PersistenceFailure(String),

    /// The stored credential cannot be used.
    #[error("Invalid integration credential: {0}")]
    InvalidCredential(String),

    /// Network or API failure while talking to the provider.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(e: reqwest::Error) -> Self {
        IntegrationError::Upstream(e.to_string())
    }
}
