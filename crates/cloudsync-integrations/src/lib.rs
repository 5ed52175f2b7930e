//! External drive integrations.
//!
//! OAuth2 authorization of integrations, token refresh, and Google Drive
//! browsing through a depth-bounded directory walker.

mod authorize;
mod browse;
mod content_type;
mod error;
mod gdrive;
mod oauth;
mod state;
mod token_manager;
mod walker;

pub use authorize::IntegrationAuthorizer;
pub use browse::{Download, GDriveBrowser, GOOGLE_DRIVE_ROOT_NAME};
pub use content_type::{
    is_convertible, provided_content_type, EXPORT_CONTENT_TYPE, GOOGLE_DOCUMENT, GOOGLE_FOLDER,
    GOOGLE_PRESENTATION, GOOGLE_SPREADSHEET,
};
pub use error::IntegrationError;
pub use gdrive::{DriveFile, GDriveClient, RemoteContent};
pub use oauth::{OAuthClient, OAuthClientConfig, OAuthToken, GOOGLE_CALLBACK_PATH};
pub use state::OAuthStateRegistry;
pub use token_manager::TokenManager;
pub use walker::{RemoteDirectoryWalker, RemoteDrive, RemoteEntry, ROOT_FOLDER_ID};
