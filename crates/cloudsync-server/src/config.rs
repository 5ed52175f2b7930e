use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use cloudsync_integrations::OAuthClientConfig;
use cloudsync_storage_s3::S3Settings;

/// Where sync blobs and root indexes are kept.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files under the data directory.
    Local,
    /// S3-compatible bucket (AWS, R2, MinIO).
    S3,
}

/// Configuration for the cloudsync server.
#[derive(Parser, Debug, Clone)]
#[command(name = "cloudsync-server")]
#[command(about = "Document sync storage with Google Drive integrations")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value = "3000", env = "PORT")]
    pub port: u16,

    /// Directory holding user records and, for the local backend, blobs
    #[arg(long, default_value = "./data", env = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Public URL of this server (OAuth redirects point here)
    #[arg(long, default_value = "http://localhost:3000", env = "STORAGE_URL")]
    pub storage_url: String,

    /// Blob storage backend
    #[arg(long, value_enum, default_value_t = StorageBackend::Local, env = "STORAGE_BACKEND")]
    pub backend: StorageBackend,

    /// Bucket for the s3 backend
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint (MinIO etc.)
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Cloudflare account id, selects the R2 endpoint when no endpoint is given
    #[arg(long, env = "R2_ACCOUNT_ID")]
    pub r2_account_id: Option<String>,

    #[arg(long, default_value = "auto", env = "S3_REGION")]
    pub s3_region: String,

    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    #[arg(long, env = "S3_SECRET_ACCESS_KEY")]
    pub s3_secret_access_key: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "S3_FORCE_PATH_STYLE")]
    pub s3_force_path_style: bool,

    /// Lifetime of presigned blob URLs, in minutes
    #[arg(long, default_value = "60", env = "URL_EXPIRY_MINUTES")]
    pub url_expiry_minutes: u64,

    /// Google OAuth2 client id (Drive integration is disabled without it)
    #[arg(long, env = "GDRIVE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth2 client secret
    #[arg(long, env = "GDRIVE_CLIENT_SECRET")]
    pub google_client_secret: Option<String>,
}

impl Config {
    /// Explicit endpoint, else the R2 endpoint of the configured account.
    pub fn s3_endpoint(&self) -> Option<String> {
        self.s3_endpoint.clone().or_else(|| {
            self.r2_account_id
                .as_deref()
                .map(S3Settings::r2_endpoint)
        })
    }

    pub fn s3_settings(&self) -> anyhow::Result<S3Settings> {
        let access_key_id = self
            .s3_access_key_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("S3_ACCESS_KEY_ID is required for the s3 backend"))?;
        let secret_access_key = self.s3_secret_access_key.clone().ok_or_else(|| {
            anyhow::anyhow!("S3_SECRET_ACCESS_KEY is required for the s3 backend")
        })?;

        Ok(S3Settings {
            endpoint_url: self.s3_endpoint(),
            region: self.s3_region.clone(),
            access_key_id,
            secret_access_key,
            force_path_style: self.s3_force_path_style,
        })
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_minutes * 60)
    }

    /// Google Drive OAuth client, when both credentials are set.
    pub fn google_oauth(&self) -> Option<OAuthClientConfig> {
        match (&self.google_client_id, &self.google_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(
                OAuthClientConfig::google_drive(id.clone(), secret.clone(), &self.storage_url),
            ),
            _ => None,
        }
    }
}
