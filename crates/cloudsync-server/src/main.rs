//! cloudsync HTTP server.
//!
//! This server:
//! - Serves the document-sync blob and root-index endpoints from a local
//!   directory or an S3-compatible bucket
//! - Registers Google Drive integrations through OAuth2
//! - Browses, downloads and uploads Drive files for registered integrations

use std::sync::Arc;

use clap::Parser;
use cloudsync_integrations::{
    GDriveClient, IntegrationAuthorizer, OAuthClient, OAuthStateRegistry, TokenManager,
};
use cloudsync_storage_core::{BlobStore, UserStore};
use cloudsync_storage_local::{DirectoryDelegate, FileUserStore, LocalBlobStore};
use cloudsync_storage_s3::S3BlobStore;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;

use config::{Config, StorageBackend};
use handlers::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting cloudsync-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Host: {}", config.host);
    info!("  Port: {}", config.port);
    info!("  Data dir: {}", config.data_dir.display());

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let blobs: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Local => {
            info!("  Storage: local directory");
            Arc::new(LocalBlobStore::new(DirectoryDelegate::new(&config.data_dir)))
        }
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| anyhow::anyhow!("S3_BUCKET is required for the s3 backend"))?;
            let settings = config.s3_settings()?;
            info!(
                "  Storage: s3 bucket {} (endpoint: {})",
                bucket,
                settings.endpoint_url.as_deref().unwrap_or("aws")
            );
            Arc::new(S3BlobStore::new(
                settings.build_client(),
                bucket,
                config.url_expiry(),
            ))
        }
    };

    let users: Arc<dyn UserStore> = Arc::new(FileUserStore::new(&config.data_dir));

    let oauth = match config.google_oauth() {
        Some(oauth_config) => {
            info!("  Google Drive: enabled");
            Some(Arc::new(OAuthClient::new(oauth_config)?))
        }
        None => {
            warn!("  Google Drive: DISABLED (no OAuth client configured)");
            warn!("  Set GDRIVE_CLIENT_ID and GDRIVE_CLIENT_SECRET to enable it");
            None
        }
    };

    let state = AppState {
        blobs,
        users: users.clone(),
        authorizer: Arc::new(IntegrationAuthorizer::new(
            oauth.clone(),
            Arc::new(OAuthStateRegistry::new()),
            users,
        )),
        tokens: oauth.map(|client| Arc::new(TokenManager::new(client))),
        gdrive: Arc::new(GDriveClient::new()),
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Received SIGTERM, initiating shutdown");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
