//! HTTP handlers.
//!
//! Implements:
//! - GET /health
//! - POST /ui/api/integrations/google/authorize, GET /ui/api/integrations/google/complete
//! - GET /ui/api/integrations/{integration_id}/{explore,metadata,download}/{id}
//! - POST /ui/api/integrations/{integration_id}/upload/{folder_id}
//! - GET/PUT /sync/v3/root, GET/PUT /sync/v3/files/{id}, GET /sync/v3/urls/{id}

use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use cloudsync_integrations::{
    GDriveBrowser, GDriveClient, IntegrationAuthorizer, IntegrationError, TokenManager,
};
use cloudsync_storage_core::root_index::replace_root_index;
use cloudsync_storage_core::{
    BlobReader, BlobStore, IntegrationConfig, IntegrationFolder, IntegrationMetadata, RootIndex,
    UserStore, GOOGLE_DRIVE_PROVIDER, ROOT_BLOB_ID,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info};

use crate::error::{ApiError, Result};

/// Header identifying the calling user. Authentication happens upstream.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Tagged checksum of a blob (`sha256=...`), on upload and download.
pub const CHECKSUM_HEADER: &str = "x-goog-hash";

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
const DEFAULT_EXPLORE_DEPTH: u32 = 1;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub blobs: Arc<dyn BlobStore>,
    pub users: Arc<dyn UserStore>,
    pub authorizer: Arc<IntegrationAuthorizer>,
    /// `None` when no OAuth client is configured.
    pub tokens: Option<Arc<TokenManager>>,
    pub gdrive: Arc<GDriveClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/ui/api/integrations/google/authorize",
            post(authorize_handler),
        )
        .route(
            "/ui/api/integrations/google/complete",
            get(complete_handler),
        )
        .route(
            "/ui/api/integrations/{integration_id}/explore/{folder_id}",
            get(explore_handler),
        )
        .route(
            "/ui/api/integrations/{integration_id}/metadata/{file_id}",
            get(metadata_handler),
        )
        .route(
            "/ui/api/integrations/{integration_id}/download/{file_id}",
            get(download_handler),
        )
        .route(
            "/ui/api/integrations/{integration_id}/upload/{folder_id}",
            post(upload_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/sync/v3/root", get(get_root_handler).put(put_root_handler))
        .route(
            "/sync/v3/files/{blob_id}",
            get(get_file_handler).put(put_file_handler),
        )
        .route("/sync/v3/urls/{blob_id}", get(blob_url_handler))
        .with_state(state)
}

/// The calling user, from the `x-user-id` header.
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub backend: &'static str,
    pub integrations_enabled: bool,
}

/// GET /health
pub async fn health_handler(State(app): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        backend: app.blobs.backend_name(),
        integrations_enabled: app.authorizer.is_configured(),
    })
}

// =============================================================================
// Integration authorization
// =============================================================================

#[derive(Deserialize)]
pub struct AuthorizeRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub redirect: String,
}

/// POST /ui/api/integrations/google/authorize
pub async fn authorize_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>> {
    app.users.ensure_user(&user_id).await?;

    let integration = IntegrationConfig::new(GOOGLE_DRIVE_PROVIDER, req.name);
    let redirect = app.authorizer.begin(&user_id, integration)?;
    debug!("Started Google Drive authorization for user {}", user_id);

    Ok(Json(AuthorizeResponse { redirect }))
}

#[derive(Deserialize)]
pub struct CompleteParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// GET /ui/api/integrations/google/complete
pub async fn complete_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<CompleteParams>,
) -> Result<Response> {
    app.authorizer
        .complete(&user_id, &params.code, &params.state)
        .await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, "/integrations")]).into_response())
}

// =============================================================================
// Integration browsing
// =============================================================================

/// Drive view for one of the user's integrations.
async fn drive_for(app: &AppState, user_id: &str, integration_id: &str) -> Result<GDriveBrowser> {
    let user = app.users.get_user(user_id).await?;
    let integration = user
        .integration(integration_id)
        .ok_or_else(|| ApiError::IntegrationNotFound(integration_id.to_string()))?;

    if integration.provider != GOOGLE_DRIVE_PROVIDER {
        return Err(ApiError::BadRequest(format!(
            "unsupported integration provider {}",
            integration.provider
        )));
    }

    let tokens = app.tokens.as_ref().ok_or(IntegrationError::NotConfigured)?;
    let token = tokens.access_token(integration).await?;
    Ok(GDriveBrowser::new(Arc::clone(&app.gdrive), token))
}

#[derive(Deserialize)]
pub struct ExploreParams {
    pub depth: Option<u32>,
}

/// GET /ui/api/integrations/{integration_id}/explore/{folder_id}
pub async fn explore_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path((integration_id, folder_id)): Path<(String, String)>,
    Query(params): Query<ExploreParams>,
) -> Result<Json<IntegrationFolder>> {
    let drive = drive_for(&app, &user_id, &integration_id).await?;
    let depth = params.depth.unwrap_or(DEFAULT_EXPLORE_DEPTH);
    Ok(Json(drive.list(&folder_id, depth).await?))
}

/// GET /ui/api/integrations/{integration_id}/metadata/{file_id}
pub async fn metadata_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path((integration_id, file_id)): Path<(String, String)>,
) -> Result<Json<IntegrationMetadata>> {
    let drive = drive_for(&app, &user_id, &integration_id).await?;
    Ok(Json(drive.get_metadata(&file_id).await?))
}

/// GET /ui/api/integrations/{integration_id}/download/{file_id}
pub async fn download_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path((integration_id, file_id)): Path<(String, String)>,
) -> Result<Response> {
    let drive = drive_for(&app, &user_id, &integration_id).await?;
    let download = drive.download(&file_id).await?;

    let mut response = Response::new(Body::from_stream(download.content.stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&download.content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(length) = download.content.length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.name.replace('"', "")
    );
    if let Ok(v) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }

    Ok(response)
}

#[derive(Deserialize)]
pub struct UploadParams {
    pub name: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: String,
}

/// POST /ui/api/integrations/{integration_id}/upload/{folder_id}?name=
pub async fn upload_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path((integration_id, folder_id)): Path<(String, String)>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let drive = drive_for(&app, &user_id, &integration_id).await?;
    let id = drive
        .upload(&folder_id, &params.name, content_type, body)
        .await?;
    info!(
        "Uploaded {} to folder {} of integration {}",
        params.name, folder_id, integration_id
    );

    Ok(Json(UploadResponse { id }))
}

// =============================================================================
// Sync blobs and root index
// =============================================================================

/// GET /sync/v3/root
pub async fn get_root_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<RootIndex>> {
    Ok(Json(app.blobs.get_root_index(&user_id).await?))
}

#[derive(Deserialize)]
pub struct RootUpdate {
    /// Generation the client last read.
    pub generation: u64,
    pub hash: String,
}

/// PUT /sync/v3/root
///
/// Fails with 412 when `generation` is no longer current.
pub async fn put_root_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Json(update): Json<RootUpdate>,
) -> Result<Json<RootIndex>> {
    let generation =
        replace_root_index(app.blobs.as_ref(), &user_id, update.generation, &update.hash).await?;
    info!(
        "Root index of user {} now at generation {}",
        user_id, generation
    );

    Ok(Json(RootIndex {
        root_hash: update.hash,
        generation,
    }))
}

fn check_blob_id(blob_id: &str) -> Result<()> {
    if blob_id == ROOT_BLOB_ID {
        return Err(ApiError::BadRequest(format!(
            "blob id {} is reserved",
            ROOT_BLOB_ID
        )));
    }
    Ok(())
}

/// GET /sync/v3/files/{blob_id}
pub async fn get_file_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path(blob_id): Path<String>,
) -> Result<Response> {
    check_blob_id(&blob_id)?;
    let blob = app.blobs.load_blob(&user_id, &blob_id).await?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(blob.reader)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(blob.size));
    if let Some(checksum) = &blob.checksum {
        if let Ok(v) = HeaderValue::from_str(&checksum.to_string()) {
            headers.insert(CHECKSUM_HEADER, v);
        }
    }

    Ok(response)
}

/// PUT /sync/v3/files/{blob_id}
pub async fn put_file_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path(blob_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode> {
    check_blob_id(&blob_id)?;
    let checksum = headers
        .get(CHECKSUM_HEADER)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::BadRequest(format!("invalid {} header", CHECKSUM_HEADER)))
        })
        .transpose()?;

    let stream = body.into_data_stream().map_err(io::Error::other);
    let reader: BlobReader = Box::new(StreamReader::new(stream));
    app.blobs
        .store_blob(&user_id, &blob_id, reader, checksum)
        .await?;

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct BlobUrlParams {
    #[serde(default)]
    pub write: bool,
}

#[derive(Serialize)]
pub struct BlobUrlResponse {
    pub url: String,
    pub expires: DateTime<Utc>,
}

/// GET /sync/v3/urls/{blob_id}?write=
pub async fn blob_url_handler(
    State(app): State<AppState>,
    UserId(user_id): UserId,
    Path(blob_id): Path<String>,
    Query(params): Query<BlobUrlParams>,
) -> Result<Json<BlobUrlResponse>> {
    check_blob_id(&blob_id)?;
    let presigned = app
        .blobs
        .get_blob_url(&user_id, &blob_id, params.write)
        .await?;

    Ok(Json(BlobUrlResponse {
        url: presigned.url,
        expires: presigned.expires_at,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use cloudsync_integrations::{OAuthClient, OAuthClientConfig, OAuthStateRegistry};
    use cloudsync_storage_local::{DirectoryDelegate, FileUserStore, LocalBlobStore};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SHA256_TAG: &str =
        "sha256=9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    struct TestApp {
        _dir: TempDir,
        users: Arc<FileUserStore>,
        router: Router,
    }

    fn test_app(google: Option<&MockServer>) -> TestApp {
        let dir = TempDir::new().unwrap();
        let users = Arc::new(FileUserStore::new(dir.path()));

        let oauth = google.map(|server| {
            let mut config = OAuthClientConfig::google_drive(
                "client".to_string(),
                "secret".to_string(),
                "https://sync.example.com",
            );
            config.token_url = format!("{}/token", server.uri());
            Arc::new(OAuthClient::new(config).unwrap())
        });
        let gdrive = match google {
            Some(server) => GDriveClient::with_base_url(server.uri()),
            None => GDriveClient::new(),
        };

        let state = AppState {
            blobs: Arc::new(LocalBlobStore::new(DirectoryDelegate::new(dir.path()))),
            users: users.clone(),
            authorizer: Arc::new(IntegrationAuthorizer::new(
                oauth.clone(),
                Arc::new(OAuthStateRegistry::new()),
                users.clone(),
            )),
            tokens: oauth.map(|c| Arc::new(TokenManager::new(c))),
            gdrive: Arc::new(gdrive),
        };

        TestApp {
            _dir: dir,
            users,
            router: router(state),
        }
    }

    fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, "alice")
            .body(body)
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, value: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, "alice")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    async fn send(app: &TestApp, req: Request<Body>) -> Response {
        app.router.clone().oneshot(req).await.unwrap()
    }

    async fn body_bytes(resp: Response) -> Bytes {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(None);
        let req = Request::get("/health").body(Body::empty()).unwrap();

        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["integrations_enabled"], false);
    }

    #[tokio::test]
    async fn test_missing_user_header() {
        let app = test_app(None);
        let req = Request::get("/sync/v3/root").body(Body::empty()).unwrap();

        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_root_index_round_trip() {
        let app = test_app(None);

        let resp = send(&app, request("GET", "/sync/v3/root", Body::empty())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "hash": "", "generation": 0 }));

        let resp = send(
            &app,
            json_request("PUT", "/sync/v3/root", json!({ "generation": 0, "hash": "h1" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let written = body_json(resp).await;
        assert_eq!(written["hash"], "h1");
        let generation = written["generation"].as_u64().unwrap();
        assert!(generation > 0);

        // Stale generation is rejected.
        let resp = send(
            &app,
            json_request("PUT", "/sync/v3/root", json!({ "generation": 0, "hash": "h2" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(body_json(resp).await["code"], "GENERATION_CONFLICT");

        let resp = send(&app, request("GET", "/sync/v3/root", Body::empty())).await;
        assert_eq!(
            body_json(resp).await,
            json!({ "hash": "h1", "generation": generation })
        );
    }

    #[tokio::test]
    async fn test_file_round_trip_with_checksum() {
        let app = test_app(None);

        let mut put = request("PUT", "/sync/v3/files/blob-1", Body::from("test"));
        put.headers_mut()
            .insert(CHECKSUM_HEADER, HeaderValue::from_static(SHA256_TAG));
        let resp = send(&app, put).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, request("GET", "/sync/v3/files/blob-1", Body::empty())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CHECKSUM_HEADER], SHA256_TAG);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(body_bytes(resp).await, Bytes::from_static(b"test"));
    }

    #[tokio::test]
    async fn test_file_errors() {
        let app = test_app(None);

        let resp = send(&app, request("GET", "/sync/v3/files/missing", Body::empty())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let mut put = request("PUT", "/sync/v3/files/blob-2", Body::from("x"));
        put.headers_mut()
            .insert(CHECKSUM_HEADER, HeaderValue::from_static("md5=abc"));
        let resp = send(&app, put).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "INVALID_CHECKSUM");

        let resp = send(&app, request("PUT", "/sync/v3/files/root", Body::from("x"))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blob_url_unsupported_on_local() {
        let app = test_app(None);

        let resp = send(
            &app,
            request("GET", "/sync/v3/urls/blob-1?write=true", Body::empty()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_authorize_not_configured() {
        let app = test_app(None);

        let resp = send(
            &app,
            json_request(
                "POST",
                "/ui/api/integrations/google/authorize",
                json!({ "name": "Drive" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(body_json(resp).await["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_authorize_and_complete() {
        let google = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.live",
                "refresh_token": "1//r",
                "expires_in": 3600
            })))
            .mount(&google)
            .await;
        let app = test_app(Some(&google));

        let resp = send(
            &app,
            json_request(
                "POST",
                "/ui/api/integrations/google/authorize",
                json!({ "name": "My Drive" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let redirect = body_json(resp).await["redirect"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(redirect.contains("access_type=offline"));
        let state = redirect
            .split('&')
            .find_map(|pair| pair.strip_prefix("state="))
            .unwrap()
            .to_string();

        // Wrong state first: nothing is registered.
        let resp = send(
            &app,
            request(
                "GET",
                "/ui/api/integrations/google/complete?code=c&state=forged",
                Body::empty(),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Authentication request expired");
        assert!(app.users.get_user("alice").await.unwrap().integrations.is_empty());

        let uri = format!("/ui/api/integrations/google/complete?code=c&state={}", state);
        let resp = send(&app, request("GET", &uri, Body::empty())).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/integrations");

        let user = app.users.get_user("alice").await.unwrap();
        assert_eq!(user.integrations.len(), 1);
        assert_eq!(user.integrations[0].id, state);
        assert_eq!(user.integrations[0].name, "My Drive");

        // The state is consumed.
        let resp = send(&app, request("GET", &uri, Body::empty())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    async fn register_integration(app: &TestApp) {
        let mut user = app.users.ensure_user("alice").await.unwrap();
        let mut integration = IntegrationConfig::new(GOOGLE_DRIVE_PROVIDER, "Drive");
        integration.id = "int-1".to_string();
        integration.access_token = json!({
            "access_token": "ya29.live",
            "token_type": "Bearer",
            "expiry": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339()
        })
        .to_string();
        user.integrations.push(integration);
        app.users.update_user(&user).await.unwrap();
    }

    #[tokio::test]
    async fn test_explore_integration() {
        let google = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/folder-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "folder-1", "name": "Books", "mimeType": "application/vnd.google-apps.folder"
            })))
            .mount(&google)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("q", "'folder-1' in parents and trashed=false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    { "id": "doc", "name": "Notes", "mimeType": "application/vnd.google-apps.document" },
                    { "id": "sub", "name": "Sub", "mimeType": "application/vnd.google-apps.folder" }
                ]
            })))
            .mount(&google)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("q", "'sub' in parents and trashed=false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
            .mount(&google)
            .await;

        let app = test_app(Some(&google));
        register_integration(&app).await;

        let resp = send(
            &app,
            request(
                "GET",
                "/ui/api/integrations/int-1/explore/folder-1?depth=1",
                Body::empty(),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let tree = body_json(resp).await;
        assert_eq!(tree["name"], "Books");
        assert_eq!(tree["files"][0]["providedFileType"], "application/pdf");
        assert_eq!(tree["subFolders"][0]["id"], "sub");

        let resp = send(
            &app,
            request("GET", "/ui/api/integrations/nope/explore/root", Body::empty()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["code"], "INTEGRATION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_download_integration_file() {
        let google = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/book"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK-epub".to_vec()))
            .mount(&google)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/book"))
            .and(query_param("fields", "id, name, mimeType, size, modifiedTime, createdTime, fullFileExtension, thumbnailLink"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "book", "name": "b.epub", "mimeType": "application/epub+zip"
            })))
            .mount(&google)
            .await;

        let app = test_app(Some(&google));
        register_integration(&app).await;

        let resp = send(
            &app,
            request("GET", "/ui/api/integrations/int-1/download/book", Body::empty()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/epub+zip");
        assert_eq!(body_bytes(resp).await, Bytes::from_static(b"PK-epub"));
    }
}
