//! Google Drive API v3 client wrapper.
//!
//! Stateless: the bearer token is passed per call by the caller
//! (`TokenManager` resolves it from the integration record).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use cloudsync_storage_core::IntegrationFile;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::content_type::{provided_content_type, GOOGLE_FOLDER};
use crate::error::IntegrationError;
use crate::walker::RemoteEntry;

const GOOGLE_API_BASE: &str = "https://www.googleapis.com";

pub(crate) const FILE_FIELDS: &str =
    "id, name, mimeType, size, modifiedTime, createdTime, fullFileExtension, thumbnailLink";

/// File resource as returned by the Drive API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Decimal string; absent for native documents and folders.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub full_file_extension: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == GOOGLE_FOLDER
    }

    pub fn size_bytes(&self) -> u64 {
        self.size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// Last modification, falling back to creation time, then the epoch.
    pub fn changed_at(&self) -> DateTime<Utc> {
        self.modified_time
            .as_deref()
            .or(self.created_time.as_deref())
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn into_file(self) -> IntegrationFile {
        IntegrationFile {
            size: self.size_bytes(),
            date_changed: self.changed_at(),
            provided_file_type: provided_content_type(&self.mime_type).to_string(),
            file_extension: self.full_file_extension.unwrap_or_default(),
            source_file_type: self.mime_type,
            name: self.name,
            id: self.id,
        }
    }

    pub fn into_entry(self) -> RemoteEntry {
        if self.is_folder() {
            RemoteEntry::Folder {
                id: self.id,
                name: self.name,
            }
        } else {
            RemoteEntry::File(self.into_file())
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

/// Downloaded or exported file content.
pub struct RemoteContent {
    pub stream: BoxStream<'static, Result<Bytes, IntegrationError>>,
    /// Unknown for exports, which are streamed chunked.
    pub length: Option<u64>,
}

impl RemoteContent {
    fn from_response(resp: Response) -> Self {
        let length = resp.content_length();
        let stream = resp.bytes_stream().map_err(IntegrationError::from).boxed();
        Self { stream, length }
    }
}

#[cfg(test)]
impl RemoteContent {
    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Vec<u8>, IntegrationError> {
        let mut buf = Vec::with_capacity(self.length.unwrap_or(0) as usize);
        let mut stream = self.stream;
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }
}

/// Fail with the status and body of a non-success response.
async fn ensure_success(resp: Response, what: &str) -> Result<Response, IntegrationError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(IntegrationError::Upstream(format!(
        "Google Drive {} error {}: {}",
        what, status, body
    )))
}

/// Quote a value for a Drive `q` expression.
fn quote_query_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Google Drive API client (stateless, token provided per call).
pub struct GDriveClient {
    http: Client,
    api_base: String,
    upload_base: String,
}

impl Default for GDriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GDriveClient {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_API_BASE)
    }

    /// Point both the metadata and upload endpoints at another host.
    pub fn with_base_url(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            api_base: base.clone(),
            upload_base: base,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    /// `files/{file_id}[/{action}]`, with the id encoded as a single path segment.
    fn file_url(&self, file_id: &str, action: Option<&str>) -> Result<Url, IntegrationError> {
        let mut url = Url::parse(&self.files_url())
            .map_err(|e| IntegrationError::Upstream(format!("invalid Drive API URL: {}", e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                IntegrationError::Upstream(format!("invalid Drive API URL: {}", self.api_base))
            })?;
            segments.push(file_id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    /// All pages of a files.list query.
    async fn list(&self, token: &str, query: &str) -> Result<Vec<DriveFile>, IntegrationError> {
        let fields = format!("nextPageToken, files({})", FILE_FIELDS);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(self.files_url())
                .bearer_auth(token)
                .query(&[("q", query), ("fields", fields.as_str())]);
            if let Some(page) = &page_token {
                req = req.query(&[("pageToken", page.as_str())]);
            }

            let resp = ensure_success(req.send().await?, "list").await?;
            let page: FileList = resp.json().await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Children of a folder, trashed items excluded.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn list_children(
        &self,
        token: &str,
        folder_id: &str,
    ) -> Result<Vec<DriveFile>, IntegrationError> {
        let query = format!("{} in parents and trashed=false", quote_query_value(folder_id));
        let files = self.list(token, &query).await?;
        debug!("Listed {} entries in folder {}", files.len(), folder_id);
        Ok(files)
    }

    #[instrument(skip(self, token), level = "debug")]
    pub async fn list_shared_with_me(&self, token: &str) -> Result<Vec<DriveFile>, IntegrationError> {
        self.list(token, "sharedWithMe").await
    }

    #[instrument(skip(self, token), level = "debug")]
    pub async fn get_file(&self, token: &str, file_id: &str) -> Result<DriveFile, IntegrationError> {
        let resp = self
            .http
            .get(self.file_url(file_id, None)?)
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;
        let resp = ensure_success(resp, "metadata").await?;
        Ok(resp.json().await?)
    }

    /// Export a native document to `mime_type`.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn export(
        &self,
        token: &str,
        file_id: &str,
        mime_type: &str,
    ) -> Result<RemoteContent, IntegrationError> {
        let resp = self
            .http
            .get(self.file_url(file_id, Some("export"))?)
            .bearer_auth(token)
            .query(&[("mimeType", mime_type)])
            .send()
            .await?;
        let resp = ensure_success(resp, "export").await?;
        Ok(RemoteContent::from_response(resp))
    }

    /// Download the stored bytes of a file.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn download_media(
        &self,
        token: &str,
        file_id: &str,
    ) -> Result<RemoteContent, IntegrationError> {
        let resp = self
            .http
            .get(self.file_url(file_id, None)?)
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let resp = ensure_success(resp, "download").await?;
        Ok(RemoteContent::from_response(resp))
    }

    /// Plain GET of a thumbnail link. Thumbnail links are pre-signed.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>, IntegrationError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            IntegrationError::Upstream(format!("unable to retrieve thumbnail: {}", e))
        })?;
        let resp = ensure_success(resp, "thumbnail").await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| IntegrationError::Upstream(format!("unable to read thumbnail: {}", e)))?;
        Ok(bytes.to_vec())
    }

    /// Create a file in `folder_id` and return its id.
    #[instrument(skip(self, token, data), level = "debug", fields(data_len = data.len()))]
    pub async fn upload(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<String, IntegrationError> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
        });
        let boundary = uuid::Uuid::new_v4().simple().to_string();
        let body = multipart_related(&boundary, &metadata, mime_type, &data);

        let resp = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;
        let resp = ensure_success(resp, "upload").await?;

        let created: CreatedFile = resp.json().await?;
        debug!("Uploaded {} ({} bytes) as {}", name, data.len(), created.id);
        Ok(created.id)
    }
}

/// `multipart/related` body: JSON metadata part followed by the media part.
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata,
            t = mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
