//! Google Drive browsing for one integration.
//!
//! Lists folder trees, serves file metadata with thumbnails, downloads
//! files (exporting native documents) and uploads into a folder.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cloudsync_storage_core::{IntegrationFolder, IntegrationMetadata};
use tracing::{debug, instrument};

use crate::content_type::{is_convertible, provided_content_type, EXPORT_CONTENT_TYPE};
use crate::error::IntegrationError;
use crate::gdrive::{DriveFile, GDriveClient, RemoteContent};
use crate::walker::{RemoteDirectoryWalker, RemoteDrive, RemoteEntry, ROOT_FOLDER_ID};

/// Display name of the synthesized root folder.
pub const GOOGLE_DRIVE_ROOT_NAME: &str = "Google Drive root";

/// A downloadable file with the content type it is served as.
pub struct Download {
    pub content: RemoteContent,
    pub content_type: String,
    pub name: String,
}

/// Google Drive view bound to one access token.
pub struct GDriveBrowser {
    client: Arc<GDriveClient>,
    token: String,
}

impl GDriveBrowser {
    pub fn new(client: Arc<GDriveClient>, token: String) -> Self {
        Self { client, token }
    }

    /// Folder tree below `folder_id`, `depth` levels deep.
    pub async fn list(
        &self,
        folder_id: &str,
        depth: u32,
    ) -> Result<IntegrationFolder, IntegrationError> {
        RemoteDirectoryWalker::new(self)
            .with_root(ROOT_FOLDER_ID, GOOGLE_DRIVE_ROOT_NAME)
            .walk(folder_id, depth)
            .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get_metadata(&self, file_id: &str) -> Result<IntegrationMetadata, IntegrationError> {
        let file = self.client.get_file(&self.token, file_id).await?;

        let thumbnail = match file.thumbnail_link.as_deref() {
            Some(link) if !link.is_empty() => self.client.fetch_thumbnail(link).await?,
            _ => Vec::new(),
        };

        Ok(IntegrationMetadata {
            id: file_id.to_string(),
            size: file.size_bytes(),
            date_changed: file.changed_at(),
            provided_file_type: provided_content_type(&file.mime_type).to_string(),
            file_extension: name_extension(&file.name),
            source_file_type: file.mime_type,
            name: file.name,
            thumbnail,
        })
    }

    /// Native documents are exported as PDF, everything else is downloaded as is.
    #[instrument(skip(self), level = "debug")]
    pub async fn download(&self, file_id: &str) -> Result<Download, IntegrationError> {
        let file = self.client.get_file(&self.token, file_id).await?;

        let (content, content_type) = if is_convertible(&file.mime_type) {
            debug!("Exporting {} ({}) as PDF", file_id, file.mime_type);
            let content = self
                .client
                .export(&self.token, file_id, EXPORT_CONTENT_TYPE)
                .await?;
            (content, EXPORT_CONTENT_TYPE.to_string())
        } else {
            let content = self.client.download_media(&self.token, file_id).await?;
            (content, file.mime_type)
        };

        Ok(Download {
            content,
            content_type,
            name: file.name,
        })
    }

    pub async fn upload(
        &self,
        folder_id: &str,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, IntegrationError> {
        self.client
            .upload(&self.token, folder_id, name, content_type, data)
            .await
    }
}

/// Extension of a file name including the dot, or empty.
fn name_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

fn into_entries(files: Vec<DriveFile>) -> Vec<RemoteEntry> {
    files.into_iter().map(DriveFile::into_entry).collect()
}

#[async_trait]
impl RemoteDrive for GDriveBrowser {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, IntegrationError> {
        let files = self.client.list_children(&self.token, folder_id).await?;
        Ok(into_entries(files))
    }

    async fn list_shared(&self) -> Result<Vec<RemoteEntry>, IntegrationError> {
        let files = self.client.list_shared_with_me(&self.token).await?;
        Ok(into_entries(files))
    }

    async fn folder_name(&self, folder_id: &str) -> Result<String, IntegrationError> {
        Ok(self.client.get_file(&self.token, folder_id).await?.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::{GOOGLE_FOLDER, GOOGLE_SPREADSHEET};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_file(server: &MockServer, id: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/drive/v3/files/{}", id)))
            .and(query_param("fields", crate::gdrive::FILE_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn browser(server: &MockServer) -> GDriveBrowser {
        GDriveBrowser::new(
            Arc::new(GDriveClient::with_base_url(server.uri())),
            "tok".to_string(),
        )
    }

    #[test]
    fn test_name_extension() {
        assert_eq!(name_extension("book.epub"), ".epub");
        assert_eq!(name_extension("archive.tar.gz"), ".gz");
        assert_eq!(name_extension("Report"), "");
    }

    #[tokio::test]
    async fn test_list_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("q", "sharedWithMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{ "id": "s", "name": "Shared", "mimeType": GOOGLE_FOLDER }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("q", "'root' in parents and trashed=false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{ "id": "sheet", "name": "Budget", "mimeType": GOOGLE_SPREADSHEET }]
            })))
            .mount(&server)
            .await;

        let tree = browser(&server).list(ROOT_FOLDER_ID, 0).await.unwrap();
        assert_eq!(tree.id, "root");
        assert_eq!(tree.name, GOOGLE_DRIVE_ROOT_NAME);
        assert_eq!(tree.sub_folders[0].name, "Shared");
        assert_eq!(tree.files[0].provided_file_type, EXPORT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_metadata_with_thumbnail() {
        let server = MockServer::start().await;
        mount_file(
            &server,
            "p",
            serde_json::json!({
                "id": "p",
                "name": "paper.pdf",
                "mimeType": "application/pdf",
                "size": "42",
                "thumbnailLink": format!("{}/thumbs/p", server.uri())
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/thumbs/p"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7, 7]))
            .mount(&server)
            .await;

        let meta = browser(&server).get_metadata("p").await.unwrap();
        assert_eq!(meta.name, "paper.pdf");
        assert_eq!(meta.size, 42);
        assert_eq!(meta.file_extension, ".pdf");
        assert_eq!(meta.thumbnail, vec![7, 7]);
    }

    #[tokio::test]
    async fn test_metadata_thumbnail_failure_is_error() {
        let server = MockServer::start().await;
        mount_file(
            &server,
            "p",
            serde_json::json!({
                "id": "p",
                "name": "paper.pdf",
                "mimeType": "application/pdf",
                "thumbnailLink": format!("{}/thumbs/missing", server.uri())
            }),
        )
        .await;

        let result = browser(&server).get_metadata("p").await;
        assert!(matches!(result, Err(IntegrationError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_metadata_without_thumbnail() {
        let server = MockServer::start().await;
        mount_file(
            &server,
            "d",
            serde_json::json!({ "id": "d", "name": "Notes", "mimeType": crate::content_type::GOOGLE_DOCUMENT }),
        )
        .await;

        let meta = browser(&server).get_metadata("d").await.unwrap();
        assert!(meta.thumbnail.is_empty());
        assert_eq!(meta.provided_file_type, EXPORT_CONTENT_TYPE);
        assert_eq!(meta.file_extension, "");
    }

    #[tokio::test]
    async fn test_download_exports_native_documents() {
        let server = MockServer::start().await;
        mount_file(
            &server,
            "sheet",
            serde_json::json!({ "id": "sheet", "name": "Budget", "mimeType": GOOGLE_SPREADSHEET }),
        )
        .await;
        mount_file(
            &server,
            "book",
            serde_json::json!({ "id": "book", "name": "b.epub", "mimeType": "application/epub+zip" }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/sheet/export"))
            .and(query_param("mimeType", EXPORT_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/book"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
            .mount(&server)
            .await;

        let drive = browser(&server);

        let sheet = drive.download("sheet").await.unwrap();
        assert_eq!(sheet.content_type, EXPORT_CONTENT_TYPE);
        assert_eq!(sheet.content.collect().await.unwrap(), b"%PDF");

        let book = drive.download("book").await.unwrap();
        assert_eq!(book.content_type, "application/epub+zip");
        assert_eq!(book.name, "b.epub");
        assert_eq!(book.content.collect().await.unwrap(), b"PK");
    }
}
