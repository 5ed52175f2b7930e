//! Depth-bounded recursive listing of a remote drive.

use async_trait::async_trait;
use cloudsync_storage_core::{IntegrationFile, IntegrationFolder};
use futures::future::BoxFuture;
use tracing::{debug, info, instrument, trace};

use crate::error::IntegrationError;

/// Folder id that stands for the drive root. Walking it also merges the
/// items shared with the user.
pub const ROOT_FOLDER_ID: &str = "root";

/// A listed item, classified once when it comes off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    Folder { id: String, name: String },
    File(IntegrationFile),
}

/// Listing operations a remote provider has to offer to be walked.
#[async_trait]
pub trait RemoteDrive: Send + Sync {
    /// Direct children of a folder, in provider order.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, IntegrationError>;

    /// Items shared with the user, in provider order.
    async fn list_shared(&self) -> Result<Vec<RemoteEntry>, IntegrationError>;

    /// Display name of a folder.
    async fn folder_name(&self, folder_id: &str) -> Result<String, IntegrationError>;

    /// Provider-side id of the drive root.
    fn root_folder_id(&self) -> &str {
        ROOT_FOLDER_ID
    }
}

/// Builds [`IntegrationFolder`] trees from a [`RemoteDrive`].
///
/// At every level the folder's own files and immediate subfolders are
/// listed. A subfolder is expanded only while at least one level of depth
/// remains, so `walk(id, 0)` returns the folder's entries with empty
/// subfolders. Calls run one after the other; any listing error aborts the
/// walk and no partial tree is returned.
pub struct RemoteDirectoryWalker<'a, D: ?Sized> {
    drive: &'a D,
    root_id: String,
    root_name: String,
}

impl<'a, D: RemoteDrive + ?Sized> RemoteDirectoryWalker<'a, D> {
    pub fn new(drive: &'a D) -> Self {
        Self {
            drive,
            root_id: ROOT_FOLDER_ID.to_string(),
            root_name: String::new(),
        }
    }

    /// Id and display name used for the synthesized root node.
    pub fn with_root(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.root_id = id.into();
        self.root_name = name.into();
        self
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn walk(
        &self,
        folder_id: &str,
        max_depth: u32,
    ) -> Result<IntegrationFolder, IntegrationError> {
        let mut response = IntegrationFolder::new(folder_id, "");

        let list_id = if folder_id == self.root_id {
            response.name = self.root_name.clone();

            for entry in self.drive.list_shared().await? {
                self.attach(entry, max_depth, &mut response).await?;
            }
            self.drive.root_folder_id().to_string()
        } else {
            response.name = match self.drive.folder_name(folder_id).await {
                Ok(name) => name,
                Err(e) => {
                    debug!("Name lookup failed for folder {}: {}", folder_id, e);
                    folder_id.to_string()
                }
            };
            folder_id.to_string()
        };

        info!("Listing folder {} with depth {}", list_id, max_depth);
        self.visit(&list_id, max_depth, &mut response).await?;
        Ok(response)
    }

    // Boxed: recursive through `attach`.
    fn visit<'b>(
        &'b self,
        folder_id: &'b str,
        depth: u32,
        parent: &'b mut IntegrationFolder,
    ) -> BoxFuture<'b, Result<(), IntegrationError>> {
        Box::pin(async move {
            trace!("Visiting folder {}", folder_id);
            for entry in self.drive.list_folder(folder_id).await? {
                self.attach(entry, depth, parent).await?;
            }
            Ok(())
        })
    }

    async fn attach(
        &self,
        entry: RemoteEntry,
        depth: u32,
        parent: &mut IntegrationFolder,
    ) -> Result<(), IntegrationError> {
        match entry {
            RemoteEntry::Folder { id, name } => {
                let mut folder = IntegrationFolder::new(id, name);
                if depth >= 1 {
                    let id = folder.id.clone();
                    self.visit(&id, depth - 1, &mut folder).await?;
                }
                parent.sub_folders.push(folder);
            }
            RemoteEntry::File(file) => parent.files.push(file),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::*;

    #[derive(Default)]
    struct FakeDrive {
        folders: HashMap<String, Vec<RemoteEntry>>,
        shared: Vec<RemoteEntry>,
        names: HashMap<String, String>,
        failing: Option<String>,
        listed: Mutex<Vec<String>>,
    }

    impl FakeDrive {
        fn folder(mut self, id: &str, entries: Vec<RemoteEntry>) -> Self {
            self.folders.insert(id.to_string(), entries);
            self
        }
    }

    #[async_trait]
    impl RemoteDrive for FakeDrive {
        async fn list_folder(
            &self,
            folder_id: &str,
        ) -> Result<Vec<RemoteEntry>, IntegrationError> {
            self.listed.lock().unwrap().push(folder_id.to_string());
            if self.failing.as_deref() == Some(folder_id) {
                return Err(IntegrationError::Upstream("listing failed".to_string()));
            }
            Ok(self.folders.get(folder_id).cloned().unwrap_or_default())
        }

        async fn list_shared(&self) -> Result<Vec<RemoteEntry>, IntegrationError> {
            Ok(self.shared.clone())
        }

        async fn folder_name(&self, folder_id: &str) -> Result<String, IntegrationError> {
            self.names
                .get(folder_id)
                .cloned()
                .ok_or_else(|| IntegrationError::Upstream("404".to_string()))
        }
    }

    fn dir(id: &str) -> RemoteEntry {
        RemoteEntry::Folder {
            id: id.to_string(),
            name: format!("{} name", id),
        }
    }

    fn file(id: &str) -> RemoteEntry {
        RemoteEntry::File(IntegrationFile {
            id: id.to_string(),
            name: format!("{}.pdf", id),
            size: 10,
            source_file_type: "application/pdf".to_string(),
            provided_file_type: "application/pdf".to_string(),
            file_extension: "pdf".to_string(),
            date_changed: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    fn tree() -> FakeDrive {
        FakeDrive::default()
            .folder("root", vec![dir("a"), file("f1"), dir("b")])
            .folder("a", vec![file("a1"), dir("a-deep")])
            .folder("a-deep", vec![file("deep")])
            .folder("b", vec![])
    }

    fn file_ids(folder: &IntegrationFolder) -> Vec<&str> {
        folder.files.iter().map(|f| f.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_depth_zero_lists_own_entries() {
        let drive = tree();
        let walker = RemoteDirectoryWalker::new(&drive).with_root("root", "Drive");

        let root = walker.walk("root", 0).await.unwrap();
        assert_eq!(root.name, "Drive");
        assert_eq!(file_ids(&root), vec!["f1"]);
        assert_eq!(root.sub_folders.len(), 2);
        assert_eq!(root.sub_folders[0].id, "a");
        assert_eq!(root.sub_folders[0].name, "a name");
        assert!(root.sub_folders.iter().all(IntegrationFolder::is_empty));
        assert_eq!(*drive.listed.lock().unwrap(), vec!["root"]);
    }

    #[tokio::test]
    async fn test_depth_one_expands_one_level() {
        let drive = tree();
        let walker = RemoteDirectoryWalker::new(&drive);

        let root = walker.walk("root", 1).await.unwrap();
        let a = &root.sub_folders[0];
        assert_eq!(file_ids(a), vec!["a1"]);
        assert_eq!(a.sub_folders.len(), 1);
        assert!(a.sub_folders[0].is_empty());
        assert!(root.sub_folders[1].is_empty());

        let deeper = walker.walk("root", 2).await.unwrap();
        assert_eq!(file_ids(&deeper.sub_folders[0].sub_folders[0]), vec!["deep"]);
    }

    #[tokio::test]
    async fn test_root_merges_shared_first() {
        let mut drive = tree().folder("shared-dir", vec![file("s1")]);
        drive.shared = vec![file("shared-file"), dir("shared-dir")];
        let walker = RemoteDirectoryWalker::new(&drive);

        let root = walker.walk("root", 1).await.unwrap();
        assert_eq!(file_ids(&root), vec!["shared-file", "f1"]);
        let sub_ids: Vec<&str> = root.sub_folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(sub_ids, vec!["shared-dir", "a", "b"]);
        assert_eq!(file_ids(&root.sub_folders[0]), vec!["s1"]);

        // Shared folders follow the same depth rule.
        let shallow = walker.walk("root", 0).await.unwrap();
        assert!(shallow.sub_folders[0].is_empty());
    }

    #[tokio::test]
    async fn test_non_root_name_lookup() {
        let mut drive = tree();
        drive.names.insert("a".to_string(), "Projects".to_string());
        let walker = RemoteDirectoryWalker::new(&drive);

        let a = walker.walk("a", 0).await.unwrap();
        assert_eq!(a.id, "a");
        assert_eq!(a.name, "Projects");
        assert_eq!(file_ids(&a), vec!["a1"]);

        // Unknown name falls back to the id.
        let b = walker.walk("b", 0).await.unwrap();
        assert_eq!(b.name, "b");
    }

    #[tokio::test]
    async fn test_listing_error_aborts_walk() {
        let mut drive = tree();
        drive.failing = Some("a-deep".to_string());
        let walker = RemoteDirectoryWalker::new(&drive);

        // Not reached at depth 1.
        assert!(walker.walk("root", 1).await.is_ok());

        let result = walker.walk("root", 2).await;
        assert!(matches!(result, Err(IntegrationError::Upstream(_))));
    }
}
