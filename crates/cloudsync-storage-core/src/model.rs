//! Integration records and the folder/file tree returned to the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider identifier for Google Drive integrations.
pub const GOOGLE_DRIVE_PROVIDER: &str = "google";

/// An external drive connection registered on a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    /// CSRF token while the authorization is pending, stable id afterwards.
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub provider: String,
    /// Serialized OAuth token. Empty until the authorization completes.
    #[serde(default)]
    pub access_token: String,
}

impl IntegrationConfig {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            provider: provider.into(),
            access_token: String::new(),
        }
    }
}

/// A file as listed inside an [`IntegrationFolder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    /// Provider-native content type.
    pub source_file_type: String,
    /// Content type the file is served as on download.
    pub provided_file_type: String,
    pub file_extension: String,
    pub date_changed: DateTime<Utc>,
}

/// A folder node. The tree is built by the caller of a listing and shares
/// nothing with the provider's own objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationFolder {
    pub id: String,
    pub name: String,
    pub sub_folders: Vec<IntegrationFolder>,
    pub files: Vec<IntegrationFile>,
}

impl IntegrationFolder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sub_folders: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sub_folders.is_empty() && self.files.is_empty()
    }
}

/// Detailed metadata for a single file, including its thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationMetadata {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub source_file_type: String,
    pub provided_file_type: String,
    pub file_extension: String,
    pub date_changed: DateTime<Utc>,
    #[serde(with = "base64_bytes")]
    pub thumbnail: Vec<u8>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
