//! Tagged blob checksums (`"<algorithm>=<value>"`).
//!
//! Values are opaque to this layer: they are whatever the client computed
//! (base64 for object storage, hex in some client versions) and are only
//! validated by the backend that stores them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Checksum algorithms understood by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Crc32,
    Crc32c,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Selection order when a backend reports several checksums.
    /// Cheap checks first.
    pub const PRIORITY: [ChecksumAlgorithm; 4] = [
        ChecksumAlgorithm::Crc32,
        ChecksumAlgorithm::Crc32c,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Sha256,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "crc32",
            ChecksumAlgorithm::Crc32c => "crc32c",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crc32" => Ok(ChecksumAlgorithm::Crc32),
            "crc32c" => Ok(ChecksumAlgorithm::Crc32c),
            "sha1" => Ok(ChecksumAlgorithm::Sha1),
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            other => Err(StorageError::InvalidChecksum(format!(
                "unknown hash method {:?}",
                other
            ))),
        }
    }
}

/// A checksum with exactly one active algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub value: String,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            value: value.into(),
        }
    }

    /// Parse a tagged checksum such as `crc32c=AAAAAA==`.
    pub fn parse(tagged: &str) -> Result<Self, StorageError> {
        let (algorithm, value) = tagged.split_once('=').ok_or_else(|| {
            StorageError::InvalidChecksum(format!("missing algorithm tag in {:?}", tagged))
        })?;
        Ok(Self {
            algorithm: algorithm.parse()?,
            value: value.to_string(),
        })
    }

    /// Parse an optional tag; absent or empty tags mean "no checksum".
    pub fn parse_optional(tagged: Option<&str>) -> Result<Option<Self>, StorageError> {
        match tagged {
            None | Some("") => Ok(None),
            Some(tag) => Self::parse(tag).map(Some),
        }
    }

    /// Pick the first checksum reported by a backend, following
    /// [`ChecksumAlgorithm::PRIORITY`].
    pub fn first_reported<'a, F>(mut reported: F) -> Option<Self>
    where
        F: FnMut(ChecksumAlgorithm) -> Option<&'a str>,
    {
        ChecksumAlgorithm::PRIORITY
            .into_iter()
            .find_map(|algorithm| reported(algorithm).map(|value| Self::new(algorithm, value)))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.algorithm, self.value)
    }
}

impl FromStr for Checksum {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
