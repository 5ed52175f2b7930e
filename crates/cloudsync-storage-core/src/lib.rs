//! Core traits and types for cloudsync storage backends.
//!
//! This crate defines the abstractions shared between the local and object-storage
//! implementations and the drive integrations:
//! - `BlobStore`: content blobs, the per-user root index and presigned URLs
//! - `Checksum`: tagged multi-algorithm checksums
//! - `UserStore`: user records carrying registered integrations
//! - Integration folder/file/metadata records

mod blob;
mod checksum;
mod error;
mod model;
pub mod root_index;
mod user;

pub use blob::{BlobReader, BlobStore, LoadedBlob, PresignedUrl};
pub use checksum::{Checksum, ChecksumAlgorithm};
pub use error::StorageError;
pub use model::{
    IntegrationConfig, IntegrationFile, IntegrationFolder, IntegrationMetadata,
    GOOGLE_DRIVE_PROVIDER,
};
pub use root_index::{RootIndex, ROOT_BLOB_ID};
pub use user::{User, UserStore};
