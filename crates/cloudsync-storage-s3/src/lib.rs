//! S3-compatible object storage backend.
//!
//! Root index generations are derived from the size of the root-index object
//! (see [`generation_from_size`]). Checksums use the native S3 checksum fields.

mod client;
mod store;

pub use client::S3Settings;
pub use store::{generation_from_size, S3BlobStore, ROOT_ENTRY_SIZE};
