//! Local filesystem storage backend.
//!
//! - `LocalBlobStore`: `BlobStore` layered on a `FileSystemDelegate`
//! - `DirectoryDelegate`: one file per blob plus a JSON sidecar
//! - `FileUserStore`: user records as JSON files

mod delegate;
mod directory;
mod store;
mod users;

pub use delegate::{DelegateBlob, FileSystemDelegate};
pub use directory::DirectoryDelegate;
pub use store::LocalBlobStore;
pub use users::FileUserStore;
