//! The capability contract every storage medium has to fulfil.
//!
//! Paths are `/`-separated and relative to the root of the backend; `""` is the root itself.
//! Leading and trailing slashes are ignored, so `"5/"`, `"/5"` and `"5"` all name the same
//! directory.

use anyhow::Result;
use async_trait::async_trait;
use prioritile_core::Blob;
use std::fmt::Debug;

/// A hierarchy of tile files on some storage medium.
///
/// `write` must be safe to call concurrently for distinct paths. Writing the same path twice
/// needs no atomicity or locking: the last write wins.
#[async_trait]
pub trait StorageBackend: Debug + Send + Sync {
	/// Human-readable identity of the backend, used in log and error messages.
	fn name(&self) -> &str;

	/// Names of the direct subdirectories of `prefix`, sorted.
	async fn list_directories(&self, prefix: &str) -> Result<Vec<String>>;

	/// Names of the files directly inside `prefix`, sorted.
	async fn list_files(&self, prefix: &str) -> Result<Vec<String>>;

	/// Paths of all files below `prefix`, relative to `prefix` and sorted.
	///
	/// Directories themselves are never returned.
	async fn list_files_recursive(&self, prefix: &str) -> Result<Vec<String>>;

	/// Makes sure `path` exists as a directory so that files can be written into it.
	async fn ensure_directory(&self, path: &str) -> Result<()>;

	async fn read(&self, path: &str) -> Result<Blob>;

	async fn write(&self, path: &str, blob: Blob) -> Result<()>;

	async fn exists(&self, path: &str) -> bool;
}

/// Strips leading and trailing slashes from a relative backend path.
pub(crate) fn normalize(path: &str) -> &str {
	path.trim_matches('/')
}
