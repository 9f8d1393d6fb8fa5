//! Tiles stored in a directory on the local filesystem.
//!
//! ```text
//! <root>/<z>/<x>/<y>.<format>
//! ```
//!
//! The root must exist and be a directory when the backend is opened. Listings are sorted by
//! name so that indexing is deterministic regardless of the order the filesystem returns entries.

use super::{StorageBackend, normalize};
use anyhow::{Result, ensure};
use async_trait::async_trait;
use prioritile_core::{Blob, MergeError};
use prioritile_derive::context;
use std::{
	collections::HashSet,
	fs::FileType,
	io,
	path::{Path, PathBuf},
};
use tokio::fs;

/// A [`StorageBackend`] rooted at a local directory.
#[derive(Debug)]
pub struct LocalBackend {
	name: String,
	root: PathBuf,
}

impl LocalBackend {
	#[context("opening tile directory {:?}", root)]
	pub fn open(root: &Path) -> Result<LocalBackend> {
		ensure!(root.exists(), "path {root:?} does not exist");
		ensure!(root.is_dir(), "path {root:?} is not a directory");

		log::trace!("opened local backend at {root:?}");

		Ok(LocalBackend {
			name: root.to_string_lossy().into_owned(),
			root: root.to_path_buf(),
		})
	}

	fn resolve(&self, path: &str) -> PathBuf {
		let path = normalize(path);
		if path.is_empty() {
			self.root.clone()
		} else {
			self.root.join(path)
		}
	}

	fn io_error(&self, operation: &'static str, path: &str, err: io::Error) -> anyhow::Error {
		MergeError::backend_io(&self.name, operation, path, err).into()
	}

	/// Lists `dir` and keeps the names of entries whose (symlink-resolved) type passes `keep`.
	async fn list_entries(&self, prefix: &str, keep: fn(&FileType) -> bool) -> Result<Vec<String>> {
		let mut names = Vec::new();
		for (name, path, file_type) in self.read_dir(prefix).await? {
			let file_type = resolve_symlink(&path, file_type)
				.await
				.map_err(|e| self.io_error("list", prefix, e))?;
			if keep(&file_type) {
				names.push(name);
			}
		}
		names.sort();
		Ok(names)
	}

	async fn read_dir(&self, prefix: &str) -> Result<Vec<(String, PathBuf, FileType)>> {
		let list_error = |e| self.io_error("list", prefix, e);
		let mut entries = fs::read_dir(self.resolve(prefix)).await.map_err(list_error)?;
		let mut result = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
			let file_type = entry.file_type().await.map_err(list_error)?;
			let name = entry.file_name().to_string_lossy().into_owned();
			result.push((name, entry.path(), file_type));
		}
		Ok(result)
	}
}

async fn resolve_symlink(path: &Path, file_type: FileType) -> io::Result<FileType> {
	if file_type.is_symlink() {
		Ok(fs::metadata(path).await?.file_type())
	} else {
		Ok(file_type)
	}
}

#[async_trait]
impl StorageBackend for LocalBackend {
	fn name(&self) -> &str {
		&self.name
	}

	async fn list_directories(&self, prefix: &str) -> Result<Vec<String>> {
		self.list_entries(prefix, FileType::is_dir).await
	}

	async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
		self.list_entries(prefix, FileType::is_file).await
	}

	async fn list_files_recursive(&self, prefix: &str) -> Result<Vec<String>> {
		let mut files = Vec::new();
		let mut pending = vec![String::new()];
		// canonical paths of directories already queued, so symlink cycles end
		let mut visited = HashSet::new();
		if let Ok(root) = fs::canonicalize(self.resolve(prefix)).await {
			visited.insert(root);
		}

		while let Some(relative) = pending.pop() {
			let dir = if relative.is_empty() {
				prefix.to_string()
			} else {
				format!("{}/{relative}", normalize(prefix))
			};
			for (name, path, file_type) in self.read_dir(&dir).await? {
				let file_type = resolve_symlink(&path, file_type)
					.await
					.map_err(|e| self.io_error("list", &dir, e))?;
				let child = if relative.is_empty() {
					name
				} else {
					format!("{relative}/{name}")
				};
				if file_type.is_dir() {
					let canonical = fs::canonicalize(&path)
						.await
						.map_err(|e| self.io_error("list", &dir, e))?;
					if visited.insert(canonical) {
						pending.push(child);
					} else {
						log::debug!("skipping already listed directory {child:?} in {:?}", self.name);
					}
				} else {
					files.push(child);
				}
			}
		}

		files.sort();
		Ok(files)
	}

	async fn ensure_directory(&self, path: &str) -> Result<()> {
		fs::create_dir_all(self.resolve(path))
			.await
			.map_err(|e| self.io_error("create directory", path, e))
	}

	async fn read(&self, path: &str) -> Result<Blob> {
		let bytes = fs::read(self.resolve(path))
			.await
			.map_err(|e| self.io_error("read", path, e))?;
		Ok(Blob::from(bytes))
	}

	async fn write(&self, path: &str, blob: Blob) -> Result<()> {
		fs::write(self.resolve(path), blob.as_slice())
			.await
			.map_err(|e| self.io_error("write", path, e))
	}

	async fn exists(&self, path: &str) -> bool {
		fs::metadata(self.resolve(path)).await.is_ok_and(|m| m.is_file())
	}
}
