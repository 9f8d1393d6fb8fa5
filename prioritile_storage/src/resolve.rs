//! Picking a [`StorageBackend`] for a path given on the command line.

use crate::{LocalBackend, ObjectStoreBackend, S3Location, StorageBackend};
use anyhow::Result;
use std::{env, path::Path, sync::Arc};

/// Opens the backend named by `spec`.
///
/// `s3://host/bucket/prefix` selects object storage with credentials from the process
/// environment; anything else is taken as a local directory.
pub fn resolve_backend(spec: &str) -> Result<Arc<dyn StorageBackend>> {
	if is_object_storage(spec) {
		let backend = ObjectStoreBackend::open_s3(spec, |key| env::var(key).ok())?;
		log::debug!("using object storage backend for {spec:?}");
		Ok(Arc::new(backend))
	} else {
		let backend = LocalBackend::open(Path::new(spec))?;
		log::debug!("using local backend for {spec:?}");
		Ok(Arc::new(backend))
	}
}

pub fn is_object_storage(spec: &str) -> bool {
	spec.starts_with(S3Location::SCHEME)
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_fs::{TempDir, prelude::*};

	#[test]
	fn detects_scheme() {
		assert!(is_object_storage("s3://host/bucket"));
		assert!(!is_object_storage("/data/tiles"));
		assert!(!is_object_storage("tiles/s3://"));
	}

	#[tokio::test]
	async fn resolves_local_directory() -> Result<()> {
		let dir = TempDir::new()?;
		dir.child("1/0/0.png").write_binary(b"png")?;

		let backend = resolve_backend(dir.path().to_str().unwrap())?;
		assert_eq!(backend.list_files_recursive("").await?, ["1/0/0.png"]);
		Ok(())
	}

	#[test]
	fn missing_local_directory_fails() {
		let err = resolve_backend("/this/path/does/not/exist").unwrap_err();
		assert!(format!("{err:#}").contains("does not exist"));
	}

	#[test]
	fn malformed_object_storage_spec_fails() {
		let err = resolve_backend("s3://only-host").unwrap_err();
		assert!(format!("{err:#}").contains("missing a bucket"));
	}
}
