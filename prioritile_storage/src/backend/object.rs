//! Tiles stored in an object store (S3 and compatible services).
//!
//! Object stores have no real directories: a tile at `<prefix>/<z>/<x>/<y>.<format>` is a single
//! key and "directories" are emulated through the `/` delimiter. [`ObjectStoreBackend`] wraps any
//! [`ObjectStore`] so the same code serves S3 in production and an in-memory store in tests.
//!
//! S3 path specs have the form `s3://<host>/<bucket>/<prefix...>`. Credentials are taken from
//! environment variables keyed by host and bucket, see [`S3Location::credential_keys`].

use super::{StorageBackend, normalize};
use anyhow::{Result, bail, ensure};
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::{ClientOptions, ObjectStore, PutPayload, aws::AmazonS3Builder, path::Path};
use prioritile_core::{Blob, MergeError};
use prioritile_derive::context;
use std::{fmt, sync::Arc, time::Duration};

/// Overall timeout for a single object-storage request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_REGION: &str = "us-east-1";

/// A [`StorageBackend`] on top of an [`ObjectStore`], rooted at a key prefix.
pub struct ObjectStoreBackend {
	name: String,
	store: Arc<dyn ObjectStore>,
	prefix: String,
}

impl ObjectStoreBackend {
	pub fn new(name: &str, store: Arc<dyn ObjectStore>, prefix: &str) -> ObjectStoreBackend {
		ObjectStoreBackend {
			name: name.to_string(),
			store,
			prefix: normalize(prefix).to_string(),
		}
	}

	/// Connects to the S3 bucket named by `spec`, looking up credentials with `env`.
	#[context("connecting to object storage {spec:?}")]
	pub fn open_s3(spec: &str, env: impl Fn(&str) -> Option<String>) -> Result<ObjectStoreBackend> {
		let location = S3Location::parse(spec)?;
		let [key_id, secret, region] = location.credential_keys();
		let lookup = |(scoped, global): &(String, &str)| env(scoped).or_else(|| env(global));

		let mut builder = AmazonS3Builder::new()
			.with_endpoint(format!("https://{}", location.host))
			.with_bucket_name(&location.bucket)
			.with_region(lookup(&region).unwrap_or_else(|| DEFAULT_REGION.to_string()))
			.with_client_options(ClientOptions::new().with_timeout(REQUEST_TIMEOUT));

		match (lookup(&key_id), lookup(&secret)) {
			(Some(key_id), Some(secret)) => {
				builder = builder.with_access_key_id(key_id).with_secret_access_key(secret);
			}
			_ => log::warn!(
				"no credentials found for {spec:?} (looked for {} / {}), continuing without",
				key_id.0,
				secret.0
			),
		}

		let store = builder.build()?;
		Ok(ObjectStoreBackend::new(spec, Arc::new(store), &location.prefix))
	}

	fn location(&self, path: &str) -> Path {
		Path::from(format!("{}/{}", self.prefix, normalize(path)))
	}

	fn io_error(&self, operation: &'static str, path: &str, err: object_store::Error) -> anyhow::Error {
		MergeError::backend_io(&self.name, operation, path, err).into()
	}

	/// Delimited listing of `prefix`: the names of "subdirectories" and of files.
	async fn list_level(&self, prefix: &str) -> Result<(Vec<String>, Vec<String>)> {
		let location = self.location(prefix);
		let result = self
			.store
			.list_with_delimiter(as_prefix(&location))
			.await
			.map_err(|e| self.io_error("list", prefix, e))?;

		let mut directories: Vec<String> = result
			.common_prefixes
			.iter()
			.filter_map(|p| p.filename().map(str::to_string))
			.collect();
		let mut files: Vec<String> = result
			.objects
			.iter()
			.filter_map(|o| o.location.filename().map(str::to_string))
			.collect();
		directories.sort();
		files.sort();
		Ok((directories, files))
	}
}

/// The root of a store must be listed without a prefix.
fn as_prefix(location: &Path) -> Option<&Path> {
	if location.as_ref().is_empty() {
		None
	} else {
		Some(location)
	}
}

impl fmt::Debug for ObjectStoreBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObjectStoreBackend")
			.field("name", &self.name)
			.field("store", &self.store.to_string())
			.field("prefix", &self.prefix)
			.finish()
	}
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
	fn name(&self) -> &str {
		&self.name
	}

	async fn list_directories(&self, prefix: &str) -> Result<Vec<String>> {
		Ok(self.list_level(prefix).await?.0)
	}

	async fn list_files(&self, prefix: &str) -> Result<Vec<String>> {
		Ok(self.list_level(prefix).await?.1)
	}

	async fn list_files_recursive(&self, prefix: &str) -> Result<Vec<String>> {
		let location = self.location(prefix);
		let objects: Vec<_> = self
			.store
			.list(as_prefix(&location))
			.try_collect()
			.await
			.map_err(|e| self.io_error("list", prefix, e))?;

		let root = location.as_ref();
		let mut files: Vec<String> = objects
			.into_iter()
			.filter_map(|meta| {
				let key = meta.location.as_ref();
				if root.is_empty() {
					Some(key.to_string())
				} else {
					key.strip_prefix(root)?.strip_prefix('/').map(str::to_string)
				}
			})
			.collect();
		files.sort();
		Ok(files)
	}

	async fn ensure_directory(&self, _path: &str) -> Result<()> {
		// directories are implied by object keys
		Ok(())
	}

	async fn read(&self, path: &str) -> Result<Blob> {
		let location = self.location(path);
		let result = self
			.store
			.get(&location)
			.await
			.map_err(|e| self.io_error("read", path, e))?;
		let bytes = result.bytes().await.map_err(|e| self.io_error("read", path, e))?;
		Ok(Blob::from(bytes.to_vec()))
	}

	async fn write(&self, path: &str, blob: Blob) -> Result<()> {
		self.store
			.put(&self.location(path), PutPayload::from(blob.into_vec()))
			.await
			.map_err(|e| self.io_error("write", path, e))?;
		Ok(())
	}

	async fn exists(&self, path: &str) -> bool {
		self.store.head(&self.location(path)).await.is_ok()
	}
}

/// The parts of an `s3://<host>/<bucket>/<prefix...>` path spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Location {
	pub host: String,
	pub bucket: String,
	pub prefix: String,
}

impl S3Location {
	pub const SCHEME: &'static str = "s3://";

	pub fn parse(spec: &str) -> Result<S3Location> {
		let Some(rest) = spec.strip_prefix(Self::SCHEME) else {
			bail!("object storage spec {spec:?} must start with {:?}", Self::SCHEME);
		};
		let mut parts = rest.splitn(3, '/');
		let host = parts.next().unwrap_or_default();
		let bucket = parts.next().unwrap_or_default();
		ensure!(!host.is_empty(), "object storage spec {spec:?} is missing a host");
		ensure!(!bucket.is_empty(), "object storage spec {spec:?} is missing a bucket");

		Ok(S3Location {
			host: host.to_string(),
			bucket: bucket.to_string(),
			prefix: normalize(parts.next().unwrap_or_default()).to_string(),
		})
	}

	/// Environment variables consulted for the access key id, the secret key and the region, each
	/// as `(scoped, global fallback)`.
	///
	/// The scoped name is `<HOST>_<BUCKET>_<SUFFIX>` with host and bucket upper-cased and every
	/// character that is not ASCII alphanumeric replaced by `_`.
	pub fn credential_keys(&self) -> [(String, &'static str); 3] {
		let scope: String = format!("{}_{}", self.host, self.bucket)
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
			.collect();
		[
			(format!("{scope}_ACCESS_KEY_ID"), "AWS_ACCESS_KEY_ID"),
			(format!("{scope}_SECRET_ACCESS_KEY"), "AWS_SECRET_ACCESS_KEY"),
			(format!("{scope}_REGION"), "AWS_REGION"),
		]
	}
}
