//! Error kinds raised while indexing and merging tilesets.
//!
//! All fallible functions in prioritile return [`anyhow::Result`]. The variants of [`MergeError`]
//! are raised into `anyhow::Error` at the failure site, so callers that need to react to a
//! particular kind can recover it with `err.downcast_ref::<MergeError>()`, even after context has
//! been attached.

use crate::ZoomRange;
use thiserror::Error;

/// Boxed source error carried by the I/O and codec variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum MergeError {
	/// A storage backend failed to list, read or write.
	#[error("storage backend {backend:?} failed to {operation} {path:?}")]
	BackendIo {
		backend: String,
		operation: &'static str,
		path: String,
		#[source]
		source: BoxError,
	},

	/// A listed path does not follow the `{z}/{x}/{y}.{format}` convention.
	#[error("malformed tile path {path:?}: {reason}")]
	MalformedTilePath { path: String, reason: &'static str },

	/// No tile remained after zoom filtering.
	#[error("tileset {name:?} is empty or invalid")]
	EmptyOrInvalidTileset { name: String },

	/// A source disagrees with the reference zoom range of the run.
	#[error("zoom level mismatch for {name:?}: expected {expected}, found {found}")]
	ZoomRangeMismatch {
		name: String,
		expected: ZoomRange,
		found: ZoomRange,
	},

	#[error("failed to decode {format:?} tile")]
	Decode {
		format: String,
		#[source]
		source: BoxError,
	},

	#[error("failed to encode {format:?} tile")]
	Encode {
		format: String,
		#[source]
		source: BoxError,
	},
}

impl MergeError {
	pub fn backend_io(
		backend: &str,
		operation: &'static str,
		path: &str,
		source: impl Into<BoxError>,
	) -> MergeError {
		MergeError::BackendIo {
			backend: backend.to_string(),
			operation,
			path: path.to_string(),
			source: source.into(),
		}
	}

	/// Finds the first `MergeError` in the chain of `err`.
	pub fn find(err: &anyhow::Error) -> Option<&MergeError> {
		err.chain().find_map(|cause| cause.downcast_ref::<MergeError>())
	}
}
