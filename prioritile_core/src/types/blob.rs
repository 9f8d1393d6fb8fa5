//! This module provides the [`Blob`] struct, an owned byte buffer holding the encoded content of a
//! tile as it moves between storage backends and the codec.
//!
//! ```rust
//! use prioritile_core::Blob;
//!
//! let blob = Blob::from(vec![0x89, 0x50, 0x4e, 0x47]);
//! assert_eq!(blob.len(), 4);
//! assert_eq!(blob.as_slice()[1..], [0x50, 0x4e, 0x47]);
//! ```

use std::fmt::{self, Debug};

/// A wrapper around [`Vec<u8>`] holding encoded tile bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(value: Vec<u8>) -> Self {
		Blob(value)
	}
}

impl From<&[u8]> for Blob {
	fn from(value: &[u8]) -> Self {
		Blob(value.to_vec())
	}
}

impl From<Blob> for Vec<u8> {
	fn from(value: Blob) -> Self {
		value.0
	}
}

impl AsRef<[u8]> for Blob {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Blob({} bytes)", self.0.len())
	}
}
