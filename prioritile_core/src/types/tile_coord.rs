//! Tile coordinates and their path codec.
//!
//! Every tile of an XYZ/WMTS pyramid lives at `{z}/{x}/{y}.{format}` relative to the root of its
//! tileset. [`TileCoord`] is the structured form of such a path and serves as the key for indexing
//! and job dispatch; its [`Display`](fmt::Display) output is the canonical path string.
//!
//! ```
//! use prioritile_core::TileCoord;
//!
//! let coord = TileCoord::parse("9/255/310.png").unwrap();
//! assert_eq!((coord.z, coord.x, coord.y), (9, 255, 310));
//! assert_eq!(coord.format, "png");
//! assert_eq!(coord.to_string(), "9/255/310.png");
//! ```

use crate::MergeError;
use anyhow::Result;
use std::{fmt, str::FromStr};

/// Position and codec tag of a single tile.
///
/// Ordering is by zoom level, then `x`, then `y`, then format, which gives deterministic,
/// level-by-level iteration when used as a map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
	pub z: u8,
	pub x: u32,
	pub y: u32,
	pub format: String,
}

impl TileCoord {
	pub fn new(z: u8, x: u32, y: u32, format: &str) -> Result<TileCoord> {
		check_format(format).map_err(|reason| MergeError::MalformedTilePath {
			path: format!("{z}/{x}/{y}.{format}"),
			reason,
		})?;
		Ok(TileCoord {
			z,
			x,
			y,
			format: format.to_string(),
		})
	}

	/// Parses a relative tile path `{z}/{x}/{y}.{format}`.
	///
	/// Fails with [`MergeError::MalformedTilePath`] unless the path has exactly three `/`-separated
	/// segments, the last one splits on `.` into exactly two parts, and z, x and y are non-negative
	/// integers without leading zeros.
	pub fn parse(path: &str) -> Result<TileCoord> {
		parse_parts(path)
			.map_err(|reason| MergeError::MalformedTilePath {
				path: path.to_string(),
				reason,
			})
			.map_err(anyhow::Error::from)
	}

	/// The canonical relative path of this tile.
	pub fn path(&self) -> String {
		self.to_string()
	}

	/// The relative path of the column directory holding this tile: `{z}/{x}`.
	pub fn parent_path(&self) -> String {
		format!("{}/{}", self.z, self.x)
	}
}

fn parse_parts(path: &str) -> Result<TileCoord, &'static str> {
	let segments: Vec<&str> = path.split('/').collect();
	let [z, x, file] = segments[..] else {
		return Err("expected exactly 3 segments");
	};

	let file_parts: Vec<&str> = file.split('.').collect();
	let [y, format] = file_parts[..] else {
		return Err("expected file name \"{y}.{format}\"");
	};

	check_format(format)?;

	Ok(TileCoord {
		z: parse_number(z).ok_or("zoom level is not a canonical non-negative integer")?,
		x: parse_number(x).ok_or("x is not a canonical non-negative integer")?,
		y: parse_number(y).ok_or("y is not a canonical non-negative integer")?,
		format: format.to_string(),
	})
}

fn parse_number<T: FromStr>(text: &str) -> Option<T> {
	if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	// "01" would be written back as "1"
	if text.len() > 1 && text.starts_with('0') {
		return None;
	}
	text.parse().ok()
}

fn check_format(format: &str) -> Result<(), &'static str> {
	if format.is_empty() {
		Err("format extension is empty")
	} else if format.contains(['/', '.']) {
		Err("format extension must be a single token")
	} else {
		Ok(())
	}
}

impl FromStr for TileCoord {
	type Err = anyhow::Error;

	fn from_str(path: &str) -> Result<TileCoord> {
		TileCoord::parse(path)
	}
}

impl fmt::Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}.{}", self.z, self.x, self.y, self.format)
	}
}
