//! Zoom level ranges.
//!
//! [`ZoomRange`] is the closed range of levels a discovered tileset actually covers, while
//! [`ZoomBounds`] is the (possibly open-ended) filter applied while indexing a tileset.

use anyhow::{Result, ensure};
use prioritile_derive::context;
use std::{fmt, str::FromStr};

/// A closed, non-empty range of zoom levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ZoomRange {
	pub min: u8,
	pub max: u8,
}

impl ZoomRange {
	pub fn new(min: u8, max: u8) -> Result<ZoomRange> {
		ensure!(min <= max, "min zoom ({min}) must be <= max zoom ({max})");
		Ok(ZoomRange { min, max })
	}

	pub fn contains(&self, level: u8) -> bool {
		(self.min..=self.max).contains(&level)
	}
}

impl fmt::Display for ZoomRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.min, self.max)
	}
}

/// Filter applied to zoom levels while indexing: `min <= z` and, if set, `z <= max`.
///
/// The default accepts every level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoomBounds {
	pub min: u8,
	pub max: Option<u8>,
}

impl ZoomBounds {
	pub fn new(min: u8, max: Option<u8>) -> Result<ZoomBounds> {
		if let Some(max) = max {
			ensure!(min <= max, "min zoom ({min}) must be <= max zoom ({max})");
		}
		Ok(ZoomBounds { min, max })
	}

	/// Bounds that accept every zoom level.
	pub fn unbounded() -> ZoomBounds {
		ZoomBounds::default()
	}

	pub fn contains(&self, level: u8) -> bool {
		self.min <= level && self.max.is_none_or(|max| level <= max)
	}
}

impl FromStr for ZoomBounds {
	type Err = anyhow::Error;

	/// Parses `"min-max"` or the open-ended `"min-"`.
	#[context("parsing zoom bounds {text:?}, expected \"min-max\" or \"min-\"")]
	fn from_str(text: &str) -> Result<ZoomBounds> {
		let (min, max) = text
			.split_once('-')
			.ok_or_else(|| anyhow::anyhow!("missing '-' separator"))?;
		let min = min.trim().parse::<u8>()?;
		let max = match max.trim() {
			"" => None,
			max => Some(max.parse::<u8>()?),
		};
		ZoomBounds::new(min, max)
	}
}

impl fmt::Display for ZoomBounds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.max {
			Some(max) => write!(f, "{}-{}", self.min, max),
			None => write!(f, "{}-", self.min),
		}
	}
}
