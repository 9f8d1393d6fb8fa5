//! Indexing the tiles of a single tileset.
//!
//! A tileset is whatever lives below the root of one storage backend. Discovery lists every file
//! recursively and parses each path as a [`TileCoord`]. Any file that is not a tile path makes
//! the whole tileset invalid; files outside the requested zoom bounds are silently left out.

use anyhow::Result;
use prioritile_core::{MergeError, TileCoord, ZoomBounds, ZoomRange};
use prioritile_derive::context;
use prioritile_storage::StorageBackend;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Tiles of a tileset grouped by zoom level, each level sorted.
pub type TileIndex = BTreeMap<u8, Vec<TileCoord>>;

/// An indexed tileset: its backend, the zoom levels it covers and the tiles it holds.
///
/// Read-only once discovered; shared between workers behind an [`Arc`].
pub struct TilesetDescriptor {
	zoom: ZoomRange,
	backend: Arc<dyn StorageBackend>,
	tile_index: TileIndex,
}

impl TilesetDescriptor {
	#[context("discovering tileset {:?}", backend.name())]
	pub async fn discover(backend: &Arc<dyn StorageBackend>, bounds: &ZoomBounds) -> Result<TilesetDescriptor> {
		let paths = backend.list_files_recursive("").await?;
		let (zoom, tile_index) = index_tiles(backend.name(), &paths, bounds)?;

		log::debug!(
			"indexed {:?}: zoom {zoom}, {} tiles",
			backend.name(),
			tile_index.values().map(Vec::len).sum::<usize>()
		);

		Ok(TilesetDescriptor {
			zoom,
			backend: backend.clone(),
			tile_index,
		})
	}

	pub fn name(&self) -> &str {
		self.backend.name()
	}

	pub fn zoom(&self) -> ZoomRange {
		self.zoom
	}

	pub fn backend(&self) -> &Arc<dyn StorageBackend> {
		&self.backend
	}

	pub fn tile_index(&self) -> &TileIndex {
		&self.tile_index
	}

	pub fn tile_count(&self) -> usize {
		self.tile_index.values().map(Vec::len).sum()
	}

	/// All tiles, level by level.
	pub fn iter_tiles(&self) -> impl Iterator<Item = &TileCoord> {
		self.tile_index.values().flatten()
	}
}

impl fmt::Debug for TilesetDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TilesetDescriptor")
			.field("name", &self.name())
			.field("zoom", &self.zoom)
			.field("tiles", &self.tile_count())
			.finish()
	}
}

/// Builds the tile index of the tileset `name` from its relative file paths.
///
/// Every path must be a valid tile path, otherwise this fails with
/// [`MergeError::MalformedTilePath`]. Tiles outside `bounds` are skipped and do not contribute to
/// the returned zoom range. Fails with [`MergeError::EmptyOrInvalidTileset`] if no tile is left.
pub fn index_tiles<S: AsRef<str>>(name: &str, paths: &[S], bounds: &ZoomBounds) -> Result<(ZoomRange, TileIndex)> {
	let mut tile_index = TileIndex::new();

	for path in paths {
		let coord = TileCoord::parse(path.as_ref())?;
		if bounds.contains(coord.z) {
			tile_index.entry(coord.z).or_default().push(coord);
		}
	}

	let (Some(&min), Some(&max)) = (tile_index.keys().next(), tile_index.keys().next_back()) else {
		return Err(MergeError::EmptyOrInvalidTileset { name: name.to_string() }.into());
	};

	for tiles in tile_index.values_mut() {
		tiles.sort();
	}

	Ok((ZoomRange { min, max }, tile_index))
}
