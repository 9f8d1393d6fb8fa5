use crate::tileset::TilesetDescriptor;
use prioritile_core::TileCoord;
use prioritile_storage::StorageBackend;
use std::{fmt, sync::Arc};

/// The unit of work: one destination tile and the sources that contain it.
///
/// Created by the dispatcher and handed to exactly one worker.
pub struct Job {
	pub coord: TileCoord,
	/// Contributing sources, lowest priority first.
	pub sources: Vec<Arc<TilesetDescriptor>>,
	pub destination: Arc<dyn StorageBackend>,
}

impl fmt::Debug for Job {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Job")
			.field("coord", &self.coord.to_string())
			.field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
			.field("destination", &self.destination.name())
			.finish()
	}
}
