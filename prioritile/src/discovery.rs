//! Discovery of all tilesets taking part in a run.
//!
//! Problems with individual sources are collected instead of failing fast, so that one run can
//! report every unusable path at once. Whether any of them ends the run is decided afterwards by
//! the [`FailurePolicy`].

use crate::{merge::FailurePolicy, tileset::TilesetDescriptor};
use anyhow::{Error, Result};
use prioritile_core::{MergeError, ZoomBounds, ZoomRange};
use prioritile_storage::StorageBackend;
use std::sync::Arc;

/// The result of discovering the destination and all sources of a run.
pub struct Discovery {
	pub destination: Arc<dyn StorageBackend>,
	/// Zoom range the sources were checked against, if any.
	pub reference_zoom: Option<ZoomRange>,
	/// Usable sources, lowest priority first.
	pub sources: Vec<Arc<TilesetDescriptor>>,
	/// Problems found, in input order.
	pub errors: Vec<Error>,
}

/// Indexes the destination and every source.
///
/// `sources` are the resolved source backends in command-line order; a failed resolution is
/// recorded like any other discovery problem. With `zoom` set, every tileset is indexed within
/// those bounds and zoom ranges are not compared. Otherwise each source must cover exactly the
/// zoom range of the destination, or of the first usable source when the destination is empty.
pub async fn discover_tilesets(
	destination: Arc<dyn StorageBackend>,
	sources: Vec<Result<Arc<dyn StorageBackend>>>,
	zoom: Option<ZoomBounds>,
) -> Discovery {
	let bounds = zoom.unwrap_or_default();
	let mut reference_zoom = None;
	let mut errors = Vec::new();

	match TilesetDescriptor::discover(&destination, &bounds).await {
		Ok(tileset) => {
			log::info!("destination {:?} has {} tiles", tileset.name(), tileset.tile_count());
			reference_zoom = Some(tileset.zoom());
		}
		Err(err) if matches!(MergeError::find(&err), Some(MergeError::EmptyOrInvalidTileset { .. })) => {
			log::info!("destination {:?} is empty", destination.name());
		}
		Err(err) => errors.push(err),
	}

	let mut usable = Vec::new();
	for source in sources {
		let tileset = match source {
			Ok(backend) => TilesetDescriptor::discover(&backend, &bounds).await,
			Err(err) => Err(err),
		};
		let tileset = match tileset {
			Ok(tileset) => tileset,
			Err(err) => {
				errors.push(err);
				continue;
			}
		};

		if zoom.is_none() {
			match reference_zoom {
				None => reference_zoom = Some(tileset.zoom()),
				Some(expected) if expected != tileset.zoom() => {
					errors.push(
						MergeError::ZoomRangeMismatch {
							name: tileset.name().to_string(),
							expected,
							found: tileset.zoom(),
						}
						.into(),
					);
					continue;
				}
				Some(_) => {}
			}
		}

		log::info!(
			"source {:?} has {} tiles at zoom {}",
			tileset.name(),
			tileset.tile_count(),
			tileset.zoom()
		);
		usable.push(Arc::new(tileset));
	}

	Discovery {
		destination,
		reference_zoom,
		sources: usable,
		errors,
	}
}

impl Discovery {
	/// Applies `policy` to the collected problems.
	///
	/// In strict mode any problem fails the run, with the first one as the cause. In best-effort
	/// mode each problem is logged and the run continues with the usable sources.
	pub fn into_checked(mut self, policy: FailurePolicy) -> Result<Discovery> {
		let errors = std::mem::take(&mut self.errors);
		let count = errors.len();
		let mut errors = errors.into_iter();
		let Some(first) = errors.next() else {
			return Ok(self);
		};

		match policy {
			FailurePolicy::Strict => {
				for err in errors {
					log::error!("{err:#}");
				}
				Err(first.context(format!("{count} tileset problem(s) found during discovery")))
			}
			FailurePolicy::BestEffort => {
				for err in std::iter::once(first).chain(errors) {
					log::warn!("ignoring tileset: {err:#}");
				}
				Ok(self)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::anyhow;
	use assert_fs::{TempDir, prelude::*};
	use prioritile_storage::LocalBackend;

	fn tileset_dir(paths: &[&str]) -> (TempDir, Arc<dyn StorageBackend>) {
		let dir = TempDir::new().unwrap();
		for path in paths {
			dir.child(path).write_binary(b"tile").unwrap();
		}
		let backend = Arc::new(LocalBackend::open(dir.path()).unwrap());
		(dir, backend)
	}

	fn names(discovery: &Discovery) -> Vec<&str> {
		discovery.sources.iter().map(|s| s.name()).collect()
	}

	#[tokio::test]
	async fn empty_destination_uses_first_source_as_reference() {
		let (_d, destination) = tileset_dir(&[]);
		let (_a, a) = tileset_dir(&["3/1/1.png", "4/2/2.png"]);
		let (_b, b) = tileset_dir(&["3/0/0.png", "4/0/0.png"]);
		let (_c, c) = tileset_dir(&["4/0/0.png"]);

		let discovery = discover_tilesets(destination, vec![Ok(a.clone()), Ok(b.clone()), Ok(c.clone())], None).await;

		assert_eq!(discovery.reference_zoom, Some(ZoomRange { min: 3, max: 4 }));
		assert_eq!(names(&discovery), [a.name(), b.name()]);
		assert_eq!(discovery.errors.len(), 1);
		assert!(matches!(
			MergeError::find(&discovery.errors[0]),
			Some(MergeError::ZoomRangeMismatch { name, .. }) if name == c.name()
		));
	}

	#[tokio::test]
	async fn destination_sets_the_reference() {
		let (_d, destination) = tileset_dir(&["5/0/0.png"]);
		let (_a, a) = tileset_dir(&["4/0/0.png", "5/0/0.png"]);

		let discovery = discover_tilesets(destination, vec![Ok(a)], None).await;
		assert_eq!(discovery.reference_zoom, Some(ZoomRange { min: 5, max: 5 }));
		assert!(discovery.sources.is_empty());
		assert!(
			discovery.errors[0]
				.to_string()
				.ends_with("expected 5-5, found 4-5")
		);
	}

	#[tokio::test]
	async fn zoom_override_skips_range_check() -> Result<()> {
		let (_d, destination) = tileset_dir(&["5/0/0.png"]);
		let (_a, a) = tileset_dir(&["4/0/0.png", "5/0/0.png", "6/0/0.png"]);
		let (_b, b) = tileset_dir(&["5/1/1.png"]);

		let discovery = discover_tilesets(destination, vec![Ok(a), Ok(b)], Some(ZoomBounds::new(5, None)?)).await;
		assert!(discovery.errors.is_empty());
		assert_eq!(discovery.sources.len(), 2);
		assert_eq!(discovery.sources[0].zoom(), ZoomRange { min: 5, max: 6 });
		assert_eq!(discovery.sources[0].tile_count(), 2);
		Ok(())
	}

	#[tokio::test]
	async fn errors_keep_input_order() {
		let (_d, destination) = tileset_dir(&[]);
		let (_b, b) = tileset_dir(&[]);
		let (_c, c) = tileset_dir(&["2/0/0.png"]);

		let sources = vec![Ok(b), Err(anyhow!("cannot open source")), Ok(c)];
		let discovery = discover_tilesets(destination, sources, None).await;

		assert_eq!(discovery.sources.len(), 1);
		assert_eq!(discovery.errors.len(), 2);
		assert!(matches!(
			MergeError::find(&discovery.errors[0]),
			Some(MergeError::EmptyOrInvalidTileset { .. })
		));
		assert_eq!(discovery.errors[1].to_string(), "cannot open source");
	}

	#[tokio::test]
	async fn policy_decides_about_problems() {
		let (_d, destination) = tileset_dir(&[]);
		let (_a, a) = tileset_dir(&["2/0/0.png"]);
		let sources = || vec![Ok(a.clone()), Err(anyhow!("first")), Err(anyhow!("second"))];

		let strict = discover_tilesets(destination.clone(), sources(), None)
			.await
			.into_checked(FailurePolicy::Strict);
		let err = strict.err().unwrap();
		assert_eq!(format!("{err:#}"), "2 tileset problem(s) found during discovery: first");

		let lenient = discover_tilesets(destination, sources(), None)
			.await
			.into_checked(FailurePolicy::BestEffort)
			.unwrap();
		assert!(lenient.errors.is_empty());
		assert_eq!(lenient.sources.len(), 1);
	}
}
