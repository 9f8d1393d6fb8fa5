//! Merges raster tile pyramids in priority order.
//!
//! The first path of a run is the destination tileset, all following paths are sources given
//! lowest priority first. For every tile coordinate found in any source, the sources are layered
//! back-to-front over the existing destination tile with source-over alpha compositing, and the
//! result is written to the destination. Fully transparent tiles count as "no data" and fully
//! opaque tiles hide everything beneath them.
//!
//! ```no_run
//! use prioritile::{MergeConfig, merge_paths};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let paths = ["/tiles/merged", "/tiles/base", "s3://minio.example.org/tiles/overlay"].map(String::from);
//! let summary = merge_paths(&paths, &MergeConfig::default()).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod merge;
pub mod metrics;
pub mod tileset;

pub use merge::{FailurePolicy, MergeConfig, MergeSummary, ProgressMode, REPORT_LOG_TARGET, merge_tilesets};

use anyhow::{Result, ensure};
use discovery::discover_tilesets;
use prioritile_derive::context;
use prioritile_storage::resolve_backend;

/// Runs a complete merge: resolves the backends of `paths`, discovers and checks the tilesets
/// and merges the sources into the destination.
#[context("processing {} tileset paths", paths.len())]
pub async fn merge_paths(paths: &[String], config: &MergeConfig) -> Result<MergeSummary> {
	ensure!(
		paths.len() >= 2,
		"a destination and at least one source are required, got {} path(s)",
		paths.len()
	);

	let destination = resolve_backend(&paths[0])?;
	let sources = paths[1..].iter().map(|path| resolve_backend(path)).collect();

	let discovery = discover_tilesets(destination, sources, config.zoom)
		.await
		.into_checked(config.policy)?;

	if let Some(zoom) = discovery.reference_zoom {
		log::debug!("zoom range of this run: {zoom}");
	}
	if discovery.sources.is_empty() {
		log::warn!("no usable source tileset, nothing to merge");
		return Ok(MergeSummary::default());
	}

	merge_tilesets(&discovery.destination, &discovery.sources, config).await
}
