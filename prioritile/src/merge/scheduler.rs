//! Building the backlog and running the worker pool.
//!
//! The backlog is the union of all source coverage: every coordinate present in at least one
//! source becomes exactly one [`Job`], so no two workers ever write the same destination tile.

use super::{
	Job, MergeConfig, MergeSummary,
	progress::RunProgress,
	worker::{WorkerContext, run_worker},
};
use crate::{metrics::MetricsAggregator, tileset::TilesetDescriptor};
use anyhow::Result;
use itertools::Itertools;
use prioritile_core::TileCoord;
use prioritile_derive::context;
use prioritile_storage::StorageBackend;
use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};
use tokio::sync::{Mutex, mpsc};

/// Maps every coordinate found in the sources to the sources containing it, lowest priority
/// first.
#[derive(Debug, Default)]
pub struct OwnershipIndex {
	owners: BTreeMap<TileCoord, Vec<Arc<TilesetDescriptor>>>,
}

impl OwnershipIndex {
	/// Indexes `sources`, given lowest priority first.
	pub fn build(sources: &[Arc<TilesetDescriptor>]) -> OwnershipIndex {
		let mut owners: BTreeMap<TileCoord, Vec<Arc<TilesetDescriptor>>> = BTreeMap::new();
		for source in sources {
			for coord in source.iter_tiles() {
				owners.entry(coord.clone()).or_default().push(source.clone());
			}
		}
		OwnershipIndex { owners }
	}

	pub fn len(&self) -> usize {
		self.owners.len()
	}

	pub fn is_empty(&self) -> bool {
		self.owners.is_empty()
	}

	/// Names of the sources owning `coord`, in priority order.
	pub fn owners_of(&self, coord: &TileCoord) -> Vec<&str> {
		self.owners
			.get(coord)
			.map(|sources| sources.iter().map(|s| s.name()).collect())
			.unwrap_or_default()
	}

	/// The distinct `{z}/{x}` directories the destination needs.
	pub fn parent_paths(&self) -> BTreeSet<String> {
		self.owners.keys().map(TileCoord::parent_path).collect()
	}

	pub fn into_jobs(self, destination: Arc<dyn StorageBackend>) -> impl Iterator<Item = Job> {
		self.owners.into_iter().map(move |(coord, sources)| Job {
			coord,
			sources,
			destination: destination.clone(),
		})
	}
}

/// Merges `sources` (lowest priority first) into `destination`.
///
/// Jobs are fed through a bounded queue of `config.queue_capacity` entries to
/// `config.parallelism` workers. Under [`FailurePolicy::Strict`](super::FailurePolicy::Strict)
/// the first failed job stops the run and its error is returned.
#[context("merging {} sources into {:?}", sources.len(), destination.name())]
pub async fn merge_tilesets(
	destination: &Arc<dyn StorageBackend>,
	sources: &[Arc<TilesetDescriptor>],
	config: &MergeConfig,
) -> Result<MergeSummary> {
	let index = OwnershipIndex::build(sources);
	log::info!(
		"merging {} tiles from {} sources into {:?} with {} workers",
		index.len(),
		sources.len(),
		destination.name(),
		config.worker_count()
	);

	prepare_directories(destination.as_ref(), &index).await?;

	let metrics = MetricsAggregator::start(config.diagnostics);
	let progress = RunProgress::start(config.progress, index.len() as u64, config.report_interval);
	let context = Arc::new(WorkerContext::new(config.policy, progress.handle()));

	let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity.max(1));
	let queue = Arc::new(Mutex::new(receiver));
	let workers = (0..config.worker_count())
		.map(|id| tokio::spawn(run_worker(id, context.clone(), queue.clone(), metrics.recorder())))
		.collect_vec();
	// workers hold the only receivers, so a send fails once all of them stopped
	drop(queue);

	for job in index.into_jobs(destination.clone()) {
		if context.is_aborted() || sender.send(job).await.is_err() {
			break;
		}
	}
	drop(sender);

	let mut summary = MergeSummary::default();
	for worker in workers {
		match worker.await {
			Ok(worker_summary) => summary += worker_summary,
			Err(err) => context.abort(err.into()).await,
		}
	}
	progress.finish();

	let report = metrics.finish().await?;
	if config.diagnostics {
		eprintln!("average phase timings:\n{report}");
	}

	if let Some(err) = context.take_failure().await {
		log::error!("stopped after {summary}");
		return Err(err);
	}

	log::info!("{summary}");
	Ok(summary)
}

/// Makes sure the destination has a directory for every column of the backlog.
#[context("preparing destination directories in {:?}", destination.name())]
async fn prepare_directories(destination: &dyn StorageBackend, index: &OwnershipIndex) -> Result<()> {
	let directories = index.parent_paths();
	log::debug!("ensuring {} directories in {:?}", directories.len(), destination.name());
	for directory in &directories {
		destination.ensure_directory(directory).await?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::merge::FailurePolicy;
	use assert_fs::{TempDir, prelude::*};
	use pretty_assertions::assert_eq;
	use prioritile_core::ZoomBounds;
	use prioritile_storage::LocalBackend;

	async fn tileset(dir: &TempDir, paths: &[&str]) -> Arc<TilesetDescriptor> {
		for path in paths {
			dir.child(path).write_binary(b"not an image").unwrap();
		}
		let backend: Arc<dyn StorageBackend> = Arc::new(LocalBackend::open(dir.path()).unwrap());
		Arc::new(TilesetDescriptor::discover(&backend, &ZoomBounds::unbounded()).await.unwrap())
	}

	#[tokio::test]
	async fn index_is_the_union_of_sources() {
		let (dir_a, dir_b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
		let a = tileset(&dir_a, &["2/0/0.png", "2/0/1.png"]).await;
		let b = tileset(&dir_b, &["2/0/1.png", "2/3/3.png"]).await;

		let index = OwnershipIndex::build(&[a.clone(), b.clone()]);
		assert_eq!(index.len(), 3);
		assert_eq!(index.owners_of(&TileCoord::parse("2/0/0.png").unwrap()), [a.name()]);
		assert_eq!(
			index.owners_of(&TileCoord::parse("2/0/1.png").unwrap()),
			[a.name(), b.name()]
		);
		assert!(index.owners_of(&TileCoord::parse("2/9/9.png").unwrap()).is_empty());
		assert_eq!(index.parent_paths().into_iter().collect_vec(), ["2/0", "2/3"]);

		let jobs = OwnershipIndex::build(&[a, b]).into_jobs(Arc::new(LocalBackend::open(dir_a.path()).unwrap()));
		let coords = jobs.map(|job| job.coord.to_string()).collect_vec();
		assert_eq!(coords, ["2/0/0.png", "2/0/1.png", "2/3/3.png"]);
	}

	#[tokio::test]
	async fn strict_run_stops_at_first_failure() {
		let (source_dir, destination_dir) = (TempDir::new().unwrap(), TempDir::new().unwrap());
		let paths = (0..20).map(|y| format!("5/1/{y}.png")).collect_vec();
		let source = tileset(&source_dir, &paths.iter().map(String::as_str).collect_vec()).await;
		let destination: Arc<dyn StorageBackend> = Arc::new(LocalBackend::open(destination_dir.path()).unwrap());

		let config = MergeConfig {
			parallelism: 2,
			queue_capacity: 1,
			..MergeConfig::new_silent()
		};
		let err = merge_tilesets(&destination, &[source.clone()], &config)
			.await
			.unwrap_err();
		assert!(format!("{err:#}").contains("failed to decode \"png\" tile"));
		assert!(destination_dir.path().join("5/1").is_dir());

		let config = MergeConfig {
			policy: FailurePolicy::BestEffort,
			..config
		};
		let summary = merge_tilesets(&destination, &[source], &config).await.unwrap();
		assert_eq!(
			summary,
			MergeSummary {
				jobs: 20,
				written: 0,
				unchanged: 0,
				failed: 20
			}
		);
	}
}
