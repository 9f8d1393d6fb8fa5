//! The per-tile merge and the worker loop around it.
//!
//! For one coordinate, sources are visited from the highest priority down. Every usable layer is
//! put beneath the layers collected so far, and the walk stops at the first fully opaque layer
//! because nothing below it can show through. Unless such a layer was found, the existing
//! destination tile becomes the bottom layer. The stack is then composited back-to-front, encoded
//! and written.

use super::{FailurePolicy, Job, JobOutcome, MergeSummary, progress::RunProgress};
use crate::metrics::{MetricsRecorder, Phase};
use anyhow::{Error, Result};
use image::DynamicImage;
use prioritile_core::Blob;
use prioritile_derive::context;
use prioritile_image::{AlphaClassification, classify, compose, decode_tile, encode_tile};
use prioritile_storage::StorageBackend;
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Instant,
};
use tokio::{
	sync::{Mutex, mpsc::Receiver},
	task::spawn_blocking,
};

/// A decoded layer together with the bytes it was decoded from.
struct Layer {
	blob: Blob,
	image: DynamicImage,
}

/// Merges the tile of `job` into the destination.
///
/// Returns whether a tile was written.
pub(crate) async fn merge_tile(job: &Job, metrics: &MetricsRecorder) -> Result<bool> {
	let path = job.coord.path();
	let format = job.coord.format.as_str();

	let started = Instant::now();
	let mut stack = VecDeque::new();
	let mut occluded = false;
	for source in job.sources.iter().rev() {
		let (layer, alpha) = read_layer(source.backend().as_ref(), &path, format).await?;
		if alpha.is_nodata {
			log::trace!("{path}: no data in {:?}", source.name());
			continue;
		}
		stack.push_front(layer);
		if alpha.is_fully_opaque {
			log::trace!("{path}: {:?} is opaque, ignoring layers below", source.name());
			occluded = true;
			break;
		}
	}
	metrics.record(Phase::ReadClassify, started.elapsed());

	let started = Instant::now();
	if !occluded && job.destination.exists(&path).await {
		let (layer, _) = read_layer(job.destination.as_ref(), &path, format).await?;
		stack.push_front(layer);
	}
	metrics.record(Phase::DestinationCheck, started.elapsed());

	let blob = match stack.len() {
		0 => {
			log::trace!("{path}: nothing to write");
			return Ok(false);
		}
		// a lone layer is written as it was read
		1 => match stack.pop_front() {
			Some(layer) => layer.blob,
			None => return Ok(false),
		},
		_ => composite_and_encode(stack, format.to_string(), metrics.clone()).await?,
	};

	job.destination.write(&path, blob).await?;
	Ok(true)
}

#[context("reading layer {path:?} from {:?}", backend.name())]
async fn read_layer(backend: &dyn StorageBackend, path: &str, format: &str) -> Result<(Layer, AlphaClassification)> {
	let blob = backend.read(path).await?;
	let format = format.to_string();
	spawn_blocking(move || -> Result<(Layer, AlphaClassification)> {
		let image = decode_tile(&blob, &format)?;
		let alpha = classify(&image);
		Ok((Layer { blob, image }, alpha))
	})
	.await?
}

async fn composite_and_encode(stack: VecDeque<Layer>, format: String, metrics: MetricsRecorder) -> Result<Blob> {
	spawn_blocking(move || -> Result<Blob> {
		let layers: Vec<DynamicImage> = stack.into_iter().map(|layer| layer.image).collect();

		let started = Instant::now();
		let image = compose(&layers)?;
		metrics.record(Phase::Composite, started.elapsed());

		let started = Instant::now();
		let blob = encode_tile(&image, &format)?;
		metrics.record(Phase::Encode, started.elapsed());
		Ok(blob)
	})
	.await?
}

/// State shared by all workers of a run.
pub(crate) struct WorkerContext {
	pub policy: FailurePolicy,
	pub progress: RunProgress,
	aborted: AtomicBool,
	failure: Mutex<Option<Error>>,
}

impl WorkerContext {
	pub fn new(policy: FailurePolicy, progress: RunProgress) -> WorkerContext {
		WorkerContext {
			policy,
			progress,
			aborted: AtomicBool::new(false),
			failure: Mutex::new(None),
		}
	}

	pub fn is_aborted(&self) -> bool {
		self.aborted.load(Ordering::Relaxed)
	}

	/// Records the error that ends the run. Only the first one is kept.
	pub async fn abort(&self, err: Error) {
		self.aborted.store(true, Ordering::Relaxed);
		let mut failure = self.failure.lock().await;
		if failure.is_none() {
			*failure = Some(err);
		} else {
			log::error!("{err:#}");
		}
	}

	pub async fn take_failure(&self) -> Option<Error> {
		self.failure.lock().await.take()
	}
}

/// Takes jobs from the shared queue until it is closed or the run is aborted.
pub(crate) async fn run_worker(
	id: usize,
	context: Arc<WorkerContext>,
	queue: Arc<Mutex<Receiver<Job>>>,
	metrics: MetricsRecorder,
) -> MergeSummary {
	let mut summary = MergeSummary::default();

	loop {
		let job = queue.lock().await.recv().await;
		let Some(job) = job else { break };
		if context.is_aborted() {
			break;
		}

		log::trace!("worker {id}: merging {}", job.coord);
		let outcome = JobOutcome::from_result(merge_tile(&job, &metrics).await);
		context.progress.inc();

		match context.policy.resolve(&job.coord, outcome) {
			Ok(status) => summary.count(status),
			Err(err) => {
				summary.jobs += 1;
				summary.failed += 1;
				context.abort(err).await;
				break;
			}
		}
	}

	log::trace!("worker {id}: done, {summary}");
	summary
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tileset::TilesetDescriptor;
	use image::{GenericImageView, Rgba, RgbaImage};
	use object_store::memory::InMemory;
	use prioritile_core::{MergeError, TileCoord, ZoomBounds};
	use prioritile_storage::ObjectStoreBackend;

	fn png(rgba: [u8; 4]) -> Blob {
		let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba(rgba)));
		encode_tile(&image, "png").unwrap()
	}

	async fn backend(name: &str, tiles: &[(&str, Blob)]) -> Arc<dyn StorageBackend> {
		let backend: Arc<dyn StorageBackend> = Arc::new(ObjectStoreBackend::new(name, Arc::new(InMemory::new()), ""));
		for (path, blob) in tiles {
			backend.write(path, blob.clone()).await.unwrap();
		}
		backend
	}

	async fn job(sources: Vec<Arc<dyn StorageBackend>>, destination: Arc<dyn StorageBackend>) -> Job {
		let mut tilesets = Vec::new();
		for source in &sources {
			tilesets.push(Arc::new(
				TilesetDescriptor::discover(source, &ZoomBounds::unbounded()).await.unwrap(),
			));
		}
		Job {
			coord: TileCoord::parse("0/0/0.png").unwrap(),
			sources: tilesets,
			destination,
		}
	}

	async fn read_pixel(backend: &Arc<dyn StorageBackend>) -> [u8; 4] {
		let blob = backend.read("0/0/0.png").await.unwrap();
		decode_tile(&blob, "png").unwrap().get_pixel(1, 1).0
	}

	#[tokio::test]
	async fn opaque_top_layer_is_copied_verbatim() -> Result<()> {
		let top = png([0, 255, 0, 255]);
		let below = backend("below", &[("0/0/0.png", png([255, 0, 0, 255]))]).await;
		let above = backend("above", &[("0/0/0.png", top.clone())]).await;
		let destination = backend("destination", &[("0/0/0.png", png([0, 0, 255, 255]))]).await;

		let job = job(vec![below, above], destination.clone()).await;
		assert!(merge_tile(&job, &MetricsRecorder::disabled()).await?);
		assert_eq!(destination.read("0/0/0.png").await?, top);
		Ok(())
	}

	#[tokio::test]
	async fn layers_below_opaque_tile_are_never_decoded() -> Result<()> {
		let top = png([0, 255, 0, 255]);
		let broken = backend("broken", &[("0/0/0.png", Blob::from(vec![1, 2, 3]))]).await;
		let above = backend("above", &[("0/0/0.png", top.clone())]).await;
		let destination = backend("destination", &[("0/0/0.png", Blob::from(vec![4, 5, 6]))]).await;

		let job = job(vec![broken, above], destination.clone()).await;
		assert!(merge_tile(&job, &MetricsRecorder::disabled()).await?);
		assert_eq!(destination.read("0/0/0.png").await?, top);
		Ok(())
	}

	#[tokio::test]
	async fn translucent_layer_blends_with_destination() -> Result<()> {
		let source = backend("source", &[("0/0/0.png", png([0, 0, 255, 128]))]).await;
		let destination = backend("destination", &[("0/0/0.png", png([255, 0, 0, 255]))]).await;

		let job = job(vec![source], destination.clone()).await;
		assert!(merge_tile(&job, &MetricsRecorder::disabled()).await?);

		let [r, g, b, a] = read_pixel(&destination).await;
		assert!((126..=128).contains(&r) && g == 0 && (127..=129).contains(&b) && a == 255);
		Ok(())
	}

	#[tokio::test]
	async fn nodata_layers_are_ignored() -> Result<()> {
		let empty = backend("empty", &[("0/0/0.png", png([9, 9, 9, 0]))]).await;
		let destination = backend("destination", &[]).await;

		let only_empty = job(vec![empty.clone()], destination.clone()).await;
		assert!(!merge_tile(&only_empty, &MetricsRecorder::disabled()).await?);
		assert!(!destination.exists("0/0/0.png").await);

		let red = backend("red", &[("0/0/0.png", png([255, 0, 0, 255]))]).await;
		let red_below_empty = job(vec![red, empty], destination.clone()).await;
		assert!(merge_tile(&red_below_empty, &MetricsRecorder::disabled()).await?);
		assert_eq!(read_pixel(&destination).await, [255, 0, 0, 255]);
		Ok(())
	}

	#[tokio::test]
	async fn corrupt_source_is_a_decode_error() {
		let broken = backend("broken", &[("0/0/0.png", Blob::from(vec![1, 2, 3]))]).await;
		let destination = backend("destination", &[]).await;

		let job = job(vec![broken], destination).await;
		let err = merge_tile(&job, &MetricsRecorder::disabled()).await.unwrap_err();
		assert!(err.to_string().starts_with("reading layer \"0/0/0.png\" from \"broken\""));
		assert!(matches!(MergeError::find(&err), Some(MergeError::Decode { .. })));
		assert!(matches!(JobOutcome::from_result(Err(err)), JobOutcome::Recoverable(_)));
	}
}
