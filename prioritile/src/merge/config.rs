//! Run-wide settings of a merge.

use prioritile_core::ZoomBounds;
use std::time::Duration;

/// Log target of the periodic progress lines in [`ProgressMode::Report`].
pub const REPORT_LOG_TARGET: &str = "prioritile::report";

/// How failed jobs and unusable tilesets affect the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
	/// The first failure ends the run with an error.
	#[default]
	Strict,
	/// Failures are logged, the affected tile or tileset is skipped and the run goes on.
	BestEffort,
}

/// How progress is shown while jobs are processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgressMode {
	/// A progress bar on stderr.
	#[default]
	Bar,
	/// A log line at a fixed interval, for non-interactive environments.
	Report,
	Silent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConfig {
	/// Number of concurrent workers, at least 1.
	pub parallelism: usize,
	pub policy: FailurePolicy,
	/// Zoom bounds overriding automatic zoom range discovery.
	pub zoom: Option<ZoomBounds>,
	/// Collect per-phase timings and print them at the end.
	pub diagnostics: bool,
	pub progress: ProgressMode,
	/// Capacity of the job queue between dispatcher and workers.
	pub queue_capacity: usize,
	/// Interval between progress lines in [`ProgressMode::Report`].
	pub report_interval: Duration,
}

impl Default for MergeConfig {
	fn default() -> Self {
		MergeConfig {
			parallelism: 1,
			policy: FailurePolicy::Strict,
			zoom: None,
			diagnostics: false,
			progress: ProgressMode::Bar,
			queue_capacity: 256,
			report_interval: Duration::from_secs(5),
		}
	}
}

impl MergeConfig {
	/// Default settings without any progress output.
	pub fn new_silent() -> MergeConfig {
		MergeConfig {
			progress: ProgressMode::Silent,
			..MergeConfig::default()
		}
	}

	pub(crate) fn worker_count(&self) -> usize {
		self.parallelism.max(1)
	}
}
