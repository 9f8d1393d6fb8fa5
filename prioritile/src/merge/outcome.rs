//! Reducing a job to a single outcome and deciding what that outcome means for the run.

use super::FailurePolicy;
use anyhow::{Error, Result};
use prioritile_core::{MergeError, TileCoord};
use std::{fmt, ops::AddAssign};

/// What happened to one job.
#[derive(Debug)]
pub enum JobOutcome {
	/// A tile was written to the destination.
	Written,
	/// Nothing contributed to the tile, the destination was left alone.
	Unchanged,
	/// Storage or codec failure confined to this tile.
	Recoverable(Error),
	/// Failure that no policy can absorb.
	Fatal(Error),
}

impl JobOutcome {
	/// Sorts the result of a job. Failures caused by a [`MergeError`] stay confined to the tile,
	/// anything else (a panicked task, a broken invariant) is fatal.
	pub fn from_result(result: Result<bool>) -> JobOutcome {
		match result {
			Ok(true) => JobOutcome::Written,
			Ok(false) => JobOutcome::Unchanged,
			Err(err) if MergeError::find(&err).is_some() => JobOutcome::Recoverable(err),
			Err(err) => JobOutcome::Fatal(err),
		}
	}
}

/// The effect of a job on the run, once the failure policy has been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
	Written,
	Unchanged,
	Skipped,
}

impl FailurePolicy {
	/// Resolves the outcome of the job for `coord`. An error means the run has to stop.
	pub fn resolve(self, coord: &TileCoord, outcome: JobOutcome) -> Result<JobStatus> {
		match (self, outcome) {
			(_, JobOutcome::Written) => Ok(JobStatus::Written),
			(_, JobOutcome::Unchanged) => Ok(JobStatus::Unchanged),
			(FailurePolicy::BestEffort, JobOutcome::Recoverable(err)) => {
				log::warn!("skipping tile {coord}: {err:#}");
				Ok(JobStatus::Skipped)
			}
			(FailurePolicy::Strict, JobOutcome::Recoverable(err)) | (_, JobOutcome::Fatal(err)) => {
				Err(err.context(format!("merging tile {coord}")))
			}
		}
	}
}

/// Counters of a finished (or aborted) run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
	pub jobs: u64,
	pub written: u64,
	pub unchanged: u64,
	pub failed: u64,
}

impl MergeSummary {
	pub fn count(&mut self, status: JobStatus) {
		self.jobs += 1;
		match status {
			JobStatus::Written => self.written += 1,
			JobStatus::Unchanged => self.unchanged += 1,
			JobStatus::Skipped => self.failed += 1,
		}
	}
}

impl AddAssign for MergeSummary {
	fn add_assign(&mut self, other: MergeSummary) {
		self.jobs += other.jobs;
		self.written += other.written;
		self.unchanged += other.unchanged;
		self.failed += other.failed;
	}
}

impl fmt::Display for MergeSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} tiles processed: {} written, {} unchanged, {} failed",
			self.jobs, self.written, self.unchanged, self.failed
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::anyhow;
	use std::io;

	fn coord() -> TileCoord {
		TileCoord::new(3, 1, 2, "png").unwrap()
	}

	fn storage_error() -> Error {
		MergeError::backend_io("dest", "write", "3/1/2.png", io::Error::other("full")).into()
	}

	#[test]
	fn sorting_results() {
		assert!(matches!(JobOutcome::from_result(Ok(true)), JobOutcome::Written));
		assert!(matches!(JobOutcome::from_result(Ok(false)), JobOutcome::Unchanged));
		assert!(matches!(
			JobOutcome::from_result(Err(storage_error().context("writing"))),
			JobOutcome::Recoverable(_)
		));
		assert!(matches!(
			JobOutcome::from_result(Err(anyhow!("task panicked"))),
			JobOutcome::Fatal(_)
		));
	}

	#[test]
	fn strict_policy_stops_on_recoverable() {
		let err = FailurePolicy::Strict
			.resolve(&coord(), JobOutcome::Recoverable(storage_error()))
			.unwrap_err();
		assert_eq!(
			format!("{err:#}"),
			"merging tile 3/1/2.png: storage backend \"dest\" failed to write \"3/1/2.png\": full"
		);
	}

	#[test]
	fn best_effort_skips_recoverable_but_not_fatal() {
		let policy = FailurePolicy::BestEffort;
		assert_eq!(
			policy.resolve(&coord(), JobOutcome::Recoverable(storage_error())).unwrap(),
			JobStatus::Skipped
		);
		assert!(policy.resolve(&coord(), JobOutcome::Fatal(anyhow!("boom"))).is_err());
		assert_eq!(policy.resolve(&coord(), JobOutcome::Written).unwrap(), JobStatus::Written);
	}

	#[test]
	fn summary_counts() {
		let mut summary = MergeSummary::default();
		summary.count(JobStatus::Written);
		summary.count(JobStatus::Skipped);

		let mut other = MergeSummary::default();
		other.count(JobStatus::Unchanged);
		summary += other;

		assert_eq!(
			summary,
			MergeSummary {
				jobs: 3,
				written: 1,
				unchanged: 1,
				failed: 1
			}
		);
		assert_eq!(summary.to_string(), "3 tiles processed: 1 written, 1 unchanged, 1 failed");
	}
}
