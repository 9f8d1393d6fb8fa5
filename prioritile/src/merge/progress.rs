//! Progress reporting for the merge phase.

use super::{ProgressMode, REPORT_LOG_TARGET};
use prioritile_core::progress::ProgressBar;
use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};
use tokio::task::JoinHandle;

/// Counts finished jobs and shows them as configured.
#[derive(Clone)]
pub(crate) struct RunProgress {
	done: Arc<AtomicU64>,
	bar: Option<ProgressBar>,
}

/// Handle to stop the progress output at the end of the run.
pub(crate) struct ProgressDisplay {
	progress: RunProgress,
	total: u64,
	reporter: Option<JoinHandle<()>>,
}

impl RunProgress {
	pub fn start(mode: ProgressMode, total: u64, interval: Duration) -> ProgressDisplay {
		let done = Arc::new(AtomicU64::new(0));
		let (bar, reporter) = match mode {
			ProgressMode::Bar => (Some(ProgressBar::new("merging tiles", total)), None),
			ProgressMode::Report => (None, Some(tokio::spawn(report(done.clone(), total, interval)))),
			ProgressMode::Silent => (None, None),
		};
		ProgressDisplay {
			progress: RunProgress { done, bar },
			total,
			reporter,
		}
	}

	pub fn inc(&self) {
		self.done.fetch_add(1, Ordering::Relaxed);
		if let Some(bar) = &self.bar {
			bar.inc(1);
		}
	}

	#[cfg(test)]
	pub fn position(&self) -> u64 {
		self.done.load(Ordering::Relaxed)
	}
}

impl ProgressDisplay {
	pub fn handle(&self) -> RunProgress {
		self.progress.clone()
	}

	pub fn finish(self) {
		if let Some(reporter) = self.reporter {
			reporter.abort();
			log_progress(self.progress.done.load(Ordering::Relaxed), self.total);
		}
		if let Some(bar) = &self.progress.bar {
			bar.finish();
		}
	}
}

async fn report(done: Arc<AtomicU64>, total: u64, interval: Duration) {
	let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
	// the first tick completes immediately
	ticker.tick().await;
	loop {
		ticker.tick().await;
		log_progress(done.load(Ordering::Relaxed), total);
	}
}

fn log_progress(done: u64, total: u64) {
	log::info!(target: REPORT_LOG_TARGET, "merged {done}/{total} tiles ({:.1}%)", percent(done, total));
}

fn percent(done: u64, total: u64) -> f64 {
	if total == 0 {
		100.0
	} else {
		done as f64 * 100.0 / total as f64
	}
}
