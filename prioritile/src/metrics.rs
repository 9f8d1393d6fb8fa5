//! Per-phase timing diagnostics.
//!
//! Each measured [`Phase`] has its own collector task that owns its running average and receives
//! samples over an unbounded channel. Workers only hold a [`MetricsRecorder`], a bundle of
//! senders. No accumulator is ever touched by more than one task.
//!
//! The running value is folded as `average = (average + sample) / 2`, so recent samples weigh more
//! than old ones. It answers "is this pipeline healthy", not "what is the exact mean".

use anyhow::Result;
use std::{fmt, time::Duration};
use tokio::{
	sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
	task::JoinHandle,
};

/// A measured step of the per-tile merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Reading, decoding and classifying the source layers.
	ReadClassify,
	/// Checking for and reading the existing destination tile.
	DestinationCheck,
	Composite,
	Encode,
}

impl Phase {
	pub const ALL: [Phase; 4] = [Phase::ReadClassify, Phase::DestinationCheck, Phase::Composite, Phase::Encode];

	fn index(self) -> usize {
		self as usize
	}

	pub fn label(self) -> &'static str {
		match self {
			Phase::ReadClassify => "read/classify",
			Phase::DestinationCheck => "destination check",
			Phase::Composite => "composite",
			Phase::Encode => "encode",
		}
	}
}

/// Cheap, cloneable handle for submitting timing samples.
///
/// A disabled recorder drops every sample.
#[derive(Clone, Debug, Default)]
pub struct MetricsRecorder {
	senders: Option<[UnboundedSender<Duration>; 4]>,
}

impl MetricsRecorder {
	pub fn disabled() -> MetricsRecorder {
		MetricsRecorder::default()
	}

	pub fn is_enabled(&self) -> bool {
		self.senders.is_some()
	}

	pub fn record(&self, phase: Phase, sample: Duration) {
		if let Some(senders) = &self.senders {
			// the collector only goes away after every recorder is dropped
			let _ = senders[phase.index()].send(sample);
		}
	}
}

/// Owns the collector tasks of one run.
pub struct MetricsAggregator {
	recorder: MetricsRecorder,
	collectors: Vec<(Phase, JoinHandle<Duration>)>,
}

impl MetricsAggregator {
	/// Spawns one collector per phase, or nothing at all when `enabled` is false.
	pub fn start(enabled: bool) -> MetricsAggregator {
		if !enabled {
			return MetricsAggregator {
				recorder: MetricsRecorder::disabled(),
				collectors: Vec::new(),
			};
		}

		let mut collectors = Vec::with_capacity(Phase::ALL.len());
		let senders = Phase::ALL.map(|phase| {
			let (sender, receiver) = unbounded_channel();
			collectors.push((phase, tokio::spawn(collect(receiver))));
			sender
		});

		MetricsAggregator {
			recorder: MetricsRecorder { senders: Some(senders) },
			collectors,
		}
	}

	pub fn recorder(&self) -> MetricsRecorder {
		self.recorder.clone()
	}

	/// Waits for the collectors and returns their final values.
	///
	/// Every recorder handed out must have been dropped, otherwise this waits forever.
	pub async fn finish(self) -> Result<MetricsReport> {
		drop(self.recorder);
		let mut averages = Vec::with_capacity(self.collectors.len());
		for (phase, collector) in self.collectors {
			averages.push((phase, collector.await?));
		}
		Ok(MetricsReport { averages })
	}
}

async fn collect(mut receiver: UnboundedReceiver<Duration>) -> Duration {
	let mut average = Duration::ZERO;
	while let Some(sample) = receiver.recv().await {
		average = fold(average, sample);
	}
	average
}

fn fold(average: Duration, sample: Duration) -> Duration {
	(average + sample) / 2
}

/// Final running averages, one per phase.
#[derive(Debug, Default, PartialEq)]
pub struct MetricsReport {
	averages: Vec<(Phase, Duration)>,
}

impl MetricsReport {
	pub fn get(&self, phase: Phase) -> Option<Duration> {
		self.averages.iter().find(|(p, _)| *p == phase).map(|(_, d)| *d)
	}

	pub fn is_empty(&self) -> bool {
		self.averages.is_empty()
	}
}

impl fmt::Display for MetricsReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (phase, average) in &self.averages {
			writeln!(f, "{:>18}: {:.3} ms", phase.label(), average.as_secs_f64() * 1000.0)?;
		}
		Ok(())
	}
}
