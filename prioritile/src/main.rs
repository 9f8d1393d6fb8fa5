use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::LevelFilter;
use prioritile::{FailurePolicy, MergeConfig, MergeSummary, ProgressMode, REPORT_LOG_TARGET, merge_paths};
use prioritile_core::ZoomBounds;
use std::time::Duration;

const LONG_ABOUT: &str = "\
Applies a painter-type algorithm to the first tile location given on the command line, \
leveraging the XYZ (and WMTS) directory structure {z}/{x}/{y}.{format}.

All following locations are sources, layered in the order given: the first source is the \
lowest priority background, the last one is drawn on top. At least one source is required.

Assumptions about the tiles:
- fully transparent tiles carry no data and are skipped
- fully opaque tiles hide everything below them
- without --zoom, all tilesets must cover the same zoom levels

Locations are local directories or s3://<host>/<bucket>/<prefix>. Credentials for object \
storage are read from <HOST>_<BUCKET>_ACCESS_KEY_ID and <HOST>_<BUCKET>_SECRET_ACCESS_KEY, \
falling back to AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY.";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = LONG_ABOUT)]
struct Cli {
	/// destination tileset, followed by the source tilesets from lowest to highest priority
	#[arg(value_name = "PATH")]
	paths: Vec<String>,

	/// number of tiles processed in parallel
	#[arg(long, value_name = "N", default_value_t = 1)]
	parallel: usize,

	/// print average timings of the merge phases at the end
	#[arg(long)]
	debug: bool,

	/// log progress periodically instead of drawing a progress bar
	#[arg(long)]
	report: bool,

	/// interval between progress lines of --report
	#[arg(long, value_name = "MS", default_value_t = 5000, hide = true)]
	report_interval_ms: u64,

	/// skip tiles and tilesets that fail instead of aborting
	#[arg(long)]
	best_effort: bool,

	/// only merge these zoom levels, e.g. "5-9" or "5-", instead of discovering them
	#[arg(long, value_name = "MIN-MAX")]
	zoom: Option<ZoomBounds>,

	// -q also hides the progress output
	#[command(flatten)]
	verbose: Verbosity<WarnLevel>,
}

impl Cli {
	fn is_quiet(&self) -> bool {
		self.verbose.log_level_filter() < LevelFilter::Warn
	}

	fn merge_config(&self) -> MergeConfig {
		let progress = if self.is_quiet() {
			ProgressMode::Silent
		} else if self.report {
			ProgressMode::Report
		} else {
			ProgressMode::Bar
		};

		MergeConfig {
			parallelism: self.parallel.max(1),
			policy: if self.best_effort {
				FailurePolicy::BestEffort
			} else {
				FailurePolicy::Strict
			},
			zoom: self.zoom,
			diagnostics: self.debug,
			progress,
			report_interval: Duration::from_millis(self.report_interval_ms.max(1)),
			..MergeConfig::default()
		}
	}

	/// Level for the progress lines of --report, which are shown even without -v.
	fn report_log_level(&self) -> Option<LevelFilter> {
		(self.merge_config().progress == ProgressMode::Report)
			.then(|| self.verbose.log_level_filter().max(LevelFilter::Info))
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let mut logger = env_logger::Builder::new();
	logger
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None);
	if let Some(level) = cli.report_log_level() {
		logger.filter_module(REPORT_LOG_TARGET, level);
	}
	logger.init();

	run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
	if cli.paths.len() < 2 {
		Cli::command().print_long_help()?;
		return Ok(());
	}

	let summary = merge(&cli.paths, &cli.merge_config())?;
	if !cli.is_quiet() {
		eprintln!("{summary}");
	}
	Ok(())
}

#[tokio::main]
async fn merge(paths: &[String], config: &MergeConfig) -> Result<MergeSummary> {
	merge_paths(paths, config).await
}
