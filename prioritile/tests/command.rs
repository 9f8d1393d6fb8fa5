
use predicates::str;
use test_utilities::*;

#[test]
fn prints_help_without_sources() {
	prioritile_cmd()
		.assert()
		.success()
		.stdout(str::contains("painter-type algorithm"));

	let destination = tileset(&[]);
	prioritile_cmd()
		.arg(path_string(&destination))
		.assert()
		.success()
		.stdout(str::contains("--best-effort"));
}

#[test]
fn merges_and_reports_summary() {
	let destination = tileset(&[]);
	let source = tileset(&[("0/0/0.png", png(GREEN))]);

	prioritile_cmd()
		.args(["--parallel", "2", "--report"])
		.args(run_paths(&destination, &[&source]))
		.assert()
		.success()
		.stderr(str::contains("1 tiles processed: 1 written, 0 unchanged, 0 failed"));

	assert_eq!(read_tile(&destination, "0/0/0.png"), read_tile(&source, "0/0/0.png"));
}

#[test]
fn report_logs_progress_at_default_verbosity() {
	let destination = tileset(&[]);
	let tiles = (0..200).map(|y| (format!("8/3/{y}.png"), png(GREEN))).collect::<Vec<_>>();
	let tiles = tiles.iter().map(|(path, bytes)| (path.as_str(), bytes.clone())).collect::<Vec<_>>();
	let source = tileset(&tiles);

	let output = prioritile_cmd()
		.args(["--report", "--report-interval-ms", "1"])
		.args(run_paths(&destination, &[&source]))
		.assert()
		.success()
		.get_output()
		.stderr
		.clone();
	let stderr = String::from_utf8(output).unwrap();

	let lines = stderr.lines().filter(|line| line.contains("merged ")).collect::<Vec<_>>();
	assert!(lines.len() >= 2, "expected periodic progress lines, got:\n{stderr}");
	assert!(lines.iter().all(|line| line.contains("/200 tiles (")));
	assert!(lines.last().unwrap().contains("merged 200/200 tiles (100.0%)"));
	assert!(!stderr.contains("INFO  prioritile::merge"), "only report lines are raised to info");
}

#[test]
fn quiet_run_prints_nothing() {
	let destination = tileset(&[]);
	let source = tileset(&[("0/0/0.png", png(GREEN))]);

	prioritile_cmd()
		.arg("-q")
		.args(run_paths(&destination, &[&source]))
		.assert()
		.success()
		.stderr(str::is_empty());
}

#[test]
fn strict_failure_exits_with_error() {
	let destination = tileset(&[]);
	let source = tileset(&[("0/0/0.png", b"garbage".to_vec())]);
	let paths = run_paths(&destination, &[&source]);

	prioritile_cmd()
		.arg("-q")
		.args(&paths)
		.assert()
		.failure()
		.stderr(str::contains("failed to decode \"png\" tile"));

	prioritile_cmd()
		.args(["-q", "--best-effort"])
		.args(&paths)
		.assert()
		.success();
}
