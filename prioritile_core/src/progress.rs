//! Lightweight terminal progress bar drawn on stderr.
//!
//! The bar shows a message, a sub-character precision bar, `pos/len`, percentage, rate and ETA.
//! Handles are cheap to clone and can be advanced from many workers at once; redraws are
//! throttled so that per-tile increments do not flood the terminal.
//!
//! ```rust
//! use prioritile_core::progress::ProgressBar;
//!
//! let progress = ProgressBar::new("merging tiles", 100);
//! progress.inc(10);
//! progress.set_max_value(120);
//! progress.finish();
//! ```

use std::{
	fmt::Write as _,
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

struct Inner {
	message: String,
	len: u64,
	pos: u64,
	start: Instant,
	last_draw: Option<Instant>,
}

impl Inner {
	fn redraw(&mut self, force: bool) {
		let now = Instant::now();
		if !force && self.last_draw.is_some_and(|t| now.duration_since(t) < REDRAW_INTERVAL) {
			return;
		}
		self.last_draw = Some(now);

		write_stderr(&format!("\r\x1b[2K{}", self.render()));
	}

	fn render(&self) -> String {
		let len = self.len.max(1);
		let pos = self.pos.min(len);
		let elapsed = self.start.elapsed().as_secs_f64();
		let per_sec = if elapsed > 0.0 { pos as f64 / elapsed } else { 0.0 };
		let eta_secs = if per_sec > 0.0 {
			(len - pos) as f64 / per_sec
		} else {
			0.0
		};

		let percent = (pos as f64 * 100.0 / len as f64).floor() as u64;
		let right = format!(
			"▏{}/{} ({:>3}%) {:>5} {:>5}",
			pos,
			self.len,
			percent,
			format_rate(per_sec),
			format_eta(Duration::from_secs_f64(eta_secs))
		);

		let taken = self.message.chars().count() + right.chars().count() + 1;
		let width = terminal_width().saturating_sub(taken).max(10);

		let mut line = String::new();
		let _ = write!(&mut line, "{}▕{}{}", self.message, make_bar(pos, len, width), right);
		line
	}
}

/// A terminal progress bar handle, cloneable and thread-safe.
#[derive(Clone)]
pub struct ProgressBar {
	inner: Arc<Mutex<Inner>>,
}

impl ProgressBar {
	pub fn new(message: &str, max_value: u64) -> ProgressBar {
		let progress = ProgressBar {
			inner: Arc::new(Mutex::new(Inner {
				message: message.to_string(),
				len: max_value,
				pos: 0,
				start: Instant::now(),
				last_draw: None,
			})),
		};
		progress.update(true, |_| {});
		progress
	}

	fn update(&self, force: bool, f: impl FnOnce(&mut Inner)) {
		if let Ok(mut inner) = self.inner.lock() {
			f(&mut inner);
			inner.redraw(force);
		}
	}

	pub fn position(&self) -> u64 {
		self.inner.lock().map(|inner| inner.pos).unwrap_or_default()
	}

	pub fn set_max_value(&self, value: u64) {
		self.update(false, |inner| {
			inner.len = value;
			inner.pos = inner.pos.min(value);
		});
	}

	pub fn inc(&self, value: u64) {
		self.update(false, |inner| inner.pos = inner.pos.saturating_add(value).min(inner.len));
	}

	/// Moves to the end, draws a final time and ends the line.
	pub fn finish(&self) {
		self.update(true, |inner| inner.pos = inner.len);
		write_stderr("\n");
	}

	/// Clears the bar line without a final draw.
	pub fn remove(&self) {
		write_stderr("\r\x1b[2K");
	}
}

#[allow(unused_variables)]
fn write_stderr(text: &str) {
	#[cfg(not(test))]
	{
		use std::io::Write;
		let mut stderr = std::io::stderr();
		let _ = stderr.write_all(text.as_bytes());
		let _ = stderr.flush();
	}
}

fn terminal_width() -> usize {
	terminal_size::terminal_size().map_or(80, |(width, _)| usize::from(width.0).max(10))
}

fn make_bar(pos: u64, len: u64, width: usize) -> String {
	let frac = (pos as f64 / len.max(1) as f64).clamp(0.0, 1.0);
	let exact = frac * width as f64;
	let whole = (exact.floor() as usize).min(width);

	// eighths, thickest first
	const PARTIALS: [char; 8] = ['█', '▉', '▊', '▋', '▌', '▍', '▎', '▏'];

	let mut bar = "█".repeat(whole);
	if whole < width {
		let idx = ((exact - whole as f64) * 8.0).floor() as usize;
		bar.push(if idx > 0 { PARTIALS[8 - idx.min(7)] } else { ' ' });
		bar.push_str(&" ".repeat(width - whole - 1));
	}
	bar
}

fn format_rate(per_sec: f64) -> String {
	if !per_sec.is_finite() {
		return "--/s".to_string();
	}
	let abs = per_sec.abs();
	let value = if abs >= 1_000_000.0 {
		format!("{:.1}M", per_sec / 1_000_000.0)
	} else if abs >= 1_000.0 {
		format!("{:.1}k", per_sec / 1_000.0)
	} else {
		format!("{per_sec:.0}")
	};
	value + "/s"
}

fn format_eta(d: Duration) -> String {
	let total = d.as_secs();
	let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
	if h > 0 {
		format!("{h:02}:{m:02}:{s:02}")
	} else {
		format!("{m:02}:{s:02}")
	}
}
