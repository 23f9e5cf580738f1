//! Scanner module: the bounded worker pool and the port-scan stage

pub mod engine;
pub mod pool;

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub use engine::{PortScanOutcome, PortScanner};
pub use pool::{PoolOutput, WorkerPool};

/// Completions between two progress redraws
pub const PROGRESS_STEP: u64 = 100;

/// Scan progress tracking.
///
/// Purely advisory: recording a completion is a single atomic add plus, every
/// [`PROGRESS_STEP`] completions and on the last one, a redraw of the bar.
pub struct ScanProgress {
    total: u64,
    completed: AtomicU64,
    step: u64,
    start_time: Instant,
    bar: ProgressBar,
}

impl ScanProgress {
    /// Progress rendered as a terminal bar
    pub fn new(label: &'static str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "{msg:>10} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA {eta}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
        bar.set_style(style);
        bar.set_message(label);
        Self::with_bar(total, bar)
    }

    /// Progress that is tracked but never drawn
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self::with_bar(total, bar)
    }

    fn with_bar(total: u64, bar: ProgressBar) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            step: PROGRESS_STEP,
            start_time: Instant::now(),
            bar,
        }
    }

    /// Record one finished unit of work, returning the new completion count
    pub fn record(&self) -> u64 {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if completed % self.step == 0 || completed == self.total {
            self.bar.set_position(completed);
        }
        completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completed share of the total, in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed() as f64 / self.total as f64
    }

    /// Completions per second since the tracker was created
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.completed() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.set_position(self.completed());
        self.bar.finish_and_clear();
    }
}
