use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::outcome::ConversionOutcome;

/// Lifecycle of a single run. There is no cancelled or paused state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Completed,
            _ => RunState::NotStarted,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            RunState::NotStarted => 0,
            RunState::Running => 1,
            RunState::Completed => 2,
        }
    }
}

/// Pollable progress of a run.
///
/// Workers only ever increment counters; readers (a console bar, a GUI frame)
/// load them whenever they like without blocking anyone. Nothing has to be
/// registered before the run starts.
#[derive(Debug, Default)]
pub struct RunProgress {
    state: AtomicU8,
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.state() == RunState::Completed
    }

    /// Mark the run as started with `total` units queued.
    pub(crate) fn begin(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.state.store(RunState::Running.as_u8(), Ordering::Release);
    }

    pub(crate) fn record(&self, outcome: &ConversionOutcome) {
        if outcome.is_failed() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn finish(&self) {
        self.state.store(RunState::Completed.as_u8(), Ordering::Release);
    }
}

/// Console progress bar using indicatif, fed by polling a [`RunProgress`].
#[cfg(feature = "cli")]
pub struct ConsoleProgress {
    progress_bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl ConsoleProgress {
    pub fn new() -> Self {
        let progress_bar = indicatif::ProgressBar::new(0);
        progress_bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        progress_bar.set_message("Scanning...");
        Self { progress_bar }
    }

    pub fn update(&self, progress: &RunProgress) {
        if progress.state() == RunState::NotStarted {
            self.progress_bar.tick();
            return;
        }

        self.progress_bar.set_length(progress.total() as u64);
        self.progress_bar.set_position(progress.completed() as u64);
        match progress.failed() {
            0 => self.progress_bar.set_message("Converting..."),
            failed => self.progress_bar.set_message(format!("{failed} failed")),
        }
    }

    pub fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}
