use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    codec::ImageCodec, config::ConversionOptions, converter::FileConverter, dispatcher::Dispatcher,
    error::Result, progress::RunProgress, report::ConversionReport, summary::ConversionSummary,
    walker::DirectoryWalker,
};

/// Core conversion engine that orchestrates the image conversion process
pub struct BatchCore {
    options: ConversionOptions,
    progress: Arc<RunProgress>,
}

impl BatchCore {
    /// Create a new core engine with the given options
    pub fn new(options: ConversionOptions) -> Self {
        Self {
            options,
            progress: Arc::new(RunProgress::new()),
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Handle for polling the run from another thread. Can be taken before,
    /// during or after `run`.
    pub fn progress(&self) -> Arc<RunProgress> {
        Arc::clone(&self.progress)
    }

    /// Walk, convert and summarise.
    ///
    /// Only setup failures are returned as errors; per-file problems are in
    /// the summary.
    pub fn run(&self) -> Result<ConversionReport> {
        let start_time = Instant::now();
        let start_time_utc = Utc::now();

        log::info!("Scanning {}", self.options.input_dir.display());
        let walker = DirectoryWalker::new(self.options.extensions.clone());
        let plan = walker.walk(&self.options.input_dir)?;
        log::info!(
            "Found {} images; writing to {}",
            plan.file_count(),
            plan.output_root.display()
        );

        let dispatcher =
            Dispatcher::new(self.options.worker_count()).with_progress(self.progress());
        let converter = FileConverter::new(ImageCodec::new(self.options.quality));

        self.progress.begin(plan.file_count());
        let dispatched = dispatcher.dispatch(plan.units, |unit| converter.convert_unit(unit));
        let dispatched = match dispatched {
            Ok(dispatched) => dispatched,
            Err(e) => {
                self.progress.finish();
                return Err(e);
            }
        };
        log::debug!("Worker pool finished in {:?}", dispatched.elapsed);

        let summary = ConversionSummary::fold(dispatched.reports, start_time.elapsed());
        self.progress.finish();
        log::info!(
            "Done: {} converted, {} skipped, {} failed",
            summary.converted,
            summary.skipped,
            summary.failed()
        );

        Ok(ConversionReport {
            start_time: start_time_utc,
            end_time: Utc::now(),
            input_dir: plan.input_root,
            output_dir: plan.output_root,
            workers: dispatcher.workers(),
            quality: self.options.quality,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RunState;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn state_moves_from_not_started_to_completed() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("empty");
        fs::create_dir(&root).unwrap();

        let core = BatchCore::new(ConversionOptions::new(&root).with_workers(1));
        let progress = core.progress();
        assert_eq!(progress.state(), RunState::NotStarted);

        let report = core.run().unwrap();
        assert_eq!(progress.state(), RunState::Completed);
        assert_eq!(progress.total(), 0);
        assert_eq!(report.summary.total_files(), 0);
        assert_eq!(report.output_dir, dir.path().join("empty_webp"));
        assert_eq!(report.workers, 1);
        assert!(report.output_dir.is_dir());
    }

    #[test]
    fn fatal_setup_error_leaves_run_not_started() {
        let dir = tempdir().unwrap();
        let core = BatchCore::new(ConversionOptions::new(dir.path().join("missing")));
        let progress = core.progress();

        assert!(core.run().is_err());
        assert_eq!(progress.state(), RunState::NotStarted);
    }
}
