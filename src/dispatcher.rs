use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::outcome::{ConversionOutcome, FileReport};
use crate::progress::RunProgress;
use crate::utils::panic_message;
use crate::walker::WorkUnit;

/// Everything the pool produced, in no particular order.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub reports: Vec<FileReport>,
    pub elapsed: Duration,
}

/// Runs a per-file task over a dedicated rayon pool.
pub struct Dispatcher {
    workers: usize,
    progress: Arc<RunProgress>,
}

impl Dispatcher {
    /// `workers == 0` means one worker per logical CPU.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        Self {
            workers,
            progress: Arc::new(RunProgress::new()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<RunProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn progress(&self) -> Arc<RunProgress> {
        Arc::clone(&self.progress)
    }

    /// Execute `task` once per unit and block until every unit is done.
    ///
    /// A panicking task is turned into a `Failed` outcome for its unit only.
    pub fn dispatch<F>(&self, units: Vec<WorkUnit>, task: F) -> Result<Dispatched>
    where
        F: Fn(&WorkUnit) -> ConversionOutcome + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("webpbatch-worker-{i}"))
            .build()?;

        log::info!("Converting {} files on {} workers", units.len(), self.workers);
        let start = Instant::now();

        let reports = pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(unit)))
                        .unwrap_or_else(|payload| {
                            let message = panic_message(payload.as_ref());
                            log::error!(
                                "Worker panicked on {}: {}",
                                unit.file.path.display(),
                                message
                            );
                            ConversionOutcome::Failed {
                                error: format!("worker panicked: {message}"),
                                fallback_copied: false,
                            }
                        });
                    self.progress.record(&outcome);
                    FileReport::new(unit.file.path.clone(), outcome)
                })
                .collect::<Vec<_>>()
        });

        Ok(Dispatched {
            reports,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SkipReason;
    use crate::walker::ImageFile;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn units(n: usize) -> Vec<WorkUnit> {
        (0..n)
            .map(|i| WorkUnit {
                file: ImageFile {
                    path: PathBuf::from(format!("in/{i}.jpg")),
                    relative: PathBuf::from(format!("{i}.jpg")),
                    size: i as u64,
                },
                output_dir: PathBuf::from("out"),
                claimed_by: None,
            })
            .collect()
    }

    #[test]
    fn zero_workers_means_cpu_count() {
        assert_eq!(Dispatcher::new(0).workers(), num_cpus::get());
        assert_eq!(Dispatcher::new(3).workers(), 3);
    }

    #[test]
    fn every_unit_runs_exactly_once() {
        let seen = Mutex::new(HashMap::new());
        let dispatcher = Dispatcher::new(4);
        let progress = dispatcher.progress();
        progress.begin(50);

        let dispatched = dispatcher
            .dispatch(units(50), |unit| {
                *seen.lock().unwrap().entry(unit.file.path.clone()).or_insert(0) += 1;
                ConversionOutcome::Converted {
                    original_size: unit.file.size,
                    webp_size: 1,
                }
            })
            .unwrap();

        assert_eq!(dispatched.reports.len(), 50);
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 50);
        assert!(seen.values().all(|&count| count == 1));
        assert_eq!(progress.completed(), 50);
        assert_eq!(progress.failed(), 0);
    }

    #[test]
    fn panicking_unit_does_not_take_down_the_pool() {
        let dispatcher = Dispatcher::new(2);
        let dispatched = dispatcher
            .dispatch(units(8), |unit| {
                if unit.file.path.ends_with("3.jpg") {
                    panic!("decoder exploded");
                }
                ConversionOutcome::skipped(SkipReason::AlreadyExists)
            })
            .unwrap();

        assert_eq!(dispatched.reports.len(), 8);
        let failed: Vec<_> = dispatched
            .reports
            .iter()
            .filter(|r| r.outcome.is_failed())
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, PathBuf::from("in/3.jpg"));
        match &failed[0].outcome {
            ConversionOutcome::Failed {
                error,
                fallback_copied,
            } => {
                assert!(error.contains("decoder exploded"));
                assert!(!fallback_copied);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(dispatcher.progress().failed(), 1);
    }

    #[test]
    fn empty_input_returns_immediately() {
        let dispatched = Dispatcher::new(1)
            .dispatch(Vec::new(), |_| unreachable!())
            .unwrap();
        assert!(dispatched.reports.is_empty());
    }
}
