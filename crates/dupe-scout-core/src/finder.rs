use crate::cancel::CancelFlag;
use crate::config::FinderConfig;
use crate::error::Error;
use crate::pipeline::{self, DuplicateMap};
use crate::status::{Phase, ProgressReporter, StatusTracker};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Orchestrates the five-stage duplicate-detection pipeline.
///
/// Stages run strictly in sequence; parallelism lives inside each stage.
/// A scan can be cancelled from another thread through the handle
/// returned by [`DupeFinder::cancel_flag`].
pub struct DupeFinder {
    config: FinderConfig,
    cancel: CancelFlag,
}

/// Duplicate sets discovered by a completed run, both before and after
/// nested-duplicate filtering.
#[derive(Debug, Default)]
pub struct FinderReport {
    /// File duplicates not located inside a surviving duplicate folder.
    pub filtered_file_duplicates: DuplicateMap,
    /// Top-level duplicate folders (nested sets removed).
    pub filtered_folder_duplicates: DuplicateMap,
    /// Every file-duplicate set found, before filtering.
    pub all_file_duplicates: DuplicateMap,
    /// Every folder-duplicate set found, including nested ones.
    pub all_folder_duplicates: DuplicateMap,
}

impl DupeFinder {
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for cancelling a run in flight. Cloneable and thread-safe;
    /// the flag is reset at the start of every run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the full pipeline over the tree rooted at `root`.
    ///
    /// Progress records are delivered to `reporter` with monotonically
    /// non-decreasing percentages. A cancelled run returns
    /// [`Error::Cancelled`]; an unreadable root is not an error and
    /// yields empty maps.
    pub fn run(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<FinderReport, Error> {
        let workers = self.config.worker_count();
        info!(
            "Starting duplicate scan of {} with {} workers",
            root.display(),
            workers
        );

        self.cancel.reset();
        let status = StatusTracker::new(reporter);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        // Folder analysis mixes directory I/O latency with cheap string
        // work, so it gets twice the workers.
        let folder_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers * 2)
            .build()?;

        status.update(Phase::Phase1, 0.0, "Scanning files", 0, 0, "");
        let start = Instant::now();
        let files_by_size =
            pool.install(|| pipeline::group_by_size(root, &self.config, &self.cancel, &status));
        self.check_cancelled()?;
        debug!(
            "Phase 1 completed in {:.2}s: {} sizes with potential duplicates",
            start.elapsed().as_secs_f64(),
            files_by_size.len()
        );

        status.update(Phase::Phase2, 20.0, "Computing partial hashes", 0, 0, "");
        let start = Instant::now();
        let candidates = pool.install(|| {
            pipeline::filter_by_partial_hash(&files_by_size, &self.cancel, &status)
        });
        self.check_cancelled()?;
        debug!(
            "Phase 2 completed in {:.2}s: {} partial-hash groups",
            start.elapsed().as_secs_f64(),
            candidates.len()
        );

        status.update(Phase::Phase3, 40.0, "Computing full hashes", 0, 0, "");
        let start = Instant::now();
        let all_file_duplicates =
            pool.install(|| pipeline::confirm_by_full_hash(&candidates, &self.cancel, &status));
        self.check_cancelled()?;
        debug!(
            "Phase 3 completed in {:.2}s: {} file-duplicate sets",
            start.elapsed().as_secs_f64(),
            all_file_duplicates.len()
        );

        status.update(
            Phase::Phase4,
            60.0,
            "Analyzing folders",
            all_file_duplicates.len(),
            0,
            "",
        );
        let start = Instant::now();
        let all_folder_duplicates = folder_pool.install(|| {
            pipeline::find_duplicate_folders(&all_file_duplicates, &self.cancel, &status)
        });
        self.check_cancelled()?;
        debug!(
            "Phase 4 completed in {:.2}s: {} folder-duplicate sets",
            start.elapsed().as_secs_f64(),
            all_folder_duplicates.len()
        );

        status.update(
            Phase::Phase5,
            80.0,
            "Filtering results",
            all_file_duplicates.len(),
            all_folder_duplicates.len(),
            "",
        );
        let (filtered_file_duplicates, filtered_folder_duplicates) = pool.install(|| {
            pipeline::filter_results(
                &all_file_duplicates,
                &all_folder_duplicates,
                &self.cancel,
                &status,
            )
        });
        self.check_cancelled()?;

        status.update(
            Phase::Completed,
            100.0,
            "Search completed",
            filtered_file_duplicates.len(),
            filtered_folder_duplicates.len(),
            "",
        );
        info!(
            "Scan complete: {} file sets and {} folder sets after filtering",
            filtered_file_duplicates.len(),
            filtered_folder_duplicates.len()
        );

        Ok(FinderReport {
            filtered_file_duplicates,
            filtered_folder_duplicates,
            all_file_duplicates,
            all_folder_duplicates,
        })
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
