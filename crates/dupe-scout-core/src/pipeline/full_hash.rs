use crate::cancel::CancelFlag;
use crate::hasher::{self, HashMode};
use crate::status::{Phase, StatusTracker};
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

const PROGRESS_INTERVAL: usize = 200;

/// Confirm the remaining candidates by hashing their entire content.
/// The expected size is parsed back out of the composite stage-two key
/// and re-verified immediately before hashing; files whose size changed
/// since grouping are skipped. Groups with fewer than two paths are
/// dropped.
pub(crate) fn confirm_by_full_hash(
    candidates: &HashMap<String, Vec<PathBuf>>,
    cancel: &CancelFlag,
    status: &StatusTracker<'_>,
) -> HashMap<String, Vec<PathBuf>> {
    let jobs: Vec<(&PathBuf, u64)> = candidates
        .iter()
        .filter_map(|(key, paths)| {
            let (size, _) = key.split_once('-')?;
            let size = size.parse::<u64>().ok()?;
            Some(paths.iter().map(move |path| (path, size)))
        })
        .flatten()
        .collect();
    let total = jobs.len();

    let duplicates: DashMap<String, Vec<PathBuf>> = DashMap::new();
    let processed = AtomicUsize::new(0);

    jobs.par_iter().for_each(|(path, expected_size)| {
        if cancel.is_cancelled() {
            return;
        }

        match fs::metadata(path) {
            Ok(metadata) if metadata.len() != *expected_size => {
                warn!("File changed during scan, skipping: {}", path.display());
            }
            Ok(_) => match hasher::fingerprint(path, HashMode::Full) {
                Ok(hash) => {
                    duplicates.entry(hash).or_default().push((*path).clone());
                }
                Err(err) => warn!("Error full hashing {}: {}", path.display(), err),
            },
            Err(err) => warn!("Error stating {} before full hash: {}", path.display(), err),
        }

        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_INTERVAL == 0 {
            status.update(
                Phase::Phase3,
                40.0 + (done as f64 / total as f64) * 20.0,
                "Computing full hashes",
                done,
                total,
                "",
            );
        }
    });

    if cancel.is_cancelled() {
        return HashMap::new();
    }

    duplicates
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        .collect()
}
