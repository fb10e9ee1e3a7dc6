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

const PROGRESS_INTERVAL: usize = 500;

/// Narrow the size buckets by sampling each candidate's partial
/// fingerprint. The result is keyed by the composite `"<size>-<hash>"`;
/// the size prefix keeps same-fingerprint files of different sizes from
/// colliding. Size is re-obtained at hash time so the key reflects the
/// file as it was actually sampled. Groups with fewer than two paths are
/// dropped.
pub(crate) fn filter_by_partial_hash(
    files_by_size: &HashMap<u64, Vec<PathBuf>>,
    cancel: &CancelFlag,
    status: &StatusTracker<'_>,
) -> HashMap<String, Vec<PathBuf>> {
    let jobs: Vec<&PathBuf> = files_by_size.values().flatten().collect();
    let total = jobs.len();

    let candidates: DashMap<String, Vec<PathBuf>> = DashMap::new();
    let processed = AtomicUsize::new(0);

    jobs.par_iter().for_each(|path| {
        if cancel.is_cancelled() {
            return;
        }

        match hasher::fingerprint(path, HashMode::Partial) {
            Ok(hash) => match fs::metadata(path) {
                Ok(metadata) => {
                    let key = format!("{}-{}", metadata.len(), hash);
                    candidates.entry(key).or_default().push((*path).clone());
                }
                Err(err) => warn!("Error stating {}: {}", path.display(), err),
            },
            Err(err) => warn!("Error partial hashing {}: {}", path.display(), err),
        }

        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_INTERVAL == 0 {
            status.update(
                Phase::Phase2,
                20.0 + (done as f64 / total as f64) * 20.0,
                "Computing size-based partial hashes",
                done,
                total,
                "Suspects",
            );
        }
    });

    if cancel.is_cancelled() {
        return HashMap::new();
    }

    candidates
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        .collect()
}
