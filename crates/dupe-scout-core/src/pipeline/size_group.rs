use crate::cancel::CancelFlag;
use crate::config::FinderConfig;
use crate::status::{Phase, StatusTracker};
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Emit a status record once per this many discovered files.
const PROGRESS_INTERVAL: u64 = 1000;

/// Walk the tree under `root` and group regular non-empty files by byte
/// size, keeping only sizes shared by at least two files. Symbolic links,
/// devices, sockets, and zero-byte files are never considered.
///
/// Per-entry errors are logged and skipped; an unreadable root yields an
/// empty map rather than an error.
///
/// With `filter_by_filename` enabled, files are grouped by size and
/// basename, and only groups sharing both survive; the result is then
/// re-projected onto size so downstream stages are unaffected.
pub(crate) fn group_by_size(
    root: &Path,
    config: &FinderConfig,
    cancel: &CancelFlag,
    status: &StatusTracker<'_>,
) -> HashMap<u64, Vec<PathBuf>> {
    let processed = AtomicU64::new(0);
    let message = if config.filter_by_filename {
        "Scanning files (with filename filter)"
    } else {
        "Scanning files"
    };
    let bump_progress = |count: u64| {
        if count % PROGRESS_INTERVAL == 0 {
            status.update(
                Phase::Phase1,
                traversal_progress(count),
                message,
                count as usize,
                0,
                "",
            );
        }
    };

    let result = if config.filter_by_filename {
        let buckets: DashMap<(u64, OsString), Vec<PathBuf>> = DashMap::new();
        visit_dir(root, cancel, &|path: PathBuf, size| {
            let name = path.file_name().map(OsString::from).unwrap_or_default();
            buckets.entry((size, name)).or_default().push(path);
            bump_progress(processed.fetch_add(1, Ordering::Relaxed) + 1);
        });

        let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
        for ((size, _), paths) in buckets {
            if paths.len() >= 2 {
                by_size.entry(size).or_default().extend(paths);
            }
        }
        by_size
    } else {
        let buckets: DashMap<u64, Vec<PathBuf>> = DashMap::new();
        visit_dir(root, cancel, &|path: PathBuf, size| {
            buckets.entry(size).or_default().push(path);
            bump_progress(processed.fetch_add(1, Ordering::Relaxed) + 1);
        });

        buckets
            .into_iter()
            .filter(|(_, paths)| paths.len() >= 2)
            .collect()
    };

    if cancel.is_cancelled() {
        return HashMap::new();
    }
    result
}

/// Smoothed saturating curve for the 5-20% band: the total file count is
/// unknown during traversal, so the bar creeps toward 20 without ever
/// reaching it.
fn traversal_progress(files_seen: u64) -> f64 {
    (5.0 + 15.0 * (1.0 - 1.0 / (1.0 + files_seen as f64 / 10_000.0))).min(20.0)
}

fn visit_dir<F>(dir: &Path, cancel: &CancelFlag, sink: &F)
where
    F: Fn(PathBuf, u64) + Sync,
{
    if cancel.is_cancelled() {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Skipping unreadable directory {}: {}", dir.display(), err);
            return;
        }
    };

    entries.par_bridge().for_each(|entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error reading entry in {}: {}", dir.display(), err);
                return;
            }
        };

        // DirEntry::file_type does not follow symlinks, so links to
        // files and directories are both excluded here.
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("Error reading type of {}: {}", entry.path().display(), err);
                return;
            }
        };

        let path = entry.path();
        if file_type.is_dir() {
            visit_dir(&path, cancel, sink);
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(metadata) if metadata.len() > 0 => sink(path, metadata.len()),
                Ok(_) => {} // empty files are never duplicates
                Err(err) => warn!("Error stating {}: {}", path.display(), err),
            }
        }
    });
}
