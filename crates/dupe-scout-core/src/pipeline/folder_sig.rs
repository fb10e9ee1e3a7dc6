use crate::cancel::CancelFlag;
use crate::pipeline::DuplicateMap;
use crate::status::{Phase, StatusTracker};
use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

const PROGRESS_INTERVAL: usize = 100;

/// Cached signature value marking a folder as not duplicable.
const NOT_DUPLICABLE: &str = "";

/// Group folders whose entire recursive content consists of files from
/// the duplicate map (and of subfolders that are themselves duplicable)
/// by their canonical content signature. Groups with fewer than two
/// folders are dropped.
///
/// Candidates are the parent directories of the duplicate files, ordered
/// deepest first so that child signatures are already memoized when
/// their parents are computed.
pub(crate) fn find_duplicate_folders(
    file_duplicates: &DuplicateMap,
    cancel: &CancelFlag,
    status: &StatusTracker<'_>,
) -> DuplicateMap {
    // Reverse index for hash lookups; immutable once built, so workers
    // share it without synchronization.
    let mut path_to_hash: AHashMap<PathBuf, String> = AHashMap::new();
    for (hash, paths) in file_duplicates {
        for path in paths {
            path_to_hash.insert(path.clone(), hash.clone());
        }
    }
    let file_count = path_to_hash.len();

    let unique_parents: HashSet<PathBuf> = path_to_hash
        .keys()
        .filter_map(|path| path.parent().map(Path::to_path_buf))
        .collect();
    let mut candidates: Vec<PathBuf> = unique_parents.into_iter().collect();
    candidates.sort_by_key(|path| std::cmp::Reverse(path.components().count()));

    let cache: DashMap<PathBuf, String> = DashMap::new();
    let groups: DashMap<String, Vec<PathBuf>> = DashMap::new();
    let processed = AtomicUsize::new(0);
    let total = candidates.len();

    candidates.par_iter().for_each(|folder| {
        if cancel.is_cancelled() {
            return;
        }

        if let Some(signature) = folder_signature(folder, &path_to_hash, &cache) {
            groups.entry(signature).or_default().push(folder.clone());
        }

        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_INTERVAL == 0 {
            status.update(
                Phase::Phase4,
                60.0 + (done as f64 / total as f64) * 20.0,
                "Analyzing folders",
                done,
                total,
                &format!("{} duplicate files", file_count),
            );
        }
    });

    if cancel.is_cancelled() {
        return DuplicateMap::new();
    }

    groups
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        .collect()
}

/// Canonical signature of a folder's duplicable content, or `None` when
/// the folder contains anything outside the duplicate file set.
///
/// Items take the form `F:<name>:<hash>` for files and `D:<name>:<sig>`
/// for subdirectories, sorted lexicographically and joined with `;` so
/// filesystem entry order never affects the result. Results, including
/// the not-duplicable tombstone, are memoized in `cache`.
fn folder_signature(
    dir: &Path,
    path_to_hash: &AHashMap<PathBuf, String>,
    cache: &DashMap<PathBuf, String>,
) -> Option<String> {
    if let Some(cached) = cache.get(dir) {
        return if cached.value() == NOT_DUPLICABLE {
            None
        } else {
            Some(cached.value().clone())
        };
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Could not read directory {}: {}", dir.display(), err);
            cache.insert(dir.to_path_buf(), NOT_DUPLICABLE.to_string());
            return None;
        }
    };

    let mut items = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Could not read entry in {}: {}", dir.display(), err);
                cache.insert(dir.to_path_buf(), NOT_DUPLICABLE.to_string());
                return None;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        if is_dir {
            match folder_signature(&path, path_to_hash, cache) {
                Some(child_signature) => items.push(format!("D:{}:{}", name, child_signature)),
                None => {
                    cache.insert(dir.to_path_buf(), NOT_DUPLICABLE.to_string());
                    return None;
                }
            }
        } else {
            match path_to_hash.get(&path) {
                Some(hash) => items.push(format!("F:{}:{}", name, hash)),
                None => {
                    cache.insert(dir.to_path_buf(), NOT_DUPLICABLE.to_string());
                    return None;
                }
            }
        }
    }

    items.sort_unstable();
    let signature = items.join(";");
    cache.insert(dir.to_path_buf(), signature.clone());
    Some(signature)
}
