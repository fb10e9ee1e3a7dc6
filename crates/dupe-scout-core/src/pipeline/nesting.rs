use crate::cancel::CancelFlag;
use crate::pipeline::DuplicateMap;
use crate::status::{Phase, StatusTracker};
use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

const SEPARATOR: u8 = MAIN_SEPARATOR as u8;

/// Final filtering pass: drop duplicate-folder sets nested inside other
/// duplicate-folder sets, then drop duplicate files that live inside the
/// surviving folders. Returns `(filtered files, filtered folders)`.
pub(crate) fn filter_results(
    file_duplicates: &DuplicateMap,
    folder_duplicates: &DuplicateMap,
    cancel: &CancelFlag,
    status: &StatusTracker<'_>,
) -> (DuplicateMap, DuplicateMap) {
    status.update(
        Phase::Phase5,
        85.0,
        "Filtering nested duplicates",
        0,
        file_duplicates.len() + folder_duplicates.len(),
        "Duplicates",
    );

    if cancel.is_cancelled() {
        return (DuplicateMap::new(), DuplicateMap::new());
    }

    let filtered_folders = filter_nested_folders(folder_duplicates, cancel);

    if cancel.is_cancelled() {
        return (DuplicateMap::new(), DuplicateMap::new());
    }

    let filtered_files = filter_files_within_folders(file_duplicates, &filtered_folders, cancel);

    (filtered_files, filtered_folders)
}

/// Keep only the folder-duplicate sets whose paths are not nested inside
/// another surviving duplicate folder.
///
/// Sorted component order places every folder immediately before its
/// descendants, so a single pass tracking the last kept top-level path
/// identifies every nested set. A signature survives if any of its paths
/// does, and then keeps all of its paths.
fn filter_nested_folders(folder_duplicates: &DuplicateMap, cancel: &CancelFlag) -> DuplicateMap {
    if folder_duplicates.len() < 2 {
        return folder_duplicates.clone();
    }

    let mut path_to_signature: AHashMap<PathBuf, &String> = AHashMap::new();
    let mut all_paths: Vec<PathBuf> = Vec::new();
    for (signature, paths) in folder_duplicates {
        for path in paths {
            let cleaned = normalize(path);
            path_to_signature.insert(cleaned.clone(), signature);
            all_paths.push(cleaned);
        }
    }
    all_paths.sort_unstable();

    let mut surviving: HashSet<&String> = HashSet::new();
    let mut last_top_level: Option<&Path> = None;
    for path in &all_paths {
        if cancel.is_cancelled() {
            return DuplicateMap::new();
        }
        if let Some(top) = last_top_level {
            if path.starts_with(top) && path.as_path() != top {
                continue;
            }
        }
        if let Some(signature) = path_to_signature.get(path) {
            surviving.insert(*signature);
        }
        last_top_level = Some(path);
    }

    folder_duplicates
        .iter()
        .filter(|(signature, _)| surviving.contains(signature))
        .map(|(signature, paths)| (signature.clone(), paths.clone()))
        .collect()
}

/// Drop duplicate files located inside any surviving duplicate folder.
/// Groups reduced below two paths are dropped entirely.
fn filter_files_within_folders(
    file_duplicates: &DuplicateMap,
    folder_duplicates: &DuplicateMap,
    cancel: &CancelFlag,
) -> DuplicateMap {
    if folder_duplicates.is_empty() {
        return file_duplicates.clone();
    }

    let mut trie = PathTrie::default();
    for paths in folder_duplicates.values() {
        for path in paths {
            trie.insert_dir(&normalize(path));
        }
    }

    let kept: DashMap<String, Vec<PathBuf>> = DashMap::new();
    file_duplicates.par_iter().for_each(|(hash, paths)| {
        if cancel.is_cancelled() {
            return;
        }
        let survivors: Vec<PathBuf> = paths
            .iter()
            .filter(|path| !trie.covers(path))
            .cloned()
            .collect();
        if survivors.len() > 1 {
            kept.insert(hash.clone(), survivors);
        }
    });

    if cancel.is_cancelled() {
        return DuplicateMap::new();
    }

    kept.into_iter().collect()
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Byte-level prefix trie over directory paths. Every inserted path ends
/// with the platform separator, so a hit always lands on a directory
/// boundary; lookups cost O(path length) no matter how many folders are
/// stored.
#[derive(Default)]
struct PathTrie {
    root: TrieNode,
}

#[derive(Default)]
struct TrieNode {
    children: HashMap<u8, TrieNode>,
    terminal: bool,
}

impl PathTrie {
    fn insert_dir(&mut self, dir: &Path) {
        let mut node = &mut self.root;
        for &byte in dir.as_os_str().as_encoded_bytes() {
            node = node.children.entry(byte).or_default();
        }
        node = node.children.entry(SEPARATOR).or_default();
        node.terminal = true;
    }

    /// True when some inserted directory is a prefix of `path` at a
    /// directory boundary.
    fn covers(&self, path: &Path) -> bool {
        let mut node = &self.root;
        for &byte in path.as_os_str().as_encoded_bytes() {
            if node.terminal {
                return true;
            }
            match node.children.get(&byte) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node.terminal
    }
}
