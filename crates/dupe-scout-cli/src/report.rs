use colored::*;
use dupe_scout_core::{DuplicateMap, FinderReport};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Keys are truncated to this many characters for display; the full
/// values only matter inside the pipeline.
const KEY_DISPLAY_LEN: usize = 12;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: Summary,
    pub file_duplicates: Vec<FileSet>,
    pub folder_duplicates: Vec<FolderSet>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// File sets remaining after folder filtering.
    pub file_sets: usize,
    /// Top-level duplicate folder sets.
    pub folder_sets: usize,
    /// File sets before filtering.
    pub all_file_sets: usize,
    /// Folder sets before filtering, including nested ones.
    pub all_folder_sets: usize,
    pub wasted_space_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSet {
    pub hash: String,
    pub paths: Vec<PathBuf>,
    /// None when the first path could no longer be stat'ed.
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSet {
    pub signature: String,
    pub paths: Vec<PathBuf>,
    pub size_bytes: u64,
}

pub fn build_report(outcome: &FinderReport) -> Report {
    let (file_sets, wasted_space_bytes) = file_sets(&outcome.filtered_file_duplicates);
    let folder_sets = folder_sets(&outcome.filtered_folder_duplicates);

    Report {
        summary: Summary {
            file_sets: file_sets.len(),
            folder_sets: folder_sets.len(),
            all_file_sets: outcome.all_file_duplicates.len(),
            all_folder_sets: outcome.all_folder_duplicates.len(),
            wasted_space_bytes,
        },
        file_duplicates: file_sets,
        folder_duplicates: folder_sets,
    }
}

fn file_sets(dupes: &DuplicateMap) -> (Vec<FileSet>, u64) {
    let mut total_wasted = 0u64;
    let mut sets: Vec<FileSet> = dupes
        .iter()
        .map(|(hash, paths)| {
            let size_bytes = match fs::metadata(&paths[0]) {
                Ok(metadata) => {
                    total_wasted += metadata.len() * (paths.len() as u64 - 1);
                    Some(metadata.len())
                }
                Err(err) => {
                    warn!("Could not stat {}: {}", paths[0].display(), err);
                    None
                }
            };
            FileSet {
                hash: truncate(hash),
                paths: paths.clone(),
                size_bytes,
            }
        })
        .collect();
    sets.sort_by(|a, b| a.hash.cmp(&b.hash));
    (sets, total_wasted)
}

fn folder_sets(dupes: &DuplicateMap) -> Vec<FolderSet> {
    let mut sets: Vec<FolderSet> = dupes
        .iter()
        .map(|(signature, paths)| FolderSet {
            signature: truncate(signature),
            paths: paths.clone(),
            size_bytes: folder_size(&paths[0]),
        })
        .collect();
    sets.sort_by(|a, b| a.signature.cmp(&b.signature));
    sets
}

/// Total size of all files under a folder; unreadable entries are
/// skipped, so this is a best-effort display figure.
fn folder_size(folder: &Path) -> u64 {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut total = 0u64;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            total += folder_size(&entry.path());
        } else if file_type.is_file() {
            if let Ok(metadata) = entry.metadata() {
                total += metadata.len();
            }
        }
    }
    total
}

fn truncate(key: &str) -> String {
    key.chars().take(KEY_DISPLAY_LEN).collect()
}

pub fn print_human(report: &Report) {
    if report.file_duplicates.is_empty() {
        println!("\n{}", "No standalone duplicate files found.".dimmed());
    } else {
        println!("\n{}", "Duplicate files".bold().underline());
        for (index, set) in report.file_duplicates.iter().enumerate() {
            let size = set
                .size_bytes
                .map(|bytes| format!("{} bytes", bytes))
                .unwrap_or_else(|| "size unknown".to_string());
            println!(
                "\nSet {} ({}…, {}):",
                index + 1,
                set.hash.cyan(),
                size,
            );
            for path in &set.paths {
                println!("  - {}", path.display());
            }
        }
    }

    if report.folder_duplicates.is_empty() {
        println!("\n{}", "No duplicate folders found.".dimmed());
    } else {
        println!("\n{}", "Duplicate folders".bold().underline());
        for (index, set) in report.folder_duplicates.iter().enumerate() {
            println!(
                "\nSet {} ({}…, {} bytes each):",
                index + 1,
                set.signature.cyan(),
                set.size_bytes,
            );
            for path in &set.paths {
                println!("  - {}", path.display());
            }
        }
    }

    println!(
        "\n{} {} duplicate file sets, {} duplicate folder sets, {} wasted",
        "Summary:".bold(),
        report.summary.file_sets.to_string().red(),
        report.summary.folder_sets.to_string().red(),
        format!("{} bytes", report.summary.wasted_space_bytes).red(),
    );
}
