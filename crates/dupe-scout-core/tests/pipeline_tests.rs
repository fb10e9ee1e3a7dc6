use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use dupe_scout_core::{
    DupeFinder, DuplicateMap, Error, FinderConfig, FinderReport, ProgressReporter, SilentReporter,
    StatusUpdate,
};

fn scan(root: &Path) -> FinderReport {
    scan_with(root, FinderConfig::default())
}

fn scan_with(root: &Path, config: FinderConfig) -> FinderReport {
    DupeFinder::new(config).run(root, &SilentReporter).unwrap()
}

fn sorted_sets(map: &DuplicateMap) -> Vec<Vec<PathBuf>> {
    let mut sets: Vec<Vec<PathBuf>> = map
        .values()
        .map(|paths| {
            let mut paths = paths.clone();
            paths.sort();
            paths
        })
        .collect();
    sets.sort();
    sets
}

fn assert_no_singletons(report: &FinderReport) {
    for map in [
        &report.filtered_file_duplicates,
        &report.filtered_folder_duplicates,
        &report.all_file_duplicates,
        &report.all_folder_duplicates,
    ] {
        for (key, paths) in map {
            assert!(
                paths.len() >= 2,
                "singleton set for key {}: {:?}",
                key,
                paths
            );
        }
    }
}

#[test]
fn simple_duplicate_pair_is_reported() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), "hello world").unwrap();
    fs::write(root.join("sub/c.txt"), "hello world").unwrap();
    fs::write(root.join("b.txt"), "unique").unwrap();

    let report = scan(root);
    assert_no_singletons(&report);

    assert_eq!(report.filtered_file_duplicates.len(), 1);
    assert_eq!(
        sorted_sets(&report.filtered_file_duplicates),
        vec![vec![root.join("a.txt"), root.join("sub/c.txt")]]
    );
    assert!(report.filtered_folder_duplicates.is_empty());
    assert!(report.all_folder_duplicates.is_empty());
    assert_eq!(
        sorted_sets(&report.all_file_duplicates),
        sorted_sets(&report.filtered_file_duplicates)
    );
}

#[test]
fn tail_divergence_is_rejected() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    let mut content = vec![0x5au8; 8192];
    fs::write(root.join("one.bin"), &content).unwrap();
    *content.last_mut().unwrap() = 0x5b;
    fs::write(root.join("two.bin"), &content).unwrap();

    let report = scan(root);
    assert!(report.all_file_duplicates.is_empty());
    assert!(report.filtered_file_duplicates.is_empty());
}

#[test]
fn zero_byte_files_are_never_duplicates() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("empty1"), "").unwrap();
    fs::write(root.join("empty2"), "").unwrap();
    fs::write(root.join("small"), "7 bytes").unwrap();

    let report = scan(root);
    assert!(report.all_file_duplicates.is_empty());
    assert!(report.all_folder_duplicates.is_empty());
}

#[cfg(unix)]
#[test]
fn symlinks_are_ignored() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("f"), "data").unwrap();
    std::os::unix::fs::symlink(root.join("f"), root.join("link")).unwrap();

    let report = scan(root);
    assert!(report.all_file_duplicates.is_empty());
}

fn build_duplicate_folder_tree(root: &Path) {
    fs::create_dir(root.join("A")).unwrap();
    fs::create_dir(root.join("B")).unwrap();
    fs::write(root.join("A/x"), "1").unwrap();
    fs::write(root.join("A/y"), "2").unwrap();
    fs::write(root.join("B/x"), "1").unwrap();
    fs::write(root.join("B/y"), "2").unwrap();
}

#[test]
fn folder_level_duplicates_absorb_their_files() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);

    let report = scan(root);
    assert_no_singletons(&report);

    // Both file contents are duplicated across A and B.
    assert_eq!(report.all_file_duplicates.len(), 2);
    // The filtered view reports the folder pair instead of its files.
    assert!(report.filtered_file_duplicates.is_empty());
    assert_eq!(
        sorted_sets(&report.filtered_folder_duplicates),
        vec![vec![root.join("A"), root.join("B")]]
    );
}

#[test]
fn nested_duplicate_folders_are_suppressed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);
    fs::create_dir(root.join("A/sub")).unwrap();
    fs::create_dir(root.join("B/sub")).unwrap();
    fs::write(root.join("A/sub/z"), "3").unwrap();
    fs::write(root.join("B/sub/z"), "3").unwrap();

    let report = scan(root);
    assert_no_singletons(&report);

    // The sub pair is found, but only the top-level pair survives.
    assert_eq!(report.all_folder_duplicates.len(), 2);
    assert_eq!(
        sorted_sets(&report.filtered_folder_duplicates),
        vec![vec![root.join("A"), root.join("B")]]
    );
    assert!(report.filtered_file_duplicates.is_empty());
}

#[test]
fn folder_signature_ignores_creation_order() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir(root.join("first")).unwrap();
    fs::create_dir(root.join("second")).unwrap();
    for name in ["aa", "bb", "cc"] {
        fs::write(root.join("first").join(name), name).unwrap();
    }
    for name in ["cc", "bb", "aa"] {
        fs::write(root.join("second").join(name), name).unwrap();
    }

    let report = scan(root);
    assert_eq!(
        sorted_sets(&report.filtered_folder_duplicates),
        vec![vec![root.join("first"), root.join("second")]]
    );
}

#[test]
fn files_outside_duplicate_folders_survive_filtering() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);
    // A third copy of "1" outside any duplicate folder stays reported,
    // together with the copies the folders absorb elsewhere.
    fs::write(root.join("loose1"), "1").unwrap();
    fs::write(root.join("loose2"), "1").unwrap();

    let report = scan(root);
    let filtered = sorted_sets(&report.filtered_file_duplicates);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0], vec![root.join("loose1"), root.join("loose2")]);
}

#[test]
fn filename_filter_restricts_grouping() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("report.txt"), "same content").unwrap();
    fs::write(root.join("copy.txt"), "same content").unwrap();

    let plain = scan(root);
    assert_eq!(plain.all_file_duplicates.len(), 1);

    let filtered = scan_with(
        root,
        FinderConfig::default().with_filename_filter(true),
    );
    assert!(filtered.all_file_duplicates.is_empty());
}

#[test]
fn unreadable_root_yields_empty_report() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("no-such-dir");

    let report = scan(&missing);
    assert!(report.filtered_file_duplicates.is_empty());
    assert!(report.filtered_folder_duplicates.is_empty());
    assert!(report.all_file_duplicates.is_empty());
    assert!(report.all_folder_duplicates.is_empty());
}

#[test]
fn results_are_deterministic_across_runs() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);
    fs::write(root.join("loose1"), "payload").unwrap();
    fs::write(root.join("loose2"), "payload").unwrap();

    let first = scan(root);
    let second = scan(root);

    let keys = |map: &DuplicateMap| {
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    };
    assert_eq!(
        keys(&first.all_file_duplicates),
        keys(&second.all_file_duplicates)
    );
    assert_eq!(
        keys(&first.all_folder_duplicates),
        keys(&second.all_folder_duplicates)
    );
    assert_eq!(
        sorted_sets(&first.filtered_file_duplicates),
        sorted_sets(&second.filtered_file_duplicates)
    );
    assert_eq!(
        sorted_sets(&first.filtered_folder_duplicates),
        sorted_sets(&second.filtered_folder_duplicates)
    );
}

/// Reporter that cancels the scan as soon as the first status record
/// arrives, making cancellation deterministic on small trees.
struct CancelOnFirstUpdate {
    flag: dupe_scout_core::CancelFlag,
}

impl ProgressReporter for CancelOnFirstUpdate {
    fn report(&self, _update: &StatusUpdate) {
        self.flag.cancel();
    }
}

#[test]
fn cancelled_scan_surfaces_a_distinct_error() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);

    let finder = DupeFinder::new(FinderConfig::default());
    let reporter = CancelOnFirstUpdate {
        flag: finder.cancel_flag(),
    };

    match finder.run(root, &reporter) {
        Err(Error::Cancelled) => {}
        other => panic!("expected cancellation, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn cancel_flag_is_reset_between_runs() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("a"), "content").unwrap();
    fs::write(root.join("b"), "content").unwrap();

    let finder = DupeFinder::new(FinderConfig::default());
    finder.cancel_flag().cancel();

    // run() resets the flag on entry, so the pre-set flag must not
    // cancel this scan.
    let report = finder.run(root, &SilentReporter).unwrap();
    assert_eq!(report.all_file_duplicates.len(), 1);
}

#[test]
fn worker_count_configuration_is_honored() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);

    let report = scan_with(root, FinderConfig::default().with_cpu_cores(1));
    assert_eq!(
        sorted_sets(&report.filtered_folder_duplicates),
        vec![vec![root.join("A"), root.join("B")]]
    );
}

#[test]
fn hard_links_count_as_ordinary_duplicates() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(root.join("original"), "linked content").unwrap();
    fs::hard_link(root.join("original"), root.join("alias")).unwrap();

    let report = scan(root);
    assert_eq!(report.all_file_duplicates.len(), 1);
    assert_eq!(
        sorted_sets(&report.all_file_duplicates),
        vec![vec![root.join("alias"), root.join("original")]]
    );
}

/// Collects every update so phase ordering and monotonicity can be
/// asserted after the run.
struct RecordingReporter {
    updates: std::sync::Mutex<Vec<StatusUpdate>>,
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, update: &StatusUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }
}

#[test]
fn progress_is_monotonic_and_ends_completed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    build_duplicate_folder_tree(root);

    let reporter = RecordingReporter {
        updates: std::sync::Mutex::new(Vec::new()),
    };
    DupeFinder::new(FinderConfig::default())
        .run(root, &reporter)
        .unwrap();

    let updates = reporter.updates.lock().unwrap();
    assert!(!updates.is_empty());

    let mut last = 0.0f64;
    for update in updates.iter() {
        assert!(
            update.progress_percent >= last,
            "progress regressed from {} to {}",
            last,
            update.progress_percent
        );
        last = update.progress_percent;
    }

    let final_update = updates.last().unwrap();
    assert_eq!(final_update.phase.as_str(), "completed");
    assert_eq!(final_update.progress_percent, 100.0);
}

#[test]
fn duplicate_sets_are_transitively_closed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["one", "two", "three"] {
        fs::write(root.join(name), "triplet").unwrap();
    }

    let report = scan(root);
    assert_eq!(report.all_file_duplicates.len(), 1);
    let set = report.all_file_duplicates.values().next().unwrap();
    assert_eq!(set.len(), 3);

    let as_set: HashMap<&PathBuf, ()> = set.iter().map(|p| (p, ())).collect();
    for name in ["one", "two", "three"] {
        assert!(as_set.contains_key(&root.join(name)));
    }
}
