pub(crate) mod folder_sig;
pub(crate) mod full_hash;
pub(crate) mod nesting;
pub(crate) mod partial_hash;
pub(crate) mod size_group;

use std::collections::HashMap;
use std::path::PathBuf;

/// Duplicate sets keyed by content hash (files) or folder signature
/// (directories). Every value holds at least two paths.
pub type DuplicateMap = HashMap<String, Vec<PathBuf>>;

pub(crate) use folder_sig::find_duplicate_folders;
pub(crate) use full_hash::confirm_by_full_hash;
pub(crate) use nesting::filter_results;
pub(crate) use partial_hash::filter_by_partial_hash;
pub(crate) use size_group::group_by_size;
