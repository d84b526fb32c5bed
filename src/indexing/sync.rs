//! File-level synchronization between a directory snapshot and the
//! persisted file records.

use crate::indexing::discovery::SourceFile;
use std::collections::{HashMap, HashSet};

/// The work a run has to do: files to (re-)index and paths to purge.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub to_index: Vec<SourceFile>,
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.to_index.is_empty() && self.to_delete.is_empty()
    }
}

/// Compare the current directory snapshot against the persisted path→mtime
/// records.
///
/// A file is indexed when its path is absent from the records or its mtime
/// differs; a path is deleted when it is recorded but no longer present on
/// disk. The comparison is mtime-only: a file rewritten with an identical
/// mtime is not detected as changed. `force` upgrades every current file to
/// `to_index` without affecting deletions.
pub fn reconcile(
    current: &[SourceFile],
    persisted: &HashMap<String, u64>,
    force: bool,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for file in current {
        let changed = persisted.get(&file.relative_path) != Some(&file.modified_millis);
        if force || changed {
            plan.to_index.push(file.clone());
        }
    }

    let current_paths: HashSet<&str> = current
        .iter()
        .map(|file| file.relative_path.as_str())
        .collect();
    plan.to_delete = persisted
        .keys()
        .filter(|path| !current_paths.contains(path.as_str()))
        .cloned()
        .collect();
    plan.to_delete.sort();

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(path: &str, mtime: u64) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            relative_path: path.to_string(),
            modified_millis: mtime,
        }
    }

    #[test]
    fn test_new_file_is_indexed() {
        let plan = reconcile(&[file("a.md", 100)], &HashMap::new(), false);
        assert_eq!(plan.to_index.len(), 1);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_unchanged_file_is_untouched() {
        let persisted = HashMap::from([("a.md".to_string(), 100)]);
        let plan = reconcile(&[file("a.md", 100)], &persisted, false);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_modified_file_is_reindexed() {
        let persisted = HashMap::from([("a.md".to_string(), 100)]);
        let plan = reconcile(&[file("a.md", 200)], &persisted, false);
        assert_eq!(plan.to_index.len(), 1);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_vanished_file_is_deleted() {
        let persisted = HashMap::from([("a.md".to_string(), 100), ("b.md".to_string(), 100)]);
        let plan = reconcile(&[file("a.md", 100)], &persisted, false);
        assert!(plan.to_index.is_empty());
        assert_eq!(plan.to_delete, vec!["b.md".to_string()]);
    }

    #[test]
    fn test_force_reindexes_unchanged_files() {
        let persisted = HashMap::from([("a.md".to_string(), 100)]);
        let plan = reconcile(&[file("a.md", 100)], &persisted, true);
        assert_eq!(plan.to_index.len(), 1);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_mixed_plan() {
        let persisted = HashMap::from([
            ("same.md".to_string(), 1),
            ("changed.md".to_string(), 1),
            ("gone.md".to_string(), 1),
        ]);
        let current = [file("same.md", 1), file("changed.md", 2), file("new.md", 3)];
        let plan = reconcile(&current, &persisted, false);

        let to_index: Vec<&str> = plan
            .to_index
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        assert_eq!(to_index, vec!["changed.md", "new.md"]);
        assert_eq!(plan.to_delete, vec!["gone.md".to_string()]);
    }
}
