//! Change detection between the staged files and the head commit.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::store::ContentStore;
use std::path::Path;

/// Staged paths whose current content differs from the head commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: Vec<String>,
}

impl ChangeSet {
    /// Returns `true` if at least one staged path changed.
    ///
    /// A dirty change set means the whole staged snapshot gets committed,
    /// not only the changed paths.
    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Changed paths, sorted.
    pub fn changed(&self) -> &[String] {
        &self.changed
    }
}

/// Compare every staged file against `head`.
///
/// Content is digested without being stored. A staged path missing from
/// `head` counts as changed; paths in `head` that are no longer staged are
/// ignored. A staged file that has disappeared from the working directory is
/// an error.
pub fn detect_changes(
    store: &ContentStore,
    workdir: &Path,
    index: &Index,
    head: Option<&Commit>,
) -> Result<ChangeSet> {
    let mut changed = Vec::new();

    for path in index.list() {
        let full_path = workdir.join(path);
        if !full_path.is_file() {
            return Err(Error::file_not_found(path));
        }

        let current = store.digest_file(&full_path)?;
        let recorded = head.and_then(|commit| commit.digest_for(path));
        if recorded != Some(current) {
            changed.push(path.to_string());
        }
    }

    Ok(ChangeSet { changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::FileEntry;
    use crate::digest::{Algorithm, Digest};
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        store: ContentStore,
        index: Index,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let store = ContentStore::open(temp_dir.path().join("vcs"), Algorithm::Blake3).unwrap();
            let index = Index::load(&temp_dir.path().join("vcs/index"), temp_dir.path()).unwrap();
            Self {
                temp_dir,
                store,
                index,
            }
        }

        fn write(&self, path: &str, content: &[u8]) {
            fs::write(self.temp_dir.path().join(path), content).unwrap();
        }

        fn detect(&self, head: Option<&Commit>) -> Result<ChangeSet> {
            detect_changes(&self.store, self.temp_dir.path(), &self.index, head)
        }
    }

    fn head_with(entries: &[(&str, &str)]) -> Commit {
        Commit::new(
            None,
            "alice",
            "head",
            Utc::now(),
            entries
                .iter()
                .map(|(path, content)| FileEntry::new(*path, Digest::of(content.as_bytes())))
                .collect(),
        )
    }

    #[test]
    fn test_everything_changed_without_head() {
        let mut fx = Fixture::new();
        fx.write("a.txt", b"hello");
        fx.index.add("a.txt").unwrap();

        let changes = fx.detect(None).unwrap();
        assert!(changes.is_dirty());
        assert_eq!(changes.changed(), ["a.txt".to_string()]);
    }

    #[test]
    fn test_unchanged_content_is_clean() {
        let mut fx = Fixture::new();
        fx.write("a.txt", b"hello");
        fx.index.add("a.txt").unwrap();

        let head = head_with(&[("a.txt", "hello")]);
        assert!(!fx.detect(Some(&head)).unwrap().is_dirty());
    }

    #[test]
    fn test_modified_and_new_paths_reported() {
        let mut fx = Fixture::new();
        fx.write("a.txt", b"world");
        fx.write("b.txt", b"same");
        fx.write("c.txt", b"new");
        for path in ["a.txt", "b.txt", "c.txt"] {
            fx.index.add(path).unwrap();
        }

        let head = head_with(&[("a.txt", "hello"), ("b.txt", "same")]);
        let changes = fx.detect(Some(&head)).unwrap();
        assert_eq!(changes.changed(), ["a.txt".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn test_paths_only_in_head_are_ignored() {
        let mut fx = Fixture::new();
        fx.write("a.txt", b"hello");
        fx.index.add("a.txt").unwrap();

        let head = head_with(&[("a.txt", "hello"), ("gone.txt", "old")]);
        assert!(!fx.detect(Some(&head)).unwrap().is_dirty());
    }

    #[test]
    fn test_detection_does_not_store() {
        let mut fx = Fixture::new();
        fx.write("a.txt", b"unstored");
        fx.index.add("a.txt").unwrap();

        fx.detect(None).unwrap();
        assert!(!fx.store.contains(&Digest::of(b"unstored")));
    }

    #[test]
    fn test_deleted_staged_file_is_error() {
        let mut fx = Fixture::new();
        fx.write("a.txt", b"hello");
        fx.index.add("a.txt").unwrap();
        fs::remove_file(fx.temp_dir.path().join("a.txt")).unwrap();

        assert!(matches!(fx.detect(None), Err(Error::FileNotFound { .. })));
    }
}
