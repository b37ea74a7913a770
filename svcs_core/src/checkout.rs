//! Restoring the working directory to a recorded commit.

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::repo::Repository;
use std::fs;
use tracing::{debug, info};

/// Summary of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReport {
    /// Commit that was checked out.
    pub commit: Digest,
    /// Number of files written.
    pub files_restored: usize,
}

impl Repository {
    /// Overwrite the working-directory files recorded in commit `id`.
    ///
    /// Each recorded path is removed and rewritten from the content store,
    /// creating parent directories as needed. Files not in the snapshot are
    /// left alone, and neither head nor the index move.
    ///
    /// There is no rollback: if writing one file fails, files already
    /// written stay changed and the error is returned.
    pub fn checkout(&self, id: &str) -> Result<CheckoutReport> {
        let commit = self.resolve(id)?;

        for entry in commit.entries() {
            if !self.store().contains(&entry.digest) {
                return Err(Error::corrupt(
                    self.store().object_path(&entry.digest),
                    format!(
                        "commit {} references missing object {} for {}",
                        commit.id(),
                        entry.digest,
                        entry.path
                    ),
                ));
            }
        }

        for entry in commit.entries() {
            let data = self.store().get(&entry.digest)?;
            let target = self.workdir().join(&entry.path);

            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target)?;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &data)?;

            debug!(path = %entry.path, digest = %entry.digest, "restored file");
        }

        info!(commit = %commit.id(), files = commit.entries().len(), "checked out commit");
        Ok(CheckoutReport {
            commit: commit.id(),
            files_restored: commit.entries().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::repo::{CommitOutcome, Repository};
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn commit_id(outcome: CommitOutcome) -> String {
        match outcome {
            CommitOutcome::Created(commit) => commit.id().to_hex(),
            CommitOutcome::NothingToCommit => panic!("expected a commit"),
        }
    }

    #[test]
    fn test_checkout_restores_content() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let mut repo = Repository::prepare(temp_dir.path()).unwrap();
        repo.add("a.txt").unwrap();
        let first = commit_id(repo.commit_as("alice", "first", Utc::now()).unwrap());

        fs::write(&file, b"world").unwrap();
        repo.commit_as("alice", "second", Utc::now()).unwrap();

        let report = repo.checkout(&first).unwrap();
        assert_eq!(report.files_restored, 1);
        assert_eq!(fs::read(&file).unwrap(), b"hello");
        assert_eq!(repo.commit_count(), 2);
    }

    #[test]
    fn test_checkout_recreates_deleted_nested_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("src/bin")).unwrap();
        fs::write(temp_dir.path().join("src/bin/tool.rs"), b"fn main() {}").unwrap();

        let mut repo = Repository::prepare(temp_dir.path()).unwrap();
        repo.add("src/bin/tool.rs").unwrap();
        let id = commit_id(repo.commit_as("alice", "tool", Utc::now()).unwrap());

        fs::remove_dir_all(temp_dir.path().join("src")).unwrap();
        repo.checkout(&id).unwrap();

        assert_eq!(
            fs::read(temp_dir.path().join("src/bin/tool.rs")).unwrap(),
            b"fn main() {}"
        );
    }

    #[test]
    fn test_checkout_leaves_untracked_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"hello").unwrap();

        let mut repo = Repository::prepare(temp_dir.path()).unwrap();
        repo.add("a.txt").unwrap();
        let id = commit_id(repo.commit_as("alice", "first", Utc::now()).unwrap());

        fs::write(temp_dir.path().join("notes.txt"), b"scratch").unwrap();
        repo.checkout(&id).unwrap();

        assert_eq!(fs::read(temp_dir.path().join("notes.txt")).unwrap(), b"scratch");
    }

    #[test]
    fn test_checkout_unknown_commit() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::prepare(temp_dir.path()).unwrap();

        assert!(matches!(
            repo.checkout("not-a-commit"),
            Err(Error::CommitNotFound { .. })
        ));
    }

    #[test]
    fn test_checkout_with_missing_object_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let mut repo = Repository::prepare(temp_dir.path()).unwrap();
        repo.add("a.txt").unwrap();
        let id = commit_id(repo.commit_as("alice", "first", Utc::now()).unwrap());

        let digest = repo.head().unwrap().entries()[0].digest;
        fs::remove_file(repo.store().object_path(&digest)).unwrap();
        fs::write(&file, b"local edit").unwrap();

        assert!(matches!(
            repo.checkout(&id),
            Err(Error::CorruptRepository { .. })
        ));
        assert_eq!(fs::read(&file).unwrap(), b"local edit");
    }
}
