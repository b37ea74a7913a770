//! The repository handle tying the store, index, log and config together.

use crate::changes::{ChangeSet, detect_changes};
use crate::commit::{Commit, FileEntry};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{Index, normalize_path};
use crate::log::CommitLog;
use crate::store::ContentStore;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default repository directory name inside the working directory.
pub const DEFAULT_DIR: &str = "vcs";

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was recorded and became head.
    Created(Commit),
    /// The staged files match head (or nothing is staged); history unchanged.
    NothingToCommit,
}

/// A repository rooted in a working directory.
///
/// Every operation flushes its changes to disk before returning; there is no
/// in-memory-only state.
#[derive(Debug)]
pub struct Repository {
    workdir: PathBuf,
    root: PathBuf,
    config: Config,
    store: ContentStore,
    index: Index,
    log: CommitLog,
}

impl Repository {
    /// Prepare the repository at `<workdir>/vcs`, creating it if needed.
    pub fn prepare<P: AsRef<Path>>(workdir: P) -> Result<Self> {
        let workdir = workdir.as_ref();
        Self::prepare_at(workdir, workdir.join(DEFAULT_DIR))
    }

    /// Prepare a repository stored at `root` for the working directory
    /// `workdir`.
    ///
    /// Creates the layout and a default config if missing, then loads
    /// everything. Running it on an existing repository changes nothing.
    pub fn prepare_at<P: AsRef<Path>, Q: AsRef<Path>>(workdir: P, root: Q) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Config::load_or_create(&root.join("config"))?;
        Self::open_at(workdir, root)
    }

    /// Open an existing repository at `<workdir>/vcs`.
    pub fn open<P: AsRef<Path>>(workdir: P) -> Result<Self> {
        let workdir = workdir.as_ref();
        Self::open_at(workdir, workdir.join(DEFAULT_DIR))
    }

    /// Open an existing repository stored at `root`.
    pub fn open_at<P: AsRef<Path>, Q: AsRef<Path>>(workdir: P, root: Q) -> Result<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(Error::invalid_repository(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_repository(&root, "config file not found"));
        }

        let config = Config::load(&config_path)?;
        let store = ContentStore::open(&root, config.algorithm())?;
        let index = Index::load(&root.join("index"), &workdir)?;
        let log = CommitLog::load(&root.join("log"))?;

        debug!(root = %root.display(), staged = index.len(), commits = log.len(), "opened repository");
        Ok(Self {
            workdir,
            root,
            config,
            store,
            index,
            log,
        })
    }

    /// Working directory the tracked paths are relative to.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Repository directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The content store.
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Configured username, if any.
    pub fn username(&self) -> Option<&str> {
        self.config.username()
    }

    /// Set and persist the username used as commit author.
    pub fn set_username(&mut self, name: &str) -> Result<()> {
        self.config.set_username(name)
    }

    /// Stage a working-directory file.
    ///
    /// Returns `true` if the path was not staged before.
    pub fn add(&mut self, path: &str) -> Result<bool> {
        let normalized = normalize_path(path)?;
        if self.workdir.join(&normalized).starts_with(&self.root) {
            return Err(Error::invalid_path(
                path,
                "path is inside the repository directory",
            ));
        }
        self.index.add(&normalized)
    }

    /// Staged paths in lexicographic order.
    pub fn staged(&self) -> Vec<&str> {
        self.index.list()
    }

    /// Check whether `path` is staged.
    pub fn is_staged(&self, path: &str) -> bool {
        normalize_path(path).is_ok_and(|normalized| self.index.contains(&normalized))
    }

    /// Staged paths whose content differs from head.
    pub fn changes(&self) -> Result<ChangeSet> {
        detect_changes(&self.store, &self.workdir, &self.index, self.log.head())
    }

    /// Commit the staged files as the configured user.
    pub fn commit(&mut self, message: &str) -> Result<CommitOutcome> {
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        let author = self
            .config
            .username()
            .ok_or(Error::UnknownIdentity)?
            .to_string();
        self.commit_as(&author, message, Utc::now())
    }

    /// Commit the staged files with an explicit author and timestamp.
    ///
    /// When any staged file changed since head, every staged file is stored
    /// and recorded: a commit is a full snapshot of the index.
    pub fn commit_as(
        &mut self,
        author: &str,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        if author.trim().is_empty() {
            return Err(Error::UnknownIdentity);
        }
        if self.index.is_empty() {
            debug!("nothing staged");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let changes = self.changes()?;
        if !self.log.is_empty() && !changes.is_dirty() {
            debug!("staged files match head");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let mut entries = Vec::with_capacity(self.index.len());
        for path in self.index.list() {
            let data = fs::read(self.workdir.join(path)).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::file_not_found(path),
                _ => e.into(),
            })?;
            let digest = self.store.put(&data)?;
            entries.push(FileEntry::new(path, digest));
        }

        let parent = self.log.head().map(Commit::id);
        let commit = Commit::new(parent, author, message, timestamp, entries);
        self.log.append(commit.clone())?;

        info!(
            commit = %commit.id(),
            files = commit.entries().len(),
            changed = changes.changed().len(),
            "created commit"
        );
        Ok(CommitOutcome::Created(commit))
    }

    /// Commits, newest first.
    pub fn log(&self) -> impl Iterator<Item = &Commit> {
        self.log.newest_first()
    }

    /// Number of commits.
    pub fn commit_count(&self) -> usize {
        self.log.len()
    }

    /// Most recent commit.
    pub fn head(&self) -> Option<&Commit> {
        self.log.head()
    }

    /// Look up a commit by its full hex id.
    pub fn resolve(&self, id: &str) -> Result<&Commit> {
        self.log.resolve(id)
    }

    /// Check that every commit only references objects present in the store.
    pub fn verify(&self) -> Result<()> {
        self.log.verify(&self.store)
    }
}
