//! The staging index: paths marked for inclusion in the next commit.

use crate::atomic::write_atomic;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Durable set of staged working-directory paths.
///
/// Stored as one path per line, sorted. The whole file is rewritten
/// atomically on every change.
#[derive(Debug)]
pub struct Index {
    file: PathBuf,
    workdir: PathBuf,
    paths: BTreeSet<String>,
}

impl Index {
    /// Load the index file, treating a missing file as an empty index.
    pub fn load(file: &Path, workdir: &Path) -> Result<Self> {
        let mut paths = BTreeSet::new();

        if file.exists() {
            let content = fs::read_to_string(file)?;
            for (lineno, line) in content.lines().enumerate() {
                if line.is_empty() {
                    continue;
                }

                match normalize_path(line) {
                    Ok(path) if path == line => {
                        paths.insert(path);
                    }
                    _ => {
                        return Err(Error::corrupt(
                            file,
                            format!("line {}: invalid staged path {:?}", lineno + 1, line),
                        ));
                    }
                }
            }
        }

        Ok(Self {
            file: file.to_path_buf(),
            workdir: workdir.to_path_buf(),
            paths,
        })
    }

    /// Stage a path.
    ///
    /// The path must name an existing regular file relative to the working
    /// directory. Returns `true` if the path was not staged before.
    pub fn add(&mut self, raw: &str) -> Result<bool> {
        let path = normalize_path(raw)?;

        let meta = fs::metadata(self.workdir.join(&path)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => {
                Error::file_not_found(raw)
            }
            _ => e.into(),
        })?;
        if !meta.is_file() {
            return Err(Error::file_not_found(raw));
        }

        if !self.paths.insert(path.clone()) {
            return Ok(false);
        }

        if let Err(e) = self.persist() {
            self.paths.remove(&path);
            return Err(e);
        }

        debug!(path = %path, "staged path");
        Ok(true)
    }

    /// Staged paths in lexicographic order.
    pub fn list(&self) -> Vec<&str> {
        self.paths.iter().map(String::as_str).collect()
    }

    /// Check whether a path is staged.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of staged paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let mut content = String::new();
        for path in &self.paths {
            content.push_str(path);
            content.push('\n');
        }
        write_atomic(&self.file, content.as_bytes())
    }
}

/// Turn a user-supplied path into the canonical relative form stored in the
/// index and in commits: `/`-separated, no `.` or `..` components.
pub fn normalize_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_path(raw, "path is empty"));
    }
    if trimmed.contains(['\n', '\r', '\0']) {
        return Err(Error::invalid_path(
            raw,
            "path cannot contain line breaks or null bytes",
        ));
    }

    let mut parts = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| Error::invalid_path(raw, "path is not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::invalid_path(
                    raw,
                    "path must not leave the working directory",
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::invalid_path(
                    raw,
                    "path must be relative to the working directory",
                ));
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::invalid_path(raw, "path names no file"));
    }

    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index_in(temp_dir: &TempDir) -> Index {
        Index::load(&temp_dir.path().join("vcs/index"), temp_dir.path()).unwrap()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a.txt").unwrap(), "a.txt");
        assert_eq!(normalize_path("./dir/b.txt").unwrap(), "dir/b.txt");
        assert_eq!(normalize_path(" a.txt ").unwrap(), "a.txt");
        assert_eq!(normalize_path("dir//c.txt").unwrap(), "dir/c.txt");

        assert!(normalize_path("").is_err());
        assert!(normalize_path(".").is_err());
        assert!(normalize_path("../escape.txt").is_err());
        assert!(normalize_path("/etc/passwd").is_err());
        assert!(normalize_path("bad\nname").is_err());
    }

    #[test]
    fn test_add_and_list_sorted() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let mut index = index_in(&temp_dir);
        assert!(index.add("b.txt").unwrap());
        assert!(index.add("a.txt").unwrap());

        assert_eq!(index.list(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let mut index = index_in(&temp_dir);
        assert!(index.add("a.txt").unwrap());
        assert!(!index.add("./a.txt").unwrap());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_add_missing_file_leaves_index_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = index_in(&temp_dir);

        let result = index.add("missing.txt");
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
        assert!(index.is_empty());
        assert!(!temp_dir.path().join("vcs/index").exists());
    }

    #[test]
    fn test_add_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("dir")).unwrap();

        let mut index = index_in(&temp_dir);
        assert!(matches!(index.add("dir"), Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_add_below_regular_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let mut index = index_in(&temp_dir);
        assert!(matches!(
            index.add("a.txt/inner"),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_add_unreadable_dir_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("a.txt"), b"a").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions
        let readable = fs::metadata(locked.join("a.txt")).is_ok();
        let mut index = index_in(&temp_dir);
        let result = index.add("locked/a.txt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(matches!(result, Err(Error::Io { .. })));
            assert!(index.is_empty());
        }
    }

    #[test]
    fn test_index_persists_across_loads() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/main.rs"), b"fn main() {}").unwrap();

        let mut index = index_in(&temp_dir);
        index.add("src/main.rs").unwrap();

        let reloaded = index_in(&temp_dir);
        assert!(reloaded.contains("src/main.rs"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_load_rejects_malformed_line() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("index");
        fs::write(&file, "a.txt\n../../etc/passwd\n").unwrap();

        assert!(matches!(
            Index::load(&file, temp_dir.path()),
            Err(Error::CorruptRepository { .. })
        ));
    }
}
