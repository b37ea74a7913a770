//! Commits: immutable, hash-chained snapshots of the staged files.

use crate::digest::Digest;
use chrono::{DateTime, SubsecRound, Utc};

/// A tracked path paired with the blob holding its content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileEntry {
    /// Path relative to the working directory, `/`-separated.
    pub path: String,
    /// Digest of the file content in the content store.
    pub digest: Digest,
}

impl FileEntry {
    /// Create a new file entry.
    pub fn new(path: impl Into<String>, digest: Digest) -> Self {
        Self {
            path: path.into(),
            digest,
        }
    }
}

/// A commit record.
///
/// The id is the digest of the canonical encoding of every other field, so
/// a commit cannot change without changing its id, and each commit pins
/// its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    id: Digest,
    parent: Option<Digest>,
    author: String,
    message: String,
    timestamp: DateTime<Utc>,
    entries: Vec<FileEntry>,
}

impl Commit {
    /// Build a commit and derive its id.
    ///
    /// Entries are sorted by path and the timestamp is truncated to
    /// millisecond precision, which is what the commit log stores.
    pub fn new(
        parent: Option<Digest>,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        mut entries: Vec<FileEntry>,
    ) -> Self {
        entries.sort();
        let mut commit = Self {
            id: Digest::from_bytes([0u8; 32]),
            parent,
            author: author.into(),
            message: message.into(),
            timestamp: timestamp.trunc_subsecs(3),
            entries,
        };
        commit.id = Digest::of(&commit.encode_body());
        commit
    }

    /// Commit id.
    pub fn id(&self) -> Digest {
        self.id
    }

    /// Parent commit id, `None` for the root commit.
    pub fn parent(&self) -> Option<Digest> {
        self.parent
    }

    /// Author name.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Commit message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Snapshot entries, sorted by path.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Digest recorded for `path`, if the snapshot contains it.
    pub fn digest_for(&self, path: &str) -> Option<Digest> {
        self.entries
            .binary_search_by(|entry| entry.path.as_str().cmp(path))
            .ok()
            .map(|i| self.entries[i].digest)
    }

    /// Canonical encoding of everything except the id.
    ///
    /// ```text
    /// parent <id>|-
    /// timestamp <unix millis>
    /// author <len>
    /// <author bytes>
    /// message <len>
    /// <message bytes>
    /// entries <count>
    /// <digest> <len>
    /// <path bytes>
    /// ```
    ///
    /// Free-form text is length-prefixed, so newlines inside a message
    /// cannot be mistaken for record structure.
    pub(crate) fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match &self.parent {
            Some(parent) => buf.extend_from_slice(format!("parent {}\n", parent).as_bytes()),
            None => buf.extend_from_slice(b"parent -\n"),
        }
        buf.extend_from_slice(format!("timestamp {}\n", self.timestamp.timestamp_millis()).as_bytes());
        push_text(&mut buf, "author", &self.author);
        push_text(&mut buf, "message", &self.message);

        buf.extend_from_slice(format!("entries {}\n", self.entries.len()).as_bytes());
        for entry in &self.entries {
            buf.extend_from_slice(format!("{} {}\n", entry.digest, entry.path.len()).as_bytes());
            buf.extend_from_slice(entry.path.as_bytes());
            buf.push(b'\n');
        }

        buf
    }
}

fn push_text(buf: &mut Vec<u8>, keyword: &str, text: &str) {
    buf.extend_from_slice(format!("{} {}\n", keyword, text.len()).as_bytes());
    buf.extend_from_slice(text.as_bytes());
    buf.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_id_is_deterministic() {
        let entries = vec![FileEntry::new("a.txt", Digest::of(b"hello"))];
        let c1 = Commit::new(None, "alice", "first", ts(1_700_000_000), entries.clone());
        let c2 = Commit::new(None, "alice", "first", ts(1_700_000_000), entries);
        assert_eq!(c1.id(), c2.id());
    }

    #[test]
    fn test_id_depends_on_every_field() {
        let entries = vec![FileEntry::new("a.txt", Digest::of(b"hello"))];
        let base = Commit::new(None, "alice", "first", ts(1), entries.clone());

        let variants = [
            Commit::new(Some(base.id()), "alice", "first", ts(1), entries.clone()),
            Commit::new(None, "bob", "first", ts(1), entries.clone()),
            Commit::new(None, "alice", "second", ts(1), entries.clone()),
            Commit::new(None, "alice", "first", ts(2), entries.clone()),
            Commit::new(
                None,
                "alice",
                "first",
                ts(1),
                vec![FileEntry::new("a.txt", Digest::of(b"world"))],
            ),
        ];

        for variant in &variants {
            assert_ne!(variant.id(), base.id());
        }
    }

    #[test]
    fn test_entries_sorted_and_lookup() {
        let commit = Commit::new(
            None,
            "alice",
            "msg",
            ts(1),
            vec![
                FileEntry::new("z.txt", Digest::of(b"z")),
                FileEntry::new("a.txt", Digest::of(b"a")),
                FileEntry::new("dir/m.txt", Digest::of(b"m")),
            ],
        );

        let paths: Vec<_> = commit.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "dir/m.txt", "z.txt"]);
        assert_eq!(commit.digest_for("dir/m.txt"), Some(Digest::of(b"m")));
        assert_eq!(commit.digest_for("missing.txt"), None);
    }

    #[test]
    fn test_message_with_newlines_is_length_prefixed() {
        let commit = Commit::new(None, "alice", "line one\n\nline three", ts(1), vec![]);
        let body = String::from_utf8(commit.encode_body()).unwrap();
        assert!(body.contains("message 20\nline one\n\nline three\n"));
    }
}
