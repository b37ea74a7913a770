//! The commit log: the persisted, linear commit history.
//!
//! File format:
//!
//! ```text
//! svcs-log 1
//! commit <id>
//! <commit body, see Commit::encode_body>
//! end
//! commit <id>
//! ...
//! ```
//!
//! Records are kept oldest first. On load every record is re-parsed, its
//! id recomputed and its parent checked against the previous record, so a
//! truncated, edited or reordered log is reported as corruption.

use crate::atomic::write_atomic;
use crate::commit::{Commit, FileEntry};
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::index::normalize_path;
use crate::store::ContentStore;
use chrono::DateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// First line of every log file.
const LOG_HEADER: &str = "svcs-log 1";

/// Ordered commit history backed by a single log file.
#[derive(Debug)]
pub struct CommitLog {
    file: PathBuf,
    commits: Vec<Commit>,
}

impl CommitLog {
    /// Load the log file, treating a missing or empty file as empty history.
    pub fn load(file: &Path) -> Result<Self> {
        let commits = if file.exists() {
            let data = fs::read(file)?;
            decode_log(&data).map_err(|reason| Error::corrupt(file, reason))?
        } else {
            Vec::new()
        };

        debug!(file = %file.display(), commits = commits.len(), "loaded commit log");
        Ok(Self {
            file: file.to_path_buf(),
            commits,
        })
    }

    /// Most recent commit.
    pub fn head(&self) -> Option<&Commit> {
        self.commits.last()
    }

    /// Commits, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().rev()
    }

    /// Number of commits.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Returns `true` if there are no commits.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Look up a commit by its full id.
    pub fn get(&self, id: &Digest) -> Option<&Commit> {
        self.commits.iter().find(|commit| commit.id() == *id)
    }

    /// Look up a commit by its hex id. Only exact matches resolve.
    pub fn resolve(&self, id: &str) -> Result<&Commit> {
        Digest::from_hex(id.trim())
            .ok()
            .and_then(|digest| self.get(&digest))
            .ok_or_else(|| Error::commit_not_found(id))
    }

    /// Append a commit and rewrite the log atomically.
    ///
    /// The commit's parent must be the current head.
    pub fn append(&mut self, commit: Commit) -> Result<()> {
        let head = self.head().map(Commit::id);
        if commit.parent() != head {
            return Err(Error::corrupt(
                &self.file,
                format!(
                    "commit {} does not extend head {}",
                    commit.id(),
                    head.map_or_else(|| "-".to_string(), |id| id.to_hex())
                ),
            ));
        }

        let mut data = encode_log(&self.commits);
        data.extend_from_slice(&encode_record(&commit));
        write_atomic(&self.file, &data)?;

        self.commits.push(commit);
        Ok(())
    }

    /// Check that every digest referenced by every commit exists in `store`.
    pub fn verify(&self, store: &ContentStore) -> Result<()> {
        for commit in &self.commits {
            for entry in commit.entries() {
                if !store.contains(&entry.digest) {
                    return Err(Error::corrupt(
                        store.object_path(&entry.digest),
                        format!(
                            "commit {} references missing object {} for {}",
                            commit.id(),
                            entry.digest,
                            entry.path
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn encode_log(commits: &[Commit]) -> Vec<u8> {
    let mut data = format!("{}\n", LOG_HEADER).into_bytes();
    for commit in commits {
        data.extend_from_slice(&encode_record(commit));
    }
    data
}

fn encode_record(commit: &Commit) -> Vec<u8> {
    let mut buf = format!("commit {}\n", commit.id()).into_bytes();
    buf.extend_from_slice(&commit.encode_body());
    buf.extend_from_slice(b"end\n");
    buf
}

fn decode_log(data: &[u8]) -> std::result::Result<Vec<Commit>, String> {
    let mut commits: Vec<Commit> = Vec::new();
    if data.is_empty() {
        return Ok(commits);
    }

    let mut reader = RecordReader::new(data);
    let header = reader.line()?;
    if header != LOG_HEADER {
        return Err(format!("unrecognized log header {:?}", header));
    }

    while !reader.at_end() {
        let record = commits.len() + 1;
        let commit = decode_record(&mut reader).map_err(|e| format!("record {}: {}", record, e))?;

        let expected_parent = commits.last().map(Commit::id);
        if commit.parent() != expected_parent {
            return Err(format!(
                "record {}: commit {} has parent {:?}, expected {:?}",
                record,
                commit.id(),
                commit.parent(),
                expected_parent
            ));
        }
        commits.push(commit);
    }

    Ok(commits)
}

fn decode_record(reader: &mut RecordReader<'_>) -> std::result::Result<Commit, String> {
    let id = parse_digest(reader.field("commit")?)?;

    let parent = match reader.field("parent")? {
        "-" => None,
        hex => Some(parse_digest(hex)?),
    };

    let millis = parse_number::<i64>(reader.field("timestamp")?)?;
    let timestamp = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| format!("timestamp out of range: {}", millis))?;

    let author = reader.text("author")?;
    let message = reader.text("message")?;

    let count = parse_number::<usize>(reader.field("entries")?)?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let line = reader.line()?;
        let (digest, len) = line
            .split_once(' ')
            .ok_or_else(|| format!("malformed entry line {:?}", line))?;
        let digest = parse_digest(digest)?;
        let path = reader.sized(parse_number(len)?)?;
        if normalize_path(&path).ok().as_deref() != Some(path.as_str()) {
            return Err(format!("invalid entry path {:?}", path));
        }
        entries.push(FileEntry::new(path, digest));
    }

    let end = reader.line()?;
    if end != "end" {
        return Err(format!("expected end of record, got {:?}", end));
    }

    let commit = Commit::new(parent, author, message, timestamp, entries);
    if commit.id() != id {
        return Err(format!(
            "id mismatch: recorded {}, computed {}",
            id,
            commit.id()
        ));
    }
    Ok(commit)
}

fn parse_digest(hex: &str) -> std::result::Result<Digest, String> {
    Digest::from_hex(hex).map_err(|e| e.to_string())
}

/// Parse a decimal number as the encoder writes it: ASCII digits with at
/// most a leading `-`.
fn parse_number<T: std::str::FromStr>(s: &str) -> std::result::Result<T, String> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid number {:?}", s));
    }
    s.parse::<T>().map_err(|_| format!("invalid number {:?}", s))
}

/// Cursor over the bytes of a log file.
struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Next newline-terminated line, without the newline.
    fn line(&mut self) -> std::result::Result<&'a str, String> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| format!("truncated at byte {}", self.pos))?;
        let line = std::str::from_utf8(&rest[..len])
            .map_err(|e| format!("invalid UTF-8 at byte {}: {}", self.pos, e))?;
        self.pos += len + 1;
        Ok(line)
    }

    /// A `<keyword> <value>` line; returns the value.
    fn field(&mut self, keyword: &str) -> std::result::Result<&'a str, String> {
        let line = self.line()?;
        line.strip_prefix(keyword)
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or_else(|| format!("expected {:?} line, got {:?}", keyword, line))
    }

    /// A `<keyword> <len>` line followed by `len` bytes of text and a newline.
    fn text(&mut self, keyword: &str) -> std::result::Result<String, String> {
        let len = parse_number(self.field(keyword)?)?;
        self.sized(len)
    }

    /// Exactly `len` bytes of UTF-8 followed by a newline.
    fn sized(&mut self, len: usize) -> std::result::Result<String, String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end < self.data.len())
            .ok_or_else(|| format!("truncated at byte {}", self.pos))?;
        if self.data[end] != b'\n' {
            return Err(format!("missing terminator at byte {}", end));
        }

        let text = std::str::from_utf8(&self.data[self.pos..end])
            .map_err(|e| format!("invalid UTF-8 at byte {}: {}", self.pos, e))?
            .to_string();
        self.pos = end + 1;
        Ok(text)
    }
}
