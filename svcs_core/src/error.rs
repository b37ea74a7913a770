//! Error types for svcs_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using svcs_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A working-directory file is missing or is not a regular file.
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Object not found in the content store.
    #[error("Object not found: {digest}")]
    ObjectNotFound { digest: String },

    /// No commit matches the given id.
    #[error("Commit not found: {id}")]
    CommitNotFound { id: String },

    /// Commit message was empty or whitespace only.
    #[error("Commit message cannot be empty")]
    EmptyMessage,

    /// No username has been configured yet.
    #[error("Unknown identity: set a username first")]
    UnknownIdentity,

    /// Path cannot be tracked.
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Username cannot be stored.
    #[error("Invalid username: {reason}")]
    InvalidUsername { reason: String },

    /// Invalid digest format or encoding.
    #[error("Invalid digest: {reason}")]
    InvalidDigest { reason: String },

    /// Persisted state is truncated, malformed or inconsistent.
    #[error("Corrupt repository at {path}: {reason}")]
    CorruptRepository { path: PathBuf, reason: String },

    /// Repository is missing or not initialized.
    #[error("Invalid repository at {path}: {reason}")]
    InvalidRepository { path: PathBuf, reason: String },

    /// Unsupported hash algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Unsupported repository format version.
    #[error("Unsupported repository version: {version}")]
    UnsupportedVersion { version: String },

    /// Compression or decompression failed.
    #[error("Compression error: {reason}")]
    Compression { reason: String },
}

impl Error {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create an ObjectNotFound error.
    pub fn object_not_found(digest: impl Into<String>) -> Self {
        Error::ObjectNotFound {
            digest: digest.into(),
        }
    }

    /// Create a CommitNotFound error.
    pub fn commit_not_found(id: impl Into<String>) -> Self {
        Error::CommitNotFound { id: id.into() }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidUsername error.
    pub fn invalid_username(reason: impl Into<String>) -> Self {
        Error::InvalidUsername {
            reason: reason.into(),
        }
    }

    /// Create an InvalidDigest error.
    pub fn invalid_digest(reason: impl Into<String>) -> Self {
        Error::InvalidDigest {
            reason: reason.into(),
        }
    }

    /// Create a CorruptRepository error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRepository error.
    pub fn invalid_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create an UnsupportedVersion error.
    pub fn unsupported_version(version: impl Into<String>) -> Self {
        Error::UnsupportedVersion {
            version: version.into(),
        }
    }

    /// Create a Compression error.
    pub fn compression(reason: impl Into<String>) -> Self {
        Error::Compression {
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by user input rather than repository state.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound { .. }
                | Error::CommitNotFound { .. }
                | Error::EmptyMessage
                | Error::UnknownIdentity
                | Error::InvalidPath { .. }
                | Error::InvalidUsername { .. }
                | Error::InvalidDigest { .. }
        )
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_classified() {
        assert!(Error::file_not_found("a.txt").is_user_error());
        assert!(Error::commit_not_found("abc").is_user_error());
        assert!(Error::EmptyMessage.is_user_error());
        assert!(Error::UnknownIdentity.is_user_error());

        assert!(!Error::corrupt("/tmp/log", "truncated").is_user_error());
        assert!(!Error::object_not_found("abc").is_user_error());
        assert!(!Error::from(std::io::Error::other("disk")).is_user_error());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::corrupt("vcs/log", "record 3 truncated");
        assert_eq!(
            err.to_string(),
            "Corrupt repository at vcs/log: record 3 truncated"
        );
        assert_eq!(
            Error::file_not_found("missing.txt").to_string(),
            "File not found: missing.txt"
        );
    }
}
