//! Output formatting for CLI commands.
//!
//! Every command reports through [`OutputWriter`], which prints either the
//! human-readable text or a JSON document carrying the same data.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use svcs_core::Commit;

/// Result code for a successful command.
pub const RESULT_OK: u8 = 0;

/// Result code for a rejected user request (bad argument, unknown commit, ...).
pub const RESULT_USER_ERROR: u8 = 1;

/// Result code for an unexpected failure (I/O error, corrupt repository).
pub const RESULT_FAILURE: u8 = 2;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `text_fn` closure is only called in text mode.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Report a rejected request and return its result code.
    pub fn reject(&self, message: impl Into<String>) -> Result<u8> {
        let out = MessageOutput {
            success: false,
            result_code: RESULT_USER_ERROR,
            message: message.into(),
        };
        self.write(&out, || format!("{}\n", out.message))?;
        Ok(RESULT_USER_ERROR)
    }

    /// Write an unexpected error to stderr.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// A rejected request with the message shown to the user.
#[derive(Debug, Serialize)]
pub struct MessageOutput {
    pub success: bool,
    pub result_code: u8,
    pub message: String,
}

/// One row of the command table.
#[derive(Debug, Clone, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
}

/// Output when no command is given.
#[derive(Debug, Serialize)]
pub struct CommandsOutput {
    pub success: bool,
    pub result_code: u8,
    pub commands: Vec<CommandInfo>,
}

/// Output for `config`.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub success: bool,
    pub result_code: u8,
    pub username: Option<String>,
}

/// Output for `add` without a path.
#[derive(Debug, Serialize)]
pub struct TrackedOutput {
    pub success: bool,
    pub result_code: u8,
    pub tracked: Vec<String>,
}

/// Output for `add <path>`.
#[derive(Debug, Serialize)]
pub struct AddOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub newly_tracked: bool,
}

/// File recorded in a commit.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub path: String,
    pub digest: String,
}

/// Commit information.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<EntryInfo>,
}

impl From<&Commit> for CommitInfo {
    fn from(commit: &Commit) -> Self {
        Self {
            id: commit.id().to_hex(),
            parent: commit.parent().map(|id| id.to_hex()),
            author: commit.author().to_string(),
            message: commit.message().to_string(),
            timestamp: commit.timestamp(),
            entries: commit
                .entries()
                .iter()
                .map(|entry| EntryInfo {
                    path: entry.path.clone(),
                    digest: entry.digest.to_hex(),
                })
                .collect(),
        }
    }
}

/// Output for `log`.
#[derive(Debug, Serialize)]
pub struct LogOutput {
    pub success: bool,
    pub result_code: u8,
    pub commits: Vec<CommitInfo>,
}

/// Output for `commit <message>`.
#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub success: bool,
    pub result_code: u8,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
}

/// Output for `checkout <id>`.
#[derive(Debug, Serialize)]
pub struct CheckoutOutput {
    pub success: bool,
    pub result_code: u8,
    pub commit: String,
    pub files_restored: usize,
}
