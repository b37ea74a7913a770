//! # svcs core
//!
//! A minimal version-control core on top of a content-addressed store.
//!
//! Tracked files are staged in an index. A commit records a snapshot of every
//! staged file as `(path, digest)` pairs; file content lives once per distinct
//! version in a BLAKE3-addressed object store. Commits form a linear,
//! hash-chained history kept in a self-describing log file, and any commit can
//! be checked out back into the working directory.
//!
//! ## Example
//!
//! ```no_run
//! use svcs_core::{CommitOutcome, Repository};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create (or reopen) the repository in ./vcs
//! let mut repo = Repository::prepare(".")?;
//! repo.set_username("alice")?;
//!
//! // Stage a file and commit it
//! repo.add("notes.txt")?;
//! if let CommitOutcome::Created(commit) = repo.commit("first notes")? {
//!     println!("committed {}", commit.id());
//! }
//!
//! // Walk history, newest first
//! for commit in repo.log() {
//!     println!("{} {}", commit.id(), commit.message());
//! }
//! # Ok(())
//! # }
//! ```

mod atomic;
mod changes;
mod checkout;
mod commit;
mod config;
mod digest;
mod error;
mod index;
mod log;
mod object;
mod repo;
mod store;

pub use changes::ChangeSet;
pub use checkout::CheckoutReport;
pub use commit::{Commit, FileEntry};
pub use digest::{Algorithm, DIGEST_SIZE, Digest};
pub use error::{Error, Result};
pub use object::{CompressionType, ObjectHeader};
pub use repo::{CommitOutcome, DEFAULT_DIR, Repository};
pub use store::ContentStore;
