//! Repository configuration file.
//!
//! A small `key=value` file:
//!
//! ```text
//! version=1
//! algo=blake3-256
//! username=alice
//! ```
//!
//! Blank lines and `#` comments are ignored, unknown keys are skipped.

use crate::atomic::write_atomic;
use crate::digest::Algorithm;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Current repository format version.
pub const REPO_VERSION: &str = "1";

/// Persisted repository configuration.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    algorithm: Algorithm,
    username: Option<String>,
}

impl Config {
    /// Load the config at `path`, writing a default one if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self {
            path: path.to_path_buf(),
            algorithm: Algorithm::Blake3,
            username: None,
        };
        config.save()?;
        Ok(config)
    }

    /// Load an existing config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let (algorithm, username) = Self::parse(&content)?;

        Ok(Self {
            path: path.to_path_buf(),
            algorithm,
            username,
        })
    }

    fn parse(content: &str) -> Result<(Algorithm, Option<String>)> {
        let mut version = None;
        let mut algo = None;
        let mut username = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    "username" => username = Some(value.trim()),
                    _ => {}
                }
            }
        }

        match version {
            Some(REPO_VERSION) => {}
            other => return Err(Error::unsupported_version(format!("{:?}", other))),
        }

        let algorithm = Algorithm::parse(algo.unwrap_or_default())?;
        let username = username.filter(|name| !name.is_empty()).map(str::to_string);

        Ok((algorithm, username))
    }

    fn render(&self) -> String {
        let mut out = format!(
            "version={}\nalgo={}\n",
            REPO_VERSION,
            self.algorithm.as_str()
        );
        if let Some(name) = &self.username {
            out.push_str(&format!("username={}\n", name));
        }
        out
    }

    /// Write the config back to disk atomically.
    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, self.render().as_bytes())
    }

    /// Hash algorithm of the content store.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Configured username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Set and persist the username.
    pub fn set_username(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_username("username cannot be empty"));
        }
        if name.contains(['\n', '\r', '\0']) {
            return Err(Error::invalid_username(
                "username cannot contain line breaks or null bytes",
            ));
        }

        self.username = Some(name.to_string());
        self.save()
    }
}
