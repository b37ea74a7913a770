//! Content digests using BLAKE3.

use crate::error::{Error, Result};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Digest size in bytes (BLAKE3 produces 256-bit hashes).
pub const DIGEST_SIZE: usize = 32;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    Blake3,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" => Ok(Algorithm::Blake3),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Returns the algorithm ID byte (for object headers).
    pub fn id(&self) -> u8 {
        match self {
            Algorithm::Blake3 => 1,
        }
    }

    /// Parse algorithm from ID byte.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Algorithm::Blake3),
            _ => Err(Error::unsupported_algorithm(format!("ID {}", id))),
        }
    }
}

/// A 32-byte BLAKE3 digest, used both for blobs and for commit ids.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Create a Digest from raw bytes.
    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Digest(bytes)
    }

    /// Create a Digest from a hex string (64 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != DIGEST_SIZE * 2 {
            return Err(Error::invalid_digest(format!(
                "Expected {} hex characters, got {}",
                DIGEST_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::invalid_digest(format!("Invalid hex: {}", e)))?;

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&bytes);
        Ok(Digest(digest))
    }

    /// Convert to lowercase hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 2 hex characters (directory shard).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Remaining 62 hex characters (file name inside the shard).
    pub fn suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Digest raw bytes.
    pub fn of(data: &[u8]) -> Self {
        Digest(*blake3::hash(data).as_bytes())
    }

    /// Digest everything a reader yields.
    pub fn of_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut hasher = blake3::Hasher::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Digest(*hasher.finalize().as_bytes()))
    }

    /// Digest a file's content.
    pub fn of_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::of_reader(file)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::str::FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_empty() {
        let digest = Digest::of(b"");
        assert_eq!(digest.to_hex().len(), 64);
    }

    #[test]
    fn test_digest_hello_world() {
        // BLAKE3 of "hello world"
        assert_eq!(
            Digest::of(b"hello world").to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_digest_reader_matches_bytes() {
        let data = b"streamed content".to_vec();
        let from_reader = Digest::of_reader(&data[..]).unwrap();
        assert_eq!(from_reader, Digest::of(&data));
    }

    #[test]
    fn test_from_hex_invalid() {
        assert!(Digest::from_hex("abcd").is_err());
        assert!(Digest::from_hex("").is_err());
        assert!(Digest::from_hex(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_prefix_suffix() {
        let digest = Digest::of(b"test");
        assert_eq!(digest.prefix().len(), 2);
        assert_eq!(digest.suffix().len(), 62);
        assert_eq!(format!("{}{}", digest.prefix(), digest.suffix()), digest.to_hex());
    }

    #[test]
    fn test_algorithm_conversions() {
        let algo = Algorithm::Blake3;
        assert_eq!(algo.as_str(), "blake3-256");
        assert_eq!(Algorithm::parse("blake3-256").unwrap(), Algorithm::Blake3);
        assert_eq!(Algorithm::from_id(algo.id()).unwrap(), Algorithm::Blake3);

        assert!(Algorithm::parse("sha256").is_err());
        assert!(Algorithm::from_id(99).is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Digesting is deterministic.
        #[test]
        fn prop_digest_deterministic(data: Vec<u8>) {
            prop_assert_eq!(Digest::of(&data), Digest::of(&data));
        }

        /// Hex rendering parses back to the same digest.
        #[test]
        fn prop_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
            let digest = Digest::from_bytes(bytes);
            let hex = digest.to_hex();
            prop_assert_eq!(hex.clone(), hex.to_lowercase());
            prop_assert_eq!(Digest::from_hex(&hex)?, digest);
        }

        /// Wrong lengths never parse.
        #[test]
        fn prop_invalid_hex_length_fails(s in "[0-9a-f]{0,63}|[0-9a-f]{65,128}") {
            prop_assert!(Digest::from_hex(&s).is_err());
        }
    }
}
