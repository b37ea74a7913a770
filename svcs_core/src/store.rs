//! Content-addressed blob storage.

use crate::atomic::write_atomic;
use crate::digest::{Algorithm, Digest};
use crate::error::{Error, Result};
use crate::object::{CompressionType, HEADER_SIZE, ObjectHeader};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compression threshold: blobs >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// An append-only content-addressed store.
///
/// Objects live under `objects/{algorithm}/{prefix}/{suffix}`. Nothing is
/// ever deleted.
#[derive(Debug)]
pub struct ContentStore {
    objects_dir: PathBuf,
    algorithm: Algorithm,
}

impl ContentStore {
    /// Open the object area below `root`, creating it if needed.
    pub fn open<P: AsRef<Path>>(root: P, algorithm: Algorithm) -> Result<Self> {
        let objects_dir = root.as_ref().join("objects").join(algorithm.as_str());
        fs::create_dir_all(&objects_dir)?;

        Ok(Self {
            objects_dir,
            algorithm,
        })
    }

    /// Get the algorithm used by this store.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Get the path to an object file given its digest.
    pub fn object_path(&self, digest: &Digest) -> PathBuf {
        self.objects_dir.join(digest.prefix()).join(digest.suffix())
    }

    /// Compute the digest content would be stored under, without storing it.
    pub fn digest_of(&self, data: &[u8]) -> Digest {
        Digest::of(data)
    }

    /// Compute the digest of a file's content, without storing it.
    pub fn digest_file(&self, path: &Path) -> Result<Digest> {
        Digest::of_file(path)
    }

    /// Check whether an object is present.
    pub fn contains(&self, digest: &Digest) -> bool {
        self.object_path(digest).is_file()
    }

    /// Store content and return its digest.
    ///
    /// Writing content that is already present is a no-op.
    pub fn put(&self, data: &[u8]) -> Result<Digest> {
        let digest = Digest::of(data);

        let obj_path = self.object_path(&digest);
        if obj_path.exists() {
            debug!(%digest, "blob already stored");
            return Ok(digest);
        }

        let (payload, compression) = if data.len() >= COMPRESSION_THRESHOLD {
            (compress_zstd(data)?, CompressionType::Zstd)
        } else {
            (data.to_vec(), CompressionType::None)
        };

        let header = ObjectHeader::new(self.algorithm, compression, payload.len() as u64);

        let mut object = Vec::with_capacity(HEADER_SIZE + payload.len());
        object.extend_from_slice(&header.encode());
        object.extend_from_slice(&payload);
        write_atomic(&obj_path, &object)?;

        debug!(
            %digest,
            size = data.len(),
            compression = compression.as_str(),
            "stored blob"
        );
        Ok(digest)
    }

    /// Store everything a reader yields.
    pub fn put_reader<R: Read>(&self, mut reader: R) -> Result<Digest> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.put(&data)
    }

    /// Retrieve content by digest.
    ///
    /// The header is validated and the content re-hashed, so a damaged object
    /// is reported as corruption rather than returned.
    pub fn get(&self, digest: &Digest) -> Result<Vec<u8>> {
        let obj_path = self.object_path(digest);

        let mut file = match fs::File::open(&obj_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::object_not_found(digest.to_hex()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        let header = ObjectHeader::decode(&raw).map_err(|reason| Error::corrupt(&obj_path, reason))?;
        if header.algorithm != self.algorithm {
            return Err(Error::corrupt(
                &obj_path,
                format!(
                    "Algorithm mismatch: store uses {}, object uses {}",
                    self.algorithm.as_str(),
                    header.algorithm.as_str()
                ),
            ));
        }

        let stored = &raw[HEADER_SIZE..];
        if stored.len() as u64 != header.payload_len {
            return Err(Error::corrupt(
                &obj_path,
                format!(
                    "Payload length mismatch: expected {}, got {}",
                    header.payload_len,
                    stored.len()
                ),
            ));
        }

        let data = match header.compression {
            CompressionType::None => stored.to_vec(),
            CompressionType::Zstd => decompress_zstd(stored)
                .map_err(|e| Error::corrupt(&obj_path, e.to_string()))?,
        };

        let computed = Digest::of(&data);
        if computed != *digest {
            return Err(Error::corrupt(
                &obj_path,
                format!("Digest mismatch: expected {}, got {}", digest, computed),
            ));
        }

        Ok(data)
    }
}

/// Compress data using zstd.
fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3) // Level 3 = fast compression
        .map_err(|e| Error::compression(format!("zstd compression failed: {}", e)))
}

/// Decompress data using zstd.
fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data)
        .map_err(|e| Error::compression(format!("zstd decompression failed: {}", e)))
}
