//! Content hashing for change detection.
//!
//! Compiled artifacts are fingerprinted with SHA-256. The digest is only ever
//! compared for equality against the previous run's cache entry, so the full
//! 64-character hex form is kept for collision resistance.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::SHORT_HASH_LEN;

/// A full 64-character SHA256 hash of artifact content.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string. The empty string is reserved for
/// [`ContentHash::unknown`], recorded when an artifact could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// The best-effort digest of an artifact whose bytes could not be read.
  pub fn unknown() -> Self {
    Self(String::new())
  }

  pub fn is_unknown(&self) -> bool {
    self.0.is_empty()
  }

  /// Whether two digests describe the same content.
  ///
  /// An unknown digest never matches anything, including another unknown
  /// digest, so unreadable artifacts always count as changed.
  pub fn matches(&self, other: &ContentHash) -> bool {
    !self.is_unknown() && self == other
  }

  /// Either unknown or exactly 64 lowercase hex digits.
  pub fn is_well_formed(&self) -> bool {
    self.is_unknown() || (self.0.len() == 64 && self.0.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
  }

  /// First 12 characters, for display.
  pub fn short(&self) -> &str {
    self.0.get(..SHORT_HASH_LEN).unwrap_or(&self.0)
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.is_unknown() {
      write!(f, "<unknown>")
    } else {
      write!(f, "{}", self.0)
    }
  }
}

/// Error while reading content to hash.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {path} for hashing: {source}")]
pub struct HashError {
  pub path: PathBuf,
  #[source]
  pub source: std::io::Error,
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let read_err = |source| HashError {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
