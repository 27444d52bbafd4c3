use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::CACHE_VERSION;
use crate::util::hash::ContentHash;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to read cache: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write cache: {0}")]
  Write(#[source] io::Error),

  #[error("failed to create cache directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to parse cache: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize cache: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported cache version {0} (expected {CACHE_VERSION})")]
  UnsupportedVersion(u32),

  #[error("cache lists path {0} more than once")]
  DuplicatePath(String),

  #[error("cache entry for {path} has malformed digest {digest:?}")]
  InvalidDigest { path: String, digest: String },

  #[error("remote cache error: {message}")]
  Remote { message: String },
}

/// The last known digest of the compiled artifact at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
  pub path: String,
  pub digest: ContentHash,
}

/// On-disk shape of a snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
  version: u32,
  entries: Vec<CacheEntry>,
}

/// A complete mapping from function path to artifact digest.
///
/// Keys are unique by construction. Iteration (and the serialized document) is
/// ordered by path, though nothing depends on that order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
  entries: BTreeMap<String, ContentHash>,
}

impl CacheSnapshot {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, path: &str) -> Option<&ContentHash> {
    self.entries.get(path)
  }

  /// Record the digest for `path`, replacing any previous one.
  pub fn insert(&mut self, entry: CacheEntry) -> Option<ContentHash> {
    self.entries.insert(entry.path, entry.digest)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entries(&self) -> impl Iterator<Item = CacheEntry> + '_ {
    self.entries.iter().map(|(path, digest)| CacheEntry {
      path: path.clone(),
      digest: digest.clone(),
    })
  }

  pub fn to_json(&self) -> Result<String, CacheError> {
    let document = CacheDocument {
      version: CACHE_VERSION,
      entries: self.entries().collect(),
    };
    serde_json::to_string_pretty(&document).map_err(CacheError::Serialize)
  }

  pub fn from_json(content: &str) -> Result<Self, CacheError> {
    let document: CacheDocument = serde_json::from_str(content).map_err(CacheError::Parse)?;

    if document.version != CACHE_VERSION {
      return Err(CacheError::UnsupportedVersion(document.version));
    }

    let mut snapshot = Self::new();
    for entry in document.entries {
      if !entry.digest.is_well_formed() {
        return Err(CacheError::InvalidDigest {
          path: entry.path,
          digest: entry.digest.0,
        });
      }
      let path = entry.path.clone();
      if snapshot.insert(entry).is_some() {
        return Err(CacheError::DuplicatePath(path));
      }
    }
    Ok(snapshot)
  }
}

impl FromIterator<CacheEntry> for CacheSnapshot {
  fn from_iter<I: IntoIterator<Item = CacheEntry>>(iter: I) -> Self {
    let mut snapshot = Self::new();
    for entry in iter {
      snapshot.insert(entry);
    }
    snapshot
  }
}
