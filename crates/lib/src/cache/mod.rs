//! Persisted build cache.
//!
//! The cache maps each function's path to the digest of the artifact it last
//! compiled to. A run reads one snapshot at the start and writes a complete
//! replacement at the end; stores never merge.
//!
//! # Backends
//!
//! - [`LocalCacheStore`]: a JSON file, `.fnpack/cache.json` by default
//! - [`S3CacheStore`]: a single object in an S3 bucket
//!
//! [`open_store`] picks one from the manifest's [`BackendChoice`].

mod local;
mod s3;
mod types;

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::manifest::BackendChoice;

pub use local::{LocalCacheStore, default_cache_path};
pub use s3::S3CacheStore;
pub use types::{CacheEntry, CacheError, CacheSnapshot};

#[async_trait]
pub trait CacheStore: Send + Sync {
  /// Human-readable location, for logs.
  fn describe(&self) -> String;

  /// Load the stored snapshot. No stored snapshot is not an error.
  async fn load(&self) -> Result<CacheSnapshot, CacheError>;

  /// Replace the stored snapshot with `snapshot`.
  async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError>;
}

/// Open the store for this run's backend choice.
pub fn open_store(choice: &BackendChoice, local_path: PathBuf) -> Box<dyn CacheStore> {
  let store: Box<dyn CacheStore> = match choice {
    BackendChoice::Remote(remote) => Box::new(S3CacheStore::new(remote.clone())),
    BackendChoice::Local => Box::new(LocalCacheStore::new(local_path)),
  };
  info!(backend = %store.describe(), "using cache backend");
  store
}
