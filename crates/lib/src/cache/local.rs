//! Cache persisted to a file on local disk.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::consts::{CACHE_FILENAME, STATE_DIR};

use super::CacheStore;
use super::types::{CacheError, CacheSnapshot};

#[derive(Debug, Clone)]
pub struct LocalCacheStore {
  path: PathBuf,
}

impl LocalCacheStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// `<project>/.fnpack/cache.json`
  pub fn for_project(project_dir: &Path) -> Self {
    Self::new(default_cache_path(project_dir))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn temp_path(&self) -> PathBuf {
    let mut name = self.path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    self.path.with_file_name(name)
  }

  /// Remove the cache file. Returns whether one existed.
  pub async fn clear(&self) -> Result<bool, CacheError> {
    match fs::remove_file(&self.path).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(CacheError::Write(e)),
    }
  }
}

pub fn default_cache_path(project_dir: &Path) -> PathBuf {
  project_dir.join(STATE_DIR).join(CACHE_FILENAME)
}

#[async_trait]
impl CacheStore for LocalCacheStore {
  fn describe(&self) -> String {
    self.path.display().to_string()
  }

  /// Returns an empty snapshot if the file doesn't exist.
  async fn load(&self) -> Result<CacheSnapshot, CacheError> {
    let content = match fs::read_to_string(&self.path).await {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = ?self.path, "no cache file, starting empty");
        return Ok(CacheSnapshot::new());
      }
      Err(e) => return Err(CacheError::Read(e)),
    };

    CacheSnapshot::from_json(&content)
  }

  /// Uses atomic write (write to temp, then rename) so a failed save leaves the
  /// previous cache intact.
  async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).await.map_err(CacheError::CreateDir)?;
    }

    let content = snapshot.to_json()?;
    let temp_path = self.temp_path();
    fs::write(&temp_path, &content).await.map_err(CacheError::Write)?;
    if let Err(e) = fs::rename(&temp_path, &self.path).await {
      let _ = fs::remove_file(&temp_path).await;
      return Err(CacheError::Write(e));
    }

    debug!(path = ?self.path, entries = snapshot.len(), "cache saved");
    Ok(())
  }
}
