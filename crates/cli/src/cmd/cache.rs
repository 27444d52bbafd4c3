//! Implementation of the `fnpack cache` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fnpack_lib::cache::{CacheSnapshot, LocalCacheStore, open_store};
use fnpack_lib::manifest::BackendChoice;
use fnpack_lib::run_lock::{LockMode, RunLock};

use super::Project;
use crate::output::{OutputFormat, Status, print_json, stat, status};

/// List the entries of the current cache.
pub fn cmd_cache_show(manifest_path: &Path, cache: Option<PathBuf>, output: OutputFormat) -> Result<()> {
  let project = Project::open(manifest_path, cache);
  let _lock = RunLock::acquire(&project.dir, LockMode::Shared, "cache show").context("Failed to acquire project lock")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let store = open_store(&project.manifest.backend_choice(), project.local_cache.clone());
  let snapshot = rt
    .block_on(store.load())
    .with_context(|| format!("Failed to load cache from {}", store.describe()))?;

  if output.is_json() {
    let entries: Vec<_> = snapshot
      .entries()
      .map(|e| serde_json::json!({ "path": e.path, "digest": e.digest.0 }))
      .collect();
    print_json(&serde_json::json!({
      "backend": store.describe(),
      "entries": entries,
    }))?;
    return Ok(());
  }

  status(Status::Info, &format!("Cache at {}", store.describe()));
  if snapshot.is_empty() {
    println!("  (empty)");
    return Ok(());
  }
  for entry in snapshot.entries() {
    stat(&entry.path, entry.digest.short());
  }
  Ok(())
}

/// Forget every recorded digest, so the next build packages everything.
pub fn cmd_cache_clear(manifest_path: &Path, cache: Option<PathBuf>, output: OutputFormat) -> Result<()> {
  let project = Project::open(manifest_path, cache);
  let _lock =
    RunLock::acquire(&project.dir, LockMode::Exclusive, "cache clear").context("Failed to acquire project lock")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let backend = project.manifest.backend_choice();

  let (location, removed) = match &backend {
    BackendChoice::Local => {
      let store = LocalCacheStore::new(project.local_cache.clone());
      let removed = rt
        .block_on(store.clear())
        .with_context(|| format!("Failed to clear cache at {}", store.path().display()))?;
      (store.path().display().to_string(), removed)
    }
    BackendChoice::Remote(_) => {
      let store = open_store(&backend, project.local_cache.clone());
      rt.block_on(store.save(&CacheSnapshot::new()))
        .with_context(|| format!("Failed to clear cache at {}", store.describe()))?;
      (store.describe(), true)
    }
  };

  if output.is_json() {
    print_json(&serde_json::json!({ "backend": location, "cleared": removed }))?;
  } else if removed {
    status(Status::Success, &format!("Cleared cache at {}", location));
  } else {
    status(Status::Info, &format!("No cache at {}", location));
  }
  Ok(())
}
