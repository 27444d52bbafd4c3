//! Concurrent build orchestration.
//!
//! Every function runs its own pipeline on a separate task:
//!
//! ```text
//! compile -> hash -> compare with old cache -> (skip | package) -> record
//! ```
//!
//! Tasks share nothing mutable. Each returns a [`FunctionReport`] and the
//! joining loop, the only writer, folds the reports into the new snapshot.
//! Failures stay with their function: the run always finishes and the new
//! snapshot is always saved.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::build::compile::{Compiler, GoCompiler};
use crate::build::package::{Packager, ZipPackager};
use crate::build::types::{FunctionOutcome, FunctionReport, RunReport};
use crate::cache::{CacheSnapshot, CacheStore};
use crate::config::BuildConfig;
use crate::manifest::FunctionSpec;
use crate::util::hash::{ContentHash, hash_file};

pub struct Orchestrator {
  config: BuildConfig,
  compiler: Arc<dyn Compiler>,
  packager: Arc<dyn Packager>,
}

impl Orchestrator {
  pub fn new(config: BuildConfig, compiler: Arc<dyn Compiler>, packager: Arc<dyn Packager>) -> Self {
    Self {
      config,
      compiler,
      packager,
    }
  }

  /// `go build` plus zip packaging, as configured.
  pub fn with_defaults(config: BuildConfig) -> Self {
    let compiler = Arc::new(GoCompiler::new(&config));
    let packager = Arc::new(ZipPackager::new(config.layout.clone()));
    Self::new(config, compiler, packager)
  }

  /// Build every function against `old` and collect the new snapshot.
  ///
  /// All functions start at once unless a parallelism limit is configured.
  /// A path declared more than once is built for its first declaration only.
  /// Returns once every task has finished. Nothing is persisted.
  pub async fn run(&self, functions: &[FunctionSpec], old: &CacheSnapshot) -> RunReport {
    info!(function_count = functions.len(), "starting build run");

    let semaphore = self.config.effective_parallelism().map(|n| Arc::new(Semaphore::new(n)));
    let mut join_set = JoinSet::new();
    let mut task_functions = HashMap::new();
    let mut seen_paths = HashSet::new();

    for (index, function) in functions.iter().enumerate() {
      // One task per directory; a second build would race on the same outputs.
      if !seen_paths.insert(function.path.as_str()) {
        warn!(name = %function.name, path = %function.path, "path already built by an earlier function, skipping");
        continue;
      }
      let function = function.clone();
      let dir = function.dir(&self.config.project_dir);
      let previous = old.get(&function.path).cloned();
      let compiler = self.compiler.clone();
      let packager = self.packager.clone();
      let semaphore = semaphore.clone();

      let handle = join_set.spawn({
        let function = function.clone();
        async move {
          let _permit = match semaphore {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
          };
          let report = build_function(function, &dir, previous, compiler.as_ref(), packager.as_ref()).await;
          (index, report)
        }
      });
      task_functions.insert(handle.id(), (index, function));
    }

    // Single writer for the new snapshot.
    let mut snapshot = CacheSnapshot::new();
    let mut reports = Vec::with_capacity(functions.len());

    while let Some(joined) = join_set.join_next_with_id().await {
      match joined {
        Ok((_, (index, report))) => {
          if let Some(entry) = report.cache_entry() {
            snapshot.insert(entry);
          }
          reports.push((index, report));
        }
        Err(e) => {
          error!(error = %e, "build task panicked");
          if let Some((index, function)) = task_functions.remove(&e.id()) {
            reports.push((
              index,
              FunctionReport {
                name: function.name,
                path: function.path,
                digest: None,
                hash_failed: false,
                outcome: FunctionOutcome::Panicked { message: e.to_string() },
              },
            ));
          }
        }
      }
    }

    reports.sort_by_key(|(index, _)| *index);
    let report = RunReport {
      functions: reports.into_iter().map(|(_, report)| report).collect(),
      snapshot,
      ..Default::default()
    };

    info!(
      packaged = report.packaged(),
      unchanged = report.unchanged(),
      failed = report.failed(),
      "build run complete"
    );

    report
  }

  /// Load the previous cache, run every build, then save the new cache.
  ///
  /// A cache that cannot be loaded is treated as empty, so every function
  /// counts as changed. The save happens even when functions failed; those
  /// functions simply have no entry in the saved cache.
  pub async fn run_and_persist(&self, store: &dyn CacheStore, functions: &[FunctionSpec]) -> RunReport {
    let (old, load_error) = match store.load().await {
      Ok(snapshot) => {
        debug!(entries = snapshot.len(), "loaded cache");
        (snapshot, None)
      }
      Err(e) => {
        warn!(backend = %store.describe(), error = %e, "failed to load cache, treating all functions as changed");
        (CacheSnapshot::new(), Some(e))
      }
    };

    let mut report = self.run(functions, &old).await;
    report.load_error = load_error;

    match store.save(&report.snapshot).await {
      Ok(()) => info!(backend = %store.describe(), entries = report.snapshot.len(), "cache saved"),
      Err(e) => {
        error!(backend = %store.describe(), error = %e, "failed to save cache");
        report.save_error = Some(e);
      }
    }

    report
  }
}

/// Run one function's pipeline to completion. Never fails; failures are
/// described by the report's outcome.
async fn build_function(
  function: FunctionSpec,
  dir: &Path,
  previous: Option<ContentHash>,
  compiler: &dyn Compiler,
  packager: &dyn Packager,
) -> FunctionReport {
  let mut report = FunctionReport {
    name: function.name.clone(),
    path: function.path.clone(),
    digest: None,
    hash_failed: false,
    outcome: FunctionOutcome::Unchanged,
  };

  let artifact = match compiler.compile(&function, dir).await {
    Ok(artifact) => artifact,
    Err(e) => {
      error!(name = %function.name, error = %e, "compile failed");
      report.outcome = FunctionOutcome::CompileFailed(e);
      return report;
    }
  };

  let digest = match hash_artifact(artifact.clone()).await {
    Ok(digest) => digest,
    Err(message) => {
      warn!(name = %function.name, error = %message, "failed to hash artifact, treating as changed");
      report.hash_failed = true;
      ContentHash::unknown()
    }
  };
  report.digest = Some(digest.clone());

  if previous.as_ref().is_some_and(|prev| digest.matches(prev)) {
    debug!(name = %function.name, digest = %digest.short(), "unchanged, skipping package");
    return report;
  }

  info!(name = %function.name, "rebuilding");

  report.outcome = match packager.package(&function, dir, &artifact).await {
    Ok(bundle) => FunctionOutcome::Packaged { bundle },
    Err(e) => {
      error!(name = %function.name, error = %e, "packaging failed");
      FunctionOutcome::PackageFailed(e)
    }
  };
  report
}

async fn hash_artifact(artifact: PathBuf) -> Result<ContentHash, String> {
  match tokio::task::spawn_blocking(move || hash_file(&artifact)).await {
    Ok(result) => result.map_err(|e| e.to_string()),
    Err(e) => Err(e.to_string()),
  }
}
