//! Types for function builds.
//!
//! Error, outcome and report types shared by the compiler, packager and
//! orchestrator.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{CacheEntry, CacheError, CacheSnapshot};
use crate::util::hash::ContentHash;

/// Errors from a single function's pipeline.
///
/// Every variant names the function; none of them abort the run.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The entry point the toolchain would compile does not exist.
  #[error("{name}: entry point {path} not found")]
  MissingEntrypoint { name: String, path: PathBuf },

  /// The toolchain could not be started.
  #[error("{name}: failed to run {program}: {source}")]
  Spawn {
    name: String,
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The toolchain exited unsuccessfully.
  #[error("{name}: compile failed: {message}")]
  CompileFailed { name: String, message: String },

  /// The toolchain ran past the configured limit and was killed.
  #[error("{name}: compile timed out after {timeout:?}")]
  Timeout { name: String, timeout: Duration },

  /// The artifact could not be archived.
  #[error("{name}: packaging failed: {message}")]
  PackageFailed { name: String, message: String },
}

impl BuildError {
  pub fn function_name(&self) -> &str {
    match self {
      BuildError::MissingEntrypoint { name, .. }
      | BuildError::Spawn { name, .. }
      | BuildError::CompileFailed { name, .. }
      | BuildError::Timeout { name, .. }
      | BuildError::PackageFailed { name, .. } => name,
    }
  }
}

/// How one function's build ended.
#[derive(Debug)]
pub enum FunctionOutcome {
  /// Digest changed (or was unknown) and a fresh bundle was written.
  Packaged { bundle: PathBuf },
  /// Digest matched the previous run; packaging was skipped.
  Unchanged,
  CompileFailed(BuildError),
  PackageFailed(BuildError),
  /// The build task panicked.
  Panicked { message: String },
}

impl FunctionOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(
      self,
      FunctionOutcome::CompileFailed(_) | FunctionOutcome::PackageFailed(_) | FunctionOutcome::Panicked { .. }
    )
  }

  pub fn label(&self) -> &'static str {
    match self {
      FunctionOutcome::Packaged { .. } => "packaged",
      FunctionOutcome::Unchanged => "unchanged",
      FunctionOutcome::CompileFailed(_) => "compile-failed",
      FunctionOutcome::PackageFailed(_) => "package-failed",
      FunctionOutcome::Panicked { .. } => "panicked",
    }
  }
}

/// Result of building one function.
#[derive(Debug)]
pub struct FunctionReport {
  pub name: String,
  pub path: String,
  /// Digest of the compiled artifact, once it has been computed.
  pub digest: Option<ContentHash>,
  /// The artifact could not be read; `digest` is the unknown digest.
  pub hash_failed: bool,
  pub outcome: FunctionOutcome,
}

impl FunctionReport {
  /// The entry this function contributes to the new cache, if any.
  ///
  /// Only unchanged and freshly packaged functions are recorded.
  pub fn cache_entry(&self) -> Option<CacheEntry> {
    match (&self.outcome, &self.digest) {
      (FunctionOutcome::Packaged { .. } | FunctionOutcome::Unchanged, Some(digest)) => Some(CacheEntry {
        path: self.path.clone(),
        digest: digest.clone(),
      }),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<String> {
    match &self.outcome {
      FunctionOutcome::CompileFailed(e) | FunctionOutcome::PackageFailed(e) => Some(e.to_string()),
      FunctionOutcome::Panicked { message } => Some(message.clone()),
      _ => None,
    }
  }
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
  /// Per-function reports, in manifest order.
  pub functions: Vec<FunctionReport>,

  /// The snapshot accumulated this run (what was, or should have been, saved).
  pub snapshot: CacheSnapshot,

  /// The previous cache could not be loaded; every function counted as changed.
  pub load_error: Option<CacheError>,

  /// The new cache could not be saved; the next run sees a stale cache.
  pub save_error: Option<CacheError>,
}

impl RunReport {
  pub fn packaged(&self) -> usize {
    self.count(|o| matches!(o, FunctionOutcome::Packaged { .. }))
  }

  pub fn unchanged(&self) -> usize {
    self.count(|o| matches!(o, FunctionOutcome::Unchanged))
  }

  pub fn failed(&self) -> usize {
    self.count(FunctionOutcome::is_failure)
  }

  pub fn total(&self) -> usize {
    self.functions.len()
  }

  /// Every function built and the cache was saved.
  pub fn is_success(&self) -> bool {
    self.failed() == 0 && self.save_error.is_none()
  }

  fn count(&self, pred: impl Fn(&FunctionOutcome) -> bool) -> usize {
    self.functions.iter().filter(|f| pred(&f.outcome)).count()
  }
}
