//! Implementation of the `fnpack build` command.
//!
//! Compiles every function in the manifest, packages the ones whose artifact
//! changed since the last run, and saves the new cache.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;

use fnpack_lib::build::{FunctionOutcome, Orchestrator, RunReport};
use fnpack_lib::cache::open_store;
use fnpack_lib::config::{BuildConfig, Target};
use fnpack_lib::consts::{DEFAULT_TARGET_ARCH, DEFAULT_TARGET_OS, DEFAULT_TOOLCHAIN};
use fnpack_lib::run_lock::{LockMode, RunLock};

use super::Project;
use crate::output::{OutputFormat, Status, format_duration, print_json, stat, status};

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Maximum number of functions to build at once (default: all)
  #[arg(short, long, env = "FNPACK_JOBS")]
  pub jobs: Option<usize>,

  /// Kill a compile that runs longer than this many seconds
  #[arg(long, env = "FNPACK_TIMEOUT")]
  pub timeout: Option<u64>,

  /// Compiler executable
  #[arg(long, env = "FNPACK_TOOLCHAIN", default_value = DEFAULT_TOOLCHAIN)]
  pub toolchain: String,

  /// Target operating system
  #[arg(long, env = "FNPACK_GOOS", default_value = DEFAULT_TARGET_OS)]
  pub goos: String,

  /// Target architecture
  #[arg(long, env = "FNPACK_GOARCH", default_value = DEFAULT_TARGET_ARCH)]
  pub goarch: String,

  /// Exit non-zero if any function failed or the cache could not be saved
  #[arg(long)]
  pub strict: bool,
}

impl BuildArgs {
  fn to_config(&self, project_dir: PathBuf) -> BuildConfig {
    BuildConfig {
      toolchain: self.toolchain.clone(),
      target: Target {
        os: self.goos.clone(),
        arch: self.goarch.clone(),
      },
      parallelism: self.jobs,
      timeout: self.timeout.map(Duration::from_secs),
      ..BuildConfig::new(project_dir)
    }
  }
}

/// Execute the build command.
///
/// Returns `Ok(false)` when `--strict` is set and the run was not a full success.
pub fn cmd_build(manifest_path: &Path, cache: Option<PathBuf>, args: &BuildArgs, output: OutputFormat) -> Result<bool> {
  let start = Instant::now();
  let project = Project::open(manifest_path, cache);

  let _lock = RunLock::acquire(&project.dir, LockMode::Exclusive, "build").context("Failed to acquire project lock")?;

  let config = args.to_config(project.dir.clone());
  let backend = project.manifest.backend_choice();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(async {
    let store = open_store(&backend, project.local_cache.clone());
    Orchestrator::with_defaults(config)
      .run_and_persist(store.as_ref(), &project.manifest.functions)
      .await
  });

  if output.is_json() {
    print_json(&report_json(&report, start.elapsed()))?;
  } else {
    print_report(&report, start.elapsed());
  }

  Ok(!args.strict || report.is_success())
}

fn print_report(report: &RunReport, elapsed: Duration) {
  if report.functions.is_empty() {
    status(Status::Info, "No functions to build");
  }

  for function in &report.functions {
    let digest = function.digest.as_ref().map(|d| d.short()).unwrap_or_default();
    match &function.outcome {
      FunctionOutcome::Packaged { bundle } => status(
        Status::Success,
        &format!("{} packaged {} ({})", function.name, bundle.display(), digest),
      ),
      FunctionOutcome::Unchanged => status(Status::Unchanged, &format!("{} unchanged ({})", function.name, digest)),
      _ => status(Status::Failed, &function.error().unwrap_or_default()),
    }
    if function.hash_failed {
      status(
        Status::Warning,
        &format!("{}: artifact could not be hashed, treated as changed", function.name),
      );
    }
  }

  if let Some(e) = &report.load_error {
    status(Status::Warning, &format!("Previous cache unavailable, rebuilt everything: {}", e));
  }
  if let Some(e) = &report.save_error {
    status(Status::Failed, &format!("Cache not saved: {}", e));
  }

  println!();
  stat("Packaged", report.packaged());
  stat("Unchanged", report.unchanged());
  stat("Failed", report.failed());
  stat("Cache entries", report.snapshot.len());
  stat("Duration", format_duration(elapsed));
}

fn report_json(report: &RunReport, elapsed: Duration) -> serde_json::Value {
  let functions: Vec<_> = report
    .functions
    .iter()
    .map(|f| {
      let bundle = match &f.outcome {
        FunctionOutcome::Packaged { bundle } => Some(bundle.display().to_string()),
        _ => None,
      };
      serde_json::json!({
        "name": f.name,
        "path": f.path,
        "outcome": f.outcome.label(),
        "digest": f.digest.as_ref().map(|d| d.0.clone()),
        "hash_failed": f.hash_failed,
        "bundle": bundle,
        "error": f.error(),
      })
    })
    .collect();

  serde_json::json!({
    "success": report.is_success(),
    "packaged": report.packaged(),
    "unchanged": report.unchanged(),
    "failed": report.failed(),
    "cache_entries": report.snapshot.len(),
    "load_error": report.load_error.as_ref().map(|e| e.to_string()),
    "save_error": report.save_error.as_ref().map(|e| e.to_string()),
    "duration_ms": elapsed.as_millis() as u64,
    "functions": functions,
  })
}
