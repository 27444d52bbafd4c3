//! Run configuration.
//!
//! Everything a build run needs besides the function list is carried in one
//! [`BuildConfig`] value, constructed once by the caller and passed down.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::{
  DEFAULT_ARCHIVE, DEFAULT_BINARY, DEFAULT_ENTRYPOINT, DEFAULT_TARGET_ARCH, DEFAULT_TARGET_OS, DEFAULT_TOOLCHAIN,
};

/// Cross-compilation target, in the toolchain's own naming (`GOOS`/`GOARCH`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  pub os: String,
  pub arch: String,
}

impl Default for Target {
  fn default() -> Self {
    Self {
      os: DEFAULT_TARGET_OS.to_string(),
      arch: DEFAULT_TARGET_ARCH.to_string(),
    }
  }
}

impl std::fmt::Display for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.os, self.arch)
  }
}

/// File names inside each function directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  /// Source file handed to the toolchain.
  pub entrypoint: String,
  /// Compiled artifact written by the toolchain.
  pub binary: String,
  /// Packaged bundle written by the packager.
  pub archive: String,
}

impl Default for Layout {
  fn default() -> Self {
    Self {
      entrypoint: DEFAULT_ENTRYPOINT.to_string(),
      binary: DEFAULT_BINARY.to_string(),
      archive: DEFAULT_ARCHIVE.to_string(),
    }
  }
}

impl Layout {
  pub fn entrypoint_path(&self, dir: &Path) -> PathBuf {
    dir.join(&self.entrypoint)
  }

  pub fn binary_path(&self, dir: &Path) -> PathBuf {
    dir.join(&self.binary)
  }

  pub fn archive_path(&self, dir: &Path) -> PathBuf {
    dir.join(&self.archive)
  }
}

/// Configuration for a build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  /// Directory relative function paths resolve against.
  pub project_dir: PathBuf,

  /// Compiler executable.
  pub toolchain: String,

  /// Platform every artifact is built for, regardless of host.
  pub target: Target,

  pub layout: Layout,

  /// Maximum number of functions building at once. `None` starts every
  /// function immediately.
  pub parallelism: Option<usize>,

  /// Limit on a single compiler invocation.
  pub timeout: Option<Duration>,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      project_dir: PathBuf::from("."),
      toolchain: DEFAULT_TOOLCHAIN.to_string(),
      target: Target::default(),
      layout: Layout::default(),
      parallelism: None,
      timeout: None,
    }
  }
}

impl BuildConfig {
  pub fn new(project_dir: PathBuf) -> Self {
    Self {
      project_dir,
      ..Self::default()
    }
  }

  /// Parallelism limit, ignoring a zero limit.
  pub fn effective_parallelism(&self) -> Option<usize> {
    self.parallelism.filter(|n| *n > 0)
  }
}
