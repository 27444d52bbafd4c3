//! Test utilities for fnpack-lib.
//!
//! Deterministic stand-ins for the toolchain, the packager and the cache
//! backend, so orchestration can be tested without `go`, `zip` or S3.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::build::compile::Compiler;
use crate::build::package::Packager;
use crate::build::BuildError;
use crate::cache::{CacheError, CacheSnapshot, CacheStore};
use crate::config::Layout;
use crate::manifest::FunctionSpec;

/// Create `<project>/functions/<name>/main.go` holding `source`.
pub fn write_function(project: &Path, name: &str, source: &[u8]) -> PathBuf {
  let dir = project.join("functions").join(name);
  std::fs::create_dir_all(&dir).unwrap();
  std::fs::write(dir.join("main.go"), source).unwrap();
  dir
}

/// Write an executable that behaves like `go build -o OUT SRC`.
///
/// The "binary" is the source followed by the target environment. Sources
/// containing `FAIL` exit 1 with `syntax error` on stderr; sources containing
/// `SLOW` sleep first.
#[cfg(unix)]
pub fn write_fake_toolchain(dir: &Path) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join("fake-go");
  let script = r#"#!/bin/sh
out="$3"
src="$4"
if grep -q FAIL "$src"; then
  echo "syntax error" >&2
  exit 1
fi
if grep -q SLOW "$src"; then
  sleep 5
fi
cat "$src" > "$out"
echo "GOOS=$GOOS GOARCH=$GOARCH CGO_ENABLED=$CGO_ENABLED" >> "$out"
"#;
  std::fs::write(&path, script).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

fn copy_source(function: &FunctionSpec, dir: &Path) -> Result<PathBuf, BuildError> {
  let layout = Layout::default();
  let entrypoint = layout.entrypoint_path(dir);
  let source = std::fs::read(&entrypoint).map_err(|_| BuildError::MissingEntrypoint {
    name: function.name.clone(),
    path: entrypoint.clone(),
  })?;
  let artifact = layout.binary_path(dir);
  std::fs::write(&artifact, source).map_err(|e| BuildError::CompileFailed {
    name: function.name.clone(),
    message: e.to_string(),
  })?;
  Ok(artifact)
}

/// "Compiles" by copying `main.go` to `main`, so the artifact digest equals
/// the digest of the source bytes.
#[derive(Debug, Default)]
pub struct SourceCopyCompiler;

#[async_trait]
impl Compiler for SourceCopyCompiler {
  async fn compile(&self, function: &FunctionSpec, dir: &Path) -> Result<PathBuf, BuildError> {
    copy_source(function, dir)
  }
}

/// Reports success but points at an artifact that does not exist.
#[derive(Debug, Default)]
pub struct UnreadableArtifactCompiler;

#[async_trait]
impl Compiler for UnreadableArtifactCompiler {
  async fn compile(&self, _function: &FunctionSpec, dir: &Path) -> Result<PathBuf, BuildError> {
    Ok(dir.join("vanished"))
  }
}

/// Like [`SourceCopyCompiler`], but holds each compile open for `delay` and
/// tracks how many were running at once.
#[derive(Debug)]
pub struct ConcurrencyProbe {
  delay: Duration,
  in_flight: AtomicUsize,
  max_in_flight: AtomicUsize,
}

impl ConcurrencyProbe {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      in_flight: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
    }
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Compiler for ConcurrencyProbe {
  async fn compile(&self, function: &FunctionSpec, dir: &Path) -> Result<PathBuf, BuildError> {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;
    self.in_flight.fetch_sub(1, Ordering::SeqCst);
    copy_source(function, dir)
  }
}

/// Records which functions were packaged without writing anything.
#[derive(Debug, Default)]
pub struct RecordingPackager {
  packaged: Mutex<Vec<String>>,
  failing: Mutex<HashSet<String>>,
  panicking: Mutex<HashSet<String>>,
}

impl RecordingPackager {
  pub fn fail_for(&self, name: &str) {
    self.failing.lock().unwrap().insert(name.to_string());
  }

  pub fn panic_for(&self, name: &str) {
    self.panicking.lock().unwrap().insert(name.to_string());
  }

  pub fn calls(&self) -> usize {
    self.packaged.lock().unwrap().len()
  }

  /// Names of packaged functions, sorted.
  pub fn packaged_names(&self) -> Vec<String> {
    let mut names = self.packaged.lock().unwrap().clone();
    names.sort();
    names
  }
}

#[async_trait]
impl Packager for RecordingPackager {
  async fn package(&self, function: &FunctionSpec, dir: &Path, _artifact: &Path) -> Result<PathBuf, BuildError> {
    if self.panicking.lock().unwrap().contains(&function.name) {
      panic!("packager exploded for {}", function.name);
    }
    if self.failing.lock().unwrap().contains(&function.name) {
      return Err(BuildError::PackageFailed {
        name: function.name.clone(),
        message: "archiver failed".to_string(),
      });
    }
    self.packaged.lock().unwrap().push(function.name.clone());
    Ok(dir.join("archive.zip"))
  }
}

/// In-memory cache backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
  stored: Mutex<Option<CacheSnapshot>>,
  fail_load: bool,
  fail_save: bool,
}

impl MemoryStore {
  pub fn failing_load() -> Self {
    Self {
      fail_load: true,
      ..Self::default()
    }
  }

  pub fn failing_save() -> Self {
    Self {
      fail_save: true,
      ..Self::default()
    }
  }

  /// The last saved snapshot.
  pub fn saved(&self) -> Option<CacheSnapshot> {
    self.stored.lock().unwrap().clone()
  }
}

#[async_trait]
impl CacheStore for MemoryStore {
  fn describe(&self) -> String {
    "memory".to_string()
  }

  async fn load(&self) -> Result<CacheSnapshot, CacheError> {
    if self.fail_load {
      return Err(CacheError::Remote {
        message: "connection refused".to_string(),
      });
    }
    Ok(self.stored.lock().unwrap().clone().unwrap_or_default())
  }

  async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
    if self.fail_save {
      return Err(CacheError::Remote {
        message: "access denied".to_string(),
      });
    }
    *self.stored.lock().unwrap() = Some(snapshot.clone());
    Ok(())
  }
}
