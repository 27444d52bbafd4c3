//! Manifest types for fnpack.
//!
//! # Format
//!
//! ```yaml
//! backend:
//!   config:
//!     bucket: my-bucket
//!     key: fnpack/cache.json
//!     region: eu-west-1
//! functions:
//!   - name: hello
//!     path: functions/hello
//! ```
//!
//! The `backend` block is optional. When any of its three fields is missing or
//! blank the cache is kept on local disk instead.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
}

/// One deployable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
  pub name: String,
  /// Source directory, relative to the manifest unless absolute. The string
  /// as written is also the function's cache key.
  pub path: String,
}

impl FunctionSpec {
  pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      path: path.into(),
    }
  }

  /// Directory holding this function's sources and outputs.
  pub fn dir(&self, project_dir: &Path) -> PathBuf {
    let path = Path::new(&self.path);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      project_dir.join(path)
    }
  }
}

/// Location of the remote cache object.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
  #[serde(default)]
  pub bucket: String,
  #[serde(default)]
  pub key: String,
  #[serde(default)]
  pub region: String,
}

impl RemoteConfig {
  /// True when bucket, key and region are all non-blank.
  pub fn is_complete(&self) -> bool {
    [&self.bucket, &self.key, &self.region]
      .iter()
      .all(|field| !field.trim().is_empty())
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendBlock {
  #[serde(default)]
  pub config: RemoteConfig,
}

/// Where the build cache lives for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendChoice {
  Local,
  Remote(RemoteConfig),
}

/// The parsed `functions.yaml`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub backend: Option<BackendBlock>,
  #[serde(default)]
  pub functions: Vec<FunctionSpec>,
}

impl Manifest {
  pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
    // An empty document is a manifest with nothing in it.
    if content.trim().is_empty() {
      return Ok(Self::default());
    }

    serde_yaml::from_str(content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest = Self::parse(&content, path)?;
    manifest.warn_duplicates();
    Ok(manifest)
  }

  /// Decide the cache backend. Fixed for the rest of the run.
  pub fn backend_choice(&self) -> BackendChoice {
    match &self.backend {
      Some(block) if block.config.is_complete() => BackendChoice::Remote(RemoteConfig {
        bucket: block.config.bucket.trim().to_string(),
        key: block.config.key.trim().to_string(),
        region: block.config.region.trim().to_string(),
      }),
      Some(_) => {
        warn!("backend config is incomplete (bucket, key and region are required), using local cache");
        BackendChoice::Local
      }
      None => BackendChoice::Local,
    }
  }

  /// Duplicate paths share one directory and one cache entry; only the first
  /// declaration is built.
  fn warn_duplicates(&self) {
    let mut names = HashSet::new();
    let mut paths = HashSet::new();
    for function in &self.functions {
      if !names.insert(function.name.as_str()) {
        warn!(name = %function.name, "function name declared more than once");
      }
      if !paths.insert(function.path.as_str()) {
        warn!(name = %function.name, path = %function.path, "function path declared more than once");
      }
    }
  }
}

/// Directory the manifest's relative paths resolve against.
pub fn project_dir(manifest_path: &Path) -> PathBuf {
  let parent = match manifest_path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  };
  dunce::canonicalize(&parent).unwrap_or(parent)
}
