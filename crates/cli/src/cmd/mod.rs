mod build;
mod cache;

pub use build::{BuildArgs, cmd_build};
pub use cache::{cmd_cache_clear, cmd_cache_show};

use std::path::{Path, PathBuf};

use tracing::warn;

use fnpack_lib::cache::default_cache_path;
use fnpack_lib::manifest::{Manifest, project_dir};

use crate::output::{Status, status};

/// Where a command operates, resolved from global flags.
pub struct Project {
  pub dir: PathBuf,
  pub manifest: Manifest,
  pub local_cache: PathBuf,
}

impl Project {
  /// Load the manifest at `manifest_path`.
  ///
  /// A manifest that cannot be read or parsed is reported and replaced by an
  /// empty one, so the command still runs (against the local cache).
  pub fn open(manifest_path: &Path, cache_override: Option<PathBuf>) -> Self {
    let dir = project_dir(manifest_path);
    let manifest = match Manifest::load(manifest_path) {
      Ok(manifest) => manifest,
      Err(e) => {
        warn!(error = %e, "failed to load manifest, continuing with no functions");
        status(Status::Warning, &e.to_string());
        Manifest::default()
      }
    };
    let local_cache = cache_override.unwrap_or_else(|| default_cache_path(&dir));

    Self {
      dir,
      manifest,
      local_cache,
    }
  }
}
