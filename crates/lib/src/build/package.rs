//! Packaging compiled artifacts for upload.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::build::types::BuildError;
use crate::config::Layout;
use crate::manifest::FunctionSpec;

/// Turns a compiled artifact into a distributable bundle.
#[async_trait]
pub trait Packager: Send + Sync {
  /// Package `artifact` for `function` (sources in `dir`) and return the bundle path.
  async fn package(&self, function: &FunctionSpec, dir: &Path, artifact: &Path) -> Result<PathBuf, BuildError>;
}

/// Writes `<dir>/archive.zip` holding the binary as its only entry.
///
/// Entries get a fixed timestamp and mode, so the same binary always yields
/// byte-identical archives.
#[derive(Debug, Clone, Default)]
pub struct ZipPackager {
  layout: Layout,
}

impl ZipPackager {
  pub fn new(layout: Layout) -> Self {
    Self { layout }
  }
}

#[async_trait]
impl Packager for ZipPackager {
  async fn package(&self, function: &FunctionSpec, dir: &Path, artifact: &Path) -> Result<PathBuf, BuildError> {
    let archive = self.layout.archive_path(dir);
    let entry_name = self.layout.binary.clone();
    let package_err = |message: String| BuildError::PackageFailed {
      name: function.name.clone(),
      message,
    };

    let (artifact_path, archive_path) = (artifact.to_path_buf(), archive.clone());
    tokio::task::spawn_blocking(move || write_archive(&artifact_path, &archive_path, &entry_name))
      .await
      .map_err(|e| package_err(e.to_string()))?
      .map_err(|e| package_err(e.to_string()))?;

    info!(name = %function.name, archive = ?archive, "packaged");
    Ok(archive)
  }
}

/// Zip `artifact` into `archive`, replacing it atomically.
fn write_archive(artifact: &Path, archive: &Path, entry_name: &str) -> io::Result<()> {
  let content = std::fs::read(artifact)?;
  let parent = archive.parent().unwrap_or_else(|| Path::new("."));

  let temp = tempfile::NamedTempFile::new_in(parent)?;
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .unix_permissions(0o755)
    .last_modified_time(DateTime::default());

  let mut writer = ZipWriter::new(temp.as_file());
  writer.start_file(entry_name, options).map_err(io::Error::other)?;
  writer.write_all(&content)?;
  writer.finish().map_err(io::Error::other)?;

  // NamedTempFile creates 0600 files.
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    temp.as_file().set_permissions(std::fs::Permissions::from_mode(0o644))?;
  }

  temp.persist(archive).map_err(|e| e.error)?;
  Ok(())
}
