//! Compiling one function with an external toolchain.
//!
//! [`GoCompiler`] runs `go build` for a fixed target so every artifact is
//! deployable no matter which host ran the build:
//!
//! ```text
//! cd <function dir> && GOOS=<os> GOARCH=<arch> CGO_ENABLED=0 go build -o main main.go
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::build::types::BuildError;
use crate::config::{BuildConfig, Layout, Target};
use crate::manifest::FunctionSpec;

/// Produces the compiled artifact for one function.
#[async_trait]
pub trait Compiler: Send + Sync {
  /// Compile `function`, whose sources live in `dir`, and return the artifact path.
  async fn compile(&self, function: &FunctionSpec, dir: &Path) -> Result<PathBuf, BuildError>;
}

#[derive(Debug, Clone)]
pub struct GoCompiler {
  toolchain: String,
  target: Target,
  layout: Layout,
  timeout: Option<Duration>,
}

impl GoCompiler {
  pub fn new(config: &BuildConfig) -> Self {
    Self {
      toolchain: config.toolchain.clone(),
      target: config.target.clone(),
      layout: config.layout.clone(),
      timeout: config.timeout,
    }
  }

  /// The toolchain invocation, environment set per command.
  fn command(&self, dir: &Path) -> Command {
    let mut command = Command::new(&self.toolchain);
    command
      .arg("build")
      .arg("-o")
      .arg(&self.layout.binary)
      .arg(&self.layout.entrypoint)
      .current_dir(dir)
      .env("GOOS", &self.target.os)
      .env("GOARCH", &self.target.arch)
      // Static binaries only
      .env("CGO_ENABLED", "0")
      .kill_on_drop(true);
    command
  }
}

#[async_trait]
impl Compiler for GoCompiler {
  async fn compile(&self, function: &FunctionSpec, dir: &Path) -> Result<PathBuf, BuildError> {
    let entrypoint = self.layout.entrypoint_path(dir);
    if !tokio::fs::try_exists(&entrypoint).await.unwrap_or(false) {
      return Err(BuildError::MissingEntrypoint {
        name: function.name.clone(),
        path: entrypoint,
      });
    }

    info!(name = %function.name, target = %self.target, "compiling");
    debug!(toolchain = %self.toolchain, dir = ?dir, "spawning toolchain");

    let mut command = self.command(dir);
    let output = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, command.output())
        .await
        .map_err(|_| BuildError::Timeout {
          name: function.name.clone(),
          timeout: limit,
        })?,
      None => command.output().await,
    }
    .map_err(|source| BuildError::Spawn {
      name: function.name.clone(),
      program: self.toolchain.clone(),
      source,
    })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      let message = if stderr.is_empty() {
        format!("{} exited with {}", self.toolchain, output.status)
      } else {
        stderr
      };
      return Err(BuildError::CompileFailed {
        name: function.name.clone(),
        message,
      });
    }

    Ok(self.layout.binary_path(dir))
  }
}
