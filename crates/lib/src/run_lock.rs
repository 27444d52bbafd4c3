//! Per-project run lock.
//!
//! A build writes `main` and `archive.zip` into every function directory and
//! replaces the cache when it finishes. `<project>/.fnpack/.lock` keeps a second
//! fnpack process from doing the same to the project at the same time.
//! `cache show` only reads, so readers share the lock.
//!
//! The exclusive holder records itself in the lock file as `<pid> <command>`,
//! which is what a blocked process reports back to the user.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{LOCK_FILENAME, STATE_DIR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
  Shared,
  Exclusive,
}

/// The process recorded in the lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
  pub pid: u32,
  pub command: String,
}

impl Holder {
  fn current(command: &str) -> Self {
    Self {
      pid: std::process::id(),
      command: command.to_string(),
    }
  }

  fn parse(content: &str) -> Option<Self> {
    let (pid, command) = content.trim().split_once(' ')?;
    Some(Self {
      pid: pid.parse().ok()?,
      command: command.to_string(),
    })
  }
}

impl std::fmt::Display for Holder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "`fnpack {}` (pid {})", self.command, self.pid)
  }
}

#[derive(Debug, Error)]
pub enum RunLockError {
  #[error("project is busy: {holder} is running\nIf no fnpack process is running, remove {lock_path}")]
  Busy { holder: String, lock_path: PathBuf },

  #[error("failed to lock {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Released when dropped.
#[derive(Debug)]
pub struct RunLock {
  file: File,
  path: PathBuf,
  mode: LockMode,
}

impl RunLock {
  /// Take the project lock without waiting.
  pub fn acquire(project_dir: &Path, mode: LockMode, command: &str) -> Result<Self, RunLockError> {
    let path = project_dir.join(STATE_DIR).join(LOCK_FILENAME);
    let io_err = |source| RunLockError::Io {
      path: path.clone(),
      source,
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&path)
      .map_err(io_err)?;

    if !lock_nonblocking(&file, mode).map_err(io_err)? {
      let holder = std::fs::read_to_string(&path)
        .ok()
        .and_then(|content| Holder::parse(&content))
        .map_or_else(|| "another fnpack process".to_string(), |h| h.to_string());
      return Err(RunLockError::Busy {
        holder,
        lock_path: path,
      });
    }

    if mode == LockMode::Exclusive {
      let holder = Holder::current(command);
      file.set_len(0).map_err(io_err)?;
      file.rewind().map_err(io_err)?;
      writeln!(file, "{} {}", holder.pid, holder.command).map_err(io_err)?;
    }

    debug!(path = ?path, mode = ?mode, command, "project lock acquired");
    Ok(Self { file, path, mode })
  }

  /// The holder recorded in the lock file, if any.
  pub fn holder(&self) -> io::Result<Option<Holder>> {
    let mut file = &self.file;
    file.rewind()?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Holder::parse(&content))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Drop for RunLock {
  fn drop(&mut self) {
    // A stale holder would be reported to the next blocked process.
    if self.mode == LockMode::Exclusive {
      let _ = self.file.set_len(0);
    }
  }
}

/// `Ok(false)` when another process holds a conflicting lock.
#[cfg(unix)]
fn lock_nonblocking(file: &File, mode: LockMode) -> io::Result<bool> {
  use rustix::fs::{FlockOperation, flock};
  use rustix::io::Errno;

  let operation = match mode {
    LockMode::Shared => FlockOperation::NonBlockingLockShared,
    LockMode::Exclusive => FlockOperation::NonBlockingLockExclusive,
  };
  match flock(file, operation) {
    Ok(()) => Ok(true),
    Err(e) if e == Errno::WOULDBLOCK => Ok(false),
    Err(e) => Err(e.into()),
  }
}

#[cfg(windows)]
fn lock_nonblocking(file: &File, mode: LockMode) -> io::Result<bool> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};
  use windows_sys::Win32::System::IO::OVERLAPPED;

  let flags = match mode {
    LockMode::Shared => LOCKFILE_FAIL_IMMEDIATELY,
    LockMode::Exclusive => LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
  };

  // SAFETY: the handle is owned by `file` and outlives the call; a zeroed
  // OVERLAPPED locks from offset 0.
  let locked = unsafe {
    let mut overlapped: OVERLAPPED = std::mem::zeroed();
    LockFileEx(file.as_raw_handle() as HANDLE, flags, 0, 1, 0, &mut overlapped)
  };
  if locked != 0 {
    return Ok(true);
  }

  let err = io::Error::last_os_error();
  if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
    Ok(false)
  } else {
    Err(err)
  }
}
