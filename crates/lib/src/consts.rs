//! Names and defaults shared across the crate.

pub const APP_NAME: &str = "fnpack";

/// Manifest file looked up in the working directory when none is given.
pub const DEFAULT_MANIFEST: &str = "functions.yaml";

/// Per-project state directory, created next to the manifest.
pub const STATE_DIR: &str = ".fnpack";

/// Local cache document inside [`STATE_DIR`].
pub const CACHE_FILENAME: &str = "cache.json";

/// Run lock inside [`STATE_DIR`].
pub const LOCK_FILENAME: &str = ".lock";

/// Version written into (and required from) every cache document.
pub const CACHE_VERSION: u32 = 1;

/// Default per-function layout: `<path>/main.go` builds to `<path>/main`,
/// packaged as `<path>/archive.zip`.
pub const DEFAULT_ENTRYPOINT: &str = "main.go";
pub const DEFAULT_BINARY: &str = "main";
pub const DEFAULT_ARCHIVE: &str = "archive.zip";

pub const DEFAULT_TOOLCHAIN: &str = "go";
pub const DEFAULT_TARGET_OS: &str = "linux";
pub const DEFAULT_TARGET_ARCH: &str = "amd64";

/// Length of digests shown in human output.
pub const SHORT_HASH_LEN: usize = 12;
