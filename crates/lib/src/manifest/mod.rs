//! Function manifest.
//!
//! The manifest names every deployable function and where its sources live,
//! plus an optional remote backend for the build cache. It is read once at the
//! start of a run and never mutated.

mod types;

pub use types::*;
