//! Function builds.
//!
//! Each function is compiled to a single binary for the configured target,
//! fingerprinted, and packaged only when its fingerprint changed since the
//! last run.
//!
//! # Submodules
//!
//! - [`compile`] - toolchain invocation ([`Compiler`], [`GoCompiler`])
//! - [`package`] - bundle creation ([`Packager`], [`ZipPackager`])
//! - [`execute`] - the concurrent pipeline ([`Orchestrator`])

pub mod compile;
pub mod execute;
pub mod package;
mod types;

pub use compile::{Compiler, GoCompiler};
pub use execute::Orchestrator;
pub use package::{Packager, ZipPackager};
pub use types::*;
