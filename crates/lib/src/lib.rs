//! fnpack-lib: build, fingerprint and package serverless functions.
//!
//! This crate provides:
//! - `Manifest`: the function list and cache backend from `functions.yaml`
//! - `CacheStore`: the persisted path -> digest cache (local file or S3)
//! - `Orchestrator`: concurrent compile / hash / package pipeline
//! - `RunLock`: keeps two runs from sharing one project at the same time

pub mod build;
pub mod cache;
pub mod config;
pub mod consts;
pub mod manifest;
pub mod run_lock;
pub mod util;
