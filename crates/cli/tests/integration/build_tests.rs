//! Build command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, names_with_outcome};

const TWO_FUNCTIONS: &str = r#"
functions:
  - name: alpha
    path: functions/alpha
  - name: beta
    path: functions/beta
"#;

fn two_function_project() -> TestEnv {
  let env = TestEnv::new();
  env.write_manifest(TWO_FUNCTIONS);
  env.write_function("functions/alpha", "package main // alpha v1\n");
  env.write_function("functions/beta", "package main // beta v1\n");
  env
}

#[test]
fn first_build_packages_every_function() {
  let env = two_function_project();

  env
    .fnpack_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("alpha packaged"))
    .stdout(predicate::str::contains("beta packaged"))
    .stdout(predicate::str::contains("Packaged: 2"));

  assert!(env.function_dir("functions/alpha").join("main").exists());
  assert!(env.function_dir("functions/alpha").join("archive.zip").exists());
  assert!(env.function_dir("functions/beta").join("archive.zip").exists());
  assert_eq!(env.cached_paths(), vec!["functions/alpha", "functions/beta"]);
}

#[test]
fn second_build_without_changes_packages_nothing() {
  let env = two_function_project();
  env.build_json(&[]);
  let first_cache = env.cache_json();

  let report = env.build_json(&[]);

  assert_eq!(report["packaged"], 0);
  assert_eq!(report["unchanged"], 2);
  assert_eq!(names_with_outcome(&report, "unchanged"), vec!["alpha", "beta"]);
  assert_eq!(env.cache_json(), first_cache);
}

#[test]
fn only_the_edited_function_is_repackaged() {
  let env = two_function_project();
  env.build_json(&[]);

  env.write_function("functions/beta", "package main // beta v2\n");
  let report = env.build_json(&[]);

  assert_eq!(names_with_outcome(&report, "packaged"), vec!["beta"]);
  assert_eq!(names_with_outcome(&report, "unchanged"), vec!["alpha"]);
}

#[test]
fn changing_the_target_repackages_everything() {
  let env = two_function_project();
  env.build_json(&[]);

  let report = env.build_json(&["--goarch", "arm64"]);

  assert_eq!(names_with_outcome(&report, "packaged"), vec!["alpha", "beta"]);
}

#[test]
fn compile_failure_does_not_affect_other_functions() {
  let env = two_function_project();
  env.write_function("functions/alpha", "package main // FAIL\n");

  let report = env.build_json(&[]);

  assert_eq!(names_with_outcome(&report, "compile-failed"), vec!["alpha"]);
  assert_eq!(names_with_outcome(&report, "packaged"), vec!["beta"]);
  assert_eq!(env.cached_paths(), vec!["functions/beta"]);
  assert!(!env.function_dir("functions/alpha").join("archive.zip").exists());
}

#[test]
fn missing_entrypoint_is_reported_and_skipped() {
  let env = TestEnv::new();
  env.write_manifest(TWO_FUNCTIONS);
  env.write_function("functions/beta", "package main\n");

  env
    .fnpack_cmd()
    .arg("build")
    .assert()
    .success()
    .stderr(predicate::str::contains("alpha"))
    .stdout(predicate::str::contains("Failed: 1"));

  assert_eq!(env.cached_paths(), vec!["functions/beta"]);
}

#[test]
fn failed_function_is_rebuilt_once_fixed() {
  let env = two_function_project();
  env.build_json(&[]);

  env.write_function("functions/alpha", "package main // FAIL\n");
  env.build_json(&[]);
  assert_eq!(env.cached_paths(), vec!["functions/beta"]);

  env.write_function("functions/alpha", "package main // alpha v1\n");
  let report = env.build_json(&[]);
  assert_eq!(names_with_outcome(&report, "packaged"), vec!["alpha"]);
}

#[test]
fn strict_exits_non_zero_on_failure() {
  let env = two_function_project();
  env.write_function("functions/alpha", "package main // FAIL\n");

  env.fnpack_cmd().args(["build", "--strict"]).assert().code(1);

  // Non-strict runs report the failure but still succeed
  env.fnpack_cmd().arg("build").assert().success();
}

#[test]
fn removed_function_is_dropped_from_cache() {
  let env = two_function_project();
  env.build_json(&[]);

  env.write_manifest(
    r#"
functions:
  - name: alpha
    path: functions/alpha
"#,
  );
  env.build_json(&[]);

  assert_eq!(env.cached_paths(), vec!["functions/alpha"]);
}

#[test]
fn incomplete_remote_backend_uses_local_cache() {
  let env = TestEnv::new();
  env.write_manifest(
    r#"
backend:
  config:
    bucket: artifacts
    key: cache.json
    region: ""
functions:
  - name: alpha
    path: functions/alpha
"#,
  );
  env.write_function("functions/alpha", "package main\n");

  let report = env.build_json(&[]);

  assert_eq!(report["save_error"], serde_json::Value::Null);
  assert_eq!(env.cached_paths(), vec!["functions/alpha"]);
}

#[test]
fn cache_override_moves_the_cache_file() {
  let env = two_function_project();
  let custom = env.root().join("state").join("digests.json");

  env
    .fnpack_cmd()
    .arg("build")
    .arg("--cache")
    .arg(&custom)
    .assert()
    .success();

  assert!(custom.exists());
  assert!(!env.cache_path().exists());
}

#[test]
fn single_job_builds_everything() {
  let env = two_function_project();

  let report = env.build_json(&["--jobs", "1"]);

  assert_eq!(report["packaged"], 2);
  assert_eq!(report["success"], true);
}

#[test]
fn corrupt_cache_rebuilds_everything() {
  let env = two_function_project();
  env.build_json(&[]);
  std::fs::write(env.cache_path(), "not json").unwrap();

  let report = env.build_json(&[]);

  assert_eq!(names_with_outcome(&report, "packaged"), vec!["alpha", "beta"]);
  assert!(report["load_error"].is_string());
  assert_eq!(env.cached_paths(), vec!["functions/alpha", "functions/beta"]);
}
