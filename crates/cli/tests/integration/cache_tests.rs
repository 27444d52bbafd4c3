//! Cache subcommand integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

fn built_project() -> TestEnv {
  let env = TestEnv::new();
  env.write_manifest(
    r#"
functions:
  - name: alpha
    path: functions/alpha
"#,
  );
  env.write_function("functions/alpha", "package main\n");
  env.fnpack_cmd().arg("build").assert().success();
  env
}

#[test]
fn show_lists_recorded_paths() {
  let env = built_project();

  env
    .fnpack_cmd()
    .args(["cache", "show"])
    .assert()
    .success()
    .stdout(predicate::str::contains("functions/alpha"));
}

#[test]
fn show_json_matches_cache_file() {
  let env = built_project();

  let output = env.fnpack_cmd().args(["cache", "show", "--format", "json"]).output().unwrap();
  let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

  assert_eq!(shown["entries"], env.cache_json()["entries"]);
}

#[test]
fn clear_forces_a_full_rebuild() {
  let env = built_project();

  env
    .fnpack_cmd()
    .args(["cache", "clear"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Cleared cache"));
  assert!(!env.cache_path().exists());

  env
    .fnpack_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("alpha packaged"));
}

#[test]
fn show_reports_a_malformed_cache_instead_of_panicking() {
  let env = built_project();
  std::fs::write(
    env.cache_path(),
    r#"{"version": 1, "entries": [{"path": "functions/alpha", "digest": "aéééééééé"}]}"#,
  )
  .unwrap();

  env
    .fnpack_cmd()
    .args(["cache", "show"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("malformed digest"))
    .stderr(predicate::str::contains("panicked").not());
}
