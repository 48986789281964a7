use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const STAGING_CONFIG: &str = r#"{
  "default_deploy_target": "staging",
  "staging": { "deploy_credentials": { "host": "x" } }
}"#;

fn pstasks(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pstasks").expect("binary exists");
    cmd.current_dir(project).env_remove("PSTASKS_ROOT");
    cmd
}

#[test]
#[serial]
fn fails_when_no_configuration_source_exists() {
    let project = tempdir().unwrap();

    pstasks(project.path())
        .arg("clean")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PSTASKS_ROOT"));
}

#[test]
#[serial]
fn fails_for_unreadable_explicit_config_path() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("gulp.config.json"), STAGING_CONFIG).unwrap();
    let empty = tempdir().unwrap();

    // The valid project-local file must NOT rescue a broken --config.
    pstasks(project.path())
        .arg("--config")
        .arg(empty.path())
        .arg("clean")
        .assert()
        .failure()
        .stderr(predicate::str::contains("gulp.config.json"));
}

#[test]
#[serial]
fn clean_removes_build_output_but_keeps_archives() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("gulp.config.json"), STAGING_CONFIG).unwrap();
    fs::create_dir_all(project.path().join("dist/build")).unwrap();
    fs::write(project.path().join("dist/junk.txt"), "junk").unwrap();
    fs::write(project.path().join("dist/build/old.zip"), "kept").unwrap();

    pstasks(project.path()).arg("clean").assert().success();

    assert!(!project.path().join("dist/junk.txt").exists());
    assert!(project.path().join("dist/build/old.zip").exists());
}

/// Without --env and without default_deploy_target the run must fail before
/// touching the filesystem.
#[test]
#[serial]
fn missing_deploy_target_fails_before_any_side_effect() {
    let project = tempdir().unwrap();
    fs::write(
        project.path().join("gulp.config.json"),
        r#"{"staging":{"deploy_credentials":{"host":"x"}}}"#,
    )
    .unwrap();
    fs::create_dir_all(project.path().join("dist")).unwrap();
    fs::write(project.path().join("dist/marker.txt"), "untouched").unwrap();

    pstasks(project.path())
        .arg("clean")
        .assert()
        .failure()
        .stderr(predicate::str::contains("deploy target"));

    assert!(
        project.path().join("dist/marker.txt").exists(),
        "failing before task execution must leave the tree untouched"
    );
}

#[test]
#[serial]
fn explicit_env_overrides_missing_default() {
    let project = tempdir().unwrap();
    fs::write(
        project.path().join("gulp.config.json"),
        r#"{"staging":{"deploy_credentials":{"host":"x"}}}"#,
    )
    .unwrap();

    // Even an environment missing from the mapping is accepted explicitly.
    pstasks(project.path())
        .arg("--env")
        .arg("prod")
        .arg("clean")
        .assert()
        .success();
}

#[test]
#[serial]
fn config_option_names_the_directory_to_search() {
    let project = tempdir().unwrap();
    let config_dir = tempdir().unwrap();
    fs::write(config_dir.path().join("gulp.config.json"), STAGING_CONFIG).unwrap();

    pstasks(project.path())
        .arg("--config")
        .arg(config_dir.path())
        .arg("clean")
        .assert()
        .success();
}
