//! `stagehand project` against a real config file.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::cli_tests::stagehand;

const CONFIG: &str = "\
active_project: staging
projects:
  staging:
    server: { host: staging.example.org, user: deploy }
    content_root: /var/www/staging/wp-content
  production:
    server: { host: www.example.org, user: deploy }
    content_root: /var/www/site/wp-content
";

fn home_with_config() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("config.yaml"), CONFIG).unwrap();
    home
}

#[test]
fn test_list_marks_active_project() {
    let home = home_with_config();
    stagehand(home.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* staging"))
        .stdout(predicate::str::contains("www.example.org"));
}

#[test]
fn test_list_json() {
    let home = home_with_config();
    let out = stagehand(home.path())
        .args(["project", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let projects = value.as_array().unwrap();
    assert_eq!(projects.len(), 2);
    let staging = projects.iter().find(|p| p["name"] == "staging").unwrap();
    assert_eq!(staging["active"], true);
    assert_eq!(staging["host"], "staging.example.org");
}

#[test]
fn test_list_with_no_config_file() {
    let home = tempfile::tempdir().unwrap();
    stagehand(home.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects configured"));
}

#[test]
fn test_use_switches_active_project_and_persists() {
    let home = home_with_config();
    stagehand(home.path())
        .args(["project", "use", "production"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Active project: production"));

    let saved = std::fs::read_to_string(home.path().join("config.yaml")).unwrap();
    assert!(saved.contains("active_project: production"));

    stagehand(home.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* production"));
}

#[test]
fn test_use_unknown_project_lists_valid_names() {
    let home = home_with_config();
    stagehand(home.path())
        .args(["project", "use", "qa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("qa"))
        .stderr(predicate::str::contains("production, staging"));

    let saved = std::fs::read_to_string(home.path().join("config.yaml")).unwrap();
    assert!(saved.contains("active_project: staging"));
}
