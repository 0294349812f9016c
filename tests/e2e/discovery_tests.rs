//! E2E tests for configuration discovery.
//!
//! These tests verify that the locator can:
//! - Pick the right file when several formats exist
//! - Look one directory up, and no further
//! - Walk a monorepo, stopping at projects and skipping artifact directories

use crate::common::write_project;
use workercfg::config::{discover_projects, find_config, find_config_up, MAX_DISCOVERY_DEPTH};

#[test]
fn test_find_config_prefers_jsonc() {
    let tmp = tempfile::tempdir().unwrap();
    write_project(tmp.path(), "toml");
    write_project(tmp.path(), "json");
    write_project(tmp.path(), "jsonc");

    let found = find_config(tmp.path()).expect("config should be found");
    assert_eq!(found.file_name().unwrap(), "wrangler.jsonc");
}

#[test]
fn test_find_config_empty_dir() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(find_config(tmp.path()).is_none());
}

#[test]
fn test_find_config_up_from_subdirectory() {
    let tmp = tempfile::tempdir().unwrap();
    let expected = write_project(tmp.path(), "toml");
    let sub = tmp.path().join("src");
    std::fs::create_dir(&sub).unwrap();

    assert_eq!(find_config_up(&sub), Some(expected));
}

#[test]
fn test_discover_projects_sorted_and_leaf() {
    // Arrange: two workers, one with a nested project that must be ignored
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_project(&root.join("workers/b"), "toml");
    write_project(&root.join("workers/a"), "jsonc");
    write_project(&root.join("workers/a/nested"), "toml");

    // Act
    let projects = discover_projects(root);

    // Assert
    let dirs: Vec<_> = projects
        .iter()
        .map(|p| p.dir.strip_prefix(root).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        dirs,
        vec![
            std::path::PathBuf::from("workers/a"),
            std::path::PathBuf::from("workers/b")
        ]
    );
    assert_eq!(projects[0].config.file_name().unwrap(), "wrangler.jsonc");
}

#[test]
fn test_discover_projects_skips_denylisted_and_hidden() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_project(&root.join("node_modules/pkg"), "toml");
    write_project(&root.join(".git/hooks"), "toml");
    write_project(&root.join(".wrangler/tmp"), "toml");
    write_project(&root.join("dist"), "toml");
    write_project(&root.join("apps/api"), "toml");

    let projects = discover_projects(root);
    assert_eq!(projects.len(), 1);
    assert!(projects[0].dir.ends_with("apps/api"));
}

#[test]
fn test_discover_projects_depth_bound() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let mut within = root.to_path_buf();
    for i in 0..MAX_DISCOVERY_DEPTH {
        within.push(format!("d{i}"));
    }
    write_project(&within, "toml");

    let mut beyond = root.join("deep");
    for i in 0..MAX_DISCOVERY_DEPTH {
        beyond.push(format!("d{i}"));
    }
    write_project(&beyond, "toml");

    let projects = discover_projects(root);
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].dir, within);
}

#[test]
fn test_discover_root_is_project() {
    let tmp = tempfile::tempdir().unwrap();
    write_project(tmp.path(), "toml");
    write_project(&tmp.path().join("child"), "toml");

    let projects = discover_projects(tmp.path());
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].dir, tmp.path());
}
