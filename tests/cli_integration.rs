//! CLI integration tests for the coordinator binary.
//!
//! Each test lays out a host with module trees on disk, writes a
//! `Coordinator.toml` for it and runs the binary against that file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the coordinator binary command.
fn coordinator(host: &Path) -> Command {
    let mut cmd = Command::cargo_bin("coordinator").unwrap();
    cmd.current_dir(host)
        .env_remove("AUTOLOAD_COORDINATOR_REF")
        .env_remove("AUTOLOAD_COORDINATOR_CONFIG")
        .args(["--config", "Coordinator.toml", "--no-cache"]);
    cmd
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Write a module bundling `acme/log` at `version`.
fn write_module(host: &Path, slug: &str, version: &str) -> PathBuf {
    let vendor = host.join("modules").join(slug).join("vendor");
    write(
        &vendor.join("shared/log/package.json"),
        &format!(r#"{{"name": "acme/log", "version": "{}"}}"#, version),
    );
    write(&vendor.join("shared/log/src/Writer.inc"), slug);
    write(&vendor.join("shared/log/helpers.inc"), version);
    write(
        &vendor.join("autoload/namespaces.json"),
        r#"{"Shared\\Log\\": "shared/log/src"}"#,
    );
    write(
        &vendor.join("autoload/files.json"),
        &format!(r#"{{"{}-log": "shared/log/helpers.inc"}}"#, slug),
    );
    vendor
}

/// A host with `alpha` (1.0.0) and `beta` (2.0.0).
fn two_module_host() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_module(tmp.path(), "alpha", "1.0.0");
    write_module(tmp.path(), "beta", "2.0.0");
    write(
        &tmp.path().join("Coordinator.toml"),
        r#"
[[module]]
slug = "alpha"
root_dir = "modules/alpha"

[[module]]
slug = "beta"
root_dir = "modules/beta"
"#,
    );
    tmp
}

// ============================================================================
// coordinator inspect
// ============================================================================

#[test]
fn test_inspect_reports_highest_version() {
    let host = two_module_host();

    coordinator(host.path())
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("highest version: acme/log 2.0.0"))
        .stdout(predicate::str::contains("run      beta-log"))
        .stdout(predicate::str::contains("run      alpha-log"));
}

#[test]
fn test_inspect_json() {
    let host = two_module_host();

    let output = coordinator(host.path())
        .args(["inspect", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["preferred"], "core");
    assert_eq!(report["modules"].as_array().unwrap().len(), 2);
    assert_eq!(report["resolutions"][0]["reason"]["kind"], "highest_version");
    assert_eq!(report["stats"]["index_scans"], 1);

    let chosen = report["mapping"]["namespace_map"]["Shared\\Log\\"][0]
        .as_str()
        .unwrap();
    assert!(chosen.contains("beta"), "chose {}", chosen);
}

#[test]
fn test_inspect_honors_preferred_env() {
    let host = two_module_host();

    coordinator(host.path())
        .arg("inspect")
        .env("AUTOLOAD_COORDINATOR_REF", "alpha")
        .assert()
        .success()
        .stdout(predicate::str::contains("Preferred: alpha"))
        .stdout(predicate::str::contains("preferred module `alpha`"));
}

#[test]
fn test_inspect_single_module_skips_arbitration() {
    let tmp = TempDir::new().unwrap();
    write_module(tmp.path(), "alpha", "1.0.0");
    write(
        &tmp.path().join("Coordinator.toml"),
        "[[module]]\nslug = \"alpha\"\nroot_dir = \"modules/alpha\"\n",
    );

    coordinator(tmp.path())
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("(none arbitrated)"));
}

#[test]
fn test_inspect_fails_without_config() {
    let tmp = TempDir::new().unwrap();

    coordinator(tmp.path())
        .arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find"));
}

#[test]
fn test_inspect_fails_on_invalid_config() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("Coordinator.toml"), "[[module]\nslug = ");

    coordinator(tmp.path())
        .arg("inspect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse host config"));
}

// ============================================================================
// coordinator index
// ============================================================================

#[test]
fn test_index_lists_winner() {
    let host = two_module_host();

    coordinator(host.path())
        .arg("index")
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/log 2.0.0 (beta)"));
}

#[test]
fn test_index_skips_broken_descriptors() {
    let host = two_module_host();
    let shared = host.path().join("modules/alpha/vendor/shared");
    write(&shared.join("broken/package.json"), "{ not json");
    write(&shared.join("nameless/package.json"), r#"{"version": "9.9.9"}"#);
    write(
        &shared.join("icons/icon/package.json"),
        r#"{"name": "acme/icons", "version": "0.3.0"}"#,
    );

    coordinator(host.path())
        .args(["index", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/icons"))
        .stdout(predicate::str::contains("9.9.9").not());
}

// ============================================================================
// coordinator resolve
// ============================================================================

#[test]
fn test_resolve_class_to_winning_copy() {
    let host = two_module_host();
    coordinator(host.path())
        .args(["resolve", "Shared\\Log\\Writer"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "modules/beta/vendor/shared/log/src/Writer.inc",
        ));
}

#[test]
fn test_resolve_unknown_class() {
    let host = two_module_host();

    coordinator(host.path())
        .args(["resolve", "Shared\\Log\\Missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not resolve"));
}

// ============================================================================
// coordinator cache
// ============================================================================

#[test]
fn test_cache_path_uses_override() {
    let host = two_module_host();
    let dir = host.path().join("cache");

    coordinator(host.path())
        .args(["cache", "path", "--cache-dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(dir.display().to_string()));
}

#[test]
fn test_cache_clear_after_inspect() {
    let host = two_module_host();
    let dir = host.path().join("cache");

    let mut cmd = Command::cargo_bin("coordinator").unwrap();
    cmd.current_dir(host.path())
        .env_remove("AUTOLOAD_COORDINATOR_REF")
        .args(["--config", "Coordinator.toml", "--cache-dir"])
        .arg(&dir)
        .arg("inspect")
        .assert()
        .success();
    assert!(fs::read_dir(&dir).unwrap().count() > 0);

    let mut cmd = Command::cargo_bin("coordinator").unwrap();
    cmd.current_dir(host.path())
        .args(["--config", "Coordinator.toml", "--cache-dir"])
        .arg(&dir)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Cleared cached package data for 2 modules"));
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
}
