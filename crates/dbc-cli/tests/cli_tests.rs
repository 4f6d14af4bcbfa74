//! Integration tests for all CLI commands
//!
//! Tests each command with real invocations against archives built on the fly.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::{FileOptions, ZipWriter};

/// Helper to create a CLI command isolated from real config files
fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dbc2ipynb"));
    cmd.current_dir(home)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to write a small archive with one notebook and one manifest
fn sample_dbc(dir: &Path) -> PathBuf {
    let path = dir.join("export.dbc");
    let mut zip = ZipWriter::new(fs::File::create(&path).unwrap());
    let options: FileOptions<()> = FileOptions::default();

    zip.start_file("MANIFEST.MF", options).unwrap();
    zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
    zip.start_file("Shared/nb1.python", options).unwrap();
    zip.write_all(
        br#"{"name":"demo","language":"python","commands":[
            {"position":2,"command":"print(2)"},
            {"position":1,"command":"print(1)"}]}"#,
    )
    .unwrap();

    zip.finish().unwrap();
    path
}

// ============ CONVERT COMMAND TESTS ============

#[test]
fn test_convert_help() {
    let home = TempDir::new().unwrap();
    cli(home.path())
        .arg("convert")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert every notebook"));
}

#[test]
fn test_convert_default_output_dir() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());
    let expected = home.path().join("export_ipynb").join("demo.ipynb");

    cli(home.path())
        .arg("convert")
        .arg(&dbc)
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.ipynb"))
        .stderr(predicate::str::contains("Converted"));

    assert!(expected.exists());
    let notebook: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&expected).unwrap()).unwrap();
    assert_eq!(notebook["cells"].as_array().unwrap().len(), 2);
    assert_eq!(notebook["cells"][0]["source"][0], "print(1)");
    assert_eq!(notebook["metadata"]["kernelspec"]["display_name"], "Python 3");
}

#[test]
fn test_convert_output_dir_and_json_report() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());
    let out = home.path().join("converted");

    let output = cli(home.path())
        .arg("convert")
        .arg(&dbc)
        .arg("-o")
        .arg(&out)
        .arg("--json")
        .arg("--quiet")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["written"].as_array().unwrap().len(), 1);
    assert_eq!(report["entries"], 2);
    assert_eq!(report["skipped"], 1);
    assert!(out.join("demo.ipynb").exists());
}

#[test]
fn test_convert_invalid_archive_fails() {
    let home = TempDir::new().unwrap();
    let bogus = home.path().join("bogus.dbc");
    fs::write(&bogus, "not a zip").unwrap();

    cli(home.path())
        .arg("convert")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid ZIP/DBC file"));
}

#[test]
fn test_convert_missing_archive_fails() {
    let home = TempDir::new().unwrap();

    cli(home.path())
        .arg("convert")
        .arg(home.path().join("missing.dbc"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid ZIP/DBC file"));
    assert!(!home.path().join("missing_ipynb").exists());
}

#[test]
fn test_convert_uses_project_config() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());
    fs::write(
        home.path().join(".dbc2ipynb.toml"),
        "[convert]\noutput_dir = \"from-config\"\n",
    )
    .unwrap();

    cli(home.path()).arg("convert").arg(&dbc).assert().success();

    assert!(home.path().join("from-config").join("demo.ipynb").exists());
}

#[test]
fn test_convert_rejects_bad_size() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());

    cli(home.path())
        .arg("convert")
        .arg(&dbc)
        .arg("--max-entry-size")
        .arg("lots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid number"));
}

// ============ LIST COMMAND TESTS ============

#[test]
fn test_list_entries() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());

    cli(home.path())
        .arg("list")
        .arg(&dbc)
        .assert()
        .success()
        .stdout(predicate::str::contains("MANIFEST.MF"))
        .stdout(predicate::str::contains("manifest"))
        .stdout(predicate::str::contains("Shared/nb1.python"))
        .stdout(predicate::str::contains("2 entries"));
}

#[test]
fn test_list_json() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());

    let output = cli(home.path())
        .arg("list")
        .arg(&dbc)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries[0]["payload"], "manifest");
    assert_eq!(entries[1]["payload"]["decoded"], "json");
    assert_eq!(entries[1]["notebooks"], 1);
}

// ============ INSPECT COMMAND TESTS ============

#[test]
fn test_inspect_written_notebook() {
    let home = TempDir::new().unwrap();
    let dbc = sample_dbc(home.path());
    let out = home.path().join("out");

    cli(home.path())
        .arg("convert")
        .arg(&dbc)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    cli(home.path())
        .arg("inspect")
        .arg(out.join("demo.ipynb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("python3"))
        .stdout(predicate::str::contains("Cells: 2"))
        .stdout(predicate::str::contains("print(2)"));
}

// ============ CONFIG COMMAND TESTS ============

#[test]
fn test_config_init_and_show() {
    let home = TempDir::new().unwrap();

    cli(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(home.path().join(".dbc2ipynb.toml").exists());

    cli(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cli(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_entry_size = 100000000"));
}
