// domain-validator/tests/cli_integration.rs

use assert_cmd::prelude::*;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command isolated from the caller's config files and DV_* variables
fn validator_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("domain-validator").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    for var in [
        "DV_BATCH_SIZE",
        "DV_BATCH_TIMEOUT",
        "DV_INCLUDE_FAILED",
        "DV_RETRY",
        "DV_RETRY_SCOPE",
        "DV_REQUEST_TIMEOUT",
        "DV_CONNECT_TIMEOUT",
        "DV_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Mock server with one live page and one parked page
async fn start_sites() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Open for business</h1>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/parked"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Domain For Sale</h1>"))
        .mount(&server)
        .await;
    server
}

fn write_source(dir: &TempDir, server: &MockServer) -> std::path::PathBuf {
    let source = dir.path().join("sites.csv");
    fs::write(
        &source,
        format!(
            "live,{uri}/live\nparked,{uri}/parked\nblank,\n",
            uri = server.uri()
        ),
    )
    .unwrap();
    source
}

#[test]
fn test_help_shows_flags() {
    let dir = TempDir::new().unwrap();
    let mut cmd = validator_cmd(dir.path());
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--url-index"))
        .stdout(predicate::str::contains("--batch-timeout"))
        .stdout(predicate::str::contains("--retry-scope"));
}

#[test]
fn test_missing_required_args_fail() {
    let dir = TempDir::new().unwrap();
    let mut cmd = validator_cmd(dir.path());
    cmd.args(["-s", "in.csv", "-d", "out.csv"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--url-index"));
}

#[test]
fn test_unreadable_source_fails_without_creating_dest() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("out.csv");

    let mut cmd = validator_cmd(dir.path());
    cmd.args(["-s", "missing.csv", "-d", dest.to_str().unwrap(), "-i", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open source table"));
    assert!(!dest.exists());
}

#[test]
fn test_zero_batch_size_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("in.csv"), "a.com\n").unwrap();

    let mut cmd = validator_cmd(dir.path());
    cmd.args(["-s", "in.csv", "-d", "out.csv", "-i", "0", "-b", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Batch size must be at least 1"));
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("in.csv"), "a.com\n").unwrap();
    let config_path = dir.path().join("bad.toml");
    fs::write(&config_path, "[defaults]\nbatch_timeout = \"whenever\"\n").unwrap();

    let mut cmd = validator_cmd(dir.path());
    cmd.args([
        "-s",
        "in.csv",
        "-d",
        "out.csv",
        "-i",
        "0",
        "--config",
        config_path.to_str().unwrap(),
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unwritable_dest_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, &server);
    let dest = dir.path().join("no-such-dir").join("out.csv");

    let mut cmd = validator_cmd(dir.path());
    cmd.args([
        "-s",
        source.to_str().unwrap(),
        "-d",
        dest.to_str().unwrap(),
        "-i",
        "1",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    output
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to create destination table"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_end_to_end_drops_parked_rows() {
    let server = start_sites().await;
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, &server);
    let dest = dir.path().join("out.csv");

    let mut cmd = validator_cmd(dir.path());
    cmd.args([
        "-s",
        source.to_str().unwrap(),
        "-d",
        dest.to_str().unwrap(),
        "-i",
        "1",
        "-f",
        "false",
        "--json",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["stats"]["invalid_domains"], 1);
    assert_eq!(summary["stats"]["failed_requests"], 0);
    assert_eq!(summary["stats"]["skipped_rows"], 1);
    assert_eq!(summary["stats"]["written"], 1);
    assert!(summary.get("retry_pass").is_none());

    let written = fs::read_to_string(&dest).unwrap();
    assert_eq!(written, format!("live,{}/live\n", server.uri()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_env_config_and_cli_precedence() {
    let server = start_sites().await;
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, &server);
    let dest = dir.path().join("out.csv");

    // A discovered config file sets the batch size, the environment
    // overrides it, and the CLI enables the retry pass.
    fs::write(
        dir.path().join("domain-validator.toml"),
        "[defaults]\nbatch_size = 7\ninclude_failed = false\n",
    )
    .unwrap();

    let mut cmd = validator_cmd(dir.path());
    cmd.env("DV_BATCH_SIZE", "1").args([
        "-s",
        source.to_str().unwrap(),
        "-d",
        dest.to_str().unwrap(),
        "-i",
        "1",
        "-r",
        "--json",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["first_pass"]["batch_size"], 1);
    assert_eq!(summary["first_pass"]["batches"], 3);
    assert_eq!(summary["retry_pass"]["batch_size"], 10);
    assert_eq!(summary["retry_pass"]["records"], 0);

    // include_failed = false came from the config file.
    let written = fs::read_to_string(&dest).unwrap();
    assert!(written.contains("/live"));
    assert!(!written.contains("/parked"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_header_row_and_pretty_summary() {
    let server = start_sites().await;
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("sites.csv");
    fs::write(
        &source,
        format!("name;url\nlive;{uri}/live\nparked;{uri}/parked\n", uri = server.uri()),
    )
    .unwrap();
    let dest = dir.path().join("out.csv");

    let mut cmd = validator_cmd(dir.path());
    cmd.args([
        "-s",
        source.to_str().unwrap(),
        "-d",
        dest.to_str().unwrap(),
        "-i",
        "1",
        "--has-headers",
        "--delimiter",
        ";",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    output
        .assert()
        .success()
        .stdout(predicate::str::contains("domain-validator"))
        .stdout(predicate::str::contains("1 parked"))
        .stdout(predicate::str::contains("0 failed"));

    let written = fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "name;url");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_urls_still_exit_zero() {
    let server = start_sites().await;
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("sites.csv");
    // Nothing listens on port 1, so the second row fails to connect.
    fs::write(
        &source,
        format!("live,{}/live\nrefused,127.0.0.1:1/\n", server.uri()),
    )
    .unwrap();
    let dest = dir.path().join("out.csv");

    let mut cmd = validator_cmd(dir.path());
    cmd.args([
        "-s",
        source.to_str().unwrap(),
        "-d",
        dest.to_str().unwrap(),
        "-i",
        "1",
        "--json",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    let output = output.assert().success().get_output().clone();

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["stats"]["failed_requests"], 1);
    assert_eq!(summary["stats"]["written"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_retry_overrides_config_file() {
    let server = start_sites().await;
    let dir = TempDir::new().unwrap();
    let source = write_source(&dir, &server);
    let dest = dir.path().join("out.csv");
    fs::write(
        dir.path().join("domain-validator.toml"),
        "[defaults]\nretry = true\n",
    )
    .unwrap();

    let mut cmd = validator_cmd(dir.path());
    cmd.env("DV_RETRY", "true").args([
        "-s",
        source.to_str().unwrap(),
        "-d",
        dest.to_str().unwrap(),
        "-i",
        "1",
        "--no-retry",
        "--json",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(summary.get("retry_pass").is_none());
}
