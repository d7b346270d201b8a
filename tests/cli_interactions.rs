//! CLI options interaction tests
//!
//! These run the `hprobe` binary end to end: argument and `.env` handling,
//! exit codes, and the event lines printed for slow and failed requests.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use regex::Regex;
use std::fs;
use std::net::TcpListener;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: &[&str] = &[
    "TARGET_URL",
    "INTERVAL_US",
    "TIMEOUT_MS",
    "RESOLVE",
    "SAMPLE_BUFFER",
    "SEND_POLICY",
    "LOG_FORMAT",
    "ENABLE_COLOR",
];

/// Command running in an empty directory with no inherited configuration
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hprobe").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

async fn run_blocking(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn event_line(kind: &str) -> Regex {
    Regex::new(&format!(
        r"^\d{{4}}-\d{{2}}-\d{{2}} \d{{2}}:\d{{2}}:\d{{2}} \| {} \| +\d+ms \| ",
        kind
    ))
    .unwrap()
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--resolve"))
        .stdout(predicate::str::contains("--interval"));
}

#[test]
fn test_missing_url_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Target URL must be set"));
}

#[test]
fn test_malformed_resolve_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--url", "http://localhost/ping", "--resolve", "example.com:443"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("host:port:address"));
}

#[test]
fn test_invalid_env_file_value_is_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env"),
        "TARGET_URL=http://localhost/ping\nINTERVAL_US=often\n",
    )
    .unwrap();

    create_test_cmd(&dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("INTERVAL_US"));
}

#[test]
fn test_unknown_log_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--url", "http://localhost/ping", "--log-format", "xml"])
        .assert()
        .failure();
}

#[test]
fn test_print_env_outputs_template() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--print-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("# TARGET_URL="))
        .stdout(predicate::str::contains("# SEND_POLICY=block"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fast_responses_print_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--url", &format!("{}/ping", server.uri()), "--interval", "20000", "-n", "2"]);

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_response_prints_slow_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("sleepy")
                .set_delay(std::time::Duration::from_millis(600)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--url", &format!("{}/ping", server.uri()), "--interval", "10000", "-n", "1"]);

    let output = run_blocking(cmd).await;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().expect("slow line");
    assert!(event_line("slow").is_match(line), "unexpected line: {}", line);
    assert!(Regex::new(r" \| sleepy \| \d+$").unwrap().is_match(line));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refused_connection_prints_error_line() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    cmd.args([
        "--url",
        &format!("http://127.0.0.1:{}/ping", port),
        "--interval",
        "10000",
        "-n",
        "1",
    ]);

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "network errors must not end the run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().expect("error line");
    assert!(event_line("error").is_match(line), "unexpected line: {}", line);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_format_emits_json_events() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = TempDir::new().unwrap();
    let mut cmd = create_test_cmd(&dir);
    cmd.env("LOG_FORMAT", "json");
    cmd.args([
        "--url",
        &format!("http://127.0.0.1:{}/ping", port),
        "--interval",
        "10000",
        "-n",
        "1",
    ]);

    let output = run_blocking(cmd).await;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().expect("json event");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["event"], "error");
    assert!(event["elapsed_ms"].is_number());
}
