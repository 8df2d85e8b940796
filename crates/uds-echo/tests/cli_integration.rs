//! CLI integration tests
//!
//! Tests the uds-echo CLI using assert_cmd.

use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

fn uds_echo() -> Command {
    Command::cargo_bin("uds-echo")
        .expect("Failed to locate uds-echo binary - ensure it's built before running tests")
}

#[test]
fn test_cli_help() {
    uds_echo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("uds-echo"))
        .stdout(predicate::str::contains("Unix domain sockets"));
}

#[test]
fn test_cli_version() {
    uds_echo()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("uds-echo"));
}

#[test]
fn test_cli_serve_help() {
    uds_echo()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("echo server"))
        .stdout(predicate::str::contains("--max-connections"));
}

#[test]
fn test_cli_connect_help() {
    uds_echo()
        .args(["connect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stdin"));
}

#[test]
fn test_cli_requires_subcommand() {
    uds_echo().assert().failure();
}

#[test]
fn test_connect_missing_socket_fails() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("nobody-home.sock");

    uds_echo()
        .args(["connect", "--socket"])
        .arg(&socket)
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect"));
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    uds_echo()
        .args(["config", "init", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    assert!(config.exists());

    uds_echo()
        .args(["config", "show", "--config"])
        .arg(&config)
        .args(["--socket", "/tmp/from-cli.sock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[server]"))
        .stdout(predicate::str::contains("/tmp/from-cli.sock"));
}

#[test]
fn test_config_show_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    uds_echo()
        .args(["config", "show", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_connect_relays_stdin_lines() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("relay.sock");
    let listener = UnixListener::bind(&socket).unwrap();

    let peer = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut reader = BufReader::new(stream);

        let mut received = Vec::new();
        for _ in 0..2 {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            received.push(line);
        }
        received
    });

    // The client exits on stdin EOF after sending both lines
    uds_echo()
        .args(["connect", "--socket"])
        .arg(&socket)
        .write_stdin("ping\nsecond\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Connected to"));

    let received = peer.join().unwrap();
    assert_eq!(received, vec!["ping\n".to_string(), "second\n".to_string()]);
}
