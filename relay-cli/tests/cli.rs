//! Binary-level tests for relay-cli.

use assert_cmd::Command;
use predicates::prelude::*;
use relay_types::SessionKey;

fn cli() -> Command {
    Command::cargo_bin("relay-cli").unwrap()
}

#[test]
fn session_prints_valid_key() {
    let output = cli().arg("session").assert().success().get_output().clone();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let key = stdout.trim();

    assert_eq!(key.len(), 43);
    assert!(SessionKey::parse(key).is_ok());
}

#[test]
fn session_keys_differ() {
    let first = cli().arg("session").output().unwrap().stdout;
    let second = cli().arg("session").output().unwrap().stdout;
    assert_ne!(first, second);
}

#[test]
fn help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("pull"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("session"));
}

#[test]
fn submit_rejects_bad_code_before_sending() {
    // Port 9 (discard) is never contacted: validation fails first.
    cli()
        .args(["--relay", "http://127.0.0.1:9", "submit"])
        .args(["--session", "abcdefghijklmnop", "12ab56"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Code must be 6-20 digits"));
}

#[test]
fn pull_rejects_bad_session_before_sending() {
    cli()
        .args(["--relay", "http://127.0.0.1:9", "pull"])
        .args(["--session", "short"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session key is not valid"));
}

#[test]
fn submit_requires_session() {
    cli()
        .args(["submit", "123456"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--session"));
}
