//! Integration tests for the CLI surface
//!
//! Every invocation gets an isolated home directory so nothing leaks into
//! the real user configuration, and the API key is scrubbed so no test
//! can reach the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn shai(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shai").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("XDG_DATA_HOME", home.path().join(".local/share"))
        .env("XDG_CACHE_HOME", home.path().join(".cache"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL");
    cmd
}

#[test]
fn help_describes_the_tool() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("shell assistant"))
        .stdout(predicate::str::contains("--describe-shell"))
        .stdout(predicate::str::contains("--repl"));
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shai"));
}

#[test]
fn conflicting_assistance_flags_are_rejected() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .args(["--shell", "--describe-shell", "list files"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only one of"));
}

#[test]
fn chat_and_repl_are_mutually_exclusive() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .args(["--chat", "a", "--repl", "b", "hi"])
        .assert()
        .failure();
}

#[test]
fn missing_prompt_is_a_configuration_error() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no prompt given"));
}

#[test]
fn missing_api_key_fails_before_any_request() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .arg("say hi")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn piped_input_counts_as_the_prompt() {
    let home = TempDir::new().unwrap();
    // the pipe supplies the prompt, so the run proceeds past prompt
    // validation and stops at the missing credentials instead
    shai(&home)
        .write_stdin("explain this log line")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn editor_conflicts_with_piped_input() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .arg("--editor")
        .write_stdin("piped")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--editor"));
}

#[test]
fn roles_round_trip_across_invocations() {
    let home = TempDir::new().unwrap();

    shai(&home)
        .args(["--create-role", "reviewer"])
        .write_stdin("You review code for subtle bugs.")
        .assert()
        .success();

    shai(&home)
        .args(["--show-role", "reviewer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("subtle bugs"));

    shai(&home)
        .arg("--list-roles")
        .assert()
        .success()
        .stdout(predicate::str::contains("reviewer"))
        .stdout(predicate::str::contains("describe-shell"));
}

#[test]
fn duplicate_role_without_confirmation_conflicts() {
    let home = TempDir::new().unwrap();

    shai(&home)
        .args(["--create-role", "mentor"])
        .write_stdin("first")
        .assert()
        .success();

    // piped stdin means no interactive overwrite confirmation
    shai(&home)
        .args(["--create-role", "mentor"])
        .write_stdin("second")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn unknown_role_is_reported() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .args(["--show-role", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn list_chats_starts_empty() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .arg("--list-chats")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn show_chat_for_unknown_id_is_not_found() {
    let home = TempDir::new().unwrap();
    shai(&home)
        .args(["--show-chat", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
