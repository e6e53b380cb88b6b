//! E2E integration tests for the `herald` binary.
//!
//! JSON output goes to stdout; tracing and errors go to stderr.

mod common;

use common::Sandbox;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

const SAVE_LISTENERS: &str = r#"
[[listeners]]
event = "save"
kind = "echo"
priority = 5

[[listeners]]
event = "save"
kind = "template"
template = "saved {file}"
priority = 10
"#;

// ─── run ───────────────────────────────────────────────────────────

#[test]
fn run_prints_output_in_priority_order() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox
        .cmd()
        .args(["run", "save", "--params", r#"{"file":"a.txt"}"#])
        .assert()
        .success()
        .stdout("{\"save\":[\"saved a.txt\",{\"file\":\"a.txt\"}]}\n");
}

#[test]
fn run_escapes_markup() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox
        .cmd()
        .args(["run", "save", "--params", r#"{"file":"<b>"}"#])
        .assert()
        .success()
        .stdout(contains("<b>").not())
        .stdout(contains("\\u003Cb\\u003E"));
}

#[test]
fn run_pretty_indents() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox
        .cmd()
        .args(["run", "save", "--pretty"])
        .assert()
        .success()
        .stdout(contains("{\n    \"save\": [\n"));
}

#[test]
fn run_unknown_event_prints_nothing() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox.cmd().args(["run", "missing"]).assert().success().stdout("");
}

#[test]
fn run_with_malformed_params_uses_none() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox
        .cmd()
        .args(["run", "save", "--params", "not json"])
        .assert()
        .success()
        .stdout(contains(r#""saved {file}""#))
        .stderr(contains("not a JSON object"));
}

#[test]
fn failing_listener_is_logged_not_fatal() {
    let sandbox = Sandbox::with_config(
        r#"
[[listeners]]
event = "save"
kind = "fail"
message = "disk full"
priority = 1

[[listeners]]
event = "save"
kind = "keys"
"#,
    );
    sandbox
        .cmd()
        .args(["run", "save", "--params", r#"{"b":1,"a":2}"#])
        .assert()
        .success()
        .stdout(contains(r#"[["a","b"]]"#));

    let log = std::fs::read_to_string(sandbox.storage().join("errors.log")).expect("errors.log");
    assert!(log.contains("Event handler 'fail' failed: disk full"));
    assert!(log.ends_with("\n\n\n\n"));
}

#[test]
fn storage_env_var_redirects_logs() {
    let sandbox = Sandbox::with_config("[[listeners]]\nevent = \"e\"\nkind = \"fail\"\n");
    let logs = sandbox.path().join("elsewhere");
    sandbox
        .cmd()
        .env("HERALD_STORAGE", &logs)
        .args(["run", "e"])
        .assert()
        .success();
    assert!(logs.join("errors.log").exists());
    assert!(!sandbox.storage().exists());
}

// ─── events ────────────────────────────────────────────────────────

#[test]
fn events_lists_dispatch_order() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox
        .cmd()
        .arg("events")
        .assert()
        .success()
        .stdout("save: template(10) echo(5)\n");
}

#[test]
fn events_empty_without_config() {
    let sandbox = Sandbox::new();
    sandbox.cmd().arg("events").assert().success().stdout("");
}

#[test]
fn explicit_config_adds_listeners() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    let extra = sandbox.path().join("extra.toml");
    std::fs::write(&extra, "[[listeners]]\nevent = \"load\"\nkind = \"keys\"\n").unwrap();

    sandbox
        .cmd()
        .args(["events", "--config"])
        .arg(&extra)
        .assert()
        .success()
        .stdout(contains("load: keys(0)"))
        .stdout(contains("save: template(10) echo(5)"));
}

// ─── Config errors ─────────────────────────────────────────────────

#[test]
fn invalid_listener_fails_with_all_errors() {
    let sandbox = Sandbox::with_config(
        r#"
[[listeners]]
event = ""
kind = "echo"

[[listeners]]
event = "save"
kind = "template"
"#,
    );
    sandbox
        .cmd()
        .arg("events")
        .assert()
        .failure()
        .stderr(contains("2 invalid listener(s)"));
}

#[test]
fn malformed_config_fails() {
    let sandbox = Sandbox::with_config("listeners = 3");
    sandbox
        .cmd()
        .arg("events")
        .assert()
        .failure()
        .stderr(contains("failed to parse config file"));
}

#[test]
fn invalid_env_var_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .env("HERALD_DEBUG", "maybe")
        .arg("events")
        .assert()
        .failure()
        .stderr(contains("HERALD_DEBUG"));
}

// ─── Flags ─────────────────────────────────────────────────────────

#[test]
fn debug_flag_enables_debug_logging() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    sandbox
        .cmd()
        .args(["-d", "run", "save"])
        .assert()
        .success()
        .stderr(contains("controller built"));
}

#[test]
fn log_file_receives_tracing() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    let log = sandbox.path().join("trace").join("herald.log");
    sandbox
        .cmd()
        .args(["run", "save", "--log-file"])
        .arg(&log)
        .assert()
        .success();
    let text = std::fs::read_to_string(&log).expect("trace log");
    assert!(text.contains("notify"));
}

#[test]
fn project_flag_selects_root() {
    let sandbox = Sandbox::with_config(SAVE_LISTENERS);
    let other = Sandbox::new();
    other
        .cmd()
        .arg("-C")
        .arg(sandbox.path())
        .arg("events")
        .assert()
        .success()
        .stdout(contains("save:"));
}
