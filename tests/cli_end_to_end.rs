#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;
use tempfile::TempDir;

const REPORT: &str = "# Weekly report\n\n```\ntotal = 40 + 2\nemit(total, \"Total\")\n```\n\nThe total is `total`.\n";

fn tessera() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tessera"));
    cmd.env_remove("TESSERA_CONFIG_FILE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("TESSERA__RENDER__HIGHLIGHT", "false");
    cmd
}

#[test]
fn weaves_stdin_to_stdout() {
    let assert = tessera().write_stdin(REPORT).assert().success();

    let html = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(html.starts_with("<!DOCTYPE html>"), "{html}");
    assert!(html.contains("<title>Weekly report</title>"));
    assert!(html.contains("<div class=\"output\"><pre>42</pre></div>"), "{html}");
    assert!(html.contains("The total is 42."));
}

#[test]
fn weaves_files_in_place() {
    let dir = TempDir::new().expect("tmp dir");
    let input = dir.path().join("report.md");
    let output = dir.path().join("report.html");
    fs::write(&input, REPORT).expect("write input");

    tessera()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout("");

    let html = fs::read_to_string(&output).expect("output written");
    assert!(html.contains("<h1>Weekly report</h1>"));
}

#[test]
fn failing_snippet_writes_nothing() {
    let dir = TempDir::new().expect("tmp dir");
    let output = dir.path().join("out.html");

    tessera()
        .arg("-o")
        .arg(&output)
        .write_stdin("# Broken\n\n```\nemit(1)\n```\n\n```\nundefined_thing\n```\n")
        .assert()
        .failure()
        .stdout("")
        .stderr(contains("block 2 failed").and(contains("undefined_thing")));

    assert!(!output.exists());
}

#[test]
fn snippet_print_goes_to_stderr() {
    tessera()
        .write_stdin("```\nprint(\"progress: halfway\")\n```\n")
        .assert()
        .success()
        .stdout(contains("progress: halfway").not())
        .stderr(contains("progress: halfway"));
}

#[test]
fn diagnostics_go_to_stderr_and_stdout_stays_html() {
    let assert = tessera()
        .write_stdin("# Notes\n\n```bogus\nemit(\"ran\")\n```\n\nStray: `emit(1)`\n")
        .assert()
        .success()
        .stderr(
            contains("unknown block flag `bogus`")
                .and(contains("Running block 1"))
                .and(contains("Running inline expression 1"))
                .and(contains("emissions are ignored in inline expressions")),
        )
        .stdout(contains("Running block").not().and(contains("unknown block flag").not()));

    let html = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(html.starts_with("<!DOCTYPE html>"), "{html}");
    assert!(html.contains("<div class=\"output\"><p>ran</p></div>"), "{html}");
    assert!(html.contains("Stray: nil"), "{html}");
}

#[test]
fn trailing_arguments_reach_snippets() {
    let assert = tessera()
        .arg("--")
        .arg("alpha")
        .arg("--beta")
        .write_stdin("`argv[1]` of `len(argv)`\n")
        .assert()
        .success();

    let html = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(html.contains("<p>--beta of 2</p>"), "{html}");
}

#[test]
fn refuses_to_overwrite_the_input() {
    let dir = TempDir::new().expect("tmp dir");
    let input = dir.path().join("notes.md");
    fs::write(&input, REPORT).expect("write input");

    tessera()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("would overwrite the input"));

    assert_eq!(fs::read_to_string(&input).expect("input intact"), REPORT);
}

#[test]
fn missing_config_file_fails_fast() {
    tessera()
        .arg("--config-file")
        .arg("/nonexistent/tessera.toml")
        .write_stdin("text\n")
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}
