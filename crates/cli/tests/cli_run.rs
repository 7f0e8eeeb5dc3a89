// End-to-end tests for `tally run` / `tally validate`.
// Run with: cargo test -p tally-cli --test cli_run -- --nocapture

use std::path::Path;
use std::process::{Command, Output};

fn tally() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tally"))
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

const CONFIG: &str = r#"
name = "Counts"

[left]
file = "left.csv"

[right]
file = "right.csv"

[[key]]
name = "sku"

[[compare]]
left = "qty"
right = "qty"

[[aggregate]]
name = "all"
"#;

/// Config plus inputs in a fresh directory.
fn setup(left: &str, right: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "recon.toml", CONFIG);
    write(dir.path(), "left.csv", left);
    write(dir.path(), "right.csv", right);
    dir
}

fn run(dir: &Path, extra: &[&str]) -> Output {
    tally()
        .arg("run")
        .arg(dir.join("recon.toml"))
        .args(extra)
        .output()
        .unwrap()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn clean_run_exits_zero() {
    let dir = setup("sku,qty\nA,1\nB,2\n", "sku,qty\nB,2\nA,1\n");
    let out = run(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("recon 'Counts': 2 key(s): 2 match"));
    assert!(err.contains("diagnostics: 0"));
}

#[test]
fn differences_exit_three() {
    let dir = setup("sku,qty\nA,1\nB,2\n", "sku,qty\nA,5\n");
    let out = run(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("2 of 2 key(s) not reconciled"));
}

#[test]
fn diagnostics_exit_four_only_when_requested() {
    let dir = setup("sku,qty\nA,1\nA,1\n", "sku,qty\nA,1\n");

    let out = run(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("diagnostics: 1 (1 duplicate(s) discarded"));

    let out = run(dir.path(), &["--fail-on-diagnostics"]);
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn json_to_stdout() {
    let dir = setup("sku,qty\nC,\n", "sku,qty\nC,7\n");
    let out = run(dir.path(), &["--json"]);
    assert_eq!(out.status.code(), Some(3));

    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["meta"]["config_name"], "Counts");
    assert_eq!(doc["records"][0]["status"], "indeterminate");
    assert_eq!(doc["records"][0]["differences"]["qty"], serde_json::Value::Null);
    assert_eq!(doc["diagnostics"][0]["kind"], "indeterminate_status");
}

#[test]
fn writes_output_files() {
    let dir = setup("sku,qty\nA,1\n", "sku,qty\nA,1\n");
    let out_dir = tempfile::tempdir().unwrap();
    let json = out_dir.path().join("result.json");
    let records = out_dir.path().join("records.csv");
    let aggregates = out_dir.path().join("agg");

    let out = run(
        dir.path(),
        &[
            "--output",
            json.to_str().unwrap(),
            "--records",
            records.to_str().unwrap(),
            "--aggregates-dir",
            aggregates.to_str().unwrap(),
        ],
    );
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    assert!(std::fs::read_to_string(&json).unwrap().contains("\"summary\""));
    assert_eq!(
        std::fs::read_to_string(&records).unwrap(),
        "sku,status,qty_left,qty_right,qty_diff\nA,match,1,1,0\n"
    );
    let agg = std::fs::read_to_string(aggregates.join("all.csv")).unwrap();
    assert!(agg.lines().nth(1).unwrap().starts_with("total,1,1,"));
}

#[test]
fn missing_key_column_exits_six() {
    let dir = setup("id,qty\nA,1\n", "sku,qty\nA,1\n");
    let out = run(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(6));
    let err = stderr(&out);
    assert!(err.contains("left side: key field 'sku'"));
    assert!(err.contains("hint:"));
}

#[test]
fn missing_input_file_exits_six() {
    let dir = setup("sku,qty\n", "sku,qty\n");
    std::fs::remove_file(dir.path().join("right.csv")).unwrap();
    let out = run(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(6));
    assert!(stderr(&out).contains("right.csv"));
}

#[test]
fn validate_accepts_good_config() {
    let dir = setup("", "");
    let out = tally().arg("validate").arg(dir.path().join("recon.toml")).output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("valid: recon 'Counts' with 1 key component(s)"));
}

#[test]
fn validate_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.toml", "name = \"x\"\nkey = []\n[left]\nfile = \"a\"\n[right]\nfile = \"b\"\n");
    let out = tally().arg("validate").arg(dir.path().join("bad.toml")).output().unwrap();
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn unreadable_config_is_usage_error() {
    let out = tally().arg("validate").arg("/nonexistent/recon.toml").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}
