use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

fn scanview_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scanview"));
    cmd.env("HOME", home);
    cmd.env_remove("SCANVIEW_CONFIG");
    cmd.env_remove("SCANVIEW_UI_COLOR");
    cmd.env_remove("SCANVIEW_UI_MAX_TABLE_ROWS");
    cmd.env_remove("SCANVIEW_QUERY_PAGE_SIZE");
    cmd.env_remove("SCANVIEW_QUERY_SORT_FIELD");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    scanview_cmd(home).args(args).output().expect("run scanview")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home =
        std::env::temp_dir().join(format!("scanview-cli-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

const SAMPLE_REPORT: &str = r#"{
  "findings": [
    {"rule": {"id": "R1", "name": "AWS Access Key"}, "finding": {"severity": "Critical", "path": "a.env", "line": 3, "validation": {"status": "Active Credential", "confidence": "high"}}},
    {"rule": {"id": "R2", "name": "Slack Token"}, "finding": {"severity": "Low", "path": "b.txt", "line": 9, "validation": {"status": "Inactive Credential"}}},
    {"rule_id": "R3", "rule_name": "Generic Secret", "severity": "Medium", "path": "c.py"}
  ],
  "access_map": [
    {"provider": "aws", "account": "1", "resource": "bucket/x", "permission": "read,write"}
  ]
}"#;

fn write_sample_report(home: &Path) -> PathBuf {
    let path = home.join("report.json");
    write_file(&path, SAMPLE_REPORT.as_bytes());
    path
}

#[test]
fn findings_json_normalizes_nested_and_flat_records() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(&home, &["findings", report.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let findings = v
        .get("findings")
        .and_then(|f| f.as_array())
        .expect("findings array");
    assert_eq!(findings.len(), 3);

    assert_eq!(findings[0]["rule_id"], "R1");
    assert_eq!(findings[0]["severity"], "Critical");
    assert_eq!(findings[0]["path"], "a.env");
    assert_eq!(findings[0]["line"], "3");
    assert_eq!(findings[0]["validation_status"], "Active Credential");

    assert_eq!(findings[2]["rule_id"], "R3");
    assert_eq!(findings[2]["rule_name"], "Generic Secret");
    assert_eq!(findings[2]["validation_status"], "");

    assert_eq!(v["filtered_count"], 3);
    assert_eq!(v["total_pages"], 1);
    assert_eq!(v["current_page"], 1);

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn validation_filter_excludes_non_matching_statuses() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(
        &home,
        &[
            "findings",
            report.to_str().unwrap(),
            "--validation",
            "active",
            "--json",
        ],
    );
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let findings = v["findings"].as_array().expect("findings array");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["rule_id"], "R1");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn text_filter_and_pagination_are_applied() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(
        &home,
        &[
            "findings",
            report.to_str().unwrap(),
            "--page-size",
            "2",
            "--page",
            "99",
            "--json",
        ],
    );
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["total_pages"], 2);
    // Out-of-range pages are clamped.
    assert_eq!(v["current_page"], 2);
    assert_eq!(v["findings"].as_array().expect("findings").len(), 1);

    let out = run(
        &home,
        &[
            "findings",
            report.to_str().unwrap(),
            "--filter",
            "slack",
            "--json",
        ],
    );
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["filtered_count"], 1);
    assert_eq!(v["findings"][0]["rule_id"], "R2");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn sort_desc_reverses_the_order() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(
        &home,
        &[
            "findings",
            report.to_str().unwrap(),
            "--sort",
            "rule_id",
            "--desc",
            "--json",
        ],
    );
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let findings = v["findings"].as_array().expect("findings array");
    assert_eq!(findings[0]["rule_id"], "R3");
    assert_eq!(findings[2]["rule_id"], "R1");

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn stdin_report_is_accepted_with_dash() {
    let home = make_temp_home();

    let mut child = scanview_cmd(&home)
        .args(["findings", "-", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn scanview");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(SAMPLE_REPORT.as_bytes())
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait scanview");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["source"], "<stdin>");
    assert_eq!(v["findings"].as_array().expect("findings").len(), 3);

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn jsonl_report_recovers_valid_lines() {
    let home = make_temp_home();
    let path = home.join("report.jsonl");
    write_file(
        &path,
        b"{\"findings\":[{\"rule_id\":\"R1\"}]}\nbroken line\n{\"findings\":[{\"rule_id\":\"R2\"}]}\n",
    );

    let out = run(&home, &["findings", path.to_str().unwrap(), "--json"]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["summary"]["decoded_roots"], 2);
    assert_eq!(v["summary"]["skipped_lines"], 1);
    assert_eq!(v["findings"].as_array().expect("findings").len(), 2);

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn garbage_payload_reports_no_data_but_succeeds() {
    let home = make_temp_home();
    let path = home.join("garbage.json");
    write_file(&path, b"this is not json in any mode");

    let out = run(&home, &["findings", path.to_str().unwrap(), "--json"]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["summary"]["decoded_roots"], 0);
    assert!(v["findings"].as_array().expect("findings").is_empty());
    let notes = v["summary"]["notes"].as_array().expect("notes");
    assert!(
        notes
            .iter()
            .any(|n| n.as_str().unwrap_or("").starts_with("No data:"))
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn access_json_emits_the_grouped_tree() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(&home, &["access", report.to_str().unwrap(), "--json"]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    let providers = v["providers"].as_array().expect("providers");
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0]["name"], "aws");
    let rows = providers[0]["accounts"][0]["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["resource"], "bucket/x");
    assert_eq!(
        rows[0]["permissions"],
        serde_json::json!(["read", "write"])
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn unsupported_extension_exits_2() {
    let home = make_temp_home();
    let path = home.join("report.txt");
    write_file(&path, b"{}");

    let out = run(&home, &["findings", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn missing_report_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["findings", home.join("nope.json").to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_requires_tty_exits_2() {
    let home = make_temp_home();
    let report = write_sample_report(&home);
    let out = run(&home, &["ui", report.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn completion_unknown_shell_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}
