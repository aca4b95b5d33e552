use std::path::{Path, PathBuf};
use std::process::{Command, Output};
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
        std::env::temp_dir().join(format!("scanview-export-test-{}-{seq}", std::process::id()));
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
    {"rule": {"id": "R2", "name": "Slack Token"}, "finding": {"severity": "Low", "message": "token \"live\", rotate", "path": "b.txt", "validation": {"status": "Inactive Credential"}}}
  ],
  "access_map": [
    {"provider": "aws", "account": "1", "fingerprint": "fp-1", "resource": "bucket/x", "permission": "read,write"}
  ]
}"#;

fn write_sample_report(home: &Path) -> PathBuf {
    let path = home.join("report.json");
    write_file(&path, SAMPLE_REPORT.as_bytes());
    path
}

const CSV_HEADER: &str = "rule_id,rule_name,finding_type,severity,message,path,line,validation_status,validation_confidence";

#[test]
fn csv_export_emits_header_plus_one_row_per_filtered_finding() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(&home, &["export", "csv", report.to_str().unwrap()]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].starts_with("R1,"));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn csv_export_honors_the_validation_filter() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(
        &home,
        &[
            "export",
            "csv",
            report.to_str().unwrap(),
            "--validation",
            "inactive",
        ],
    );
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("R2,"));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn csv_export_quotes_fields_with_commas_and_doubles_quotes() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(&home, &["export", "csv", report.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(r#""token ""live"", rotate""#));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn csv_export_writes_the_out_file() {
    let home = make_temp_home();
    let report = write_sample_report(&home);
    let out_path = home.join("access-map-findings.csv");

    let out = run(
        &home,
        &[
            "export",
            "csv",
            report.to_str().unwrap(),
            "--out",
            out_path.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());

    let written = std::fs::read_to_string(&out_path).expect("read csv");
    assert!(written.starts_with(CSV_HEADER));
    assert_eq!(written.lines().count(), 3);

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn json_export_is_byte_identical_to_the_ingested_payload() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(&home, &["export", "json", report.to_str().unwrap()]);
    assert!(out.status.success());
    assert_eq!(out.stdout, SAMPLE_REPORT.as_bytes());

    let out_path = home.join("access-map-report.json");
    let out = run(
        &home,
        &[
            "export",
            "json",
            report.to_str().unwrap(),
            "--out",
            out_path.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());
    assert_eq!(
        std::fs::read(&out_path).expect("read exported json"),
        SAMPLE_REPORT.as_bytes()
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn export_out_pointing_at_a_directory_uses_the_default_file_name() {
    let home = make_temp_home();
    let report = write_sample_report(&home);
    let out_dir = home.join("exports");
    std::fs::create_dir_all(&out_dir).expect("create out dir");

    let out = run(
        &home,
        &[
            "export",
            "json",
            report.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());
    assert_eq!(
        std::fs::read(out_dir.join("access-map-report.json")).expect("read default-named export"),
        SAMPLE_REPORT.as_bytes()
    );

    let out = run(
        &home,
        &[
            "export",
            "csv",
            report.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());
    let csv = std::fs::read_to_string(out_dir.join("access-map-findings.csv"))
        .expect("read default-named csv");
    assert!(csv.starts_with(CSV_HEADER));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn access_export_emits_pretty_printed_flattened_rows() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(&home, &["export", "access", report.to_str().unwrap()]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("[\n  {"));

    let rows: serde_json::Value = serde_json::from_str(&stdout).expect("parse rows");
    let rows = rows.as_array().expect("rows array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["provider"], "aws");
    assert_eq!(rows[0]["account"], "1");
    assert_eq!(rows[0]["fingerprint"], "fp-1");
    assert_eq!(rows[0]["resource"], "bucket/x");
    assert_eq!(rows[0]["permissions"], serde_json::json!(["read", "write"]));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn csv_export_of_empty_filtered_set_is_header_only() {
    let home = make_temp_home();
    let report = write_sample_report(&home);

    let out = run(
        &home,
        &[
            "export",
            "csv",
            report.to_str().unwrap(),
            "--filter",
            "matches nothing",
        ],
    );
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert_eq!(stdout.lines().next(), Some(CSV_HEADER));

    let _ = std::fs::remove_dir_all(&home);
}
