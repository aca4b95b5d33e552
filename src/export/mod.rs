use anyhow::Result;

use crate::core::{AccessMapRow, Finding};

pub const CSV_HEADER: &str = "rule_id,rule_name,finding_type,severity,message,path,line,validation_status,validation_confidence";

pub const JSON_EXPORT_NAME: &str = "access-map-report.json";
pub const CSV_EXPORT_NAME: &str = "access-map-findings.csv";

pub fn findings_csv(rows: &[&Finding]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for finding in rows {
        let fields = [
            finding.rule_id.as_str(),
            finding.rule_name.as_str(),
            finding.finding_type.as_str(),
            finding.severity.as_str(),
            finding.message.as_str(),
            finding.path.as_str(),
            finding.line.as_str(),
            finding.validation_status.as_str(),
            finding.validation_confidence.as_str(),
        ];
        let mut first = true;
        for field in fields {
            if !first {
                out.push(',');
            }
            first = false;
            push_csv_field(&mut out, field);
        }
        out.push('\n');
    }

    out
}

fn push_csv_field(out: &mut String, value: &str) {
    if value.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&value.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(value);
    }
}

pub fn access_rows_json(rows: &[AccessMapRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}
