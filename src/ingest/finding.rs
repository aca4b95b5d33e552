use serde_json::Value;

use crate::core::Finding;
use crate::ingest::scalar_to_string;

const RULE_ID: &[&[&str]] = &[&["rule", "id"], &["rule_id"], &["id"]];
const RULE_NAME: &[&[&str]] = &[&["rule", "name"], &["rule_name"], &["name"]];
const FINDING_TYPE: &[&[&str]] = &[&["finding", "type"], &["type"], &["finding_type"]];
const SEVERITY: &[&[&str]] = &[&["finding", "severity"], &["severity"]];
const MESSAGE: &[&[&str]] = &[&["finding", "message"], &["message"]];
const PATH: &[&[&str]] = &[&["finding", "path"], &["path"]];
const LINE: &[&[&str]] = &[&["finding", "line"], &["line"]];
const VALIDATION_STATUS: &[&[&str]] = &[
    &["finding", "validation", "status"],
    &["validation", "status"],
    &["validation_status"],
];
const VALIDATION_CONFIDENCE: &[&[&str]] = &[
    &["finding", "validation", "confidence"],
    &["validation", "confidence"],
    &["validation_confidence"],
];
const VALIDATION_RESPONSE: &[&[&str]] = &[
    &["finding", "validation", "response"],
    &["validation", "response"],
    &["validation_response"],
];
const CONFIDENCE: &[&[&str]] = &[&["finding", "confidence"], &["confidence"]];
const SNIPPET: &[&[&str]] = &[&["finding", "snippet"], &["snippet"]];
const FINGERPRINT: &[&[&str]] = &[&["finding", "fingerprint"], &["fingerprint"]];

pub fn normalize(raw: &Value) -> Finding {
    Finding {
        rule_id: probe(raw, RULE_ID),
        rule_name: probe(raw, RULE_NAME),
        finding_type: probe(raw, FINDING_TYPE),
        severity: probe(raw, SEVERITY),
        message: probe(raw, MESSAGE),
        path: probe(raw, PATH),
        line: probe(raw, LINE),
        validation_status: probe(raw, VALIDATION_STATUS),
        validation_confidence: probe(raw, VALIDATION_CONFIDENCE),
        validation_response: probe(raw, VALIDATION_RESPONSE),
        confidence: probe(raw, CONFIDENCE),
        snippet: probe(raw, SNIPPET),
        fingerprint: probe(raw, FINGERPRINT),
        raw: raw.clone(),
    }
}

fn probe(raw: &Value, candidates: &[&[&str]]) -> String {
    for path in candidates {
        if let Some(s) = scalar_at(raw, path) {
            return s;
        }
    }
    String::new()
}

fn scalar_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    scalar_to_string(current)
}
