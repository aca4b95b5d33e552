use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub rule_name: String,
    #[serde(rename = "type")]
    pub finding_type: String,
    pub severity: String,
    pub message: String,
    pub path: String,
    pub line: String,
    pub validation_status: String,
    pub validation_confidence: String,
    pub validation_response: String,
    pub confidence: String,
    pub snippet: String,
    pub fingerprint: String,
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl Default for Finding {
    fn default() -> Self {
        Self {
            rule_id: String::new(),
            rule_name: String::new(),
            finding_type: String::new(),
            severity: String::new(),
            message: String::new(),
            path: String::new(),
            line: String::new(),
            validation_status: String::new(),
            validation_confidence: String::new(),
            validation_response: String::new(),
            confidence: String::new(),
            snippet: String::new(),
            fingerprint: String::new(),
            raw: serde_json::Value::Null,
        }
    }
}
