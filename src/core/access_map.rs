use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroup {
    pub resources: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMapEntry {
    pub provider: String,
    pub account: String,
    pub fingerprint: String,
    pub groups: Vec<AccessGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMapRow {
    pub provider: String,
    pub account: String,
    pub fingerprint: String,
    pub resource: String,
    pub permissions: Vec<String>,
}
