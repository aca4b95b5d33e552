use crate::core::{AccessMapRow, Finding};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub decoded_roots: usize,
    pub skipped_lines: usize,
    pub finding_count: usize,
    pub access_row_count: usize,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub tool_version: String,
    pub source: String,
    pub loaded_at: String,
    pub summary: ReportSummary,
    pub findings: Vec<Finding>,
    pub access_map: Vec<AccessMapRow>,
}

impl Report {
    pub fn has_data(&self) -> bool {
        self.summary.decoded_roots > 0
    }
}

#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub raw: String,
    pub report: Report,
}
