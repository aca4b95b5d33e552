use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{Finding, LoadedReport, Report, ReportSummary};
use crate::ingest;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub show_progress: bool,
}

#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Self {
        Self { opts }
    }

    pub fn load(&self, source: &str, raw: String) -> LoadedReport {
        use std::io::IsTerminal;
        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();
        let pb = if progress_enabled {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb.set_message("Decoding report...");
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let decoded = ingest::decode::decode(&raw);
        let collected = ingest::collect::collect(&decoded.roots);
        let findings: Vec<Finding> = collected
            .findings
            .iter()
            .map(ingest::finding::normalize)
            .collect();
        let entries = ingest::access_map::normalize(&collected.access_entries);
        let access_map = ingest::access_map::flatten(&entries);

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let mut notes = Vec::new();
        if decoded.is_empty() {
            notes.push(
                "No data: the payload is neither a JSON document nor line-delimited JSON."
                    .to_string(),
            );
        }
        if decoded.skipped_lines > 0 {
            notes.push(format!(
                "Line-delimited mode: skipped {} malformed line(s).",
                decoded.skipped_lines
            ));
        }
        if !decoded.is_empty() && findings.is_empty() && access_map.is_empty() {
            notes.push(
                "The payload decoded but contained no findings or access-map entries.".to_string(),
            );
        }
        notes.sort();
        notes.dedup();

        let loaded_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        let report = Report {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            source: source.to_string(),
            loaded_at,
            summary: ReportSummary {
                decoded_roots: decoded.roots.len(),
                skipped_lines: decoded.skipped_lines,
                finding_count: findings.len(),
                access_row_count: access_map.len(),
                notes,
            },
            findings,
            access_map,
        };

        LoadedReport { raw, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineOptions {
            show_progress: false,
        })
    }

    #[test]
    fn load_produces_canonical_state_from_end_to_end_payload() {
        let raw = r#"{"findings":[{"rule":{"id":"R1"},"finding":{"severity":"Critical","path":"a.env"}}],"access_map":[{"provider":"aws","account":"1","resource":"bucket/x","permission":"read,write"}]}"#;
        let loaded = engine().load("test.json", raw.to_string());

        assert_eq!(loaded.report.findings.len(), 1);
        let f = &loaded.report.findings[0];
        assert_eq!(f.rule_id, "R1");
        assert_eq!(f.severity, "Critical");
        assert_eq!(f.path, "a.env");

        assert_eq!(loaded.report.access_map.len(), 1);
        let row = &loaded.report.access_map[0];
        assert_eq!(row.resource, "bucket/x");
        assert_eq!(row.permissions, vec!["read", "write"]);

        assert_eq!(loaded.raw, raw);
        assert!(loaded.report.has_data());
    }

    #[test]
    fn load_never_fails_on_garbage_and_reports_no_data() {
        let loaded = engine().load("garbage.json", "complete garbage".to_string());
        assert!(!loaded.report.has_data());
        assert!(loaded.report.findings.is_empty());
        assert!(
            loaded
                .report
                .summary
                .notes
                .iter()
                .any(|n| n.starts_with("No data:"))
        );
    }

    #[test]
    fn load_counts_skipped_jsonl_lines_in_the_summary() {
        let raw = "{\"findings\":[{\"rule_id\":\"R1\"}]}\nbroken line\n{\"findings\":[{\"rule_id\":\"R2\"}]}";
        let loaded = engine().load("report.jsonl", raw.to_string());
        assert_eq!(loaded.report.summary.decoded_roots, 2);
        assert_eq!(loaded.report.summary.skipped_lines, 1);
        assert_eq!(loaded.report.findings.len(), 2);
    }
}
