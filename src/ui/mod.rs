use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{Finding, Report};
use crate::query::{FindingsView, QueryState};
use crate::tree::AccessTree;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "Caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "Next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` for more detail");
    let _ = writeln!(
        stderr,
        "  - see `scanview --help` for available commands and options"
    );
}

pub fn print_findings(report: &Report, view: &FindingsView, state: &QueryState, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();

    if !report.has_data() {
        let _ = writeln!(out, "No data: nothing in the payload could be decoded.");
        return;
    }

    let direction = match state.sort_direction {
        crate::query::SortDirection::Asc => "asc",
        crate::query::SortDirection::Desc => "desc",
    };
    let _ = writeln!(
        out,
        "Findings: {matching} matching / {total} total — page {page}/{pages} (sort: {field} {direction}, validation: {validation})",
        matching = view.filtered_count(),
        total = report.findings.len(),
        page = view.current_page,
        pages = view.total_pages,
        field = state.sort_field.label(),
        validation = state.validation_filter.label(),
    );
    for note in &report.summary.notes {
        let _ = writeln!(out, "- {note}");
    }

    if view.filtered_count() == 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "No findings match the current filters.");
        return;
    }

    let _ = writeln!(out);
    let rows = view.page_rows();
    let shown = rows.len().min(cfg.max_table_rows.max(1));
    print_findings_table(&mut out, &rows[..shown], cfg.color);
    if rows.len() > shown {
        let _ = writeln!(
            out,
            "... ({} more row(s) on this page; raise ui.max_table_rows to see them)",
            rows.len() - shown
        );
    }
}

fn print_findings_table(out: &mut dyn Write, rows: &[&Finding], color: bool) {
    let label_rule = "RULE";
    let label_severity = "SEVERITY";
    let label_validation = "VALIDATION";
    let label_location = "LOCATION";

    let rule_w = rows
        .iter()
        .map(|f| visible_width_ansi(&rule_cell(f)))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_rule));
    let severity_w = rows
        .iter()
        .map(|f| visible_width_ansi(&severity_cell(f)))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_severity));
    let validation_w = rows
        .iter()
        .map(|f| visible_width_ansi(&validation_cell(f)))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_validation));

    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        pad_end_display(label_rule, rule_w),
        pad_end_display(label_severity, severity_w),
        pad_end_display(label_validation, validation_w),
        label_location
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        "-".repeat(rule_w),
        "-".repeat(severity_w),
        "-".repeat(validation_w),
        "-".repeat(visible_width_ansi(label_location).max(8))
    );

    for finding in rows {
        let rule = pad_end_display(&rule_cell(finding), rule_w);
        let severity = pad_end_display(&severity_cell(finding), severity_w);
        let validation = pad_end_ansi(&format_validation(finding, color), validation_w);
        let _ = writeln!(out, "{rule}  {severity}  {validation}  {}", location_cell(finding));
    }
}

fn rule_cell(finding: &Finding) -> String {
    let cell = if finding.rule_id.is_empty() {
        &finding.rule_name
    } else {
        &finding.rule_id
    };
    if cell.is_empty() {
        "-".to_string()
    } else {
        truncate_middle(cell, 32)
    }
}

fn severity_cell(finding: &Finding) -> String {
    if finding.severity.is_empty() {
        "-".to_string()
    } else {
        finding.severity.clone()
    }
}

fn validation_cell(finding: &Finding) -> String {
    if finding.validation_status.is_empty() {
        "-".to_string()
    } else {
        finding.validation_status.clone()
    }
}

fn location_cell(finding: &Finding) -> String {
    let path = truncate_middle(&finding.path, 64);
    match (path.is_empty(), finding.line.is_empty()) {
        (true, _) => "-".to_string(),
        (false, true) => path,
        (false, false) => format!("{path}:{}", finding.line),
    }
}

fn format_validation(finding: &Finding, color: bool) -> String {
    let s = validation_cell(finding);
    if !color {
        return s;
    }

    let code = match finding.validation_status.to_ascii_lowercase().as_str() {
        "active credential" => "31",
        "inactive credential" => "32",
        "not attempted" => "33",
        _ => "90",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

pub fn print_access_tree(tree: Option<&AccessTree>, search: &str, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();

    let Some(tree) = tree else {
        if search.trim().is_empty() {
            let _ = writeln!(out, "No access-map entries in this report.");
        } else {
            let _ = writeln!(out, "No access-map rows match the search term.");
        }
        return;
    };

    let _ = writeln!(out, "Access map: {} row(s)", tree.row_count());
    for provider in &tree.providers {
        let _ = writeln!(out, "{}", provider.name);
        for account in &provider.accounts {
            let _ = writeln!(out, "  {}", account.name);
            for row in &account.rows {
                let resource = if row.resource.is_empty() {
                    "-"
                } else {
                    row.resource.as_str()
                };
                if row.permissions.is_empty() {
                    let _ = writeln!(out, "    - {resource}");
                } else {
                    let _ = writeln!(out, "    - {resource} [{}]", row.permissions.join(", "));
                }
                if cfg.verbose && !row.fingerprint.is_empty() {
                    let _ = writeln!(out, "      fingerprint: {}", row.fingerprint);
                }
            }
        }
    }
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                let _ = chars.next();
                for ch2 in chars.by_ref() {
                    if ch2 == 'm' {
                        break;
                    }
                }
                continue;
            }
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

pub fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s
        .chars()
        .rev()
        .take(right)
        .collect::<String>()
        .chars()
        .rev()
        .collect();

    format!("{prefix}...{suffix}")
}
