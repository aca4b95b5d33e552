use clap::ValueEnum;
use serde::Serialize;

use crate::core::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ValidationFilter {
    #[default]
    All,
    Active,
    Inactive,
    NotAttempted,
}

impl ValidationFilter {
    pub fn matches(self, status: &str) -> bool {
        match self {
            ValidationFilter::All => true,
            ValidationFilter::Active => status.eq_ignore_ascii_case("active credential"),
            ValidationFilter::Inactive => status.eq_ignore_ascii_case("inactive credential"),
            ValidationFilter::NotAttempted => status.eq_ignore_ascii_case("not attempted"),
        }
    }

    pub fn next(self) -> Self {
        match self {
            ValidationFilter::All => ValidationFilter::Active,
            ValidationFilter::Active => ValidationFilter::Inactive,
            ValidationFilter::Inactive => ValidationFilter::NotAttempted,
            ValidationFilter::NotAttempted => ValidationFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ValidationFilter::All => "all",
            ValidationFilter::Active => "active",
            ValidationFilter::Inactive => "inactive",
            ValidationFilter::NotAttempted => "not_attempted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    RuleId,
    RuleName,
    FindingType,
    Severity,
    Message,
    Path,
    Line,
    ValidationStatus,
    Confidence,
}

impl SortField {
    pub fn key(self, finding: &Finding) -> &str {
        match self {
            SortField::RuleId => &finding.rule_id,
            SortField::RuleName => &finding.rule_name,
            SortField::FindingType => &finding.finding_type,
            SortField::Severity => &finding.severity,
            SortField::Message => &finding.message,
            SortField::Path => &finding.path,
            SortField::Line => &finding.line,
            SortField::ValidationStatus => &finding.validation_status,
            SortField::Confidence => &finding.confidence,
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortField::RuleId => SortField::RuleName,
            SortField::RuleName => SortField::FindingType,
            SortField::FindingType => SortField::Severity,
            SortField::Severity => SortField::Message,
            SortField::Message => SortField::Path,
            SortField::Path => SortField::Line,
            SortField::Line => SortField::ValidationStatus,
            SortField::ValidationStatus => SortField::Confidence,
            SortField::Confidence => SortField::RuleId,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortField::RuleId => "rule_id",
            SortField::RuleName => "rule_name",
            SortField::FindingType => "finding_type",
            SortField::Severity => "severity",
            SortField::Message => "message",
            SortField::Path => "path",
            SortField::Line => "line",
            SortField::ValidationStatus => "validation_status",
            SortField::Confidence => "confidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryState {
    pub text_filter: String,
    pub validation_filter: ValidationFilter,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page_size: usize,
    pub current_page: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            text_filter: String::new(),
            validation_filter: ValidationFilter::All,
            sort_field: SortField::RuleId,
            sort_direction: SortDirection::Asc,
            page_size: 25,
            current_page: 1,
        }
    }
}

impl QueryState {
    pub fn new(page_size: usize, sort_field: SortField) -> Self {
        Self {
            page_size: page_size.max(1),
            sort_field,
            ..Self::default()
        }
    }

    pub fn set_text_filter(&mut self, filter: &str) {
        self.text_filter = filter.trim().to_lowercase();
        self.current_page = 1;
    }

    pub fn set_validation_filter(&mut self, filter: ValidationFilter) {
        self.validation_filter = filter;
        self.current_page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    pub fn set_sort(&mut self, field: SortField) {
        if field == self.sort_field {
            self.sort_direction = self.sort_direction.flip();
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Asc;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        // The upper bound is applied by the next evaluation, which knows
        // the filtered count.
        self.current_page = page.max(1);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        if self.current_page < total_pages {
            self.current_page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    pub fn reset(&mut self) {
        let page_size = self.page_size;
        *self = QueryState {
            page_size,
            ..QueryState::default()
        };
    }
}

#[derive(Debug)]
pub struct FindingsView<'a> {
    pub rows: Vec<&'a Finding>,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_start: usize,
    pub page_end: usize,
}

impl<'a> FindingsView<'a> {
    pub fn page_rows(&self) -> &[&'a Finding] {
        &self.rows[self.page_start..self.page_end]
    }

    pub fn filtered_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn evaluate<'a>(findings: &'a [Finding], state: &mut QueryState) -> FindingsView<'a> {
    let mut rows: Vec<&Finding> = findings
        .iter()
        .filter(|f| state.validation_filter.matches(&f.validation_status))
        .filter(|f| text_matches(f, &state.text_filter))
        .collect();

    rows.sort_by(|a, b| {
        let ka = state.sort_field.key(a).to_lowercase();
        let kb = state.sort_field.key(b).to_lowercase();
        match state.sort_direction {
            SortDirection::Asc => ka.cmp(&kb),
            SortDirection::Desc => kb.cmp(&ka),
        }
    });

    let page_size = state.page_size.max(1);
    let total_pages = rows.len().div_ceil(page_size).max(1);
    state.current_page = state.current_page.clamp(1, total_pages);
    let page_start = (state.current_page - 1) * page_size;
    let page_end = (page_start + page_size).min(rows.len());

    FindingsView {
        rows,
        total_pages,
        current_page: state.current_page,
        page_start,
        page_end,
    }
}

fn text_matches(finding: &Finding, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {} {} {} {} {}",
        finding.rule_id,
        finding.rule_name,
        finding.finding_type,
        finding.message,
        finding.path,
        finding.validation_status,
        finding.fingerprint
    )
    .to_lowercase();
    haystack.contains(needle)
}
