use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ALL_USERS: &str = "All Users";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time entry as delivered by the upstream API. Fields stay untyped until the
/// normalizer validates them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimeEntry {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub start: Value,
    #[serde(default)]
    pub end: Value,
    #[serde(default)]
    pub duration: Value,
    #[serde(default)]
    pub billable: Value,
    #[serde(default)]
    pub task: Value,
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub tags: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Billable {
    Billable,
    #[serde(rename = "Non-Billable")]
    NonBillable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub task_id: Option<String>,
    pub user_name: Option<String>,
    pub tag_names: Vec<String>,
    pub duration_hours: Option<f64>,
    pub billable: Billable,
}

/// One (entry, in-scope tag) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRow {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub task_id: Option<String>,
    pub user_name: Option<String>,
    pub tag_name: String,
    pub duration_hours: Option<f64>,
    pub billable: Billable,
}

impl ExpandedRow {
    pub fn hours(&self) -> f64 {
        self.duration_hours.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub tag: String,
    pub billable_hours: f64,
    pub non_billable_hours: f64,
    pub total_hours: f64,
    /// `None` when nothing was logged for the tag.
    pub percent_billable: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSegment {
    pub tag: String,
    pub billable: Billable,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    All,
    User(String),
}

impl UserFilter {
    /// Usernames are matched exactly, so only the sentinel check sees the
    /// trimmed value.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(name) if !matches!(name.trim(), "" | ALL_USERS) => {
                UserFilter::User(name.to_string())
            }
            _ => UserFilter::All,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            UserFilter::All => ALL_USERS,
            UserFilter::User(name) => name,
        }
    }
}

/// Inclusive calendar-date range, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("start date {start} is after end date {end}"));
        }
        Ok(Self { start, end })
    }

    /// First day of `today`'s month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        Self { start, end: today }
    }

    /// Resolves optional `YYYY-MM-DD` inputs against the month-to-date default.
    /// A missing start falls back to the first day of the end date's month.
    pub fn from_inputs(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, String> {
        let end = parse_date_input(end)?.unwrap_or(today);
        let start = match parse_date_input(start)? {
            Some(start) => start,
            None => Self::month_to_date(end).start,
        };
        Self::new(start, end)
    }

    pub fn start_ms(&self) -> i64 {
        self.start
            .and_hms_milli_opt(0, 0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default()
    }

    pub fn end_ms(&self) -> i64 {
        self.end
            .and_hms_milli_opt(23, 59, 59, 999)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default()
    }

    pub fn start_label(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_label(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

fn parse_date_input(value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("invalid date {value:?}, expected YYYY-MM-DD")),
    }
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartView {
    Pie { title: String, slices: Vec<Slice> },
    StackedBar { title: String, segments: Vec<BarSegment> },
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub start_date: String,
    pub end_date: String,
    pub selected_user: String,
    pub user_options: Vec<String>,
    pub fetched_at: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub summary: Vec<SummaryRow>,
    pub charts: Vec<ChartView>,
}
