use crate::models::{BarSegment, Billable, ExpandedRow, Slice, SummaryRow};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
struct TagHours {
    billable: f64,
    non_billable: f64,
}

impl TagHours {
    fn add(&mut self, row: &ExpandedRow) {
        match row.billable {
            Billable::Billable => self.billable += row.hours(),
            Billable::NonBillable => self.non_billable += row.hours(),
        }
    }
}

/// Per-tag billable/non-billable totals, sorted by tag.
pub fn summarize(rows: &[ExpandedRow]) -> Vec<SummaryRow> {
    let mut by_tag: BTreeMap<&str, TagHours> = BTreeMap::new();
    for row in rows {
        by_tag.entry(row.tag_name.as_str()).or_default().add(row);
    }

    by_tag
        .into_iter()
        .map(|(tag, hours)| summary_row(tag, hours.billable, hours.non_billable))
        .collect()
}

pub fn summary_row(tag: &str, billable_hours: f64, non_billable_hours: f64) -> SummaryRow {
    let total_hours = billable_hours + non_billable_hours;
    SummaryRow {
        tag: tag.to_string(),
        billable_hours,
        non_billable_hours,
        total_hours,
        percent_billable: percent(billable_hours, total_hours),
    }
}

fn percent(part: f64, total: f64) -> Option<f64> {
    if total == 0.0 {
        None
    } else {
        Some(part / total * 100.0)
    }
}

pub fn tag_distribution(rows: &[ExpandedRow]) -> Vec<Slice> {
    distribution(rows.iter().map(|row| (Some(row.tag_name.as_str()), row.hours())))
}

/// Rows without a user name are left out.
pub fn user_distribution(rows: &[ExpandedRow]) -> Vec<Slice> {
    distribution(rows.iter().map(|row| (row.user_name.as_deref(), row.hours())))
}

fn distribution<'a>(items: impl Iterator<Item = (Option<&'a str>, f64)>) -> Vec<Slice> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for (label, hours) in items {
        if let Some(label) = label {
            *totals.entry(label).or_default() += hours;
        }
    }
    totals
        .into_iter()
        .map(|(label, hours)| Slice {
            label: label.to_string(),
            hours,
        })
        .collect()
}

/// Hours per (tag, billable) pair for the stacked bar chart.
pub fn billable_bars(rows: &[ExpandedRow]) -> Vec<BarSegment> {
    let mut totals: BTreeMap<(&str, Billable), f64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.tag_name.as_str(), row.billable)).or_default() += row.hours();
    }
    totals
        .into_iter()
        .map(|((tag, billable), hours)| BarSegment {
            tag: tag.to_string(),
            billable,
            hours,
        })
        .collect()
}
