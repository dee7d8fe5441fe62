//! Validation of raw upstream records into typed rows.
//!
//! Every function here is total: a malformed field degrades to `None` (or an
//! empty tag list) for that record only.

use crate::models::{Billable, NormalizedEntry, RawTimeEntry};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

const MS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

#[derive(Debug, Deserialize)]
struct TaskRef {
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagRef {
    name: String,
}

pub fn normalize(entries: &[RawTimeEntry]) -> Vec<NormalizedEntry> {
    entries.iter().map(normalize_entry).collect()
}

pub fn normalize_entry(entry: &RawTimeEntry) -> NormalizedEntry {
    NormalizedEntry {
        start_date: numeric(&entry.start).and_then(timestamp),
        end_date: numeric(&entry.end).and_then(timestamp),
        task_id: task_id(&entry.task),
        user_name: user_name(&entry.user),
        tag_names: tag_names(&entry.tags),
        duration_hours: numeric(&entry.duration).map(|ms| ms / MS_PER_HOUR),
        billable: if truthy(&entry.billable) {
            Billable::Billable
        } else {
            Billable::NonBillable
        },
    }
}

/// Accepts JSON numbers and numeric strings.
fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn timestamp(ms: f64) -> Option<DateTime<Utc>> {
    if ms.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(ms.round() as i64)
}

fn task_id(value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    let task = TaskRef::deserialize(value).ok()?;
    match task.id? {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn user_name(value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    UserRef::deserialize(value).ok()?.username
}

/// Lowercased tag names, first occurrence wins.
fn tag_names(value: &Value) -> Vec<String> {
    let Value::Array(tags) = value else {
        return Vec::new();
    };

    let mut names: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let Ok(tag) = TagRef::deserialize(tag) else {
            continue;
        };
        let name = tag.name.to_lowercase();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Null => false,
    }
}
