//! Turn a loaded document into valid in-memory tasks.
//!
//! Records without an id or title are dropped. Everything else is repaired:
//! legacy `project`-era records get a bucket, unknown buckets fall back to
//! `this-week`, missing order and flags are backfilled, and recurrence is
//! normalized.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{DOCUMENT_VERSION, Document, RawDocument};
use crate::core::bucket::{Bucket, classify};
use crate::core::clock::Clock;
use crate::core::recurrence::{Recurrence, RecurrenceUnit};
use crate::core::store::{MAX_ORDER, TaskStore};
use crate::core::task::{Task, normalize_tags, parse_tags};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Malformed(String),
    MissingId,
    MissingTitle,
    DuplicateId(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed record: {}", e),
            Self::MissingId => f.write_str("missing id"),
            Self::MissingTitle => f.write_str("missing or empty title"),
            Self::DuplicateId(id) => write!(f, "duplicate id {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub index: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub total: usize,
    pub dropped: Vec<DroppedRecord>,
}

/// A stored record as found. Every field is taken as raw JSON so that a
/// wrongly typed field falls back to its default instead of losing the task.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTask {
    id: Option<Value>,
    title: Option<Value>,
    description: Option<Value>,
    due_date: Option<Value>,
    bucket: Option<Value>,
    project: Option<Value>,
    order: Option<Value>,
    tags: Option<Value>,
    recurring: Option<Value>,
    flagged: Option<Value>,
    completed: Option<Value>,
    completed_at: Option<Value>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

fn text(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str)
}

/// Booleans, plus `"true"`/`"1"` strings and non-zero numbers. Anything else is false.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// A number or numeric string, clamped to the exactly representable range.
fn order_value(value: &Value) -> Option<i64> {
    let order = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !order.is_finite() {
        return None;
    }
    let limit = MAX_ORDER as f64;
    Some(order.clamp(-limit, limit) as i64)
}

fn tags_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => normalize_tags(items.iter().filter_map(Value::as_str)),
        Value::String(s) => parse_tags(s),
        _ => Vec::new(),
    }
}

/// Enabled recurrence always gets a type (default daily) and a count of at least 1.
fn recurrence_value(value: &Value) -> Recurrence {
    let Value::Object(fields) = value else {
        return Recurrence::Off;
    };
    if !fields.get("enabled").is_some_and(flag) {
        return Recurrence::Off;
    }
    let unit = fields
        .get("type")
        .and_then(Value::as_str)
        .and_then(|k| RecurrenceUnit::from_name(&k.trim().to_lowercase()))
        .unwrap_or(RecurrenceUnit::Daily);
    let count = fields.get("interval").and_then(leading_int).unwrap_or(1);
    Recurrence::every(count, unit)
}

/// Integer prefix of a number or numeric string ("3", "3 weeks", 3.0).
fn leading_int(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if truthy(value) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_due_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn normalize_record(
    value: Value,
    position: usize,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Task, DropReason> {
    if !value.is_object() {
        return Err(DropReason::Malformed("not an object".to_string()));
    }
    let raw: RawTask =
        serde_json::from_value(value).map_err(|e| DropReason::Malformed(e.to_string()))?;

    let id = raw.id.as_ref().and_then(id_text).ok_or(DropReason::MissingId)?;
    let title = text(&raw.title)
        .filter(|t| !t.trim().is_empty())
        .ok_or(DropReason::MissingTitle)?
        .to_string();

    let due_date = text(&raw.due_date).and_then(|s| {
        let parsed = parse_due_date(s);
        if parsed.is_none() && !s.is_empty() {
            log::debug!("Ignoring unparseable due date {:?} on {}", s, id);
        }
        parsed
    });
    let recurring = raw.recurring.as_ref().map_or(Recurrence::Off, recurrence_value);
    let completed = raw.completed.as_ref().is_some_and(flag);

    let mut bucket = match text(&raw.bucket).filter(|b| !b.is_empty()) {
        // Records from before buckets existed carried a project instead.
        None if raw.project.as_ref().is_some_and(truthy) => {
            if due_date.is_some() {
                classify(due_date, today)
            } else {
                Bucket::Someday
            }
        }
        None if due_date.is_some() => classify(due_date, today),
        None => Bucket::ThisWeek,
        Some(name) => match Bucket::from_name(name) {
            Some(bucket) if bucket != Bucket::Completed => bucket,
            _ => Bucket::ThisWeek,
        },
    };
    if recurring.is_enabled() {
        bucket = Bucket::Recurring;
    } else if completed {
        bucket = Bucket::Completed;
    }

    let created_at = text(&raw.created_at).and_then(parse_timestamp);
    let order = raw
        .order
        .as_ref()
        .and_then(order_value)
        .filter(|o| *o != 0)
        .unwrap_or_else(|| match created_at {
            Some(created) => created.timestamp_millis(),
            // Spread by position so backfilled records never collide.
            None => now.timestamp_millis() + position as i64 * 1000,
        });
    let created_at = created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let updated_at = text(&raw.updated_at)
        .and_then(parse_timestamp)
        .unwrap_or(created_at);

    Ok(Task {
        id,
        title,
        description: text(&raw.description).unwrap_or_default().to_string(),
        due_date,
        bucket,
        order,
        tags: raw.tags.as_ref().map(tags_value).unwrap_or_default(),
        recurring,
        flagged: raw.flagged.as_ref().is_some_and(flag),
        completed,
        completed_at: text(&raw.completed_at).and_then(parse_timestamp),
        created_at,
        updated_at,
    })
}

/// Validate and repair every record of `raw`.
pub fn reconcile(raw: RawDocument, now: DateTime<Local>) -> (Document, ReconcileReport) {
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);
    let records = raw.tasks.unwrap_or_default();

    let mut report = ReconcileReport {
        total: records.len(),
        dropped: Vec::new(),
    };
    let mut seen = HashSet::new();
    let mut tasks: Vec<Task> = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let reason = match normalize_record(record, tasks.len(), today, now_utc) {
            Ok(task) if seen.insert(task.id.clone()) => {
                tasks.push(task);
                continue;
            }
            Ok(task) => DropReason::DuplicateId(task.id),
            Err(reason) => reason,
        };
        report.dropped.push(DroppedRecord { index, reason });
    }

    if !report.dropped.is_empty() {
        log::warn!("Skipping {} invalid task(s) during load", report.dropped.len());
        for dropped in &report.dropped {
            log::debug!("  record {}: {}", dropped.index, dropped.reason);
        }
    }
    log::info!("Loaded {} valid task(s) from {} total task(s)", tasks.len(), report.total);

    let document = Document {
        version: raw
            .version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DOCUMENT_VERSION.to_string()),
        last_sync: raw
            .last_sync
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        tasks,
    };
    (document, report)
}

/// Reconcile `raw` and build a store from it, advancing stale day buckets once.
pub fn load_store<C: Clock>(raw: RawDocument, clock: C) -> (TaskStore<C>, ReconcileReport) {
    let (document, report) = reconcile(raw, clock.now());
    (TaskStore::load(document.tasks, clock), report)
}
