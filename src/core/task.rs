use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::bucket::Bucket;
use super::recurrence::{Recurrence, RecurrenceSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub bucket: Bucket,
    /// Manual sort position within the bucket or the flagged list.
    pub order: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub recurring: Recurrence,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurring.is_enabled()
    }

    /// Position used for sorting: the stored order, or the creation time
    /// in milliseconds when the order is unset.
    pub fn sort_order(&self) -> i64 {
        if self.order != 0 {
            self.order
        } else {
            self.created_at.timestamp_millis()
        }
    }

    /// Whether the task shows up in the regular view of `bucket`.
    pub fn shown_in(&self, bucket: Bucket) -> bool {
        self.bucket == bucket && !self.flagged && !self.completed
    }

    pub fn snapshot(&self) -> RecurrenceSnapshot {
        RecurrenceSnapshot {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            tags: self.tags.clone(),
            recurring: self.recurring,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Explicit bucket; derived from the due date when absent.
    pub bucket: Option<Bucket>,
    pub order: Option<i64>,
    pub tags: Vec<String>,
    pub recurring: Recurrence,
    pub flagged: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn in_bucket(mut self, bucket: Bucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn repeating(mut self, recurring: Recurrence) -> Self {
        self.recurring = recurring;
        self
    }

    pub fn tagged(mut self, tags: &str) -> Self {
        self.tags = parse_tags(tags);
        self
    }
}

/// A partial update. Each `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<NaiveDate>>,
    /// `Some(None)` is a blank bucket choice: the current bucket is kept,
    /// but the field still counts as supplied.
    pub bucket: Option<Option<Bucket>>,
    pub order: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub recurring: Option<Recurrence>,
    pub flagged: Option<bool>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.bucket.is_none()
            && self.order.is_none()
            && self.tags.is_none()
            && self.recurring.is_none()
            && self.flagged.is_none()
            && self.completed.is_none()
            && self.completed_at.is_none()
    }
}

/// Split comma-separated tag input into trimmed, non-empty tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(input.split(','))
}

pub fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
