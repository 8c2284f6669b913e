use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::bucket::{Bucket, classify};
use super::clock::{Clock, SystemClock, planning_today};
use super::error::{SpawnError, TaskError};
use super::recurrence::{RecurrenceSnapshot, next_occurrence};
use super::search;
use super::task::{Task, TaskDraft, TaskPatch, normalize_tags};
use crate::document::Document;

/// Gap between neighbouring order values after a renumber.
pub const ORDER_STEP: i64 = 10_000;

/// Largest order value kept on load (2^53 - 1, the largest integer the
/// JSON document can carry exactly).
pub const MAX_ORDER: i64 = 9_007_199_254_740_991;

/// Result of toggling completion: the toggled task and, when a recurring
/// task was completed, its freshly spawned successor.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub task: Task,
    pub successor: Option<Task>,
}

/// In-memory task collection. Every mutation goes through here.
///
/// Tasks keep their insertion order; `index` maps each id to its position.
pub struct TaskStore<C: Clock = SystemClock> {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    clock: C,
}

impl Default for TaskStore<SystemClock> {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> TaskStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
            clock,
        }
    }

    /// Take over an already reconciled collection and advance stale day buckets.
    pub fn load(tasks: Vec<Task>, clock: C) -> Self {
        let mut store = Self {
            tasks,
            index: HashMap::new(),
            clock,
        };
        store.reindex();
        if !store.tasks.is_empty() {
            store.advance_day_buckets();
        }
        store
    }

    /// Replace the whole collection, e.g. with the result of a sync.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.reindex();
        if !self.tasks.is_empty() {
            self.advance_day_buckets();
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    fn index_of(&self, id: &str) -> Result<usize, TaskError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Rebuild the id index. The first task with a given id wins.
    fn reindex(&mut self) {
        self.index.clear();
        for (i, task) in self.tasks.iter().enumerate() {
            self.index.entry(task.id.clone()).or_insert(i);
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    /// The plain calendar date, used for due-date classification and recurrence.
    pub fn calendar_today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// The cutoff-adjusted date, used for day buckets.
    pub fn planning_today(&self) -> NaiveDate {
        planning_today(self.clock.now().naive_local())
    }

    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, TaskError> {
        if draft.title.trim().is_empty() {
            return Err(TaskError::Validation("title is required".to_string()));
        }

        let now = self.now();
        let bucket = if draft.recurring.is_enabled() {
            Bucket::Recurring
        } else if let Some(bucket) = draft.bucket {
            bucket
        } else if draft.due_date.is_some() {
            classify(draft.due_date, self.calendar_today())
        } else {
            Bucket::ThisWeek
        };

        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description.unwrap_or_default(),
            due_date: draft.due_date,
            bucket,
            // Time-like default sorts new tasks after existing ones.
            order: draft.order.filter(|o| *o != 0).unwrap_or_else(|| now.timestamp_millis()),
            tags: normalize_tags(draft.tags.iter().map(String::as_str)),
            recurring: draft.recurring,
            flagged: draft.flagged,
            completed: draft.completed,
            completed_at: draft.completed_at,
            created_at: now,
            updated_at: now,
        };

        log::debug!("Added task {} ({:?}) to {}", task.id, task.title, task.bucket);
        self.index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task, TaskError> {
        let idx = self.index_of(id)?;
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TaskError::Validation("title must not be empty".to_string()));
        }

        let now = self.now();
        let today = self.calendar_today();
        let task = &mut self.tasks[idx];

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(Some(bucket)) = patch.bucket {
            task.bucket = bucket;
        }
        if let Some(order) = patch.order {
            task.order = order;
        }
        if let Some(tags) = patch.tags {
            task.tags = normalize_tags(tags.iter().map(String::as_str));
        }
        if let Some(flagged) = patch.flagged {
            task.flagged = flagged;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(completed_at) = patch.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(recurring) = patch.recurring {
            task.recurring = recurring;
            if !recurring.is_enabled() && patch.bucket.is_none() {
                task.bucket = classify(task.due_date, today);
            }
        }
        if task.is_recurring() {
            task.bucket = Bucket::Recurring;
        }
        task.updated_at = now;

        Ok(task.clone())
    }

    /// Move a task to another bucket. The due date is left alone.
    pub fn move_to_bucket(&mut self, id: &str, bucket: Bucket) -> Result<Task, TaskError> {
        let idx = self.index_of(id)?;
        let now = self.now();
        let task = &mut self.tasks[idx];
        task.bucket = bucket;
        task.updated_at = now;
        Ok(task.clone())
    }

    /// Flip the flag. A newly flagged task goes to the end of the flagged
    /// list; an unflagged one goes to the end of its bucket.
    pub fn toggle_flag(&mut self, id: &str) -> Result<Task, TaskError> {
        let idx = self.index_of(id)?;
        let now = self.now();
        let was_flagged = self.tasks[idx].flagged;
        let bucket = self.tasks[idx].bucket;

        let last = if was_flagged {
            self.tasks
                .iter()
                .filter(|t| t.id != id && t.shown_in(bucket))
                .map(Task::sort_order)
                .max()
        } else {
            self.tasks
                .iter()
                .filter(|t| t.id != id && t.flagged)
                .map(Task::sort_order)
                .max()
        };

        let task = &mut self.tasks[idx];
        task.flagged = !was_flagged;
        task.order = last.map_or(now.timestamp_millis(), |o| o.saturating_add(ORDER_STEP));
        task.updated_at = now;
        Ok(task.clone())
    }

    pub fn toggle_completion(&mut self, id: &str) -> Result<CompletionOutcome, TaskError> {
        let idx = self.index_of(id)?;
        let now = self.now();
        let today = self.calendar_today();

        let snapshot = self.tasks[idx].snapshot();
        let task = &mut self.tasks[idx];
        let recurring = task.is_recurring();
        let was_completed = task.completed;

        task.completed = !was_completed;
        if task.completed {
            task.completed_at = Some(now);
            if !recurring {
                task.bucket = Bucket::Completed;
            }
        } else {
            task.completed_at = None;
            task.bucket = if recurring {
                Bucket::Recurring
            } else if task.due_date.is_some() {
                classify(task.due_date, today)
            } else {
                Bucket::ThisWeek
            };
        }
        task.updated_at = now;
        let task = task.clone();

        let successor = if recurring && !was_completed {
            match self.spawn_next(&snapshot) {
                Ok(successor) => successor,
                Err(e) => {
                    log::error!("Failed to create next instance of {:?}: {}", snapshot.title, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(CompletionOutcome { task, successor })
    }

    /// Create the next instance of a recurring task from its pre-completion
    /// snapshot. `Ok(None)` when the snapshot does not recur.
    pub fn spawn_next(&mut self, snapshot: &RecurrenceSnapshot) -> Result<Option<Task>, SpawnError> {
        let Some(interval) = snapshot.recurring.interval() else {
            return Ok(None);
        };

        let due = next_occurrence(interval, snapshot.due_date, self.calendar_today()).ok_or_else(|| {
            SpawnError::DateOutOfRange {
                title: snapshot.title.clone(),
            }
        })?;

        let task = self.add(TaskDraft {
            title: snapshot.title.clone(),
            description: Some(snapshot.description.clone()),
            due_date: Some(due),
            bucket: Some(Bucket::Recurring),
            tags: snapshot.tags.clone(),
            recurring: snapshot.recurring,
            ..TaskDraft::default()
        })?;

        log::info!("Created next instance of {:?} due {}", task.title, due);
        Ok(Some(task))
    }

    /// Place `id` before `before` (or last) among the tasks in `bucket`, then
    /// renumber the whole bucket.
    pub fn reorder_within_bucket(
        &mut self,
        id: &str,
        before: Option<&str>,
        bucket: Bucket,
    ) -> Result<Task, TaskError> {
        self.renumber(id, before, |t| t.bucket == bucket)
    }

    /// Same as [`reorder_within_bucket`](Self::reorder_within_bucket), scoped to the flagged list.
    pub fn reorder_flagged(&mut self, id: &str, before: Option<&str>) -> Result<Task, TaskError> {
        let idx = self.index_of(id)?;
        if !self.tasks[idx].flagged {
            return Err(TaskError::NotFlagged(id.to_string()));
        }
        self.renumber(id, before, |t| t.flagged)
    }

    fn renumber(
        &mut self,
        id: &str,
        before: Option<&str>,
        in_group: impl Fn(&Task) -> bool,
    ) -> Result<Task, TaskError> {
        let moved = self.index_of(id)?;
        let now = self.now();

        let mut sequence: Vec<usize> = (0..self.tasks.len())
            .filter(|&i| i != moved && in_group(&self.tasks[i]))
            .collect();
        sequence.sort_by_key(|&i| (self.tasks[i].sort_order(), self.tasks[i].created_at));

        let position = before
            .and_then(|b| sequence.iter().position(|&i| self.tasks[i].id == b))
            .unwrap_or(sequence.len());
        sequence.insert(position, moved);

        for (rank, &i) in sequence.iter().enumerate() {
            self.tasks[i].order = (rank as i64 + 1) * ORDER_STEP;
        }

        let task = &mut self.tasks[moved];
        task.updated_at = now;
        Ok(task.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Task, TaskError> {
        let idx = self.index_of(id)?;
        let task = self.tasks.remove(idx);
        self.reindex();
        log::debug!("Deleted task {} ({:?})", task.id, task.title);
        Ok(task)
    }

    /// Case-insensitive match against title, description, tags and due-date text.
    /// An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<&Task> {
        if term.is_empty() {
            return self.tasks.iter().collect();
        }
        let term = term.to_lowercase();
        self.tasks.iter().filter(|t| search::matches(t, &term)).collect()
    }

    /// Visible tasks per bucket: neither flagged nor completed. The
    /// `Completed` entry counts every completed task.
    pub fn counts_by_bucket(&self) -> BTreeMap<Bucket, usize> {
        Bucket::ALL
            .into_iter()
            .map(|bucket| {
                let count = if bucket == Bucket::Completed {
                    self.tasks.iter().filter(|t| t.completed).count()
                } else {
                    self.tasks.iter().filter(|t| t.shown_in(bucket)).count()
                };
                (bucket, count)
            })
            .collect()
    }

    /// Tasks displayed in `bucket`, in display order.
    pub fn tasks_in_bucket(&self, bucket: Bucket) -> Vec<&Task> {
        if bucket == Bucket::Completed {
            return self.completed_tasks();
        }
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.shown_in(bucket)).collect();
        tasks.sort_by(|a, b| display_order(a, b));
        tasks
    }

    pub fn flagged_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.flagged && !t.completed)
            .collect();
        tasks.sort_by(|a, b| display_order(a, b));
        tasks
    }

    /// Completed tasks, most recently completed first.
    pub fn completed_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.completed).collect();
        tasks.sort_by_key(|t| std::cmp::Reverse(t.completed_at.map_or(0, |at| at.timestamp_millis())));
        tasks
    }

    pub fn to_document(&self) -> Document {
        Document::new(self.tasks.clone(), self.now())
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

/// Order first, then due date (dated before undated); stable sorts keep
/// insertion order for the rest.
fn display_order(a: &Task, b: &Task) -> Ordering {
    a.sort_order().cmp(&b.sort_order()).then_with(|| match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}
