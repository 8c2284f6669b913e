//! Day-bucket advancement.
//!
//! A task sitting in a Monday–Friday bucket whose date has passed moves to
//! the next weekday bucket. Only the bucket changes; the due date is the
//! user's and stays put.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeDelta, Timelike, Utc, Weekday};

use super::bucket::Bucket;
use super::clock::{Clock, DAY_CUTOFF_HOUR, date_for_weekday, planning_today};
use super::error::AdvanceError;
use super::store::TaskStore;
use super::task::Task;

/// Tasks touched this recently are left where the user dropped them.
pub const JUST_EDITED_GUARD: TimeDelta = TimeDelta::seconds(2);

impl<C: Clock> TaskStore<C> {
    /// Advance stale day buckets. Returns how many tasks moved.
    pub fn advance_day_buckets(&mut self) -> usize {
        let now = self.clock().now();
        advance_day_buckets(self.tasks_mut(), now)
    }
}

/// Calendar context for one advancement pass.
struct Week {
    now: DateTime<Utc>,
    today: NaiveDate,
    actual_weekday: Weekday,
    showing_next_week: bool,
}

impl Week {
    fn new(now: DateTime<Local>) -> Self {
        let wall = now.naive_local();
        let actual_weekday = wall.weekday();
        let after_cutoff = wall.hour() >= DAY_CUTOFF_HOUR;
        Self {
            now: now.with_timezone(&Utc),
            today: planning_today(wall),
            actual_weekday,
            showing_next_week: (after_cutoff && actual_weekday == Weekday::Fri)
                || matches!(actual_weekday, Weekday::Sat | Weekday::Sun),
        }
    }

    fn is_weekend(&self) -> bool {
        matches!(self.actual_weekday, Weekday::Sat | Weekday::Sun)
    }

    /// `Some(true)` when Friday's bucket date falls before Monday's.
    fn friday_is_last_week(&self) -> Option<bool> {
        let friday = date_for_weekday(Weekday::Fri, self.today)?;
        let monday = date_for_weekday(Weekday::Mon, self.today)?;
        Some(friday < monday)
    }

    fn should_advance(&self, task: &Task) -> Result<bool, AdvanceError> {
        if task.bucket == Bucket::Friday && self.showing_next_week {
            // Without dates, only move once the weekend has actually started.
            return Ok(self.friday_is_last_week().unwrap_or_else(|| self.is_weekend()));
        }

        let day = task.bucket.weekday().ok_or(AdvanceError::NoBucketDate(task.bucket))?;
        let bucket_date =
            date_for_weekday(day, self.today).ok_or(AdvanceError::NoBucketDate(task.bucket))?;
        Ok(bucket_date < self.today)
    }
}

pub fn advance_day_buckets(tasks: &mut [Task], now: DateTime<Local>) -> usize {
    let week = Week::new(now);
    let mut moved = 0;

    for task in tasks.iter_mut() {
        if !task.bucket.is_day() || task.completed || task.flagged {
            continue;
        }
        if week.now - task.updated_at < JUST_EDITED_GUARD {
            continue;
        }

        match week.should_advance(task) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                log::warn!("Skipping bucket advancement for {}: {}", task.id, e);
                continue;
            }
        }

        let Some(next) = task.bucket.next_day() else {
            continue;
        };
        if next == Bucket::Monday && week.friday_is_last_week() == Some(false) {
            log::info!("Not moving {} from friday: friday is not before monday", task.id);
            continue;
        }

        log::debug!("Advancing {} from {} to {}", task.id, task.bucket, next);
        task.bucket = next;
        task.updated_at = week.now;
        moved += 1;
    }

    if moved > 0 {
        log::info!("Advanced {} task(s) out of past day buckets", moved);
    }
    moved
}
