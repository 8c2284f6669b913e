use std::cell::Cell;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Weekday};

/// Local hour at which planning rolls over to the next day.
pub const DAY_CUTOFF_HOUR: u32 = 19;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Used for replays and tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, delta: TimeDelta) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}

/// The calendar date all day logic runs on: today, or tomorrow once the
/// wall clock has reached the cutoff hour.
pub fn planning_today(now: NaiveDateTime) -> NaiveDate {
    let date = now.date();
    if now.hour() >= DAY_CUTOFF_HOUR {
        date.succ_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Concrete date a Monday–Friday bucket stands for, given the cutoff-adjusted today.
///
/// On weekdays the buckets map into the current week; on Saturday and
/// Sunday every bucket maps into next week. Returns `None` for weekend days.
pub fn date_for_weekday(day: Weekday, today: NaiveDate) -> Option<NaiveDate> {
    let target = workday_number(day)?;
    week_anchored_date(target, today).or_else(|| {
        log::warn!("Week-anchored date for {} failed, using modulo fallback", day);
        modulo_date(target, today)
    })
}

/// Monday = 1 … Friday = 5.
fn workday_number(day: Weekday) -> Option<i64> {
    match day {
        Weekday::Sat | Weekday::Sun => None,
        d => Some(d.number_from_monday() as i64),
    }
}

fn week_anchored_date(target: i64, today: NaiveDate) -> Option<NaiveDate> {
    let current = today.weekday().num_days_from_sunday() as i64;
    let offset = match current {
        6 => target + 1,
        0 => target,
        _ if current <= target => target - current,
        _ => {
            // Already passed this week: anchor on this week's Monday.
            let monday = shift(today, -(current - 1))?;
            let target_date = shift(monday, target - 1)?;
            (target_date - today).num_days()
        }
    };
    shift(today, offset)
}

fn modulo_date(target: i64, today: NaiveDate) -> Option<NaiveDate> {
    let current = today.weekday().num_days_from_sunday() as i64;
    let mut offset = (target - current + 7) % 7;
    if offset == 0 && current != target {
        offset = 7;
    }
    shift(today, offset)
}

pub(crate) fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(TimeDelta::try_days(days)?)
}

/// Last calendar day of the month `months_ahead` months after `date`'s month.
pub fn end_of_month(date: NaiveDate, months_ahead: u32) -> Option<NaiveDate> {
    let total = date.month0() + months_ahead + 1;
    let year = date.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// Format a date the way the wire document stores it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn wall(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn cutoff_rolls_to_tomorrow() {
        assert_eq!(planning_today(wall(2026, 3, 4, 18)), date(2026, 3, 4));
        assert_eq!(planning_today(wall(2026, 3, 4, 19)), date(2026, 3, 5));
        assert_eq!(planning_today(wall(2026, 3, 6, 23)), date(2026, 3, 7));
    }

    #[test]
    fn weekday_dates_in_current_week() {
        // Wednesday
        let today = date(2026, 3, 4);
        assert_eq!(date_for_weekday(Weekday::Wed, today), Some(date(2026, 3, 4)));
        assert_eq!(date_for_weekday(Weekday::Fri, today), Some(date(2026, 3, 6)));
        assert_eq!(date_for_weekday(Weekday::Mon, today), Some(date(2026, 3, 2)));
        assert_eq!(date_for_weekday(Weekday::Tue, today), Some(date(2026, 3, 3)));
    }

    #[test]
    fn weekend_maps_to_next_week() {
        let saturday = date(2026, 3, 7);
        assert_eq!(date_for_weekday(Weekday::Mon, saturday), Some(date(2026, 3, 9)));
        assert_eq!(date_for_weekday(Weekday::Fri, saturday), Some(date(2026, 3, 13)));

        let sunday = date(2026, 3, 8);
        assert_eq!(date_for_weekday(Weekday::Mon, sunday), Some(date(2026, 3, 9)));
        assert_eq!(date_for_weekday(Weekday::Thu, sunday), Some(date(2026, 3, 12)));
    }

    #[test]
    fn weekend_days_have_no_bucket_date() {
        assert_eq!(date_for_weekday(Weekday::Sat, date(2026, 3, 4)), None);
    }

    #[test]
    fn modulo_fallback_agrees_for_upcoming_days() {
        let today = date(2026, 3, 4);
        assert_eq!(modulo_date(5, today), Some(date(2026, 3, 6)));
        assert_eq!(modulo_date(3, today), Some(date(2026, 3, 4)));
    }

    #[test]
    fn month_ends() {
        assert_eq!(end_of_month(date(2026, 1, 15), 0), Some(date(2026, 1, 31)));
        assert_eq!(end_of_month(date(2026, 1, 15), 1), Some(date(2026, 2, 28)));
        assert_eq!(end_of_month(date(2026, 12, 3), 1), Some(date(2027, 1, 31)));
        assert_eq!(end_of_month(date(2028, 1, 3), 1), Some(date(2028, 2, 29)));
    }
}
