use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::clock::end_of_month;

/// The time slot a task is displayed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    ThisWeek,
    NextWeek,
    ThisMonth,
    NextMonth,
    Recurring,
    Someday,
    Completed,
}

impl Bucket {
    pub const ALL: [Bucket; 12] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::ThisWeek,
        Self::NextWeek,
        Self::ThisMonth,
        Self::NextMonth,
        Self::Recurring,
        Self::Someday,
        Self::Completed,
    ];

    pub const DAYS: [Bucket; 5] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::ThisWeek => "this-week",
            Self::NextWeek => "next-week",
            Self::ThisMonth => "this-month",
            Self::NextMonth => "next-month",
            Self::Recurring => "recurring",
            Self::Someday => "someday",
            Self::Completed => "completed",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == s)
    }

    /// The weekday a day bucket stands for.
    pub fn weekday(&self) -> Option<Weekday> {
        match self {
            Self::Monday => Some(Weekday::Mon),
            Self::Tuesday => Some(Weekday::Tue),
            Self::Wednesday => Some(Weekday::Wed),
            Self::Thursday => Some(Weekday::Thu),
            Self::Friday => Some(Weekday::Fri),
            _ => None,
        }
    }

    pub fn is_day(&self) -> bool {
        self.weekday().is_some()
    }

    /// Monday → Tuesday → … → Friday → Monday. `None` for non-day buckets.
    pub fn next_day(&self) -> Option<Self> {
        match self {
            Self::Monday => Some(Self::Tuesday),
            Self::Tuesday => Some(Self::Wednesday),
            Self::Wednesday => Some(Self::Thursday),
            Self::Thursday => Some(Self::Friday),
            Self::Friday => Some(Self::Monday),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(&s.trim().to_lowercase()).ok_or_else(|| format!("unknown bucket: {}", s))
    }
}

/// Relative bucket for a due date, as seen from `today`.
pub fn classify(due: Option<NaiveDate>, today: NaiveDate) -> Bucket {
    let Some(due) = due else {
        return Bucket::Someday;
    };

    let days_diff = (due - today).num_days();
    if days_diff < 0 {
        // Overdue work surfaces in the nearest bucket.
        return Bucket::ThisWeek;
    }
    if days_diff <= 7 {
        return Bucket::ThisWeek;
    }
    if days_diff <= 14 {
        return Bucket::NextWeek;
    }
    if end_of_month(today, 0).is_some_and(|end| due <= end) {
        return Bucket::ThisMonth;
    }
    if end_of_month(today, 1).is_some_and(|end| due <= end) {
        return Bucket::NextMonth;
    }
    Bucket::Someday
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_date_is_someday() {
        assert_eq!(classify(None, date(2026, 3, 4)), Bucket::Someday);
    }

    #[test]
    fn near_dates() {
        let today = date(2026, 3, 4);
        assert_eq!(classify(Some(today), today), Bucket::ThisWeek);
        assert_eq!(classify(Some(today - TimeDelta::days(3)), today), Bucket::ThisWeek);
        assert_eq!(classify(Some(today + TimeDelta::days(7)), today), Bucket::ThisWeek);
        assert_eq!(classify(Some(today + TimeDelta::days(10)), today), Bucket::NextWeek);
        assert_eq!(classify(Some(today + TimeDelta::days(14)), today), Bucket::NextWeek);
    }

    #[test]
    fn month_windows() {
        let today = date(2026, 3, 4);
        assert_eq!(classify(Some(date(2026, 3, 24)), today), Bucket::ThisMonth);
        assert_eq!(classify(Some(date(2026, 4, 30)), today), Bucket::NextMonth);
        assert_eq!(classify(Some(date(2026, 5, 1)), today), Bucket::Someday);
    }

    #[test]
    fn late_month_skips_this_month() {
        // 15 days out already crosses into next month.
        let today = date(2026, 3, 20);
        assert_eq!(classify(Some(date(2026, 4, 10)), today), Bucket::NextMonth);
    }

    #[test]
    fn names_round_trip() {
        for bucket in Bucket::ALL {
            assert_eq!(Bucket::from_name(bucket.as_str()), Some(bucket));
        }
        assert_eq!("This-Week".parse::<Bucket>(), Ok(Bucket::ThisWeek));
        assert!("inbox".parse::<Bucket>().is_err());
    }

    #[test]
    fn day_cycle_wraps() {
        assert_eq!(Bucket::Friday.next_day(), Some(Bucket::Monday));
        assert_eq!(Bucket::Monday.next_day(), Some(Bucket::Tuesday));
        assert_eq!(Bucket::Someday.next_day(), None);
    }

    #[test]
    fn serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Bucket::NextMonth).unwrap(), "\"next-month\"");
    }
}
