use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Repeat settings of a task.
///
/// On the wire this is `{"enabled": false}` or
/// `{"enabled": true, "type": "weekly", "interval": 2}`; a disabled
/// recurrence never carries a stale type or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RecurringWire", into = "RecurringWire")]
pub enum Recurrence {
    #[default]
    Off,
    Every(RecurrenceInterval),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceInterval {
    pub count: u32,
    pub unit: RecurrenceUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl FromStr for RecurrenceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(&s.trim().to_lowercase()).ok_or_else(|| format!("unknown repeat type: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecurringWire {
    #[serde(default)]
    enabled: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<RecurrenceUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval: Option<u32>,
}

impl From<RecurringWire> for Recurrence {
    fn from(wire: RecurringWire) -> Self {
        if !wire.enabled {
            return Self::Off;
        }
        Self::every(wire.interval.unwrap_or(1), wire.kind.unwrap_or(RecurrenceUnit::Daily))
    }
}

impl From<Recurrence> for RecurringWire {
    fn from(recurrence: Recurrence) -> Self {
        match recurrence {
            Recurrence::Off => Self {
                enabled: false,
                kind: None,
                interval: None,
            },
            Recurrence::Every(interval) => Self {
                enabled: true,
                kind: Some(interval.unit),
                interval: Some(interval.count),
            },
        }
    }
}

impl Recurrence {
    /// An enabled recurrence; a zero count is treated as 1.
    pub fn every(count: u32, unit: RecurrenceUnit) -> Self {
        Self::Every(RecurrenceInterval {
            count: count.max(1),
            unit,
        })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Every(_))
    }

    pub fn interval(&self) -> Option<RecurrenceInterval> {
        match self {
            Self::Off => None,
            Self::Every(interval) => Some(*interval),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("once"),
            Self::Every(RecurrenceInterval { count: 1, unit }) => f.write_str(unit.as_str()),
            Self::Every(RecurrenceInterval { count, unit }) => {
                let noun = match unit {
                    RecurrenceUnit::Daily => "days",
                    RecurrenceUnit::Weekly => "weeks",
                    RecurrenceUnit::Monthly => "months",
                    RecurrenceUnit::Yearly => "years",
                };
                write!(f, "every {} {}", count, noun)
            }
        }
    }
}

impl RecurrenceInterval {
    /// Step `date` forward by this interval. Month and year steps land on the
    /// last valid day when the target month is shorter.
    pub fn add_to(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self.unit {
            RecurrenceUnit::Daily => date.checked_add_signed(TimeDelta::try_days(self.count as i64)?),
            RecurrenceUnit::Weekly => date.checked_add_signed(TimeDelta::try_weeks(self.count as i64)?),
            RecurrenceUnit::Monthly => add_months(date, self.count),
            RecurrenceUnit::Yearly => add_months(date, self.count.checked_mul(12)?),
        }
    }
}

fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total_months = date.month0().checked_add(months)?;
    let new_year = date.year().checked_add((total_months / 12) as i32)?;
    let new_month = (total_months % 12) + 1;
    let new_day = date.day().min(days_in_month(new_year, new_month)?);
    NaiveDate::from_ymd_opt(new_year, new_month, new_day)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(first_of_next.pred_opt()?.day())
}

/// Fields of a task captured before it is marked complete; seeds the successor.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceSnapshot {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub recurring: Recurrence,
}

/// Due date of the next occurrence.
///
/// Counts from the later of `today` and the current due date, so completing
/// a task late never schedules the successor in the past.
pub fn next_occurrence(
    interval: RecurrenceInterval,
    due: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let base = due.map_or(today, |d| d.max(today));
    interval.add_to(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn every(count: u32, unit: RecurrenceUnit) -> RecurrenceInterval {
        RecurrenceInterval { count, unit }
    }

    #[test]
    fn daily_counts_from_today_when_late() {
        let today = date(2026, 3, 10);
        let next = next_occurrence(every(2, RecurrenceUnit::Daily), Some(date(2026, 3, 1)), today);
        assert_eq!(next, Some(date(2026, 3, 12)));
    }

    #[test]
    fn counts_from_future_due_date() {
        let today = date(2026, 3, 10);
        let next = next_occurrence(every(1, RecurrenceUnit::Weekly), Some(date(2026, 3, 20)), today);
        assert_eq!(next, Some(date(2026, 3, 27)));
    }

    #[test]
    fn no_due_date_counts_from_today() {
        let today = date(2026, 3, 10);
        assert_eq!(
            next_occurrence(every(3, RecurrenceUnit::Daily), None, today),
            Some(date(2026, 3, 13))
        );
    }

    #[test]
    fn month_end_snaps_to_last_day() {
        let interval = every(1, RecurrenceUnit::Monthly);
        assert_eq!(interval.add_to(date(2026, 1, 31)), Some(date(2026, 2, 28)));
        assert_eq!(interval.add_to(date(2028, 1, 31)), Some(date(2028, 2, 29)));
        assert_eq!(interval.add_to(date(2026, 12, 15)), Some(date(2027, 1, 15)));
    }

    #[test]
    fn leap_day_yearly_snaps_to_feb_28() {
        let interval = every(1, RecurrenceUnit::Yearly);
        assert_eq!(interval.add_to(date(2028, 2, 29)), Some(date(2029, 2, 28)));
        assert_eq!(every(4, RecurrenceUnit::Yearly).add_to(date(2028, 2, 29)), Some(date(2032, 2, 29)));
    }

    #[test]
    fn wire_form_of_disabled_recurrence_is_bare() {
        assert_eq!(serde_json::to_string(&Recurrence::Off).unwrap(), r#"{"enabled":false}"#);
        let stale: Recurrence =
            serde_json::from_str(r#"{"enabled":false,"type":"weekly","interval":3}"#).unwrap();
        assert_eq!(stale, Recurrence::Off);
    }

    #[test]
    fn wire_form_fills_defaults() {
        let r: Recurrence = serde_json::from_str(r#"{"enabled":true}"#).unwrap();
        assert_eq!(r, Recurrence::every(1, RecurrenceUnit::Daily));
        assert_eq!(
            serde_json::to_string(&Recurrence::every(2, RecurrenceUnit::Monthly)).unwrap(),
            r#"{"enabled":true,"type":"monthly","interval":2}"#
        );
    }

    #[test]
    fn display() {
        assert_eq!(Recurrence::every(1, RecurrenceUnit::Weekly).to_string(), "weekly");
        assert_eq!(Recurrence::every(3, RecurrenceUnit::Daily).to_string(), "every 3 days");
        assert_eq!(Recurrence::Off.to_string(), "once");
    }
}
