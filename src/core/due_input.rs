//! Typed due-date input: relative words, weekday names and a few numeric forms.

use chrono::{Datelike, NaiveDate, Weekday};

use super::clock::{end_of_month, shift};

/// Parse what a user typed as a due date. `None` when nothing matches or
/// the date does not exist.
///
/// Accepts `today`, `tomorrow`/`tom`, `yesterday`, a weekday name or
/// abbreviation (its next occurrence, never today), `next week` (the coming
/// Monday), `next month` (the 1st of next month), `in N days`, `MM/DD`
/// (this year, or the next year the date exists once it has passed),
/// `YYYY-MM-DD` and `MM/DD/YYYY`.
pub fn parse_due_input(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let input = input.trim().to_lowercase();
    let words: Vec<&str> = input.split_whitespace().collect();

    match words.as_slice() {
        [] => None,
        ["today"] => Some(today),
        ["tomorrow"] | ["tom"] => shift(today, 1),
        ["yesterday"] => shift(today, -1),
        [day] if weekday(day).is_some() => {
            let target = weekday(day)?;
            let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
            shift(today, if ahead == 0 { 7 } else { ahead as i64 })
        }
        ["next", "week"] => coming_monday(today),
        ["next", day] if weekday(day).is_some() => coming_monday(today),
        ["next", "month"] => end_of_month(today, 0)?.succ_opt(),
        ["in", count, "day" | "days"] => shift(today, count.parse::<u32>().ok()? as i64),
        [date] => numeric_date(date, today),
        _ => None,
    }
}

fn weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// The Monday after `today` (a week out when today is Monday).
fn coming_monday(today: NaiveDate) -> Option<NaiveDate> {
    shift(today, 7 - today.weekday().num_days_from_monday() as i64)
}

fn numeric_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    let parts: Vec<&str> = text.split('/').collect();
    match parts.as_slice() {
        [month, day] => month_day(month.parse().ok()?, day.parse().ok()?, today),
        [month, day, year] if year.len() == 4 => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        }
        _ => None,
    }
}

/// `MM/DD` without a year: the first occurrence on or after today.
fn month_day(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    // Validate against a leap year so 02/29 is accepted but 02/30 is not.
    NaiveDate::from_ymd_opt(2024, month, day)?;
    (today.year()..=today.year() + 4)
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| *date >= today)
}
