//! Free-text task matching.
//!
//! Besides title, description and tags, a term also matches textual forms of
//! the due date: weekday and month names (full or abbreviated), the day and
//! month numbers, the year in four or two digits, `mm/dd/yy`, and the
//! "Mon, Jan 15" label shown next to a task. This is deliberately loose.

use chrono::{Datelike, NaiveDate};

use super::task::Task;

/// `term` must already be lowercase.
pub fn matches(task: &Task, term: &str) -> bool {
    task.title.to_lowercase().contains(term)
        || task.description.to_lowercase().contains(term)
        || task.tags.iter().any(|tag| tag.to_lowercase().contains(term))
        || task.due_date.is_some_and(|due| date_matches(due, term))
}

pub fn date_matches(date: NaiveDate, term: &str) -> bool {
    date_texts(date).iter().any(|text| text.contains(term))
}

fn date_texts(date: NaiveDate) -> Vec<String> {
    let weekday = date.format("%A").to_string().to_lowercase();
    let weekday_abbr = date.format("%a").to_string().to_lowercase();
    let month = date.format("%B").to_string().to_lowercase();
    let month_abbr = date.format("%b").to_string().to_lowercase();
    let year = date.year().to_string();
    let short_year = date.format("%y").to_string();

    vec![
        format!("{}, {} {}", weekday_abbr, month_abbr, date.day()),
        month,
        month_abbr,
        weekday,
        weekday_abbr,
        date.day().to_string(),
        date.month().to_string(),
        year,
        short_year,
        date.format("%m/%d/%y").to_string(),
    ]
}
