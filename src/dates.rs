//! Post date display.

use chrono::{Datelike, Local, NaiveDate};

/// `2026-02-01` → `February 1, 2026`.
///
/// Anything that is not a calendar date in `YYYY-MM-DD` form is returned
/// unchanged, so a free-form date like `Spring 2024` still shows up.
pub fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Year substituted for `{{ year }}`.
pub fn current_year() -> i32 {
    Local::now().year()
}
