//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an ISO date (`2026-03-01`) as `1 March 2026`.
///
/// Values that are not ISO dates are printed unchanged.
///
/// Usage in templates: `{{ updated_at|long_date }}`
#[askama::filter_fn]
pub fn long_date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_or(raw, |date| date.format("%-d %B %Y").to_string()))
}
