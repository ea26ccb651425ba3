//! Date rules.
//!
//! All three rules go through [`parse_date`]. Values that do not parse fail
//! every date rule.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use formkit_model::{RuleArg, Value, display_text};

use crate::context::RuleContext;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a date/datetime string into a UTC timestamp.
///
/// Accepts RFC 3339 (with offset), ISO-like local datetimes, and the common
/// written date forms; local values are read as UTC.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_value(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Build a matcher for a date format made of `MM`, `M`, `DD`, `D`, `YYYY`, `YY`.
pub fn regex_for_format(format: &str) -> Option<Regex> {
    const TOKENS: &[(&str, &str)] = &[
        ("MM", "(0[1-9]|1[012])"),
        ("M", "([1-9]|1[012])"),
        ("DD", "([012][1-9]|3[01])"),
        ("D", "([012]?[1-9]|3[01])"),
        ("YYYY", r"\d{4}"),
        ("YY", r"\d{2}"),
    ];
    let mut pattern = format!("^{}$", regex::escape(format));
    for (token, replacement) in TOKENS {
        pattern = pattern.replacen(token, replacement, 1);
    }
    Regex::new(&pattern).ok()
}

/// Comparison point for `before`/`after`: the argument, or now.
fn comparison_point(args: &[RuleArg]) -> Option<NaiveDateTime> {
    match args.first() {
        Some(arg) if !arg.is_falsy_flag() => arg.as_text().and_then(|text| parse_date(&text)),
        _ => Some(Utc::now().naive_utc()),
    }
}

/// `date(value, format?)`.
pub fn date(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    match args.first().and_then(RuleArg::as_text) {
        Some(format) if !format.is_empty() => regex_for_format(&format)
            .is_some_and(|re| re.is_match(&display_text(&ctx.value))),
        _ => parse_value(&ctx.value).is_some(),
    }
}

/// `before(value, compare = now)`.
pub fn before(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    match (parse_value(&ctx.value), comparison_point(args)) {
        (Some(value), Some(point)) => value < point,
        _ => false,
    }
}

/// `after(value, compare = now)`.
pub fn after(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    match (parse_value(&ctx.value), comparison_point(args)) {
        (Some(value), Some(point)) => value > point,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(rule: fn(&RuleContext, &[RuleArg]) -> bool, value: &str, args: &[&str]) -> bool {
        let args: Vec<RuleArg> = args.iter().map(|s| RuleArg::from(*s)).collect();
        rule(&RuleContext::detached(json!(value)), &args)
    }

    #[test]
    fn test_parse_date_forms() {
        assert!(parse_date("2024-01-15").is_some());
        assert!(parse_date("2024-01-15T10:30:00Z").is_some());
        assert!(parse_date("2024-01-15T10:30").is_some());
        assert!(parse_date("01/15/2024").is_some());
        assert!(parse_date("January 15, 2024").is_some());
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("2024-13-01").is_none());
    }

    #[test]
    fn test_date_rule() {
        assert!(check(date, "2024-02-29", &[]));
        assert!(!check(date, "2023-02-29", &[]));
        assert!(check(date, "01/15/2024", &["MM/DD/YYYY"]));
        assert!(!check(date, "1/15/2024", &["MM/DD/YYYY"]));
        assert!(check(date, "1/15/24", &["M/DD/YY"]));
    }

    #[test]
    fn test_before_and_after() {
        assert!(check(before, "2000-01-01", &[]));
        assert!(!check(after, "2000-01-01", &[]));
        assert!(check(after, "2024-06-01", &["2024-01-01"]));
        assert!(!check(before, "2024-06-01", &["2024-01-01"]));
        assert!(!check(before, "garbage", &["2024-01-01"]));
        assert!(!check(after, "2024-06-01", &["garbage"]));
    }
}
