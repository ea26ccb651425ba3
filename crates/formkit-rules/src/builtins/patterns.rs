//! Pattern rules: email, url, alpha, alphanumeric.

use std::sync::LazyLock;

use regex::Regex;

use formkit_model::{RuleArg, Value, display_text, is_falsy};

use crate::context::RuleContext;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(([^<>()\[\]\.,;:\s@"]+(\.[^<>()\[\]\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("Invalid email regex")
});

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\w+:)?//([^\s.]+\.\S{2}|localhost[:?\d]*)\S*$").expect("Invalid URL regex")
});

static ALPHA_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZÀ-ÖØ-öø-ÿ]+$").expect("Invalid alpha regex"));

static ALPHA_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("Invalid alpha regex"));

static ALPHANUMERIC_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9À-ÖØ-öø-ÿ]+$").expect("Invalid alphanumeric regex")
});

static ALPHANUMERIC_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("Invalid alphanumeric regex"));

/// Character set option for `alpha`/`alphanumeric`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharSet {
    /// Latin letters plus accented Latin-1 letters.
    Default,
    /// ASCII letters only.
    Latin,
}

fn char_set(args: &[RuleArg]) -> CharSet {
    match args.first().and_then(RuleArg::as_text).as_deref() {
        Some("latin") => CharSet::Latin,
        _ => CharSet::Default,
    }
}

fn text_of(value: &Value) -> String {
    display_text(value)
}

/// `email(value)`: empty passes.
pub fn email(ctx: &RuleContext, _args: &[RuleArg]) -> bool {
    if is_falsy(&ctx.value) {
        return true;
    }
    EMAIL_REGEX.is_match(&text_of(&ctx.value))
}

/// `url(value)`.
pub fn url(ctx: &RuleContext, _args: &[RuleArg]) -> bool {
    URL_REGEX.is_match(&text_of(&ctx.value))
}

/// `alpha(value, set = "default")`.
pub fn alpha(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    let re = match char_set(args) {
        CharSet::Default => &*ALPHA_DEFAULT,
        CharSet::Latin => &*ALPHA_LATIN,
    };
    re.is_match(&text_of(&ctx.value))
}

/// `alphanumeric(value, set = "default")`.
pub fn alphanumeric(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    let re = match char_set(args) {
        CharSet::Default => &*ALPHANUMERIC_DEFAULT,
        CharSet::Latin => &*ALPHANUMERIC_LATIN,
    };
    re.is_match(&text_of(&ctx.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(rule: fn(&RuleContext, &[RuleArg]) -> bool, value: Value, args: &[&str]) -> bool {
        let args: Vec<RuleArg> = args.iter().map(|s| RuleArg::from(*s)).collect();
        rule(&RuleContext::detached(value), &args)
    }

    #[test]
    fn test_email() {
        assert!(check(email, json!("dev@example.com"), &[]));
        assert!(check(email, json!("first.last+tag@sub.example.org"), &[]));
        assert!(check(email, json!(""), &[]));
        assert!(!check(email, json!("dev@"), &[]));
        assert!(!check(email, json!("dev example.com"), &[]));
    }

    #[test]
    fn test_url() {
        assert!(check(url, json!("https://example.com/path?q=1"), &[]));
        assert!(check(url, json!("//cdn.example.com"), &[]));
        assert!(check(url, json!("http://localhost:8080"), &[]));
        assert!(!check(url, json!("example"), &[]));
        assert!(!check(url, json!(""), &[]));
    }

    #[test]
    fn test_alpha_sets() {
        assert!(check(alpha, json!("Crème"), &[]));
        assert!(!check(alpha, json!("Crème"), &["latin"]));
        assert!(check(alpha, json!("Creme"), &["latin"]));
        assert!(!check(alpha, json!("abc1"), &[]));
        assert!(!check(alpha, json!(""), &[]));
    }

    #[test]
    fn test_alphanumeric_sets() {
        assert!(check(alphanumeric, json!("abc123"), &[]));
        assert!(check(alphanumeric, json!(123), &[]));
        assert!(check(alphanumeric, json!("Ünïcode9"), &[]));
        assert!(!check(alphanumeric, json!("Ünïcode9"), &["latin"]));
        assert!(!check(alphanumeric, json!("a b"), &[]));
    }
}
