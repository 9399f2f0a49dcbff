//! Text normalization and matching helpers
//!
//! Titles are compared after lowercasing, trimming and collapsing internal
//! whitespace. When both titles carry an article number ("Article 12",
//! "article-12-1") the numbers are compared instead of the full text.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// "article" followed by an optional space or hyphen, the number and an optional sub-number
static ARTICLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)article[\s-]?(\d+(?:-\d+)?)").unwrap());

/// D/M/YYYY with one or two digit day and month
static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());

/// Lowercase, trim, collapse internal whitespace
pub fn normalize_title(title: &str) -> String {
    WHITESPACE
        .replace_all(title.trim(), " ")
        .to_lowercase()
}

/// Article number of a title ("5", "12-1"), if it has one
pub fn article_number(title: &str) -> Option<String> {
    ARTICLE_NUMBER
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Title equality used to detect existing records
///
/// The article number may appear anywhere in either title: "Article 5" and
/// "Code civil, article 5" match. The remote search is already restricted to
/// the target legislation, so the number alone identifies the article.
pub fn titles_match(left: &str, right: &str) -> bool {
    match (article_number(left), article_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => normalize_title(left) == normalize_title(right),
    }
}

/// Canonical YYYYMMDD digit string
///
/// `DD/MM/YYYY` is reordered with day and month zero-padded; anything else
/// is reduced to its digits. Blank input has no date.
pub fn canonical_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(caps) = SLASH_DATE.captures(value) {
        return Some(format!("{}{:0>2}{:0>2}", &caps[3], &caps[2], &caps[1]));
    }

    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Case-insensitive, whitespace-trimmed equality of node contents
pub fn same_content(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}
