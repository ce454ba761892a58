//! Title extraction from raw page bodies.
//!
//! The first `<title>` ... `</title>` pair wins, matched
//! non-greedily on a single line. No HTML parsing, entity decoding or trimming.

use regex::Regex;

lazy_static::lazy_static! {
    static ref TITLE_PATTERN: Regex =
        Regex::new(r"<title>(.*?)</title>").expect("title pattern is a valid regex");
}

/// Return the first title in `body`, if any.
pub fn find_title(body: &str) -> Option<&str> {
    TITLE_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Return the first title in `body`, or an empty string when there is none.
pub fn extract_title(body: &str) -> String {
    find_title(body).unwrap_or_default().to_string()
}
