// src/digest.rs
//! Final digest assembly: header line plus the AI-authored body.

use chrono::{DateTime, Local};

/// Fixed title prefix of every delivered digest.
pub const DIGEST_HEADER_PREFIX: &str = "# RSS News Digest - ";

/// Prepends the dated header to the digest body. Pure given the clock.
pub fn format_digest(body: &str, now: DateTime<Local>) -> String {
    format!(
        "{}{}\n\n{}",
        DIGEST_HEADER_PREFIX,
        now.format("%Y/%m/%d %H:%M"),
        body
    )
}

/// Category header lines (`## ...`) in document order. The digest body is
/// AI-authored free text; this scan exists for logging only and makes no
/// structural guarantees.
pub fn category_headers(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("## "))
        .map(|line| line.trim_matches(['#', ' ']).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn header_then_blank_line_then_body() {
        let now = Local.with_ymd_and_hms(2025, 5, 3, 7, 5, 0).unwrap();
        let digest = format_digest("## World News\n- something happened", now);
        assert!(digest.starts_with("# RSS News Digest - 2025/05/03 07:05\n\n"));
        assert!(digest.ends_with("- something happened"));
    }

    #[test]
    fn body_is_kept_verbatim() {
        let now = Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let body = "line one\n\n  indented line\ntrailing";
        let digest = format_digest(body, now);
        let after_header = digest.split_once("\n\n").expect("header separator").1;
        assert_eq!(after_header, body);
    }

    #[test]
    fn category_headers_in_document_order() {
        let text = "# Title\n\n## AI and Tech\n- a\n\n## World News\n- b\n### not a category\n";
        assert_eq!(category_headers(text), vec!["AI and Tech", "World News"]);
    }

    #[test]
    fn no_headers_yields_empty() {
        assert!(category_headers("plain text\nno headers here").is_empty());
    }
}
