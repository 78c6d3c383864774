//! Publication date extraction.
//!
//! Strategies, in order:
//! 1. `<meta>` tags named in the lexicon, parsed as ISO-8601
//! 2. `<time datetime="...">` elements, parsed as ISO-8601
//! 3. The first date-shaped token in the first 500 characters of the body
//!
//! Parsed dates are written as `DD-MM-YYYY`. A body token that matches the
//! shape but is not a calendar date is kept verbatim.

use super::page::PageDocument;
use crate::models::NOT_FOUND;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;

/// Output format for every normalized date.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Body prefix scanned for date-shaped tokens.
pub const SCAN_CHARS: usize = 500;

static TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("time selector"));

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{4}|[0-9]{4}[-/][0-9]{1,2}[-/][0-9]{1,2})\b")
        .expect("date token regex")
});

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601-like value into the calendar date it names.
///
/// Offset-qualified timestamps keep the date in their own offset.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.date_naive());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Normalize a `DD-MM-YYYY`/`YYYY-MM-DD` shaped token, `-` or `/` separated.
fn normalize_token(token: &str) -> Option<String> {
    let parts: Vec<u32> = token
        .split(['-', '/'])
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    let [a, b, c] = parts[..] else {
        return None;
    };
    let (year, month, day) = if token.find(['-', '/']) == Some(4) {
        (a, b, c)
    } else {
        (c, b, a)
    };
    NaiveDate::from_ymd_opt(year as i32, month, day).map(|d| d.format(DATE_FORMAT).to_string())
}

/// First date-shaped token in the first [`SCAN_CHARS`] characters of `text`.
pub fn scan_text_date(text: &str) -> Option<String> {
    let prefix: String = text.chars().take(SCAN_CHARS).collect();
    DATE_TOKEN.find(&prefix).map(|m| {
        let token = m.as_str();
        normalize_token(token).unwrap_or_else(|| token.to_string())
    })
}

/// Resolve the publication date of a page.
pub fn extract_date(page: &PageDocument, meta_selectors: &[Selector], content: &str) -> String {
    let from_meta = || {
        meta_selectors.iter().find_map(|selector| {
            page.cleaned
                .select(selector)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .and_then(parse_iso_date)
        })
    };
    let from_time = || {
        page.rendered
            .select(&TIME)
            .filter_map(|time| time.value().attr("datetime"))
            .find_map(parse_iso_date)
    };

    from_meta()
        .or_else(from_time)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .or_else(|| scan_text_date(content))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::lexicon::Lexicon;

    fn meta_selectors() -> Vec<Selector> {
        Lexicon::default()
            .date_meta
            .iter()
            .map(|m| Selector::parse(&m.selector()).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_iso_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_iso_date("2024-03-05"), expected);
        assert_eq!(parse_iso_date("2024-03-05T10:20:30Z"), expected);
        assert_eq!(parse_iso_date("2024-03-05T10:20:30+01:00"), expected);
        assert_eq!(parse_iso_date("2024-03-05T10:20:30.123456"), expected);
        assert_eq!(parse_iso_date("2024-03-05 10:20"), expected);
        assert_eq!(parse_iso_date("2024-03-05T10:20:30+0100"), expected);
        assert_eq!(parse_iso_date("5 mars 2024"), None);
    }

    #[test]
    fn test_offset_keeps_local_date() {
        assert_eq!(
            parse_iso_date("2024-03-05T23:30:00-05:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn test_meta_date_wins() {
        let page = PageDocument::parse(
            r#"<html><head><meta property="article:published_time" content="2023-11-02T08:00:00Z"></head>
               <body><time datetime="2022-01-01">x</time><p>Publié le 10/10/2020</p></body></html>"#,
        );
        assert_eq!(extract_date(&page, &meta_selectors(), "Publié le 10/10/2020"), "02-11-2023");
    }

    #[test]
    fn test_unparseable_meta_falls_through_to_time() {
        let page = PageDocument::parse(
            r#"<html><head><meta name="date" content="hier"></head>
               <body><time>sans attribut</time><time datetime="2022-01-07T12:00:00">x</time></body></html>"#,
        );
        assert_eq!(extract_date(&page, &meta_selectors(), ""), "07-01-2022");
    }

    #[test]
    fn test_text_scan() {
        let page = PageDocument::parse("<html><body></body></html>");
        assert_eq!(
            extract_date(&page, &meta_selectors(), "Tunis, le 3/7/2024 - Un foyer"),
            "03-07-2024"
        );
        assert_eq!(
            extract_date(&page, &meta_selectors(), "Mise à jour 2024/12/31"),
            "31-12-2024"
        );
    }

    #[test]
    fn test_text_scan_keeps_invalid_token() {
        assert_eq!(scan_text_date("le 31-02-2024 au soir"), Some("31-02-2024".to_string()));
    }

    #[test]
    fn test_text_scan_limited_to_prefix() {
        let text = format!("{} 01-01-2024", "x".repeat(600));
        assert_eq!(scan_text_date(&text), None);
    }

    #[test]
    fn test_not_found() {
        let page = PageDocument::parse("<html><body>rien</body></html>");
        assert_eq!(extract_date(&page, &meta_selectors(), "rien"), NOT_FOUND);
    }
}
