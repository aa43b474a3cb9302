//! Check functions for primitive value shapes
//!
//! Every check is a pure predicate over a raw string: malformed input yields
//! `false`, never a panic or an error. Schema rules compose them through
//! [`check_entity_values`].

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use url::Url;

use crate::entity::DataEntity;
use crate::error::{EntityError, Phase};
use crate::id::{classify_id, IdKind};
use crate::value::PropValue;

/// Signature shared by all string checks
pub type CheckFn = fn(&str) -> bool;

/// URL schemes accepted by [`is_url`]
const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps", "s3", "gs"];

/// Units accepted by [`is_content_size`], smallest first
const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Top-level MIME types accepted by [`is_encoding_format`]
const MIME_TOP_LEVEL: &[&str] = &[
    "application",
    "audio",
    "chemical",
    "font",
    "image",
    "message",
    "model",
    "multipart",
    "text",
    "video",
];

static CONTENT_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)([KMGTP]?B)$").expect("invalid content size regex")
});

static SHA256_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("invalid sha256 regex"));

static MIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)/([A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*)(\s*;\s*[A-Za-z0-9_-]+=\S+)*$")
        .expect("invalid encoding format regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("invalid email regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9]{1,4}[-\s]?(\(?[0-9]{1,4}\)?[-\s]?){1,4}[0-9]{1,4}$")
        .expect("invalid phone number regex")
});

static ERAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8}$").expect("invalid e-Rad regex"));

/// Absolute URI with a recognised scheme and a host
pub fn is_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => URL_SCHEMES.contains(&url.scheme()) && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Relative path such as "./data/file.csv" or "data/"
pub fn is_relative_path(value: &str) -> bool {
    matches!(classify_id(value), IdKind::Relative | IdKind::Root)
}

/// Absolute filesystem path such as "/data/file.csv"
pub fn is_absolute_path(value: &str) -> bool {
    classify_id(value) == IdKind::AbsolutePath
}

/// Parse an ISO 8601 date or date-time
///
/// Accepts `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) and
/// RFC 3339 date-times with an offset.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn is_iso8601(value: &str) -> bool {
    parse_iso8601(value).is_some()
}

/// Valid ISO 8601 value strictly after `now`
pub fn is_future_date(value: &str, now: DateTime<Utc>) -> bool {
    parse_iso8601(value).is_some_and(|dt| dt > now)
}

/// Valid ISO 8601 value not after `now`
pub fn is_past_date(value: &str, now: DateTime<Utc>) -> bool {
    parse_iso8601(value).is_some_and(|dt| dt <= now)
}

/// `<number><unit>` with unit in B, KB, MB, GB, TB, PB and no space between
pub fn is_content_size(value: &str) -> bool {
    content_size_to_bytes(value).is_some()
}

/// Canonical byte count of a content size (binary multiples)
pub fn content_size_to_bytes(value: &str) -> Option<u64> {
    let caps = CONTENT_SIZE_RE.captures(value)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();
    let exponent = SIZE_UNITS.iter().position(|u| *u == unit)?;
    let bytes = number * 1024f64.powi(exponent as i32);
    if bytes.is_finite() && bytes < u64::MAX as f64 {
        Some(bytes.round() as u64)
    } else {
        None
    }
}

/// Exactly 64 hexadecimal characters
pub fn is_sha256(value: &str) -> bool {
    SHA256_RE.is_match(value)
}

/// MIME type such as "text/csv" or "application/ld+json; charset=utf-8"
pub fn is_encoding_format(value: &str) -> bool {
    match MIME_RE.captures(value) {
        Some(caps) => caps
            .get(1)
            .is_some_and(|top| MIME_TOP_LEVEL.contains(&top.as_str().to_ascii_lowercase().as_str())),
        None => false,
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Phone number with optional country code, digits grouped by "-" or " "
pub fn is_phone_number(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits) && PHONE_RE.is_match(value)
}

/// e-Rad researcher number: eight digits
pub fn is_erad_researcher_number(value: &str) -> bool {
    ERAD_RE.is_match(value)
}

/// Apply string checks to the present properties of an entity
///
/// For every property in `checks` that the entity holds, each string value
/// (the value itself or the strings of a list) is run through its check; a
/// failure appends a violation. Absent properties are skipped, and
/// non-string values are left to the type check. Returns the aggregate,
/// possibly empty, for the caller to merge with its own findings.
pub fn check_entity_values(entity: &DataEntity, checks: &[(&str, CheckFn)]) -> EntityError {
    let mut error = EntityError::new(entity, Phase::Shape);
    for (prop, check) in checks {
        let Some(value) = entity.get(prop) else {
            continue;
        };
        for s in string_values(value) {
            if !check(s) {
                error.add(*prop, format!("The value {:?} is invalid format.", s));
            }
        }
    }
    error
}

fn string_values(value: &PropValue) -> Vec<&str> {
    match value {
        PropValue::Str(s) => vec![s.as_str()],
        PropValue::List(items) => items.iter().filter_map(PropValue::as_str).collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::base;
    use chrono::TimeZone;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://orcid.org/0000-0001-2345-6789"));
        assert!(is_url("http://example.com"));
        assert!(is_url("ftp://example.com/data.csv"));
        assert!(!is_url("./data.csv"));
        assert!(!is_url("mailto:someone@example.com"));
        assert!(!is_url("https://"));
        assert!(!is_url("not a url"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_path_kinds_are_exclusive() {
        for value in ["./data.csv", "data/", "./"] {
            assert!(is_relative_path(value), "{}", value);
            assert!(!is_absolute_path(value), "{}", value);
        }
        assert!(is_absolute_path("/data/raw.csv"));
        assert!(!is_relative_path("/data/raw.csv"));
        for value in ["", "https://example.com/a", "#frag"] {
            assert!(!is_relative_path(value), "{}", value);
            assert!(!is_absolute_path(value), "{}", value);
        }
    }

    #[test]
    fn test_iso8601() {
        assert!(is_iso8601("2023-04-01"));
        assert!(is_iso8601("2023-04-01T12:30:00"));
        assert!(is_iso8601("2023-04-01T12:30:00+09:00"));
        assert!(is_iso8601("2023-04-01T12:30:00Z"));
        assert!(!is_iso8601("2023-13-01"));
        assert!(!is_iso8601("April 1st"));
        assert!(!is_iso8601(""));
    }

    #[test]
    fn test_future_and_past() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(is_future_date("9999-04-01", now));
        assert!(!is_future_date("2000-01-01", now));
        assert!(!is_future_date("2024-01-01", now));
        assert!(!is_future_date("garbage", now));
        assert!(is_past_date("2000-01-01", now));
        assert!(!is_past_date("garbage", now));
    }

    #[test]
    fn test_content_size() {
        assert!(is_content_size("100GB"));
        assert!(!is_content_size("1.5 MB"));
        assert!(is_content_size("12B"));
        assert!(!is_content_size("100"));
        assert!(!is_content_size("100XB"));
        assert!(!is_content_size("GB"));
        assert_eq!(content_size_to_bytes("1KB"), Some(1024));
        assert_eq!(content_size_to_bytes("2B"), Some(2));
        assert_eq!(content_size_to_bytes("1.5KB"), Some(1536));
        assert!(content_size_to_bytes("101GB") > content_size_to_bytes("100GB"));
        assert!(content_size_to_bytes("1TB") > content_size_to_bytes("1000GB"));
    }

    #[test]
    fn test_sha256() {
        let digest = "a".repeat(64);
        assert!(is_sha256(&digest));
        assert!(!is_sha256(&"a".repeat(63)));
        assert!(!is_sha256(&"g".repeat(64)));
    }

    #[test]
    fn test_encoding_format() {
        assert!(is_encoding_format("text/csv"));
        assert!(is_encoding_format("application/ld+json"));
        assert!(is_encoding_format("text/plain; charset=utf-8"));
        assert!(!is_encoding_format("csv"));
        assert!(!is_encoding_format("foo/bar"));
    }

    #[test]
    fn test_contact_formats() {
        assert!(is_email("someone@example.ac.jp"));
        assert!(!is_email("someone@"));
        assert!(is_phone_number("03-1234-5678"));
        assert!(is_phone_number("+81 3 1234 5678"));
        assert!(!is_phone_number("12"));
        assert!(is_erad_researcher_number("12345678"));
        assert!(!is_erad_researcher_number("1234567"));
    }

    #[test]
    fn test_check_entity_values_skips_absent_properties() {
        let mut file = base::file("./data.csv");
        file.set("encodingFormat", "not-a-mime");
        let error = check_entity_values(
            &file,
            &[("encodingFormat", is_encoding_format), ("sha256", is_sha256)],
        );
        assert_eq!(error.len(), 1);
        assert_eq!(error.violations()[0].property, "encodingFormat");
    }

    #[test]
    fn test_check_entity_values_checks_list_items() {
        let mut file = base::file("./data.csv");
        file.set("url", vec!["https://example.com/a", "nope", "also nope"]);
        let error = check_entity_values(&file, &[("url", is_url)]);
        assert_eq!(error.len(), 2);
    }
}
