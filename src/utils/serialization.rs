//! Field codecs for string-only hash records.
//!
//! Every persisted field is stored as a string. Each pair of functions here
//! is symmetric: `deserialize_x(&serialize_x(v)) == v` for every value the
//! repositories write. Decoding never fails; unreadable input falls back to
//! the empty value of the type.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Current time truncated to the millisecond precision dates are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn serialize_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `None` is stored as the empty string.
pub fn serialize_optional_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(serialize_date).unwrap_or_default()
}

/// Empty or invalid input decodes to `None`.
pub fn deserialize_date(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

pub fn serialize_boolean(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Only the exact string `"true"` is true. There is no third state: `"false"`,
/// `""` and garbage all decode to `false`.
pub fn deserialize_boolean(value: &str) -> bool {
    value == "true"
}

pub fn serialize_optional_string(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// The empty string decodes to `None`.
pub fn deserialize_optional_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// JSON-encode a list.
pub fn serialize_array<T: Serialize>(values: &[T]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Parse failures decode to an empty list.
pub fn deserialize_array<T: DeserializeOwned>(value: &str) -> Vec<T> {
    serde_json::from_str(value).unwrap_or_default()
}

/// JSON-encode an optional object; `None` is stored as the empty string.
pub fn serialize_object<T: Serialize>(value: Option<&T>) -> String {
    value
        .and_then(|v| serde_json::to_string(v).ok())
        .unwrap_or_default()
}

/// Parse failures (and the empty string) decode to `None`.
pub fn deserialize_object<T: DeserializeOwned>(value: &str) -> Option<T> {
    if value.is_empty() {
        return None;
    }
    serde_json::from_str(value).ok()
}
