//! Typed field access on hash records.

use chrono::{DateTime, Utc};

use crate::infra::store::Record;
use crate::utils::serialization::{
    deserialize_array, deserialize_boolean, deserialize_date, deserialize_optional_string,
};

/// Field readers used by `deserialize` implementations.
///
/// Required fields report the missing field name; optional fields treat a
/// missing field like an empty one.
pub trait RecordExt {
    fn required(&self, field: &str) -> Result<String, String>;
    fn required_date(&self, field: &str) -> Result<DateTime<Utc>, String>;
    fn optional(&self, field: &str) -> Option<String>;
    fn optional_date(&self, field: &str) -> Option<DateTime<Utc>>;
    fn flag(&self, field: &str) -> bool;
    fn list(&self, field: &str) -> Vec<String>;
}

impl RecordExt for Record {
    fn required(&self, field: &str) -> Result<String, String> {
        self.get(field)
            .cloned()
            .ok_or_else(|| format!("missing field `{}`", field))
    }

    fn required_date(&self, field: &str) -> Result<DateTime<Utc>, String> {
        let raw = self.required(field)?;
        deserialize_date(&raw).ok_or_else(|| format!("invalid date in `{}`: {:?}", field, raw))
    }

    fn optional(&self, field: &str) -> Option<String> {
        self.get(field)
            .and_then(|value| deserialize_optional_string(value))
    }

    fn optional_date(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(|value| deserialize_date(value))
    }

    fn flag(&self, field: &str) -> bool {
        self.get(field)
            .map(|value| deserialize_boolean(value))
            .unwrap_or(false)
    }

    fn list(&self, field: &str) -> Vec<String> {
        self.get(field)
            .map(|value| deserialize_array(value))
            .unwrap_or_default()
    }
}
