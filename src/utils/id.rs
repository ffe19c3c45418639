//! Identifier generation for new entities.
//!
//! Ids are `{prefix}_{base36 epoch millis}{16 hex chars}`. The timestamp
//! part makes them roughly sortable by creation time; uniqueness comes from
//! the 8 random bytes, not from the clock.

use chrono::Utc;
use uuid::Uuid;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of random bytes appended to every generated id
pub const ID_RANDOM_BYTES: usize = 8;

/// Generate a new entity id, optionally prefixed.
pub fn generate_id(prefix: Option<&str>) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random: [u8; ID_RANDOM_BYTES] = rand::random();
    let body = format!("{}{}", to_base36(millis), hex::encode(random));

    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, body),
        _ => body,
    }
}

/// Generate a random RFC 4122 version-4 UUID string.
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    // Digits are drawn from an ASCII table
    String::from_utf8(digits).unwrap_or_default()
}
