//! Typed records reconstructed from GitHub JSON payloads.
//!
//! Entities are plain values: they normalize optional fields while
//! deserializing and carry no other behavior.

pub mod account;
pub mod activity;
pub mod gist;
pub mod prelude;
pub mod rate_budget;
pub mod repository;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Deserialize an optional string, mapping empty or whitespace-only values to `None`.
pub(crate) fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Parse a list payload.
///
/// A JSON `null` (empty 2xx body) and an empty or whitespace-only artifact
/// both mean "no entries".
pub fn parse_list<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let items: Option<Vec<T>> = serde_json::from_slice(bytes)?;
    Ok(items.unwrap_or_default())
}

/// Whether a payload is GitHub's `{"message": "Not Found"}` error body.
pub fn is_not_found(value: &serde_json::Value) -> bool {
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|m| m.eq_ignore_ascii_case("Not Found"))
}
