//! Pluggable body serialization.
//!
//! The [`Serializer`] strategy converts between `serde_json::Value` and body
//! text, which keeps the trait object-safe; the generic halves (`T` to
//! `Value` and back) live in the free functions [`serialize`] and
//! [`deserialize`]. A client holds one serializer process-wide and every call
//! may override it without touching shared state.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// Strategy for rendering request bodies and parsing response bodies.
pub trait Serializer: std::fmt::Debug + Send + Sync {
    /// Render a JSON value as body text.
    fn to_text(&self, value: &Value) -> Result<String>;

    /// Parse body text into a JSON value.
    fn from_text(&self, text: &str) -> Result<Value>;
}

/// Serialize a value to body text with the given strategy.
pub fn serialize<T: Serialize>(serializer: &dyn Serializer, value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    serializer.to_text(&value)
}

/// Deserialize body text with the given strategy.
///
/// Empty text yields `Ok(None)` without invoking the underlying codec, so an
/// absent body stays distinguishable from a body that deserialized to a
/// default value.
pub fn deserialize<T: DeserializeOwned>(
    serializer: &dyn Serializer,
    text: &str,
) -> Result<Option<T>> {
    if text.is_empty() {
        return Ok(None);
    }
    let value = serializer.from_text(text)?;
    let result = serde_path_to_error::deserialize(value)
        .map_err(|e| Error::json_deserialization(e.path().to_string(), e.inner().to_string()))?;
    Ok(Some(result))
}

/// Compact JSON serializer, the process-wide default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn to_text(&self, value: &Value) -> Result<String> {
        serde_json::to_string(value).map_err(Into::into)
    }

    fn from_text(&self, text: &str) -> Result<Value> {
        parse_json(text)
    }
}

/// Pretty-printed JSON serializer, for peers that expect readable payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJsonSerializer;

impl Serializer for PrettyJsonSerializer {
    fn to_text(&self, value: &Value) -> Result<String> {
        serde_json::to_string_pretty(value).map_err(Into::into)
    }

    fn from_text(&self, text: &str) -> Result<Value> {
        parse_json(text)
    }
}

fn parse_json(text: &str) -> Result<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::json_deserialization(e.path().to_string(), e.inner().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Item {
        id: u64,
        name: String,
    }

    #[test]
    fn json_round_trip() {
        let item = Item {
            id: 12,
            name: "A".to_string(),
        };

        let text = serialize(&JsonSerializer, &item).expect("serialize");
        assert_eq!(text, r#"{"id":12,"name":"A"}"#);

        let back: Option<Item> = deserialize(&JsonSerializer, &text).expect("deserialize");
        assert_eq!(back, Some(item));
    }

    #[test]
    fn empty_text_is_absent() {
        let result: Option<Item> = deserialize(&JsonSerializer, "").expect("deserialize");
        assert_eq!(result, None);
    }

    #[test]
    fn pretty_round_trip() {
        let item = Item {
            id: 1,
            name: "pretty".to_string(),
        };

        let text = serialize(&PrettyJsonSerializer, &item).expect("serialize");
        assert!(text.contains('\n'));

        let back: Option<Item> = deserialize(&PrettyJsonSerializer, &text).expect("deserialize");
        assert_eq!(back, Some(item));
    }

    #[test]
    fn deserialization_error_includes_path() {
        let text = r#"{"id":"not-a-number","name":"A"}"#;
        let result: Result<Option<Item>> = deserialize(&JsonSerializer, text);

        let err = result.expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("id"), "expected path 'id' in error: {msg}");
    }

    #[test]
    fn invalid_json_fails() {
        let result: Result<Option<Item>> = deserialize(&JsonSerializer, "not json");
        assert!(result.is_err());
    }
}
