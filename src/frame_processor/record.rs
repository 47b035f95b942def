// SPDX-License-Identifier: GPL-3.0-only

//! Product record parsing
//!
//! QR payloads are JSON objects written by the product code generator:
//!
//! ```json
//! {"product_id": 7, "name": "Widget", "category": "Tools", "price": "9.99", "description": null}
//! ```

use super::types::DecodedRecord;
use crate::errors::ParseError;
use serde_json::Value;

/// Parse payload bytes into a product record
///
/// Bytes that are not a JSON object give [`ParseError::MalformedPayload`].
/// An object with missing, mistyped or unexpected keys gives
/// [`ParseError::SchemaMismatch`].
pub fn parse(payload: &[u8]) -> Result<DecodedRecord, ParseError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ParseError::MalformedPayload(format!("not UTF-8: {}", e)))?;

    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| ParseError::MalformedPayload(e.to_string()))?;

    if !value.is_object() {
        return Err(ParseError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    let mut record: DecodedRecord =
        serde_json::from_value(value).map_err(|e| ParseError::SchemaMismatch(e.to_string()))?;

    if record
        .description
        .as_deref()
        .is_some_and(|d| d.trim().is_empty())
    {
        record.description = None;
    }

    Ok(record)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generator_payload() {
        let record = parse(
            br#"{"product_id": 7, "name": "Widget", "category": "Tools", "price": "9.99", "description": "Blue"}"#,
        )
        .unwrap();
        assert_eq!(record.product_id, 7);
        assert_eq!(record.name, "Widget");
        assert_eq!(record.price.as_str(), "9.99");
        assert_eq!(record.description.as_deref(), Some("Blue"));
    }

    #[test]
    fn test_description_is_optional() {
        let absent =
            parse(br#"{"product_id": 1, "name": "A", "category": "B", "price": 2}"#).unwrap();
        assert_eq!(absent.description, None);

        let null = parse(
            br#"{"product_id": 1, "name": "A", "category": "B", "price": 2, "description": null}"#,
        )
        .unwrap();
        assert_eq!(null.description, None);

        let empty = parse(
            br#"{"product_id": 1, "name": "A", "category": "B", "price": 2, "description": ""}"#,
        )
        .unwrap();
        assert_eq!(empty.description, None);
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(matches!(
            parse(b"not json"),
            Err(ParseError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse(&[0xff, 0xfe, 0x00]),
            Err(ParseError::MalformedPayload(_))
        ));
        assert!(matches!(parse(b"[1, 2]"), Err(ParseError::MalformedPayload(_))));
    }

    #[test]
    fn test_missing_field_is_schema_mismatch() {
        assert!(matches!(
            parse(br#"{"product_id": 1, "name": "A", "price": 2}"#),
            Err(ParseError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_wrong_shape_is_schema_mismatch() {
        // product_id must be an integer
        assert!(matches!(
            parse(br#"{"product_id": "one", "name": "A", "category": "B", "price": 2}"#),
            Err(ParseError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse(br#"{"product_id": 1, "name": "A", "category": "B", "price": "free"}"#),
            Err(ParseError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse(br#"{"product_id": 1, "name": "A", "category": "B", "price": 2, "sku": "x"}"#),
            Err(ParseError::SchemaMismatch(_))
        ));
    }
}
