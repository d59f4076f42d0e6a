//! Normalized completion to status and display value
//!
//! Classification never fails: every input, however broken, maps to one of
//! the six statuses.

use crate::catalog::{DIMENSION_ATTRIBUTES, UNKNOWN_DIMENSION};
use crate::normalizer::normalize;
use crate::types::{ExtractionStatus, NormalizedResult};
use serde_json::{Map, Value};
use sheetwise_domain::ContextSource;

/// Key of the error payload
pub const ERROR_KEY: &str = "error";
/// Sentinel value for "not in the context"
pub const NOT_FOUND_SENTINEL: &str = "NOT FOUND";

/// Display text when there was no completion at all
pub const DISPLAY_NO_COMPLETION: &str = "Error during extraction.";
/// Display text for unparseable output
pub const DISPLAY_INVALID_JSON: &str = "Invalid JSON Output";
/// Display text when the expected key is absent
pub const DISPLAY_KEY_MISSING: &str = "Key not found in JSON";
/// Display text for rate-limited calls
pub const DISPLAY_RATE_LIMITED: &str = "Rate Limit Hit";

/// Wrap a provider failure so it classifies like any other completion
///
/// # Examples
///
/// ```
/// use sheetwise_extractor::error_payload;
///
/// assert_eq!(error_payload("boom"), r#"{"error":"boom"}"#);
/// ```
pub fn error_payload(message: &str) -> String {
    let mut map = Map::new();
    map.insert(ERROR_KEY.to_string(), Value::String(message.to_string()));
    Value::Object(map).to_string()
}

/// Case-insensitive "rate limit" substring check on provider error text
pub fn is_rate_limit_message(text: &str) -> bool {
    text.to_lowercase().contains("rate limit")
}

/// Whether a value belongs to the NOT FOUND sentinel family
///
/// Accepts `NOT FOUND`, `not found`, `**NOT FOUND**`, `"Not_Found"`,
/// `not-found` and similar spellings.
pub fn is_not_found(value: &str) -> bool {
    let stripped = value
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '"' | '\'' | '`'))
        .replace(['_', '-'], " ");
    let words: Vec<&str> = stripped.split_whitespace().collect();
    words.join(" ").eq_ignore_ascii_case(NOT_FOUND_SENTINEL)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_unknown_dimension(attribute_key: &str, value: &str) -> bool {
    DIMENSION_ATTRIBUTES.contains(&attribute_key)
        && value.trim().trim_end_matches(".0") == UNKNOWN_DIMENSION
}

/// Classify a raw completion for one attribute
///
/// `raw` is `None` when no completion was produced at all.
///
/// # Examples
///
/// ```
/// use sheetwise_domain::ContextSource;
/// use sheetwise_extractor::{classify, ExtractionStatus};
///
/// let result = classify("Gender", Some(r#"{"Gender": "Female"}"#), ContextSource::Document);
/// assert_eq!(result.status, ExtractionStatus::Ok);
/// assert_eq!(result.display_value, "Female");
/// ```
pub fn classify(attribute_key: &str, raw: Option<&str>, source: ContextSource) -> NormalizedResult {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return NormalizedResult {
            attribute_key: attribute_key.to_string(),
            raw_completion: raw.map(str::to_string),
            raw_json_text: String::new(),
            parsed: None,
            status: ExtractionStatus::Exception,
            display_value: DISPLAY_NO_COMPLETION.to_string(),
            diagnostic: "no completion received".to_string(),
            trace: None,
            source,
        };
    };

    let normalized = normalize(raw);
    let trace = normalized.trace;

    let (status, display_value, parsed, detail) = match serde_json::from_str::<Value>(&normalized.text) {
        Err(e) => (
            ExtractionStatus::InvalidJson,
            DISPLAY_INVALID_JSON.to_string(),
            None,
            format!("parse error: {}", e),
        ),
        Ok(Value::Object(map)) => {
            let (status, display, detail) = classify_object(attribute_key, &map);
            (status, display, Some(map), detail)
        }
        Ok(other) => (
            ExtractionStatus::KeyMissing,
            DISPLAY_KEY_MISSING.to_string(),
            None,
            format!("expected a JSON object, got {}", json_kind(&other)),
        ),
    };

    NormalizedResult {
        attribute_key: attribute_key.to_string(),
        raw_completion: Some(raw.to_string()),
        raw_json_text: normalized.text,
        parsed,
        status,
        display_value,
        diagnostic: format!("{}; {}", trace, detail),
        trace: Some(trace),
        source,
    }
}

fn classify_object(attribute_key: &str, map: &Map<String, Value>) -> (ExtractionStatus, String, String) {
    if let Some(value) = map.get(attribute_key) {
        let text = value_text(value);
        if value.is_null() || is_not_found(&text) {
            return (
                ExtractionStatus::NotFound,
                text,
                "model reported the value as not found".to_string(),
            );
        }
        let detail = if is_unknown_dimension(attribute_key, &text) {
            format!(
                "key '{}' present; {} is the unknown-dimension sentinel, not a measurement",
                attribute_key, UNKNOWN_DIMENSION
            )
        } else {
            format!("key '{}' present", attribute_key)
        };
        return (ExtractionStatus::Ok, text, detail);
    }

    if let Some(error) = map.get(ERROR_KEY) {
        let message = value_text(error);
        if is_rate_limit_message(&message) {
            return (
                ExtractionStatus::RateLimited,
                DISPLAY_RATE_LIMITED.to_string(),
                format!("provider rate limit: {}", message),
            );
        }
        let detail = format!("error payload: {}", message);
        return (ExtractionStatus::Exception, message, detail);
    }

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    (
        ExtractionStatus::KeyMissing,
        DISPLAY_KEY_MISSING.to_string(),
        format!("expected key '{}', found [{}]", attribute_key, keys.join(", ")),
    )
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
    use crate::types::Indicator;

    fn doc(key: &str, raw: &str) -> NormalizedResult {
        classify(key, Some(raw), ContextSource::Document)
    }

    #[test]
    fn test_absent_completion() {
        for raw in [None, Some(""), Some("  \n ")] {
            let result = classify("Gender", raw, ContextSource::Document);
            assert_eq!(result.status, ExtractionStatus::Exception);
            assert_eq!(result.display_value, DISPLAY_NO_COMPLETION);
            assert!(result.trace.is_none());
        }
    }

    #[test]
    fn test_ok_value() {
        let result = doc("Material Filling", r#"{"Material Filling": "GF, T"}"#);
        assert_eq!(result.status, ExtractionStatus::Ok);
        assert_eq!(result.display_value, "GF, T");
        assert_eq!(result.indicator(), Indicator::Green);
        assert!(result.parsed.unwrap().contains_key("Material Filling"));
    }

    #[test]
    fn test_not_found_family() {
        for value in ["NOT FOUND", "not found", "**NOT FOUND**", "Not_Found", " not-found ", "'NOT FOUND'"] {
            let raw = error_free_object("Colour", value);
            let result = doc("Colour", &raw);
            assert_eq!(result.status, ExtractionStatus::NotFound, "{}", value);
            assert_eq!(result.indicator(), Indicator::Yellow);
        }
        assert!(!is_not_found("none"));
        assert!(!is_not_found("NOT FOUNDRY"));
    }

    #[test]
    fn test_none_sentinel_is_ok() {
        let result = doc("Material Filling", r#"{"Material Filling": "none"}"#);
        assert_eq!(result.status, ExtractionStatus::Ok);
        assert_eq!(result.display_value, "none");
    }

    #[test]
    fn test_non_string_values_rendered() {
        let result = doc("Number Of Cavities", r#"{"Number Of Cavities": 12}"#);
        assert_eq!(result.status, ExtractionStatus::Ok);
        assert_eq!(result.display_value, "12");

        let result = doc("Number Of Cavities", r#"{"Number Of Cavities": null}"#);
        assert_eq!(result.status, ExtractionStatus::NotFound);
    }

    #[test]
    fn test_invalid_json() {
        let result = doc("Gender", "The connector is female.");
        assert_eq!(result.status, ExtractionStatus::InvalidJson);
        assert_eq!(result.display_value, DISPLAY_INVALID_JSON);
        assert_eq!(result.indicator(), Indicator::Red);

        let result = doc("Gender", "{Gender: Female}");
        assert_eq!(result.status, ExtractionStatus::InvalidJson);
    }

    #[test]
    fn test_key_missing() {
        let result = doc("Gender", r#"{"gender_value": "Female"}"#);
        assert_eq!(result.status, ExtractionStatus::KeyMissing);
        assert_eq!(result.display_value, DISPLAY_KEY_MISSING);
        assert!(result.diagnostic.contains("gender_value"));

        let result = doc("Gender", r#"["Female"]"#);
        assert_eq!(result.status, ExtractionStatus::KeyMissing);
        assert!(result.parsed.is_none());
    }

    #[test]
    fn test_key_match_is_exact() {
        let result = doc("Gender", r#"{"gender": "Female"}"#);
        assert_eq!(result.status, ExtractionStatus::KeyMissing);
    }

    #[test]
    fn test_rate_limit_any_case() {
        for message in [
            "rate limit exceeded, retry later",
            "Rate Limit exceeded",
            "RATE LIMIT reached for model",
        ] {
            let result = doc("Colour", &error_payload(message));
            assert_eq!(result.status, ExtractionStatus::RateLimited, "{}", message);
            assert_eq!(result.display_value, DISPLAY_RATE_LIMITED);
            assert_eq!(result.indicator(), Indicator::Grey);
        }
    }

    #[test]
    fn test_other_error_is_exception() {
        let result = doc("Colour", &error_payload("Request timed out after 60s"));
        assert_eq!(result.status, ExtractionStatus::Exception);
        assert_eq!(result.display_value, "Request timed out after 60s");
    }

    #[test]
    fn test_rate_limited_wording_variant_not_matched() {
        // Only the literal phrase counts
        let result = doc("Colour", &error_payload("too many requests (rate-limited)"));
        assert_eq!(result.status, ExtractionStatus::Exception);
    }

    #[test]
    fn test_expected_key_wins_over_error_key() {
        let result = doc("Colour", r#"{"Colour": "black", "error": "rate limit"}"#);
        assert_eq!(result.status, ExtractionStatus::Ok);
    }

    #[test]
    fn test_dimension_sentinel_flagged() {
        let result = doc("Height [MM]", r#"{"Height [MM]": "999"}"#);
        assert_eq!(result.status, ExtractionStatus::Ok);
        assert!(result.diagnostic.contains("unknown-dimension sentinel"));

        let result = doc("Height [MM]", r#"{"Height [MM]": "7.2"}"#);
        assert!(!result.diagnostic.contains("sentinel"));

        let result = doc("Number Of Cavities", r#"{"Number Of Cavities": "999"}"#);
        assert!(!result.diagnostic.contains("sentinel"));
    }

    #[test]
    fn test_raw_text_kept_for_audit() {
        let raw = "<think>looked at page 2</think>{\"Colour\": \"black\"}";
        let result = doc("Colour", raw);
        assert_eq!(result.raw_completion.as_deref(), Some(raw));
        assert_eq!(result.raw_json_text, r#"{"Colour": "black"}"#);
        assert!(result.diagnostic.starts_with("reasoning block stripped"));
    }

    fn error_free_object(key: &str, value: &str) -> String {
        let mut map = Map::new();
        map.insert(key.to_string(), Value::String(value.to_string()));
        Value::Object(map).to_string()
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_clean_object_round_trips(key in "[A-Za-z][A-Za-z /-]{0,24}", value in "[A-Za-z0-9 ,.]{1,30}") {
            let mut map = Map::new();
            map.insert(key.clone(), Value::String(value.clone()));
            let raw = Value::Object(map.clone()).to_string();
            let result = classify(&key, Some(&raw), ContextSource::Document);

            let parsed: Value = serde_json::from_str(&result.raw_json_text).unwrap();
            prop_assert_eq!(parsed, Value::Object(map));
            prop_assert_eq!(&result.display_value, &value);
            let expected = if is_not_found(&value) {
                ExtractionStatus::NotFound
            } else {
                ExtractionStatus::Ok
            };
            prop_assert_eq!(result.status, expected);
        }

        #[test]
        fn test_never_panics(raw in ".{0,200}") {
            let _ = classify("Colour", Some(&raw), ContextSource::Web);
        }
    }
}
