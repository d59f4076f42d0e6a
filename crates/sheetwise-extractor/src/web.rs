//! Web-derived grounding text
//!
//! Scraping is someone else's job; this module only turns what a scraper or
//! a product API hands over into the `key: value` lines the web prompts
//! expect.

use async_trait::async_trait;
use serde_json::Value;
use sheetwise_domain::{WebContext, WebSource};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from preparing web text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WebError {
    /// Product document was not valid JSON
    #[error("Invalid product JSON: {0}")]
    InvalidJson(String),

    /// Input produced no key/value lines
    #[error("No key/value data found in {0}")]
    NoData(String),
}

/// Drop repeated lines and blank lines, keeping first occurrences in order
pub fn dedup_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && seen.insert(*line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep only `key: value` lines from free text, trimmed and de-duplicated
///
/// # Examples
///
/// ```
/// use sheetwise_extractor::key_value_lines;
///
/// let text = "Specifications\nColour : black\nnoise\nColour: black\nIP Code: IP67";
/// assert_eq!(key_value_lines(text), "Colour: black\nIP Code: IP67");
/// ```
pub fn key_value_lines(text: &str) -> String {
    let pairs: Vec<String> = text
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| format!("{}: {}", key, value))
        })
        .collect();
    dedup_lines(&pairs.join("\n"))
}

/// Flatten a product API document into `key: value` lines
///
/// Reads scalar fields of `product`, then `product.specifications[]`
/// (`name`/`value` pairs), then `product.features[]` as `Feature: name`.
pub fn flatten_product_json(document: &Value) -> Option<String> {
    let product = document.get("product")?.as_object()?;
    let mut lines = Vec::new();

    for (key, value) in product {
        if let Some(text) = scalar_text(value) {
            lines.push(format!("{}: {}", key, text));
        }
    }

    if let Some(specs) = product.get("specifications").and_then(Value::as_array) {
        for spec in specs {
            let name = spec.get("name").and_then(scalar_text);
            let value = spec.get("value").and_then(scalar_text);
            if let (Some(name), Some(value)) = (name, value) {
                lines.push(format!("{}: {}", name, value));
            }
        }
    }

    if let Some(features) = product.get("features").and_then(Value::as_array) {
        for feature in features {
            if let Some(name) = feature.get("name").and_then(scalar_text) {
                lines.push(format!("Feature: {}", name));
            }
        }
    }

    (!lines.is_empty()).then(|| dedup_lines(&lines.join("\n")))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Web text known ahead of time, optionally per part number
#[derive(Debug, Clone, Default)]
pub struct StaticWebSource {
    fallback: Option<WebContext>,
    by_part: Vec<(String, WebContext)>,
}

impl StaticWebSource {
    /// Source answering every lookup with the same text
    pub fn new(context: WebContext) -> Self {
        Self {
            fallback: Some(context),
            by_part: Vec::new(),
        }
    }

    /// Source that knows nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Text for a specific part number
    pub fn with_part(mut self, part_number: impl Into<String>, context: WebContext) -> Self {
        self.by_part.push((part_number.into(), context));
        self
    }

    /// Free text reduced to its `key: value` lines
    pub fn from_text(text: &str, source_name: impl Into<String>) -> Result<Self, WebError> {
        let source_name = source_name.into();
        let lines = key_value_lines(text);
        if lines.is_empty() {
            return Err(WebError::NoData(source_name));
        }
        Ok(Self::new(WebContext::new(lines, source_name)))
    }

    /// Product API JSON flattened to `key: value` lines
    pub fn from_product_json(json: &str, source_name: impl Into<String>) -> Result<Self, WebError> {
        let source_name = source_name.into();
        let document: Value =
            serde_json::from_str(json).map_err(|e| WebError::InvalidJson(e.to_string()))?;
        let lines = flatten_product_json(&document).ok_or_else(|| WebError::NoData(source_name.clone()))?;
        Ok(Self::new(WebContext::new(lines, source_name)))
    }
}

#[async_trait]
impl WebSource for StaticWebSource {
    type Error = WebError;

    async fn lookup(&self, part_number: Option<&str>) -> Result<Option<WebContext>, Self::Error> {
        if let Some(part) = part_number.map(str::trim) {
            if let Some((_, context)) = self.by_part.iter().find(|(p, _)| p.eq_ignore_ascii_case(part)) {
                return Ok(Some(context.clone()));
            }
        }
        Ok(self.fallback.clone())
    }
}

/// Ask a web source for grounding text, treating failures as "no web text"
pub async fn resolve_web_context<W: WebSource>(source: &W, part_number: Option<&str>) -> Option<WebContext> {
    match source.lookup(part_number).await {
        Ok(Some(context)) if !context.is_empty() => {
            debug!(
                "Web text from {}: {} lines",
                context.source_name,
                context.text.lines().count()
            );
            Some(context)
        }
        Ok(_) => None,
        Err(e) => {
            warn!("Web lookup failed, continuing without web text: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dedup_preserves_order() {
        assert_eq!(dedup_lines("b: 1\na: 2\n\nb: 1\n c: 3 "), "b: 1\na: 2\nc: 3");
    }

    #[test]
    fn test_key_value_lines_skip_empty_sides() {
        assert_eq!(key_value_lines("Colour:\n: black\nGender: female"), "Gender: female");
    }

    #[test]
    fn test_flatten_product_json() {
        let document = json!({
            "product": {
                "partNumber": "1-967616-1",
                "pins": 12,
                "sealed": true,
                "dimensions": {"height": 7.2},
                "specifications": [
                    {"name": "Colour", "value": "black"},
                    {"name": "IP Code"}
                ],
                "features": [{"name": "CPA"}, "ignored"]
            }
        });

        let text = flatten_product_json(&document).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert!(lines.contains(&"partNumber: 1-967616-1"));
        assert!(lines.contains(&"pins: 12"));
        assert!(lines.contains(&"sealed: true"));
        assert!(lines.contains(&"Colour: black"));
        assert!(lines.contains(&"Feature: CPA"));
        assert!(!text.contains("height"));
        assert!(!text.contains("IP Code"));
    }

    #[test]
    fn test_flatten_without_product() {
        assert_eq!(flatten_product_json(&json!({"items": []})), None);
    }

    #[test]
    fn test_from_product_json_errors() {
        assert!(matches!(
            StaticWebSource::from_product_json("{not json", "TraceParts"),
            Err(WebError::InvalidJson(_))
        ));
        assert_eq!(
            StaticWebSource::from_product_json(r#"{"product": {}}"#, "TraceParts").unwrap_err(),
            WebError::NoData("TraceParts".to_string())
        );
    }

    #[tokio::test]
    async fn test_lookup_prefers_part_specific_text() {
        let source = StaticWebSource::new(WebContext::new("Colour: grey", "generic"))
            .with_part("968970-1", WebContext::new("Colour: black", "TraceParts"));

        let specific = source.lookup(Some("968970-1")).await.unwrap().unwrap();
        assert_eq!(specific.source_name, "TraceParts");

        let generic = source.lookup(Some("other")).await.unwrap().unwrap();
        assert_eq!(generic.text, "Colour: grey");
    }

    #[tokio::test]
    async fn test_resolve_ignores_empty_text() {
        let source = StaticWebSource::new(WebContext::new("  ", "blank"));
        assert!(resolve_web_context(&source, None).await.is_none());
        assert!(resolve_web_context(&StaticWebSource::empty(), None).await.is_none());
    }
}
