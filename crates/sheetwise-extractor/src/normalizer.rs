//! Raw completion to best-effort JSON text
//!
//! Four steps, always in this order, each working on the previous output:
//!
//! ```text
//! raw → strip <think>…</think> → strip ```json fence → isolate {…} → parse check
//! ```
//!
//! A failed parse check falls back to the fence-stripped text instead of
//! discarding everything. Whether the result really is valid JSON is the
//! classifier's call.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Opening marker of a visible reasoning block
pub const REASONING_START: &str = "<think>";
/// Closing marker of a visible reasoning block
pub const REASONING_END: &str = "</think>";
/// Markdown opener for a JSON code fence
pub const FENCE_OPEN: &str = "```json";
/// Markdown fence closer
pub const FENCE_CLOSE: &str = "```";

/// How brace isolation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// `{…}` found and it parses; it is the output
    Isolated,
    /// No `{` before a `}`; the fence-stripped text is the output
    NoBraces,
    /// `{…}` found but did not parse; the fence-stripped text is the output
    ParseFailed,
}

/// The last normalization step that changed or confirmed the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeStage {
    /// Nothing applied beyond trimming
    Input,
    /// Reasoning block removed
    ReasoningStrip,
    /// Code fence removed
    FenceStrip,
    /// Isolated object parsed as JSON
    Validated,
}

/// Which steps applied to one completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizeTrace {
    /// Step 1 removed a reasoning block
    pub reasoning_stripped: bool,
    /// Step 2 removed a fence opener
    pub fence_stripped: bool,
    /// Outcome of steps 3 and 4
    pub isolation: Isolation,
}

impl NormalizeTrace {
    /// The furthest step that succeeded
    pub fn last_stage(&self) -> NormalizeStage {
        if self.isolation == Isolation::Isolated {
            NormalizeStage::Validated
        } else if self.fence_stripped {
            NormalizeStage::FenceStrip
        } else if self.reasoning_stripped {
            NormalizeStage::ReasoningStrip
        } else {
            NormalizeStage::Input
        }
    }
}

impl fmt::Display for NormalizeTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps = Vec::new();
        if self.reasoning_stripped {
            steps.push("reasoning block stripped");
        }
        if self.fence_stripped {
            steps.push("code fence stripped");
        }
        steps.push(match self.isolation {
            Isolation::Isolated => "JSON object isolated",
            Isolation::NoBraces => "no braces found",
            Isolation::ParseFailed => "isolated object did not parse, kept pre-isolation text",
        });
        write!(f, "{}", steps.join("; "))
    }
}

/// Normalizer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Text intended to be a JSON object
    pub text: String,
    /// Steps that applied
    pub trace: NormalizeTrace,
}

/// Run all four steps over a raw completion
///
/// # Examples
///
/// ```
/// use sheetwise_extractor::{normalize, NormalizeStage};
///
/// let raw = "<think>the datasheet says black</think>\n```json\n{\"Colour\": \"black\"}\n```";
/// let normalized = normalize(raw);
/// assert_eq!(normalized.text, r#"{"Colour": "black"}"#);
/// assert_eq!(normalized.trace.last_stage(), NormalizeStage::Validated);
/// ```
pub fn normalize(raw: &str) -> Normalized {
    let (text, reasoning_stripped) = match strip_reasoning(raw) {
        Some(rest) => (rest, true),
        None => (raw.trim(), false),
    };

    let (text, fence_stripped) = match strip_fence(text) {
        Some(inner) => (inner, true),
        None => (text, false),
    };

    let (output, isolation) = match isolate_object(text) {
        Some(candidate) if serde_json::from_str::<Value>(candidate).is_ok() => {
            (candidate, Isolation::Isolated)
        }
        Some(_) => (text, Isolation::ParseFailed),
        None => (text, Isolation::NoBraces),
    };

    Normalized {
        text: output.to_string(),
        trace: NormalizeTrace {
            reasoning_stripped,
            fence_stripped,
            isolation,
        },
    }
}

/// Step 1: the trimmed text after `</think>`, when a block precedes it
pub fn strip_reasoning(text: &str) -> Option<&str> {
    let start = text.find(REASONING_START)?;
    let end = text.find(REASONING_END)?;
    if end <= start {
        return None;
    }
    Some(text[end + REASONING_END.len()..].trim())
}

/// Step 2: the fence contents, when the trimmed text opens a JSON fence
pub fn strip_fence(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix(FENCE_OPEN)?.trim_end();
    let inner = inner.strip_suffix(FENCE_CLOSE).unwrap_or(inner);
    Some(inner.trim())
}

/// Step 3: first `{` through last `}` inclusive
pub fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_passes_through() {
        let normalized = normalize(r#"{"Gender": "Female"}"#);
        assert_eq!(normalized.text, r#"{"Gender": "Female"}"#);
        assert!(!normalized.trace.reasoning_stripped);
        assert!(!normalized.trace.fence_stripped);
        assert_eq!(normalized.trace.isolation, Isolation::Isolated);
    }

    #[test]
    fn test_strip_reasoning_requires_order() {
        assert_eq!(strip_reasoning("<think>x</think> {\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(strip_reasoning("</think> before <think>"), None);
        assert_eq!(strip_reasoning("no markers"), None);
        assert_eq!(strip_reasoning("<think> never closed"), None);
    }

    #[test]
    fn test_strip_fence_variants() {
        assert_eq!(strip_fence("```json\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(strip_fence("  ```json {\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(strip_fence("```\n{\"a\": 1}\n```"), None);
        assert_eq!(strip_fence("{\"a\": 1}"), None);
    }

    #[test]
    fn test_isolate_object() {
        assert_eq!(isolate_object("Sure! {\"a\": 1} Hope that helps."), Some("{\"a\": 1}"));
        assert_eq!(isolate_object("} backwards {"), None);
        assert_eq!(isolate_object("no braces"), None);
    }

    #[test]
    fn test_reasoning_never_survives() {
        let raw = "<think>Maybe {\"Colour\": \"red\"}? No.</think>{\"Colour\": \"black\"}";
        let normalized = normalize(raw);
        assert_eq!(normalized.text, r#"{"Colour": "black"}"#);
        assert!(!normalized.text.contains("red"));
    }

    #[test]
    fn test_prose_around_object() {
        let normalized = normalize("Here is the answer:\n{\"Sealing Class\": \"IP67\"}\nThanks");
        assert_eq!(normalized.text, r#"{"Sealing Class": "IP67"}"#);
        assert_eq!(normalized.trace.last_stage(), NormalizeStage::Validated);
    }

    #[test]
    fn test_unparseable_candidate_falls_back() {
        let raw = "```json\nThe value is {Gender: Female}\n```";
        let normalized = normalize(raw);
        assert_eq!(normalized.text, "The value is {Gender: Female}");
        assert_eq!(normalized.trace.isolation, Isolation::ParseFailed);
        assert_eq!(normalized.trace.last_stage(), NormalizeStage::FenceStrip);
    }

    #[test]
    fn test_no_braces_keeps_text() {
        let normalized = normalize("<think>hmm</think>  NOT FOUND  ");
        assert_eq!(normalized.text, "NOT FOUND");
        assert_eq!(normalized.trace.isolation, Isolation::NoBraces);
        assert_eq!(normalized.trace.last_stage(), NormalizeStage::ReasoningStrip);
    }

    #[test]
    fn test_trace_display() {
        let trace = normalize("<think>a</think>```json\n{\"k\": \"v\"}\n```").trace;
        assert_eq!(
            trace.to_string(),
            "reasoning block stripped; code fence stripped; JSON object isolated"
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn object(key: &str, value: &str) -> String {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), Value::String(value.to_string()));
        Value::Object(map).to_string()
    }

    proptest! {
        #[test]
        fn test_fenced_matches_unfenced(key in "[A-Za-z][A-Za-z ]{0,20}", value in "[A-Za-z0-9 ,.-]{0,30}") {
            let json = object(&key, &value);
            let fenced = format!("```json\n{}\n```", json);
            prop_assert_eq!(normalize(&fenced).text, normalize(&json).text);
        }

        #[test]
        fn test_reasoning_text_removed(thought in "[a-z ]{1,40}", value in "[A-Za-z0-9]{1,10}") {
            let raw = format!("<think>~~{}~~</think>\n{}", thought, object("Colour", &value));
            let normalized = normalize(&raw);
            prop_assert!(!normalized.text.contains("~~"));
            prop_assert_eq!(normalized.text, object("Colour", &value));
        }

        #[test]
        fn test_never_panics(raw in ".{0,200}") {
            let _ = normalize(&raw);
        }
    }
}
