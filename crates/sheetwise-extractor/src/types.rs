//! Request and result types for extraction

use crate::normalizer::NormalizeTrace;
use crate::prompt::PromptBuilder;
use serde::Serialize;
use serde_json::{Map, Value};
use sheetwise_domain::{AttributeSpec, ContextSource, SessionId, WebContext};
use std::fmt;

/// Per-attribute outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionStatus {
    /// Value extracted
    Ok,
    /// The model reported the value as absent
    NotFound,
    /// The provider refused the call for rate limiting
    RateLimited,
    /// The completion could not be parsed as JSON
    InvalidJson,
    /// Valid JSON, but not an object with the expected key
    KeyMissing,
    /// Transport, timeout or other fault
    Exception,
}

impl ExtractionStatus {
    /// Every status, in severity order
    pub const ALL: [ExtractionStatus; 6] = [
        ExtractionStatus::Ok,
        ExtractionStatus::NotFound,
        ExtractionStatus::RateLimited,
        ExtractionStatus::InvalidJson,
        ExtractionStatus::KeyMissing,
        ExtractionStatus::Exception,
    ];

    /// Upper-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Ok => "OK",
            ExtractionStatus::NotFound => "NOT_FOUND",
            ExtractionStatus::RateLimited => "RATE_LIMITED",
            ExtractionStatus::InvalidJson => "INVALID_JSON",
            ExtractionStatus::KeyMissing => "KEY_MISSING",
            ExtractionStatus::Exception => "EXCEPTION",
        }
    }

    /// Badge colour for this status
    pub fn indicator(&self) -> Indicator {
        match self {
            ExtractionStatus::Ok => Indicator::Green,
            ExtractionStatus::NotFound => Indicator::Yellow,
            ExtractionStatus::RateLimited => Indicator::Grey,
            ExtractionStatus::InvalidJson
            | ExtractionStatus::KeyMissing
            | ExtractionStatus::Exception => Indicator::Red,
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation colour derived from a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    /// Positive
    Green,
    /// Cautionary
    Yellow,
    /// Neutral, retry later
    Grey,
    /// Negative
    Red,
}

impl Indicator {
    /// Lower-case colour name
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Green => "green",
            Indicator::Yellow => "yellow",
            Indicator::Grey => "grey",
            Indicator::Red => "red",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to compose one attribute's prompt
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Attribute to extract
    pub attribute: AttributeSpec,

    /// Formatted chunks or web text; may be empty
    pub context: String,

    /// Which framing to use
    pub source: ContextSource,

    /// Part number supplied by the user
    pub part_number: Option<String>,
}

impl ExtractionRequest {
    /// Compose the prompt text
    pub fn prompt(&self) -> String {
        PromptBuilder::new(&self.attribute, &self.context, self.source)
            .with_part_number(self.part_number.as_deref())
            .build()
    }
}

/// Classified outcome for one attribute
///
/// Built once by the classifier; a re-run produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    /// Attribute name, which is also the expected JSON key
    pub attribute_key: String,

    /// Completion as returned by the provider, or the error payload
    pub raw_completion: Option<String>,

    /// Normalizer output
    pub raw_json_text: String,

    /// Parsed object, when the normalized text was a JSON object
    pub parsed: Option<Map<String, Value>>,

    /// Outcome
    pub status: ExtractionStatus,

    /// Value or message shown to the operator
    pub display_value: String,

    /// Human-readable account of how the status was reached
    pub diagnostic: String,

    /// Normalizer steps, absent when there was nothing to normalize
    pub trace: Option<NormalizeTrace>,

    /// Context the answer was grounded in
    pub source: ContextSource,
}

impl NormalizedResult {
    /// Badge colour
    pub fn indicator(&self) -> Indicator {
        self.status.indicator()
    }

    /// Payload for a results table or detail panel
    pub fn presentation(&self) -> PresentationRecord {
        PresentationRecord {
            name: self.attribute_key.clone(),
            display_value: self.display_value.clone(),
            status: self.status,
            indicator: self.indicator(),
            source: self.source.as_str().to_string(),
            raw_normalized_json: self.raw_json_text.clone(),
            raw_completion: self.raw_completion.clone(),
            diagnostic_detail: self.diagnostic.clone(),
        }
    }

    pub(crate) fn with_note(mut self, note: &str) -> Self {
        if self.diagnostic.is_empty() {
            self.diagnostic = note.to_string();
        } else {
            self.diagnostic = format!("{}; {}", self.diagnostic, note);
        }
        self
    }
}

/// Minimum payload a front end needs per attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationRecord {
    /// Attribute name
    pub name: String,
    /// Value or message
    pub display_value: String,
    /// Outcome
    pub status: ExtractionStatus,
    /// Badge colour
    pub indicator: Indicator,
    /// "document" or "web"
    pub source: String,
    /// Normalizer output
    pub raw_normalized_json: String,
    /// Completion as received
    pub raw_completion: Option<String>,
    /// How the status was reached
    pub diagnostic_detail: String,
}

/// Parameters for one batch run
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Part number to mention in prompts and retrieval queries
    pub part_number: Option<String>,

    /// Web text available as grounding or fallback
    pub web_context: Option<WebContext>,

    /// Restrict the batch to these attribute names
    pub attributes: Option<Vec<String>>,

    /// Session the results belong to
    pub session: Option<SessionId>,
}

impl BatchRequest {
    /// Empty request: every attribute, document grounding only
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the part number
    pub fn with_part_number(mut self, part_number: impl Into<String>) -> Self {
        self.part_number = Some(part_number.into());
        self
    }

    /// Provide web text; blank text is ignored
    pub fn with_web_context(mut self, web_context: WebContext) -> Self {
        self.web_context = (!web_context.is_empty()).then_some(web_context);
        self
    }

    /// Only extract these attributes
    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Tag results with a session
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }
}

/// Result counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// OK results
    pub ok: usize,
    /// NOT_FOUND results
    pub not_found: usize,
    /// RATE_LIMITED results
    pub rate_limited: usize,
    /// INVALID_JSON results
    pub invalid_json: usize,
    /// KEY_MISSING results
    pub key_missing: usize,
    /// EXCEPTION results
    pub exception: usize,
}

impl StatusCounts {
    /// Count one more result
    pub fn record(&mut self, status: ExtractionStatus) {
        let slot = match status {
            ExtractionStatus::Ok => &mut self.ok,
            ExtractionStatus::NotFound => &mut self.not_found,
            ExtractionStatus::RateLimited => &mut self.rate_limited,
            ExtractionStatus::InvalidJson => &mut self.invalid_json,
            ExtractionStatus::KeyMissing => &mut self.key_missing,
            ExtractionStatus::Exception => &mut self.exception,
        };
        *slot += 1;
    }

    /// Count for one status
    pub fn get(&self, status: ExtractionStatus) -> usize {
        match status {
            ExtractionStatus::Ok => self.ok,
            ExtractionStatus::NotFound => self.not_found,
            ExtractionStatus::RateLimited => self.rate_limited,
            ExtractionStatus::InvalidJson => self.invalid_json,
            ExtractionStatus::KeyMissing => self.key_missing,
            ExtractionStatus::Exception => self.exception,
        }
    }

    /// All results counted
    pub fn total(&self) -> usize {
        ExtractionStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// Metadata about a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchMetadata {
    /// Name of the LLM model used
    pub model_name: String,

    /// Unix timestamp (seconds) when the batch started
    pub started_at: u64,

    /// Wall time in milliseconds
    pub duration_ms: u64,

    /// Attributes selected for the batch
    pub attributes_requested: usize,

    /// Completion calls issued, fallbacks included
    pub llm_calls: usize,

    /// Results by status
    pub counts: StatusCounts,
}

/// Outcome of a batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Session the results belong to
    pub session: Option<SessionId>,

    /// One result per completed attribute, in display order
    pub results: Vec<NormalizedResult>,

    /// True when the batch stopped before every attribute ran
    pub cancelled: bool,

    /// Metadata about the run
    pub metadata: BatchMetadata,
}

impl BatchReport {
    /// Result for an attribute, if it completed
    pub fn get(&self, attribute: &str) -> Option<&NormalizedResult> {
        self.results.iter().find(|r| r.attribute_key == attribute)
    }

    /// Presentation payloads in display order
    pub fn presentation(&self) -> Vec<PresentationRecord> {
        self.results.iter().map(NormalizedResult::presentation).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_mapping() {
        assert_eq!(ExtractionStatus::Ok.indicator(), Indicator::Green);
        assert_eq!(ExtractionStatus::NotFound.indicator(), Indicator::Yellow);
        assert_eq!(ExtractionStatus::RateLimited.indicator(), Indicator::Grey);
        assert_eq!(ExtractionStatus::InvalidJson.indicator(), Indicator::Red);
        assert_eq!(ExtractionStatus::KeyMissing.indicator(), Indicator::Red);
        assert_eq!(ExtractionStatus::Exception.indicator(), Indicator::Red);
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&ExtractionStatus::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
        let json = serde_json::to_string(&Indicator::Grey).unwrap();
        assert_eq!(json, "\"grey\"");
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.record(ExtractionStatus::Ok);
        counts.record(ExtractionStatus::Ok);
        counts.record(ExtractionStatus::Exception);

        assert_eq!(counts.get(ExtractionStatus::Ok), 2);
        assert_eq!(counts.exception, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_blank_web_context_ignored() {
        let request = BatchRequest::new().with_web_context(WebContext::new("   ", "TraceParts"));
        assert!(request.web_context.is_none());
    }

    #[test]
    fn test_request_prompt_uses_part_number() {
        let request = ExtractionRequest {
            attribute: AttributeSpec::new("Gender", "rules"),
            context: "Gender: male".to_string(),
            source: ContextSource::Document,
            part_number: Some("PN-42".to_string()),
        };
        let prompt = request.prompt();
        assert!(prompt.contains("PN-42"));
        assert!(prompt.contains("Gender: male"));
    }
}
