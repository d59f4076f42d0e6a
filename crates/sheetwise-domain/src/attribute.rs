//! Attribute definitions - the unit of extraction

use std::fmt;

/// Where the grounding text for a prompt comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSource {
    /// Chunks retrieved from ingested PDF datasheets
    Document,
    /// Cleaned key/value text scraped from a supplier website
    Web,
}

impl ContextSource {
    /// Stable lowercase label used in logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSource::Document => "document",
            ContextSource::Web => "web",
        }
    }
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named connector attribute and the rules for extracting it
///
/// `name` doubles as the display label and the single JSON key the model
/// must answer with. Attribute specs are immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Display key and required JSON output key (e.g. "Material Filling")
    pub name: String,

    /// Extraction rules used when grounding comes from documents
    pub instructions: String,

    /// Shorter rule set used with web key/value text, if different
    pub web_instructions: Option<String>,
}

impl AttributeSpec {
    /// Create an attribute with document instructions only
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetwise_domain::{AttributeSpec, ContextSource};
    ///
    /// let spec = AttributeSpec::new("Gender", "Male or Female.");
    /// assert_eq!(spec.instructions_for(ContextSource::Web), "Male or Female.");
    /// ```
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            web_instructions: None,
        }
    }

    /// Attach a web-mode rule set
    pub fn with_web_instructions(mut self, web_instructions: impl Into<String>) -> Self {
        self.web_instructions = Some(web_instructions.into());
        self
    }

    /// Instructions to embed for the given context source
    ///
    /// Web mode falls back to the document instructions when no dedicated
    /// web rule set exists.
    pub fn instructions_for(&self, source: ContextSource) -> &str {
        match (source, &self.web_instructions) {
            (ContextSource::Web, Some(web)) => web,
            _ => &self.instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_for_document_mode() {
        let spec = AttributeSpec::new("Colour", "Long rules").with_web_instructions("Short rules");
        assert_eq!(spec.instructions_for(ContextSource::Document), "Long rules");
    }

    #[test]
    fn test_instructions_for_web_mode() {
        let spec = AttributeSpec::new("Colour", "Long rules").with_web_instructions("Short rules");
        assert_eq!(spec.instructions_for(ContextSource::Web), "Short rules");
    }

    #[test]
    fn test_web_mode_falls_back_to_document_rules() {
        let spec = AttributeSpec::new("Colour", "Long rules");
        assert_eq!(spec.instructions_for(ContextSource::Web), "Long rules");
    }

    #[test]
    fn test_context_source_display() {
        assert_eq!(ContextSource::Document.to_string(), "document");
        assert_eq!(ContextSource::Web.to_string(), "web");
    }
}
