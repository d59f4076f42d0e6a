//! Prompt composition for single-attribute extraction
//!
//! Document and web prompts share one builder and one output contract; only
//! the framing text differs, and that lives in [`Framing`] values.

use serde_json::Value;
use sheetwise_domain::{AttributeSpec, ContextSource};

/// Placeholder when no part number was supplied
pub const PART_NUMBER_PLACEHOLDER: &str = "Not Provided";

/// Mode-specific wording around the shared output contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    /// Opening paragraph describing the task and the grounding rule
    pub preamble: &'static str,
    /// Name of the context block, used in its delimiters
    pub context_label: &'static str,
    /// How the rules refer back to the context block
    pub context_reference: &'static str,
    /// Whether the part-number section is shown when none was given
    pub always_show_part_number: bool,
    /// Placeholder value in the example output line
    pub example_value: &'static str,
}

/// Framing for chunks retrieved from PDF datasheets
pub const DOCUMENT_FRAMING: Framing = Framing {
    preamble: "You are an expert data extractor. Your goal is to extract a specific piece of information based on the Extraction Instructions provided below, using ONLY the Document Context from PDFs.",
    context_label: "Document Context (from PDFs)",
    context_reference: "Document Context",
    always_show_part_number: true,
    example_value: "extracted_value_from_pdf",
};

/// Framing for cleaned key/value text from a supplier website
pub const WEB_FRAMING: Framing = Framing {
    preamble: "You are an expert data extractor. Your goal is to answer a specific piece of information by applying the logic described in the 'Extraction Instructions' to the 'Cleaned Scraped Website Data' provided below. Use ONLY the provided website data as your context.",
    context_label: "Cleaned Scraped Website Data",
    context_reference: "Cleaned Scraped Website Data",
    always_show_part_number: false,
    example_value: "extracted_value_based_on_instructions",
};

impl Framing {
    /// Framing for a context source
    pub fn for_source(source: ContextSource) -> &'static Framing {
        match source {
            ContextSource::Document => &DOCUMENT_FRAMING,
            ContextSource::Web => &WEB_FRAMING,
        }
    }
}

/// Builds the instruction text for one attribute
pub struct PromptBuilder<'a> {
    attribute: &'a AttributeSpec,
    context: &'a str,
    source: ContextSource,
    part_number: Option<&'a str>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for an attribute, its context and the context source
    pub fn new(attribute: &'a AttributeSpec, context: &'a str, source: ContextSource) -> Self {
        Self {
            attribute,
            context,
            source,
            part_number: None,
        }
    }

    /// Add the user-supplied part number
    pub fn with_part_number(mut self, part_number: Option<&'a str>) -> Self {
        self.part_number = part_number.map(str::trim).filter(|p| !p.is_empty());
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let framing = Framing::for_source(self.source);
        let key = quote(&self.attribute.name);
        let mut prompt = String::new();

        prompt.push_str(framing.preamble);
        prompt.push_str("\n\n");

        if framing.always_show_part_number || self.part_number.is_some() {
            prompt.push_str("Part Number Information (if provided by user):\n");
            prompt.push_str(self.part_number.unwrap_or(PART_NUMBER_PLACEHOLDER));
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("--- {} ---\n", framing.context_label));
        prompt.push_str(self.context);
        prompt.push_str(&format!("\n--- End {} ---\n\n", framing.context_label));

        prompt.push_str("Extraction Instructions:\n");
        prompt.push_str(self.attribute.instructions_for(self.source));
        prompt.push_str("\n\n---\n");

        prompt.push_str(
            "IMPORTANT: Respond with ONLY a single, valid JSON object containing exactly one key-value pair.\n",
        );
        prompt.push_str(&format!(
            "- The key for the JSON object MUST be the string: {}\n",
            key
        ));
        prompt.push_str(&format!(
            "- The value MUST be the extracted result determined by following the Extraction Instructions using ONLY the {} provided above. Do not use outside knowledge.\n",
            framing.context_reference
        ));
        prompt.push_str(
            "- Provide the value as a JSON string. Examples: \"GF, T\", \"none\", \"NOT FOUND\", \"Female\", \"7.2\", \"999\".\n",
        );
        prompt.push_str(&format!(
            "- If the information cannot be determined with certainty from the {} based on the instructions, the value MUST be \"NOT FOUND\". Where the instructions define another sentinel such as \"none\", use it as they describe.\n",
            framing.context_reference
        ));
        prompt.push_str(
            "- Do NOT include any explanations, reasoning, or any text outside of the single JSON object in your response.\n\n",
        );

        prompt.push_str("Example Output Format:\n");
        prompt.push_str(&format!("{{{}: {}}}\n\n", key, quote(framing.example_value)));
        prompt.push_str("Output:\n");

        prompt
    }
}

/// Similarity-search query for an attribute
///
/// # Examples
///
/// ```
/// use sheetwise_extractor::retrieval_query;
///
/// assert_eq!(
///     retrieval_query("Colour", None),
///     "Extract information about Colour for part number N/A"
/// );
/// ```
pub fn retrieval_query(attribute_name: &str, part_number: Option<&str>) -> String {
    let part = part_number
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("N/A");
    format!(
        "Extract information about {} for part number {}",
        attribute_name, part
    )
}

fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
