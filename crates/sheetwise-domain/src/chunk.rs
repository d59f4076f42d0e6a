//! Grounding text records

/// A retrieved piece of document text with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Chunk body
    pub text: String,

    /// Source identifier, usually the PDF file name
    pub source: String,

    /// Zero-based page number, when known
    pub page: Option<u32>,

    /// Position of the chunk within its source document
    pub chunk_index: usize,

    /// Character offset of the chunk within its page, when known
    pub start_offset: Option<usize>,
}

impl ChunkRecord {
    /// Create a chunk without page or offset information
    pub fn new(text: impl Into<String>, source: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
            chunk_index,
            start_offset: None,
        }
    }

    /// Set the page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the character offset within the page
    pub fn with_start_offset(mut self, offset: usize) -> Self {
        self.start_offset = Some(offset);
        self
    }
}

/// Cleaned key/value text obtained from a supplier website
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebContext {
    /// One `key: value` fact per line
    pub text: String,

    /// Where the text came from (site or catalog name)
    pub source_name: String,
}

impl WebContext {
    /// Create a web context
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
        }
    }

    /// True when there is no usable text
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
