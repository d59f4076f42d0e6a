//! Rendering retrieved chunks into a prompt context block

use sheetwise_domain::ChunkRecord;
use std::fmt::Write;

/// Divider placed between chunk segments
pub const CHUNK_DIVIDER: &str = "\n\n---\n\n";

/// Placeholder for a chunk without page metadata
pub const MISSING_PAGE: &str = "N/A";

/// Render chunks as labelled segments in the order given
///
/// An empty slice renders as the empty string; the composer treats that as
/// "no grounding" rather than an error. No length capping is applied.
///
/// # Examples
///
/// ```
/// use sheetwise_domain::ChunkRecord;
/// use sheetwise_extractor::format_context;
///
/// let chunks = vec![ChunkRecord::new("Colour: black", "housing.pdf", 0).with_page(2)];
/// assert_eq!(
///     format_context(&chunks),
///     "Chunk 1 from 'housing.pdf' (Page 2):\nColour: black"
/// );
/// ```
pub fn format_context(chunks: &[ChunkRecord]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format_segment(i + 1, chunk))
        .collect::<Vec<_>>()
        .join(CHUNK_DIVIDER)
}

fn format_segment(position: usize, chunk: &ChunkRecord) -> String {
    let mut header = format!("Chunk {}", position);
    if let Some(offset) = chunk.start_offset {
        let _ = write!(header, " (starts at char {})", offset);
    }
    let page = chunk
        .page
        .map(|p| p.to_string())
        .unwrap_or_else(|| MISSING_PAGE.to_string());
    let _ = write!(header, " from '{}' (Page {}):", chunk.source, page);

    format!("{}\n{}", header, chunk.text)
}
