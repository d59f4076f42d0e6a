//! Recursive character text splitting
//!
//! Splits on the coarsest separator present in the text (paragraph, line,
//! word, character), recursing into pieces that are still too long, then
//! greedily merges pieces back into chunks of at most `chunk_size`
//! characters with `chunk_overlap` characters carried between neighbours.

/// Separators tried in order, coarsest first; "" splits into characters
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A chunk of text and where it starts in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    /// Chunk text, trimmed
    pub text: String,
    /// Character offset of the chunk in the input
    pub start: usize,
}

/// Splits text into overlapping, size-bounded chunks
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl RecursiveSplitter {
    /// Create a splitter; overlap is clamped below the chunk size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split into chunk texts
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    /// Split into chunks annotated with their start offsets
    pub fn split_with_offsets(&self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut previous: Option<(usize, usize)> = None;

        for chunk in self.split(text) {
            // Search from just before where the overlap region should begin
            let search_from_chars = previous
                .map(|(start, len)| (start + len).saturating_sub(self.chunk_overlap))
                .unwrap_or(0);
            let search_from = byte_offset(text, search_from_chars);

            let start = text[search_from..]
                .find(&chunk)
                .map(|pos| char_len(&text[..search_from + pos]))
                .unwrap_or(search_from_chars);

            previous = Some((start, char_len(&chunk)));
            spans.push(TextSpan { text: chunk, start });
        }

        spans
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .map(|i| (separators[i], &separators[i + 1..]))
            .unwrap_or(("", &[][..]));

        let pieces = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Greedily join pieces into chunks, keeping a tail for overlap
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window.concat());

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some(first) = window.first() else { break };
                    total -= char_len(first);
                    window.remove(0);
                }
            }

            window.push(piece);
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &window.concat());
        }

        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split so that each separator stays attached to the piece after it
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
