//! Bounded-parallel document ingestion
//!
//! Each document is parsed and split on a blocking thread; a semaphore caps
//! how many run at once. A document that fails is recorded in the report and
//! the rest carry on.

use crate::config::IngestConfig;
use crate::pages::{clean_text, extract_pages, DocumentFormat};
use crate::splitter::RecursiveSplitter;
use crate::IngestError;
use serde::Serialize;
use sheetwise_domain::ChunkRecord;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A document waiting to be ingested
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Display name, used as the chunk source
    pub name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Create from in-memory bytes; the name is reduced to its file name
    pub fn new(name: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        let name = name.as_ref();
        let base = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        Self {
            name: base.to_string(),
            bytes,
        }
    }

    /// Read a document from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }
}

/// What happened to one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    /// Source name
    pub source: String,
    /// Pages found in the document
    pub pages: usize,
    /// Pages left with text after cleaning
    pub pages_with_text: usize,
    /// Chunks produced
    pub chunks: usize,
    /// Failure reason, if the document was skipped
    pub error: Option<String>,
}

impl DocumentOutcome {
    fn failed(source: impl Into<String>, error: &IngestError) -> Self {
        Self {
            source: source.into(),
            pages: 0,
            pages_with_text: 0,
            chunks: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Result of an ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Chunks from every successful document, in input order
    pub chunks: Vec<ChunkRecord>,
    /// One outcome per input document
    pub documents: Vec<DocumentOutcome>,
}

impl IngestReport {
    /// Documents that could not be processed
    pub fn failures(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.documents.iter().filter(|d| d.error.is_some())
    }

    /// True when no document produced any chunk
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

struct ParsedDocument {
    chunks: Vec<ChunkRecord>,
    pages: usize,
    pages_with_text: usize,
}

/// Turns documents into retrievable chunks
pub struct Ingestor {
    config: IngestConfig,
    splitter: RecursiveSplitter,
}

impl Ingestor {
    /// Create an ingestor after validating its configuration
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap);
        Ok(Self { config, splitter })
    }

    /// Ingestion settings
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Read and ingest files from disk
    ///
    /// Unreadable files are reported alongside parse failures.
    pub async fn ingest_paths<P: AsRef<Path>>(&self, paths: &[P]) -> IngestReport {
        let mut documents = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match SourceDocument::from_path(path).await {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    unreadable.push(DocumentOutcome::failed(path.to_string_lossy(), &e));
                }
            }
        }

        let mut report = self.ingest(documents).await;
        report.documents.extend(unreadable);
        report
    }

    /// Parse and split documents with bounded parallelism
    pub async fn ingest(&self, documents: Vec<SourceDocument>) -> IngestReport {
        let names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_documents));
        let mut workers = JoinSet::new();

        info!(
            "Ingesting {} documents with up to {} workers",
            documents.len(),
            self.config.max_concurrent_documents
        );

        for (position, document) in documents.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let splitter = self.splitter.clone();
            workers.spawn(async move {
                (position, parse_with_permit(semaphore, splitter, document).await)
            });
        }

        let mut slots: Vec<Option<Result<ParsedDocument, IngestError>>> =
            names.iter().map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((position, parsed)) => slots[position] = Some(parsed),
                Err(e) => warn!("Ingestion worker failed: {}", e),
            }
        }

        let mut report = IngestReport::default();
        for (name, slot) in names.into_iter().zip(slots) {
            let parsed = slot
                .unwrap_or_else(|| Err(IngestError::Worker("worker did not finish".to_string())));
            match parsed {
                Ok(parsed) => {
                    report.documents.push(DocumentOutcome {
                        source: name,
                        pages: parsed.pages,
                        pages_with_text: parsed.pages_with_text,
                        chunks: parsed.chunks.len(),
                        error: None,
                    });
                    report.chunks.extend(parsed.chunks);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                    report.documents.push(DocumentOutcome::failed(name, &e));
                }
            }
        }

        info!(
            "Ingestion produced {} chunks from {} documents ({} failed)",
            report.chunks.len(),
            report.documents.len(),
            report.failures().count()
        );
        report
    }
}

async fn parse_with_permit(
    semaphore: Arc<Semaphore>,
    splitter: RecursiveSplitter,
    document: SourceDocument,
) -> Result<ParsedDocument, IngestError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| IngestError::Worker(e.to_string()))?;

    tokio::task::spawn_blocking(move || parse_document(&splitter, &document))
        .await
        .map_err(|e| IngestError::Worker(e.to_string()))?
}

fn parse_document(
    splitter: &RecursiveSplitter,
    document: &SourceDocument,
) -> Result<ParsedDocument, IngestError> {
    let format = DocumentFormat::from_name(&document.name);
    let pages = extract_pages(format, &document.bytes)?;

    let mut chunks = Vec::new();
    let mut pages_with_text = 0;

    for (page_number, raw) in pages.iter().enumerate() {
        let cleaned = clean_text(raw);
        if cleaned.is_empty() {
            debug!("Page {} of {} has no content after cleaning", page_number, document.name);
            continue;
        }
        pages_with_text += 1;

        for span in splitter.split_with_offsets(&cleaned) {
            let chunk_index = chunks.len();
            chunks.push(
                ChunkRecord::new(span.text, document.name.clone(), chunk_index)
                    .with_page(page_number as u32)
                    .with_start_offset(span.start),
            );
        }
    }

    if chunks.is_empty() {
        warn!("No processable content found in {}", document.name);
    } else {
        debug!("Generated {} chunks from {}", chunks.len(), document.name);
    }

    Ok(ParsedDocument {
        chunks,
        pages: pages.len(),
        pages_with_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingestor(chunk_size: usize, overlap: usize) -> Ingestor {
        Ingestor::new(IngestConfig::new(chunk_size, overlap).with_max_concurrent_documents(2)).unwrap()
    }

    #[test]
    fn test_source_name_is_basename() {
        let doc = SourceDocument::new("/tmp/uploads/housing.pdf", Vec::new());
        assert_eq!(doc.name, "housing.pdf");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Ingestor::new(IngestConfig::new(0, 0)).is_err());
    }

    #[tokio::test]
    async fn test_pages_become_chunks_with_provenance() {
        let text = "Material: PA66-GF30\x0c  \n \x0cColour:\n black";
        let report = ingestor(500, 75)
            .ingest(vec![SourceDocument::new("housing.txt", text.as_bytes().to_vec())])
            .await;

        assert_eq!(report.chunks.len(), 2);
        assert_eq!(report.chunks[0].text, "Material: PA66-GF30");
        assert_eq!(report.chunks[0].page, Some(0));
        assert_eq!(report.chunks[1].text, "Colour: black");
        assert_eq!(report.chunks[1].page, Some(2));
        assert_eq!(report.chunks[1].chunk_index, 1);
        assert_eq!(report.chunks[1].start_offset, Some(0));

        let outcome = &report.documents[0];
        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.pages_with_text, 2);
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn test_failing_document_does_not_stop_others() {
        let report = ingestor(500, 75)
            .ingest(vec![
                SourceDocument::new("broken.pdf", b"not a pdf".to_vec()),
                SourceDocument::new("good.txt", b"Gender: female".to_vec()),
            ])
            .await;

        assert_eq!(report.documents.len(), 2);
        assert!(report.documents[0].error.is_some());
        assert_eq!(report.documents[1].chunks, 1);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_output_order_follows_input_order() {
        let documents: Vec<_> = (0..8)
            .map(|i| SourceDocument::new(format!("doc{}.txt", i), format!("content {}", i).into_bytes()))
            .collect();

        let report = ingestor(500, 75).ingest(documents).await;

        let sources: Vec<_> = report.chunks.iter().map(|c| c.source.as_str()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("doc{}.txt", i)).collect();
        assert_eq!(sources, expected);
    }

    #[tokio::test]
    async fn test_ingest_paths_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.txt");
        std::fs::write(&present, "Pull-To-Seat: yes").unwrap();
        let missing = dir.path().join("missing.txt");

        let report = ingestor(500, 75).ingest_paths(&[present, missing]).await;

        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_long_page_split_with_offsets() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let report = ingestor(20, 5)
            .ingest(vec![SourceDocument::new("greek.txt", text.as_bytes().to_vec())])
            .await;

        assert!(report.chunks.len() > 1);
        for chunk in &report.chunks {
            let start = chunk.start_offset.unwrap();
            assert_eq!(&text[start..start + chunk.text.len()], chunk.text);
        }
    }
}
