//! Core batch extraction loop

use crate::catalog::AttributeCatalog;
use crate::classifier::{classify, error_payload};
use crate::config::PipelineConfig;
use crate::context::format_context;
use crate::error::ExtractorError;
use crate::prompt::retrieval_query;
use crate::types::{
    BatchMetadata, BatchReport, BatchRequest, ExtractionRequest, ExtractionStatus,
    NormalizedResult, StatusCounts,
};
use sheetwise_domain::{AttributeSpec, ContextSource, LlmProvider, Retriever, WebContext};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Enforces the minimum gap between consecutive completion calls
struct Pacer {
    interval: Duration,
    last_call: Option<Instant>,
    calls: usize,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
            calls: 0,
        }
    }

    /// Wait out the interval; false if cancelled while waiting
    async fn wait(&self, cancel: &CancellationToken) -> bool {
        let Some(last) = self.last_call else {
            return true;
        };
        if self.interval.is_zero() {
            return true;
        }
        let Some(deadline) = last.checked_add(self.interval) else {
            cancel.cancelled().await;
            return false;
        };
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = sleep_until(deadline) => true,
        }
    }

    fn mark(&mut self) {
        self.last_call = Some(Instant::now());
        self.calls += 1;
    }
}

/// Where one attribute's context comes from
enum Grounding {
    Context(ContextSource, String, Option<String>),
    Failed(String),
    Cancelled,
}

/// Runs the attribute battery against an LLM
///
/// The LLM and retriever are long-lived services owned by the host; they
/// are shared in, never created here. Either may be left out at
/// construction, in which case `run_batch` reports the missing piece before
/// issuing any request.
pub struct Extractor<L, R> {
    llm: Option<Arc<L>>,
    retriever: Option<Arc<R>>,
    catalog: AttributeCatalog,
    config: PipelineConfig,
}

impl<L, R> Extractor<L, R>
where
    L: LlmProvider,
    R: Retriever,
{
    /// Create an extractor with the default catalog and no services
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            llm: None,
            retriever: None,
            catalog: AttributeCatalog::default(),
            config,
        }
    }

    /// Use this completion provider
    pub fn with_llm(self, llm: L) -> Self {
        self.with_shared_llm(Arc::new(llm))
    }

    /// Use a completion provider shared with other owners
    pub fn with_shared_llm(mut self, llm: Arc<L>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Use this retriever for document grounding
    pub fn with_retriever(self, retriever: R) -> Self {
        self.with_shared_retriever(Arc::new(retriever))
    }

    /// Use a retriever shared with other owners
    pub fn with_shared_retriever(mut self, retriever: Arc<R>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Replace the attribute catalog
    pub fn with_catalog(mut self, catalog: AttributeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Pipeline settings
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Attribute catalog
    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    /// Run every selected attribute in display order
    pub async fn run_batch(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, ExtractorError> {
        self.run_batch_with(request, cancel, |_| {}).await
    }

    /// Run the batch, handing each result to `on_result` as soon as it exists
    ///
    /// Per-attribute faults never end the batch. Cancellation stops it
    /// before the next request; results already produced are kept and the
    /// report is flagged as cancelled.
    pub async fn run_batch_with<F>(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
        mut on_result: F,
    ) -> Result<BatchReport, ExtractorError>
    where
        F: FnMut(&NormalizedResult),
    {
        self.config.validate().map_err(ExtractorError::Config)?;
        let llm = self.llm.as_deref().ok_or(ExtractorError::MissingLlm)?;
        let web = request.web_context.as_ref().filter(|w| !w.is_empty());
        if self.retriever.is_none() && web.is_none() {
            return Err(ExtractorError::MissingContext);
        }
        let selected = self.catalog.select(request.attributes.as_deref())?;
        if selected.is_empty() {
            return Err(ExtractorError::EmptyBatch);
        }

        info!(
            "Starting extraction of {} attributes (part number: {}, web text: {})",
            selected.len(),
            request.part_number.as_deref().unwrap_or("none"),
            web.map(|w| w.source_name.as_str()).unwrap_or("none")
        );

        let started = Instant::now();
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut pacer = Pacer::new(self.config.pacing_interval());
        let mut results = Vec::with_capacity(selected.len());
        let mut counts = StatusCounts::default();
        let mut cancelled = false;

        for (position, attribute) in selected.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let Some(result) = self
                .extract_attribute(llm, attribute, request, web, &mut pacer, cancel)
                .await
            else {
                cancelled = true;
                break;
            };

            info!(
                "[{}/{}] {}: {} ({})",
                position + 1,
                selected.len(),
                result.attribute_key,
                result.status,
                result.display_value
            );
            counts.record(result.status);
            on_result(&result);
            results.push(result);
        }

        if cancelled {
            warn!(
                "Extraction cancelled after {} of {} attributes",
                results.len(),
                selected.len()
            );
        } else {
            info!(
                "Extraction complete: {} ok, {} not found, {} failed",
                counts.ok,
                counts.not_found,
                counts.total() - counts.ok - counts.not_found
            );
        }

        Ok(BatchReport {
            session: request.session,
            results,
            cancelled,
            metadata: BatchMetadata {
                model_name: llm.model_name().to_string(),
                started_at,
                duration_ms: started.elapsed().as_millis() as u64,
                attributes_requested: selected.len(),
                llm_calls: pacer.calls,
                counts,
            },
        })
    }

    /// One attribute, fallback included; `None` when cancelled
    async fn extract_attribute(
        &self,
        llm: &L,
        attribute: &AttributeSpec,
        request: &BatchRequest,
        web: Option<&WebContext>,
        pacer: &mut Pacer,
        cancel: &CancellationToken,
    ) -> Option<NormalizedResult> {
        let part_number = request.part_number.clone();

        let (source, context, note) = match self.ground(attribute, request, web, cancel).await {
            Grounding::Context(source, context, note) => (source, context, note),
            Grounding::Failed(message) => {
                let payload = error_payload(&message);
                return Some(classify(&attribute.name, Some(&payload), ContextSource::Document));
            }
            Grounding::Cancelled => return None,
        };

        let extraction = ExtractionRequest {
            attribute: attribute.clone(),
            context,
            source,
            part_number: part_number.clone(),
        };
        let mut result = self.run_request(llm, &extraction, pacer, cancel).await?;
        if let Some(note) = note {
            result = result.with_note(&note);
        }

        let retry_on_web = self.config.web_fallback_on_not_found
            && result.status == ExtractionStatus::NotFound
            && source == ContextSource::Document;

        match web {
            Some(web) if retry_on_web => {
                info!(
                    "'{}' not found in documents, retrying with web text from {}",
                    attribute.name, web.source_name
                );
                let fallback = ExtractionRequest {
                    attribute: attribute.clone(),
                    context: web.text.clone(),
                    source: ContextSource::Web,
                    part_number,
                };
                let result = self.run_request(llm, &fallback, pacer, cancel).await?;
                Some(result.with_note(&format!(
                    "web fallback from {} after NOT FOUND in documents",
                    web.source_name
                )))
            }
            _ => Some(result),
        }
    }

    /// Pick the context for an attribute
    async fn ground(
        &self,
        attribute: &AttributeSpec,
        request: &BatchRequest,
        web: Option<&WebContext>,
        cancel: &CancellationToken,
    ) -> Grounding {
        let Some(retriever) = self.retriever.as_deref() else {
            return match web {
                Some(web) => Grounding::Context(ContextSource::Web, web.text.clone(), None),
                None => Grounding::Failed("No context available".to_string()),
            };
        };

        let query = retrieval_query(&attribute.name, request.part_number.as_deref());
        let search = tokio::select! {
            _ = cancel.cancelled() => return Grounding::Cancelled,
            search = retriever.search(&query, self.config.retrieval_k) => search,
        };

        match search {
            Ok(chunks) if chunks.is_empty() => match web {
                Some(web) => {
                    debug!("No chunks for '{}', using web text", attribute.name);
                    Grounding::Context(
                        ContextSource::Web,
                        web.text.clone(),
                        Some(format!(
                            "no document chunks retrieved, grounded in web text from {}",
                            web.source_name
                        )),
                    )
                }
                None => {
                    debug!("No chunks for '{}', prompting with empty context", attribute.name);
                    Grounding::Context(ContextSource::Document, String::new(), None)
                }
            },
            Ok(chunks) => {
                debug!("Retrieved {} chunks for '{}'", chunks.len(), attribute.name);
                Grounding::Context(ContextSource::Document, format_context(&chunks), None)
            }
            Err(e) => {
                warn!("Retrieval failed for '{}': {}", attribute.name, e);
                Grounding::Failed(format!("Retrieval failed: {}", e))
            }
        }
    }

    async fn run_request(
        &self,
        llm: &L,
        request: &ExtractionRequest,
        pacer: &mut Pacer,
        cancel: &CancellationToken,
    ) -> Option<NormalizedResult> {
        let prompt = request.prompt();
        debug!(
            "Prompt for '{}' ({} mode): {} chars",
            request.attribute.name,
            request.source,
            prompt.len()
        );

        let raw = self.invoke(llm, &prompt, pacer, cancel).await?;
        let result = classify(&request.attribute.name, Some(&raw), request.source);
        debug!(
            "'{}' classified as {} ({})",
            result.attribute_key, result.status, result.diagnostic
        );
        Some(result)
    }

    /// Paced, time-limited completion; provider faults become error payloads
    async fn invoke(
        &self,
        llm: &L,
        prompt: &str,
        pacer: &mut Pacer,
        cancel: &CancellationToken,
    ) -> Option<String> {
        if !pacer.wait(cancel).await {
            return None;
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return None,
            outcome = timeout(self.config.extraction_timeout(), llm.complete(prompt)) => outcome,
        };
        pacer.mark();

        Some(match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Completion failed: {}", e);
                error_payload(&e.to_string())
            }
            Err(_) => {
                warn!(
                    "Completion timed out after {}s",
                    self.config.extraction_timeout_secs
                );
                error_payload(&format!(
                    "Extraction timed out after {}s",
                    self.config.extraction_timeout_secs
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetwise_llm::MockProvider;
    use sheetwise_store::StaticRetriever;

    fn config() -> PipelineConfig {
        PipelineConfig {
            pacing_interval_seconds: 0.0,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_llm_is_batch_error() {
        let extractor: Extractor<MockProvider, StaticRetriever> =
            Extractor::new(config()).with_retriever(StaticRetriever::empty());
        let result = extractor
            .run_batch(&BatchRequest::new(), &CancellationToken::new())
            .await;
        assert_eq!(result.unwrap_err(), ExtractorError::MissingLlm);
    }

    #[tokio::test]
    async fn test_missing_context_is_batch_error() {
        let llm = MockProvider::new("{}");
        let extractor: Extractor<MockProvider, StaticRetriever> =
            Extractor::new(config()).with_llm(llm.clone());
        let result = extractor
            .run_batch(&BatchRequest::new(), &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err(), ExtractorError::MissingContext);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_batch_error() {
        let bad = PipelineConfig {
            retrieval_k: 0,
            ..config()
        };
        let extractor = Extractor::new(bad)
            .with_llm(MockProvider::new("{}"))
            .with_retriever(StaticRetriever::empty());
        let result = extractor
            .run_batch(&BatchRequest::new(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[tokio::test]
    async fn test_oversized_pacing_is_config_error() {
        let llm = MockProvider::new("{}");
        let bad = PipelineConfig {
            pacing_interval_seconds: 1e30,
            ..config()
        };
        let extractor = Extractor::new(bad)
            .with_llm(llm.clone())
            .with_retriever(StaticRetriever::empty());
        let result = extractor
            .run_batch(&BatchRequest::new(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ExtractorError::Config(_))));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_filter_is_batch_error() {
        let extractor = Extractor::new(config())
            .with_llm(MockProvider::new("{}"))
            .with_retriever(StaticRetriever::empty());
        let request = BatchRequest::new().with_attributes(["Voltage"]);
        let result = extractor.run_batch(&request, &CancellationToken::new()).await;
        assert_eq!(
            result.unwrap_err(),
            ExtractorError::UnknownAttribute("Voltage".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_is_batch_error() {
        let extractor = Extractor::new(config())
            .with_llm(MockProvider::new("{}"))
            .with_retriever(StaticRetriever::empty())
            .with_catalog(AttributeCatalog::new(Vec::new()).unwrap());
        let result = extractor
            .run_batch(&BatchRequest::new(), &CancellationToken::new())
            .await;
        assert_eq!(result.unwrap_err(), ExtractorError::EmptyBatch);
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_per_attribute() {
        let llm = MockProvider::new("{}");
        let extractor = Extractor::new(config())
            .with_llm(llm.clone())
            .with_retriever(StaticRetriever::failing("index offline"));
        let request = BatchRequest::new().with_attributes(["Gender", "Colour"]);
        let report = extractor.run_batch(&request, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.results.len(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.status == ExtractionStatus::Exception));
        assert!(report.results[0].display_value.contains("index offline"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_metadata_counts() {
        let llm = MockProvider::new(r#"{"x": "y"}"#).with_model_name("test-model");
        llm.add_response("MUST be the string: \"Gender\"", r#"{"Gender": "Male"}"#);
        let extractor = Extractor::new(config())
            .with_llm(llm)
            .with_retriever(StaticRetriever::empty());
        let request = BatchRequest::new().with_attributes(["Gender", "Colour"]);
        let report = extractor.run_batch(&request, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.metadata.model_name, "test-model");
        assert_eq!(report.metadata.attributes_requested, 2);
        assert_eq!(report.metadata.llm_calls, 2);
        assert_eq!(report.metadata.counts.ok, 1);
        assert_eq!(report.metadata.counts.key_missing, 1);
        assert!(!report.cancelled);
    }
}
