//! Extract command implementation.

use super::load_catalog;
use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use sheetwise_domain::{LlmProvider, WebContext};
use sheetwise_extractor::{
    resolve_web_context, BatchReport, BatchRequest, Extractor, ExtractorError, StaticWebSource,
};
use sheetwise_llm::ChatCompletionProvider;
use sheetwise_store::DocumentIndex;
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    formatter: &Formatter,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut pipeline = config.pipeline.clone();
    if let Some(pacing) = args.pacing {
        pipeline.pacing_interval_seconds = pacing;
    }
    if args.web_fallback {
        pipeline.web_fallback_on_not_found = true;
    }

    let model = args.model.as_deref().unwrap_or(&config.llm.model);
    let llm = ChatCompletionProvider::new(&config.llm.endpoint, model, args.api_key.as_str())?
        .with_temperature(pipeline.llm_temperature)
        .with_max_tokens(pipeline.llm_max_tokens)
        .with_max_retries(config.llm.max_retries)
        .with_total_timeout(pipeline.extraction_timeout_secs)?;

    let catalog = load_catalog(args.catalog.as_deref())?;
    let mut extractor: Extractor<ChatCompletionProvider, DocumentIndex> =
        Extractor::new(pipeline).with_llm(llm).with_catalog(catalog);

    let mut request = BatchRequest::new();
    if !args.attributes.is_empty() {
        request = request.with_attributes(args.attributes.clone());
    }
    if let Some(part_number) = &args.part_number {
        request = request.with_part_number(part_number.clone());
    }

    let mut pinned_index = None;
    if !args.web_only {
        let db_path = config.database_path(args.db.as_deref())?;
        if db_path.exists() {
            let index = Arc::new(DocumentIndex::open(&db_path)?);
            if index.is_empty() {
                warn!("Index at {} is empty", db_path.display());
            } else {
                if let Some(session) = index.session()? {
                    request = request.with_session(session);
                }
                extractor = extractor.with_shared_retriever(Arc::clone(&index));
                pinned_index = Some(index);
            }
        } else {
            info!("No index at {}, running without documents", db_path.display());
        }
    }

    if let Some(context) = load_web_context(&args).await? {
        request = request.with_web_context(context);
    }

    let report = match &pinned_index {
        Some(index) => run_pinned_to_session(&extractor, index, &request, cancel).await?,
        None => extractor.run_batch(&request, cancel).await?,
    };
    if report.cancelled {
        eprintln!("{}", formatter.warning("Extraction cancelled, showing completed attributes"));
    }
    println!("{}", formatter.format_report(&report, args.details)?);
    Ok(())
}

/// Run a batch that fails if the index is rebuilt while it runs
///
/// Another process re-ingesting replaces every chunk row, leaving this
/// handle's vector index pointing at rows that no longer exist. The batch is
/// stopped after the first result that lands once the stored session moved.
pub(crate) async fn run_pinned_to_session<L: LlmProvider>(
    extractor: &Extractor<L, DocumentIndex>,
    index: &DocumentIndex,
    request: &BatchRequest,
    cancel: &CancellationToken,
) -> Result<BatchReport> {
    let expected = request.session;
    let unchanged = || matches!(index.session(), Ok(current) if current == expected);

    let batch_cancel = cancel.child_token();
    let report = extractor
        .run_batch_with(request, &batch_cancel, |_| {
            if !batch_cancel.is_cancelled() && !unchanged() {
                warn!("Index was rebuilt during extraction, stopping");
                batch_cancel.cancel();
            }
        })
        .await?;

    if !unchanged() {
        let label = expected.map_or_else(|| "none".to_string(), |s| s.to_string());
        return Err(ExtractorError::SessionInvalidated(label).into());
    }
    Ok(report)
}

async fn load_web_context(args: &ExtractArgs) -> Result<Option<WebContext>> {
    let source = if let Some(path) = &args.web_text {
        StaticWebSource::from_text(&fs::read_to_string(path)?, args.web_source.as_str())?
    } else if let Some(path) = &args.web_json {
        StaticWebSource::from_product_json(&fs::read_to_string(path)?, args.web_source.as_str())?
    } else {
        return Ok(None);
    };
    Ok(resolve_web_context(&source, args.part_number.as_deref()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use sheetwise_domain::ChunkRecord;
    use sheetwise_extractor::PipelineConfig;
    use sheetwise_llm::MockProvider;
    use std::time::Duration;
    use tempfile::TempDir;

    fn chunks(colour: &str) -> Vec<ChunkRecord> {
        vec![
            ChunkRecord::new("Sealing class IP67 with housing seal", "seal.pdf", 0),
            ChunkRecord::new(format!("Colour: {}", colour), "seal.pdf", 1),
        ]
    }

    fn extractor(
        llm: MockProvider,
        index: &Arc<DocumentIndex>,
    ) -> Extractor<MockProvider, DocumentIndex> {
        let config = PipelineConfig {
            pacing_interval_seconds: 0.0,
            ..PipelineConfig::default()
        };
        Extractor::new(config)
            .with_llm(llm)
            .with_shared_retriever(Arc::clone(index))
    }

    fn request(index: &DocumentIndex) -> BatchRequest {
        let mut request = BatchRequest::new().with_attributes(vec!["Gender", "Colour"]);
        if let Some(session) = index.session().unwrap() {
            request = request.with_session(session);
        }
        request
    }

    #[tokio::test]
    async fn test_unchanged_index_returns_report() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(DocumentIndex::open(dir.path().join("index.db")).unwrap());
        index.replace_all(&chunks("black")).unwrap();

        let llm = MockProvider::new("{}");
        let report = run_pinned_to_session(
            &extractor(llm.clone(), &index),
            &index,
            &request(&index),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reingestion_by_another_handle_invalidates_batch() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("index.db");
        let index = Arc::new(DocumentIndex::open(&db_path).unwrap());
        let old_session = index.replace_all(&chunks("black")).unwrap();

        let llm = MockProvider::new("{}");
        llm.push_delayed_response(Duration::from_secs(10), r#"{"Gender": "Male"}"#);
        let extractor = extractor(llm.clone(), &index);
        let request = request(&index);

        let reingest = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let other = DocumentIndex::open(&db_path).unwrap();
            other.replace_all(&chunks("red")).unwrap()
        };
        let cancel = CancellationToken::new();
        let (result, new_session) = tokio::join!(
            run_pinned_to_session(&extractor, &index, &request, &cancel),
            reingest
        );

        assert_ne!(old_session, new_session);
        match result {
            Err(CliError::Extractor(ExtractorError::SessionInvalidated(session))) => {
                assert_eq!(session, old_session.to_string());
            }
            other => panic!("expected SessionInvalidated, got {:?}", other.map(|r| r.results.len())),
        }
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_index_rebuilt_before_batch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("index.db");
        let index = Arc::new(DocumentIndex::open(&db_path).unwrap());
        index.replace_all(&chunks("black")).unwrap();
        let request = request(&index);

        DocumentIndex::open(&db_path)
            .unwrap()
            .replace_all(&chunks("red"))
            .unwrap();

        let result = run_pinned_to_session(
            &extractor(MockProvider::new("{}"), &index),
            &index,
            &request,
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(CliError::Extractor(ExtractorError::SessionInvalidated(_)))
        ));
    }
}
