//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sheetwise_ingest::{IngestConfig, Ingestor};
use sheetwise_store::DocumentIndex;
use std::fs;
use tracing::info;

/// Execute the ingest command.
pub async fn execute_ingest(args: IngestArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let workers = args.workers.unwrap_or(config.settings.max_concurrent_documents);
    let ingest_config = IngestConfig::new(config.pipeline.chunk_size, config.pipeline.chunk_overlap)
        .with_max_concurrent_documents(workers);
    let ingestor = Ingestor::new(ingest_config)?;

    let report = ingestor.ingest_paths(&args.paths).await;
    for failure in report.failures() {
        eprintln!(
            "{}",
            formatter.warning(&format!(
                "Skipped {}: {}",
                failure.source,
                failure.error.as_deref().unwrap_or("unknown error")
            ))
        );
    }

    if report.is_empty() {
        return Err(CliError::InvalidInput(
            "No text could be extracted from the given documents".to_string(),
        ));
    }

    let db_path = config.database_path(args.db.as_deref())?;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let index = DocumentIndex::open(&db_path)?;
    let session = index.replace_all(&report.chunks)?;
    info!("Index at {} now holds session {}", db_path.display(), session);

    println!("{}", formatter.format_ingest(&report, &index.stats()?)?);
    Ok(())
}
