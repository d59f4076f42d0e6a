//! Search command implementation.

use crate::cli::SearchArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sheetwise_store::DocumentIndex;

/// Execute the search command.
pub async fn execute_search(args: SearchArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    if args.limit == 0 {
        return Err(CliError::InvalidInput("Limit must be greater than 0".to_string()));
    }

    let db_path = config.database_path(args.db.as_deref())?;
    if !db_path.exists() {
        return Err(CliError::InvalidInput(format!(
            "No index at {}. Run 'sheetwise ingest' first.",
            db_path.display()
        )));
    }

    let index = DocumentIndex::open(&db_path)?;
    let chunks = index.search_chunks(&args.query, args.limit)?;
    println!("{}", formatter.format_chunks(&chunks)?);
    Ok(())
}
