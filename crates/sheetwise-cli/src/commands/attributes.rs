//! Attributes command implementation.

use super::load_catalog;
use crate::cli::AttributesArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sheetwise_domain::ContextSource;
use std::fs;

/// Execute the attributes command.
pub async fn execute_attributes(args: AttributesArgs, formatter: &Formatter) -> Result<()> {
    let catalog = load_catalog(args.catalog.as_deref())?;

    if let Some(path) = args.export {
        fs::write(&path, catalog.to_toml()?)?;
        println!(
            "{}",
            formatter.success(&format!("Wrote {} attributes to {}", catalog.len(), path.display()))
        );
        return Ok(());
    }

    if let Some(name) = args.show {
        let spec = catalog
            .get(&name)
            .ok_or_else(|| CliError::InvalidInput(format!("Unknown attribute '{}'", name)))?;
        println!("{}\n", formatter.info(&spec.name));
        println!("Document instructions:\n{}\n", spec.instructions_for(ContextSource::Document));
        println!("Web instructions:\n{}", spec.instructions_for(ContextSource::Web));
        return Ok(());
    }

    println!("{}", formatter.format_attributes(&catalog)?);
    Ok(())
}
