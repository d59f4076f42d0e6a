//! Command implementations.

pub mod attributes;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod search;

pub use self::attributes::execute_attributes;
pub use self::config::execute_config;
pub use self::extract::execute_extract;
pub use self::ingest::execute_ingest;
pub use self::search::execute_search;

use crate::error::Result;
use sheetwise_extractor::AttributeCatalog;
use std::fs;
use std::path::Path;

/// Built-in catalog, or one loaded from TOML.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<AttributeCatalog> {
    match path {
        Some(path) => Ok(AttributeCatalog::from_toml(&fs::read_to_string(path)?)?),
        None => Ok(AttributeCatalog::default()),
    }
}
