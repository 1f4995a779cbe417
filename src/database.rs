use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::{models::MetricDefinition, DwhExportError, Result};

lazy_static! {
    /// The first double-quoted identifier after a FROM keyword,
    /// e.g. `SELECT * FROM "inspectit"."raw"."measure"` yields `inspectit`.
    static ref DATABASE_PATTERN: Regex = Regex::new(r#"(?i)\bFROM\s+"([^"]+)"#).unwrap();
}

/// Picks the database for a metric query. An explicit database always wins;
/// otherwise it is derived from the query text when `derive_from_query` is set.
pub fn resolve_database(metric: &MetricDefinition, derive_from_query: bool) -> Result<String> {
    if metric.database.trim().is_empty() && derive_from_query {
        extract_database(&metric.query)
    } else {
        Ok(metric.database.clone())
    }
}

/// Only the first `FROM "..."` clause is considered; queries spanning
/// several databases need an explicit database.
pub fn extract_database(query: &str) -> Result<String> {
    let database = DATABASE_PATTERN
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(DwhExportError::DatabaseNotResolvable)?;

    debug!(database = %database, "Extracted database from query");
    Ok(database)
}
