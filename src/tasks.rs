//! Loading the list of URLs to scrape.
//!
//! The input is a CSV file with at least a `code` and a `lien` column; other
//! columns are ignored. Values are trimmed. A leading byte-order mark, as
//! written by spreadsheet exports, is accepted.

use crate::models::UrlTask;
use crate::outputs::dataset::BOM;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

/// Parse tasks from CSV text, preserving input order.
pub fn parse_tasks(text: &str) -> Result<Vec<UrlTask>, csv::Error> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let tasks = reader.deserialize().collect::<Result<Vec<UrlTask>, _>>()?;

    for task in &tasks {
        if let Err(e) = Url::parse(&task.url) {
            warn!(code = %task.id, url = %task.url, error = %e, "Unparseable URL; it will be recorded as a failed task");
        }
    }
    Ok(tasks)
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_tasks(path: &Path) -> Result<Vec<UrlTask>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let tasks = parse_tasks(&text)?;
    info!(count = tasks.len(), "Loaded tasks");
    Ok(tasks)
}
