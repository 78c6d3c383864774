//! Data models for scrape tasks and the records they produce.
//!
//! This module defines the core data structures used throughout the application:
//! - [`UrlTask`]: One row of the input list (`code`, `lien`)
//! - [`Record`]: One row of the output dataset, one per task
//! - [`Status`]: Outcome of processing a task, serialized as the French literals
//!   the dashboard filters on
//!
//! The serialized column names are French because the downstream dashboard
//! reads them by name; the Rust field names stay English.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for a title or publication date that could not be found.
pub const NOT_FOUND: &str = "non trouvé";
/// Sentinel for a location that is not in the lexicon.
pub const NOT_SPECIFIED: &str = "non spécifié";
/// Sentinel for a disease that is not in the lexicon.
pub const NOT_IDENTIFIED: &str = "non identifié";
/// Sentinel for a language that could not be identified.
pub const NOT_DETECTED: &str = "non détecté";
/// Sentinel for an empty named-entity set.
pub const NO_ENTITIES: &str = "aucune";

/// A URL to scrape, read from the input CSV.
///
/// # Fields
///
/// * `id` - The task code from the `code` column
/// * `url` - The article URL from the `lien` column
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlTask {
    /// Task identifier, kept verbatim in the output `code` column.
    #[serde(rename = "code")]
    pub id: String,
    /// The article URL.
    #[serde(rename = "lien")]
    pub url: String,
}

#[cfg(test)]
impl UrlTask {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Outcome of processing a single [`UrlTask`].
///
/// Serialized as `succès`, `erreur: timeout`, or `erreur: <detail>`. Fetch and
/// unknown errors share the same serialized form, so reading a dataset back
/// yields [`Status::FetchError`] for both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Status {
    Success,
    Timeout,
    FetchError(String),
    UnknownError(String),
}

impl Status {
    pub const SUCCESS: &'static str = "succès";
    pub const TIMEOUT: &'static str = "erreur: timeout";
    const ERROR_PREFIX: &'static str = "erreur: ";

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => f.write_str(Self::SUCCESS),
            Status::Timeout => f.write_str(Self::TIMEOUT),
            Status::FetchError(detail) | Status::UnknownError(detail) => {
                write!(f, "{}{}", Self::ERROR_PREFIX, detail)
            }
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.to_string()
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        if s == Status::SUCCESS {
            Status::Success
        } else if s == Status::TIMEOUT {
            Status::Timeout
        } else {
            let detail = s.strip_prefix(Status::ERROR_PREFIX).unwrap_or(&s);
            Status::FetchError(detail.to_string())
        }
    }
}

/// One row of the output dataset.
///
/// Field order is the column order of the CSV artifact. Every text field
/// carries either an extracted value or a sentinel; records for failed tasks
/// carry empty strings and zero counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "code")]
    pub id: String,
    pub url: String,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(rename = "contenu")]
    pub content: String,
    #[serde(rename = "langue")]
    pub language: String,
    #[serde(rename = "nb_caracteres")]
    pub char_count: usize,
    #[serde(rename = "nb_mots")]
    pub word_count: usize,
    #[serde(rename = "date_publication")]
    pub publication_date: String,
    #[serde(rename = "lieu")]
    pub location: String,
    #[serde(rename = "maladie")]
    pub disease: String,
    #[serde(rename = "source")]
    pub source_class: String,
    #[serde(rename = "resume_50")]
    pub summary_50: String,
    #[serde(rename = "resume_100")]
    pub summary_100: String,
    #[serde(rename = "resume_150")]
    pub summary_150: String,
    #[serde(rename = "entites_nommees")]
    pub named_entities: String,
    pub status: Status,
}

impl Record {
    /// Column names in serialization order.
    pub const COLUMNS: [&'static str; 16] = [
        "code",
        "url",
        "titre",
        "contenu",
        "langue",
        "nb_caracteres",
        "nb_mots",
        "date_publication",
        "lieu",
        "maladie",
        "source",
        "resume_50",
        "resume_100",
        "resume_150",
        "entites_nommees",
        "status",
    ];

    /// A record with empty fields for a task that did not complete.
    pub fn failed(task: &UrlTask, status: Status) -> Self {
        Self {
            id: task.id.clone(),
            url: task.url.clone(),
            title: String::new(),
            content: String::new(),
            language: String::new(),
            char_count: 0,
            word_count: 0,
            publication_date: String::new(),
            location: String::new(),
            disease: String::new(),
            source_class: String::new(),
            summary_50: String::new(),
            summary_100: String::new(),
            summary_150: String::new(),
            named_entities: String::new(),
            status,
        }
    }
}
