//! Per-article processing: fetch one URL, extract every field, and classify
//! the outcome.
//!
//! [`ArticleProcessor::process`] never fails outward. Whatever goes wrong,
//! the task yields exactly one [`Record`] whose `status` says what happened:
//!
//! | Failure | Status |
//! |---------|--------|
//! | Navigation timeout | `erreur: timeout` |
//! | Page-level network error or bad URL | `erreur: <detail>` |
//! | Browser session fault | `erreur: <detail>` |
//! | Panic during extraction | `erreur: <detail>` |
//!
//! Only browser session faults mark the [`Outcome`] as suspect for the
//! session; the batch runner restarts the browser on a run of those.

use crate::extractors::FieldExtractors;
use crate::fetcher::{Fetch, FetchError, FetchedPage};
use crate::models::{Record, Status, UrlTask};
use crate::utils::{truncate_chars, truncate_for_log};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, instrument, warn};

/// Maximum characters of error detail kept in a status.
pub const STATUS_DETAIL_CHARS: usize = 50;

/// The record for one task, plus whether the failure points at the browser.
#[derive(Debug)]
pub struct Outcome {
    pub record: Record,
    pub session_fault: bool,
}

impl From<Record> for Outcome {
    fn from(record: Record) -> Self {
        Self {
            record,
            session_fault: false,
        }
    }
}

pub struct ArticleProcessor {
    extractors: FieldExtractors,
}

impl ArticleProcessor {
    pub fn new(extractors: FieldExtractors) -> Self {
        Self { extractors }
    }

    /// Fetch `task.url` through `session` and build its record.
    #[instrument(level = "info", skip_all, fields(code = %task.id, url = %task.url))]
    pub async fn process<F: Fetch>(&self, session: &mut F, task: &UrlTask) -> Outcome {
        match session.open(&task.url).await {
            Ok(page) => self.extract(task, &page).into(),
            Err(FetchError::Timeout) => {
                warn!("Navigation timed out");
                Record::failed(task, Status::Timeout).into()
            }
            Err(e) => {
                let detail = e.to_string();
                let session_fault = e.is_session_fault();
                warn!(error = %truncate_for_log(&detail, 100), session_fault, "Fetch failed");
                Outcome {
                    record: Record::failed(
                        task,
                        Status::FetchError(truncate_chars(&detail, STATUS_DETAIL_CHARS)),
                    ),
                    session_fault,
                }
            }
        }
    }

    /// Build the record for an already fetched page.
    ///
    /// A panic inside any extractor is caught and reported as
    /// [`Status::UnknownError`].
    pub fn extract(&self, task: &UrlTask, page: &FetchedPage) -> Record {
        match panic::catch_unwind(AssertUnwindSafe(|| self.build_record(task, page))) {
            Ok(record) => record,
            Err(payload) => {
                let detail = panic_detail(payload.as_ref());
                error!(code = %task.id, detail = %detail, "Extraction panicked");
                Record::failed(
                    task,
                    Status::UnknownError(truncate_chars(&detail, STATUS_DETAIL_CHARS)),
                )
            }
        }
    }

    fn build_record(&self, task: &UrlTask, page: &FetchedPage) -> Record {
        let document = page.document();
        let title = self.extractors.title(page.heading.as_deref(), &document);
        let content = self.extractors.content(&document);
        let publication_date = self.extractors.publication_date(&document, &content);
        let fields = self.extractors.content_fields(&task.url, &content);
        debug!(
            url = %page.url,
            title = %truncate_for_log(&title, 80),
            chars = fields.char_count,
            words = fields.word_count,
            language = %fields.language,
            "Extracted article"
        );

        let [summary_50, summary_100, summary_150] = fields.summaries;
        Record {
            id: task.id.clone(),
            url: task.url.clone(),
            title,
            content,
            language: fields.language,
            char_count: fields.char_count,
            word_count: fields.word_count,
            publication_date,
            location: fields.location,
            disease: fields.disease,
            source_class: fields.source_class,
            summary_50,
            summary_100,
            summary_150,
            named_entities: fields.named_entities,
            status: Status::Success,
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during extraction".to_string()
    }
}
