//! End-of-run summary logged after the final dataset is written.

use crate::models::Record;
use itertools::Itertools;
use tracing::info;

/// Value distributions over a finished batch.
///
/// Distributions only cover successful records; failed records carry empty
/// fields. Entries are ordered by count, most frequent first, then by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub languages: Vec<(String, usize)>,
    pub sources: Vec<(String, usize)>,
    pub diseases: Vec<(String, usize)>,
    pub locations: Vec<(String, usize)>,
}

fn distribution<'a>(
    records: impl Iterator<Item = &'a Record> + Clone,
    field: impl Fn(&'a Record) -> &'a str,
) -> Vec<(String, usize)> {
    records
        .map(field)
        .counts()
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

impl BatchReport {
    pub fn from_records(records: &[Record]) -> Self {
        let ok = records.iter().filter(|r| r.status.is_success());
        let succeeded = ok.clone().count();
        Self {
            total: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            languages: distribution(ok.clone(), |r| r.language.as_str()),
            sources: distribution(ok.clone(), |r| r.source_class.as_str()),
            diseases: distribution(ok.clone(), |r| r.disease.as_str()),
            locations: distribution(ok, |r| r.location.as_str()),
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            "Batch summary"
        );
        for (name, entries) in [
            ("langue", &self.languages),
            ("source", &self.sources),
            ("maladie", &self.diseases),
            ("lieu", &self.locations),
        ] {
            for (value, count) in entries {
                info!(field = name, %value, count, "Distribution");
            }
        }
    }
}
