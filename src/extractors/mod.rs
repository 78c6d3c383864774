//! Field extractors turning a rendered page into record fields.
//!
//! Every extractor is a deterministic function of its input: keyword lists,
//! regular expressions and selector queries, no statistical inference beyond
//! language identification. Absence of a match always yields a sentinel,
//! never an error.
//!
//! # Submodules
//!
//! | Module | Fields |
//! |--------|--------|
//! | [`page`] | title, content |
//! | [`language`] | language |
//! | [`date`] | publication date |
//! | [`keywords`] | location, disease, named entities |
//! | [`source`] | source class |
//! | [`summary`] | 50/100/150-word summaries |
//! | [`lexicon`] | the keyword lists behind all of the above |

pub mod date;
pub mod keywords;
pub mod language;
pub mod lexicon;
pub mod page;
pub mod source;
pub mod summary;

use keywords::OrganizationPattern;
use lexicon::Lexicon;
use page::PageDocument;
use scraper::Selector;
use tracing::warn;

/// Fields derived from an article body and its URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFields {
    pub language: String,
    pub char_count: usize,
    pub word_count: usize,
    pub location: String,
    pub disease: String,
    pub source_class: String,
    pub summaries: [String; 3],
    pub named_entities: String,
}

/// The lexicon together with the patterns compiled from it.
#[derive(Debug, Clone)]
pub struct FieldExtractors {
    lexicon: Lexicon,
    organizations: Vec<OrganizationPattern>,
    date_meta: Vec<Selector>,
}

impl Default for FieldExtractors {
    fn default() -> Self {
        Self::new(Lexicon::default())
    }
}

impl FieldExtractors {
    pub fn new(lexicon: Lexicon) -> Self {
        let organizations = lexicon
            .organizations
            .iter()
            .filter_map(|term| OrganizationPattern::new(term))
            .collect();
        let date_meta = lexicon
            .date_meta
            .iter()
            .filter_map(|meta| match Selector::parse(&meta.selector()) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!(attribute = %meta.attribute, value = %meta.value, error = %e, "Skipping date metadata pattern");
                    None
                }
            })
            .collect();
        Self {
            lexicon,
            organizations,
            date_meta,
        }
    }

    pub fn title(&self, heading: Option<&str>, page: &PageDocument) -> String {
        page::extract_title(heading, page)
    }

    pub fn content(&self, page: &PageDocument) -> String {
        page::extract_content(page)
    }

    pub fn publication_date(&self, page: &PageDocument, content: &str) -> String {
        date::extract_date(page, &self.date_meta, content)
    }

    /// Run every text- and URL-based extractor over `content`.
    pub fn content_fields(&self, url: &str, content: &str) -> ContentFields {
        ContentFields {
            language: language::detect_language(content),
            char_count: content.chars().count(),
            word_count: content.split_whitespace().count(),
            location: keywords::extract_location(&self.lexicon.locations, content),
            disease: keywords::extract_disease(&self.lexicon.diseases, content),
            source_class: source::classify_source(&self.lexicon, url),
            summaries: summary::SUMMARY_LENGTHS.map(|n| summary::summarize(content, n)),
            named_entities: keywords::extract_named_entities(
                &self.organizations,
                &self.lexicon.animals,
                content,
            ),
        }
    }
}
