//! Substring matching against lexicon lists: location, disease and named
//! entities.
//!
//! Matching is case-insensitive and list-ordered: the first list entry found
//! anywhere in the text wins, even if a later entry occurs earlier in the text.

use crate::models::{NO_ENTITIES, NOT_IDENTIFIED, NOT_SPECIFIED};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

/// Characters of context captured on each side of an organization term.
pub const ENTITY_WINDOW: usize = 20;

/// Matches kept per organization term.
pub const MATCHES_PER_TERM: usize = 2;

/// First entry of `terms` contained in `text`, ignoring case.
pub fn first_match<'a>(terms: &'a [String], text: &str) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    terms
        .iter()
        .find(|term| !term.is_empty() && haystack.contains(&term.to_lowercase()))
        .map(String::as_str)
}

pub fn extract_location(locations: &[String], text: &str) -> String {
    first_match(locations, text)
        .unwrap_or(NOT_SPECIFIED)
        .to_string()
}

pub fn extract_disease(diseases: &[String], text: &str) -> String {
    first_match(diseases, text)
        .unwrap_or(NOT_IDENTIFIED)
        .to_string()
}

/// An organization term with its context-window pattern.
#[derive(Debug, Clone)]
pub struct OrganizationPattern {
    term: String,
    window: Regex,
}

impl OrganizationPattern {
    pub fn new(term: &str) -> Option<Self> {
        let pattern = format!(
            r"(?i)\b[\w\s]{{0,{n}}}{term}[\w\s]{{0,{n}}}\b",
            n = ENTITY_WINDOW,
            term = regex::escape(term)
        );
        match Regex::new(&pattern) {
            Ok(window) => Some(Self {
                term: term.to_string(),
                window,
            }),
            Err(e) => {
                warn!(%term, error = %e, "Skipping organization term with invalid pattern");
                None
            }
        }
    }
}

/// Collect organization mentions (with surrounding words) and animal terms.
///
/// Entities are deduplicated and joined with `"; "` in sorted order;
/// [`NO_ENTITIES`] when nothing matches.
pub fn extract_named_entities(
    organizations: &[OrganizationPattern],
    animals: &[String],
    text: &str,
) -> String {
    let haystack = text.to_lowercase();
    let mut entities = BTreeSet::new();

    for org in organizations {
        if !haystack.contains(&org.term.to_lowercase()) {
            continue;
        }
        for m in org.window.find_iter(text).take(MATCHES_PER_TERM) {
            let mention = m.as_str().trim();
            if !mention.is_empty() {
                entities.insert(mention.to_string());
            }
        }
    }

    for animal in animals {
        if !animal.is_empty() && haystack.contains(&animal.to_lowercase()) {
            entities.insert(animal.trim().to_string());
        }
    }

    if entities.is_empty() {
        NO_ENTITIES.to_string()
    } else {
        entities.into_iter().collect::<Vec<_>>().join("; ")
    }
}
