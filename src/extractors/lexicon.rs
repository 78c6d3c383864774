//! Keyword lists driving the substring extractors.
//!
//! Every heuristic in [`crate::extractors`] is fully determined by the lists
//! held here. The built-in lists cover French, English and Arabic coverage of
//! North-African animal-health news; a YAML file can replace any of them:
//!
//! ```yaml
//! locations: [Tunisie, Sfax, Kairouan]
//! diseases: [grippe aviaire, "dermatose nodulaire"]
//! date_meta:
//!   - { attribute: property, value: "article:published_time" }
//! ```
//!
//! Keys missing from the file keep their built-in value. List order matters:
//! the first entry found in the text wins, regardless of where it appears.

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// A `<meta>` attribute/value pair that marks a publication date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetaPattern {
    pub attribute: String,
    pub value: String,
}

impl MetaPattern {
    fn new(attribute: &str, value: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    /// CSS selector for `<meta>` tags carrying this pattern and a `content`.
    pub fn selector(&self) -> String {
        format!(
            r#"meta[{}="{}"][content]"#,
            self.attribute,
            self.value.replace('"', "\\\"")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Place names, returned verbatim on match.
    pub locations: Vec<String>,
    /// Disease names and phrases in any language.
    pub diseases: Vec<String>,
    /// Organization terms whose surrounding words become named entities.
    pub organizations: Vec<String>,
    /// Animal terms recorded as named entities.
    pub animals: Vec<String>,
    /// URL keywords for social platforms; the keyword names the platform.
    pub social_media: Vec<String>,
    /// URL keywords for governmental and intergovernmental bodies.
    pub official_sources: Vec<String>,
    /// URL keywords for press outlets.
    pub media_keywords: Vec<String>,
    /// Publication-date metadata, tried in order.
    pub date_meta: Vec<MetaPattern>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            locations: strings(&[
                "Tunisie",
                "France",
                "Maroc",
                "Algérie",
                "Egypte",
                "Tunisia",
                "Morocco",
                "Algeria",
                "Egypt",
                "Tunis",
                "Paris",
                "Rabat",
                "Casablanca",
                "Alger",
                "Le Caire",
                "Sfax",
                "Sousse",
            ]),
            diseases: strings(&[
                "grippe aviaire",
                "fièvre aphteuse",
                "peste porcine",
                "rage",
                "brucellose",
                "tuberculose",
                "anthrax",
                "salmonellose",
                "avian flu",
                "foot and mouth",
                "rabies",
                "covid",
                "monkeypox",
                "الحمى القلاعية",
                "أنفلونزا الطيور",
                "داء الكلب",
                "peste bovine",
                "charbon",
                "listériose",
                "campylobacter",
            ]),
            organizations: strings(&[
                "OMS",
                "WHO",
                "FAO",
                "OIE",
                "WOAH",
                "ministère",
                "ministry",
                "université",
                "university",
                "institut",
                "centre",
                "laboratoire",
            ]),
            animals: strings(&[
                "bovins", "volailles", "porcs", "ovins", "caprins", "cattle", "poultry", "pigs",
                "sheep", "goats", "poulet", "vache", "mouton", "chèvre", "cheval", "chicken",
                "cow", "horse", "أبقار", "دواجن",
            ]),
            social_media: strings(&["facebook", "twitter", "instagram", "linkedin", "youtube"]),
            official_sources: strings(&[
                "gov",
                "who",
                "oie",
                "fao",
                "ministere",
                "ministry",
                "gouvernement",
            ]),
            media_keywords: strings(&["news", "journal", "radio", "tv", "media", "presse", "info"]),
            date_meta: vec![
                MetaPattern::new("property", "article:published_time"),
                MetaPattern::new("name", "publishdate"),
                MetaPattern::new("name", "date"),
                MetaPattern::new("itemprop", "datePublished"),
                MetaPattern::new("name", "pubdate"),
                MetaPattern::new("name", "DC.date.issued"),
            ],
        }
    }
}

impl Lexicon {
    /// Load a lexicon from a YAML file, falling back to built-in lists for
    /// any key the file leaves out.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path).await?;
        let lexicon = Self::from_yaml(&text)?;
        info!(
            locations = lexicon.locations.len(),
            diseases = lexicon.diseases.len(),
            organizations = lexicon.organizations.len(),
            animals = lexicon.animals.len(),
            "Loaded lexicon"
        );
        Ok(lexicon)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}
