//! Source classification from the article URL.

use super::lexicon::Lexicon;
use crate::utils::upcase;

pub const OFFICIAL_SITE: &str = "site officiel";
pub const MEDIA: &str = "médias";
pub const OTHER: &str = "autre";

/// Classify `url` by keyword, first matching category wins:
/// social platform, official body, press outlet, then [`OTHER`].
///
/// Only the URL is inspected; the page content plays no part.
pub fn classify_source(lexicon: &Lexicon, url: &str) -> String {
    let url = url.to_lowercase();
    let contains = |keyword: &&String| !keyword.is_empty() && url.contains(&keyword.to_lowercase());

    if let Some(platform) = lexicon.social_media.iter().find(contains) {
        return format!("réseaux sociaux ({})", upcase(platform));
    }
    if lexicon.official_sources.iter().any(|k| contains(&k)) {
        return OFFICIAL_SITE.to_string();
    }
    if lexicon.media_keywords.iter().any(|k| contains(&k)) {
        return MEDIA.to_string();
    }
    OTHER.to_string()
}
