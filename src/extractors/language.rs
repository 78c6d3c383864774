//! Language identification.

use crate::models::NOT_DETECTED;
use whatlang::Lang;

/// Number of leading characters handed to the identifier.
pub const SAMPLE_CHARS: usize = 500;

/// Identify the language of `text` from its first [`SAMPLE_CHARS`] characters.
///
/// Arabic, French, English, Spanish and German map to their French names.
/// Any other identified language is returned as its ISO 639-3 code; text the
/// identifier cannot classify yields [`NOT_DETECTED`].
pub fn detect_language(text: &str) -> String {
    let sample: String = text.chars().take(SAMPLE_CHARS).collect();
    match whatlang::detect_lang(&sample) {
        Some(Lang::Ara) => "arabe".to_string(),
        Some(Lang::Fra) => "français".to_string(),
        Some(Lang::Eng) => "anglais".to_string(),
        Some(Lang::Spa) => "espagnol".to_string(),
        Some(Lang::Deu) => "allemand".to_string(),
        Some(other) => other.code().to_string(),
        None => NOT_DETECTED.to_string(),
    }
}
