//! Extractive summaries by word budget.

/// Word budgets of the three summary columns.
pub const SUMMARY_LENGTHS: [usize; 3] = [50, 100, 150];

/// Average word length assumed when comparing a character position with a
/// word budget.
const CHARS_PER_WORD: f64 = 5.0;

/// A cut point must lie beyond this fraction of the budget to be used.
const MIN_CUT_RATIO: f64 = 0.7;

/// Summarize `text` to at most `word_count` words.
///
/// Text within the budget is returned unchanged. Otherwise the first
/// `word_count` words are kept; if the last `.` of that prefix sits beyond
/// `word_count * 0.7 * 5` characters the summary ends at it, else `...` is
/// appended.
pub fn summarize(text: &str, word_count: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= word_count {
        return text.to_string();
    }

    let mut summary = words[..word_count].join(" ");
    let threshold = word_count as f64 * MIN_CUT_RATIO * CHARS_PER_WORD;
    let cut = summary
        .rfind('.')
        .map(|byte_idx| (byte_idx, summary[..byte_idx].chars().count()));

    match cut {
        Some((byte_idx, char_pos)) if char_pos as f64 > threshold => {
            summary.truncate(byte_idx + 1);
        }
        _ => summary.push_str("..."),
    }
    summary.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_text_unchanged() {
        let text = "  Un foyer   de rage.  ";
        assert_eq!(summarize(text, 50), text);
        let exact = words(50);
        assert_eq!(summarize(&exact, 50), exact);
    }

    #[test]
    fn test_ellipsis_when_no_late_period() {
        let text = words(80);
        let summary = summarize(&text, 50);
        assert_eq!(summary, format!("{}...", words(50)));
        assert_eq!(summary.split_whitespace().count(), 50);
    }

    #[test]
    fn test_cuts_at_late_period() {
        // 49 words of 4 chars then a sentence end: the period sits past 175 chars.
        let mut parts: Vec<String> = (0..49).map(|_| "abcd".to_string()).collect();
        parts.push("fin.".to_string());
        parts.extend((0..20).map(|_| "suite".to_string()));
        let text = parts.join(" ");
        let summary = summarize(&text, 50);
        assert!(summary.ends_with("fin."));
        assert_eq!(summary.split_whitespace().count(), 50);
    }

    #[test]
    fn test_early_period_is_ignored() {
        let text = format!("Titre. {}", words(80));
        let summary = summarize(&text, 50);
        assert!(summary.ends_with("..."));
        assert!(summary.starts_with("Titre."));
    }

    #[test]
    fn test_word_budget_holds_for_all_lengths() {
        let text = format!("{}. {}", words(120), words(200));
        for n in SUMMARY_LENGTHS {
            let summary = summarize(&text, n);
            assert!(summary.split_whitespace().count() <= n);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = words(300);
        assert_eq!(summarize(&text, 100), summarize(&text, 100));
    }
}
