//! Ordinal replies to a disambiguation prompt.

/// Ordinal vocabulary in priority order; the index is the 0-based position.
const ORDINALS: &[&[&str]] = &[
    &["one", "first", "1"],
    &["two", "second", "2"],
    &["three", "third", "3"],
    &["four", "fourth", "4"],
    &["five", "fifth", "5"],
    &["six", "sixth", "6"],
    &["seven", "seventh", "7"],
    &["eight", "eighth", "8"],
    &["nine", "ninth", "9"],
    &["ten", "tenth", "10"],
];

const CANCEL_WORDS: &[&str] = &["cancel", "stop"];

/// 0-based position named by the first vocabulary entry present in `text`.
///
/// `text` should already have pronunciation corrections applied.
pub fn parse_ordinal(text: &str) -> Option<usize> {
    let words = words(text);
    ORDINALS
        .iter()
        .position(|keywords| keywords.iter().any(|k| words.contains(k)))
}

/// Whether `text` contains a cancel word as a whole word.
pub fn is_cancel(text: &str) -> bool {
    let words = words(text);
    CANCEL_WORDS.iter().any(|w| words.contains(w))
}

/// Whitespace-separated words with surrounding punctuation removed.
fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_ordinals_and_digits() {
        assert_eq!(parse_ordinal("one"), Some(0));
        assert_eq!(parse_ordinal("the third one please"), Some(0));
        assert_eq!(parse_ordinal("third"), Some(2));
        assert_eq!(parse_ordinal("no. 2"), Some(1));
        assert_eq!(parse_ordinal("number 10"), Some(9));
    }

    #[test]
    fn ignores_numbers_embedded_in_other_words() {
        assert_eq!(parse_ordinal("twelve"), None);
        assert_eq!(parse_ordinal("often"), None);
        assert_eq!(parse_ordinal("someone"), None);
    }

    #[test]
    fn detects_cancel_phrases() {
        assert!(is_cancel("cancel now"));
        assert!(is_cancel("stop it"));
        assert!(!is_cancel("seven"));
    }

    #[test]
    fn cancel_words_inside_other_words_do_not_cancel() {
        assert!(!is_cancel("christopher"));
        assert!(!is_cancel("nonstop"));
        assert!(is_cancel("please, stop."));
    }
}
