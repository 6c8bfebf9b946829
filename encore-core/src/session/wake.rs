//! Wake-word detection on normalized transcripts.

/// Detects the configured wake word (or a known misrecognition of it) at the
/// start of an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeWordDetector {
    wake_word: String,
    aliases: Vec<String>,
}

impl WakeWordDetector {
    pub fn new(wake_word: &str, aliases: &[String]) -> Self {
        Self {
            wake_word: wake_word.trim().to_lowercase(),
            aliases: aliases
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    pub fn wake_word(&self) -> &str {
        &self.wake_word
    }

    pub fn detects(&self, text: &str) -> bool {
        self.strip(text).is_some()
    }

    /// The text following a leading wake word, trimmed of separators.
    ///
    /// The configured word is tried first; otherwise the longest matching
    /// alias wins, ties going to the earlier alias.
    pub fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        let text = text.trim();
        let matched = if starts_with_word(text, &self.wake_word) {
            Some(self.wake_word.len())
        } else {
            self.aliases
                .iter()
                .filter(|alias| starts_with_word(text, alias))
                .map(|alias| alias.len())
                .fold(None, |best: Option<usize>, len| match best {
                    Some(b) if b >= len => Some(b),
                    _ => Some(len),
                })
        }?;
        Some(text[matched..].trim_start_matches(|c: char| !c.is_alphanumeric()))
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    !word.is_empty()
        && text.starts_with(word)
        && text[word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> WakeWordDetector {
        let aliases: Vec<String> = ["less", "alex", "a list", "a listener"]
            .into_iter()
            .map(String::from)
            .collect();
        WakeWordDetector::new("Alice", &aliases)
    }

    #[test]
    fn strips_configured_wake_word() {
        let d = detector();
        assert_eq!(d.strip("alice play the planets"), Some("play the planets"));
        assert_eq!(d.strip("alice, pause"), Some("pause"));
        assert_eq!(d.strip("alice"), Some(""));
    }

    #[test]
    fn requires_a_word_boundary() {
        let d = detector();
        assert_eq!(d.strip("alicent play"), None);
        assert_eq!(d.strip("lesson one"), None);
        assert_eq!(d.strip("play alice"), None);
    }

    #[test]
    fn aliases_match_with_longest_first() {
        let d = detector();
        assert_eq!(d.strip("less next track"), Some("next track"));
        assert_eq!(d.strip("a listener pause"), Some("pause"));
        assert_eq!(d.strip("a list pause"), Some("pause"));
    }
}
