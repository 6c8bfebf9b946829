//! Deployment-tuned vocabulary tables.
//!
//! Recognizers mishear proper names and short words in stable ways. The
//! tables here capture those mappings; settings may extend or replace them
//! without touching matching code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Injectable vocabulary used by the resolver and the session state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Lexicon {
    /// Misheard phrase (lower-case) → canonical catalog name.
    pub phonetic_aliases: BTreeMap<String, String>,
    /// Words the recognizer produces instead of the wake word.
    pub wake_word_aliases: Vec<String>,
    /// Word-level rewrites applied to selection replies ("tree" → "three").
    pub pronunciation_corrections: BTreeMap<String, String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        let phonetic_aliases = [
            ("you too", "U2"),
            ("u two", "U2"),
            ("you two", "U2"),
            ("youtube", "U2"),
            ("a c d c", "AC/DC"),
            ("eighteen seas", "AC/DC"),
            ("ac dc", "AC/DC"),
            ("acdc", "AC/DC"),
            ("maybe evil babes", "Mediaeval Baebes"),
            ("medieval babes", "Mediaeval Baebes"),
            ("many evil babes", "Mediaeval Baebes"),
            ("medieval babies", "Mediaeval Baebes"),
            ("mediaeval babes", "Mediaeval Baebes"),
            ("muzzle sky", "Mussorgsky"),
            ("muscle ski", "Mussorgsky"),
            ("rock man enough", "Rachmaninoff"),
            ("shasta coverage", "Shostakovich"),
            ("show stock of it", "Shostakovich"),
            ("prokofiev", "Prokofiev"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let wake_word_aliases = [
            "less", "ls", "alex", "else", "allis", "palace", "at us", "at by", "a list",
            "analysis",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let pronunciation_corrections = [
            ("for", "four"),
            ("to", "two"),
            ("too", "two"),
            ("tree", "three"),
            ("ate", "eight"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            phonetic_aliases,
            wake_word_aliases,
            pronunciation_corrections,
        }
    }
}

impl Lexicon {
    /// Look up a phonetic alias by its case-folded, trimmed key.
    pub fn alias_for(&self, term: &str) -> Option<&str> {
        let key = term.trim().to_lowercase();
        self.phonetic_aliases.get(&key).map(String::as_str)
    }

    /// Apply word-level pronunciation corrections.
    pub fn correct_pronunciation(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|word| {
                self.pronunciation_corrections
                    .get(word)
                    .map(String::as_str)
                    .unwrap_or(word)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Merge additional entries; later values win on key collisions.
    pub fn extend(&mut self, other: &Lexicon) {
        for (k, v) in &other.phonetic_aliases {
            self.phonetic_aliases
                .insert(k.trim().to_lowercase(), v.trim().to_string());
        }
        for alias in &other.wake_word_aliases {
            let alias = alias.trim().to_lowercase();
            if !alias.is_empty() && !self.wake_word_aliases.contains(&alias) {
                self.wake_word_aliases.push(alias);
            }
        }
        for (k, v) in &other.pronunciation_corrections {
            self.pronunciation_corrections
                .insert(k.trim().to_lowercase(), v.trim().to_lowercase());
        }
    }
}
