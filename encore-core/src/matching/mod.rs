//! Tiered resolution of a spoken term against one catalog field.
//!
//! ## Tiers
//!
//! | # | Tier | Score |
//! |---|------|-------|
//! | 1 | Phonetic alias (raw term, case-folded) | 1.0 |
//! | 2 | Exact match of the normalized term | 1.0 |
//! | 3 | Short term (≤ 4 chars) vs any word of an entry | 0.95 |
//! | 4 | Entry contains the normalized term | 0.9 |
//! | 5 | Best similarity ≥ fuzzy minimum | ratio |
//!
//! The first tier that produces a candidate wins; later tiers never run.

pub mod similarity;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CatalogCache;
use crate::lexicon::Lexicon;
use crate::normalize::normalize;

/// Library metadata fields that can be resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKind {
    Artist,
    Composer,
    Album,
}

impl FieldKind {
    /// Field name as used by the media server.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Artist => "Artist",
            FieldKind::Composer => "Composer",
            FieldKind::Album => "Album",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which resolver tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Alias,
    Exact,
    ShortWord,
    Substring,
    Fuzzy,
    Miss,
}

/// Result of resolving one term against one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub value: Option<String>,
    /// Confidence in `[0, 1]`; `1.0` means alias or exact identity.
    pub score: f64,
    pub field: FieldKind,
    pub tier: MatchTier,
}

impl Match {
    pub fn miss(field: FieldKind) -> Self {
        Self {
            value: None,
            score: 0.0,
            field,
            tier: MatchTier::Miss,
        }
    }

    fn hit(value: &str, score: f64, field: FieldKind, tier: MatchTier) -> Self {
        Self {
            value: Some(value.to_string()),
            score,
            field,
            tier,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }
}

/// Every numeric cutoff used by matching and generic resolution.
///
/// The defaults are the deployment-tuned values; all are overridable from
/// settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MatchThresholds {
    /// Terms at most this many characters use the short-word tier.
    pub short_term_max_chars: usize,
    /// Minimum word-level similarity for the short-word tier.
    pub short_word_min: f64,
    /// Score reported by the short-word tier.
    pub short_word_score: f64,
    /// Score reported by the substring tier.
    pub substring_score: f64,
    /// Minimum similarity accepted by the fuzzy tier.
    pub fuzzy_min: f64,
    /// Album candidates for a specific-work request must score above this.
    pub specific_work_min: f64,
    /// Maximum candidates offered for a specific-work request.
    pub specific_work_limit: usize,
    /// Query words longer than this select albums during a specific-work scan.
    pub specific_work_word_min_chars: usize,
    /// A direct field match must score above this to be taken.
    pub field_accept: f64,
    /// Person score needed before the album tie-break is considered.
    pub person_tie_min: f64,
    /// Album must beat the person by at least this much to keep the win.
    pub person_tie_margin: f64,
    /// Combined-phrase album candidates must score above this.
    pub combined_min: f64,
    /// Combined-phrase fallback candidates must score above this.
    pub combined_fallback_min: f64,
    /// Name parts longer than this anchor the combined-phrase fallback.
    pub combined_name_part_min_chars: usize,
    /// Explicit artist/album searches accept matches above this.
    pub explicit_search_min: f64,
    /// Maximum candidates offered in a disambiguation prompt.
    pub disambiguation_limit: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            short_term_max_chars: 4,
            short_word_min: 0.75,
            short_word_score: 0.95,
            substring_score: 0.9,
            fuzzy_min: 0.6,
            specific_work_min: 0.3,
            specific_work_limit: 5,
            specific_work_word_min_chars: 3,
            field_accept: 0.8,
            person_tie_min: 0.75,
            person_tie_margin: 0.15,
            combined_min: 0.5,
            combined_fallback_min: 0.6,
            combined_name_part_min_chars: 2,
            explicit_search_min: 0.6,
            disambiguation_limit: 10,
        }
    }
}

/// Resolves spoken terms against catalog values.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    thresholds: MatchThresholds,
    lexicon: Arc<Lexicon>,
}

impl EntityResolver {
    pub fn new(thresholds: MatchThresholds, lexicon: Arc<Lexicon>) -> Self {
        Self {
            thresholds,
            lexicon,
        }
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Resolve `term` against the cached catalog for `field`.
    pub fn resolve_cached(&self, term: &str, field: FieldKind, cache: &CatalogCache) -> Match {
        let catalog = cache.values(field);
        self.resolve(term, field, &catalog)
    }

    /// Resolve `term` against `catalog`. An empty catalog always misses.
    pub fn resolve(&self, term: &str, field: FieldKind, catalog: &[String]) -> Match {
        if catalog.is_empty() {
            return Match::miss(field);
        }

        // ── 1. Phonetic alias ───────────────────────────────────────────
        if let Some(canonical) = self.lexicon.alias_for(term) {
            if let Some(entry) = catalog.iter().find(|e| e.eq_ignore_ascii_case(canonical)) {
                debug!(term, alias = canonical, field = %field, "alias match");
                return Match::hit(entry, 1.0, field, MatchTier::Alias);
            }
        }

        let needle = normalize(term);
        if needle.is_empty() {
            return Match::miss(field);
        }
        let lowered: Vec<String> = catalog.iter().map(|e| e.to_lowercase()).collect();

        // ── 2. Exact ────────────────────────────────────────────────────
        if let Some(idx) = lowered.iter().position(|e| *e == needle) {
            return Match::hit(&catalog[idx], 1.0, field, MatchTier::Exact);
        }

        // ── 3. Short term vs individual words ───────────────────────────
        if needle.chars().count() <= self.thresholds.short_term_max_chars {
            if let Some((idx, best)) = best_by(&lowered, |e| similarity::best_word_ratio(&needle, e))
            {
                if best >= self.thresholds.short_word_min {
                    return Match::hit(
                        &catalog[idx],
                        self.thresholds.short_word_score,
                        field,
                        MatchTier::ShortWord,
                    );
                }
            }
        }

        // ── 4. Substring ────────────────────────────────────────────────
        let best_substring = lowered
            .iter()
            .enumerate()
            .filter(|(_, e)| e.contains(needle.as_str()))
            .map(|(idx, e)| (idx, similarity::ratio(&needle, e)))
            .fold(None, keep_first_best);
        if let Some((idx, _)) = best_substring {
            return Match::hit(
                &catalog[idx],
                self.thresholds.substring_score,
                field,
                MatchTier::Substring,
            );
        }

        // ── 5. Fuzzy ────────────────────────────────────────────────────
        if let Some((idx, best)) = best_by(&lowered, |e| similarity::ratio(&needle, e)) {
            if best >= self.thresholds.fuzzy_min {
                return Match::hit(&catalog[idx], best, field, MatchTier::Fuzzy);
            }
        }

        Match::miss(field)
    }
}

/// Index and score of the highest-scoring entry; ties keep the earliest.
fn best_by(entries: &[String], score: impl Fn(&str) -> f64) -> Option<(usize, f64)> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, e)| (idx, score(e)))
        .fold(None, keep_first_best)
}

fn keep_first_best(best: Option<(usize, f64)>, next: (usize, f64)) -> Option<(usize, f64)> {
    match best {
        Some((_, score)) if score >= next.1 => best,
        _ => Some(next),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn resolver() -> EntityResolver {
        EntityResolver::new(MatchThresholds::default(), Arc::new(Lexicon::default()))
    }

    fn catalog(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_catalog_misses() {
        let m = resolver().resolve("anything", FieldKind::Artist, &[]);
        assert_eq!(m, Match::miss(FieldKind::Artist));
    }

    #[test]
    fn phonetic_alias_resolves_with_full_confidence() {
        let m = resolver().resolve(
            "you too",
            FieldKind::Artist,
            &catalog(&["U2", "You Too Young"]),
        );
        assert_eq!(m.value.as_deref(), Some("U2"));
        assert_relative_eq!(m.score, 1.0);
        assert_eq!(m.tier, MatchTier::Alias);
    }

    #[test]
    fn alias_tier_runs_before_exact_tier() {
        // "youtube" is also an exact catalog entry, but the alias wins.
        let m = resolver().resolve("YouTube", FieldKind::Artist, &catalog(&["YouTube", "U2"]));
        assert_eq!(m.value.as_deref(), Some("U2"));
        assert_eq!(m.tier, MatchTier::Alias);
    }

    #[test]
    fn alias_is_skipped_when_target_is_not_in_catalog() {
        let m = resolver().resolve("you too", FieldKind::Artist, &catalog(&["You Too Young"]));
        assert_eq!(m.value.as_deref(), Some("You Too Young"));
        assert_eq!(m.tier, MatchTier::Substring);
    }

    #[test]
    fn exact_match_is_case_insensitive_after_normalization() {
        let m = resolver().resolve(
            "the symphony number six",
            FieldKind::Album,
            &catalog(&["Symphony No. 6", "Symphony No. 9"]),
        );
        assert_eq!(m.value.as_deref(), Some("Symphony No. 6"));
        assert_relative_eq!(m.score, 1.0);
        assert_eq!(m.tier, MatchTier::Exact);
    }

    #[test]
    fn spoken_number_alone_resolves_through_substring_tier() {
        let m = resolver().resolve(
            "number six",
            FieldKind::Album,
            &catalog(&["Symphony No. 6", "Symphony No. 9"]),
        );
        assert_eq!(m.value.as_deref(), Some("Symphony No. 6"));
        assert_relative_eq!(m.score, 0.9);
    }

    #[test]
    fn short_terms_match_individual_words() {
        // "abba" vs the word "abbas" clears the word threshold before substring runs.
        let m = resolver().resolve(
            "abba",
            FieldKind::Artist,
            &catalog(&["Kate Bush", "Abbas Quartet"]),
        );
        assert_eq!(m.value.as_deref(), Some("Abbas Quartet"));
        assert_relative_eq!(m.score, 0.95);
        assert_eq!(m.tier, MatchTier::ShortWord);
    }

    #[test]
    fn short_term_below_word_threshold_falls_through() {
        let m = resolver().resolve("xyz", FieldKind::Artist, &catalog(&["Kate Bush"]));
        assert!(!m.is_hit());
    }

    #[test]
    fn substring_tier_prefers_the_closest_container() {
        let m = resolver().resolve(
            "planets",
            FieldKind::Album,
            &catalog(&["Holst: The Planets, Op. 32 (Remastered Deluxe)", "The Planets"]),
        );
        assert_eq!(m.value.as_deref(), Some("The Planets"));
        assert_relative_eq!(m.score, 0.9);
    }

    #[test]
    fn fuzzy_tier_accepts_close_misspellings() {
        let m = resolver().resolve(
            "rachmaninov",
            FieldKind::Composer,
            &catalog(&["Sergei Rachmaninoff", "Rachmaninoff", "Ravel"]),
        );
        assert_eq!(m.value.as_deref(), Some("Rachmaninoff"));
        assert_eq!(m.tier, MatchTier::Fuzzy);
        assert!(m.score >= 0.6 && m.score < 1.0);
    }

    #[test]
    fn fuzzy_tier_rejects_distant_terms() {
        let m = resolver().resolve(
            "completely unrelated words",
            FieldKind::Artist,
            &catalog(&["Kate Bush", "Ravel"]),
        );
        assert_eq!(m, Match::miss(FieldKind::Artist));
    }

    #[test]
    fn fuzzy_tier_ignores_shared_suffix_with_scattered_letters() {
        // Only " london" and "at" line up: 18 / 34 stays under the fuzzy minimum.
        let m = resolver().resolve(
            "at mozart london",
            FieldKind::Artist,
            &catalog(&["The Beatles London"]),
        );
        assert_eq!(m, Match::miss(FieldKind::Artist));
    }

    #[test]
    fn thresholds_round_trip_through_camel_case_json() {
        let json = serde_json::json!({ "fuzzyMin": 0.7, "disambiguationLimit": 5 });
        let thresholds: MatchThresholds =
            serde_json::from_value(json).expect("deserialize thresholds");
        assert_relative_eq!(thresholds.fuzzy_min, 0.7);
        assert_eq!(thresholds.disambiguation_limit, 5);
        assert_relative_eq!(thresholds.short_word_score, 0.95);
    }
}
