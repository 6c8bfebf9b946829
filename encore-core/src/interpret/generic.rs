//! Generic entity resolution: what does "play X" mean?
//!
//! ## Decision order
//!
//! ```text
//! 1. Named work ("symphony", "op.", "adagio", ...)
//!        → scan album titles, top 5 above 0.3
//! 2. Best of Artist / Composer / Album above 0.8
//!        → album wins unless a person scores within 0.15 of it
//! 3. "<performer> <album words>"
//!        → albums credited to the longest matching name prefix
//!        → otherwise any album containing both the words and part of the name
//! 4. Nothing fits
//!        → open-ended library search on the whole phrase
//! ```

use std::cmp::Reverse;

use tracing::{debug, warn};

use crate::catalog::CatalogCache;
use crate::library::{LibraryEntity, LibrarySearch, SearchQuery};
use crate::matching::{similarity, EntityResolver, FieldKind, Match, MatchThresholds};
use crate::session::{SelectionContext, SelectionKind};

/// Words that mark a request for a particular work rather than a person.
const SPECIFIC_WORK_KEYWORDS: &[&str] = &[
    "symphony", "concerto", "sonata", "quartet", "quintet", "no.", "op.", "movement", "adagio",
    "allegro", "andante",
];

/// Outcome of generic resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A catalog entry matched directly: play the album, or offer the
    /// artist's or composer's albums.
    Field { name: String, field: FieldKind },
    /// An album found by scanning titles.
    Album(String),
    /// Several albums fit; ask the user to pick one.
    Disambiguate {
        candidates: Vec<String>,
        context: SelectionContext,
        /// Matches found before truncating to `candidates`.
        total: usize,
    },
    /// Hand the phrase to the server's open-ended search.
    OpenSearch(String),
}

pub fn is_specific_work(phrase: &str) -> bool {
    SPECIFIC_WORK_KEYWORDS.iter().any(|k| phrase.contains(k))
}

/// Choose among the three field matches, applying the person tie-break.
///
/// The strictly highest score wins, ties going to Artist, then Composer. A
/// winning Album yields to the better person match when that person scores
/// above `person_tie_min` and within `person_tie_margin` of the album.
pub fn pick_field<'m>(
    artist: &'m Match,
    composer: &'m Match,
    album: &'m Match,
    thresholds: &MatchThresholds,
) -> Option<&'m Match> {
    let best = [artist, composer, album]
        .into_iter()
        .filter(|m| m.is_hit())
        .fold(None, |best: Option<&Match>, m| match best {
            Some(b) if b.score >= m.score => Some(b),
            _ => Some(m),
        })?;

    if best.score <= thresholds.field_accept {
        return None;
    }

    if best.field == FieldKind::Album {
        let person = artist.score.max(composer.score);
        if person > thresholds.person_tie_min && best.score - person < thresholds.person_tie_margin {
            let preferred = if composer.score >= artist.score {
                composer
            } else {
                artist
            };
            debug!(
                album = best.score,
                person = preferred.score,
                field = %preferred.field,
                "album yields to close person match"
            );
            return Some(preferred);
        }
    }
    Some(best)
}

pub struct GenericResolver<'a> {
    resolver: &'a EntityResolver,
    catalogs: &'a CatalogCache,
    library: &'a dyn LibrarySearch,
}

impl<'a> GenericResolver<'a> {
    pub fn new(
        resolver: &'a EntityResolver,
        catalogs: &'a CatalogCache,
        library: &'a dyn LibrarySearch,
    ) -> Self {
        Self {
            resolver,
            catalogs,
            library,
        }
    }

    fn thresholds(&self) -> &MatchThresholds {
        self.resolver.thresholds()
    }

    /// Decide what a normalized free-form phrase refers to.
    pub fn resolve(&self, phrase: &str) -> Resolution {
        let phrase = phrase.trim().to_lowercase();

        if is_specific_work(&phrase) {
            return self.specific_work(&phrase);
        }

        let artist = self
            .resolver
            .resolve_cached(&phrase, FieldKind::Artist, self.catalogs);
        let composer = self
            .resolver
            .resolve_cached(&phrase, FieldKind::Composer, self.catalogs);
        let album = self
            .resolver
            .resolve_cached(&phrase, FieldKind::Album, self.catalogs);
        debug!(
            phrase = %phrase,
            artist = artist.score,
            composer = composer.score,
            album = album.score,
            "field scores"
        );

        if let Some(chosen) = pick_field(&artist, &composer, &album, self.thresholds()) {
            if let Some(name) = chosen.value.clone() {
                return Resolution::Field {
                    name,
                    field: chosen.field,
                };
            }
        }

        if let Some(resolution) = self.combined_phrase(&phrase) {
            return resolution;
        }

        Resolution::OpenSearch(phrase)
    }

    /// Sorted, distinct albums credited to `name` in `field`, or whose title
    /// mentions `name`.
    pub fn performer_albums(&self, name: &str, field: FieldKind) -> Vec<String> {
        let needle = name.to_lowercase();
        let mut albums: Vec<String> = self
            .search(&SearchQuery::Text(name.to_string()))
            .iter()
            .filter_map(|entity| {
                let album = entity.album()?;
                let credited = entity
                    .field(field)
                    .is_some_and(|v| v.to_lowercase().contains(&needle));
                (credited || album.to_lowercase().contains(&needle)).then(|| album.to_string())
            })
            .collect();
        albums.sort();
        albums.dedup();
        albums
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn specific_work(&self, phrase: &str) -> Resolution {
        let t = self.thresholds();
        let words: Vec<&str> = phrase
            .split_whitespace()
            .filter(|w| w.chars().count() > t.specific_work_word_min_chars)
            .collect();

        let mut scored: Vec<(String, f64)> = self
            .catalogs
            .values(FieldKind::Album)
            .iter()
            .filter_map(|album| {
                let lower = album.to_lowercase();
                if !words.iter().any(|w| lower.contains(w)) {
                    return None;
                }
                let score = similarity::ratio(phrase, &lower);
                (score > t.specific_work_min).then(|| (album.clone(), score))
            })
            .collect();
        sort_by_score(&mut scored);
        scored.truncate(t.specific_work_limit);
        debug!(phrase, candidates = scored.len(), "specific work scan");

        self.offer(
            scored,
            SelectionContext {
                anchor: phrase.to_string(),
                kind: SelectionKind::SpecificWork,
            },
        )
        .unwrap_or_else(|| Resolution::OpenSearch(phrase.to_string()))
    }

    fn combined_phrase(&self, phrase: &str) -> Option<Resolution> {
        let t = self.thresholds();
        let mut names: Vec<String> = Vec::new();
        for field in [FieldKind::Artist, FieldKind::Composer] {
            for name in self.catalogs.values(field).iter() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names.sort_by_key(|n| Reverse(n.chars().count()));

        let mut first_prefix: Option<(String, String)> = None;
        for name in &names {
            let Some(remaining) = strip_name_prefix(phrase, name) else {
                continue;
            };
            first_prefix.get_or_insert_with(|| (name.clone(), remaining.to_string()));

            let albums = self.albums_credited_to(name);
            if albums.is_empty() {
                continue;
            }
            let candidates = score_titles(remaining, &albums, t.substring_score, t.combined_min);
            debug!(name = %name, remaining, candidates = candidates.len(), "combined phrase");
            let context = SelectionContext {
                anchor: name.clone(),
                kind: SelectionKind::Field(FieldKind::Album),
            };
            if let Some(resolution) = self.offer(candidates, context) {
                return Some(resolution);
            }
        }

        // The name may only be credited on the album title itself.
        let (name, remaining) = first_prefix?;
        let parts: Vec<String> = name
            .to_lowercase()
            .split_whitespace()
            .filter(|p| p.chars().count() > t.combined_name_part_min_chars)
            .map(str::to_string)
            .collect();
        let albums: Vec<String> = self
            .catalogs
            .values(FieldKind::Album)
            .iter()
            .filter(|album| {
                let lower = album.to_lowercase();
                lower.contains(&remaining) && parts.iter().any(|p| lower.contains(p.as_str()))
            })
            .cloned()
            .collect();
        let candidates = score_titles(
            &remaining,
            &albums,
            t.substring_score,
            t.combined_fallback_min,
        );
        debug!(name = %name, remaining = %remaining, candidates = candidates.len(), "combined phrase fallback");
        self.offer(
            candidates,
            SelectionContext {
                anchor: name,
                kind: SelectionKind::Field(FieldKind::Album),
            },
        )
    }

    /// Distinct albums of entities whose artist or composer contains `name`.
    fn albums_credited_to(&self, name: &str) -> Vec<String> {
        let mut albums: Vec<String> = Vec::new();
        for entity in self.search(&SearchQuery::Text(name.to_string())) {
            if !entity.credits(name) {
                continue;
            }
            if let Some(album) = entity.album() {
                if !albums.iter().any(|a| a == album) {
                    albums.push(album.to_string());
                }
            }
        }
        albums
    }

    fn search(&self, query: &SearchQuery) -> Vec<LibraryEntity> {
        match self.library.search(query) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query = ?query, error = %e, "library search failed; treating as no results");
                Vec::new()
            }
        }
    }

    fn offer(&self, scored: Vec<(String, f64)>, context: SelectionContext) -> Option<Resolution> {
        match scored.len() {
            0 => None,
            1 => scored.into_iter().next().map(|(album, _)| Resolution::Album(album)),
            total => Some(Resolution::Disambiguate {
                candidates: scored
                    .into_iter()
                    .take(self.thresholds().disambiguation_limit)
                    .map(|(album, _)| album)
                    .collect(),
                context,
                total,
            }),
        }
    }
}

/// Remainder of `phrase` after a leading `name`, if both are non-empty.
fn strip_name_prefix<'p>(phrase: &'p str, name: &str) -> Option<&'p str> {
    let lower = name.to_lowercase();
    let rest = phrase.strip_prefix(lower.as_str())?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Score titles against the spoken remainder, keeping those above `min`.
fn score_titles(
    remaining: &str,
    titles: &[String],
    substring_score: f64,
    min: f64,
) -> Vec<(String, f64)> {
    let mut scored: Vec<(String, f64)> = titles
        .iter()
        .filter_map(|title| {
            let lower = title.to_lowercase();
            let score = if lower.contains(remaining) {
                substring_score
            } else {
                similarity::ratio(remaining, &lower)
            };
            (score > min).then(|| (title.clone(), score))
        })
        .collect();
    sort_by_score(&mut scored);
    scored
}

/// Highest score first; equal scores keep catalog order.
fn sort_by_score(scored: &mut [(String, f64)]) {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
}
