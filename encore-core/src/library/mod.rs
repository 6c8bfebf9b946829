//! Media library abstraction.
//!
//! `CatalogSource` lists the distinct values of one metadata field;
//! `LibrarySearch` returns file-level entities. Both are implemented by the
//! media-server adapter in the application crate and by `InMemoryLibrary`
//! for offline use.

pub mod memory;

pub use memory::InMemoryLibrary;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::matching::FieldKind;

pub const FIELD_KEY: &str = "Key";
pub const FIELD_NAME: &str = "Name";
pub const FIELD_TRACK: &str = "Track #";
pub const FIELD_DISC: &str = "Disc #";

/// Lists catalog values for a field.
pub trait CatalogSource: Send + Sync {
    /// Fetch every value of `field`. Order is preserved by the cache.
    ///
    /// # Errors
    /// Transport or parse failures. The catalog cache treats any error as an
    /// empty catalog.
    fn fetch_values(&self, field: FieldKind) -> Result<Vec<String>>;
}

/// A library query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Free-text search across the library.
    Text(String),
    /// Every file whose album equals the given title.
    Album(String),
}

/// File-level library search.
pub trait LibrarySearch: Send + Sync {
    /// # Errors
    /// Transport or parse failures.
    fn search(&self, query: &SearchQuery) -> Result<Vec<LibraryEntity>>;
}

/// One library file, as a bag of named metadata fields. Any field may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryEntity {
    fields: BTreeMap<String, String>,
}

impl LibraryEntity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Trimmed, non-empty value of a named field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn field(&self, kind: FieldKind) -> Option<&str> {
        self.get(kind.as_str())
    }

    pub fn key(&self) -> Option<&str> {
        self.get(FIELD_KEY)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(FIELD_NAME)
    }

    pub fn album(&self) -> Option<&str> {
        self.field(FieldKind::Album)
    }

    /// Numeric track number, if present and parseable.
    pub fn track_number(&self) -> Option<u32> {
        self.get(FIELD_TRACK).and_then(|v| v.parse().ok())
    }

    pub fn disc_number(&self) -> Option<u32> {
        self.get(FIELD_DISC).and_then(|v| v.parse().ok())
    }

    /// Whether the artist or composer field contains `name` (case-insensitive).
    pub fn credits(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        [FieldKind::Artist, FieldKind::Composer]
            .into_iter()
            .filter_map(|kind| self.field(kind))
            .any(|v| v.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_blank_fields_read_as_none() {
        let entity = LibraryEntity::new()
            .with("Artist", "  ")
            .with(FIELD_TRACK, "n/a");
        assert_eq!(entity.field(FieldKind::Artist), None);
        assert_eq!(entity.album(), None);
        assert_eq!(entity.track_number(), None);
    }

    #[test]
    fn credits_checks_artist_and_composer() {
        let entity = LibraryEntity::new()
            .with("Artist", "London Symphony Orchestra")
            .with("Composer", "Gustav Holst");
        assert!(entity.credits("holst"));
        assert!(entity.credits("london symphony"));
        assert!(!entity.credits("elgar"));
    }

    #[test]
    fn entity_deserializes_from_flat_json_object() {
        let entity: LibraryEntity = serde_json::from_value(serde_json::json!({
            "Key": "42",
            "Album": "The Planets",
            "Track #": "3"
        }))
        .expect("deserialize entity");
        assert_eq!(entity.key(), Some("42"));
        assert_eq!(entity.track_number(), Some(3));
    }
}
