//! `InMemoryLibrary`: a library held entirely in memory.
//!
//! Backs offline mode (a JSON track list instead of a media server) and the
//! integration tests. Entities without a `Key` are assigned their 1-based
//! position.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{EncoreError, Result};
use crate::library::{CatalogSource, LibraryEntity, LibrarySearch, SearchQuery, FIELD_KEY};
use crate::matching::FieldKind;

#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    entities: Vec<LibraryEntity>,
}

impl InMemoryLibrary {
    pub fn new(entities: Vec<LibraryEntity>) -> Self {
        let entities = entities
            .into_iter()
            .enumerate()
            .map(|(idx, mut entity)| {
                if entity.key().is_none() {
                    entity.set(FIELD_KEY, (idx + 1).to_string());
                }
                entity
            })
            .collect();
        Self { entities }
    }

    /// Load a JSON array of flat field objects.
    ///
    /// # Errors
    /// IO failures, or `EncoreError::Parse` when the file is not such an array.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entities: Vec<LibraryEntity> =
            serde_json::from_str(&raw).map_err(|e| EncoreError::Parse(e.to_string()))?;
        debug!(path = %path.display(), count = entities.len(), "loaded library file");
        Ok(Self::new(entities))
    }

    pub fn entities(&self) -> &[LibraryEntity] {
        &self.entities
    }

    pub fn by_key(&self, key: &str) -> Option<&LibraryEntity> {
        self.entities.iter().find(|e| e.key() == Some(key))
    }
}

impl CatalogSource for InMemoryLibrary {
    fn fetch_values(&self, field: FieldKind) -> Result<Vec<String>> {
        let mut seen: HashSet<&str> = HashSet::new();
        Ok(self
            .entities
            .iter()
            .filter_map(|e| e.field(field))
            .filter(|value| seen.insert(*value))
            .map(str::to_string)
            .collect())
    }
}

impl LibrarySearch for InMemoryLibrary {
    fn search(&self, query: &SearchQuery) -> Result<Vec<LibraryEntity>> {
        let hits = match query {
            SearchQuery::Album(album) => self
                .entities
                .iter()
                .filter(|e| e.album().is_some_and(|a| a.eq_ignore_ascii_case(album)))
                .cloned()
                .collect(),
            SearchQuery::Text(text) => {
                let needle = text.to_lowercase();
                self.entities
                    .iter()
                    .filter(|e| {
                        ["Name", "Artist", "Composer", "Album"]
                            .iter()
                            .filter_map(|f| e.get(f))
                            .any(|v| v.to_lowercase().contains(&needle))
                    })
                    .cloned()
                    .collect()
            }
        };
        Ok(hits)
    }
}
