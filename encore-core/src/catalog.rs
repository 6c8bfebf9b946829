//! Per-field catalog memoization.
//!
//! Each field is fetched at most once per cache lifetime. A failed fetch is
//! cached as an empty catalog so a flaky server cannot turn every utterance
//! into a full catalog download.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::library::CatalogSource;
use crate::matching::FieldKind;

pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    /// Held across the fetch so concurrent callers never fetch twice.
    entries: Mutex<HashMap<FieldKind, Arc<[String]>>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Distinct, trimmed, non-empty values for `field`, fetching on first use.
    pub fn values(&self, field: FieldKind) -> Arc<[String]> {
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(&field) {
            return Arc::clone(cached);
        }

        let values: Arc<[String]> = match self.source.fetch_values(field) {
            Ok(raw) => clean_values(raw).into(),
            Err(e) => {
                warn!(field = %field, error = %e, "catalog fetch failed; treating as empty");
                Arc::from(Vec::new())
            }
        };
        info!(field = %field, count = values.len(), "catalog cached");
        entries.insert(field, Arc::clone(&values));
        values
    }

    /// Whether `field` has been fetched already.
    pub fn is_cached(&self, field: FieldKind) -> bool {
        self.entries.lock().contains_key(&field)
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("cached_fields", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

/// Trim, drop blanks and keep the first occurrence of each value.
fn clean_values(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for value in raw {
        let value = value.trim();
        if value.is_empty() || !seen.insert(value.to_string()) {
            continue;
        }
        out.push(value.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::{EncoreError, Result};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CatalogSource for CountingSource {
        fn fetch_values(&self, field: FieldKind) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EncoreError::Transport("connection refused".into()));
            }
            Ok(vec![
                format!(" {field} One "),
                String::new(),
                format!("{field} One"),
                format!("{field} Two"),
            ])
        }
    }

    fn cache(fail: bool) -> (CatalogCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: Arc::clone(&calls),
            fail,
        };
        (CatalogCache::new(Arc::new(source)), calls)
    }

    #[test]
    fn fetches_each_field_exactly_once() {
        let (cache, calls) = cache(false);
        for _ in 0..3 {
            cache.values(FieldKind::Artist);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.values(FieldKind::Album);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_cached(FieldKind::Album));
        assert!(!cache.is_cached(FieldKind::Composer));
    }

    #[test]
    fn values_are_trimmed_distinct_and_non_empty() {
        let (cache, _) = cache(false);
        let values = cache.values(FieldKind::Composer);
        assert_eq!(&*values, &["Composer One".to_string(), "Composer Two".to_string()]);
    }

    struct LargeSource;

    impl CatalogSource for LargeSource {
        fn fetch_values(&self, _field: FieldKind) -> Result<Vec<String>> {
            // 60,000 entries, every album listed twice.
            Ok((0..60_000).map(|i| format!("Album {}", i % 30_000)).collect())
        }
    }

    #[test]
    fn large_catalogs_dedup_in_first_seen_order() {
        let cache = CatalogCache::new(Arc::new(LargeSource));
        let values = cache.values(FieldKind::Album);
        assert_eq!(values.len(), 30_000);
        assert_eq!(values[0], "Album 0");
        assert_eq!(values[29_999], "Album 29999");
    }

    #[test]
    fn failed_fetch_is_cached_as_empty() {
        let (cache, calls) = cache(true);
        assert!(cache.values(FieldKind::Album).is_empty());
        assert!(cache.values(FieldKind::Album).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
