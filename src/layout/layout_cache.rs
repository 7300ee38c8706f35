use crate::layout::columns::{distribute, ColumnLayout};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Maximum number of cached layouts to keep in memory.
const MAX_CACHE_ENTRIES: usize = 8;

/// A column layout depends only on how many items are shown and how many
/// columns they are spread over, never on the items themselves.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct CacheKey {
    column_count: usize,
    shown: usize,
}

#[derive(Debug, Clone)]
struct CachedLayout {
    layout: Arc<ColumnLayout>,
    /// Timestamp of when this cache entry was last used (for LRU eviction)
    last_used: Instant,
}

/// Memoizes column layouts so that resizing back and forth across
/// breakpoints reuses earlier results instead of redistributing.
///
/// Entries are keyed by (column count, shown items) where shown is
/// `min(sequence length, visible count)`.
pub struct LayoutCache {
    cache: RwLock<HashMap<CacheKey, CachedLayout>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::with_capacity(MAX_CACHE_ENTRIES)),
        }
    }

    /// Returns the layout for the given inputs, computing and storing it on a
    /// miss.
    pub fn get_or_compute(
        &self,
        len: usize,
        column_count: usize,
        visible_count: Option<usize>,
    ) -> Arc<ColumnLayout> {
        let key = CacheKey {
            column_count: column_count.max(1),
            shown: visible_count.map_or(len, |visible| visible.min(len)),
        };

        {
            let mut cache = self.cache.write();
            if let Some(entry) = cache.get_mut(&key) {
                entry.last_used = Instant::now();
                return entry.layout.clone();
            }
        }

        let layout = Arc::new(distribute(key.shown, key.column_count, None));
        self.set(key, layout.clone());
        layout
    }

    fn set(&self, key: CacheKey, layout: Arc<ColumnLayout>) {
        let mut cache = self.cache.write();

        if cache.len() >= MAX_CACHE_ENTRIES && !cache.contains_key(&key) {
            Self::evict_oldest(&mut cache);
        }

        cache.insert(
            key,
            CachedLayout {
                layout,
                last_used: Instant::now(),
            },
        );
    }

    /// Clears the entire cache.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Returns the number of cached layouts.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    fn evict_oldest(cache: &mut HashMap<CacheKey, CachedLayout>) {
        let oldest_key = cache
            .iter()
            .min_by_key(|(_, v)| v.last_used)
            .map(|(k, _)| *k);

        if let Some(key) = oldest_key {
            cache.remove(&key);
        }
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}
