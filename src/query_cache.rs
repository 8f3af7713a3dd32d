use crate::types::{CacheStats, QuerySignature};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Default number of memoized query results.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// A bounded memo of query results of type `V` keyed by their `QuerySignature`.
///
/// Each kind of result (quantity totals, value totals, rankings) gets its own
/// cache, so a lookup always yields the type its caller computes.
///
/// The cache holds results computed from a specific state of the inventory,
/// so it must be cleared by every mutation. The inventory does this inside the
/// same critical section as the mutation itself, which means a reader can never
/// combine a stale memoized result with post-mutation state.
///
/// When full, the least-recently-used entry is evicted. Eviction never affects
/// correctness: a missing entry is simply recomputed on the next lookup.
///
/// ## Thread Safety
///
/// Like the indices, the cache has no lock of its own and is only reached
/// through the inventory's guarded state.
#[derive(Debug)]
pub struct QueryCache<V> {
    /// Memoized results, most recently used first
    entries: LruCache<QuerySignature, V>,
    /// Lookups answered from `entries`
    hits: u64,
    /// Lookups that ran the query
    misses: u64,
}

impl<V: Clone> QueryCache<V> {
    /// Creates an empty cache holding at most `capacity` results.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::QueryCache;
    /// use std::num::NonZeroUsize;
    ///
    /// let cache: QueryCache<u64> = QueryCache::new(NonZeroUsize::new(16).unwrap());
    /// assert_eq!(cache.capacity(), 16);
    /// ```
    pub fn new(capacity: NonZeroUsize) -> Self {
        QueryCache {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the memoized result for `signature`, running `compute` on a miss.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{QueryCache, QuerySignature};
    ///
    /// let mut cache: QueryCache<u64> = QueryCache::default();
    /// let first = cache.get_or_compute(QuerySignature::TopKByPrice(3), || 7);
    /// let second = cache.get_or_compute(QuerySignature::TopKByPrice(3), || 0);
    /// assert_eq!(first, 7);
    /// assert_eq!(first, second);
    /// assert_eq!(cache.stats().hits, 1);
    /// ```
    pub fn get_or_compute<F>(&mut self, signature: QuerySignature, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(result) = self.entries.get(&signature) {
            self.hits += 1;
            tracing::trace!(?signature, "query cache hit");
            return result.clone();
        }

        self.misses += 1;
        tracing::trace!(?signature, "query cache miss");

        let result = compute();
        self.entries.put(signature, result.clone());
        result
    }

    /// Drops every memoized result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of memoized results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum number of memoized results.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Returns the hit/miss counters and the current entry count.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
