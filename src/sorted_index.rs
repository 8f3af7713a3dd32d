use std::collections::{BTreeMap, BTreeSet};

/// A secondary index over one numeric attribute of the stored records.
///
/// Entries are `(key, identifier)` pairs kept in total order: first by key,
/// then by identifier. Internally every distinct key owns a level holding the
/// identifiers that currently carry that key, so that:
///
/// - Insertion and removal are $O(\log{N})$ thanks to the `BTreeMap` levels
/// - A range scan is $O(\log{N} + K)$ where $K$ is the number of matches
/// - The top-k entries are read straight off the end of the map
///
/// ### Thread Safety
///
/// The index has no lock of its own. It lives inside the inventory's guarded
/// state and is only touched while that lock is held.
#[derive(Debug, Clone)]
pub struct SortedIndex<K> {
    /// Key levels: each key maps to the identifiers that currently have it
    levels: BTreeMap<K, BTreeSet<String>>,
    /// Total number of `(key, identifier)` entries across all levels
    entries_count: usize,
}

impl<K: Ord + Clone> SortedIndex<K> {
    /// Creates a new empty index.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::SortedIndex;
    ///
    /// let index: SortedIndex<u64> = SortedIndex::new();
    /// assert!(index.is_empty());
    /// ```
    pub fn new() -> Self {
        SortedIndex {
            levels: BTreeMap::new(),
            entries_count: 0,
        }
    }

    /// Inserts the `(key, id)` pair.
    ///
    /// ## Returns
    ///
    /// `true` if the pair was not present before
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::SortedIndex;
    ///
    /// let mut index = SortedIndex::new();
    /// assert!(index.insert(5_u64, "apple"));
    /// assert!(!index.insert(5_u64, "apple"));
    /// assert_eq!(index.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, id: &str) -> bool {
        let inserted = self.levels.entry(key).or_default().insert(id.to_owned());
        if inserted {
            self.entries_count += 1;
        }
        inserted
    }

    /// Removes the `(key, id)` pair.
    ///
    /// Removing a pair that is not present is a no-op. Levels left without
    /// identifiers are dropped so that the map only holds live keys.
    ///
    /// ## Returns
    ///
    /// `true` if the pair was present
    pub fn remove(&mut self, key: &K, id: &str) -> bool {
        let Some(level) = self.levels.get_mut(key) else {
            return false;
        };

        let removed = level.remove(id);
        if level.is_empty() {
            self.levels.remove(key);
        }
        if removed {
            self.entries_count -= 1;
        }
        removed
    }

    /// Returns whether the exact `(key, id)` pair is indexed.
    pub fn contains(&self, key: &K, id: &str) -> bool {
        self.levels
            .get(key)
            .map(|level| level.contains(id))
            .unwrap_or(false)
    }

    /// Returns every entry with `low <= key <= high`, in ascending order.
    ///
    /// An inverted interval (`low > high`) matches nothing.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::SortedIndex;
    ///
    /// let mut index = SortedIndex::new();
    /// index.insert(10_u64, "a");
    /// index.insert(20_u64, "b");
    /// index.insert(15_u64, "c");
    ///
    /// let matched: Vec<_> = index.range(&10, &15).map(|(_, id)| id).collect();
    /// assert_eq!(matched, vec!["a", "c"]);
    /// ```
    pub fn range<'a>(&'a self, low: &K, high: &K) -> impl Iterator<Item = (&'a K, &'a str)> + 'a {
        // `BTreeMap::range` panics on inverted bounds
        let levels = if low <= high {
            Some(self.levels.range(low.clone()..=high.clone()))
        } else {
            None
        };

        levels
            .into_iter()
            .flatten()
            .flat_map(|(key, level)| level.iter().map(move |id| (key, id.as_str())))
    }

    /// Returns the `k` entries with the largest keys, in descending order.
    ///
    /// Identifiers sharing a key come out in descending order, which is the
    /// ascending entry order read backwards. Asking for more entries than the
    /// index holds returns all of them, and `k == 0` returns nothing.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::SortedIndex;
    ///
    /// let mut index = SortedIndex::new();
    /// index.insert(5_u64, "a");
    /// index.insert(2_u64, "b");
    /// index.insert(5_u64, "c");
    ///
    /// let top: Vec<_> = index.top_k(2).into_iter().map(|(_, id)| id).collect();
    /// assert_eq!(top, vec!["c", "a"]);
    /// ```
    pub fn top_k(&self, k: usize) -> Vec<(&K, &str)> {
        self.levels
            .iter()
            .rev()
            .flat_map(|(key, level)| level.iter().rev().map(move |id| (key, id.as_str())))
            .take(k)
            .collect()
    }

    /// Iterates over all entries in ascending `(key, id)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &str)> {
        self.levels
            .iter()
            .flat_map(|(key, level)| level.iter().map(move |id| (key, id.as_str())))
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.entries_count
    }

    /// Returns whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries_count == 0
    }

    /// Returns the number of distinct keys.
    pub fn key_levels_count(&self) -> usize {
        self.levels.len()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.entries_count = 0;
    }
}

impl<K: Ord + Clone> Default for SortedIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> SortedIndex<u64> {
        let mut index = SortedIndex::new();
        for (key, id) in [(10, "a"), (20, "b"), (15, "c"), (15, "d")] {
            index.insert(key, id);
        }
        index
    }

    #[test]
    fn test_entries_are_ordered_by_key_then_id() {
        let index = sample_index();
        let entries: Vec<_> = index.iter().map(|(key, id)| (*key, id)).collect();
        assert_eq!(entries, vec![(10, "a"), (15, "c"), (15, "d"), (20, "b")]);
    }

    #[test]
    fn test_remove_missing_pair_is_noop() {
        let mut index = sample_index();
        assert!(!index.remove(&10, "b"), "Wrong key for `b` must not match");
        assert!(!index.remove(&99, "a"), "Unknown key must not match");
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_remove_drops_empty_levels() {
        let mut index = sample_index();
        assert!(index.remove(&10, "a"));
        assert_eq!(index.key_levels_count(), 2);
        assert!(index.remove(&15, "c"));
        assert_eq!(index.key_levels_count(), 2, "Level 15 still holds `d`");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let index = sample_index();
        let ids: Vec<_> = index.range(&15, &20).map(|(_, id)| id).collect();
        assert_eq!(ids, vec!["c", "d", "b"]);

        assert_eq!(index.range(&11, &14).count(), 0);
        assert_eq!(index.range(&20, &10).count(), 0, "Inverted bounds");
    }

    #[test]
    fn test_top_k_edges() {
        let index = sample_index();
        assert!(index.top_k(0).is_empty());

        let all: Vec<_> = index.top_k(100).into_iter().map(|(_, id)| id).collect();
        assert_eq!(all, vec!["b", "d", "c", "a"]);
    }
}
