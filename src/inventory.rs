use crate::config::{ConfigError, InventoryConfig};
use crate::error::{InventoryError, InventoryResult};
use crate::query_cache::QueryCache;
use crate::sorted_index::SortedIndex;
use crate::types::{CacheStats, Metadata, QuerySignature, RankedRecords, Record};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Everything guarded by the inventory lock.
///
/// The record map, both indices and the cache change together or not at all,
/// so they share one lock. Multi-step mutations are methods on `&mut self`:
/// once the guard is taken, every sub-step runs without releasing it.
#[derive(Debug)]
struct InventoryState {
    /// Canonical records, ordered by identifier
    records: BTreeMap<String, Arc<Record>>,
    /// `(price, id)` entries for every record
    price_index: SortedIndex<Decimal>,
    /// `(quantity, id)` entries for every record
    quantity_index: SortedIndex<u64>,
    /// Memoized query results, valid for the current state only
    caches: QueryCaches,
}

/// One cache per kind of query result.
#[derive(Debug)]
struct QueryCaches {
    quantity_totals: QueryCache<u64>,
    value_totals: QueryCache<Decimal>,
    rankings: QueryCache<Arc<RankedRecords>>,
}

impl QueryCaches {
    fn new(capacity: NonZeroUsize) -> Self {
        QueryCaches {
            quantity_totals: QueryCache::new(capacity),
            value_totals: QueryCache::new(capacity),
            rankings: QueryCache::new(capacity),
        }
    }

    fn clear(&mut self) {
        self.quantity_totals.clear();
        self.value_totals.clear();
        self.rankings.clear();
    }

    fn stats(&self) -> CacheStats {
        self.quantity_totals.stats() + self.value_totals.stats() + self.rankings.stats()
    }
}

impl Default for QueryCaches {
    fn default() -> Self {
        QueryCaches {
            quantity_totals: QueryCache::default(),
            value_totals: QueryCache::default(),
            rankings: QueryCache::default(),
        }
    }
}

impl InventoryState {
    fn new(caches: QueryCaches) -> Self {
        InventoryState {
            records: BTreeMap::new(),
            price_index: SortedIndex::new(),
            quantity_index: SortedIndex::new(),
            caches,
        }
    }

    fn index_record(&mut self, id: &str, record: &Record) {
        self.price_index.insert(record.price, id);
        self.quantity_index.insert(record.quantity, id);
    }

    fn unindex_record(&mut self, id: &str, record: &Record) {
        self.price_index.remove(&record.price, id);
        self.quantity_index.remove(&record.quantity, id);
    }

    /// Replaces (or creates) the record for `id`, keeping the indices in lockstep.
    fn put(&mut self, id: &str, record: Record) {
        // The stale entries must go before the new ones are added
        if let Some(previous) = self.records.get(id).cloned() {
            self.unindex_record(id, &previous);
        }

        self.index_record(id, &record);
        self.records.insert(id.to_owned(), Arc::new(record));
        self.caches.clear();
    }

    fn take(&mut self, id: &str) -> InventoryResult<Arc<Record>> {
        let record = self
            .records
            .remove(id)
            .ok_or_else(|| InventoryError::RecordNotFound(id.to_owned()))?;

        self.unindex_record(id, &record);
        self.caches.clear();
        Ok(record)
    }

    fn resolve(&self, id: &str) -> Option<Arc<Record>> {
        self.records.get(id).cloned()
    }
}

/// Pairs ranked index entries with the records they point to.
fn resolve_ranked<K>(
    records: &BTreeMap<String, Arc<Record>>,
    entries: Vec<(&K, &str)>,
) -> RankedRecords {
    entries
        .into_iter()
        .filter_map(|(_, id)| {
            records
                .get(id)
                .map(|record| (id.to_owned(), Arc::clone(record)))
        })
        .collect()
}

/// A thread-safe inventory with sorted secondary indices and a query cache.
///
/// This structure is responsible for:
///
/// - Storing records keyed by identifier
/// - Maintaining a price index and a quantity index that always agree with the records
/// - Answering range aggregations over prices and top-k rankings
/// - Memoizing query results and invalidating them on every mutation
///
/// ### Thread Safety
///
/// All state sits behind a single `Mutex`, and every public operation holds it
/// for its whole duration. Operations are therefore linearizable: a reader
/// never observes a record whose price changed while its index entry still
/// carries the old price. The service is `Send + Sync` and is meant to be
/// shared through an `Arc`.
#[derive(Debug)]
pub struct InventoryService {
    state: Mutex<InventoryState>,
}

impl InventoryService {
    /// Creates a new empty inventory with the default configuration.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::InventoryService;
    ///
    /// let inventory = InventoryService::new();
    /// assert!(inventory.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_caches(QueryCaches::default())
    }

    /// Creates a new empty inventory from a configuration.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{InventoryConfig, InventoryService};
    ///
    /// let config = InventoryConfig { cache_capacity: 16 };
    /// let inventory = InventoryService::with_config(&config).unwrap();
    /// assert_eq!(inventory.cache_stats().entries, 0);
    /// ```
    pub fn with_config(config: &InventoryConfig) -> Result<Self, ConfigError> {
        let capacity = config.cache_capacity_non_zero()?;
        tracing::info!(cache_capacity = capacity.get(), "inventory created");
        Ok(Self::with_caches(QueryCaches::new(capacity)))
    }

    fn with_caches(caches: QueryCaches) -> Self {
        InventoryService {
            state: Mutex::new(InventoryState::new(caches)),
        }
    }

    /// Inserts a new record or fully replaces an existing one.
    ///
    /// The old index entries of an existing identifier are removed before the
    /// new ones are inserted, and the query cache is cleared, all under the
    /// same lock. If validation fails nothing changes.
    ///
    /// ## Arguments
    ///
    /// * `id`: The unique, non-empty identifier
    /// * `price`: The unit price, must be non-negative
    /// * `quantity`: The number of units, must be non-negative
    /// * `metadata`: Optional attributes, stored as an empty map when `None`
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{Decimal, InventoryError, InventoryService};
    ///
    /// let inventory = InventoryService::new();
    /// inventory.upsert_item("apple", Decimal::new(125, 2), 100, None).unwrap();
    ///
    /// let err = inventory.upsert_item("bad", Decimal::from(-1), 5, None).unwrap_err();
    /// assert!(matches!(err, InventoryError::InvalidRecord { .. }));
    /// assert_eq!(inventory.len(), 1);
    /// ```
    pub fn upsert_item(
        &self,
        id: &str,
        price: Decimal,
        quantity: i64,
        metadata: Option<Metadata>,
    ) -> InventoryResult<()> {
        if id.is_empty() {
            return Err(InventoryError::InvalidRecord {
                reason: "identifier must not be empty".to_string(),
            });
        }
        let record = Record::validated(price, quantity, metadata)?;

        tracing::debug!(item_id = id, %price, quantity, "upserting item");
        self.state.lock().put(id, record);
        Ok(())
    }

    /// Removes a record and its index entries.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{Decimal, InventoryError, InventoryService};
    ///
    /// let inventory = InventoryService::new();
    /// inventory.upsert_item("apple", Decimal::ONE, 1, None).unwrap();
    /// inventory.remove_item("apple").unwrap();
    ///
    /// let err = inventory.remove_item("apple").unwrap_err();
    /// assert_eq!(err, InventoryError::RecordNotFound("apple".to_string()));
    /// ```
    pub fn remove_item(&self, id: &str) -> InventoryResult<()> {
        self.state.lock().take(id)?;
        tracing::debug!(item_id = id, "removed item");
        Ok(())
    }

    /// Returns the current record stored under `id`.
    ///
    /// The returned handle is immutable: later upserts store a new record
    /// instead of modifying this one.
    pub fn get_item(&self, id: &str) -> InventoryResult<Arc<Record>> {
        self.state
            .lock()
            .resolve(id)
            .ok_or_else(|| InventoryError::RecordNotFound(id.to_owned()))
    }

    /// Returns whether a record is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().records.contains_key(id)
    }

    /// Sums the quantities of all records priced within `[low, high]`.
    ///
    /// The total saturates at `u64::MAX`.
    ///
    /// The operation is $O(\log{N} + K)$ where $K$ is the number of matching
    /// records, or a cache lookup if the same interval was asked since the last
    /// mutation.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{Decimal, InventoryService};
    ///
    /// let inventory = InventoryService::new();
    /// inventory.upsert_item("A", Decimal::from(10), 5, None).unwrap();
    /// inventory.upsert_item("B", Decimal::from(20), 2, None).unwrap();
    ///
    /// assert_eq!(inventory.range_query_quantity(Decimal::from(10), Decimal::from(15)), 5);
    /// ```
    pub fn range_query_quantity(&self, low: Decimal, high: Decimal) -> u64 {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let (records, price_index) = (&state.records, &state.price_index);

        state
            .caches
            .quantity_totals
            .get_or_compute(QuerySignature::RangeQuantity { low, high }, || {
                price_index
                    .range(&low, &high)
                    .filter_map(|(_, id)| records.get(id))
                    .fold(0_u64, |total, record| total.saturating_add(record.quantity))
            })
    }

    /// Sums `price * quantity` over all records priced within `[low, high]`.
    ///
    /// Products and the total saturate at `Decimal::MAX`.
    pub fn range_query_value(&self, low: Decimal, high: Decimal) -> Decimal {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let (records, price_index) = (&state.records, &state.price_index);

        state
            .caches
            .value_totals
            .get_or_compute(QuerySignature::RangeValue { low, high }, || {
                price_index
                    .range(&low, &high)
                    .filter_map(|(_, id)| records.get(id))
                    .fold(Decimal::ZERO, |total, record| total.saturating_add(record.value()))
            })
    }

    /// Returns the `k` most expensive records, most expensive first.
    ///
    /// Records sharing a price are ordered by descending identifier.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{Decimal, InventoryService};
    ///
    /// let inventory = InventoryService::new();
    /// inventory.upsert_item("A", Decimal::from(10), 5, None).unwrap();
    /// inventory.upsert_item("B", Decimal::from(20), 2, None).unwrap();
    /// inventory.upsert_item("C", Decimal::from(15), 0, None).unwrap();
    ///
    /// let top: Vec<_> = inventory.top_k_by_price(2).iter().map(|(id, _)| id.clone()).collect();
    /// assert_eq!(top, vec!["B", "C"]);
    /// ```
    pub fn top_k_by_price(&self, k: usize) -> Arc<RankedRecords> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let (records, price_index) = (&state.records, &state.price_index);

        state
            .caches
            .rankings
            .get_or_compute(QuerySignature::TopKByPrice(k), || {
                Arc::new(resolve_ranked(records, price_index.top_k(k)))
            })
    }

    /// Returns the `k` most stocked records, largest quantity first.
    ///
    /// Records sharing a quantity are ordered by descending identifier.
    pub fn top_k_by_quantity(&self, k: usize) -> Arc<RankedRecords> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let (records, quantity_index) = (&state.records, &state.quantity_index);

        state
            .caches
            .rankings
            .get_or_compute(QuerySignature::TopKByQuantity(k), || {
                Arc::new(resolve_ranked(records, quantity_index.top_k(k)))
            })
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Returns whether the inventory is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Returns a point-in-time copy of all records, ordered by identifier.
    ///
    /// The copy is detached from the inventory: holding it does not hold the
    /// lock, so the caller may keep calling into the service while iterating.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{Decimal, InventoryService};
    ///
    /// let inventory = InventoryService::new();
    /// inventory.upsert_item("A", Decimal::ONE, 1, None).unwrap();
    /// inventory.upsert_item("B", Decimal::TWO, 2, None).unwrap();
    ///
    /// for (id, _) in inventory.snapshot() {
    ///     inventory.remove_item(&id).unwrap();
    /// }
    /// assert!(inventory.is_empty());
    /// ```
    pub fn snapshot(&self) -> RankedRecords {
        self.state
            .lock()
            .records
            .iter()
            .map(|(id, record)| (id.clone(), Arc::clone(record)))
            .collect()
    }

    /// Removes every record and memoized result.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let records = state.records.len();
        state.records.clear();
        state.price_index.clear();
        state.quantity_index.clear();
        state.caches.clear();
        tracing::debug!(records, "cleared inventory");
    }

    /// Returns the query cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.state.lock().caches.stats()
    }

    /// Checks that both indices hold exactly one entry per record, carrying
    /// the record's current price and quantity.
    ///
    /// This walks the whole inventory and is meant for tests and diagnostics.
    pub fn indices_consistent(&self) -> bool {
        let state = self.state.lock();
        let records_count = state.records.len();

        state.price_index.len() == records_count
            && state.quantity_index.len() == records_count
            && state.records.iter().all(|(id, record)| {
                state.price_index.contains(&record.price, id)
                    && state.quantity_index.contains(&record.quantity, id)
            })
    }
}

impl Default for InventoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for &InventoryService {
    type Item = (String, Arc<Record>);
    type IntoIter = std::vec::IntoIter<(String, Arc<Record>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshot().into_iter()
    }
}
