//! A thread-safe, in-memory inventory with sorted secondary indices,
//! range aggregation, top-k ranking and a query cache that stays coherent
//! under concurrent mutation.
//!
//! ## Architecture
//!
//! The `InventoryService` composes four pieces behind a single lock:
//!
//! 1. A record map from identifier to `Record` (price, quantity, metadata)
//! 2. A `SortedIndex` by price and a `SortedIndex` by quantity
//! 3. A bounded `QueryCache` memoizing range and top-k results
//! 4. A `Mutex` guarding all of the above as one unit
//!
//! Every mutation updates the record map and both indices and clears the cache
//! before the lock is released, so readers observe either the whole mutation or
//! none of it.
//!
//! ## Example Usage
//!
//! ```rust
//! use inventory_index::{Decimal, InventoryService};
//! use std::sync::Arc;
//!
//! let inventory = Arc::new(InventoryService::new());
//!
//! // 1. Insert a few items
//! inventory.upsert_item("apple", Decimal::new(125, 2), 100, None).unwrap();
//! inventory.upsert_item("banana", Decimal::new(75, 2), 150, None).unwrap();
//! inventory.upsert_item("carrot", Decimal::new(50, 2), 200, None).unwrap();
//!
//! // 2. Aggregate over a price interval (served from the cache when repeated)
//! let quantity = inventory.range_query_quantity(Decimal::new(60, 2), Decimal::new(150, 2));
//! assert_eq!(quantity, 250);
//!
//! // 3. Rank by quantity
//! let top = inventory.top_k_by_quantity(1);
//! assert_eq!(top[0].0, "carrot");
//!
//! // 4. Any mutation invalidates memoized results
//! inventory.remove_item("carrot").unwrap();
//! assert_eq!(inventory.top_k_by_quantity(1)[0].0, "banana");
//! ```
//!
//! On the performance side, upserts and removals are $O(\log{N})$ because both
//! indices are backed by `BTreeMap`s, range aggregations are $O(\log{N} + K)$
//! and repeated queries are answered from the cache until the next mutation.

mod config;
mod error;
mod inventory;
mod query_cache;
mod sorted_index;
mod types;

// Re-export public API
pub use config::{ConfigError, InventoryConfig};
pub use error::{InventoryError, InventoryResult};
pub use inventory::InventoryService;
pub use query_cache::{QueryCache, DEFAULT_CACHE_CAPACITY};
pub use sorted_index::SortedIndex;
pub use types::{CacheStats, Metadata, QuerySignature, RankedRecords, Record};

// Re-export commonly used external dependencies
pub use rust_decimal::Decimal;
