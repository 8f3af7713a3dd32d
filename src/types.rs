use crate::error::{InventoryError, InventoryResult};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque, string-keyed attributes attached to a record.
///
/// The store never inspects metadata; it is carried along with the record and
/// replaced together with it on every upsert.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Represents a single record held by the inventory.
///
/// Records are immutable once stored: an update replaces the whole record
/// rather than mutating any of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The unit price of the item (using fixed-point arithmetic)
    pub price: Decimal,
    /// The number of units in stock
    pub quantity: u64,
    /// Free-form attributes, empty when none were supplied
    pub metadata: Metadata,
}

impl Record {
    /// Creates a new record, normalizing absent metadata to an empty map.
    ///
    /// ## Examples
    ///
    /// ```
    /// use inventory_index::{Decimal, Record};
    ///
    /// let record = Record::new(Decimal::new(125, 2), 100, None);
    /// assert!(record.metadata.is_empty());
    /// ```
    pub fn new(price: Decimal, quantity: u64, metadata: Option<Metadata>) -> Self {
        Self {
            price,
            quantity,
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Validates raw caller input and builds a record from it.
    ///
    /// Fails with `InvalidRecord` when the price or the quantity is negative.
    pub fn validated(
        price: Decimal,
        quantity: i64,
        metadata: Option<Metadata>,
    ) -> InventoryResult<Self> {
        if price < Decimal::ZERO {
            return Err(InventoryError::InvalidRecord {
                reason: format!("price must be non-negative, got {price}"),
            });
        }
        let quantity = u64::try_from(quantity).map_err(|_| InventoryError::InvalidRecord {
            reason: format!("quantity must be non-negative, got {quantity}"),
        })?;

        Ok(Self::new(price, quantity, metadata))
    }

    /// Total value of the stock held under this record (`price * quantity`).
    ///
    /// Saturates at `Decimal::MAX` when the product is not representable.
    pub fn value(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// A ranked query result: identifiers paired with the record they resolved to.
pub type RankedRecords = Vec<(String, Arc<Record>)>;

/// Identifies a memoized query by its kind and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySignature {
    /// Sum of quantities over a closed price interval
    RangeQuantity { low: Decimal, high: Decimal },
    /// Sum of `price * quantity` over a closed price interval
    RangeValue { low: Decimal, high: Decimal },
    /// The `k` most expensive records
    TopKByPrice(usize),
    /// The `k` most stocked records
    TopKByQuantity(usize),
}

/// Hit and miss counters of the query cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a memoized result
    pub hits: u64,
    /// Lookups that had to run the query
    pub misses: u64,
    /// Entries currently memoized
    pub entries: usize,
}

impl std::ops::Add for CacheStats {
    type Output = CacheStats;

    fn add(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            entries: self.entries + other.entries,
        }
    }
}
