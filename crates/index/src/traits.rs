//! Index trait definitions for Velio database.
//!
//! This module defines the core `Index` trait that all index implementations must satisfy.

use alloc::vec::Vec;
use velio_core::RowId;

/// A key range for index queries.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyRange<K> {
    /// All keys
    All,
    /// A single key (equality)
    Only(K),
    /// Keys >= lower bound
    LowerBound { value: K, exclusive: bool },
    /// Keys <= upper bound
    UpperBound { value: K, exclusive: bool },
    /// Keys between lower and upper bounds
    Bound {
        lower: K,
        upper: K,
        lower_exclusive: bool,
        upper_exclusive: bool,
    },
}

impl<K: Clone + Ord> KeyRange<K> {
    /// Creates a range for all keys.
    pub fn all() -> Self {
        KeyRange::All
    }

    /// Creates a range for a single key.
    pub fn only(key: K) -> Self {
        KeyRange::Only(key)
    }

    /// Creates a range with a lower bound.
    pub fn lower_bound(value: K, exclusive: bool) -> Self {
        KeyRange::LowerBound { value, exclusive }
    }

    /// Creates a range with an upper bound.
    pub fn upper_bound(value: K, exclusive: bool) -> Self {
        KeyRange::UpperBound { value, exclusive }
    }

    /// Creates a range with both bounds.
    pub fn bound(lower: K, upper: K, lower_exclusive: bool, upper_exclusive: bool) -> Self {
        KeyRange::Bound {
            lower,
            upper,
            lower_exclusive,
            upper_exclusive,
        }
    }

    /// Returns true if this range represents a single value (equality).
    pub fn is_only(&self) -> bool {
        matches!(self, KeyRange::Only(_))
    }

    /// Returns true if this range represents all values (unbounded).
    pub fn is_all(&self) -> bool {
        matches!(self, KeyRange::All)
    }

    /// Checks if two ranges overlap.
    pub fn overlaps(&self, other: &KeyRange<K>) -> bool {
        // All overlaps with everything
        if self.is_all() || other.is_all() {
            return true;
        }

        match (self, other) {
            (KeyRange::Only(k1), KeyRange::Only(k2)) => k1 == k2,
            (KeyRange::Only(k), range) | (range, KeyRange::Only(k)) => range.contains(k),
            (KeyRange::LowerBound { .. }, KeyRange::LowerBound { .. }) => {
                // Two lower bounds always overlap (they extend to infinity)
                true
            }
            (KeyRange::UpperBound { .. }, KeyRange::UpperBound { .. }) => {
                // Two upper bounds always overlap (they extend to negative infinity)
                true
            }
            (
                KeyRange::LowerBound { value: lower, exclusive: lower_ex },
                KeyRange::UpperBound { value: upper, exclusive: upper_ex },
            )
            | (
                KeyRange::UpperBound { value: upper, exclusive: upper_ex },
                KeyRange::LowerBound { value: lower, exclusive: lower_ex },
            ) => {
                // Check if lower <= upper (with exclusivity)
                if *lower_ex || *upper_ex {
                    lower < upper
                } else {
                    lower <= upper
                }
            }
            (
                KeyRange::Bound { lower: l1, upper: u1, lower_exclusive: le1, upper_exclusive: ue1 },
                KeyRange::Bound { lower: l2, upper: u2, lower_exclusive: le2, upper_exclusive: ue2 },
            ) => {
                // Two bounded ranges overlap if neither is completely before the other
                // Range 1 is before Range 2 if u1 < l2 (or u1 <= l2 if either bound is exclusive)
                let first_before_second = if *ue1 || *le2 { u1 <= l2 } else { u1 < l2 };
                let second_before_first = if *ue2 || *le1 { u2 <= l1 } else { u2 < l1 };
                !first_before_second && !second_before_first
            }
            (
                KeyRange::Bound { upper, upper_exclusive, .. },
                KeyRange::LowerBound { value, exclusive },
            )
            | (
                KeyRange::LowerBound { value, exclusive },
                KeyRange::Bound { upper, upper_exclusive, .. },
            ) => {
                // Bound overlaps with lower bound if upper >= value
                if *upper_exclusive || *exclusive {
                    upper > value
                } else {
                    upper >= value
                }
            }
            (
                KeyRange::Bound { lower, lower_exclusive, .. },
                KeyRange::UpperBound { value, exclusive },
            )
            | (
                KeyRange::UpperBound { value, exclusive },
                KeyRange::Bound { lower, lower_exclusive, .. },
            ) => {
                // Bound overlaps with upper bound if lower <= value
                if *lower_exclusive || *exclusive {
                    lower < value
                } else {
                    lower <= value
                }
            }
            _ => true, // Default to true for All cases (already handled above)
        }
    }

    /// Swaps the bounds of this range, turning a lower bound into an upper
    /// bound and vice versa. `All` and `Only` are their own reverse.
    pub fn reverse(&self) -> Self {
        match self {
            KeyRange::All => KeyRange::All,
            KeyRange::Only(k) => KeyRange::Only(k.clone()),
            KeyRange::LowerBound { value, exclusive } => KeyRange::UpperBound {
                value: value.clone(),
                exclusive: *exclusive,
            },
            KeyRange::UpperBound { value, exclusive } => KeyRange::LowerBound {
                value: value.clone(),
                exclusive: *exclusive,
            },
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => KeyRange::Bound {
                lower: upper.clone(),
                upper: lower.clone(),
                lower_exclusive: *upper_exclusive,
                upper_exclusive: *lower_exclusive,
            },
        }
    }

    /// Returns the complement of this range as zero, one, or two disjoint
    /// ranges covering every key not in `self`.
    ///
    /// `complement(all()) == []`. A bounded range's complement is the
    /// (possibly empty) region below its lower bound plus the (possibly
    /// empty) region above its upper bound.
    pub fn complement(&self) -> Vec<KeyRange<K>> {
        match self {
            KeyRange::All => Vec::new(),
            KeyRange::Only(k) => {
                let mut out = Vec::with_capacity(2);
                out.push(KeyRange::upper_bound(k.clone(), true));
                out.push(KeyRange::lower_bound(k.clone(), true));
                out
            }
            KeyRange::LowerBound { value, exclusive } => {
                let mut out = Vec::with_capacity(1);
                out.push(KeyRange::upper_bound(value.clone(), !*exclusive));
                out
            }
            KeyRange::UpperBound { value, exclusive } => {
                let mut out = Vec::with_capacity(1);
                out.push(KeyRange::lower_bound(value.clone(), !*exclusive));
                out
            }
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => {
                let mut out = Vec::with_capacity(2);
                out.push(KeyRange::upper_bound(lower.clone(), !*lower_exclusive));
                out.push(KeyRange::lower_bound(upper.clone(), !*upper_exclusive));
                out
            }
        }
    }

    /// Checks if a key is within this range.
    pub fn contains(&self, key: &K) -> bool {
        match self {
            KeyRange::All => true,
            KeyRange::Only(k) => key == k,
            KeyRange::LowerBound { value, exclusive } => {
                if *exclusive {
                    key > value
                } else {
                    key >= value
                }
            }
            KeyRange::UpperBound { value, exclusive } => {
                if *exclusive {
                    key < value
                } else {
                    key <= value
                }
            }
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => {
                let lower_ok = if *lower_exclusive {
                    key > lower
                } else {
                    key >= lower
                };
                let upper_ok = if *upper_exclusive {
                    key < upper
                } else {
                    key <= upper
                };
                lower_ok && upper_ok
            }
        }
    }
}

/// Core trait for all index implementations.
pub trait Index<K> {
    /// Adds a key-value pair to the index.
    /// For unique indexes, this will fail if the key already exists.
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError>;

    /// Sets a key-value pair, replacing any existing values for the key.
    fn set(&mut self, key: K, value: RowId);

    /// Gets all row IDs associated with a key.
    fn get(&self, key: &K) -> Vec<RowId>;

    /// Removes a key (and optionally a specific value) from the index.
    /// If value is None, removes all values for the key.
    fn remove(&mut self, key: &K, value: Option<RowId>);

    /// Checks if the index contains the given key.
    fn contains_key(&self, key: &K) -> bool;

    /// Returns the number of entries in the index.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all entries from the index.
    fn clear(&mut self);

    /// Returns the minimum key and its values.
    fn min(&self) -> Option<(&K, Vec<RowId>)>;

    /// Returns the maximum key and its values.
    fn max(&self) -> Option<(&K, Vec<RowId>)>;

    /// Returns the estimated cost (number of rows) for a key range query.
    fn cost(&self, range: &KeyRange<K>) -> usize;
}

/// Trait for indexes that support range queries.
pub trait RangeIndex<K>: Index<K> {
    /// Gets all row IDs within the given key range.
    fn get_range(
        &self,
        range: Option<&KeyRange<K>>,
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId>;
}

/// Error type for index operations.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexError {
    /// Attempted to insert a duplicate key in a unique index.
    DuplicateKey,
    /// Key not found.
    KeyNotFound,
}

impl core::fmt::Display for IndexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IndexError::DuplicateKey => write!(f, "Duplicate key in unique index"),
            IndexError::KeyNotFound => write!(f, "Key not found"),
        }
    }
}
