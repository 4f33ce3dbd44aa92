#![forbid(unsafe_code)]

use std::iter::Zip;
use std::ops::RangeBounds;

use cf_columnar::{Column, ColumnError, ColumnIter};
use cf_index::{DuplicateKeep, Index, IndexError};
use cf_types::Cell;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("index length ({index_len}) does not match column length ({column_len})")]
    LengthMismatch { index_len: usize, column_len: usize },
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Construction knobs for [`Series::from_pairs_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesOptions {
    /// Which pair wins when a key repeats in the input. Defaults to the last.
    pub keep: DuplicateKeep,
}

impl SeriesOptions {
    #[must_use]
    pub fn with_keep(mut self, keep: DuplicateKeep) -> Self {
        self.keep = keep;
        self
    }
}

pub type SeriesIter<'a, K, V> = Zip<std::slice::Iter<'a, K>, ColumnIter<'a, V>>;

/// Ordered association of unique keys to cells.
///
/// Keys live in an [`Index`] (strictly ascending), cells in a [`Column`] of
/// the same length. Iteration and lookups follow key order, never input
/// order. A series is immutable; every transformation builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series<K, V> {
    index: Index<K>,
    column: Column<V>,
}

impl<K: Ord, V> Series<K, V> {
    pub fn new(index: Index<K>, column: Column<V>) -> Result<Self, SeriesError> {
        if index.len() != column.len() {
            return Err(SeriesError::LengthMismatch {
                index_len: index.len(),
                column_len: column.len(),
            });
        }

        Ok(Self { index, column })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            index: Index::empty(),
            column: Column::empty(),
        }
    }

    /// Build from arbitrary, possibly repeated, unordered pairs. A repeated
    /// key keeps the cell of its last occurrence in input order.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Cell<V>)>,
    {
        Self::from_pairs_with(pairs, &SeriesOptions::default())
    }

    #[must_use]
    pub fn from_pairs_with<I>(pairs: I, options: &SeriesOptions) -> Self
    where
        I: IntoIterator<Item = (K, Cell<V>)>,
    {
        let (keys, cells): (Vec<K>, Vec<Cell<V>>) = pairs.into_iter().unzip();
        let input_len = keys.len();
        let (index, positions) = Index::from_unsorted(keys, options.keep);

        // Survivors carry their key-order rank; dropped duplicates have none.
        let mut rank = vec![None; input_len];
        for (order, &pos) in positions.iter().enumerate() {
            rank[pos] = Some(order);
        }
        let mut kept: Vec<(usize, Cell<V>)> = cells
            .into_iter()
            .enumerate()
            .filter_map(|(pos, cell)| rank[pos].map(|order| (order, cell)))
            .collect();
        kept.sort_unstable_by_key(|&(order, _)| order);
        let column = Column::compact(kept.into_iter().map(|(_, cell)| cell).collect());

        debug!(
            "series built from {input_len} pairs: {} keys, dense={}",
            index.len(),
            column.is_dense()
        );
        Self { index, column }
    }

    /// Build from pairs, folding the cells of a repeated key left to right
    /// in input order with `merge`.
    #[must_use]
    pub fn from_pairs_merged<I, F>(pairs: I, mut merge: F) -> Self
    where
        I: IntoIterator<Item = (K, Cell<V>)>,
        F: FnMut(Cell<V>, Cell<V>) -> Cell<V>,
    {
        let mut pairs: Vec<(K, Cell<V>)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut keys: Vec<K> = Vec::with_capacity(pairs.len());
        let mut cells: Vec<Cell<V>> = Vec::with_capacity(pairs.len());
        for (key, cell) in pairs {
            if keys.last() == Some(&key)
                && let Some(previous) = cells.pop()
            {
                cells.push(merge(previous, cell));
            } else {
                keys.push(key);
                cells.push(cell);
            }
        }

        // Keys are sorted and unique here, so the positions are the identity.
        let (index, _) = Index::from_unsorted(keys, DuplicateKeep::Last);
        Self {
            index,
            column: Column::compact(cells),
        }
    }

    /// All-present convenience over `(key, value)` pairs.
    #[must_use]
    pub fn from_values<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_pairs(pairs.into_iter().map(|(k, v)| (k, Cell::Present(v))))
    }

    /// Cell stored under `key`. A key outside the index reads as
    /// `NotAvailable`; `NotMeaningful` only comes back when it was stored.
    #[must_use]
    pub fn get(&self, key: &K) -> Cell<&V> {
        self.index
            .position(key)
            .and_then(|pos| self.column.get(pos).ok())
            .unwrap_or(Cell::NotAvailable)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains(key)
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&K> {
        self.index.first()
    }

    #[must_use]
    pub fn last_key(&self) -> Option<&K> {
        self.index.last()
    }
}

impl<K, V> Series<K, V> {
    /// Keys in ascending order, without repeats.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        self.index.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> &Index<K> {
        &self.index
    }

    #[must_use]
    pub fn column(&self) -> &Column<V> {
        &self.column
    }

    #[must_use]
    pub fn cells(&self) -> ColumnIter<'_, V> {
        self.column.iter()
    }

    #[must_use]
    pub fn iter(&self) -> SeriesIter<'_, K, V> {
        self.index.keys().iter().zip(self.column.iter())
    }

    #[must_use]
    pub fn count_present(&self) -> usize {
        self.column.count_present()
    }

    #[must_use]
    pub fn into_parts(self) -> (Index<K>, Column<V>) {
        (self.index, self.column)
    }
}

impl<K: Ord + Clone, V> Series<K, V> {
    #[must_use]
    pub fn map_values<W, F>(&self, f: F) -> Series<K, W>
    where
        F: FnMut(&V) -> W,
    {
        Series {
            index: self.index.clone(),
            column: self.column.map(f),
        }
    }
}

impl<K: Ord + Clone, V: Clone> Series<K, V> {
    /// Sub-series over the keys inside `bounds`.
    pub fn range<R: RangeBounds<K>>(&self, bounds: R) -> Result<Self, SeriesError> {
        let span = self.index.range_positions(bounds);
        let index = self.index.slice(span.start, span.end)?;
        let column = self.column.slice(span.start, span.end)?;
        Self::new(index, column)
    }

    /// Look up `keys` (sorted and deduplicated first). Keys this series does
    /// not hold read as `NotAvailable`.
    pub fn reindex(&self, keys: Vec<K>) -> Result<Self, SeriesError> {
        let (index, _) = Index::from_unsorted(keys, DuplicateKeep::First);
        let positions: Vec<Option<usize>> =
            index.keys().iter().map(|k| self.index.position(k)).collect();
        let column = self.column.reindex(&positions)?;
        Self::new(index, column)
    }

    /// Union of both key sets. Each key takes this series' cell unless it is
    /// absent (either kind), in which case `other`'s cell is used.
    pub fn or_else(&self, other: &Self) -> Result<Self, SeriesError> {
        let index = self.index.union(&other.index);
        let cells = index
            .keys()
            .iter()
            .map(|k| self.get(k).or_else(other.get(k)).cloned())
            .collect();
        Self::new(index, Column::compact(cells))
    }
}

impl<K: Ord, V> Default for Series<K, V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Ord, V> FromIterator<(K, Cell<V>)> for Series<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, Cell<V>)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl<'a, K, V> IntoIterator for &'a Series<K, V> {
    type Item = (&'a K, Cell<&'a V>);
    type IntoIter = SeriesIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de, K, V> Deserialize<'de> for Series<K, V>
where
    K: Ord + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(bound(deserialize = "K: Ord + Deserialize<'de>, V: Deserialize<'de>"))]
        struct Raw<K, V> {
            index: Index<K>,
            column: Column<V>,
        }
        let raw = Raw::<K, V>::deserialize(deserializer)?;
        Self::new(raw.index, raw.column).map_err(serde::de::Error::custom)
    }
}
