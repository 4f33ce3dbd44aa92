#![forbid(unsafe_code)]

use std::iter::FusedIterator;

use cf_types::{Cell, Missing};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Packed presence bitmap: bit `i` is set when position `i` holds a
/// `Present` cell.
#[derive(Debug, Clone, Eq)]
pub struct ValidityMask {
    words: Vec<u64>,
    len: usize,
}

impl ValidityMask {
    #[must_use]
    pub fn from_cells<V>(cells: &[Cell<V>]) -> Self {
        Self::from_bits(cells.iter().map(Cell::is_present), cells.len())
    }

    fn from_bits(bits: impl Iterator<Item = bool>, len: usize) -> Self {
        let mut words = vec![0_u64; len.div_ceil(64)];
        for (idx, valid) in bits.enumerate() {
            if valid {
                words[idx / 64] |= 1_u64 << (idx % 64);
            }
        }
        Self { words, len }
    }

    #[must_use]
    pub fn all_valid(len: usize) -> Self {
        let mut words = vec![u64::MAX; len.div_ceil(64)];
        let remainder = len % 64;
        if remainder > 0
            && let Some(last) = words.last_mut()
        {
            *last = (1_u64 << remainder) - 1;
        }
        Self { words, len }
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.words[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Bits past `len` are always zero, so whole-word popcount is exact.
    #[must_use]
    pub fn count_valid(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|idx| self.get(idx))
    }
}

impl PartialEq for ValidityMask {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bits().eq(other.bits())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("index {index} out of bounds for column of length {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("invalid range {start}..{end} for column of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
}

/// Backing storage. `Dense` holds raw payloads, every one of them present;
/// `Mapped` holds one explicit cell per position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "repr", content = "data", rename_all = "snake_case")]
enum Repr<V> {
    Dense(Vec<V>),
    Mapped(Vec<Cell<V>>),
}

/// Fixed-length, 0-indexed, immutable sequence of cells.
///
/// Reads never reveal which representation backs the column: a dense
/// column synthesizes `Present` on every read, and equality compares the
/// logical cell sequence. Only [`Column::is_dense`] exposes the storage
/// choice, for callers that care about footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Column<V> {
    repr: Repr<V>,
}

impl<V> Column<V> {
    /// All-present column over a contiguous array. Empty input is allowed.
    #[must_use]
    pub fn dense(values: Vec<V>) -> Self {
        Self {
            repr: Repr::Dense(values),
        }
    }

    /// Cell-mapped column preserving the exact per-position pattern.
    #[must_use]
    pub fn from_cells(cells: Vec<Cell<V>>) -> Self {
        Self {
            repr: Repr::Mapped(cells),
        }
    }

    /// Dense column from any sequence of raw payloads.
    #[must_use]
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
    {
        Self::dense(values.into_iter().collect())
    }

    /// Picks the smaller representation for `cells`: dense when every cell
    /// is present, mapped otherwise.
    #[must_use]
    pub fn compact(cells: Vec<Cell<V>>) -> Self {
        if !cells.iter().all(Cell::is_present) {
            trace!("column kept mapped: {} cells with gaps", cells.len());
            return Self::from_cells(cells);
        }

        debug!("column compacted to dense: {} present cells", cells.len());
        let values = cells.into_iter().filter_map(Cell::value).collect();
        Self::dense(values)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::dense(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Dense(values) => values.len(),
            Repr::Mapped(cells) => cells.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage introspection only; not part of the read contract.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        matches!(self.repr, Repr::Dense(_))
    }

    pub fn get(&self, index: usize) -> Result<Cell<&V>, ColumnError> {
        let cell = match &self.repr {
            Repr::Dense(values) => values.get(index).map(Cell::Present),
            Repr::Mapped(cells) => cells.get(index).map(Cell::as_ref),
        };
        cell.ok_or(ColumnError::OutOfBounds {
            index,
            len: self.len(),
        })
    }

    /// Eliminate the cell at `index` with one of three closures.
    pub fn fold_row<R, NA, NM, F>(&self, index: usize, na: NA, nm: NM, f: F) -> Result<R, ColumnError>
    where
        NA: FnOnce() -> R,
        NM: FnOnce() -> R,
        F: FnOnce(&V) -> R,
    {
        Ok(self.get(index)?.fold(na, nm, f))
    }

    /// Lazy pass over every position in order. Call again to restart.
    #[must_use]
    pub fn iter(&self) -> ColumnIter<'_, V> {
        let inner = match &self.repr {
            Repr::Dense(values) => IterRepr::Dense(values.iter()),
            Repr::Mapped(cells) => IterRepr::Mapped(cells.iter()),
        };
        ColumnIter { inner }
    }

    /// Map present payloads. The result keeps this column's representation.
    #[must_use]
    pub fn map<W, F>(&self, mut f: F) -> Column<W>
    where
        F: FnMut(&V) -> W,
    {
        match &self.repr {
            Repr::Dense(values) => Column::dense(values.iter().map(f).collect()),
            Repr::Mapped(cells) => {
                Column::from_cells(cells.iter().map(|c| c.as_ref().map(&mut f)).collect())
            }
        }
    }

    /// Cellwise combination of two equal-length columns.
    pub fn zip_with<U, W, F>(&self, other: &Column<U>, mut f: F) -> Result<Column<W>, ColumnError>
    where
        F: FnMut(&V, &U) -> W,
    {
        if self.len() != other.len() {
            return Err(ColumnError::LengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }

        if let (Repr::Dense(left), Repr::Dense(right)) = (&self.repr, &other.repr) {
            let values = left.iter().zip(right).map(|(l, r)| f(l, r)).collect();
            return Ok(Column::dense(values));
        }

        let cells = self
            .iter()
            .zip(other.iter())
            .map(|(l, r)| l.zip_with(r, &mut f))
            .collect();
        Ok(Column::from_cells(cells))
    }

    #[must_use]
    pub fn into_cells(self) -> Vec<Cell<V>> {
        match self.repr {
            Repr::Dense(values) => values.into_iter().map(Cell::Present).collect(),
            Repr::Mapped(cells) => cells,
        }
    }

    #[must_use]
    pub fn validity(&self) -> ValidityMask {
        match &self.repr {
            Repr::Dense(values) => ValidityMask::all_valid(values.len()),
            Repr::Mapped(cells) => ValidityMask::from_cells(cells),
        }
    }

    #[must_use]
    pub fn count_present(&self) -> usize {
        match &self.repr {
            Repr::Dense(values) => values.len(),
            Repr::Mapped(cells) => cf_types::count_present(cells),
        }
    }

    #[must_use]
    pub fn count_missing(&self, kind: Missing) -> usize {
        match &self.repr {
            Repr::Dense(_) => 0,
            Repr::Mapped(cells) => cf_types::count_missing(cells, kind),
        }
    }
}

impl<V: Clone> Column<V> {
    /// Sub-column over `start..end`, keeping the representation.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, ColumnError> {
        let len = self.len();
        if start > end || end > len {
            return Err(ColumnError::InvalidRange { start, end, len });
        }

        Ok(match &self.repr {
            Repr::Dense(values) => Self::dense(values[start..end].to_vec()),
            Repr::Mapped(cells) => Self::from_cells(cells[start..end].to_vec()),
        })
    }

    /// Gather cells by position. `None` slots read as `NotAvailable`; a
    /// position past the end is an error rather than a silent gap.
    pub fn reindex(&self, positions: &[Option<usize>]) -> Result<Self, ColumnError> {
        let cells = positions
            .iter()
            .map(|slot| match slot {
                Some(idx) => self.get(*idx).map(Cell::cloned),
                None => Ok(Cell::NotAvailable),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::compact(cells))
    }
}

impl<V> Default for Column<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> From<Vec<V>> for Column<V> {
    fn from(values: Vec<V>) -> Self {
        Self::dense(values)
    }
}

impl<V> FromIterator<Cell<V>> for Column<V> {
    fn from_iter<I: IntoIterator<Item = Cell<V>>>(iter: I) -> Self {
        Self::from_cells(iter.into_iter().collect())
    }
}

impl<V: PartialEq> PartialEq for Column<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for Column<V> {}

impl<'a, V> IntoIterator for &'a Column<V> {
    type Item = Cell<&'a V>;
    type IntoIter = ColumnIter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a column's cells.
#[derive(Debug)]
pub struct ColumnIter<'a, V> {
    inner: IterRepr<'a, V>,
}

#[derive(Debug)]
enum IterRepr<'a, V> {
    Dense(std::slice::Iter<'a, V>),
    Mapped(std::slice::Iter<'a, Cell<V>>),
}

impl<V> Clone for ColumnIter<'_, V> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            IterRepr::Dense(it) => IterRepr::Dense(it.clone()),
            IterRepr::Mapped(it) => IterRepr::Mapped(it.clone()),
        };
        Self { inner }
    }
}

impl<'a, V> Iterator for ColumnIter<'a, V> {
    type Item = Cell<&'a V>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterRepr::Dense(it) => it.next().map(Cell::Present),
            IterRepr::Mapped(it) => it.next().map(Cell::as_ref),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            IterRepr::Dense(it) => it.size_hint(),
            IterRepr::Mapped(it) => it.size_hint(),
        }
    }
}

impl<V> DoubleEndedIterator for ColumnIter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterRepr::Dense(it) => it.next_back().map(Cell::Present),
            IterRepr::Mapped(it) => it.next_back().map(Cell::as_ref),
        }
    }
}

impl<V> ExactSizeIterator for ColumnIter<'_, V> {}

impl<V> FusedIterator for ColumnIter<'_, V> {}
