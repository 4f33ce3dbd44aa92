#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::ops::{Bound, Range, RangeBounds};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which occurrence of a repeated key survives deduplication, in input order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeep {
    First,
    #[default]
    Last,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("index keys must be strictly ascending; violation at position {position}")]
    NotStrictlyAscending { position: usize },
    #[error("invalid range {start}..{end} for index of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },
}

/// Strictly ascending sequence of unique keys.
///
/// Ordering is a type-level requirement: every constructor demands `K: Ord`,
/// so an index over a key type without a total order does not compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Index<K> {
    keys: Vec<K>,
}

fn first_unordered<K: Ord>(keys: &[K]) -> Option<usize> {
    keys.windows(2)
        .position(|w| w[0] >= w[1])
        .map(|pos| pos + 1)
}

impl<K> Index<K> {
    #[must_use]
    pub fn empty() -> Self {
        Self { keys: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    #[must_use]
    pub fn first(&self) -> Option<&K> {
        self.keys.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&K> {
        self.keys.last()
    }

    #[must_use]
    pub fn into_keys(self) -> Vec<K> {
        self.keys
    }
}

impl<K: Ord> Index<K> {
    /// Wrap keys that are already strictly ascending.
    pub fn new(keys: Vec<K>) -> Result<Self, IndexError> {
        if let Some(position) = first_unordered(&keys) {
            return Err(IndexError::NotStrictlyAscending { position });
        }
        Ok(Self { keys })
    }

    /// Sort `keys` and drop repeats according to `keep`.
    ///
    /// Returns the index together with, for each surviving key, the position
    /// it occupied in the input. Callers use those positions to gather the
    /// values that belong to the surviving keys.
    #[must_use]
    pub fn from_unsorted(keys: Vec<K>, keep: DuplicateKeep) -> (Self, Vec<usize>) {
        let input_len = keys.len();
        let mut tagged: Vec<(K, usize)> = keys
            .into_iter()
            .enumerate()
            .map(|(pos, key)| (key, pos))
            .collect();
        // Stable: equal keys stay in input order, so the first of a run is
        // the first occurrence and the last is the last occurrence.
        tagged.sort_by(|a, b| a.0.cmp(&b.0));

        match keep {
            DuplicateKeep::First => tagged.dedup_by(|later, earlier| later.0 == earlier.0),
            DuplicateKeep::Last => tagged.dedup_by(|later, earlier| {
                if later.0 == earlier.0 {
                    std::mem::swap(later, earlier);
                    true
                } else {
                    false
                }
            }),
        }

        let dropped = input_len - tagged.len();
        if dropped > 0 {
            debug!("index dropped {dropped} duplicate keys (keep={keep:?})");
        }

        let (keys, positions) = tagged.into_iter().unzip();
        (Self { keys }, positions)
    }

    #[must_use]
    pub fn position(&self, key: &K) -> Option<usize> {
        self.keys.binary_search(key).ok()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Positions of the keys that fall inside `bounds`, as a contiguous span.
    #[must_use]
    pub fn range_positions<R: RangeBounds<K>>(&self, bounds: R) -> Range<usize> {
        let start = match bounds.start_bound() {
            Bound::Included(lo) => self.keys.partition_point(|k| k < lo),
            Bound::Excluded(lo) => self.keys.partition_point(|k| k <= lo),
            Bound::Unbounded => 0,
        };
        let end = match bounds.end_bound() {
            Bound::Included(hi) => self.keys.partition_point(|k| k <= hi),
            Bound::Excluded(hi) => self.keys.partition_point(|k| k < hi),
            Bound::Unbounded => self.keys.len(),
        };
        start..end.max(start)
    }
}

impl<K: Ord + Clone> Index<K> {
    /// Keys at positions `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, IndexError> {
        let len = self.keys.len();
        if start > end || end > len {
            return Err(IndexError::InvalidRange { start, end, len });
        }
        Ok(Self {
            keys: self.keys[start..end].to_vec(),
        })
    }

    /// Sorted merge of two indexes; keys present in both appear once.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut keys = Vec::with_capacity(self.keys.len() + other.keys.len());
        let (mut left, mut right) = (self.keys.iter().peekable(), other.keys.iter().peekable());

        loop {
            let order = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => l.cmp(r),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };
            let next = match order {
                Ordering::Less => left.next(),
                Ordering::Greater => right.next(),
                Ordering::Equal => {
                    right.next();
                    left.next()
                }
            };
            keys.extend(next.cloned());
        }

        Self { keys }
    }
}

impl<K> Default for Index<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, K> IntoIterator for &'a Index<K> {
    type Item = &'a K;
    type IntoIter = std::slice::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl<'de, K> Deserialize<'de> for Index<K>
where
    K: Ord + Deserialize<'de>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<K>::deserialize(deserializer)?;
        Self::new(keys).map_err(serde::de::Error::custom)
    }
}
