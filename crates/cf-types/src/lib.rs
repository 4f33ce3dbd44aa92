#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of absence a cell can carry.
///
/// `NotAvailable` means no observation was made. `NotMeaningful` means an
/// observation exists but its result is undefined (e.g. `x / 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Missing {
    NotAvailable,
    NotMeaningful,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => f.write_str("NA"),
            Self::NotMeaningful => f.write_str("NM"),
        }
    }
}

/// A single value slot: present with a payload, or one of two absences.
///
/// The absence kinds are never merged by any method on this type. Callers
/// that want to treat both as "no value" must say so through [`Cell::value`]
/// or [`Cell::present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell<V> {
    Present(V),
    NotAvailable,
    NotMeaningful,
}

impl<V> Cell<V> {
    #[must_use]
    pub fn missing(kind: Missing) -> Self {
        match kind {
            Missing::NotAvailable => Self::NotAvailable,
            Missing::NotMeaningful => Self::NotMeaningful,
        }
    }

    #[must_use]
    pub fn missing_kind(&self) -> Option<Missing> {
        match self {
            Self::Present(_) => None,
            Self::NotAvailable => Some(Missing::NotAvailable),
            Self::NotMeaningful => Some(Missing::NotMeaningful),
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// `true` for everything except `NotAvailable`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::NotAvailable)
    }

    /// `true` for everything except `NotMeaningful`.
    #[must_use]
    pub fn is_meaningful(&self) -> bool {
        !matches!(self, Self::NotMeaningful)
    }

    #[must_use]
    pub fn as_ref(&self) -> Cell<&V> {
        match self {
            Self::Present(v) => Cell::Present(v),
            Self::NotAvailable => Cell::NotAvailable,
            Self::NotMeaningful => Cell::NotMeaningful,
        }
    }

    /// Apply `f` to a present payload; absences pass through with their kind.
    pub fn map<W, F>(self, f: F) -> Cell<W>
    where
        F: FnOnce(V) -> W,
    {
        match self {
            Self::Present(v) => Cell::Present(f(v)),
            Self::NotAvailable => Cell::NotAvailable,
            Self::NotMeaningful => Cell::NotMeaningful,
        }
    }

    pub fn and_then<W, F>(self, f: F) -> Cell<W>
    where
        F: FnOnce(V) -> Cell<W>,
    {
        match self {
            Self::Present(v) => f(v),
            Self::NotAvailable => Cell::NotAvailable,
            Self::NotMeaningful => Cell::NotMeaningful,
        }
    }

    /// Keep a present payload only if `predicate` accepts it. A rejected
    /// payload becomes `NotAvailable`; existing absences are untouched.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: FnOnce(&V) -> bool,
    {
        match self {
            Self::Present(v) if predicate(&v) => Self::Present(v),
            Self::Present(_) => Self::NotAvailable,
            other => other,
        }
    }

    /// Three-way elimination. Exactly one of the closures runs.
    pub fn fold<R, NA, NM, F>(self, na: NA, nm: NM, f: F) -> R
    where
        NA: FnOnce() -> R,
        NM: FnOnce() -> R,
        F: FnOnce(V) -> R,
    {
        match self {
            Self::Present(v) => f(v),
            Self::NotAvailable => na(),
            Self::NotMeaningful => nm(),
        }
    }

    /// Combine two cells. `NotMeaningful` on either side wins, then
    /// `NotAvailable`; `f` only runs when both are present.
    pub fn zip_with<U, W, F>(self, other: Cell<U>, f: F) -> Cell<W>
    where
        F: FnOnce(V, U) -> W,
    {
        match (self, other) {
            (Self::Present(a), Cell::Present(b)) => Cell::Present(f(a, b)),
            (Self::NotMeaningful, _) | (_, Cell::NotMeaningful) => Cell::NotMeaningful,
            _ => Cell::NotAvailable,
        }
    }

    /// Replace any absence with `other`. A present cell is returned as is.
    #[must_use]
    pub fn or_else(self, other: Self) -> Self {
        match self {
            Self::Present(_) => self,
            _ => other,
        }
    }

    #[must_use]
    pub fn get_or_else(self, default: V) -> V {
        match self {
            Self::Present(v) => v,
            _ => default,
        }
    }

    /// Discard the absence distinction explicitly.
    #[must_use]
    pub fn value(self) -> Option<V> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn present(&self) -> Option<&V> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl<V: Clone> Cell<&V> {
    #[must_use]
    pub fn cloned(self) -> Cell<V> {
        self.map(Clone::clone)
    }
}

impl<V: Copy> Cell<&V> {
    #[must_use]
    pub fn copied(self) -> Cell<V> {
        self.map(|v| *v)
    }
}

impl<V> From<Option<V>> for Cell<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::NotAvailable,
        }
    }
}

impl<V: fmt::Display> fmt::Display for Cell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(v) => write!(f, "{v}"),
            Self::NotAvailable => f.write_str("NA"),
            Self::NotMeaningful => f.write_str("NM"),
        }
    }
}

// ── Missingness utilities ──────────────────────────────────────────────

pub fn count_present<V>(cells: &[Cell<V>]) -> usize {
    cells.iter().filter(|c| c.is_present()).count()
}

pub fn count_missing<V>(cells: &[Cell<V>], kind: Missing) -> usize {
    cells
        .iter()
        .filter(|c| c.missing_kind() == Some(kind))
        .count()
}

pub fn present_values<V>(cells: &[Cell<V>]) -> Vec<&V> {
    cells.iter().filter_map(Cell::present).collect()
}
