#![forbid(unsafe_code)]

//! Generators of synthetic cells, columns and keyed series.
//!
//! Every strategy is parameterised by an opaque value strategy, so callers
//! decide what payloads look like. The core crates never depend on this one:
//! randomness, weighting and shuffling all stay here.

use std::collections::BTreeMap;
use std::fmt::Debug;

use cf_columnar::Column;
use cf_series::Series;
use cf_types::{Cell, Missing};
use proptest::collection::{SizeRange, btree_map, vec};
use proptest::prelude::*;

/// Relative odds of each cell kind produced by [`arb_cell_weighted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWeights {
    pub present: u32,
    pub not_available: u32,
    pub not_meaningful: u32,
}

impl Default for CellWeights {
    fn default() -> Self {
        Self {
            present: 4,
            not_available: 1,
            not_meaningful: 1,
        }
    }
}

impl CellWeights {
    #[must_use]
    pub fn present_only() -> Self {
        Self {
            present: 1,
            not_available: 0,
            not_meaningful: 0,
        }
    }
}

pub fn arb_missing() -> impl Strategy<Value = Missing> {
    prop_oneof![Just(Missing::NotAvailable), Just(Missing::NotMeaningful)]
}

pub fn arb_present_cell<S: Strategy>(values: S) -> impl Strategy<Value = Cell<S::Value>> {
    values.prop_map(Cell::Present)
}

/// Present, not-available and not-meaningful cells at the default odds.
pub fn arb_cell<S>(values: S) -> impl Strategy<Value = Cell<S::Value>>
where
    S: Strategy,
    S::Value: Clone,
{
    arb_cell_weighted(values, CellWeights::default())
}

pub fn arb_cell_weighted<S>(values: S, weights: CellWeights) -> impl Strategy<Value = Cell<S::Value>>
where
    S: Strategy,
    S::Value: Clone,
{
    prop_oneof![
        weights.present => values.prop_map(Cell::Present),
        weights.not_available => Just(Cell::NotAvailable),
        weights.not_meaningful => Just(Cell::NotMeaningful),
    ]
}

pub fn arb_cells<S>(values: S, len: impl Into<SizeRange>) -> impl Strategy<Value = Vec<Cell<S::Value>>>
where
    S: Strategy,
    S::Value: Clone,
{
    vec(arb_cell(values), len)
}

pub fn arb_dense_column<S: Strategy>(
    values: S,
    len: impl Into<SizeRange>,
) -> impl Strategy<Value = Column<S::Value>> {
    vec(values, len).prop_map(Column::dense)
}

pub fn arb_cell_column<S>(values: S, len: impl Into<SizeRange>) -> impl Strategy<Value = Column<S::Value>>
where
    S: Strategy,
    S::Value: Clone,
{
    arb_cells(values, len).prop_map(Column::from_cells)
}

/// A column built through either constructor, with equal odds.
pub fn arb_column<S>(values: S, len: impl Into<SizeRange>) -> impl Strategy<Value = Column<S::Value>>
where
    S: Strategy + Clone,
    S::Value: Clone,
{
    let len: SizeRange = len.into();
    prop_oneof![
        arb_dense_column(values.clone(), len.clone()),
        arb_cell_column(values, len),
    ]
}

/// Key/cell pairs in generation order; keys may repeat.
pub fn arb_pairs<KS, VS>(
    keys: KS,
    values: VS,
    len: impl Into<SizeRange>,
) -> impl Strategy<Value = Vec<(KS::Value, Cell<VS::Value>)>>
where
    KS: Strategy,
    VS: Strategy,
    VS::Value: Clone,
{
    vec((keys, arb_cell(values)), len)
}

/// Pairs with distinct keys, in shuffled order.
pub fn arb_unique_pairs<KS, VS>(
    keys: KS,
    values: VS,
    len: impl Into<SizeRange>,
) -> impl Strategy<Value = Vec<(KS::Value, Cell<VS::Value>)>>
where
    KS: Strategy,
    KS::Value: Ord + Clone,
    VS: Strategy,
    VS::Value: Clone,
{
    btree_map(keys, arb_cell(values), len)
        .prop_map(|map: BTreeMap<_, _>| map.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

pub fn arb_series<KS, VS>(
    keys: KS,
    values: VS,
    len: impl Into<SizeRange>,
) -> impl Strategy<Value = Series<KS::Value, VS::Value>>
where
    KS: Strategy,
    KS::Value: Ord + Debug,
    VS: Strategy,
    VS::Value: Clone,
{
    arb_pairs(keys, values, len).prop_map(Series::from_pairs)
}
