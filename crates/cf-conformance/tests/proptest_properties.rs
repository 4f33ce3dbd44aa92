#![forbid(unsafe_code)]

//! Property suite for the cell, column and series model.
//!
//! Strategies come from `cf_conformance`; every property below must hold for
//! all generated inputs, not just the hand-picked fixtures in the unit tests.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use cf_columnar::{Column, ColumnError};
use cf_conformance::{
    arb_cell, arb_cell_column, arb_cells, arb_column, arb_missing, arb_pairs, arb_series,
    arb_unique_pairs,
};
use cf_index::DuplicateKeep;
use cf_series::{Series, SeriesOptions};
use cf_types::{Cell, Missing};

fn arb_key() -> impl Strategy<Value = i32> + Clone {
    -50_i32..50
}

fn arb_value() -> impl Strategy<Value = i64> + Clone {
    -1_000_000_i64..1_000_000
}

// ---------------------------------------------------------------------------
// Property: Cell algebra
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Mapping an absence returns the same absence, whatever the function.
    #[test]
    fn prop_map_is_identity_on_absence(kind in arb_missing(), offset in arb_value()) {
        let cell: Cell<i64> = Cell::missing(kind);
        prop_assert_eq!(cell.map(|v| v.wrapping_add(offset)), cell);
        prop_assert_eq!(cell.map(|v| v.to_string()).missing_kind(), Some(kind));
    }

    /// Mapping a present cell applies the function to its payload.
    #[test]
    fn prop_map_applies_to_present(v in arb_value()) {
        prop_assert_eq!(Cell::Present(v).map(|x| x / 2), Cell::Present(v / 2));
    }

    /// Exactly one predicate combination holds per variant.
    #[test]
    fn prop_predicates_partition_variants(cell in arb_cell(arb_value())) {
        let flags = (cell.is_present(), cell.is_available(), cell.is_meaningful());
        match cell {
            Cell::Present(_) => prop_assert_eq!(flags, (true, true, true)),
            Cell::NotAvailable => prop_assert_eq!(flags, (false, false, true)),
            Cell::NotMeaningful => prop_assert_eq!(flags, (false, true, false)),
        }
    }
}

// ---------------------------------------------------------------------------
// Property: Column representation equivalence
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A dense column and a mapped column of the same all-present values
    /// agree on length and on every read.
    #[test]
    fn prop_dense_and_mapped_reads_agree(values in proptest::collection::vec(arb_value(), 0..64)) {
        let dense = Column::dense(values.clone());
        let mapped = Column::from_cells(values.iter().copied().map(Cell::Present).collect());

        prop_assert_eq!(dense.len(), mapped.len());
        for i in 0..dense.len() {
            prop_assert_eq!(dense.get(i), mapped.get(i));
        }
        prop_assert!(dense.iter().eq(mapped.iter()));
        prop_assert_eq!(&dense, &mapped);
    }

    /// `from_cells` returns every absence exactly where it was supplied.
    #[test]
    fn prop_from_cells_preserves_pattern(cells in arb_cells(arb_value(), 0..64)) {
        let column = Column::from_cells(cells.clone());
        prop_assert_eq!(column.len(), cells.len());
        for (i, expected) in cells.iter().enumerate() {
            prop_assert_eq!(column.get(i).expect("in bounds"), expected.as_ref());
        }
        let read_back: Vec<Cell<i64>> = column.iter().map(Cell::copied).collect();
        prop_assert_eq!(read_back, cells);
    }

    /// Reads past the end fail instead of clamping or wrapping.
    #[test]
    fn prop_get_past_end_is_out_of_bounds(column in arb_column(arb_value(), 0..32), extra in 0_usize..8) {
        let len = column.len();
        prop_assert_eq!(
            column.get(len + extra),
            Err(ColumnError::OutOfBounds { index: len + extra, len })
        );
    }

    /// Iteration is finite, skips nothing, and restarts from the beginning.
    #[test]
    fn prop_iteration_is_restartable(column in arb_column(arb_value(), 0..64)) {
        let first: Vec<_> = column.iter().collect();
        let second: Vec<_> = column.iter().collect();
        prop_assert_eq!(first.len(), column.len());
        prop_assert_eq!(first, second);
    }

    /// `compact` picks dense exactly when every cell is present, without
    /// changing what is read.
    #[test]
    fn prop_compact_is_observably_from_cells(cells in arb_cells(arb_value(), 0..64)) {
        let compact = Column::compact(cells.clone());
        prop_assert_eq!(compact.is_dense(), cells.iter().all(Cell::is_present));
        prop_assert_eq!(compact, Column::from_cells(cells));
    }

    /// The presence mask counts what the column reports.
    #[test]
    fn prop_validity_matches_counts(column in arb_cell_column(arb_value(), 0..150)) {
        let mask = column.validity();
        prop_assert_eq!(mask.len(), column.len());
        prop_assert_eq!(mask.count_valid(), column.count_present());
        prop_assert_eq!(
            column.len(),
            column.count_present()
                + column.count_missing(Missing::NotAvailable)
                + column.count_missing(Missing::NotMeaningful)
        );
    }
}

// ---------------------------------------------------------------------------
// Property: Series construction and lookup
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// One surviving key per distinct input key, in ascending order.
    #[test]
    fn prop_series_keys_unique_and_sorted(pairs in arb_pairs(arb_key(), arb_value(), 0..40)) {
        let distinct: BTreeSet<i32> = pairs.iter().map(|(k, _)| *k).collect();
        let series = Series::from_pairs(pairs);
        prop_assert_eq!(series.keys().len(), distinct.len());
        prop_assert!(series.keys().windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(series.keys().to_vec(), distinct.into_iter().collect::<Vec<_>>());
    }

    /// Last pair wins: matches a map filled by inserting in input order.
    #[test]
    fn prop_series_matches_last_wins_model(pairs in arb_pairs(arb_key(), arb_value(), 0..40)) {
        let mut model = BTreeMap::new();
        for (k, c) in &pairs {
            model.insert(*k, *c);
        }
        let series = Series::from_pairs(pairs);
        let actual: Vec<(i32, Cell<i64>)> = series.iter().map(|(k, c)| (*k, c.copied())).collect();
        prop_assert_eq!(actual, model.into_iter().collect::<Vec<_>>());
    }

    /// First-wins policy keeps the earliest occurrence instead.
    #[test]
    fn prop_series_matches_first_wins_model(pairs in arb_pairs(arb_key(), arb_value(), 0..40)) {
        let mut model = BTreeMap::new();
        for (k, c) in &pairs {
            model.entry(*k).or_insert(*c);
        }
        let options = SeriesOptions::default().with_keep(DuplicateKeep::First);
        let series = Series::from_pairs_with(pairs, &options);
        for (k, c) in &model {
            prop_assert_eq!(series.get(k), c.as_ref());
        }
        prop_assert_eq!(series.len(), model.len());
    }

    /// A key that never appeared reads as `NotAvailable`.
    #[test]
    fn prop_missing_key_reads_not_available(
        pairs in arb_pairs(arb_key(), arb_value(), 0..40),
        absent_key in 100_i32..200,
    ) {
        let series = Series::from_pairs(pairs);
        prop_assert_eq!(series.get(&absent_key), Cell::NotAvailable);
    }

    /// `NotMeaningful` only comes back for keys stored that way.
    #[test]
    fn prop_not_meaningful_only_when_stored(series in arb_series(arb_key(), arb_value(), 0..40), absent_key in arb_key()) {
        if series.get(&absent_key) == Cell::NotMeaningful {
            let pos = series.index().position(&absent_key).expect("key must be indexed");
            prop_assert_eq!(series.column().get(pos), Ok(Cell::NotMeaningful));
        }
    }

    /// Permuting unique-key input does not change the result.
    #[test]
    fn prop_order_determinism(
        (original, shuffled) in arb_unique_pairs(arb_key(), arb_value(), 0..30)
            .prop_flat_map(|pairs| (Just(pairs.clone()), Just(pairs).prop_shuffle()))
    ) {
        let left = Series::from_pairs(original);
        let right = Series::from_pairs(shuffled);
        prop_assert_eq!(left.keys(), right.keys());
        prop_assert_eq!(left, right);
    }

    /// Range selection equals filtering the key sequence.
    #[test]
    fn prop_range_matches_filter(
        series in arb_series(arb_key(), arb_value(), 0..40),
        lo in arb_key(),
        width in 0_i32..40,
    ) {
        let hi = lo + width;
        let sub = series.range(lo..hi).expect("range");
        let expected: Vec<i32> = series.keys().iter().copied().filter(|k| (lo..hi).contains(k)).collect();
        prop_assert_eq!(sub.keys().to_vec(), expected);
        for k in sub.keys() {
            prop_assert_eq!(sub.get(k), series.get(k));
        }
    }
}

#[test]
fn worked_example_last_wins() {
    let series = Series::from_pairs(vec![
        (3, Cell::Present(9)),
        (1, Cell::Present(5)),
        (1, Cell::Present(7)),
    ]);
    assert_eq!(series.keys(), &[1, 3]);
    assert_eq!(series.get(&1), Cell::Present(&7));
    assert_eq!(series.get(&3), Cell::Present(&9));
    assert_eq!(series.get(&99), Cell::NotAvailable);
}
