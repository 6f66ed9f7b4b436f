//! Pipeline scenarios across stages.
//!
//! Query rows → normalize → gap fill → reconcile → cumulative, plus the
//! ordering and coverage properties every stage has to keep.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tokenization_metrics::domain::{PeriodUnit, Table, Value};
use tokenization_metrics::pipeline::{
    ReconcileRule, SpineBounds, add_cumulative_columns, col, fill_gaps, normalize_rows,
    reconcile, sum,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn monthly_counts_are_gap_filled_then_cumulated() {
    let raw = normalize_rows(
        vec![
            vec![Value::from("2024-01-01"), Value::from(10)],
            vec![Value::from("2024-03-01"), Value::from(5)],
        ],
        &["date", "count"],
    )
    .unwrap();

    let filled = fill_gaps(&raw, "date", PeriodUnit::Month, SpineBounds::Observed).unwrap();
    assert_eq!(
        filled.date_column("date").unwrap(),
        vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]
    );
    assert_eq!(
        filled.numeric_column("count").unwrap(),
        vec![dec!(10), dec!(0), dec!(5)]
    );

    let cumulated = add_cumulative_columns(&filled, "date", &["count"]).unwrap();
    assert_eq!(
        cumulated.numeric_column("cumulative_count").unwrap(),
        vec![dec!(10), dec!(10), dec!(15)]
    );
}

#[test]
fn disjoint_sources_reconcile_with_zero_defaults() {
    let a = normalize_rows(
        vec![vec![Value::Date(date(2024, 1, 1)), Value::from(5)]],
        &["date", "x"],
    )
    .unwrap();
    let b = normalize_rows(
        vec![vec![Value::Date(date(2024, 2, 1)), Value::from(7)]],
        &["date", "y"],
    )
    .unwrap();

    let rule = ReconcileRule::new().output("total", sum([col("x"), col("y")]));
    let joined = reconcile(&[&a, &b], "date", &rule).unwrap();

    let records = joined.to_records();
    assert_eq!(records.len(), 2);
    assert_eq!(
        serde_json::Value::Object(records[0].clone()),
        serde_json::json!({"date": "2024-01-01", "x": 5, "y": 0, "total": 5})
    );
    assert_eq!(
        serde_json::Value::Object(records[1].clone()),
        serde_json::json!({"date": "2024-02-01", "x": 0, "y": 7, "total": 7})
    );
}

#[test]
fn reconciling_a_table_with_itself_doubles_same_named_metrics() {
    let table = normalize_rows(
        vec![
            vec![Value::Date(date(2024, 1, 1)), Value::from(3)],
            vec![Value::Date(date(2024, 2, 1)), Value::from(4)],
        ],
        &["date", "volume"],
    )
    .unwrap();

    let joined = reconcile(&[&table, &table], "date", &ReconcileRule::new()).unwrap();
    assert_eq!(
        joined.numeric_column("volume").unwrap(),
        vec![dec!(6), dec!(8)]
    );
}

fn month_table(months: &[(u32, i64)], metric: &str) -> Table {
    normalize_rows(
        months
            .iter()
            .map(|(offset, v)| {
                let year = 2020 + (*offset / 12) as i32;
                let month = offset % 12 + 1;
                vec![Value::Date(date(year, month, 1)), Value::from(*v)]
            })
            .collect(),
        &["date", metric],
    )
    .unwrap()
}

proptest! {
    #[test]
    fn gap_fill_is_dense_and_ascending(
        months in prop::collection::vec((0u32..48, 0i64..1000), 1..20)
    ) {
        let table = month_table(&months, "count");
        let filled = fill_gaps(&table, "date", PeriodUnit::Month, SpineBounds::Observed).unwrap();
        let dates = filled.date_column("date").unwrap();

        let min = months.iter().map(|(m, _)| *m).min().unwrap();
        let max = months.iter().map(|(m, _)| *m).max().unwrap();
        prop_assert_eq!(dates.len() as u32, max - min + 1);
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(dates.iter().all(|d| d.day() == 1));

        let total: Decimal = months.iter().map(|(_, v)| Decimal::from(*v)).sum();
        let filled_total: Decimal = filled.numeric_column("count").unwrap().iter().sum();
        prop_assert_eq!(filled_total, total);
    }

    #[test]
    fn reconcile_covers_the_union_of_periods(
        a in prop::collection::btree_map(0u32..36, 0i64..100, 1..12),
        b in prop::collection::btree_map(0u32..36, 0i64..100, 1..12),
    ) {
        let left = month_table(&a.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), "x");
        let right = month_table(&b.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), "y");

        let joined = reconcile(&[&left, &right], "date", &ReconcileRule::new()).unwrap();
        let periods = joined.date_column("date").unwrap();

        let expected: BTreeSet<NaiveDate> = left
            .date_column("date")
            .unwrap()
            .into_iter()
            .chain(right.date_column("date").unwrap())
            .collect();
        prop_assert_eq!(periods, expected.into_iter().collect::<Vec<_>>());
    }
}
