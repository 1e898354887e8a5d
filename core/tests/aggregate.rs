use chrono::NaiveDate;
use loyalty_core::{
    aggregate::{
        aggregate, aggregate_dense, entity_performance, kpi_metrics, monthly_pivot, monthly_pivots,
        season_history, segment_analysis,
    },
    like_for_like::Metric,
    tier::{Tier, TierLadder},
    transaction::{GroupKey, Registration, Scope, TransactionRow, TransactionTable},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn sample_rows() -> Vec<TransactionRow> {
    vec![
        TransactionRow::new("111", 9, d(2023, 7, 3), 100.0)
            .at_store("Loja A", "Casa")
            .order("P1"),
        TransactionRow::new("111", 9, d(2023, 7, 9), 50.0)
            .at_store("Loja B", "Revenda")
            .order("P1"),
        TransactionRow::new("111", 10, d(2024, 8, 1), 70.0)
            .at_store("Loja A", "Casa")
            .order("P2"),
        TransactionRow::new("222", 9, d(2023, 9, 1), 30.0)
            .consolidated("111")
            .at_store("Loja A", "Casa")
            .order("P3"),
        TransactionRow::new("333", 0, d(2023, 9, 1), 999.0)
            .at_store("Loja A", "Casa")
            .order("P4"),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Season 0 never appears; distinct counts are distinct.
#[test]
fn per_document_totals() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let out = aggregate(&table, &Scope::all(), GroupKey::Document);

    assert!(out.iter().all(|p| p.season > 0));
    assert_eq!(out.len(), 3);

    let first = &out[0];
    assert_eq!((first.key.as_str(), first.season), ("111", 9));
    assert_eq!(first.points_total, 150.0);
    assert_eq!(first.order_count, 1);
    assert_eq!(first.store_count, 2);
    assert_eq!(first.segment_count, 2);
}

/// Consolidated grouping rolls the second document into the first key.
#[test]
fn consolidated_grouping() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let out = aggregate(&table, &Scope::all(), GroupKey::Consolidated);
    let s9 = out.iter().find(|p| p.key == "111" && p.season == 9).unwrap();
    assert_eq!(s9.points_total, 180.0);
    assert_eq!(s9.order_count, 2);
}

/// Output does not depend on input row order.
#[test]
fn order_independent() {
    let forward = TransactionTable::new(sample_rows(), Vec::new());
    let mut rows = sample_rows();
    rows.reverse();
    let backward = TransactionTable::new(rows, Vec::new());
    assert_eq!(
        aggregate(&forward, &Scope::all(), GroupKey::Document),
        aggregate(&backward, &Scope::all(), GroupKey::Document)
    );
}

/// Dense output is the full key × season product with zero rows.
#[test]
fn dense_fills_missing_pairs() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let dense = aggregate_dense(&table, &Scope::all(), GroupKey::Document);
    assert_eq!(dense.len(), 4); // {111, 222} × {9, 10}
    let filler = dense.iter().find(|p| p.key == "222" && p.season == 10).unwrap();
    assert_eq!(filler.points_total, 0.0);
    assert_eq!(filler.order_count, 0);
}

#[test]
fn entity_performance_carries_tier_and_documents() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let ladder = TierLadder::standard();
    let perf = entity_performance(&table, &Scope::all(), Some(9), GroupKey::Consolidated, &ladder);
    assert_eq!(perf.len(), 1);
    assert_eq!(perf[0].documents, vec!["111".to_string(), "222".to_string()]);
    assert_eq!(perf[0].tier, Tier::Pro);

    let all = entity_performance(&table, &Scope::all(), None, GroupKey::Consolidated, &ladder);
    assert_eq!(all[0].points, 250.0);
}

#[test]
fn season_history_averages() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let history = season_history(&table, &Scope::all());
    assert_eq!(history.iter().map(|h| h.season).collect::<Vec<_>>(), vec![9, 10]);
    assert_eq!(history[0].points, 180.0);
    assert_eq!(history[0].orders, 2);
    assert_eq!(history[0].avg_points_per_order, 90.0);
}

/// The first purchase of a registered entity counts as a new registration.
#[test]
fn kpis_count_new_registrations() {
    let registrations = vec![Registration {
        entity_id: "222".into(),
        name: String::new(),
        season: 9,
    }];
    let table = TransactionTable::new(sample_rows(), registrations);
    let kpis = kpi_metrics(table.season_rows(9, &Scope::all()));
    assert_eq!(kpis.new_registrations, 1);
    assert_eq!(kpis.orders, 2);

    let none = kpi_metrics(table.season_rows(10, &Scope::all()));
    assert_eq!(none.new_registrations, 0);
    assert_eq!(kpi_metrics(std::iter::empty()).avg_points_per_order, 0.0);
}

/// Months come out in fiscal order with growth of the last season.
#[test]
fn monthly_pivot_in_fiscal_order() {
    let rows = vec![
        TransactionRow::new("a", 9, d(2024, 1, 5), 10.0),
        TransactionRow::new("a", 9, d(2023, 7, 5), 20.0),
        TransactionRow::new("a", 10, d(2024, 7, 5), 30.0),
    ];
    let table = TransactionTable::new(rows, Vec::new());
    let pivot = monthly_pivot(&table, &Scope::all(), &[10, 9], Metric::Points);

    assert_eq!(pivot.seasons, vec![9, 10]);
    assert_eq!(pivot.rows.iter().map(|r| r.month).collect::<Vec<_>>(), vec![7, 1]);
    assert_eq!(pivot.rows[0].values, vec![20.0, 30.0]);
    assert_eq!(pivot.rows[0].growth, Some(0.5));
    assert_eq!(pivot.rows[1].values, vec![10.0, 0.0]);
    assert_eq!(pivot.rows[0].label, "Jul (07)");
    assert_eq!(pivot.totals, vec![30.0, 30.0]);
}

/// Order, registration and average pivots count distinct values per cell;
/// season totals are computed over the whole column.
#[test]
fn monthly_pivots_for_every_metric() {
    let rows = vec![
        TransactionRow::new("a", 9, d(2023, 7, 1), 20.0).order("O1"),
        TransactionRow::new("a", 9, d(2023, 7, 2), 10.0).order("O1"),
        TransactionRow::new("b", 9, d(2023, 7, 3), 30.0).order("O2"),
        TransactionRow::new("b", 9, d(2023, 8, 3), 30.0).order("O2"),
        TransactionRow::new("a", 10, d(2024, 7, 1), 40.0).order("O3"),
    ];
    let registrations = vec![Registration {
        entity_id: "b".into(),
        name: "B".into(),
        season: 9,
    }];
    let table = TransactionTable::new(rows, registrations);
    let pivots = monthly_pivots(&table, &Scope::all(), &[9, 10]);

    let orders = &pivots.orders;
    assert_eq!(orders.metric, Metric::Orders);
    assert_eq!(orders.rows[0].month, 7);
    assert_eq!(orders.rows[0].values, vec![2.0, 1.0]);
    assert_eq!(orders.rows[0].growth, Some(-0.5));
    assert_eq!(orders.rows[1].values, vec![1.0, 0.0]);
    // O2 spans Jul and Aug but is one order in the season.
    assert_eq!(orders.totals, vec![2.0, 1.0]);

    let registered = &pivots.new_registrations;
    assert_eq!(registered.rows[0].values, vec![1.0, 0.0]);
    assert_eq!(registered.totals, vec![1.0, 0.0]);

    let average = &pivots.average_order_value;
    assert_eq!(average.rows[0].values, vec![30.0, 40.0]);
    assert_eq!(average.totals, vec![45.0, 40.0]);

    assert_eq!(pivots.points.totals, vec![90.0, 40.0]);
}

#[test]
fn pivot_without_seasons_is_empty() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let pivot = monthly_pivot(&table, &Scope::all(), &[0], Metric::Orders);
    assert_eq!(pivot.metric, Metric::Orders);
    assert!(pivot.rows.is_empty());
    assert!(pivot.totals.is_empty());
}

/// Segments of one season, points descending, with their stores.
#[test]
fn segment_analysis_with_store_detail() {
    let table = TransactionTable::new(sample_rows(), Vec::new());
    let segments = segment_analysis(&table, 9, &Scope::all());

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].segment, "Casa");
    assert_eq!(segments[0].points, 130.0);
    assert_eq!(segments[0].orders, 2);
    assert!((segments[0].share - 130.0 / 180.0).abs() < 1e-12);
    assert_eq!(segments[0].stores.len(), 1);
    assert_eq!(segments[0].stores[0].store, "Loja A");
    assert_eq!(segments[0].stores[0].orders, 2);

    assert_eq!(segments[1].segment, "Revenda");
    assert_eq!(segments[1].orders, 1);
    assert!(segment_analysis(&table, 11, &Scope::all()).is_empty());
}
